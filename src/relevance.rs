//! Persona task relevance: paragraph segmentation and per-task scoring.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classifier::TaskClassifier;

/// Paragraphs shorter than this are skipped.
pub const MIN_PARAGRAPH_CHARS: usize = 20;
/// A task counts as relevant above this score.
pub const RELEVANCE_THRESHOLD: f64 = 0.3;
/// Tasks kept per section.
pub const TOP_TASKS: usize = 3;
/// Sections kept per document.
pub const MAX_SECTIONS: usize = 20;
/// Word-Jaccard above which two sections are duplicates.
pub const DUPLICATE_JACCARD: f64 = 0.8;
/// Leading characters compared when deduplicating.
const DEDUP_PREFIX_CHARS: usize = 100;

const KEYWORD_WEIGHT: f64 = 0.1;
const PATTERN_WEIGHT: f64 = 0.3;
const CONTEXT_KEYWORD_WEIGHT: f64 = 0.05;
const CLASSIFIER_WEIGHT: f64 = 0.4;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    DataAnalysis,
    SystemDesign,
    Implementation,
    Troubleshooting,
    Optimization,
    Documentation,
    Planning,
    Collaboration,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 8] = [
        TaskCategory::DataAnalysis,
        TaskCategory::SystemDesign,
        TaskCategory::Implementation,
        TaskCategory::Troubleshooting,
        TaskCategory::Optimization,
        TaskCategory::Documentation,
        TaskCategory::Planning,
        TaskCategory::Collaboration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::DataAnalysis => "data_analysis",
            TaskCategory::SystemDesign => "system_design",
            TaskCategory::Implementation => "implementation",
            TaskCategory::Troubleshooting => "troubleshooting",
            TaskCategory::Optimization => "optimization",
            TaskCategory::Documentation => "documentation",
            TaskCategory::Planning => "planning",
            TaskCategory::Collaboration => "collaboration",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords and phrase patterns describing one task.
pub struct TaskProfile {
    pub keywords: &'static [&'static str],
    pub patterns: Vec<Regex>,
}

fn profile(keywords: &'static [&'static str], patterns: [&str; 4]) -> TaskProfile {
    TaskProfile {
        keywords,
        patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
    }
}

pub static TASK_PROFILES: Lazy<BTreeMap<TaskCategory, TaskProfile>> = Lazy::new(|| {
    use TaskCategory::*;
    BTreeMap::from([
        (
            DataAnalysis,
            profile(
                &["analyze", "analysis", "data", "statistics", "metrics", "insights", "trends", "patterns"],
                [
                    r"(?:data|statistical|quantitative)\s+(?:analysis|examination|study)",
                    r"(?:analyze|examine|investigate)\s+(?:data|results|findings)",
                    r"(?:metrics|kpis?|indicators)\s+(?:show|indicate|reveal)",
                    r"(?:trends|patterns|correlations)\s+(?:in|within|across)",
                ],
            ),
        ),
        (
            SystemDesign,
            profile(
                &["architecture", "design", "system", "framework", "structure", "components", "modules"],
                [
                    r"(?:system|software|application)\s+(?:architecture|design|structure)",
                    r"(?:components?|modules?|services?)\s+(?:interact|communicate|integrate)",
                    r"(?:framework|platform|infrastructure)\s+(?:supports?|enables?|provides?)",
                    r"(?:scalable|modular|distributed)\s+(?:design|architecture|system)",
                ],
            ),
        ),
        (
            Implementation,
            profile(
                &["implement", "develop", "build", "create", "code", "programming", "deployment"],
                [
                    r"(?:implement|develop|build|create)\s+(?:solution|system|application|feature)",
                    r"(?:code|programming|development)\s+(?:standards|practices|guidelines)",
                    r"(?:deployment|installation|setup)\s+(?:process|procedure|steps)",
                    r"(?:testing|validation|verification)\s+(?:approach|strategy|methods)",
                ],
            ),
        ),
        (
            Troubleshooting,
            profile(
                &["debug", "troubleshoot", "error", "issue", "problem", "fix", "resolve", "solution"],
                [
                    r"(?:debug|troubleshoot|diagnose)\s+(?:issues?|problems?|errors?)",
                    r"(?:common|typical|frequent)\s+(?:issues?|problems?|errors?)",
                    r"(?:error|exception|failure)\s+(?:handling|management|recovery)",
                    r"(?:fix|resolve|solve|address)\s+(?:problems?|issues?|bugs?)",
                ],
            ),
        ),
        (
            Optimization,
            profile(
                &["optimize", "performance", "efficiency", "improve", "enhance", "tuning"],
                [
                    r"(?:optimize|improve|enhance)\s+(?:performance|efficiency|speed)",
                    r"(?:performance|efficiency)\s+(?:tuning|optimization|improvement)",
                    r"(?:bottlenecks?|constraints?|limitations?)\s+(?:identified?|addressed?)",
                    r"(?:scalability|throughput|latency)\s+(?:considerations?|requirements?)",
                ],
            ),
        ),
        (
            Documentation,
            profile(
                &["document", "documentation", "guide", "manual", "instructions", "procedures"],
                [
                    r"(?:documentation|guide|manual)\s+(?:provides?|describes?|explains?)",
                    r"(?:instructions?|procedures?|steps?)\s+(?:for|to)\s+(?:follow|complete)",
                    r"(?:reference|specification|standard)\s+(?:document|guide|manual)",
                    r"(?:user|technical|api)\s+(?:documentation|guide|reference)",
                ],
            ),
        ),
        (
            Planning,
            profile(
                &["plan", "strategy", "roadmap", "timeline", "schedule", "requirements", "objectives"],
                [
                    r"(?:plan|strategy|roadmap)\s+(?:for|to)\s+(?:implement|achieve|deliver)",
                    r"(?:requirements?|objectives?|goals?)\s+(?:defined?|specified?|outlined?)",
                    r"(?:timeline|schedule|milestones?)\s+(?:for|of)\s+(?:project|development)",
                    r"(?:phases?|stages?|iterations?)\s+(?:of|in)\s+(?:development|implementation)",
                ],
            ),
        ),
        (
            Collaboration,
            profile(
                &["collaborate", "team", "communication", "coordination", "stakeholder", "meeting"],
                [
                    r"(?:collaborate|coordinate|communicate)\s+(?:with|between)\s+(?:teams?|stakeholders?)",
                    r"(?:meetings?|discussions?|reviews?)\s+(?:with|between|among)",
                    r"(?:stakeholder|client|customer)\s+(?:engagement|communication|feedback)",
                    r"(?:cross-functional|interdisciplinary)\s+(?:collaboration|coordination)",
                ],
            ),
        ),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Methodology,
    Requirements,
    Examples,
    BestPractices,
    ToolsResources,
    DetailedExplanation,
    Procedure,
    GeneralContent,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Methodology => "methodology",
            SectionType::Requirements => "requirements",
            SectionType::Examples => "examples",
            SectionType::BestPractices => "best_practices",
            SectionType::ToolsResources => "tools_resources",
            SectionType::DetailedExplanation => "detailed_explanation",
            SectionType::Procedure => "procedure",
            SectionType::GeneralContent => "general_content",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern-matched section types, tried in order.
static SECTION_TYPE_RULES: Lazy<Vec<(SectionType, Vec<Regex>)>> = Lazy::new(|| {
    let rule = |kind, patterns: &[&str]| {
        (
            kind,
            patterns.iter().map(|p| Regex::new(p).unwrap()).collect::<Vec<_>>(),
        )
    };
    vec![
        rule(
            SectionType::Methodology,
            &[
                r"(?:methodology|approach|method|technique|procedure)",
                r"(?:step-by-step|process|workflow|pipeline)",
            ],
        ),
        rule(
            SectionType::Requirements,
            &[
                r"(?:requirements?|specifications?|criteria|constraints?)",
                r"(?:must|should|shall|required|mandatory|optional)",
            ],
        ),
        rule(
            SectionType::Examples,
            &[
                r"(?:example|sample|illustration|case study|demonstration)",
                r"(?:for instance|for example|such as|including)",
            ],
        ),
        rule(
            SectionType::BestPractices,
            &[
                r"(?:best practices?|recommendations?|guidelines?|standards?)",
                r"(?:recommended|suggested|preferred|optimal)",
            ],
        ),
        rule(
            SectionType::ToolsResources,
            &[
                r"(?:tools?|resources?|utilities|libraries|frameworks?)",
                r"(?:using|with|via|through|leveraging)",
            ],
        ),
    ]
});

pub fn classify_section_type(text: &str) -> SectionType {
    let lower = text.to_lowercase();
    for (kind, patterns) in SECTION_TYPE_RULES.iter() {
        if patterns.iter().any(|p| p.is_match(&lower)) {
            return *kind;
        }
    }

    if text.chars().count() > 500 {
        SectionType::DetailedExplanation
    } else if ["step", "first", "then", "next", "finally"]
        .iter()
        .any(|w| lower.contains(w))
    {
        SectionType::Procedure
    } else if ["example", "instance", "case"].iter().any(|w| lower.contains(w)) {
        SectionType::Examples
    } else {
        SectionType::GeneralContent
    }
}

/// A paragraph with its neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub page: usize,
    pub context_before: String,
    pub context_after: String,
}

impl Paragraph {
    /// Previous paragraph, the paragraph itself and the next one.
    pub fn full_context(&self) -> String {
        format!("{} {} {}", self.context_before, self.text, self.context_after)
            .trim()
            .to_string()
    }

    pub fn has_context(&self) -> bool {
        !self.context_before.is_empty() || !self.context_after.is_empty()
    }
}

/// Split page text on blank lines, skipping short paragraphs.
pub fn segment_page(text: &str, page: usize) -> Vec<Paragraph> {
    let parts: Vec<&str> = PARAGRAPH_BREAK.split(text).collect();
    parts
        .iter()
        .enumerate()
        .filter_map(|(i, part)| {
            let paragraph = part.trim();
            if paragraph.chars().count() < MIN_PARAGRAPH_CHARS {
                return None;
            }
            let before = if i > 0 { parts[i - 1].trim() } else { "" };
            let after = parts.get(i + 1).map_or("", |p| p.trim());
            Some(Paragraph {
                text: paragraph.to_string(),
                page,
                context_before: before.to_string(),
                context_after: after.to_string(),
            })
        })
        .collect()
}

/// One passage ranked against the task taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceSection {
    pub text: String,
    pub page: usize,
    /// Up to three tasks, best first.
    pub relevant_tasks: Vec<TaskCategory>,
    /// Scores of `relevant_tasks`, rounded to three decimals.
    pub relevance_scores: BTreeMap<TaskCategory, f64>,
    pub section_type: SectionType,
    pub length: usize,
    pub context_available: bool,
}

impl RelevanceSection {
    pub fn top_score(&self) -> f64 {
        self.relevance_scores.values().copied().fold(0.0, f64::max)
    }
}

/// Relevance output for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSections {
    pub task_sections: Vec<RelevanceSection>,
}

/// Aggregate view over a document's sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaSummary {
    pub total_sections: usize,
    pub task_types: Vec<TaskCategory>,
    pub avg_relevance: f64,
    pub section_types: Vec<SectionType>,
}

impl TaskSections {
    pub fn summary(&self) -> PersonaSummary {
        let sections = &self.task_sections;
        let task_types: BTreeSet<TaskCategory> = sections
            .iter()
            .flat_map(|s| s.relevant_tasks.iter().copied())
            .collect();
        let section_types: BTreeSet<SectionType> = sections.iter().map(|s| s.section_type).collect();
        let avg_relevance = if sections.is_empty() {
            0.0
        } else {
            round3(sections.iter().map(RelevanceSection::top_score).sum::<f64>() / sections.len() as f64)
        };

        PersonaSummary {
            total_sections: sections.len(),
            task_types: task_types.into_iter().collect(),
            avg_relevance,
            section_types: section_types.into_iter().collect(),
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Word-set Jaccard similarity; zero when either side is empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a: BTreeSet<&str> = a.split_whitespace().collect();
    let b: BTreeSet<&str> = b.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count();
    shared as f64 / a.union(&b).count() as f64
}

/// Scores paragraphs against the task taxonomy.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    classifier: Arc<TaskClassifier>,
}

impl RelevanceScorer {
    pub fn new(classifier: Arc<TaskClassifier>) -> Self {
        Self { classifier }
    }

    /// Score of `text` for every task, each capped at 1.0.
    pub fn score_paragraph(&self, text: &str, context: &str) -> BTreeMap<TaskCategory, f64> {
        let lower = text.to_lowercase();
        let context = context.to_lowercase();
        let predicted = self.classifier.predict(text);

        TASK_PROFILES
            .iter()
            .map(|(task, profile)| {
                let keywords = profile.keywords.iter().filter(|k| lower.contains(*k)).count();
                let patterns = profile.patterns.iter().filter(|p| p.is_match(&lower)).count();
                let context_keywords = profile
                    .keywords
                    .iter()
                    .filter(|k| context.contains(*k))
                    .count();

                let mut score = keywords as f64 * KEYWORD_WEIGHT
                    + patterns as f64 * PATTERN_WEIGHT
                    + context_keywords as f64 * CONTEXT_KEYWORD_WEIGHT;
                if predicted == Some(*task) {
                    score += CLASSIFIER_WEIGHT;
                }
                (*task, score.min(1.0))
            })
            .collect()
    }

    /// Build a section for a paragraph, if any task clears the threshold.
    pub fn score_section(&self, paragraph: &Paragraph) -> Option<RelevanceSection> {
        let scores = self.score_paragraph(&paragraph.text, &paragraph.full_context());
        let mut relevant: Vec<(TaskCategory, f64)> = scores
            .into_iter()
            .filter(|(_, s)| *s > RELEVANCE_THRESHOLD)
            .collect();
        if relevant.is_empty() {
            return None;
        }
        relevant.sort_by(|a, b| b.1.total_cmp(&a.1));
        relevant.truncate(TOP_TASKS);

        Some(RelevanceSection {
            text: paragraph.text.clone(),
            page: paragraph.page,
            relevant_tasks: relevant.iter().map(|(t, _)| *t).collect(),
            relevance_scores: relevant.iter().map(|(t, s)| (*t, round3(*s))).collect(),
            section_type: classify_section_type(&paragraph.text),
            length: paragraph.text.chars().count(),
            context_available: paragraph.has_context(),
        })
    }

    /// Rank the paragraphs of `(page, text)` pairs into deduplicated sections.
    pub fn extract_sections<'a, I>(&self, pages: I) -> TaskSections
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let sections: Vec<RelevanceSection> = pages
            .into_iter()
            .flat_map(|(page, text)| segment_page(text, page))
            .filter_map(|p| self.score_section(&p))
            .collect();
        TaskSections {
            task_sections: deduplicate_sections(sections),
        }
    }
}

/// Best first, near-duplicates dropped, at most [`MAX_SECTIONS`].
pub fn deduplicate_sections(mut sections: Vec<RelevanceSection>) -> Vec<RelevanceSection> {
    sections.sort_by(|a, b| b.top_score().total_cmp(&a.top_score()));

    let mut seen: Vec<String> = Vec::new();
    let mut unique = Vec::new();
    for section in sections {
        let key: String = section.text.chars().take(DEDUP_PREFIX_CHARS).collect();
        let key = key.to_lowercase().trim().to_string();
        if seen.iter().any(|s| jaccard_similarity(&key, s) > DUPLICATE_JACCARD) {
            continue;
        }
        seen.push(key);
        unique.push(section);
    }
    unique.truncate(MAX_SECTIONS);
    unique
}
