//! Pre-fit text classifier for task categories: TF-IDF features over word
//! unigrams and bigrams feeding a multinomial naive Bayes model.
//!
//! The model is fit once from [`TRAINING_CORPUS`] and is read-only afterwards,
//! so one instance can be shared across worker threads.

use std::collections::{BTreeMap, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::relevance::TaskCategory;

/// Additive smoothing for the naive Bayes likelihoods.
pub const NB_ALPHA: f64 = 0.1;
/// Vocabulary cap, most frequent terms first.
pub const MAX_FEATURES: usize = 1000;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "again", "against", "all", "almost", "also",
        "although", "always", "am", "among", "an", "and", "any", "are", "around", "as", "at",
        "be", "because", "been", "before", "being", "below", "beside", "besides", "between",
        "beyond", "both", "but", "by", "can", "cannot", "could", "do", "does", "done", "down",
        "during", "each", "either", "else", "etc", "even", "ever", "every", "few", "for",
        "from", "further", "had", "has", "have", "he", "hence", "her", "here", "hers", "him",
        "his", "how", "however", "if", "in", "into", "is", "it", "its", "itself", "just",
        "last", "least", "less", "many", "may", "me", "might", "more", "most", "much", "must",
        "my", "neither", "no", "nor", "not", "now", "of", "off", "often", "on", "once", "one",
        "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "out", "over",
        "own", "per", "perhaps", "rather", "same", "she", "should", "since", "so", "some",
        "still", "such", "than", "that", "the", "their", "them", "then", "there", "these",
        "they", "this", "those", "though", "through", "thus", "to", "together", "too",
        "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
        "well", "were", "what", "when", "where", "whether", "which", "while", "who", "whom",
        "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
        "yours",
    ]
    .into_iter()
    .collect()
});

/// Synthetic training phrases, six per task category.
pub const TRAINING_CORPUS: [(&str, TaskCategory); 48] = {
    use TaskCategory::*;
    [
        ("analyze customer behavior patterns", DataAnalysis),
        ("statistical analysis of results", DataAnalysis),
        ("data visualization techniques", DataAnalysis),
        ("metrics show significant improvement", DataAnalysis),
        ("correlation between variables", DataAnalysis),
        ("trend analysis over time", DataAnalysis),
        ("system architecture overview", SystemDesign),
        ("component interaction diagram", SystemDesign),
        ("scalable design patterns", SystemDesign),
        ("modular framework structure", SystemDesign),
        ("distributed system design", SystemDesign),
        ("microservices architecture", SystemDesign),
        ("implementation guidelines", Implementation),
        ("coding standards and practices", Implementation),
        ("deployment procedures", Implementation),
        ("development workflow", Implementation),
        ("testing methodology", Implementation),
        ("continuous integration setup", Implementation),
        ("common error messages", Troubleshooting),
        ("debugging techniques", Troubleshooting),
        ("troubleshooting guide", Troubleshooting),
        ("error handling strategies", Troubleshooting),
        ("problem resolution steps", Troubleshooting),
        ("diagnostic procedures", Troubleshooting),
        ("performance optimization", Optimization),
        ("efficiency improvements", Optimization),
        ("bottleneck identification", Optimization),
        ("scalability considerations", Optimization),
        ("resource utilization", Optimization),
        ("speed enhancements", Optimization),
        ("user guide instructions", Documentation),
        ("technical documentation", Documentation),
        ("API reference manual", Documentation),
        ("installation procedures", Documentation),
        ("configuration settings", Documentation),
        ("usage examples", Documentation),
        ("project roadmap", Planning),
        ("development timeline", Planning),
        ("requirements specification", Planning),
        ("milestone planning", Planning),
        ("resource allocation", Planning),
        ("strategic objectives", Planning),
        ("team coordination", Collaboration),
        ("stakeholder communication", Collaboration),
        ("meeting protocols", Collaboration),
        ("cross-functional collaboration", Collaboration),
        ("feedback collection", Collaboration),
        ("review processes", Collaboration),
    ]
};

/// Lower-cased word tokens of two or more characters, stop words removed,
/// followed by their adjacent bigrams.
pub fn analyze(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();

    let mut terms: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

/// TF-IDF with smoothed idf and L2-normalised rows.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(d.as_ref())).collect();

        let mut corpus_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for terms in &analyzed {
            let mut in_doc = HashSet::new();
            for term in terms {
                *corpus_counts.entry(term).or_default() += 1;
                if in_doc.insert(term.as_str()) {
                    *doc_freq.entry(term).or_default() += 1;
                }
            }
        }

        // Keep the most frequent terms, alphabetical on ties, then index
        // the survivors alphabetically.
        let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked.truncate(MAX_FEATURES);
        let mut kept: Vec<&str> = ranked.into_iter().map(|(t, _)| t).collect();
        kept.sort_unstable();

        let n = documents.len() as f64;
        let idf = kept
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();

        Self { vocabulary, idf }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Sparse `(feature, weight)` row; empty when no term is in the vocabulary.
    pub fn transform(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyze(text) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut row: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();
        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }
}

/// Multinomial naive Bayes over TF-IDF rows.
#[derive(Debug, Clone)]
pub struct TaskClassifier {
    vectorizer: TfidfVectorizer,
    classes: Vec<TaskCategory>,
    class_log_prior: Vec<f64>,
    feature_log_prob: Vec<Vec<f64>>,
}

impl Default for TaskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskClassifier {
    /// Classifier fit on the built-in corpus.
    pub fn new() -> Self {
        Self::fit(&TRAINING_CORPUS, NB_ALPHA)
    }

    pub fn fit(examples: &[(&str, TaskCategory)], alpha: f64) -> Self {
        let texts: Vec<&str> = examples.iter().map(|(t, _)| *t).collect();
        let vectorizer = TfidfVectorizer::fit(&texts);
        let features = vectorizer.vocabulary_size();

        let mut classes: Vec<TaskCategory> = examples.iter().map(|(_, c)| *c).collect();
        classes.sort();
        classes.dedup();

        let mut class_counts = vec![0usize; classes.len()];
        let mut feature_counts = vec![vec![0.0_f64; features]; classes.len()];
        for (text, category) in examples {
            let Ok(c) = classes.binary_search(category) else {
                continue;
            };
            class_counts[c] += 1;
            for (i, w) in vectorizer.transform(text) {
                feature_counts[c][i] += w;
            }
        }

        let total = examples.len().max(1) as f64;
        let class_log_prior = class_counts
            .iter()
            .map(|&n| (n as f64 / total).ln())
            .collect();
        let feature_log_prob = feature_counts
            .iter()
            .map(|counts| {
                let denom = (counts.iter().sum::<f64>() + alpha * features as f64).ln();
                counts.iter().map(|c| (c + alpha).ln() - denom).collect()
            })
            .collect();

        Self {
            vectorizer,
            classes,
            class_log_prior,
            feature_log_prob,
        }
    }

    /// Most likely task for `text`.
    ///
    /// `None` when the text shares no term with the training vocabulary; the
    /// model would only echo its class prior there.
    pub fn predict(&self, text: &str) -> Option<TaskCategory> {
        let row = self.vectorizer.transform(text);
        if row.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (c, prior) in self.class_log_prior.iter().enumerate() {
            let log_prob = prior
                + row
                    .iter()
                    .map(|(i, w)| w * self.feature_log_prob[c][*i])
                    .sum::<f64>();
            if best.map_or(true, |(_, b)| log_prob > b) {
                best = Some((c, log_prob));
            }
        }
        best.map(|(c, _)| self.classes[c])
    }
}
