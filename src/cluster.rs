//! Font clustering: unsupervised heading tiers from per-document typography.
//!
//! Each fragment becomes a `[font_size, is_bold, x, is_all_caps]` vector.
//! After standardisation the vectors are clustered with seeded k-means++
//! (`k = clamp(distinct sizes, 3, 8)`), clusters are ranked by mean font size
//! and the top three tiers map to H1..H3. The most populous cluster is body
//! text and never yields headings, even when it ranks among the top three.
//! Members of the heading tiers that look like prose are dropped.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::language::Language;
use crate::model::{HeadingCandidate, HeadingLevel, TextFragment};

/// Documents with fewer fragments than this produce no candidates.
pub const MIN_FRAGMENTS: usize = 10;
pub const MIN_CLUSTERS: usize = 3;
pub const MAX_CLUSTERS: usize = 8;
pub const KMEANS_SEED: u64 = 42;
/// k-means++ restarts; the run with the lowest inertia wins.
pub const KMEANS_RESTARTS: usize = 4;
const KMEANS_MAX_ITER: usize = 300;
const KMEANS_TOL: f64 = 1e-4;

/// Candidate text filters.
const MAX_CANDIDATE_CHARS: usize = 150;
const MIN_CANDIDATE_CHARS: usize = 4;
const MAX_CANDIDATE_SPACES: usize = 20;

pub type Point = [f64; 4];

/// Anything that turns a document's fragments into heading candidates.
pub trait HeadingDetector {
    fn detect_headings(&self, fragments: &[TextFragment], language: Language) -> Vec<HeadingCandidate>;
}

pub fn feature_vector(fragment: &TextFragment) -> Point {
    [
        fragment.font_size as f64,
        if fragment.is_bold { 1.0 } else { 0.0 },
        fragment.x() as f64,
        if fragment.is_all_caps() { 1.0 } else { 0.0 },
    ]
}

/// Zero mean, unit (population) variance per dimension. Constant dimensions
/// become all zeros.
pub fn standardize(points: &[Point]) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }
    let n = points.len() as f64;
    let mut mean = [0.0; 4];
    let mut std = [0.0; 4];

    for d in 0..4 {
        mean[d] = points.iter().map(|p| p[d]).sum::<f64>() / n;
        let var = points.iter().map(|p| (p[d] - mean[d]).powi(2)).sum::<f64>() / n;
        std[d] = var.sqrt();
    }

    points
        .iter()
        .map(|p| {
            let mut out = [0.0; 4];
            for d in 0..4 {
                out[d] = if std[d] > f64::EPSILON {
                    (p[d] - mean[d]) / std[d]
                } else {
                    0.0
                };
            }
            out
        })
        .collect()
}

/// Number of clusters: distinct font sizes clamped to `[3, 8]`.
pub fn choose_k(fragments: &[TextFragment]) -> usize {
    let mut sizes: Vec<f32> = fragments.iter().map(|f| f.font_size).collect();
    sizes.sort_by(|a, b| a.total_cmp(b));
    sizes.dedup_by(|a, b| a.total_cmp(b).is_eq());
    sizes.len().clamp(MIN_CLUSTERS, MAX_CLUSTERS)
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index of the nearest centroid; the lowest index wins ties.
fn nearest(point: &Point, centroids: &[Point]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Seeded k-means with k-means++ initialisation.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    restarts: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            seed: KMEANS_SEED,
            restarts: KMEANS_RESTARTS,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Cluster labels for each point, in `0..k`.
    pub fn fit_predict(&self, points: &[Point]) -> Vec<usize> {
        if points.is_empty() {
            return Vec::new();
        }
        let k = self.k.min(points.len());
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<(f64, Vec<usize>)> = None;
        for _ in 0..self.restarts.max(1) {
            let centroids = init_plus_plus(points, k, &mut rng);
            let (labels, inertia) = lloyd(points, centroids);
            if best.as_ref().map_or(true, |(b, _)| inertia < *b) {
                best = Some((inertia, labels));
            }
        }
        best.map(|(_, labels)| labels).unwrap_or_default()
    }
}

fn init_plus_plus(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut chosen = vec![rng.gen_range(0..points.len())];
    let mut d2: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[chosen[0]]))
        .collect();

    while chosen.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut pick = None;
            for (i, d) in d2.iter().enumerate() {
                acc += d;
                if *d > 0.0 && acc > target {
                    pick = Some(i);
                    break;
                }
            }
            // Rounding can leave `target` past the final sum.
            pick.or_else(|| d2.iter().rposition(|d| *d > 0.0)).unwrap_or(0)
        } else {
            // Every point coincides with a centroid; take the first unused one.
            (0..points.len()).find(|i| !chosen.contains(i)).unwrap_or(0)
        };

        chosen.push(next);
        for (i, p) in points.iter().enumerate() {
            d2[i] = d2[i].min(squared_distance(p, &points[next]));
        }
    }

    chosen.into_iter().map(|i| points[i]).collect()
}

fn lloyd(points: &[Point], mut centroids: Vec<Point>) -> (Vec<usize>, f64) {
    let k = centroids.len();
    let mut labels = vec![0usize; points.len()];

    for _ in 0..KMEANS_MAX_ITER {
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest(p, &centroids).0;
        }

        let mut sums = vec![[0.0; 4]; k];
        let mut counts = vec![0usize; k];
        for (label, p) in labels.iter().zip(points) {
            counts[*label] += 1;
            for d in 0..4 {
                sums[*label][d] += p[d];
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            // Empty clusters keep their previous centroid.
            if counts[c] == 0 {
                continue;
            }
            let mut updated = sums[c];
            for value in updated.iter_mut() {
                *value /= counts[c] as f64;
            }
            shift += squared_distance(&centroids[c], &updated);
            centroids[c] = updated;
        }

        if shift <= KMEANS_TOL {
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, p) in labels.iter_mut().zip(points) {
        let (l, d) = nearest(p, &centroids);
        *label = l;
        inertia += d;
    }
    (labels, inertia)
}

/// Per-cluster font statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub label: usize,
    pub mean_font_size: f64,
    pub members: usize,
}

/// Cluster assignment for one document, clusters ranked largest type first.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterModel {
    pub labels: Vec<usize>,
    pub ranked: Vec<Cluster>,
    /// Most populous cluster; ties go to the smaller type.
    pub body: Option<usize>,
}

impl ClusterModel {
    /// Heading level for a cluster label, if it is among the top three and
    /// is not the body text cluster.
    pub fn level_of(&self, label: usize) -> Option<HeadingLevel> {
        if self.body == Some(label) {
            return None;
        }
        self.ranked
            .iter()
            .position(|c| c.label == label)
            .and_then(HeadingLevel::from_rank)
    }
}

/// Cluster a document's fragments. `None` below [`MIN_FRAGMENTS`].
pub fn cluster_fragments(fragments: &[TextFragment]) -> Option<ClusterModel> {
    if fragments.len() < MIN_FRAGMENTS {
        return None;
    }
    let k = choose_k(fragments);
    let features: Vec<Point> = fragments.iter().map(feature_vector).collect();
    let labels = KMeans::new(k).fit_predict(&standardize(&features));

    let mut totals = vec![(0.0_f64, 0usize); k];
    for (label, fragment) in labels.iter().zip(fragments) {
        totals[*label].0 += fragment.font_size as f64;
        totals[*label].1 += 1;
    }

    let mut ranked: Vec<Cluster> = totals
        .into_iter()
        .enumerate()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(label, (sum, n))| Cluster {
            label,
            mean_font_size: sum / n as f64,
            members: n,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.mean_font_size
            .total_cmp(&a.mean_font_size)
            .then(a.label.cmp(&b.label))
    });

    // max_by keeps the last maximum, i.e. the smallest type among ties.
    let body = ranked.iter().max_by_key(|c| c.members).map(|c| c.label);

    log::debug!(
        "k={} clusters, mean sizes: {:?}, body cluster {:?}",
        k,
        ranked.iter().map(|c| c.mean_font_size).collect::<Vec<_>>(),
        body
    );
    Some(ClusterModel {
        labels,
        ranked,
        body,
    })
}

/// Drops prose-like lines from the heading tiers.
pub fn passes_candidate_filter(text: &str) -> bool {
    let len = text.chars().count();
    let spaces = text.chars().filter(|c| *c == ' ').count();
    (MIN_CANDIDATE_CHARS..=MAX_CANDIDATE_CHARS).contains(&len) && spaces <= MAX_CANDIDATE_SPACES
}

/// Heading detection by font clustering.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontClusterer;

impl FontClusterer {
    /// Level per fragment, aligned with the input; `None` for body text and
    /// for heading-tier lines that fail the candidate filter.
    pub fn assign_levels(&self, fragments: &[TextFragment]) -> Vec<Option<HeadingLevel>> {
        let Some(model) = cluster_fragments(fragments) else {
            return vec![None; fragments.len()];
        };

        fragments
            .iter()
            .zip(&model.labels)
            .map(|(fragment, label)| {
                model
                    .level_of(*label)
                    .filter(|_| passes_candidate_filter(&fragment.text))
            })
            .collect()
    }
}

impl HeadingDetector for FontClusterer {
    fn detect_headings(&self, fragments: &[TextFragment], _language: Language) -> Vec<HeadingCandidate> {
        fragments
            .iter()
            .zip(self.assign_levels(fragments))
            .filter_map(|(fragment, level)| Some(HeadingCandidate::new(fragment.clone(), level?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn fragment(text: &str, size: f32, y: f32) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            page: 1,
            font_size: size,
            font_name: "Helvetica".to_string(),
            is_bold: false,
            bbox: BBox::new(72.0, y, 400.0, y + size),
        }
    }

    const BODY: &str = "This paragraph line is ordinary body text that runs across the \
                        full measure of the page and carries far more than twenty spaces in it";

    fn scenario_a() -> Vec<TextFragment> {
        let mut fragments = vec![
            fragment("Chapter 1 Overview", 24.0, 72.0),
            fragment("1.1 Background", 18.0, 120.0),
        ];
        for i in 0..12 {
            fragments.push(fragment(BODY, 11.0, 150.0 + i as f32 * 14.0));
        }
        fragments
    }

    #[test]
    fn test_standardize_zero_variance() {
        let points = vec![[12.0, 0.0, 72.0, 0.0], [24.0, 0.0, 72.0, 0.0]];
        let scaled = standardize(&points);
        assert_eq!(scaled[0], [-1.0, 0.0, 0.0, 0.0]);
        assert_eq!(scaled[1], [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_choose_k_clamps() {
        let few = vec![fragment("a", 10.0, 0.0), fragment("b", 10.0, 0.0)];
        assert_eq!(choose_k(&few), 3);
        let many: Vec<_> = (0..20).map(|i| fragment("x", 8.0 + i as f32, 0.0)).collect();
        assert_eq!(choose_k(&many), 8);
    }

    #[test]
    fn test_too_few_fragments() {
        let fragments: Vec<_> = (0..9).map(|i| fragment("Heading", 10.0 + i as f32, 0.0)).collect();
        assert!(cluster_fragments(&fragments).is_none());
        assert!(FontClusterer
            .detect_headings(&fragments, Language::English)
            .is_empty());
    }

    #[test]
    fn test_scenario_a_levels() {
        let candidates = FontClusterer.detect_headings(&scenario_a(), Language::English);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].fragment.text, "Chapter 1 Overview");
        assert_eq!(candidates[0].level, HeadingLevel::H1);
        assert_eq!(candidates[1].fragment.text, "1.1 Background");
        assert_eq!(candidates[1].level, HeadingLevel::H2);
        assert!(candidates.iter().all(|c| c.fragment.font_size > 11.0));
    }

    #[test]
    fn test_short_body_lines_never_become_headings() {
        // Body lines short enough to pass the prose filter.
        let body = "This is body text about various topics that is admittedly rather long.";
        let mut fragments = vec![
            fragment("Chapter 1 Overview", 24.0, 50.0),
            fragment(body, 11.0, 100.0),
            fragment("1.1 Background", 18.0, 150.0),
        ];
        for i in 0..7 {
            fragments.push(fragment(body, 11.0, 200.0 + i as f32 * 14.0));
        }
        assert!(passes_candidate_filter(body));

        let model = cluster_fragments(&fragments).unwrap();
        assert_eq!(model.ranked.len(), 3);
        assert_eq!(model.body, Some(model.ranked[2].label));

        let candidates = FontClusterer.detect_headings(&fragments, Language::English);
        let found: Vec<_> = candidates
            .iter()
            .map(|c| (c.level, c.fragment.text.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (HeadingLevel::H1, "Chapter 1 Overview"),
                (HeadingLevel::H2, "1.1 Background"),
            ]
        );
    }

    #[test]
    fn test_kmeans_seed_controls_initialisation() {
        let points: Vec<Point> = (0..12)
            .map(|i| {
                let offset = if i < 6 { 0.0 } else { 10.0 };
                [offset + i as f64 * 0.01, 0.0, 0.0, 0.0]
            })
            .collect();
        for seed in [0, 7, KMEANS_SEED] {
            let labels = KMeans::new(2).with_seed(seed).fit_predict(&points);
            assert!(labels[..6].iter().all(|l| *l == labels[0]));
            assert!(labels[6..].iter().all(|l| *l == labels[6]));
            assert_ne!(labels[0], labels[6]);
        }
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let mut fragments = scenario_a();
        for i in 0..6 {
            fragments.push(fragment("Section title", 14.0 + (i % 2) as f32, 400.0 + i as f32));
        }
        let first = cluster_fragments(&fragments).unwrap();
        let second = cluster_fragments(&fragments).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ranked_means_are_monotonic() {
        let mut fragments = scenario_a();
        for size in [9.0, 13.0, 15.0, 16.0, 20.0] {
            fragments.push(fragment("Some label", size, 500.0));
        }
        let model = cluster_fragments(&fragments).unwrap();
        for pair in model.ranked.windows(2) {
            assert!(pair[0].mean_font_size >= pair[1].mean_font_size);
        }
        assert_eq!(model.level_of(model.ranked[0].label), Some(HeadingLevel::H1));
    }

    #[test]
    fn test_kmeans_identical_points() {
        let points = vec![[1.0, 1.0, 1.0, 1.0]; 5];
        let labels = KMeans::new(3).fit_predict(&points);
        assert_eq!(labels.len(), 5);
        assert!(labels.iter().all(|l| *l < 3));
    }

    #[test]
    fn test_candidate_filter() {
        assert!(passes_candidate_filter("Overview"));
        assert!(!passes_candidate_filter("abc"));
        assert!(!passes_candidate_filter(BODY));
        assert!(!passes_candidate_filter(&"y".repeat(151)));
    }
}
