use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[a-z0-9]+\b").expect("token pattern is valid"));

const EPSILON: f64 = 1e-9;

/// Lowercased alphanumeric word set.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard overlap with a small epsilon in the denominator.
pub fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    inter / (union + EPSILON)
}

/// True when the intent declares no anchors or one of them occurs in `lowered`.
pub fn anchors_allow(anchors: &[String], lowered: &str) -> bool {
    anchors.is_empty() || anchors.iter().any(|a| lowered.contains(a.as_str()))
}
