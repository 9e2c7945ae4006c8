//! Name matching heuristics

/// Decides whether an import table name loosely refers to an existing table.
///
/// Implementations are heuristics, not classifiers: short names such as
/// `id` and `kid` can match spuriously.
pub trait NameMatcher: Send + Sync {
    fn is_match(&self, import_name: &str, existing_name: &str) -> bool;
}

/// Lowercase and drop everything but ASCII letters and digits
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Matches names that are equal after normalization, or where one contains
/// the other and the shorter is long enough relative to the longer
#[derive(Debug, Clone, Copy)]
pub struct ContainmentMatcher {
    pub min_length_ratio: f64,
}

impl Default for ContainmentMatcher {
    fn default() -> Self {
        ContainmentMatcher {
            min_length_ratio: 0.6,
        }
    }
}

impl NameMatcher for ContainmentMatcher {
    fn is_match(&self, import_name: &str, existing_name: &str) -> bool {
        let a = normalize_name(import_name);
        let b = normalize_name(existing_name);
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a == b {
            return true;
        }

        let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
        longer.contains(shorter.as_str())
            && shorter.len() as f64 / longer.len() as f64 > self.min_length_ratio
    }
}
