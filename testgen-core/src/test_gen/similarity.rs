//! Edit-distance similarity and near-duplicate removal

use super::{GeneratedTestCase, ProcessedDraft};
use tracing::debug;

/// Anything with a title and steps can be compared for duplication
pub trait Deduplicable {
    fn title(&self) -> &str;
    fn steps(&self) -> &[String];
}

impl Deduplicable for GeneratedTestCase {
    fn title(&self) -> &str {
        &self.title
    }

    fn steps(&self) -> &[String] {
        &self.steps
    }
}

impl Deduplicable for ProcessedDraft {
    fn title(&self) -> &str {
        &self.title
    }

    fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// Levenshtein distance over chars, two rows at a time
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1).min(current[j] + 1).min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Lower-case alphanumeric runs joined by single spaces
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `1 - distance / longer length`; two empty strings are identical
pub fn ratio(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => {
            let longest = a.chars().count().max(b.chars().count());
            1.0 - levenshtein(a, b) as f64 / longest as f64
        }
    }
}

struct Fingerprint {
    title: String,
    steps: String,
}

impl Fingerprint {
    fn of(item: &impl Deduplicable) -> Self {
        Self { title: normalize(item.title()), steps: normalize(&item.steps().join(" ")) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deduplicator {
    pub threshold: f64,
    pub title_weight: f64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self { threshold: 0.70, title_weight: 0.5 }
    }
}

impl Deduplicator {
    pub fn new(threshold: f64, title_weight: f64) -> Self {
        Self { threshold, title_weight: title_weight.clamp(0.0, 1.0) }
    }

    pub fn similarity(&self, a: &impl Deduplicable, b: &impl Deduplicable) -> f64 {
        self.score(&Fingerprint::of(a), &Fingerprint::of(b))
    }

    fn score(&self, a: &Fingerprint, b: &Fingerprint) -> f64 {
        self.title_weight * ratio(&a.title, &b.title)
            + (1.0 - self.title_weight) * ratio(&a.steps, &b.steps)
    }

    /// Keeps the first of every group of near-duplicates, preserving order.
    /// Returns the survivors and how many were dropped.
    pub fn dedup<T: Deduplicable>(&self, items: Vec<T>) -> (Vec<T>, usize) {
        let mut kept: Vec<(Fingerprint, T)> = Vec::with_capacity(items.len());
        let mut removed = 0;

        for item in items {
            let fingerprint = Fingerprint::of(&item);
            let duplicate_of = kept
                .iter()
                .map(|(existing, kept_item)| (self.score(&fingerprint, existing), kept_item))
                .find(|(score, _)| *score >= self.threshold);

            match duplicate_of {
                Some((score, original)) => {
                    debug!(
                        "Dropping '{}' as a duplicate of '{}' (similarity {:.2})",
                        item.title(),
                        original.title(),
                        score
                    );
                    removed += 1;
                }
                None => kept.push((fingerprint, item)),
            }
        }

        (kept.into_iter().map(|(_, item)| item).collect(), removed)
    }
}
