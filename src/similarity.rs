//! Extracted-text similarity: normalization, Levenshtein distance, and the
//! percentage-with-label report shown in the comparison panel.

use regex::Regex;
use serde::Serialize;

/// Qualitative bucket for a similarity percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl SimilarityLevel {
    /// Fixed thresholds: >=80, >=60, >=40, >=20, else.
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            80.. => SimilarityLevel::VeryHigh,
            60..=79 => SimilarityLevel::High,
            40..=59 => SimilarityLevel::Medium,
            20..=39 => SimilarityLevel::Low,
            _ => SimilarityLevel::VeryLow,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SimilarityLevel::VeryHigh => "Very High Similarity",
            SimilarityLevel::High => "High Similarity",
            SimilarityLevel::Medium => "Medium Similarity",
            SimilarityLevel::Low => "Low Similarity",
            SimilarityLevel::VeryLow => "Very Low Similarity",
        }
    }
}

/// Result of comparing two extracted texts. `InsufficientText` is distinct
/// from a genuine 0% score of two non-empty texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimilarityOutcome {
    InsufficientText,
    Scored {
        percentage: u8,
        level: SimilarityLevel,
    },
}

/// Normalizes and scores text pairs. Holds the compiled normalization
/// patterns; scoring itself is pure.
pub struct SimilarityScorer {
    strip: Regex,
    whitespace: Regex,
}

impl SimilarityScorer {
    pub fn new() -> Self {
        Self {
            strip: Regex::new(r"[^\w\s]").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Lowercase, strip everything outside word/space classes, collapse
    /// whitespace runs, trim.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let stripped = self.strip.replace_all(&lowered, "");
        let collapsed = self.whitespace.replace_all(&stripped, " ");
        collapsed.trim().to_string()
    }

    /// Compare two texts. Either side normalizing to empty yields
    /// [`SimilarityOutcome::InsufficientText`].
    pub fn score(&self, a: &str, b: &str) -> SimilarityOutcome {
        let clean_a = self.normalize(a);
        let clean_b = self.normalize(b);
        if clean_a.is_empty() || clean_b.is_empty() {
            return SimilarityOutcome::InsufficientText;
        }

        let distance = levenshtein(&clean_a, &clean_b);
        let max_len = clean_a.chars().count().max(clean_b.chars().count());
        let similarity = 1.0 - distance as f64 / max_len as f64;
        let percentage = (similarity * 100.0).round().clamp(0.0, 100.0) as u8;

        SimilarityOutcome::Scored {
            percentage,
            level: SimilarityLevel::from_percentage(percentage),
        }
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Levenshtein edit distance over characters, unit cost for substitution,
/// insertion, and deletion. Single-row dynamic programming; O(len1 x len2)
/// time, O(len2) space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = if ca == cb { diagonal } else { diagonal + 1 };
            let insertion = row[j] + 1;
            let deletion = row[j + 1] + 1;
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(insertion).min(deletion);
        }
    }
    row[b.len()]
}
