//! Heuristic complexity estimation from prompt text.
//!
//! Scores a prompt by word count plus keyword weights, scales by model
//! tier, and buckets the result into four ordered classes. The weights
//! and keyword lists are tuning constants with no empirical derivation;
//! treat every output as advisory, never as a measurement.

use serde::{Deserialize, Serialize};

use super::model::ModelTier;

/// Weight added per occurrence of a complexity-indicating keyword.
const COMPLEX_KEYWORD_WEIGHT: f64 = 10.0;

/// Weight subtracted per occurrence of a simplicity-indicating keyword.
const SIMPLE_KEYWORD_WEIGHT: f64 = 5.0;

/// Score contributed by each word of the prompt.
const WORD_WEIGHT: f64 = 0.5;

/// Stems indicating creation or transformation work.
///
/// Matched case-insensitively as substrings, so each stem also covers
/// inflections and Latin-language synonyms ("implement" matches
/// "implementar", "migrat" matches "migrate"/"migration"/"migração"
/// prefixes). No stem may be a substring of another stem in either list,
/// otherwise a single word would be counted twice.
const COMPLEX_KEYWORDS: &[&str] = &[
    "implement",
    "refactor",
    "build",
    "deploy",
    "migrat",
    "integrat",
    "architect",
    "redesign",
    "rewrite",
    "creat",
    "construi",
    "desenvolv",
];

/// Stems indicating read-only or lookup work.
const SIMPLE_KEYWORDS: &[&str] = &[
    "read", "analy", "check", "list", "find", "search", "view", "show",
];

/// Ordered complexity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityClass {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl std::fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityClass::Simple => write!(f, "simple"),
            ComplexityClass::Moderate => write!(f, "moderate"),
            ComplexityClass::Complex => write!(f, "complex"),
            ComplexityClass::VeryComplex => write!(f, "very_complex"),
        }
    }
}

/// Advisory wall-clock estimate for a complexity bucket.
///
/// `max_minutes == None` means open-ended ("45+ min").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationEstimate {
    pub min_minutes: u32,
    pub max_minutes: Option<u32>,
}

impl std::fmt::Display for DurationEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max_minutes {
            Some(max) => write!(f, "{}-{} min", self.min_minutes, max),
            None => write!(f, "{}+ min", self.min_minutes),
        }
    }
}

/// Result of estimating a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityEstimate {
    pub class: ComplexityClass,
    pub score: f64,
    pub duration: DurationEstimate,
}

/// Estimate the complexity of a prompt for a given model tier.
///
/// # Algorithm
/// - base score: `word_count * 0.5`
/// - `+10` per occurrence of a complex keyword, `-5` per occurrence of a
///   simple keyword (substring matches; repeated occurrences compound —
///   this is intentional, not a bug)
/// - multiplied by the tier's complexity multiplier
/// - floored at 0, never clamped above: a long enough prompt can exceed
///   every bucket's nominal range
///
/// # Buckets
/// `<20 Simple (2-5 min)`, `<50 Moderate (5-15 min)`,
/// `<100 Complex (15-45 min)`, otherwise `VeryComplex (45+ min)`.
///
/// An empty prompt scores 0 and is `Simple`.
pub fn estimate(prompt: &str, tier: ModelTier) -> ComplexityEstimate {
    let text = prompt.to_lowercase();
    let word_count = text.split_whitespace().count();

    let mut score = word_count as f64 * WORD_WEIGHT;
    for keyword in COMPLEX_KEYWORDS {
        score += text.matches(keyword).count() as f64 * COMPLEX_KEYWORD_WEIGHT;
    }
    for keyword in SIMPLE_KEYWORDS {
        score -= text.matches(keyword).count() as f64 * SIMPLE_KEYWORD_WEIGHT;
    }

    score *= tier.complexity_multiplier();
    let score = score.max(0.0);

    let (class, duration) = classify(score);
    ComplexityEstimate {
        class,
        score,
        duration,
    }
}

/// Bucket a score with the fixed breakpoints.
fn classify(score: f64) -> (ComplexityClass, DurationEstimate) {
    if score < 20.0 {
        (
            ComplexityClass::Simple,
            DurationEstimate {
                min_minutes: 2,
                max_minutes: Some(5),
            },
        )
    } else if score < 50.0 {
        (
            ComplexityClass::Moderate,
            DurationEstimate {
                min_minutes: 5,
                max_minutes: Some(15),
            },
        )
    } else if score < 100.0 {
        (
            ComplexityClass::Complex,
            DurationEstimate {
                min_minutes: 15,
                max_minutes: Some(45),
            },
        )
    } else {
        (
            ComplexityClass::VeryComplex,
            DurationEstimate {
                min_minutes: 45,
                max_minutes: None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prompt_is_simple_with_zero_score() {
        let result = estimate("", ModelTier::Sonnet);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.class, ComplexityClass::Simple);
    }

    #[test]
    fn score_is_monotone_in_word_count() {
        // Keyword counts held fixed (zero); adding neutral words must
        // never decrease the score.
        let mut previous = -1.0;
        for n in [1usize, 5, 20, 80, 200] {
            let prompt = vec!["word"; n].join(" ");
            let result = estimate(&prompt, ModelTier::Sonnet);
            assert!(
                result.score >= previous,
                "score decreased at {} words: {} < {}",
                n,
                result.score,
                previous
            );
            previous = result.score;
        }
    }

    #[test]
    fn repeated_keywords_compound() {
        let once = estimate("implement the parser", ModelTier::Sonnet);
        let twice = estimate("implement and implement the parser", ModelTier::Sonnet);
        assert!(twice.score > once.score + COMPLEX_KEYWORD_WEIGHT - 1.0);
    }

    #[test]
    fn simple_keywords_reduce_score() {
        let neutral = estimate("the quarterly report for the team", ModelTier::Sonnet);
        let simple = estimate("read the quarterly report for the team", ModelTier::Sonnet);
        assert!(simple.score < neutral.score);
    }

    #[test]
    fn tier_multiplier_orders_scores() {
        let prompt = "implement a migration for the billing tables";
        let haiku = estimate(prompt, ModelTier::Haiku);
        let sonnet = estimate(prompt, ModelTier::Sonnet);
        let opus = estimate(prompt, ModelTier::Opus);
        assert!(haiku.score < sonnet.score);
        assert!(sonnet.score < opus.score);
    }

    /// A short prompt stays Simple even when it contains an action verb.
    /// "Implementar" matches the "implement" stem exactly once; with 7
    /// words the score is (7 * 0.5 + 10) * 1.0 = 13.5, below the
    /// Moderate breakpoint.
    #[test]
    fn short_portuguese_prompt_stays_simple() {
        let result = estimate(
            "Implementar autenticação JWT no módulo de usuários",
            ModelTier::Sonnet,
        );
        assert!((result.score - 13.5).abs() < f64::EPSILON);
        assert_eq!(result.class, ComplexityClass::Simple);
    }

    #[test]
    fn bucket_breakpoints() {
        assert_eq!(classify(0.0).0, ComplexityClass::Simple);
        assert_eq!(classify(19.9).0, ComplexityClass::Simple);
        assert_eq!(classify(20.0).0, ComplexityClass::Moderate);
        assert_eq!(classify(49.9).0, ComplexityClass::Moderate);
        assert_eq!(classify(50.0).0, ComplexityClass::Complex);
        assert_eq!(classify(99.9).0, ComplexityClass::Complex);
        assert_eq!(classify(100.0).0, ComplexityClass::VeryComplex);
        assert_eq!(classify(10_000.0).0, ComplexityClass::VeryComplex);
    }

    #[test]
    fn no_stem_is_a_substring_of_another() {
        let all: Vec<&str> = COMPLEX_KEYWORDS
            .iter()
            .chain(SIMPLE_KEYWORDS.iter())
            .copied()
            .collect();
        for a in &all {
            for b in &all {
                if a != b {
                    assert!(
                        !a.contains(b),
                        "stem {:?} contains {:?}; one word would be double-counted",
                        a,
                        b
                    );
                }
            }
        }
    }

    #[test]
    fn duration_display() {
        let result = estimate("", ModelTier::Haiku);
        assert_eq!(result.duration.to_string(), "2-5 min");
        let (_, open_ended) = classify(500.0);
        assert_eq!(open_ended.to_string(), "45+ min");
    }
}
