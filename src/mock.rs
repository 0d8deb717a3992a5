//! Local keyword heuristic used when no sentiment endpoint answers.
//!
//! The confidences are fixed per branch and do not reflect match strength.

use crate::review::{Aspect, SentimentLabel, SentimentResult};

const POSITIVE_KEYWORDS: [&str; 4] = ["love", "great", "excellent", "amazing"];
const NEGATIVE_KEYWORDS: [&str; 4] = ["hate", "terrible", "awful", "bad"];

pub const POSITIVE_CONFIDENCE: f64 = 0.85;
pub const NEGATIVE_CONFIDENCE: f64 = 0.78;
pub const NEUTRAL_CONFIDENCE: f64 = 0.65;

pub const MAX_KEY_PHRASES: usize = 5;
pub const NO_KEY_PHRASES: &str = "No specific key phrases identified.";

/// An aspect bucket: substring stems that trigger it and the words reported as keywords.
struct AspectBucket {
    aspect: Aspect,
    triggers: [&'static str; 3],
    keywords: [&'static str; 3],
}

fn buckets() -> [AspectBucket; 3] {
    [
        AspectBucket {
            aspect: Aspect::ActingQuality,
            triggers: ["act", "perform", "character"],
            keywords: ["acting", "performance", "character"],
        },
        AspectBucket {
            aspect: Aspect::PlotStory,
            triggers: ["plot", "story", "script"],
            keywords: ["plot", "story", "script"],
        },
        AspectBucket {
            aspect: Aspect::VisualElements,
            triggers: ["visual", "effect", "scene"],
            keywords: ["visual", "effects", "scene"],
        },
    ]
}

/// Positive keywords are checked first, so mixed reviews come out positive.
pub fn classify(text: &str) -> (SentimentLabel, f64) {
    let lower = text.to_lowercase();
    if POSITIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        (SentimentLabel::Positive, POSITIVE_CONFIDENCE)
    } else if NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        (SentimentLabel::Negative, NEGATIVE_CONFIDENCE)
    } else {
        (SentimentLabel::Neutral, NEUTRAL_CONFIDENCE)
    }
}

/// Whitespace tokens longer than 3 chars, first-seen order, at most five.
pub fn key_phrases(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut out: Vec<String> = Vec::with_capacity(MAX_KEY_PHRASES);
    for word in lower.split_whitespace() {
        if out.len() == MAX_KEY_PHRASES {
            break;
        }
        if word.chars().count() > 3 && !out.iter().any(|w| w == word) {
            out.push(word.to_string());
        }
    }
    if out.is_empty() {
        out.push(NO_KEY_PHRASES.to_string());
    }
    out
}

/// Run the full heuristic: label, fixed confidence, key phrases and aspect buckets.
pub fn analyze(text: &str) -> SentimentResult {
    let (label, confidence) = classify(text);
    let lower = text.to_lowercase();

    let mut result = SentimentResult::new(label, confidence)
        .with_key_phrases(key_phrases(text))
        .with_method("mock");

    for bucket in buckets() {
        if bucket.triggers.iter().any(|t| lower.contains(t)) {
            let found = bucket
                .keywords
                .iter()
                .filter(|k| lower.contains(*k))
                .map(|k| k.to_string())
                .collect();
            result = result.with_aspect(bucket.aspect, confidence, found);
        }
    }
    if result.aspect_analysis.is_empty() {
        result = result.with_aspect(Aspect::General, confidence, Vec::new());
    }

    result
}
