// src/lexicon.rs
//! Lightweight lexicon analyzer served on `/analyze/lightweight`.
//!
//! Counts positive vs. negative lexicon hits after stop-word removal. The ratio
//! `pos / (pos + neg)` is both the label driver and the reported confidence.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::mock::{MAX_KEY_PHRASES, NO_KEY_PHRASES};
use crate::review::{Aspect, SentimentLabel, SentimentResult};

pub const POSITIVE_THRESHOLD: f64 = 0.66;
pub const NEGATIVE_THRESHOLD: f64 = 0.33;

static NON_ALPHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z\s]").expect("non-alpha regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "but", "if", "or", "because", "as", "until", "while", "of",
        "at", "by", "for", "with", "about", "against", "between", "into", "through", "during",
        "before", "after", "above", "below", "to", "from", "up", "down", "in", "out", "on",
        "off", "over", "under", "again", "further", "then", "once", "here", "there", "when",
        "where", "why", "how", "all", "any", "both", "each", "few", "more", "most", "other",
        "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too", "very",
        "s", "t", "can", "will", "just", "don", "should", "now", "movie", "film", "watch",
    ]
    .into_iter()
    .collect()
});

static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "good", "great", "excellent", "amazing", "wonderful", "best", "love", "awesome",
        "fantastic", "enjoyed", "favorite", "perfect", "brilliant", "superb", "outstanding",
        "masterpiece", "beautiful", "recommend",
    ]
    .into_iter()
    .collect()
});

static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bad", "worst", "terrible", "awful", "boring", "waste", "poor", "disappointing",
        "horrible", "hate", "stupid", "ridiculous", "worse", "dull", "mediocre", "fails",
        "avoid", "mess", "disaster",
    ]
    .into_iter()
    .collect()
});

static NEUTRAL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "okay", "average", "decent", "fine", "alright", "fair", "moderate", "passable",
        "acceptable", "ordinary", "standard", "middle", "mixed", "balanced", "neutral",
        "so-so", "neither", "somewhat",
    ]
    .into_iter()
    .collect()
});

static ASPECT_WORDS: Lazy<Vec<(Aspect, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (
            Aspect::EmotionalImpact,
            &[
                "emotional", "moving", "touching", "powerful", "sad", "happy", "feel", "felt",
                "heart", "tears",
            ][..],
        ),
        (
            Aspect::ActingQuality,
            &[
                "acting", "actor", "actress", "performance", "cast", "played", "role",
                "character",
            ][..],
        ),
        (
            Aspect::PlotStory,
            &[
                "plot", "story", "script", "screenplay", "narrative", "writing", "written",
                "storyline",
            ][..],
        ),
        (
            Aspect::VisualElements,
            &[
                "visual", "effects", "cinematography", "beautiful", "stunning", "cgi", "scene",
                "scenes",
            ][..],
        ),
        (
            Aspect::Direction,
            &[
                "director", "directed", "direction", "filmmaker", "vision", "pacing", "editing",
            ][..],
        ),
    ]
});

/// Lower-case, strip everything but ASCII letters and whitespace, drop stop words.
pub fn clean_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let stripped = NON_ALPHA.replace_all(&lower, "");
    stripped
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// `pos / (pos + neg)`; 0.5 when the text has no lexicon hits.
pub fn polarity(tokens: &[String]) -> f64 {
    let pos = tokens
        .iter()
        .filter(|w| POSITIVE_WORDS.contains(w.as_str()))
        .count();
    let neg = tokens
        .iter()
        .filter(|w| NEGATIVE_WORDS.contains(w.as_str()))
        .count();
    let total = pos + neg;
    if total == 0 {
        0.5
    } else {
        pos as f64 / total as f64
    }
}

pub fn label_for(score: f64) -> SentimentLabel {
    if score > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if score < NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Lexicon hits for `label` first, then the ten most frequent tokens; deduplicated, capped.
pub fn key_phrases(tokens: &[String], label: SentimentLabel) -> Vec<String> {
    let target = match label {
        SentimentLabel::Positive => &*POSITIVE_WORDS,
        SentimentLabel::Negative => &*NEGATIVE_WORDS,
        SentimentLabel::Neutral => &*NEUTRAL_WORDS,
    };

    let found = tokens.iter().filter(|w| target.contains(w.as_str()));
    let common = most_common(tokens, 10);

    let mut out: Vec<String> = Vec::with_capacity(MAX_KEY_PHRASES);
    for w in found.chain(common.iter()) {
        if out.len() == MAX_KEY_PHRASES {
            break;
        }
        if !out.contains(w) {
            out.push(w.clone());
        }
    }
    if out.is_empty() {
        out.push(NO_KEY_PHRASES.to_string());
    }
    out
}

/// Most frequent tokens; ties keep first-seen order.
fn most_common(tokens: &[String], n: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for t in tokens {
        let c = counts.entry(t.as_str()).or_insert(0);
        if *c == 0 {
            order.push(t.as_str());
        }
        *c += 1;
    }
    // stable sort keeps insertion order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(n).map(str::to_string).collect()
}

pub fn analyze(text: &str) -> SentimentResult {
    let tokens = clean_tokens(text);
    let score = polarity(&tokens);
    let label = label_for(score);

    let mut result = SentimentResult::new(label, score)
        .with_key_phrases(key_phrases(&tokens, label))
        .with_method("lightweight");

    for (aspect, words) in ASPECT_WORDS.iter() {
        let hits: Vec<String> = tokens
            .iter()
            .filter(|w| words.contains(&w.as_str()))
            .take(3)
            .cloned()
            .collect();
        if !hits.is_empty() {
            result = result.with_aspect(aspect.clone(), score, hits);
        }
    }
    if result.aspect_analysis.is_empty() {
        result = result.with_aspect(Aspect::General, score, Vec::new());
    }

    result
}
