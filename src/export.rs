//! CSV export of a saved rating's per-review results.
//!
//! Columns: `Reviewer, Review Text, Sentiment, Confidence`. Text fields are quoted with
//! doubled inner quotes; confidence is a percentage with one decimal.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::review::{AggregatedRating, RatedReview};

pub const CSV_HEADER: &str = "Reviewer,Review Text,Sentiment,Confidence";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn csv_row(r: &RatedReview) -> String {
    let reviewer = if r.reviewer_name.is_empty() {
        String::new()
    } else {
        quote(&r.reviewer_name)
    };
    let sentiment = r.sentiment.map(|s| s.as_str()).unwrap_or_default();
    // failed items carry confidence 0 and export an empty cell
    let confidence = match r.confidence {
        Some(c) if c > 0.0 => format!("{:.1}%", c * 100.0),
        _ => String::new(),
    };
    [reviewer, quote(&r.review), sentiment.to_string(), confidence].join(",")
}

/// Header plus one line per review, `\n`-separated, no trailing newline.
pub fn ratings_csv(rating: &AggregatedRating) -> String {
    std::iter::once(CSV_HEADER.to_string())
        .chain(rating.reviews.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<title>_ratings.csv` with whitespace runs as `_` and anything outside
/// `[A-Za-z0-9._-]` dropped, so it is always a valid header value.
pub fn csv_file_name(movie_title: &str) -> String {
    let joined = WHITESPACE_RUN.replace_all(movie_title, "_");
    let safe: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    format!("{safe}_ratings.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::{SentimentLabel, SentimentResult};

    fn rating(reviews: Vec<RatedReview>) -> AggregatedRating {
        AggregatedRating {
            id: uuid::Uuid::new_v4(),
            movie_title: "Alien".into(),
            aggregate_score: 0.0,
            review_count: 0,
            sentiment_distribution: Default::default(),
            aspect_averages: Default::default(),
            reviews,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn quotes_are_doubled_and_fields_wrapped() {
        let ok = RatedReview::pending("Kim \"K\" Lee", "Said \"wow\", twice")
            .succeeded(&SentimentResult::new(SentimentLabel::Positive, 0.856));
        let csv = ratings_csv(&rating(vec![ok]));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            r#""Kim ""K"" Lee","Said ""wow"", twice",positive,85.6%"#
        );
    }

    #[test]
    fn failed_and_anonymous_rows_leave_cells_empty() {
        let failed = RatedReview::pending("", "lost").failed("Analysis failed: timeout");
        let csv = ratings_csv(&rating(vec![failed]));
        assert_eq!(csv, format!("{CSV_HEADER}\n,\"lost\",,"));
    }

    #[test]
    fn header_only_without_reviews() {
        assert_eq!(ratings_csv(&rating(Vec::new())), CSV_HEADER);
    }

    #[test]
    fn file_name_collapses_whitespace_and_drops_unsafe_chars() {
        assert_eq!(csv_file_name("The  Dark\tKnight"), "The_Dark_Knight_ratings.csv");
        assert_eq!(csv_file_name("Amélie: \"Le\" Film"), "Amlie_Le_Film_ratings.csv");
    }
}
