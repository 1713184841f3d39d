use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Poster shown when the user submits an entry without one.
pub const PLACEHOLDER_POSTER: &str = "https://via.placeholder.com/300?text=No+Poster";

/// Rating bounds. Scores are kept to one decimal place.
pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 10.0;

/// Genres that are always offered in the tag picker, before anything the
/// data or the session adds.
pub const BASE_TAGS: [&str; 8] = [
    "action",
    "animation",
    "comedy",
    "drama",
    "horror",
    "mystery",
    "romance",
    "scifi",
];

/// One logged movie, as stored in the backing sheet.
///
/// `tags` stays a comma-joined string end to end; the sheet holds it that
/// way and splitting is only done where a tag list is actually needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRecord {
    pub title: String,
    pub poster_url: String,
    pub rating: f64,
    pub tags: String,
    pub review: String,
    /// `YYYY-MM-DD`, set once at creation and never rewritten.
    pub created_at: String,
}

/// Form payload for creating an entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub poster_url: String,
    pub rating: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub review: String,
}

/// Form payload for editing an entry. Only these three fields are mutable;
/// title, poster and creation date are fixed at append time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieUpdate {
    pub rating: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub review: String,
}

impl NewMovie {
    /// Build the record that will be appended: empty poster falls back to
    /// the placeholder, the rating is clamped, tags are comma-joined and
    /// `created_at` is stamped with today's date.
    pub fn into_record(self) -> MovieRecord {
        let poster_url = if self.poster_url.trim().is_empty() {
            PLACEHOLDER_POSTER.to_string()
        } else {
            self.poster_url
        };

        MovieRecord {
            title: self.title,
            poster_url,
            rating: clamp_rating(self.rating),
            tags: join_tags(&self.tags),
            review: self.review,
            created_at: today(),
        }
    }
}

/// Today's date in the sheet's `YYYY-MM-DD` format.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Clamp a rating into `[RATING_MIN, RATING_MAX]` and round to one decimal.
pub fn clamp_rating(rating: f64) -> f64 {
    let clamped = rating.clamp(RATING_MIN, RATING_MAX);
    (clamped * 10.0).round() / 10.0
}

/// Render a rating for a sheet cell: `9` rather than `9.0`, `8.5` as is.
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        format!("{:.1}", rating)
    }
}

/// Parse a rating cell. Ratings written by other tools may be blank or
/// junk; those read as the minimum rather than failing the whole listing.
pub fn parse_rating(cell: &str) -> f64 {
    cell.trim().parse::<f64>().map(clamp_rating).unwrap_or(RATING_MIN)
}

/// Join selected tags into the stored comma-separated form, dropping
/// empties and surrounding whitespace.
pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a stored tag field back into individual tags.
pub fn split_tags(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// The tag vocabulary offered by the pickers: the fixed base set, every tag
/// observed in existing records, and the session's custom tags, sorted.
///
/// Custom tags are suggestion-only scratch state; they live in memory for
/// the lifetime of the process and are only persisted once attached to a
/// record.
pub fn available_tags(movies: &[MovieRecord], custom: &[String]) -> Vec<String> {
    let mut all: BTreeSet<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();

    for movie in movies {
        for tag in split_tags(&movie.tags) {
            all.insert(tag);
        }
    }

    for tag in custom {
        let tag = tag.trim();
        if !tag.is_empty() {
            all.insert(tag.to_string());
        }
    }

    all.into_iter().collect()
}
