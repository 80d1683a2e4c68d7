//! Customer reviews shown on the marketing site.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A single review, whatever tier it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author_name: String,
    /// Star rating, 1-5.
    pub rating: i16,
    pub text: String,
    /// "2 weeks ago" style text supplied by the source.
    pub relative_time: Option<String>,
    pub profile_photo_url: Option<String>,
    /// When the review was written.
    pub time: DateTime<Utc>,
}

/// Which tier of the fallback chain produced the reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSourceKind {
    Database,
    Google,
    Fallback,
}

impl ReviewSourceKind {
    /// How long a response from this tier may be cached.
    #[must_use]
    pub const fn ttl(self) -> Duration {
        match self {
            Self::Database | Self::Google => Duration::from_secs(86_400),
            Self::Fallback => Duration::from_secs(3_600),
        }
    }

    /// `Cache-Control` header value for a response from this tier.
    #[must_use]
    pub const fn cache_control(self) -> &'static str {
        match self {
            Self::Database | Self::Google => "public, max-age=86400",
            Self::Fallback => "public, max-age=3600",
        }
    }
}

/// `GET /api/reviews` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<Review>,
    pub source: ReviewSourceKind,
}

/// (author, rating, text, relative time, unix seconds)
const FALLBACK: [(&str, i16, &str, &str, i64); 4] = [
    (
        "Maria G.",
        5,
        "The crew showed up on time, wrapped everything carefully and had the unit loaded in under an hour. Getting my things back was just as easy.",
        "a month ago",
        1_735_689_600,
    ),
    (
        "Daniel K.",
        5,
        "Booking took two minutes and the price was exactly what I was quoted. Would use again for my next move.",
        "2 months ago",
        1_733_011_200,
    ),
    (
        "Priya S.",
        5,
        "Friendly movers and great communication. I got a text when they were on the way and photos of my unit afterwards.",
        "3 months ago",
        1_730_419_200,
    ),
    (
        "James T.",
        4,
        "Smooth pickup and delivery. Rescheduling once was painless through the site.",
        "4 months ago",
        1_727_740_800,
    ),
];

/// The static list served when no other source has reviews.
#[must_use]
pub fn fallback_reviews() -> Vec<Review> {
    FALLBACK
        .iter()
        .map(|&(author, rating, text, relative, secs)| Review {
            author_name: author.to_string(),
            rating,
            text: text.to_string(),
            relative_time: Some(relative.to_string()),
            profile_photo_url: None,
            time: DateTime::UNIX_EPOCH + TimeDelta::seconds(secs),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_reviews_are_well_formed() {
        let reviews = fallback_reviews();
        assert!(!reviews.is_empty());
        assert!(reviews.iter().all(|r| (1..=5).contains(&r.rating)));
        assert!(reviews.iter().all(|r| !r.text.is_empty()));
    }

    #[test]
    fn test_source_ttls() {
        assert_eq!(ReviewSourceKind::Database.ttl(), Duration::from_secs(86_400));
        assert_eq!(ReviewSourceKind::Google.ttl(), Duration::from_secs(86_400));
        assert_eq!(ReviewSourceKind::Fallback.ttl(), Duration::from_secs(3_600));
        assert_eq!(ReviewSourceKind::Fallback.cache_control(), "public, max-age=3600");
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_value(ReviewSourceKind::Google).unwrap();
        assert_eq!(json, "google");
    }
}
