//! Customer reviews with a three-tier fallback.
//!
//! 1. Reviews persisted in the database.
//! 2. Live reviews from the Google Places API (when configured).
//! 3. A static list that is always available.
//!
//! The first tier with any reviews wins. Responses are cached in-process
//! with `moka`, each entry living as long as its tier's `Cache-Control`
//! max-age (a day for real reviews, an hour for the static list).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use moka::{Expiry, future::Cache};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GooglePlacesConfig;
use crate::db::ReviewRepository;
use crate::models::review::fallback_reviews;
use crate::models::{Review, ReviewSourceKind, ReviewsResponse};

const PLACES_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
const CACHE_KEY: &str = "reviews";

/// Errors from a review source.
#[derive(Debug, Error)]
pub enum ReviewsError {
    /// The review store could not be read.
    #[error("review store error: {0}")]
    Store(String),

    /// The Places API request failed.
    #[error("Google Places request failed: {0}")]
    Request(String),

    /// The Places API answered with a non-OK status.
    #[error("Google Places error: {0}")]
    Api(String),
}

/// Anything that can produce a list of reviews.
pub trait ReviewSource {
    /// Fetch reviews. An empty list means "nothing here, try the next tier".
    fn fetch(&self) -> impl Future<Output = Result<Vec<Review>, ReviewsError>> + Send;
}

/// Walk the fallback chain.
///
/// A store error is logged and treated as empty, as is a Places error.
pub async fn resolve_reviews<S, G>(store: &S, google: Option<&G>) -> ReviewsResponse
where
    S: ReviewSource + Sync,
    G: ReviewSource + Sync,
{
    match store.fetch().await {
        Ok(reviews) if !reviews.is_empty() => {
            return ReviewsResponse {
                reviews,
                source: ReviewSourceKind::Database,
            };
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load stored reviews"),
    }

    if let Some(google) = google {
        match google.fetch().await {
            Ok(reviews) if !reviews.is_empty() => {
                return ReviewsResponse {
                    reviews,
                    source: ReviewSourceKind::Google,
                };
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to fetch Google reviews"),
        }
    }

    ReviewsResponse {
        reviews: fallback_reviews(),
        source: ReviewSourceKind::Fallback,
    }
}

// =============================================================================
// Google Places
// =============================================================================

#[derive(Debug, Deserialize)]
struct PlaceDetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    #[serde(default)]
    reviews: Vec<PlaceReview>,
}

#[derive(Debug, Deserialize)]
struct PlaceReview {
    author_name: String,
    rating: i16,
    #[serde(default)]
    text: String,
    #[serde(default)]
    relative_time_description: Option<String>,
    #[serde(default)]
    profile_photo_url: Option<String>,
    /// Unix seconds.
    time: i64,
}

impl From<PlaceReview> for Review {
    fn from(review: PlaceReview) -> Self {
        Self {
            author_name: review.author_name,
            rating: review.rating,
            text: review.text,
            relative_time: review.relative_time_description,
            profile_photo_url: review.profile_photo_url,
            time: DateTime::<Utc>::from_timestamp(review.time, 0).unwrap_or_default(),
        }
    }
}

/// Client for the Google Places details endpoint.
#[derive(Clone)]
pub struct GooglePlacesClient {
    client: Client,
    config: GooglePlacesConfig,
}

impl std::fmt::Debug for GooglePlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePlacesClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GooglePlacesClient {
    /// Create a new Places client.
    #[must_use]
    pub fn new(config: GooglePlacesConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Newest reviews for the configured place.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API answers non-OK.
    #[instrument(skip(self), fields(place_id = %self.config.place_id))]
    pub async fn place_reviews(&self) -> Result<Vec<Review>, ReviewsError> {
        let url = url::Url::parse_with_params(
            PLACES_DETAILS_URL,
            &[
                ("place_id", self.config.place_id.as_str()),
                ("fields", "reviews"),
                ("reviews_sort", "newest"),
                ("key", self.config.api_key.expose_secret()),
            ],
        )
        .map_err(|e| ReviewsError::Request(e.to_string()))?;

        let details: PlaceDetailsResponse = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReviewsError::Request(e.to_string()))?
            .json()
            .await
            .map_err(|e| ReviewsError::Request(e.to_string()))?;

        if details.status != "OK" {
            return Err(ReviewsError::Api(
                details.error_message.unwrap_or(details.status),
            ));
        }

        let reviews: Vec<Review> = details
            .result
            .map(|place| place.reviews)
            .unwrap_or_default()
            .into_iter()
            .filter(|review| (1..=5).contains(&review.rating))
            .map(Review::from)
            .collect();

        debug!(count = reviews.len(), "Fetched Google reviews");
        Ok(reviews)
    }
}

impl ReviewSource for GooglePlacesClient {
    async fn fetch(&self) -> Result<Vec<Review>, ReviewsError> {
        self.place_reviews().await
    }
}

// =============================================================================
// Cached service
// =============================================================================

/// Per-entry expiry: each response lives as long as its source's TTL.
struct SourceExpiry;

impl Expiry<&'static str, Arc<ReviewsResponse>> for SourceExpiry {
    fn expire_after_create(
        &self,
        _key: &&'static str,
        value: &Arc<ReviewsResponse>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.source.ttl())
    }
}

/// Reviews with caching.
#[derive(Clone)]
pub struct ReviewsService {
    cache: Cache<&'static str, Arc<ReviewsResponse>>,
    google: Option<GooglePlacesClient>,
}

impl std::fmt::Debug for ReviewsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewsService")
            .field("google", &self.google)
            .finish_non_exhaustive()
    }
}

impl ReviewsService {
    /// Create the service; `google` enables the second tier.
    #[must_use]
    pub fn new(google: Option<GooglePlacesClient>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .expire_after(SourceExpiry)
            .build();
        Self { cache, google }
    }

    /// Reviews for the marketing site, cached.
    pub async fn reviews(&self, pool: &PgPool) -> Arc<ReviewsResponse> {
        if let Some(cached) = self.cache.get(&CACHE_KEY).await {
            debug!(source = ?cached.source, "Cache hit for reviews");
            return cached;
        }

        let store = ReviewRepository::new(pool);
        let response = Arc::new(resolve_reviews(&store, self.google.as_ref()).await);

        self.cache.insert(CACHE_KEY, Arc::clone(&response)).await;
        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Fixed(Result<Vec<Review>, &'static str>);

    impl ReviewSource for Fixed {
        async fn fetch(&self) -> Result<Vec<Review>, ReviewsError> {
            self.0
                .clone()
                .map_err(|e| ReviewsError::Store(e.to_string()))
        }
    }

    fn review(author: &str) -> Review {
        Review {
            author_name: author.to_string(),
            rating: 5,
            text: "Great".to_string(),
            relative_time: None,
            profile_photo_url: None,
            time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_store_wins_when_non_empty() {
        let store = Fixed(Ok(vec![review("db")]));
        let google = Fixed(Ok(vec![review("google")]));
        let response = resolve_reviews(&store, Some(&google)).await;
        assert_eq!(response.source, ReviewSourceKind::Database);
        assert_eq!(response.reviews[0].author_name, "db");
    }

    #[tokio::test]
    async fn test_google_used_when_store_empty() {
        let store = Fixed(Ok(vec![]));
        let google = Fixed(Ok(vec![review("google")]));
        let response = resolve_reviews(&store, Some(&google)).await;
        assert_eq!(response.source, ReviewSourceKind::Google);
    }

    #[tokio::test]
    async fn test_store_error_counts_as_empty() {
        let store = Fixed(Err("connection refused"));
        let google = Fixed(Ok(vec![review("google")]));
        let response = resolve_reviews(&store, Some(&google)).await;
        assert_eq!(response.source, ReviewSourceKind::Google);
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_else() {
        let store = Fixed(Ok(vec![]));
        let response = resolve_reviews(&store, None::<&Fixed>).await;
        assert_eq!(response.source, ReviewSourceKind::Fallback);
        assert_eq!(response.reviews, fallback_reviews());

        let google = Fixed(Err("quota"));
        let response = resolve_reviews(&store, Some(&google)).await;
        assert_eq!(response.source, ReviewSourceKind::Fallback);
    }

    #[test]
    fn test_cache_entry_lifetime_follows_source() {
        let expiry = SourceExpiry;
        let fallback = Arc::new(ReviewsResponse {
            reviews: vec![],
            source: ReviewSourceKind::Fallback,
        });
        assert_eq!(
            expiry.expire_after_create(&CACHE_KEY, &fallback, Instant::now()),
            Some(Duration::from_secs(3_600))
        );
    }

    #[test]
    fn test_place_review_conversion() {
        let place: PlaceReview = serde_json::from_value(serde_json::json!({
            "author_name": "Ana",
            "rating": 4,
            "text": "Solid",
            "relative_time_description": "a week ago",
            "time": 1_700_000_000
        }))
        .unwrap();
        let review = Review::from(place);
        assert_eq!(review.rating, 4);
        assert_eq!(review.relative_time.as_deref(), Some("a week ago"));
        assert_eq!(review.time.timestamp(), 1_700_000_000);
    }
}
