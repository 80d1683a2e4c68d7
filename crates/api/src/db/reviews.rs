//! Persisted reviews.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::Review;
use crate::services::reviews::{ReviewSource, ReviewsError};

/// Reviews returned per response.
pub const REVIEW_LIMIT: i64 = 20;

/// Repository for the `google_reviews` table.
#[derive(Clone)]
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent reviews first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            r"
            SELECT author_name, rating, text, relative_time, profile_photo_url,
                   review_time AS time
            FROM google_reviews
            ORDER BY review_time DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }
}

impl ReviewSource for ReviewRepository<'_> {
    async fn fetch(&self) -> Result<Vec<Review>, ReviewsError> {
        self.list_recent(REVIEW_LIMIT)
            .await
            .map_err(|e| ReviewsError::Store(e.to_string()))
    }
}
