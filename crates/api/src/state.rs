//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{
    EmailService, GooglePlacesClient, ImageHost, Messenger, ReviewsService, SmsClient,
};

/// Application state shared across all handlers.
///
/// Cheap to clone: everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    messenger: Messenger,
    image_host: Option<ImageHost>,
    reviews: ReviewsService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("base_url", &self.inner.config.base_url)
            .field("sms", &self.inner.messenger.sms_enabled())
            .field("email", &self.inner.messenger.email_enabled())
            .field("image_host", &self.inner.image_host.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state from configuration, creating a client for each
    /// configured third-party service.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(
        config: ApiConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let sms = config.twilio.clone().map(SmsClient::new);
        let email = config.email.as_ref().map(EmailService::new).transpose()?;
        let image_host = config.cloudinary.clone().map(ImageHost::new);
        let google = config.google_places.clone().map(GooglePlacesClient::new);

        Ok(Self::from_parts(
            config,
            pool,
            Messenger::new(sms, email),
            image_host,
            ReviewsService::new(google),
        ))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(
        config: ApiConfig,
        pool: PgPool,
        messenger: Messenger,
        image_host: Option<ImageHost>,
        reviews: ReviewsService,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                messenger,
                image_host,
                reviews,
            }),
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// SMS and email delivery.
    #[must_use]
    pub fn messenger(&self) -> &Messenger {
        &self.inner.messenger
    }

    /// Cloudinary client, if configured.
    #[must_use]
    pub fn image_host(&self) -> Option<&ImageHost> {
        self.inner.image_host.as_ref()
    }

    /// Cached reviews.
    #[must_use]
    pub fn reviews(&self) -> &ReviewsService {
        &self.inner.reviews
    }
}
