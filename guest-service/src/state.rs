use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;

/// Everything a handler needs, built once at startup and shared by the router
pub struct AppState<G, N> {
    pub guests: Arc<G>,
    pub messages: Arc<N>,
    pub store_timeout: Duration,
    pub allow_raw_filters: bool,
}

impl<G, N> AppState<G, N> {
    pub fn new(guests: Arc<G>, messages: Arc<N>, store_timeout: Duration) -> Self {
        Self {
            guests,
            messages,
            store_timeout,
            allow_raw_filters: true,
        }
    }

    pub fn with_raw_filters(mut self, allowed: bool) -> Self {
        self.allow_raw_filters = allowed;
        self
    }

    /// Gate for the endpoints that evaluate caller-supplied filters
    pub fn require_raw_filters(&self) -> Result<(), AppError> {
        if self.allow_raw_filters {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Raw filter queries are disabled on this deployment".into(),
            ))
        }
    }
}
