//! Shared application state.

#![allow(missing_docs)]

use std::sync::Arc;

use content_poll_common::{TokenHasher, config::VotingConfig};
use content_poll_core::{AnalyticsService, VoteService};

/// Voter cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl From<&VotingConfig> for CookieSettings {
    fn from(config: &VotingConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.secure_cookie,
        }
    }
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub votes: VoteService,
    pub analytics: AnalyticsService,
    pub hasher: Arc<TokenHasher>,
    pub cookie: CookieSettings,
    /// Admin bearer token; admin endpoints answer 403 while unset.
    pub admin_token: Option<Arc<str>>,
}
