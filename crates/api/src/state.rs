use std::sync::Arc;

use propdesk_events::EventBus;
use propdesk_storage::FallbackStorage;

use crate::ai::AnthropicClient;
use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateLimiter;

/// Shared state handed to every handler via `State<AppState>`.
///
/// Cheap to clone: everything is behind an `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: propdesk_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub event_bus: Arc<EventBus>,
    pub storage: Arc<FallbackStorage>,
    pub rate_limiter: Arc<RateLimiter>,
    /// `None` when no API key is configured; AI endpoints answer 503.
    pub ai: Option<Arc<AnthropicClient>>,
}
