//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::TopicRegistry;
use crate::service::VoteService;
use crate::ws::{Broadcaster, ConnectionSettings, SubscriptionManager};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Vote notification entry point.
    pub vote_service: VoteService,
    /// Owner of all live WebSocket connections.
    pub subscriptions: Arc<SubscriptionManager>,
}

impl AppState {
    /// Wires the registry, subscription manager, broadcaster, and vote
    /// service together.
    #[must_use]
    pub fn new(settings: ConnectionSettings) -> Self {
        let registry = Arc::new(TopicRegistry::new());
        let subscriptions = Arc::new(SubscriptionManager::new(registry, settings));
        let broadcaster = Broadcaster::new(Arc::clone(&subscriptions));
        Self {
            vote_service: VoteService::new(broadcaster),
            subscriptions,
        }
    }
}
