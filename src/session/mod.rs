//! Search session facade
//!
//! [`SearchSession`] owns at most one live connection. Starting a new search
//! supersedes the previous one atomically: the generation counter is bumped
//! and the state reset under the same lock, so a reader task spawned for an
//! older generation can observe that it is stale but can never mutate the new
//! session's state.

mod connection;
pub mod events;
mod state;

pub use connection::{Connection, ConnectionError, ws_endpoint};
pub use events::{SearchEventBus, SessionEvent};
pub use state::SessionState;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::{EntityType, SearchPhase, SearchRequest, ServerMessage};

/// Default number of results requested per search
pub const DEFAULT_LIMIT: u32 = 20;

/// Default number of partner suggestions requested per search
pub const DEFAULT_SUGGESTION_LIMIT: u32 = 5;

/// Default overall search timeout
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced directly by [`SearchSession`] methods
///
/// Transport and protocol failures are not returned here; they arrive as a
/// terminal `Error` phase through the event bus.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} must be positive")]
    InvalidLimit(&'static str),
}

/// Connection parameters shared by every search issued through one facade
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Full WebSocket endpoint, see [`ws_endpoint`]
    pub endpoint: String,
    pub limit: u32,
    pub partner_suggestion_limit: u32,
    pub include_partner_suggestions: bool,
    /// A session that never reaches a terminal phase within this window is
    /// failed with a synthetic timeout error
    pub timeout: Duration,
}

impl SearchSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            limit: DEFAULT_LIMIT,
            partner_suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            include_partner_suggestions: true,
            timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

/// Per-search overrides; unset fields fall back to [`SearchSettings`]
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<u32>,
    pub partner_suggestion_limit: Option<u32>,
    pub include_partner_suggestions: Option<bool>,
    pub product_id: Option<i64>,
    pub entity_types: Option<Vec<EntityType>>,
    pub context: HashMap<String, serde_json::Value>,
}

struct Shared {
    /// Bumped on every search/cancel/reset; reader tasks carry the value
    /// they were spawned with and stop once it no longer matches
    generation: u64,
    state: SessionState,
    /// Reader task for the live connection, if any. Aborting it drops the
    /// connection, which closes the socket without waiting for the server.
    reader: Option<tokio::task::JoinHandle<()>>,
}

impl Shared {
    /// Supersede the live stream: bump the generation and tear down its
    /// reader. Callers hold the lock, so no frame can slip in between.
    fn supersede(&mut self) -> u64 {
        self.generation += 1;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.generation
    }
}

/// Outcome of folding one frame into the shared state
enum Applied {
    Stale,
    Ongoing,
    Terminal,
}

pub struct SearchSession {
    shared: Arc<Mutex<Shared>>,
    bus: Arc<SearchEventBus>,
    settings: SearchSettings,
}

impl SearchSession {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                state: SessionState::new(),
                reader: None,
            })),
            bus: Arc::new(SearchEventBus::default()),
            settings,
        }
    }

    /// Start a search, superseding any live one
    ///
    /// Returns the request id issued for this search. The stream is consumed
    /// on a background task; observe progress via [`subscribe`](Self::subscribe)
    /// and [`snapshot`](Self::snapshot).
    pub async fn search(
        &self,
        query: impl Into<String>,
        options: SearchOptions,
    ) -> Result<String, SessionError> {
        let limit = options.limit.unwrap_or(self.settings.limit);
        let suggestion_limit = options
            .partner_suggestion_limit
            .unwrap_or(self.settings.partner_suggestion_limit);
        if limit == 0 {
            return Err(SessionError::InvalidLimit("limit"));
        }
        if suggestion_limit == 0 {
            return Err(SessionError::InvalidLimit("partner suggestion limit"));
        }

        let request_id = format!("search-{}", Uuid::now_v7());
        let request = SearchRequest {
            query: query.into(),
            entity_types: options
                .entity_types
                .unwrap_or_else(|| vec![EntityType::Companies, EntityType::Partners]),
            limit,
            include_partner_suggestions: options
                .include_partner_suggestions
                .unwrap_or(self.settings.include_partner_suggestions),
            partner_suggestion_limit: suggestion_limit,
            product_id: options.product_id,
            context: options.context,
            request_id: request_id.clone(),
        };

        let shared = Arc::clone(&self.shared);
        let bus = Arc::clone(&self.bus);
        let endpoint = self.settings.endpoint.clone();
        let timeout = self.settings.timeout;

        // Supersede, reset, and install the new reader under one lock: the
        // old stream's task is aborted (closing its socket) before the new
        // state exists, so no window with two current streams is possible.
        let mut guard = self.shared.lock().await;
        let generation = guard.supersede();
        guard.state = SessionState::for_request(&request_id);
        debug!(%request_id, generation, "SearchSession: starting search");
        guard.reader = Some(tokio::spawn(async move {
            let stream = drive_stream(&endpoint, request, generation, &shared, &bus);
            match tokio::time::timeout(timeout, stream).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(%err, generation, "SearchSession: transport failure");
                    apply_failure(&shared, &bus, generation, "search connection failed").await;
                }
                Err(_) => {
                    warn!(generation, "SearchSession: search timed out");
                    apply_failure(&shared, &bus, generation, "search timed out").await;
                }
            }
        }));

        Ok(request_id)
    }

    /// Stop the current search, keeping accumulated results
    ///
    /// A user-initiated stop is not an error: the phase returns to `Idle`
    /// and everything received so far stays visible.
    pub async fn cancel(&self) {
        let mut shared = self.shared.lock().await;
        let generation = shared.supersede();
        shared.state.phase = SearchPhase::Idle;
        shared.state.request_id = None;
        debug!(generation, "SearchSession: cancelled");
    }

    /// Discard everything and return to the initial state
    pub async fn reset(&self) {
        let mut shared = self.shared.lock().await;
        let generation = shared.supersede();
        shared.state = SessionState::new();
        debug!(generation, "SearchSession: reset");
    }

    /// Current state, cloned
    pub async fn snapshot(&self) -> SessionState {
        self.shared.lock().await.state.clone()
    }

    pub async fn is_searching(&self) -> bool {
        self.shared.lock().await.state.is_searching()
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Preload state without a connection (for wizard tests)
    #[cfg(test)]
    pub(crate) async fn set_state_for_tests(&self, state: SessionState) {
        self.shared.lock().await.state = state;
    }
}

/// Consume one connection's stream into the shared state
async fn drive_stream(
    endpoint: &str,
    request: SearchRequest,
    generation: u64,
    shared: &Arc<Mutex<Shared>>,
    bus: &Arc<SearchEventBus>,
) -> Result<(), ConnectionError> {
    let mut conn = Connection::open(endpoint, &request).await?;

    loop {
        let Some(raw) = conn.next_frame().await? else {
            // Server closed without a terminal frame
            apply_failure(shared, bus, generation, "connection closed before completion").await;
            return Ok(());
        };
        let msg = match ServerMessage::decode(&raw) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(%err, "SearchSession: dropping malformed frame");
                continue;
            }
        };
        match apply(shared, bus, generation, msg).await {
            Applied::Ongoing => {}
            Applied::Terminal | Applied::Stale => {
                conn.close().await;
                return Ok(());
            }
        }
    }
}

/// Fold one frame under the generation guard, then publish the events
async fn apply(
    shared: &Arc<Mutex<Shared>>,
    bus: &Arc<SearchEventBus>,
    generation: u64,
    msg: ServerMessage,
) -> Applied {
    let (events, terminal) = {
        let mut shared = shared.lock().await;
        if shared.generation != generation {
            debug!(
                generation,
                current = shared.generation,
                "SearchSession: dropping frame from superseded stream"
            );
            return Applied::Stale;
        }
        let events = shared.state.reduce(msg);
        (events, shared.state.phase.is_terminal())
    };
    for event in events {
        bus.emit(event);
    }
    if terminal { Applied::Terminal } else { Applied::Ongoing }
}

async fn apply_failure(
    shared: &Arc<Mutex<Shared>>,
    bus: &Arc<SearchEventBus>,
    generation: u64,
    message: &str,
) {
    apply(
        shared,
        bus,
        generation,
        ServerMessage::Error {
            message: message.to_string(),
            code: None,
        },
    )
    .await;
}
