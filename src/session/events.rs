//! Typed session events over a broadcast channel
//!
//! The state machine emits a sequence of events as it folds inbound frames;
//! consumers (the wizard, the CLI printer) subscribe instead of registering
//! ad hoc callbacks.

use tokio::sync::broadcast;
use tracing::debug;

use crate::protocol::{
    CompanyResult, Insights, Interpretation, PartnerResult, PartnerSuggestion, SearchPhase,
};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Everything observable about one search session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session moved to a new phase
    PhaseChanged { from: SearchPhase, to: SearchPhase },
    /// The server's interpretation of the query arrived
    InterpretationReceived(Interpretation),
    /// A company was appended to the result set
    CompanyAdded(CompanyResult),
    /// A direct partner match was appended
    PartnerAdded(PartnerResult),
    /// A partner suggestion was appended
    SuggestionAdded(PartnerSuggestion),
    /// Insights arrived
    InsightsReceived(Insights),
    /// The stream finished successfully
    Completed { total_results: u64, partner_results: u64 },
    /// The stream finished with a transport or protocol error
    Failed { message: String },
    /// A frame was rejected without mutating state
    FrameQuarantined { reason: String },
}

impl SessionEvent {
    /// Event type name, for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::PhaseChanged { .. } => "PhaseChanged",
            SessionEvent::InterpretationReceived(_) => "InterpretationReceived",
            SessionEvent::CompanyAdded(_) => "CompanyAdded",
            SessionEvent::PartnerAdded(_) => "PartnerAdded",
            SessionEvent::SuggestionAdded(_) => "SuggestionAdded",
            SessionEvent::InsightsReceived(_) => "InsightsReceived",
            SessionEvent::Completed { .. } => "Completed",
            SessionEvent::Failed { .. } => "Failed",
            SessionEvent::FrameQuarantined { .. } => "FrameQuarantined",
        }
    }

    /// Whether this event ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::Completed { .. } | SessionEvent::Failed { .. })
    }
}

/// Broadcast bus for session events
///
/// Emission is fire-and-forget: with no subscribers the event is dropped,
/// and a full channel drops the oldest events first.
#[derive(Debug)]
pub struct SearchEventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl SearchEventBus {
    /// Create a bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: SessionEvent) {
        debug!(event_type = event.event_type(), "SearchEventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SearchEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
