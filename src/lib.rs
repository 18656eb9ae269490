//! Prospector - streaming agentic search client and campaign wizard
//!
//! Prospector talks to a sales-prospecting backend over one duplex WebSocket
//! connection per search, folds the phase-tagged result stream into a
//! consistent session state, and feeds the aggregated audience into a
//! three-step campaign-creation wizard backed by REST writes.
//!
//! # Core Concepts
//!
//! - **One connection per search**: a new query supersedes the previous
//!   stream atomically; a stale stream can never mutate the new session
//! - **Append-only aggregation**: results only accumulate until a terminal
//!   phase freezes the session
//! - **Forward-only phases**: frames that would move the session backwards
//!   are quarantined, not applied
//! - **Recorded transaction progress**: campaign creation is a non-atomic
//!   write sequence whose partial progress is always reported
//!
//! # Modules
//!
//! - [`protocol`] - Wire types and the message decoder
//! - [`session`] - Connection management, state machine, event bus
//! - [`wizard`] - The audience/partners/create workflow
//! - [`api`] - REST collaborators for campaign writes
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod protocol;
pub mod session;
pub mod wizard;

// Re-export commonly used types
pub use api::{ApiError, CampaignApi, HttpApiClient};
pub use config::{ApiConfig, Config, SearchConfig};
pub use protocol::{
    CompanyResult, Insights, Interpretation, PartnerResult, PartnerSuggestion, SearchPhase, SearchRequest,
    ServerMessage,
};
pub use session::{SearchEventBus, SearchOptions, SearchSession, SearchSettings, SessionEvent, SessionState};
pub use wizard::{CampaignDraft, CampaignWizard, CreateError, CreatePhase, CreateStep, WizardStep, round_robin};
