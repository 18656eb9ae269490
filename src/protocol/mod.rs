//! Protocol vocabulary for the streaming agentic search
//!
//! Shared by the connection layer and the session state machine; contains no
//! transport or aggregation logic.

mod messages;
mod types;

pub use messages::{EntityType, PartnerPayload, PartnerTag, SearchRequest, ServerMessage, TaggedPartnerResult};
pub use types::{
    CompanyResult, Insights, InterestFrequency, Interpretation, MatchedInterest, PartnerResult,
    PartnerSuggestion, SearchPhase, SuggestionSummary, TopInterest,
};
