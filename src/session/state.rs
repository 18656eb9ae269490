//! Session state machine and result aggregator
//!
//! [`SessionState::reduce`] is the authoritative fold: one inbound frame plus
//! the previous state yields the next state and a list of events. It performs
//! no I/O, which keeps the whole protocol surface testable without a socket.
//!
//! Phase transitions are validated against the documented progression instead
//! of trusting the server blindly: a frame whose phase would move the session
//! backwards, or that arrives after a terminal phase, is quarantined: counted
//! and reported, but never applied.

use serde::Serialize;

use super::events::SessionEvent;
use crate::protocol::{
    CompanyResult, Insights, InterestFrequency, Interpretation, PartnerPayload, PartnerResult,
    PartnerSuggestion, SearchPhase, ServerMessage,
};

/// The fold of everything received during one search session
///
/// Created at `Idle`, mutated monotonically (list accumulators only grow)
/// until `Complete` or `Error`, then frozen until reset.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub phase: SearchPhase,
    pub request_id: Option<String>,
    pub interpretation: Option<Interpretation>,
    pub companies: Vec<CompanyResult>,
    pub partners: Vec<PartnerResult>,
    pub partner_suggestions: Vec<PartnerSuggestion>,
    pub insights: Option<Insights>,
    pub interest_summary: Vec<InterestFrequency>,
    pub total_results: u64,
    pub partner_results: u64,
    pub search_time_ms: u64,
    pub suggested_queries: Vec<String>,
    pub refinement_tips: Vec<String>,
    pub error: Option<String>,
    /// Frames rejected by the transition table or after a terminal phase
    pub quarantined: u64,
    /// Ordered distinct phases observed, for the thinking-steps summary
    pub phase_trail: Vec<SearchPhase>,
}

impl SessionState {
    /// Fresh state with no pending request
    pub fn new() -> Self {
        Self {
            phase: SearchPhase::Idle,
            request_id: None,
            interpretation: None,
            companies: Vec::new(),
            partners: Vec::new(),
            partner_suggestions: Vec::new(),
            insights: None,
            interest_summary: Vec::new(),
            total_results: 0,
            partner_results: 0,
            search_time_ms: 0,
            suggested_queries: Vec::new(),
            refinement_tips: Vec::new(),
            error: None,
            quarantined: 0,
            phase_trail: Vec::new(),
        }
    }

    /// Fresh state expecting the acknowledgement of `request_id`
    pub fn for_request(request_id: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.request_id = Some(request_id.into());
        state
    }

    /// A session is searching in every phase except the reset and terminal ones
    pub fn is_searching(&self) -> bool {
        !matches!(
            self.phase,
            SearchPhase::Idle | SearchPhase::Complete | SearchPhase::Error
        )
    }

    /// Fold one inbound frame into this state
    ///
    /// Returns the events describing what changed; a quarantined frame yields
    /// exactly one `FrameQuarantined` and mutates nothing but the counter.
    pub fn reduce(&mut self, msg: ServerMessage) -> Vec<SessionEvent> {
        if self.phase.is_terminal() {
            return vec![self.quarantine(format!(
                "frame after terminal phase {}",
                self.phase.label()
            ))];
        }

        match msg {
            ServerMessage::Ack { request_id } => self.reduce_ack(request_id),
            ServerMessage::Result {
                phase,
                interpretation,
                company,
                partner,
                insights,
                based_on_interests,
            } => self.reduce_result(phase, interpretation, company, partner, insights, based_on_interests),
            ServerMessage::Error { message, .. } => self.reduce_error(message),
            ServerMessage::Complete {
                total_results,
                partner_results,
                partner_suggestions,
                partner_suggestion_summary,
                search_time_ms,
                suggested_queries,
                refinement_tips,
            } => self.reduce_complete(
                total_results,
                partner_results,
                partner_suggestions,
                partner_suggestion_summary,
                search_time_ms,
                suggested_queries,
                refinement_tips,
            ),
        }
    }

    fn reduce_ack(&mut self, request_id: String) -> Vec<SessionEvent> {
        match &self.request_id {
            Some(expected) if *expected != request_id => {
                return vec![self.quarantine(format!(
                    "ack for unknown request {request_id} (expected {expected})"
                ))];
            }
            None => {
                return vec![self.quarantine(format!("ack {request_id} with no request in flight"))];
            }
            Some(_) => {}
        }
        // The transition table applies to acks too: once the stream has
        // moved past Connecting, a duplicate or late ack is quarantined
        // instead of dragging the phase backwards.
        if !self.phase.allows_successor(SearchPhase::Connecting) {
            return vec![self.quarantine(format!("ack after phase {}", self.phase.label()))];
        }
        let mut events = Vec::new();
        if let Some(event) = self.set_phase(SearchPhase::Connecting) {
            events.push(event);
        }
        events
    }

    fn reduce_result(
        &mut self,
        phase: SearchPhase,
        interpretation: Option<Interpretation>,
        company: Option<CompanyResult>,
        partner: Option<PartnerPayload>,
        insights: Option<Insights>,
        based_on_interests: Option<Vec<InterestFrequency>>,
    ) -> Vec<SessionEvent> {
        if !self.phase.allows_successor(phase) {
            return vec![self.quarantine(format!(
                "phase {} does not follow {}",
                phase.label(),
                self.phase.label()
            ))];
        }

        let mut events = Vec::new();
        if let Some(event) = self.set_phase(phase) {
            events.push(event);
        }

        match phase {
            SearchPhase::Interpreting => {
                if let Some(interp) = interpretation {
                    self.interpretation = Some(interp.clone());
                    events.push(SessionEvent::InterpretationReceived(interp));
                }
            }
            SearchPhase::Results => {
                if let Some(company) = company {
                    self.companies.push(company.clone());
                    events.push(SessionEvent::CompanyAdded(company));
                }
                if let Some(PartnerPayload::Direct(tagged)) = partner {
                    self.partners.push(tagged.partner.clone());
                    events.push(SessionEvent::PartnerAdded(tagged.partner));
                }
            }
            SearchPhase::PartnerSuggestion => {
                if let Some(PartnerPayload::Suggestion(suggestion)) = partner {
                    self.partner_suggestions.push(suggestion.clone());
                    events.push(SessionEvent::SuggestionAdded(suggestion));
                }
            }
            SearchPhase::SuggestionsComplete => {
                if let Some(summary) = based_on_interests {
                    self.interest_summary = summary;
                }
            }
            SearchPhase::Insights => {
                if let Some(insights) = insights {
                    self.insights = Some(insights.clone());
                    events.push(SessionEvent::InsightsReceived(insights));
                }
            }
            // Progress-only phases carry no payload worth keeping
            _ => {}
        }

        events
    }

    fn reduce_error(&mut self, message: String) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(event) = self.set_phase(SearchPhase::Error) {
            events.push(event);
        }
        self.error = Some(message.clone());
        events.push(SessionEvent::Failed { message });
        events
    }

    #[allow(clippy::too_many_arguments)]
    fn reduce_complete(
        &mut self,
        total_results: u64,
        partner_results: u64,
        partner_suggestions: Option<Vec<PartnerSuggestion>>,
        partner_suggestion_summary: Option<crate::protocol::SuggestionSummary>,
        search_time_ms: u64,
        suggested_queries: Option<Vec<String>>,
        refinement_tips: Option<Vec<String>>,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(event) = self.set_phase(SearchPhase::Complete) {
            events.push(event);
        }
        self.total_results = total_results;
        self.partner_results = partner_results;
        self.search_time_ms = search_time_ms;
        self.suggested_queries = suggested_queries.unwrap_or_default();
        self.refinement_tips = refinement_tips.unwrap_or_default();
        // Summary fields replace streamed accumulators only when present
        if let Some(suggestions) = partner_suggestions
            && !suggestions.is_empty()
        {
            self.partner_suggestions = suggestions;
        }
        if let Some(summary) = partner_suggestion_summary {
            self.interest_summary = summary.based_on_interests;
        }
        events.push(SessionEvent::Completed {
            total_results,
            partner_results,
        });
        events
    }

    /// Record a phase change, keeping the distinct ordered trail
    fn set_phase(&mut self, next: SearchPhase) -> Option<SessionEvent> {
        if self.phase == next {
            return None;
        }
        let from = self.phase;
        self.phase = next;
        if !self.phase_trail.contains(&next) {
            self.phase_trail.push(next);
        }
        Some(SessionEvent::PhaseChanged { from, to: next })
    }

    fn quarantine(&mut self, reason: String) -> SessionEvent {
        self.quarantined += 1;
        SessionEvent::FrameQuarantined { reason }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
