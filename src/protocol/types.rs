//! Entity types streamed by the agentic search backend
//!
//! These mirror the JSON payloads carried inside `result` and `complete`
//! frames. Identity fields matter downstream: `CompanyResult::domain` is the
//! display identity, `PartnerSuggestion` carries both the `slug` used for
//! selection and the numeric `partner_id` needed by the campaign write calls.

use serde::{Deserialize, Serialize};

/// A named stage in the streaming search lifecycle, declared by the server
/// in each `result` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Idle,
    Connecting,
    Interpreting,
    Searching,
    Ranking,
    Results,
    Suggesting,
    PartnerSuggestion,
    SuggestionsComplete,
    Insights,
    Complete,
    Error,
}

impl SearchPhase {
    /// Position in the documented linear progression
    ///
    /// The server may skip phases (e.g. no partner suggestions were
    /// requested) but never legitimately moves backwards.
    pub fn rank(&self) -> u8 {
        match self {
            SearchPhase::Idle => 0,
            SearchPhase::Connecting => 1,
            SearchPhase::Interpreting => 2,
            SearchPhase::Searching => 3,
            SearchPhase::Ranking => 4,
            SearchPhase::Results => 5,
            SearchPhase::Suggesting => 6,
            SearchPhase::PartnerSuggestion => 7,
            SearchPhase::SuggestionsComplete => 8,
            SearchPhase::Insights => 9,
            SearchPhase::Complete => 10,
            SearchPhase::Error => 11,
        }
    }

    /// Terminal phases accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchPhase::Complete | SearchPhase::Error)
    }

    /// Whether `next` is an allowed successor of this phase
    ///
    /// Forward-or-equal transitions only; `Error` is reachable from any
    /// non-terminal phase; nothing leaves a terminal phase.
    pub fn allows_successor(&self, next: SearchPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == SearchPhase::Error {
            return true;
        }
        next.rank() >= self.rank()
    }

    /// Human-readable label used in CLI output and thinking-step summaries
    pub fn label(&self) -> &'static str {
        match self {
            SearchPhase::Idle => "idle",
            SearchPhase::Connecting => "connecting",
            SearchPhase::Interpreting => "interpreting",
            SearchPhase::Searching => "searching",
            SearchPhase::Ranking => "ranking",
            SearchPhase::Results => "results",
            SearchPhase::Suggesting => "suggesting",
            SearchPhase::PartnerSuggestion => "partner_suggestion",
            SearchPhase::SuggestionsComplete => "suggestions_complete",
            SearchPhase::Insights => "insights",
            SearchPhase::Complete => "complete",
            SearchPhase::Error => "error",
        }
    }
}

/// Server-derived understanding of the query, delivered during `interpreting`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    pub intent: String,
    #[serde(default)]
    pub semantic_query: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// One detected interest for a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopInterest {
    pub category: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub strength: f64,
}

/// A company streamed during the `results` phase
///
/// `domain` is the unique identity within a session. The aggregator only
/// appends; dedup by domain is a presentation concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyResult {
    #[serde(default)]
    pub company_id: i64,
    pub domain: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub employee_count: Option<u64>,
    #[serde(default)]
    pub logo_base64: Option<String>,
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub top_interests: Vec<TopInterest>,
}

/// A partner returned as a direct search match (tagged `entity_type: "partner"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerResult {
    pub partner_id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Why a suggested partner matched a detected interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedInterest {
    pub interest: String,
    #[serde(default)]
    pub contribution: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// A partner proposed by the server based on detected company interests,
/// distinct from a partner returned as a direct search match
///
/// Both identities are retained: the creation transaction needs the numeric
/// `partner_id`, selection-set membership uses the `slug`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerSuggestion {
    pub partner_id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub matched_interests: Vec<MatchedInterest>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Interest frequency entry from the suggestion summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestFrequency {
    pub interest: String,
    pub frequency: u64,
}

/// Summary attached to the `complete` frame when suggestions were produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSummary {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub based_on_interests: Vec<InterestFrequency>,
}

/// Free-text observations delivered once at the `insights` phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub observation: String,
    #[serde(default)]
    pub suggested_queries: Vec<String>,
    #[serde(default)]
    pub refinement_tips: Vec<String>,
}
