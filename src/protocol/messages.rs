//! Wire messages for the `/ws/search` protocol
//!
//! JSON frames over one long-lived WebSocket connection, one connection per
//! search. The client sends a single [`SearchRequest`] immediately after
//! connect, then receives zero or more [`ServerMessage`] frames until a
//! terminal `error` or `complete`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{
    CompanyResult, Insights, InterestFrequency, Interpretation, PartnerResult, PartnerSuggestion,
    SearchPhase, SuggestionSummary,
};

/// Entity families the search can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Companies,
    Partners,
}

/// The request sent once, immediately after the connection opens
///
/// `request_id` is caller-generated and unique per logical search; the server
/// echoes it in the initial `ack` so acknowledgements can be correlated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub entity_types: Vec<EntityType>,
    pub limit: u32,
    pub include_partner_suggestions: bool,
    pub partner_suggestion_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    pub request_id: String,
}

/// The `partner` payload of a `result` frame
///
/// A direct match carries `entity_type: "partner"`; a suggestion does not,
/// so the tagged variant must be tried first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartnerPayload {
    Direct(TaggedPartnerResult),
    Suggestion(PartnerSuggestion),
}

/// A [`PartnerResult`] together with its wire discriminant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedPartnerResult {
    pub entity_type: PartnerTag,
    #[serde(flatten)]
    pub partner: PartnerResult,
}

/// Single-valued discriminant for direct partner results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerTag {
    Partner,
}

/// Messages from the search backend to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges the request; first frame of a healthy session
    Ack { request_id: String },

    /// A phase-tagged incremental result
    Result {
        phase: SearchPhase,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interpretation: Option<Interpretation>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        company: Option<CompanyResult>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partner: Option<PartnerPayload>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insights: Option<Insights>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        based_on_interests: Option<Vec<InterestFrequency>>,
    },

    /// Protocol-level failure; terminal
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Successful end of stream with the result summary; terminal
    Complete {
        total_results: u64,
        partner_results: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partner_suggestions: Option<Vec<PartnerSuggestion>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partner_suggestion_summary: Option<SuggestionSummary>,
        #[serde(default)]
        search_time_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggested_queries: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refinement_tips: Option<Vec<String>>,
    },
}

impl ServerMessage {
    /// Parse one inbound frame
    ///
    /// Failures are the caller's to log and drop: a single malformed frame
    /// must never abort an otherwise-healthy stream.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ack() {
        let msg = ServerMessage::decode(r#"{"type":"ack","request_id":"search-1"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Ack {
                request_id: "search-1".to_string()
            }
        );
    }

    #[test]
    fn test_decode_result_with_company() {
        let raw = r#"{
            "type": "result",
            "phase": "results",
            "company": {"domain": "a.com", "name": "A Corp", "match_score": 0.8}
        }"#;
        let msg = ServerMessage::decode(raw).unwrap();
        match msg {
            ServerMessage::Result { phase, company, partner, .. } => {
                assert_eq!(phase, SearchPhase::Results);
                assert_eq!(company.unwrap().domain, "a.com");
                assert!(partner.is_none());
            }
            other => panic!("Expected result frame, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_direct_partner_vs_suggestion() {
        let direct = r#"{
            "type": "result",
            "phase": "results",
            "partner": {"entity_type": "partner", "partner_id": 7, "slug": "acme-consulting", "name": "Acme Consulting"}
        }"#;
        match ServerMessage::decode(direct).unwrap() {
            ServerMessage::Result { partner: Some(PartnerPayload::Direct(tagged)), .. } => {
                assert_eq!(tagged.partner.partner_id, 7);
                assert_eq!(tagged.partner.slug, "acme-consulting");
            }
            other => panic!("Expected direct partner, got {other:?}"),
        }

        let suggestion = r#"{
            "type": "result",
            "phase": "partner_suggestion",
            "partner": {"partner_id": 9, "slug": "nimbus", "name": "Nimbus", "match_score": 0.7,
                        "matched_interests": [{"interest": "ai", "reasoning": "ML practice"}]}
        }"#;
        match ServerMessage::decode(suggestion).unwrap() {
            ServerMessage::Result { partner: Some(PartnerPayload::Suggestion(s)), .. } => {
                assert_eq!(s.slug, "nimbus");
                assert_eq!(s.matched_interests.len(), 1);
            }
            other => panic!("Expected suggestion, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_frame() {
        let msg = ServerMessage::decode(r#"{"type":"error","message":"upstream timeout"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                message: "upstream timeout".to_string(),
                code: None
            }
        );
    }

    #[test]
    fn test_decode_complete_minimal() {
        let raw = r#"{"type":"complete","total_results":3,"partner_results":0,"search_time_ms":412}"#;
        match ServerMessage::decode(raw).unwrap() {
            ServerMessage::Complete { total_results, partner_results, search_time_ms, suggested_queries, .. } => {
                assert_eq!(total_results, 3);
                assert_eq!(partner_results, 0);
                assert_eq!(search_time_ms, 412);
                assert!(suggested_queries.is_none());
            }
            other => panic!("Expected complete frame, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ServerMessage::decode("not json").is_err());
        assert!(ServerMessage::decode(r#"{"type":"unknown_kind"}"#).is_err());
    }

    #[test]
    fn test_request_serializes_wire_shape() {
        let request = SearchRequest {
            query: "fintech startups".to_string(),
            entity_types: vec![EntityType::Companies, EntityType::Partners],
            limit: 20,
            include_partner_suggestions: true,
            partner_suggestion_limit: 5,
            product_id: Some(3),
            context: HashMap::new(),
            request_id: "search-abc".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "fintech startups");
        assert_eq!(json["entity_types"][0], "companies");
        assert_eq!(json["limit"], 20);
        assert_eq!(json["request_id"], "search-abc");
    }
}
