//! Integration tests driving the real session facade against an in-process
//! WebSocket server, plus the wizard end to end.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;

use prospector::api::{
    ApiError, BulkAddResult, BulkCompanyAssignResult, CampaignApi, CampaignCreate, CampaignRead,
    PartnerBulkAssignResult, PartnerSummary, ProductSummary,
};
use prospector::session::{SearchOptions, SearchSession, SearchSettings, SessionEvent};
use prospector::wizard::{CampaignWizard, CreatePhase, WizardStep};
use prospector::SearchPhase;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a scripted search server; the frames sent depend on the query text.
///
/// Every connection gets an `ack` echoing the request id, then the script
/// for whichever keyword the query contains. Received search requests are
/// recorded in arrival order so tests can assert on the wire queries.
async fn spawn_server() -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&requests);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let recorder = Arc::clone(&recorder);
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

                let request: serde_json::Value = loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => break serde_json::from_str(&text).unwrap(),
                        Some(Ok(_)) => continue,
                        _ => return,
                    }
                };
                let request_id = request["request_id"].as_str().unwrap().to_string();
                let query = request["query"].as_str().unwrap().to_string();
                recorder.lock().unwrap().push(request);

                let send = |value: serde_json::Value| Message::Text(value.to_string().into());

                ws.send(send(json!({"type": "ack", "request_id": request_id})))
                    .await
                    .unwrap();

                if query.contains("slow") {
                    ws.send(send(company_frame("slow-one.com", 1))).await.unwrap();
                    sleep(Duration::from_millis(800)).await;
                    let _ = ws.send(send(company_frame("slow-two.com", 2))).await;
                    let _ = ws
                        .send(send(json!({
                            "type": "complete", "total_results": 2, "partner_results": 0,
                            "search_time_ms": 900
                        })))
                        .await;
                } else if query.contains("broken") {
                    ws.send(send(company_frame("partial.com", 1))).await.unwrap();
                    ws.send(send(json!({"type": "error", "message": "index unavailable"})))
                        .await
                        .unwrap();
                } else if query.contains("garbled") {
                    ws.send(Message::Text("this is not json".into())).await.unwrap();
                    ws.send(send(company_frame("fine.com", 1))).await.unwrap();
                    ws.send(send(json!({
                        "type": "complete", "total_results": 1, "partner_results": 0,
                        "search_time_ms": 5
                    })))
                    .await
                    .unwrap();
                } else {
                    ws.send(send(json!({
                        "type": "result", "phase": "interpreting",
                        "interpretation": {"intent": "find fintech companies", "keywords": ["fintech"]}
                    })))
                    .await
                    .unwrap();
                    ws.send(send(company_frame("alpha.com", 10))).await.unwrap();
                    ws.send(send(company_frame("beta.com", 11))).await.unwrap();
                    ws.send(send(json!({
                        "type": "result", "phase": "partner_suggestion",
                        "partner": {
                            "partner_id": 4, "slug": "acme", "name": "Acme Consulting",
                            "match_score": 0.8,
                            "matched_interests": [{"interest": "payments", "reasoning": "payments practice"}]
                        }
                    })))
                    .await
                    .unwrap();
                    ws.send(send(json!({
                        "type": "result", "phase": "suggestions_complete",
                        "based_on_interests": [{"interest": "payments", "frequency": 2}]
                    })))
                    .await
                    .unwrap();
                    ws.send(send(json!({
                        "type": "complete", "total_results": 2, "partner_results": 0,
                        "search_time_ms": 120,
                        "suggested_queries": ["fintech in europe"]
                    })))
                    .await
                    .unwrap();
                }
                let _ = ws.close(None).await;
            });
        }
    });

    (format!("ws://{addr}"), requests)
}

fn company_frame(domain: &str, id: i64) -> serde_json::Value {
    json!({
        "type": "result", "phase": "results",
        "company": {"company_id": id, "domain": domain, "name": domain, "match_score": 0.9}
    })
}

async fn session_for(url: &str) -> Arc<SearchSession> {
    Arc::new(SearchSession::new(SearchSettings::new(url)))
}

/// Drain events until a terminal one arrives
async fn wait_terminal(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> SessionEvent {
    loop {
        let event = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        if event.is_terminal() {
            return event;
        }
    }
}

#[tokio::test]
async fn test_full_stream_aggregates_into_snapshot() {
    let (url, _requests) = spawn_server().await;
    let session = session_for(&url).await;
    let mut rx = session.subscribe();

    session.search("fintech companies", SearchOptions::default()).await.unwrap();
    let terminal = wait_terminal(&mut rx).await;
    assert!(matches!(terminal, SessionEvent::Completed { total_results: 2, .. }));

    let state = session.snapshot().await;
    assert_eq!(state.phase, SearchPhase::Complete);
    assert_eq!(state.companies.len(), 2);
    assert_eq!(state.companies[0].domain, "alpha.com");
    assert_eq!(state.partner_suggestions.len(), 1);
    assert_eq!(state.partner_suggestions[0].slug, "acme");
    assert_eq!(state.interest_summary.len(), 1);
    assert_eq!(state.suggested_queries, vec!["fintech in europe".to_string()]);
    assert_eq!(state.interpretation.as_ref().unwrap().intent, "find fintech companies");
    assert_eq!(state.search_time_ms, 120);
    assert_eq!(state.quarantined, 0);
    assert!(!session.is_searching().await);
}

#[tokio::test]
async fn test_supersession_only_latest_stream_lands() {
    let (url, _requests) = spawn_server().await;
    let session = session_for(&url).await;
    let mut rx = session.subscribe();

    session.search("slow query", SearchOptions::default()).await.unwrap();
    // Let the slow stream deliver its first company
    sleep(Duration::from_millis(300)).await;

    session.search("fintech companies", SearchOptions::default()).await.unwrap();
    wait_terminal(&mut rx).await;

    // Give the superseded slow stream time to finish talking to a wall
    sleep(Duration::from_millis(900)).await;

    let state = session.snapshot().await;
    assert_eq!(state.phase, SearchPhase::Complete);
    let domains: Vec<&str> = state.companies.iter().map(|c| c.domain.as_str()).collect();
    assert_eq!(domains, ["alpha.com", "beta.com"]);
}

#[tokio::test]
async fn test_midstream_error_freezes_results() {
    let (url, _requests) = spawn_server().await;
    let session = session_for(&url).await;
    let mut rx = session.subscribe();

    session.search("broken index", SearchOptions::default()).await.unwrap();
    let terminal = wait_terminal(&mut rx).await;
    assert!(matches!(terminal, SessionEvent::Failed { .. }));

    let state = session.snapshot().await;
    assert_eq!(state.phase, SearchPhase::Error);
    assert_eq!(state.error.as_deref(), Some("index unavailable"));
    // Results received before the error stay visible
    assert_eq!(state.companies.len(), 1);
}

#[tokio::test]
async fn test_malformed_frame_is_dropped_not_fatal() {
    let (url, _requests) = spawn_server().await;
    let session = session_for(&url).await;
    let mut rx = session.subscribe();

    session.search("garbled stream", SearchOptions::default()).await.unwrap();
    wait_terminal(&mut rx).await;

    let state = session.snapshot().await;
    assert_eq!(state.phase, SearchPhase::Complete);
    assert_eq!(state.companies.len(), 1);
    // Decode failures are dropped silently, not quarantined
    assert_eq!(state.quarantined, 0);
}

#[tokio::test]
async fn test_unreachable_server_fails_the_session() {
    let session = session_for("ws://127.0.0.1:1/ws/search").await;
    let mut rx = session.subscribe();

    session.search("anything", SearchOptions::default()).await.unwrap();
    let terminal = wait_terminal(&mut rx).await;
    assert!(matches!(terminal, SessionEvent::Failed { .. }));

    let state = session.snapshot().await;
    assert_eq!(state.phase, SearchPhase::Error);
}

/// Recording CampaignApi for driving the wizard without a REST backend
#[derive(Default)]
struct ScriptedApi {
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CampaignApi for ScriptedApi {
    async fn create_campaign(&self, body: &CampaignCreate) -> Result<CampaignRead, ApiError> {
        self.record(format!("create:{}", body.name));
        Ok(CampaignRead {
            id: 1,
            slug: "fintech-q3".to_string(),
            name: body.name.clone(),
            product_id: body.product_id,
        })
    }

    async fn add_companies_bulk(&self, slug: &str, domains: &[String]) -> Result<BulkAddResult, ApiError> {
        self.record(format!("companies:{slug}:{}", domains.join(",")));
        Ok(BulkAddResult {
            added: domains.len() as u64,
            skipped: 0,
        })
    }

    async fn list_partners(&self) -> Result<Vec<PartnerSummary>, ApiError> {
        self.record("list_partners".to_string());
        Ok(vec![])
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>, ApiError> {
        self.record("list_products".to_string());
        Ok(vec![])
    }

    async fn bulk_assign_partners(&self, slug: &str, partner_ids: &[i64]) -> Result<PartnerBulkAssignResult, ApiError> {
        self.record(format!("partners:{slug}:{partner_ids:?}"));
        Ok(PartnerBulkAssignResult {
            assigned: partner_ids.len() as u64,
        })
    }

    async fn bulk_assign_companies_to_partner(
        &self,
        slug: &str,
        partner_id: i64,
        company_ids: &[i64],
    ) -> Result<BulkCompanyAssignResult, ApiError> {
        self.record(format!("distribute:{slug}:{partner_id}:{company_ids:?}"));
        Ok(BulkCompanyAssignResult {
            assigned: company_ids.len() as u64,
        })
    }
}

#[tokio::test]
async fn test_wizard_end_to_end() {
    let (url, _requests) = spawn_server().await;
    let session = session_for(&url).await;
    let mut rx = session.subscribe();
    let api = Arc::new(ScriptedApi::default());
    let mut wizard = CampaignWizard::new(session.clone(), api.clone());

    wizard.submit_query("fintech companies").await;
    loop {
        let event = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
        let terminal = event.is_terminal();
        wizard.observe(event).await;
        if terminal {
            break;
        }
    }
    assert!(wizard.search_error().is_none());
    assert!(!wizard.thinking().is_empty());

    assert!(wizard.continue_to_partners().await);
    assert_eq!(wizard.step(), WizardStep::Partners);
    // The suggestion from the stream is preselected
    assert_eq!(wizard.selected_partners(), ["acme"]);

    wizard.finalize_partners();
    assert_eq!(wizard.create_phase(), Some(CreatePhase::Naming));
    wizard.submit_name("Fintech Q3");

    let slug = wizard.create_campaign().await.unwrap().unwrap();
    assert_eq!(slug, "fintech-q3");

    let calls = api.call_log();
    assert!(calls.contains(&"create:Fintech Q3".to_string()));
    assert!(calls.contains(&"companies:fintech-q3:alpha.com,beta.com".to_string()));
    assert!(calls.contains(&"partners:fintech-q3:[4]".to_string()));
    // Both companies go to the single selected partner
    assert!(calls.contains(&"distribute:fintech-q3:4:[10, 11]".to_string()));
}

#[tokio::test]
async fn test_product_change_resends_joined_history() {
    let (url, requests) = spawn_server().await;
    let session = session_for(&url).await;
    let mut rx = session.subscribe();
    let api = Arc::new(ScriptedApi::default());
    let mut wizard = CampaignWizard::new(session.clone(), api);

    wizard.submit_query("fintech companies").await;
    wait_terminal(&mut rx).await;
    wizard.submit_query("only payments startups").await;
    wait_terminal(&mut rx).await;

    wizard.change_product(3, "Payments API").await;
    wait_terminal(&mut rx).await;

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);

    let joined = "fintech companies\n\n---\n\n**Update:**\nonly payments startups";
    // The refinement already searches the joined history
    assert_eq!(requests[1]["query"], joined);
    // The product switch re-issues the same joined history with the product attached
    assert_eq!(requests[2]["query"], joined);
    assert_eq!(requests[2]["product_id"], 3);
    // The first two requests carried no product
    assert!(requests[0].get("product_id").is_none());
}
