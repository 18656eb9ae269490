//! Three-step campaign wizard
//!
//! `Audience` (iterative search refinement) -> `Partners` (selection) ->
//! `Create` (name it, then run the creation transaction). The wizard owns
//! the conversation log and the selection set; search state lives in the
//! [`SearchSession`] it holds.

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, warn};

use super::chat::{ChatLog, ChatMessage, thinking_steps};
use super::create::{self, CampaignDraft, CreateError};
use crate::api::{CampaignApi, PartnerSummary};
use crate::session::{SearchOptions, SearchSession, SessionEvent};

/// Separator between successive queries in the joined search history
///
/// Each refinement is sent to the backend as the full history joined with
/// this marker, so the interpreter sees the whole conversation.
const HISTORY_SEPARATOR: &str = "\n\n---\n\n**Update:**\n";

/// How many catalog partners to preselect when the search suggested none
const FALLBACK_PARTNER_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Audience,
    Partners,
    Create,
}

/// Sub-states of the final step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatePhase {
    Naming,
    Ready,
    Creating,
}

pub struct CampaignWizard {
    session: Arc<SearchSession>,
    api: Arc<dyn CampaignApi>,
    step: WizardStep,
    chat: ChatLog,
    search_history: Vec<String>,
    /// Placeholder message to un-flag when the current search finishes
    searching_message_id: Option<String>,
    thinking: Vec<String>,
    search_error: Option<String>,
    product_id: Option<i64>,
    product_name: Option<String>,
    /// Selected partner slugs, in selection order
    selected_partners: Vec<String>,
    /// Suggestions are auto-selected exactly once per wizard run
    auto_selected: bool,
    catalog: Vec<PartnerSummary>,
    create_phase: Option<CreatePhase>,
    campaign_name: String,
    create_error: Option<String>,
}

impl CampaignWizard {
    pub fn new(session: Arc<SearchSession>, api: Arc<dyn CampaignApi>) -> Self {
        Self {
            session,
            api,
            step: WizardStep::Audience,
            chat: ChatLog::new(),
            search_history: Vec::new(),
            searching_message_id: None,
            thinking: Vec::new(),
            search_error: None,
            product_id: None,
            product_name: None,
            selected_partners: Vec::new(),
            auto_selected: false,
            catalog: Vec::new(),
            create_phase: None,
            campaign_name: String::new(),
            create_error: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn chat(&self) -> &[ChatMessage] {
        self.chat.messages()
    }

    pub fn selected_partners(&self) -> &[String] {
        &self.selected_partners
    }

    pub fn catalog(&self) -> &[PartnerSummary] {
        &self.catalog
    }

    pub fn create_phase(&self) -> Option<CreatePhase> {
        self.create_phase
    }

    pub fn campaign_name(&self) -> &str {
        &self.campaign_name
    }

    pub fn thinking(&self) -> &[String] {
        &self.thinking
    }

    pub fn search_error(&self) -> Option<&str> {
        self.search_error.as_deref()
    }

    pub fn create_error(&self) -> Option<&str> {
        self.create_error.as_deref()
    }

    fn joined_history(&self) -> String {
        self.search_history.join(HISTORY_SEPARATOR)
    }

    /// Submit a query (or a refinement of the previous ones)
    ///
    /// The whole history is re-sent joined, so every refinement searches the
    /// accumulated intent rather than the last fragment alone.
    pub async fn submit_query(&mut self, query: impl Into<String>) {
        if self.step != WizardStep::Audience {
            return;
        }
        let query = query.into();
        if query.trim().is_empty() {
            return;
        }
        self.search_history.push(query.clone());
        self.chat.push(ChatMessage::user(query));
        self.start_search().await;
    }

    /// Switch products; re-runs the accumulated history against the new one
    pub async fn change_product(&mut self, product_id: i64, product_name: impl Into<String>) {
        if self.step != WizardStep::Audience {
            return;
        }
        self.product_id = Some(product_id);
        self.product_name = Some(product_name.into());
        if self.search_history.is_empty() {
            return;
        }
        self.chat.push(
            ChatMessage::system(format!(
                "Switched product, re-running the search for {}.",
                self.product_name.as_deref().unwrap_or("the new product")
            ))
            .product_selection(),
        );
        self.start_search().await;
    }

    async fn start_search(&mut self) {
        self.search_error = None;
        let placeholder = self.chat.push(ChatMessage::system("Searching...").searching());
        self.searching_message_id = Some(placeholder);

        let options = SearchOptions {
            product_id: self.product_id,
            ..Default::default()
        };
        if let Err(err) = self.session.search(self.joined_history(), options).await {
            warn!(%err, "CampaignWizard: search rejected");
            self.search_error = Some(err.to_string());
            self.finish_placeholder();
        }
    }

    /// Fold one session event into the wizard
    pub async fn observe(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Completed {
                total_results,
                partner_results,
            } => {
                self.finish_placeholder();
                let snapshot = self.session.snapshot().await;
                self.thinking = thinking_steps(&snapshot.phase_trail);
                debug!(total_results, partner_results, "CampaignWizard: search complete");
                self.chat.push(ChatMessage::system(format!(
                    "Found {} companies and {} partner suggestions.",
                    snapshot.companies.len(),
                    snapshot.partner_suggestions.len()
                )));
            }
            SessionEvent::Failed { message } => {
                self.finish_placeholder();
                self.search_error = Some(message.clone());
                self.chat
                    .push(ChatMessage::system(format!("Search failed: {message}")));
            }
            // Incremental events render from snapshots, nothing to fold here
            _ => {}
        }
    }

    fn finish_placeholder(&mut self) {
        if let Some(id) = self.searching_message_id.take() {
            self.chat.finish_searching(&id);
        }
    }

    /// Move to partner selection; no-op while empty or still searching
    pub async fn continue_to_partners(&mut self) -> bool {
        if self.step != WizardStep::Audience {
            return false;
        }
        let snapshot = self.session.snapshot().await;
        if snapshot.companies.is_empty() || snapshot.is_searching() {
            return false;
        }

        self.step = WizardStep::Partners;
        self.chat.push(
            ChatMessage::system(format!(
                "Audience locked in: {} companies. Now pick the partners to work it with.",
                snapshot.companies.len()
            ))
            .stage_transition(),
        );

        match self.api.list_partners().await {
            Ok(catalog) => self.catalog = catalog,
            Err(err) => warn!(%err, "CampaignWizard: partner catalog fetch failed"),
        }

        if !self.auto_selected {
            self.auto_selected = true;
            if snapshot.partner_suggestions.is_empty() {
                self.selected_partners = self
                    .catalog
                    .iter()
                    .take(FALLBACK_PARTNER_COUNT)
                    .map(|p| p.slug.clone())
                    .collect();
            } else {
                self.selected_partners = snapshot
                    .partner_suggestions
                    .iter()
                    .map(|s| s.slug.clone())
                    .collect();
            }
        }
        true
    }

    /// Flip a partner in or out of the selection
    pub fn toggle_partner(&mut self, slug: &str) {
        if self.step != WizardStep::Partners {
            return;
        }
        if let Some(pos) = self.selected_partners.iter().position(|s| s == slug) {
            self.selected_partners.remove(pos);
        } else {
            self.selected_partners.push(slug.to_string());
        }
    }

    /// Lock the partner selection and move to naming
    pub fn finalize_partners(&mut self) {
        if self.step != WizardStep::Partners {
            return;
        }
        self.step = WizardStep::Create;
        self.create_phase = Some(CreatePhase::Naming);
        self.campaign_name = self.default_campaign_name();
        self.chat.push(
            ChatMessage::system(format!(
                "{} partners selected. Give the campaign a name.",
                self.selected_partners.len()
            ))
            .stage_transition(),
        );
    }

    fn default_campaign_name(&self) -> String {
        let date = Local::now().format("%Y-%m-%d");
        match &self.product_name {
            Some(product) => format!("{product} Campaign - {date}"),
            None => format!("New Campaign - {date}"),
        }
    }

    /// Accept a campaign name; blank keeps the generated default
    pub fn submit_name(&mut self, name: &str) {
        if self.create_phase != Some(CreatePhase::Naming) {
            return;
        }
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            self.campaign_name = trimmed.to_string();
        }
        self.chat.push(ChatMessage::user(self.campaign_name.clone()));
        self.chat.push(ChatMessage::system(format!(
            "Ready to create '{}'.",
            self.campaign_name
        )));
        self.create_phase = Some(CreatePhase::Ready);
    }

    /// Run the creation transaction; only available from `Ready`
    ///
    /// On failure the wizard returns to `Ready` so the user can retry;
    /// whatever steps already succeeded stay applied on the server.
    pub async fn create_campaign(&mut self) -> Option<Result<String, CreateError>> {
        if self.step != WizardStep::Create || self.create_phase != Some(CreatePhase::Ready) {
            return None;
        }
        self.create_phase = Some(CreatePhase::Creating);
        self.create_error = None;

        let snapshot = self.session.snapshot().await;
        let draft = CampaignDraft {
            name: self.campaign_name.clone(),
            product_id: self.product_id,
            company_domains: snapshot.companies.iter().map(|c| c.domain.clone()).collect(),
            company_ids: snapshot
                .companies
                .iter()
                .map(|c| c.company_id)
                .filter(|id| *id > 0)
                .collect(),
            selected_slugs: self.selected_partners.clone(),
            suggestions: snapshot.partner_suggestions.clone(),
        };

        match create::execute(self.api.as_ref(), &draft).await {
            Ok(outcome) => {
                self.chat.push(ChatMessage::system(format!(
                    "Campaign '{}' created with {} companies.",
                    outcome.campaign.name, outcome.companies_added
                )));
                Some(Ok(outcome.campaign.slug))
            }
            Err(err) => {
                self.create_error = Some(err.to_string());
                self.create_phase = Some(CreatePhase::Ready);
                self.chat
                    .push(ChatMessage::system(format!("Campaign creation failed: {err}")));
                Some(Err(err))
            }
        }
    }
}
