//! Campaign creation transaction
//!
//! An ordered, non-atomic sequence of REST writes. There is no server-side
//! transaction and no compensation: a failure part-way through leaves the
//! earlier writes applied. [`CreateError`] therefore records exactly which
//! steps completed, so the caller can tell the user what state the campaign
//! is actually in.

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiError, CampaignApi, CampaignCreate, CampaignRead};
use crate::protocol::PartnerSuggestion;

/// Distribute `items` across `buckets` by index modulo
///
/// Partition sizes differ by at most one and every item lands in exactly
/// one bucket, in its original relative order.
pub fn round_robin<T: Clone>(items: &[T], buckets: usize) -> Vec<Vec<T>> {
    if buckets == 0 {
        return Vec::new();
    }
    let mut out: Vec<Vec<T>> = vec![Vec::new(); buckets];
    for (index, item) in items.iter().enumerate() {
        out[index % buckets].push(item.clone());
    }
    out
}

/// Everything the transaction needs, captured from the wizard state
#[derive(Debug, Clone)]
pub struct CampaignDraft {
    pub name: String,
    pub product_id: Option<i64>,
    /// Company identities for the bulk-add call
    pub company_domains: Vec<String>,
    /// Numeric company ids, for the per-partner distribution
    pub company_ids: Vec<i64>,
    /// Slugs of the partners the user selected
    pub selected_slugs: Vec<String>,
    /// Suggestions from the search session; first source for slug resolution
    pub suggestions: Vec<PartnerSuggestion>,
}

/// The ordered steps of the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    CreateCampaign,
    AddCompanies,
    ResolvePartners,
    AssignPartners,
    DistributeCompanies,
}

impl CreateStep {
    pub fn label(&self) -> &'static str {
        match self {
            CreateStep::CreateCampaign => "create campaign",
            CreateStep::AddCompanies => "add companies",
            CreateStep::ResolvePartners => "resolve partners",
            CreateStep::AssignPartners => "assign partners",
            CreateStep::DistributeCompanies => "distribute companies",
        }
    }
}

/// What made a step fail
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unknown partner slug: {0}")]
    UnknownPartner(String),
}

/// A step failed; `completed` lists the writes already applied
#[derive(Debug, Error)]
#[error("campaign creation failed at step '{}': {source}", step.label())]
pub struct CreateError {
    pub step: CreateStep,
    pub completed: Vec<CreateStep>,
    #[source]
    pub source: StepFailure,
}

/// Summary of a fully applied transaction
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub campaign: CampaignRead,
    pub companies_added: u64,
    pub partners_assigned: u64,
}

/// Run the transaction against `api`
///
/// Steps without work to do (no companies, no selected partners) are
/// skipped rather than recorded; the first failure aborts everything after
/// it. Step order matters: partners must exist on the campaign before
/// companies can be distributed to them.
pub async fn execute(api: &dyn CampaignApi, draft: &CampaignDraft) -> Result<CreateOutcome, CreateError> {
    let mut completed: Vec<CreateStep> = Vec::new();
    let fail = |step: CreateStep, completed: &[CreateStep], source: StepFailure| CreateError {
        step,
        completed: completed.to_vec(),
        source,
    };

    info!(name = %draft.name, companies = draft.company_domains.len(),
          partners = draft.selected_slugs.len(), "create_campaign: starting");

    // 1. create the campaign shell
    let campaign = api
        .create_campaign(&CampaignCreate {
            name: draft.name.clone(),
            product_id: draft.product_id,
        })
        .await
        .map_err(|e| fail(CreateStep::CreateCampaign, &completed, e.into()))?;
    completed.push(CreateStep::CreateCampaign);
    debug!(slug = %campaign.slug, "create_campaign: campaign created");

    // 2. bulk-add the audience
    let mut companies_added = 0;
    if !draft.company_domains.is_empty() {
        let result = api
            .add_companies_bulk(&campaign.slug, &draft.company_domains)
            .await
            .map_err(|e| fail(CreateStep::AddCompanies, &completed, e.into()))?;
        companies_added = result.added;
        completed.push(CreateStep::AddCompanies);
    }

    if draft.selected_slugs.is_empty() {
        return Ok(CreateOutcome {
            campaign,
            companies_added,
            partners_assigned: 0,
        });
    }

    // 3. resolve selected slugs to numeric ids, suggestions first
    let partner_ids = resolve_partner_ids(api, draft)
        .await
        .map_err(|e| fail(CreateStep::ResolvePartners, &completed, e))?;
    completed.push(CreateStep::ResolvePartners);

    // 4. attach the partners to the campaign
    api.bulk_assign_partners(&campaign.slug, &partner_ids)
        .await
        .map_err(|e| fail(CreateStep::AssignPartners, &completed, e.into()))?;
    completed.push(CreateStep::AssignPartners);

    // 5. spread the companies across the partners, round-robin
    if !draft.company_ids.is_empty() {
        let buckets = round_robin(&draft.company_ids, partner_ids.len());
        let calls = partner_ids
            .iter()
            .zip(&buckets)
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(&partner_id, bucket)| {
                api.bulk_assign_companies_to_partner(&campaign.slug, partner_id, bucket)
            });
        try_join_all(calls)
            .await
            .map_err(|e| fail(CreateStep::DistributeCompanies, &completed, e.into()))?;
        completed.push(CreateStep::DistributeCompanies);
    }

    info!(slug = %campaign.slug, companies_added, partners = partner_ids.len(),
          "create_campaign: done");
    Ok(CreateOutcome {
        campaign,
        companies_added,
        partners_assigned: partner_ids.len() as u64,
    })
}

async fn resolve_partner_ids(api: &dyn CampaignApi, draft: &CampaignDraft) -> Result<Vec<i64>, StepFailure> {
    let mut ids = Vec::with_capacity(draft.selected_slugs.len());
    let mut unresolved: Vec<&str> = Vec::new();
    for slug in &draft.selected_slugs {
        match draft.suggestions.iter().find(|s| s.slug == *slug) {
            Some(suggestion) => ids.push(suggestion.partner_id),
            None => unresolved.push(slug),
        }
    }
    if unresolved.is_empty() {
        return Ok(ids);
    }

    // Fall back to the catalog for slugs the search never suggested
    let catalog = api.list_partners().await?;
    for slug in unresolved {
        let partner = catalog
            .iter()
            .find(|p| p.slug == slug)
            .ok_or_else(|| StepFailure::UnknownPartner(slug.to_string()))?;
        ids.push(partner.id);
    }
    Ok(ids)
}
