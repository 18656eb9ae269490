//! Campaign API trait and its HTTP implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    BulkAddResult, BulkCompanyAssignResult, CampaignCreate, CampaignRead, PaginatedResponse,
    PartnerBulkAssignResult, PartnerSummary, ProductSummary,
};

/// The campaign backend as seen by the wizard
///
/// The creation transaction and the wizard depend on this seam, not on
/// `reqwest`, so tests drive them with a scripted implementation.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn create_campaign(&self, body: &CampaignCreate) -> Result<CampaignRead, ApiError>;

    /// Add companies to a campaign, identified by domain
    async fn add_companies_bulk(&self, slug: &str, domains: &[String]) -> Result<BulkAddResult, ApiError>;

    async fn list_partners(&self) -> Result<Vec<PartnerSummary>, ApiError>;

    async fn list_products(&self) -> Result<Vec<ProductSummary>, ApiError>;

    async fn bulk_assign_partners(
        &self,
        slug: &str,
        partner_ids: &[i64],
    ) -> Result<PartnerBulkAssignResult, ApiError>;

    /// Assign companies to one partner within a campaign
    async fn bulk_assign_companies_to_partner(
        &self,
        slug: &str,
        partner_id: i64,
        company_ids: &[i64],
    ) -> Result<BulkCompanyAssignResult, ApiError>;
}

/// `reqwest`-backed [`CampaignApi`]
///
/// No automatic retry anywhere: campaign creation is not idempotent and a
/// duplicate would be worse than a reported failure.
pub struct HttpApiClient {
    base_url: String,
    http: Client,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Network)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(%path, "HttpApiClient: GET");
        let response = self.http.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(%path, "HttpApiClient: POST");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CampaignApi for HttpApiClient {
    async fn create_campaign(&self, body: &CampaignCreate) -> Result<CampaignRead, ApiError> {
        self.post_json("/api/v1/campaigns", body).await
    }

    async fn add_companies_bulk(&self, slug: &str, domains: &[String]) -> Result<BulkAddResult, ApiError> {
        self.post_json(
            &format!("/api/v1/campaigns/{slug}/companies/bulk"),
            &serde_json::json!({ "domains": domains }),
        )
        .await
    }

    async fn list_partners(&self) -> Result<Vec<PartnerSummary>, ApiError> {
        let page: PaginatedResponse<PartnerSummary> = self.get_json("/api/v1/partners").await?;
        Ok(page.items)
    }

    async fn list_products(&self) -> Result<Vec<ProductSummary>, ApiError> {
        let page: PaginatedResponse<ProductSummary> = self.get_json("/api/v1/products").await?;
        Ok(page.items)
    }

    async fn bulk_assign_partners(
        &self,
        slug: &str,
        partner_ids: &[i64],
    ) -> Result<PartnerBulkAssignResult, ApiError> {
        self.post_json(
            &format!("/api/v1/campaigns/{slug}/partners/bulk"),
            &serde_json::json!({ "partner_ids": partner_ids }),
        )
        .await
    }

    async fn bulk_assign_companies_to_partner(
        &self,
        slug: &str,
        partner_id: i64,
        company_ids: &[i64],
    ) -> Result<BulkCompanyAssignResult, ApiError> {
        self.post_json(
            &format!("/api/v1/campaigns/{slug}/partners/{partner_id}/companies/bulk"),
            &serde_json::json!({ "company_ids": company_ids }),
        )
        .await
    }
}
