//! Request and response bodies for the campaign REST API

use serde::{Deserialize, Serialize};

/// Standard paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub size: u64,
}

/// Body of `POST /api/v1/campaigns`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
}

/// A created or fetched campaign; `slug` addresses all follow-up writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRead {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub product_id: Option<i64>,
}

/// A partner from the catalog listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerSummary {
    pub id: i64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// A product from the catalog listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Result of bulk-adding companies to a campaign by domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkAddResult {
    #[serde(default)]
    pub added: u64,
    #[serde(default)]
    pub skipped: u64,
}

/// Result of bulk-assigning partners to a campaign
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerBulkAssignResult {
    #[serde(default)]
    pub assigned: u64,
}

/// Result of bulk-assigning companies to one campaign partner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkCompanyAssignResult {
    #[serde(default)]
    pub assigned: u64,
}
