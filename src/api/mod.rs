//! REST collaborators for campaign writes and catalog reads

mod client;
mod error;
mod types;

pub use client::{CampaignApi, HttpApiClient};
pub use error::ApiError;
pub use types::{
    BulkAddResult, BulkCompanyAssignResult, CampaignCreate, CampaignRead, PaginatedResponse,
    PartnerBulkAssignResult, PartnerSummary, ProductSummary,
};

#[cfg(test)]
pub use client::mock::MockApi;
