//! Triage API types and definitions
//!
//! This crate defines the request/response types for the patient triage
//! HTTP API, shared between the server and any client.

pub mod error;
pub mod requests;
pub mod responses;

pub use error::ApiError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use triage_core::PageRequest;

/// API version constant
pub const API_VERSION: &str = "v1";

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Check bounds and convert to a storage window
    pub fn to_page_request(&self) -> Result<PageRequest, ApiError> {
        if self.page < 1 {
            return Err(ApiError::invalid_field("page", "must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ApiError::invalid_field(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        Ok(PageRequest::new(self.page, self.page_size))
    }
}
