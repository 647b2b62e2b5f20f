//! Client configuration for the sync subsystem.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::is_http_url;

/// Default page size for list refreshes.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Resolved client configuration.
///
/// Values are validated at construction so the rest of the crate can treat
/// them as well-formed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the journal API, without a trailing slash.
    pub api_base_url: String,
    /// Page size for list refreshes.
    pub page_size: usize,
    /// Directory holding the local record store and detail cache blobs.
    pub data_dir: PathBuf,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url.into().as_str())?,
            page_size: DEFAULT_PAGE_SIZE,
            data_dir: data_dir.into(),
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Trim and validate an API base URL, dropping any trailing slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidInput(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}
