//! # astrodiff environment state
//!
//! This module defines [`crate::env_state::AstrodiffEnv`], the **shared environment object**
//! passed to the parts of the pipeline that talk to the remote catalogue
//! service. It owns a persistent [`ureq::Agent`] HTTP client with a global
//! timeout, so the per-tile workers reuse one connection pool instead of
//! opening a fresh session per query.
//!
//! The object is cheaply cloneable and is shared read-only between workers.
use std::time::Duration;

use ureq::Agent;

use crate::astrodiff_errors::AstrodiffError;

/// Shared environment handed to the remote catalogue fetcher.
///
/// # Fields
///
/// * `http_client` - A ureq agent used to perform the cone-search requests
#[derive(Debug, Clone)]
pub struct AstrodiffEnv {
    pub http_client: Agent,
}

impl Default for AstrodiffEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl AstrodiffEnv {
    /// Create a new environment with a default HTTP client.
    ///
    /// Return
    /// ------
    /// * A new environment object with a 30 second global request timeout
    pub fn new() -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        let agent: Agent = config.into();

        AstrodiffEnv { http_client: agent }
    }

    /// Perform a GET request and return the response body as text.
    ///
    /// Arguments
    /// ---------
    /// * `url`: the full URL to request, query string included
    ///
    /// Return
    /// ------
    /// * The response body, or an [`AstrodiffError::UreqHttpError`] on any
    ///   transport or status failure (no retry is attempted)
    pub(crate) fn get_from_url(&self, url: &str) -> Result<String, AstrodiffError> {
        let mut response = self.http_client.get(url).call()?;
        let body = response.body_mut().read_to_string()?;
        Ok(body)
    }
}
