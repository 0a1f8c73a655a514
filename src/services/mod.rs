//! HTTP clients for the backend collaborators.
//!
//! One module per service, each behind a trait so flows can be exercised
//! with mocks in tests. All authenticated calls present the raw bearer
//! token; errors carry the HTTP status and body for the user-facing message
//! and are never retried automatically.

pub mod auth;
pub mod orders;
pub mod payments;
pub mod restaurants;

use anyhow::{anyhow, Result};

/// Map a ureq response error into a descriptive failure.
pub(crate) fn response_error(context: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            anyhow!("{} failed with HTTP {}: {}", context, code, body)
        }
        e => anyhow!("{} request failed: {}", context, e),
    }
}

/// Read a plain-text response body.
pub(crate) fn body_text(context: &str, resp: ureq::Response) -> Result<String> {
    resp.into_string()
        .map_err(|e| anyhow!("{} returned an unreadable body: {}", context, e))
}
