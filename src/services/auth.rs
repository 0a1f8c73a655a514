//! Authentication service client.
//!
//! The auth server issues the bearer token as a plain-text body on
//! successful authentication and a plain-text message on registration.

use super::{body_text, response_error};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct AuthenticateRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Default role for self-service signups
    pub roles: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Option<String>,
}

pub trait AuthApi {
    /// Exchange credentials for an opaque bearer token.
    fn authenticate(&self, username: &str, password: &str) -> Result<String>;
    /// Register a new account; returns the server's confirmation message.
    fn register(&self, req: &RegisterRequest) -> Result<String>;
    /// Fetch the profile for an identity (the token's subject).
    fn fetch_profile(&self, identity: &str, token: &str) -> Result<UserProfile>;
}

pub struct AuthClient {
    base_url: String,
    agent: ureq::Agent,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

impl AuthApi for AuthClient {
    fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let url = format!("{}/auth/authenticate", self.base_url);
        let resp = self
            .agent
            .post(&url)
            .send_json(serde_json::to_value(AuthenticateRequest {
                username,
                password,
            })?)
            .map_err(|e| response_error("authentication", e))?;
        let token = body_text("authentication", resp)?;
        Ok(token.trim().to_string())
    }

    fn register(&self, req: &RegisterRequest) -> Result<String> {
        let url = format!("{}/auth/new", self.base_url);
        let resp = self
            .agent
            .post(&url)
            .send_json(serde_json::to_value(req)?)
            .map_err(|e| response_error("registration", e))?;
        body_text("registration", resp)
    }

    fn fetch_profile(&self, identity: &str, token: &str) -> Result<UserProfile> {
        let url = format!("{}/auth/fetchByEmail/{}", self.base_url, identity);
        let resp = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .call()
            .map_err(|e| response_error("profile lookup", e))?;
        let profile: UserProfile = resp.into_json()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_deserializes_backend_shape() {
        let json = r#"{"userId": 12, "name": "alice", "email": "alice@example.com", "roles": "ROLE_USER"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.user_id, 12);
        assert_eq!(profile.roles.as_deref(), Some("ROLE_USER"));
    }

    #[test]
    fn test_profile_tolerates_missing_roles() {
        let json = r#"{"userId": 3, "name": "bob", "email": "bob@example.com"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert!(profile.roles.is_none());
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = AuthClient::new("http://localhost:7777/");
        assert_eq!(client.base_url, "http://localhost:7777");
    }
}
