//! Session lifecycle: the persisted token and the in-memory session derived
//! from it.
//!
//! `SessionStore` is the only component that touches the token file.
//! `SessionContext` is the single writer of session state; everything else
//! reads the current `SessionState` through it.

use crate::token::{self, Claims, DecodeError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const TOKEN_FILE: &str = "session.token";

/// The current user's authentication state, derived from a bearer token.
/// Logged-in iff a subject is present; a token that fails to decode never
/// produces a partially populated session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    raw_token: Option<String>,
    subject: Option<String>,
    roles_raw: Option<String>,
    roles: BTreeSet<String>,
}

impl Session {
    pub fn logged_out() -> Self {
        Session::default()
    }

    fn from_claims(token: &str, claims: Claims) -> Self {
        Session {
            raw_token: Some(token.to_string()),
            subject: Some(claims.subject),
            roles_raw: claims.roles_raw,
            roles: claims.roles,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.subject.is_some()
    }

    /// The token's `sub` claim: canonical identity, used wherever the
    /// backend expects a username or an email.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn raw_token(&self) -> Option<&str> {
        self.raw_token.as_deref()
    }

    /// The roles claim verbatim, as the issuer wrote it
    pub fn roles_raw(&self) -> Option<&str> {
        self.roles_raw.as_deref()
    }

    /// Canonical role set parsed at decode time
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(&token::canonical_role(role))
    }
}

/// Owns the durable token file. All token persistence goes through here.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(state_dir: &Path) -> Self {
        SessionStore {
            path: state_dir.join(TOKEN_FILE),
        }
    }

    /// Read the persisted token, if any, and rebuild a session from it.
    /// A missing or undecodable token yields a logged-out session; an
    /// undecodable one is also removed so the next start is clean.
    pub fn load(&self) -> Session {
        let token = match fs::read_to_string(&self.path) {
            Ok(t) => t.trim().to_string(),
            Err(_) => return Session::logged_out(),
        };
        if token.is_empty() {
            self.clear();
            return Session::logged_out();
        }
        match token::decode(&token) {
            Ok(claims) => Session::from_claims(&token, claims),
            Err(err) => {
                eprintln!("Warning: discarding stored token: {}", err);
                self.clear();
                Session::logged_out()
            }
        }
    }

    /// Decode first, persist only on success. On decode failure the stored
    /// token is cleared and the error propagates: there is no partial state.
    pub fn save(&self, token: &str) -> Result<Session, DecodeError> {
        let claims = match token::decode(token) {
            Ok(c) => c,
            Err(err) => {
                self.clear();
                return Err(err);
            }
        };
        if let Err(err) = fs::write(&self.path, token) {
            // Degraded: the in-memory session is still valid for this run.
            eprintln!("Warning: failed to persist session token: {}", err);
        }
        Ok(Session::from_claims(token, claims))
    }

    /// Remove the persisted token. Idempotent; never fails.
    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Whether the start-up load has run yet. Consumers must not make role-gated
/// decisions while `Pending`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Pending,
    Ready(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Pending => None,
            SessionState::Ready(s) => Some(s),
        }
    }
}

/// Mediates login/logout and republishes the session to consumers.
/// Constructed once and passed by reference; only this type mutates the
/// session.
pub struct SessionContext {
    store: SessionStore,
    state: SessionState,
}

impl SessionContext {
    pub fn new(store: SessionStore) -> Self {
        SessionContext {
            store,
            state: SessionState::Pending,
        }
    }

    /// One-time start-up rehydration from the store.
    pub fn restore(&mut self) -> &Session {
        let session = self.store.load();
        self.state = SessionState::Ready(session);
        match &self.state {
            SessionState::Ready(s) => s,
            SessionState::Pending => unreachable!(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The current session, logged-out if the start-up load has not run.
    pub fn current(&self) -> Session {
        match &self.state {
            SessionState::Ready(s) => s.clone(),
            SessionState::Pending => Session::logged_out(),
        }
    }

    /// Accept a freshly issued token. On decode failure the session is
    /// forced logged-out before the error propagates, so a bad token can
    /// never leave a half-valid session behind.
    pub fn login(&mut self, token: &str) -> Result<&Session, DecodeError> {
        match self.store.save(token) {
            Ok(session) => {
                self.state = SessionState::Ready(session);
                match &self.state {
                    SessionState::Ready(s) => Ok(s),
                    SessionState::Pending => unreachable!(),
                }
            }
            Err(err) => {
                self.logout();
                Err(err)
            }
        }
    }

    /// Clear persisted and in-memory state. Idempotent.
    pub fn logout(&mut self) {
        self.store.clear();
        self.state = SessionState::Ready(Session::logged_out());
    }
}
