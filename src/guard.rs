//! Route access decisions.
//!
//! `decide` is a pure function over the session state and a route's required
//! roles. Role matching is set intersection over canonical role tokens, so
//! "ADMIN" never matches a route requiring "SUPERADMIN".

use crate::session::SessionState;
use crate::token::canonical_role;
use std::collections::BTreeSet;

/// Navigation outcome for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Session load has not completed; render nothing, never guess
    Pending,
    Allow,
    RedirectLogin,
    RedirectUnauthorized,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Pending => "pending",
            Access::Allow => "allow",
            Access::RedirectLogin => "redirect-login",
            Access::RedirectUnauthorized => "redirect-unauthorized",
        }
    }
}

/// Decide whether the current session may enter a route requiring any of
/// `required_roles`. An empty requirement means a public route.
pub fn decide(state: &SessionState, required_roles: &BTreeSet<String>) -> Access {
    let Some(session) = state.session() else {
        return Access::Pending;
    };
    if required_roles.is_empty() {
        return Access::Allow;
    }
    if !session.is_logged_in() {
        return Access::RedirectLogin;
    }
    let matches = required_roles
        .iter()
        .any(|r| session.roles().contains(&canonical_role(r)));
    if matches {
        Access::Allow
    } else {
        Access::RedirectUnauthorized
    }
}

/// Required roles for a route path, mirroring the application's routing
/// surface. Unknown paths fall through to not-found, which is public.
pub fn required_roles(path: &str) -> BTreeSet<String> {
    let roles: &[&str] = match normalize_path(path) {
        "/" | "/about-us" | "/how-it-works" | "/partner-with-us" | "/unauthorized"
        | "/not-found" => &[],
        p if p.starts_with("/restaurant/") && p.ends_with("/menu") => &[],
        "/order" | "/checkout" | "/profile" => &["USER", "ADMIN"],
        "/admin-dashboard" | "/manage-restaurants" => &["ADMIN"],
        _ => &[],
    };
    roles.iter().map(|r| r.to_string()).collect()
}

fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// Convenience: decide access for a named route path.
pub fn decide_path(state: &SessionState, path: &str) -> Access {
    decide(state, &required_roles(path))
}
