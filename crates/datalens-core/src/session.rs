//! Session state and route guarding
//!
//! The session is a plain value owned by the caller. Credential checks happen
//! elsewhere; this module only records the outcome and decides where a
//! navigation may go.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pages of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Login,
    Dashboard,
    Admin,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Admin => "/admin",
        }
    }

    /// Route for a URL path; unknown paths are `None`
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Dashboard),
            "/login" => Some(Route::Login),
            "/admin" => Some(Route::Admin),
            _ => None,
        }
    }
}

/// Outcome of a route check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
}

/// Who is signed in, if anyone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    token: Option<String>,
    username: Option<String>,
    signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A signed-out session
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful sign-in with the token the server issued
    pub fn sign_in(&mut self, username: impl Into<String>, token: impl Into<String>) {
        self.username = Some(username.into());
        self.token = Some(token.into());
        self.signed_in_at = Some(Utc::now());
    }

    /// Forget the signed-in user
    pub fn sign_out(&mut self) {
        *self = Self::default();
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn signed_in_at(&self) -> Option<DateTime<Utc>> {
        self.signed_in_at
    }
}

/// Decide whether a navigation to `route` may proceed
pub fn guard(route: Route, session: &Session) -> Access {
    match (session.is_authenticated(), route) {
        (false, Route::Login) => Access::Allow,
        (false, _) => Access::Redirect(Route::Login),
        (true, Route::Login) => Access::Redirect(Route::Dashboard),
        (true, _) => Access::Allow,
    }
}
