//! Client-held sessions.
//!
//! The whole session travels in one HMAC-SHA256 signed cookie; there is no
//! server-side session table. `Session` is a fixed-schema record: a cookie
//! either decodes into a fully typed session or the request is treated as
//! anonymous.

pub mod cookie;
pub mod middleware;
pub mod store;

use serde::{Deserialize, Serialize};

/// Per-browser session state.
///
/// Fields are crate-private: only the lifecycle manager in
/// [`crate::auth::lifecycle`] populates them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(skip_serializing_if = "is_false")]
    pub(crate) authenticated: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) user_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) tier: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) company_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) access_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub(crate) id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) oauth_state: Option<String>,
}

/// Where a session sits in the login state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    LoginPending,
    Authenticated,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.oauth_state.as_deref().is_some_and(|s| !s.is_empty()) {
            SessionState::LoginPending
        } else if crate::auth::lifecycle::current_user(self).is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn has_id_token(&self) -> bool {
        !self.id_token.is_empty()
    }

    pub fn oauth_state(&self) -> Option<&str> {
        self.oauth_state.as_deref()
    }

    /// Drop every field, returning to `Anonymous`.
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new();
        assert!(session.is_empty());
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_pending_state() {
        let session = Session {
            oauth_state: Some("abc".into()),
            ..Session::default()
        };
        assert_eq!(session.state(), SessionState::LoginPending);
    }

    #[test]
    fn test_flag_without_fields_is_anonymous() {
        let session = Session {
            authenticated: true,
            user_id: "u-1".into(),
            ..Session::default()
        };
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[test]
    fn test_empty_fields_not_serialized() {
        let json = serde_json::to_value(Session::new()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session {
            authenticated: true,
            user_id: "u-1".into(),
            email: "a@example.com".into(),
            tier: "basic".into(),
            id_token: "it".into(),
            ..Session::default()
        };
        session.reset();
        assert!(session.is_empty());
    }
}
