//! User identities and the user-lookup collaborator.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Read-only view of the signed-in user, projected from a valid session on
/// every request. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub tier: String,
    pub company_id: String,
}

impl AuthenticatedUser {
    /// Storage prefix owned by this user's company (or the user alone).
    pub fn owner_prefix(&self) -> &str {
        if self.company_id.is_empty() {
            &self.id
        } else {
            &self.company_id
        }
    }
}

/// Available to handlers behind `require_authenticated`.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// A user as known to the back office's own records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub tier: String,
    pub company_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("user repository unavailable: {0}")]
    Unavailable(String),
}

/// User lookups outside the session.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
}

/// Process-local user directory, keyed by user id.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, UserRecord>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory seeded from a JSON array of user records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<UserRecord> = serde_json::from_str(json)?;
        let repo = Self::new();
        for record in records {
            repo.insert(record);
        }
        Ok(repo)
    }

    pub fn insert(&self, record: UserRecord) {
        self.users.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.users.get(id).map(|e| e.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self
            .users
            .iter()
            .find(|e| e.value().email.eq_ignore_ascii_case(email))
            .map(|e| e.value().clone()))
    }
}
