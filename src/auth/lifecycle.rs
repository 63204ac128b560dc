//! Session lifecycle manager.
//!
//! The only component that writes authentication fields into a [`Session`].
//! States move `Anonymous → LoginPending → Authenticated → Anonymous`, and
//! back to `Anonymous` from `LoginPending` whenever a callback fails.

use std::sync::Arc;

use crate::error::AuthError;
use crate::identity::{IdentityProvider, OAuthExchangeResult};
use crate::session::Session;
use crate::users::{AuthenticatedUser, UserRecord, UserRepository};

pub struct SessionManager<P> {
    provider: P,
    users: Arc<dyn UserRepository>,
    default_tier: String,
    post_logout_redirect: String,
}

impl<P: IdentityProvider> SessionManager<P> {
    pub fn new(
        provider: P,
        users: Arc<dyn UserRepository>,
        default_tier: impl Into<String>,
        post_logout_redirect: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            users,
            default_tier: default_tier.into(),
            post_logout_redirect: post_logout_redirect.into(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Begin a login. Whatever the session held before is replaced by the
    /// new pending state; returns the provider URL to redirect to.
    pub fn start_login(&self, session: &mut Session) -> String {
        let login = self.provider.begin_login();
        session.reset();
        session.oauth_state = Some(login.state);
        login.authorization_url
    }

    /// Finish a login from the provider callback.
    ///
    /// The stored state is single-use: it is consumed whether or not the
    /// exchange succeeds. Any adapter failure leaves the session anonymous.
    pub async fn complete_login(
        &self,
        session: &mut Session,
        code: &str,
        returned_state: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let Some(expected) = session.oauth_state.clone().filter(|s| !s.is_empty()) else {
            return Err(AuthError::NoPendingLogin);
        };
        session.oauth_state = None;

        let result = match self
            .provider
            .complete_login(code, returned_state, &expected)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                session.reset();
                return Err(e);
            }
        };

        let OAuthExchangeResult {
            access_token,
            id_token,
            user,
            ..
        } = result;
        let user = self.enrich(user).await;

        if user.id.is_empty() || user.email.is_empty() {
            session.reset();
            return Err(AuthError::TokenVerificationFailed(
                "ID token is missing subject or email".into(),
            ));
        }

        *session = Session {
            authenticated: true,
            user_id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            tier: user.tier.clone(),
            company_id: user.company_id.clone(),
            access_token,
            id_token,
            oauth_state: None,
        };

        tracing::info!(user_id = %user.id, tier = %user.tier, "Login completed");
        Ok(user)
    }

    /// Drop a pending login after a callback that carried no usable code.
    pub fn abandon_login(&self, session: &mut Session) {
        session.oauth_state = None;
    }

    pub fn current_user(&self, session: &Session) -> Option<AuthenticatedUser> {
        current_user(session)
    }

    /// End the session. Returns the provider logout URL when the session
    /// carried an ID token.
    pub fn logout(&self, session: &mut Session) -> Option<String> {
        let url = session
            .has_id_token()
            .then(|| self.provider.logout_url(&self.post_logout_redirect));
        session.reset();
        url
    }

    /// Fill tier and company from our own records when the token lacks them.
    async fn enrich(&self, mut user: AuthenticatedUser) -> AuthenticatedUser {
        if (user.tier.is_empty() || user.company_id.is_empty())
            && let Some(record) = self.lookup(&user).await
        {
            if user.tier.is_empty() {
                user.tier = record.tier;
            }
            if user.company_id.is_empty() {
                user.company_id = record.company_id;
            }
            if user.display_name.is_empty() {
                user.display_name = record.display_name;
            }
        }
        if user.tier.is_empty() {
            user.tier = self.default_tier.clone();
        }
        user
    }

    async fn lookup(&self, user: &AuthenticatedUser) -> Option<UserRecord> {
        match self.users.find_by_id(&user.id).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %user.id, error = %e, "User lookup by id failed"),
        }
        if user.email.is_empty() {
            return None;
        }
        match self.users.find_by_email(&user.email).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "User lookup by email failed");
                None
            }
        }
    }
}

/// Project the signed-in user out of a session. Partial sessions (flag set
/// but an identity field missing) count as unauthenticated.
pub fn current_user(session: &Session) -> Option<AuthenticatedUser> {
    if !session.authenticated
        || session.user_id.is_empty()
        || session.email.is_empty()
        || session.tier.is_empty()
    {
        return None;
    }
    Some(AuthenticatedUser {
        id: session.user_id.clone(),
        email: session.email.clone(),
        display_name: session.display_name.clone(),
        tier: session.tier.clone(),
        company_id: session.company_id.clone(),
    })
}
