/// Signed-in session
///
/// A [`Session`] comes out of [`AuthClient::sign_up`] or
/// [`AuthClient::sign_in`] and is handed to [`crate::CrmClient::new`].
/// There is no ambient "current user": whoever holds the `CrmClient` holds
/// the session, and signing out consumes it.
///
/// # Example
///
/// ```no_run
/// use freecrm_client::{session::AuthClient, CrmClient};
///
/// # async fn example() -> Result<(), freecrm_client::ClientError> {
/// let auth = AuthClient::new("http://localhost:8080")?;
/// let session = auth.sign_in("marie@example.com", "secret1").await?;
///
/// let crm = CrmClient::new("http://localhost:8080", session)?;
/// println!("Signed in as {}", crm.current_user().email);
/// crm.sign_out().await?;
/// # Ok(())
/// # }
/// ```

use freecrm_shared::models::user::User;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::http::Transport;

/// Current user and the tokens that authenticate them
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Signup form
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshBody<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RefreshedToken {
    pub access_token: String,
}

/// Unauthenticated entry point: signup and login
#[derive(Debug, Clone)]
pub struct AuthClient {
    transport: Transport,
}

impl AuthClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            transport: Transport::new(base_url)?,
        })
    }

    /// Creates an account and signs it in
    pub async fn sign_up(&self, form: &SignupForm) -> ClientResult<Session> {
        let session: Session = self
            .transport
            .send_json(self.transport.post("/v1/auth/signup")?.json(form))
            .await?;

        tracing::debug!(user_id = %session.user.id, "Signed up");
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let session: Session = self
            .transport
            .send_json(
                self.transport
                    .post("/v1/auth/login")?
                    .json(&LoginBody { email, password }),
            )
            .await?;

        tracing::debug!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }
}
