//! The remote account service interface.
//!
//! [`AccountBackend`] captures the request/response shape of every remote
//! operation the session protocol consumes, one async method per endpoint.
//! [`HttpAccountBackend`] speaks the JSON REST surface of the production
//! service; tests implement the trait with in-memory doubles.

use serde::{Deserialize, Serialize};

use crate::error::AuthResult;
use crate::http_request::{parse_json, Request};
use crate::signer::Challenge;
use crate::types::{Bookmark, ProgressEntry};
use crate::Environment;

/// A bearer token plus session identifier granted by a successful
/// handshake.
#[derive(Clone, Deserialize)]
pub struct SessionGrant {
    /// The bearer token authorizing subsequent calls.
    pub token: String,
    /// The server-assigned session identifier.
    pub session_id: String,
}

impl std::fmt::Debug for SessionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGrant")
            .field("token", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// The user record as it travels on the wire: the profile field is a
/// base64 sealed envelope only the key holder can open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecordDto {
    /// Server-assigned account identifier.
    pub id: String,
    /// Unix timestamp of account creation.
    pub created_at: u64,
    /// Sealed profile envelope, base64-encoded.
    pub profile: String,
}

/// Registration response: a grant plus the newly created user record.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterGrant {
    /// The session grant.
    #[serde(flatten)]
    pub grant: SessionGrant,
    /// The created user record, embedded so no extra fetch is needed.
    pub user: UserRecordDto,
}

/// Login submission: the answered challenge plus sealed device metadata.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSubmission {
    /// The challenge code being answered.
    pub challenge: String,
    /// Signature over the challenge, base64url.
    pub signature: String,
    /// The public key the challenge was issued for, base64url.
    pub public_key: String,
    /// Sealed device metadata, base64.
    pub device: String,
}

/// Registration submission: like login, plus sealed profile metadata.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterSubmission {
    /// The challenge code being answered.
    pub challenge: String,
    /// Signature over the challenge, base64url.
    pub signature: String,
    /// The public key the account will be bound to, base64url.
    pub public_key: String,
    /// Sealed device metadata, base64.
    pub device: String,
    /// Sealed profile metadata, base64.
    pub profile: String,
}

/// The remote operations the session protocol consumes.
///
/// Implementations must not retry mutating calls (`login`, `register`,
/// `remove_session`): their challenge or side effect is one-time.
#[allow(async_fn_in_trait)]
pub trait AccountBackend: Send + Sync {
    /// Requests a one-time login challenge bound to `public_key`.
    async fn login_challenge(&self, public_key: &str) -> AuthResult<Challenge>;

    /// Submits an answered login challenge.
    async fn login(&self, submission: &LoginSubmission) -> AuthResult<SessionGrant>;

    /// Requests a one-time registration challenge. No key binding yet:
    /// the server cannot know the key before first registration.
    async fn register_challenge(&self) -> AuthResult<Challenge>;

    /// Submits an answered registration challenge.
    async fn register(&self, submission: &RegisterSubmission) -> AuthResult<RegisterGrant>;

    /// Fetches the authoritative user record.
    async fn fetch_user(&self, token: &str) -> AuthResult<UserRecordDto>;

    /// Fetches the account's bookmarks.
    async fn fetch_bookmarks(&self, token: &str, session_id: &str) -> AuthResult<Vec<Bookmark>>;

    /// Fetches the account's progress entries.
    async fn fetch_progress(&self, token: &str, session_id: &str)
        -> AuthResult<Vec<ProgressEntry>>;

    /// Revokes the session server-side. Callers treat the outcome as
    /// best-effort.
    async fn remove_session(&self, token: &str, session_id: &str) -> AuthResult<()>;
}

#[derive(Debug, Serialize)]
struct ChallengeRequestBody<'a> {
    public_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponseBody {
    challenge: String,
}

/// Session-scoped credentials travel as a bearer token plus this header.
const SESSION_HEADER: &str = "X-Session-Id";

/// [`AccountBackend`] implementation over the account service's JSON REST
/// surface.
pub struct HttpAccountBackend {
    base_url: String,
    request: Request,
}

impl HttpAccountBackend {
    /// Creates a backend for a standard environment.
    #[must_use]
    pub fn new(environment: &Environment) -> Self {
        Self::with_base_url(environment.backend_url().to_string())
    }

    /// Creates a backend against an explicit base URL.
    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request: Request::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl std::fmt::Debug for HttpAccountBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAccountBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[allow(clippy::future_not_send)]
impl AccountBackend for HttpAccountBackend {
    async fn login_challenge(&self, public_key: &str) -> AuthResult<Challenge> {
        let builder = self
            .request
            .post(&self.url("/v1/auth/login/challenge"))
            .json(&ChallengeRequestBody { public_key });
        let response = self.request.send_with_retry(builder).await?;
        let body: ChallengeResponseBody = parse_json(response).await?;
        Ok(Challenge::new(body.challenge))
    }

    async fn login(&self, submission: &LoginSubmission) -> AuthResult<SessionGrant> {
        let builder = self
            .request
            .post(&self.url("/v1/auth/login"))
            .json(submission);
        let response = self.request.send(builder).await?;
        parse_json(response).await
    }

    async fn register_challenge(&self) -> AuthResult<Challenge> {
        let builder = self
            .request
            .post(&self.url("/v1/auth/register/challenge"))
            .json(&serde_json::json!({}));
        let response = self.request.send_with_retry(builder).await?;
        let body: ChallengeResponseBody = parse_json(response).await?;
        Ok(Challenge::new(body.challenge))
    }

    async fn register(&self, submission: &RegisterSubmission) -> AuthResult<RegisterGrant> {
        let builder = self
            .request
            .post(&self.url("/v1/auth/register"))
            .json(submission);
        let response = self.request.send(builder).await?;
        parse_json(response).await
    }

    async fn fetch_user(&self, token: &str) -> AuthResult<UserRecordDto> {
        let builder = self.request.get(&self.url("/v1/me")).bearer_auth(token);
        let response = self.request.send_with_retry(builder).await?;
        parse_json(response).await
    }

    async fn fetch_bookmarks(&self, token: &str, session_id: &str) -> AuthResult<Vec<Bookmark>> {
        let builder = self
            .request
            .get(&self.url("/v1/me/bookmarks"))
            .bearer_auth(token)
            .header(SESSION_HEADER, session_id);
        let response = self.request.send_with_retry(builder).await?;
        parse_json(response).await
    }

    async fn fetch_progress(
        &self,
        token: &str,
        session_id: &str,
    ) -> AuthResult<Vec<ProgressEntry>> {
        let builder = self
            .request
            .get(&self.url("/v1/me/progress"))
            .bearer_auth(token)
            .header(SESSION_HEADER, session_id);
        let response = self.request.send_with_retry(builder).await?;
        parse_json(response).await
    }

    async fn remove_session(&self, token: &str, session_id: &str) -> AuthResult<()> {
        let builder = self
            .request
            .delete(&self.url(&format!("/v1/sessions/{session_id}")))
            .bearer_auth(token);
        self.request.send(builder).await?;
        Ok(())
    }
}
