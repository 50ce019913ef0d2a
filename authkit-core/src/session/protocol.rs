//! The three handshakes and the teardown.
//!
//! Each operation derives what it needs, talks to the account service, and
//! only ever mutates the manager's state in one final step. Key material
//! exists only for the duration of the handshake that uses it; once a
//! session is established, payload operations use the seed carried inside
//! the session.

use tracing::{debug, info, warn};

use crate::backend::{AccountBackend, LoginSubmission, RegisterSubmission, UserRecordDto};
use crate::error::{AuthKitError, AuthResult};
use crate::keys::{KeyMaterial, Mnemonic, PayloadSeed};
use crate::payload::{open, seal, EncryptedPayload, PayloadKind};
use crate::signer::sign_challenge;
use crate::types::{Bookmark, ProfileInfo, ProgressEntry, Session, UserRecord};

use super::{Operation, SessionManager};

/// Opens the sealed profile inside a wire user record.
fn decode_user(seed: &PayloadSeed, dto: &UserRecordDto) -> AuthResult<UserRecord> {
    let envelope = EncryptedPayload::from_base64(&dto.profile)?;
    let profile: ProfileInfo = open(seed, PayloadKind::Profile, &envelope)?;
    Ok(UserRecord {
        id: dto.id.clone(),
        created_at: dto.created_at,
        profile,
    })
}

#[allow(clippy::future_not_send)]
impl<B: AccountBackend> SessionManager<B> {
    /// Establishes a session for an existing account.
    ///
    /// Derives key material from the phrase, answers a server-issued
    /// login challenge, submits sealed device metadata, fetches the
    /// authoritative user record and only then installs the session.
    /// Nothing is installed on failure at any step.
    ///
    /// # Errors
    ///
    /// [`AuthKitError::InvalidMnemonic`], [`AuthKitError::Signing`] and
    /// [`AuthKitError::Encryption`] abort before any network call.
    /// [`AuthKitError::ChallengeRequest`] covers the challenge fetch;
    /// every later stage failure surfaces as [`AuthKitError::Login`] with
    /// the originating cause. [`AuthKitError::OperationInProgress`] when a
    /// login is already in flight; [`AuthKitError::OperationCancelled`]
    /// when the transport cancels.
    pub async fn login(&self, phrase: &str) -> AuthResult<UserRecord> {
        let _guard = self.begin(Operation::Login)?;

        let mnemonic = Mnemonic::parse(phrase)?;
        let keys = KeyMaterial::derive(&mnemonic);
        let public_key = keys.public_key_base64();

        debug!(operation = %Operation::Login, "requesting challenge");
        let challenge = self
            .backend
            .login_challenge(&public_key)
            .await
            .map_err(AuthKitError::into_challenge_request)?;

        let signature = sign_challenge(&keys, &challenge)?;
        let device = seal(keys.payload_seed(), PayloadKind::Device, &self.device)?;

        let submission = LoginSubmission {
            challenge: challenge.code().to_string(),
            signature: signature.encoded().to_string(),
            public_key,
            device: device.to_base64(),
        };
        debug!(operation = %Operation::Login, "submitting signed challenge");
        let grant = self
            .backend
            .login(&submission)
            .await
            .map_err(AuthKitError::into_login)?;

        let dto = self
            .backend
            .fetch_user(&grant.token)
            .await
            .map_err(AuthKitError::into_login)?;
        let user = decode_user(keys.payload_seed(), &dto).map_err(AuthKitError::into_login)?;

        let session = Session::new(
            user.id.clone(),
            grant.token,
            grant.session_id,
            keys.payload_seed().clone(),
        );
        let encoded_seed = session.payload_seed().to_base64();

        self.install(session.clone(), user.clone());
        self.sink.on_login(&session, &user, &encoded_seed);
        info!(account_id = %user.id, "session established");
        Ok(user)
    }

    /// Creates an account and establishes a session.
    ///
    /// Mirrors [`login`](SessionManager::login), with two differences: the
    /// registration challenge carries no public-key binding, and the
    /// response embeds the created user record so no extra fetch is
    /// needed. The submission carries sealed profile metadata alongside
    /// the sealed device metadata.
    ///
    /// # Errors
    ///
    /// As for login, with stage failures surfacing as
    /// [`AuthKitError::Registration`].
    pub async fn register(&self, phrase: &str, profile: &ProfileInfo) -> AuthResult<UserRecord> {
        let _guard = self.begin(Operation::Register)?;

        let mnemonic = Mnemonic::parse(phrase)?;
        let keys = KeyMaterial::derive(&mnemonic);
        let public_key = keys.public_key_base64();

        debug!(operation = %Operation::Register, "requesting challenge");
        let challenge = self
            .backend
            .register_challenge()
            .await
            .map_err(AuthKitError::into_challenge_request)?;

        let signature = sign_challenge(&keys, &challenge)?;
        let device = seal(keys.payload_seed(), PayloadKind::Device, &self.device)?;
        let sealed_profile = seal(keys.payload_seed(), PayloadKind::Profile, profile)?;

        let submission = RegisterSubmission {
            challenge: challenge.code().to_string(),
            signature: signature.encoded().to_string(),
            public_key,
            device: device.to_base64(),
            profile: sealed_profile.to_base64(),
        };
        debug!(operation = %Operation::Register, "submitting signed challenge");
        let granted = self
            .backend
            .register(&submission)
            .await
            .map_err(AuthKitError::into_registration)?;

        let user = decode_user(keys.payload_seed(), &granted.user)
            .map_err(AuthKitError::into_registration)?;

        let session = Session::new(
            user.id.clone(),
            granted.grant.token,
            granted.grant.session_id,
            keys.payload_seed().clone(),
        );
        let encoded_seed = session.payload_seed().to_base64();

        self.install(session.clone(), user.clone());
        self.sink.on_login(&session, &user, &encoded_seed);
        info!(account_id = %user.id, "account registered, session established");
        Ok(user)
    }

    /// Refreshes account data on the existing session.
    ///
    /// A no-op returning `Ok(())` when no session exists. Otherwise
    /// re-fetches the user record, bookmarks and progress with the stored
    /// bearer token and hands all three to the sink.
    ///
    /// # Errors
    ///
    /// Fetch failures surface as [`AuthKitError::RestoreFetch`]. The
    /// session stays installed unless
    /// [`invalidate_on_restore_failure`](crate::config::SessionConfig::invalidate_on_restore_failure)
    /// is set. [`AuthKitError::OperationInProgress`] when a restore is
    /// already in flight.
    pub async fn restore(&self) -> AuthResult<()> {
        let _guard = self.begin(Operation::Restore)?;

        let Some(session) = self.current_session() else {
            debug!("restore with no session is a no-op");
            return Ok(());
        };

        let outcome = self.restore_fetches(&session).await;
        match outcome {
            Ok((user, bookmarks, progress)) => {
                self.update_user(user.clone());
                self.sink.on_restore(&user, &progress, &bookmarks);
                info!(account_id = %user.id, "session restored");
                Ok(())
            }
            Err(err) => {
                if self.config.invalidate_on_restore_failure
                    && !matches!(err, AuthKitError::OperationCancelled)
                {
                    warn!("restore failed, invalidating session");
                    self.clear();
                    self.sink.on_logout();
                }
                Err(err.into_restore_fetch())
            }
        }
    }

    async fn restore_fetches(
        &self,
        session: &Session,
    ) -> AuthResult<(UserRecord, Vec<Bookmark>, Vec<ProgressEntry>)> {
        let dto = self.backend.fetch_user(session.token()).await?;
        let user = decode_user(session.payload_seed(), &dto)?;
        let bookmarks = self
            .backend
            .fetch_bookmarks(session.token(), session.session_id())
            .await?;
        let progress = self
            .backend
            .fetch_progress(session.token(), session.session_id())
            .await?;
        Ok((user, bookmarks, progress))
    }

    /// Tears down the session.
    ///
    /// Revocation is best-effort: a server-side failure is logged and
    /// swallowed, and local state is cleared regardless. Logout must never
    /// be blocked by network failure. A no-op on an empty session.
    ///
    /// # Errors
    ///
    /// Only [`AuthKitError::OperationInProgress`] when a logout is already
    /// in flight.
    pub async fn logout(&self) -> AuthResult<()> {
        let _guard = self.begin(Operation::Logout)?;

        let Some(session) = self.current_session() else {
            return Ok(());
        };

        if let Err(err) = self
            .backend
            .remove_session(session.token(), session.session_id())
            .await
        {
            warn!(error = %err, "session revoke failed, clearing local state anyway");
        }

        self.clear();
        self.sink.on_logout();
        info!(account_id = %session.account_id(), "session cleared");
        Ok(())
    }
}
