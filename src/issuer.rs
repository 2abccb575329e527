//! Token pair issuance, refresh token rotation, and revocation.
//!
//! [`TokenIssuer`] is the only component that creates or revokes [`RefreshTokenRecord`]s. Login
//! opens a new session lineage; every rotation consumes the presented refresh token and carries
//! the lineage forward through [`RefreshTokenStore::rotate_atomic`], so a rotated pair is never
//! returned while the consumed token is still live.

// self
use crate::{
	_prelude::*,
	auth::{Credential, Identity, LineageId, RefreshTokenRecord, SubjectId, TokenKind, TokenSecret},
	config::AuthConfig,
	directory::{UserDirectory, UserRecord},
	jwt::{MintedToken, TokenSigner},
	obs::{self, FlowKind},
	store::{RefreshTokenStore, RotationOutcome},
	validator::TokenValidator,
};

/// Access + refresh token pair handed to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
	/// Short-lived bearer credential.
	pub access_token: TokenSecret,
	/// Long-lived credential exchanged for the next pair.
	pub refresh_token: TokenSecret,
}

/// Result of a successful login.
#[derive(Clone, Debug)]
pub struct IssuedSession {
	/// Freshly minted pair.
	pub pair: TokenPair,
	/// Non-secret user fields.
	pub user: UserRecord,
}

/// Mints, rotates, and revokes token pairs.
#[derive(Clone)]
pub struct TokenIssuer {
	config: Arc<AuthConfig>,
	signer: Arc<TokenSigner>,
	store: Arc<dyn RefreshTokenStore>,
	directory: Arc<dyn UserDirectory>,
	validator: TokenValidator,
}
impl TokenIssuer {
	/// Wires an issuer (and the validator it shares a signer with) over the collaborators.
	pub fn new(
		config: AuthConfig,
		store: Arc<dyn RefreshTokenStore>,
		directory: Arc<dyn UserDirectory>,
	) -> Self {
		let signer = Arc::new(TokenSigner::new(&config));
		let validator = TokenValidator::new(signer.clone(), store.clone());

		Self { config: Arc::new(config), signer, store, directory, validator }
	}

	/// Validator sharing this issuer's keys and store.
	pub fn validator(&self) -> &TokenValidator {
		&self.validator
	}

	/// Active configuration.
	pub fn config(&self) -> &AuthConfig {
		&self.config
	}

	/// Verifies the credential and issues the first pair of a new session lineage.
	pub async fn issue_pair(&self, credential: &Credential) -> Result<IssuedSession> {
		self.issue_pair_at(credential, OffsetDateTime::now_utc()).await
	}

	/// Same as [`issue_pair`](Self::issue_pair) with an explicit issuance instant.
	pub async fn issue_pair_at(
		&self,
		credential: &Credential,
		now: OffsetDateTime,
	) -> Result<IssuedSession> {
		obs::observe(FlowKind::Login, "issue_pair", async {
			let user = self
				.directory
				.find_user_by_email(&credential.email)
				.await?
				.ok_or(Error::InvalidCredential)?;

			if !self.directory.verify_credential(&credential.email, &credential.password).await? {
				return Err(Error::InvalidCredential);
			}

			obs::current_flow().record_subject(user.id.as_ref());

			let lineage = LineageId::generate();
			let (pair, refresh) = self.mint_pair(&user.id, &user.email, &lineage, now)?;

			self.store
				.add(RefreshTokenRecord::from_claims(refresh.token.hash(), &refresh.claims))
				.await?;

			Ok(IssuedSession { pair, user })
		})
		.await
	}

	/// Exchanges a live refresh token for a new pair in the same lineage.
	pub async fn rotate(&self, presented: &TokenSecret) -> Result<TokenPair> {
		self.rotate_at(presented, OffsetDateTime::now_utc()).await
	}

	/// Same as [`rotate`](Self::rotate) with an explicit instant.
	///
	/// Of two concurrent rotations of one token, exactly one succeeds; the other gets
	/// [`Error::Unauthorized`].
	pub async fn rotate_at(&self, presented: &TokenSecret, now: OffsetDateTime) -> Result<TokenPair> {
		obs::observe(FlowKind::Rotate, "rotate", async {
			let claims = match self.validator.refresh_claims_at(presented, now).await {
				Ok(claims) => claims,
				Err(e) => {
					if e.is_unauthorized() {
						self.detect_replay(presented, now).await?;
					}

					return Err(e);
				},
			};

			obs::current_flow().record_subject(claims.sub.as_ref());

			let (pair, refresh) = self.mint_pair(&claims.sub, &claims.email, &claims.sid, now)?;
			let replacement = RefreshTokenRecord::from_claims(refresh.token.hash(), &refresh.claims);

			match self.store.rotate_atomic(&presented.hash(), replacement, now).await? {
				RotationOutcome::Rotated => Ok(pair),
				RotationOutcome::Revoked => {
					self.detect_replay(presented, now).await?;

					Err(Error::Unauthorized)
				},
				RotationOutcome::Missing => Err(Error::Unauthorized),
			}
		})
		.await
	}

	/// Revokes every refresh token in the caller's session lineage.
	pub async fn logout(&self, identity: &Identity) -> Result<usize> {
		self.logout_at(identity, OffsetDateTime::now_utc()).await
	}

	/// Same as [`logout`](Self::logout) with an explicit revocation instant.
	pub async fn logout_at(&self, identity: &Identity, now: OffsetDateTime) -> Result<usize> {
		obs::observe(FlowKind::Logout, "logout", async {
			Ok(self.store.revoke_lineage(&identity.lineage, now).await?)
		})
		.await
	}

	/// Revokes every refresh token issued to the subject, across all lineages.
	pub async fn logout_everywhere(&self, subject: &SubjectId) -> Result<usize> {
		self.logout_everywhere_at(subject, OffsetDateTime::now_utc()).await
	}

	/// Same as [`logout_everywhere`](Self::logout_everywhere) with an explicit instant.
	pub async fn logout_everywhere_at(
		&self,
		subject: &SubjectId,
		now: OffsetDateTime,
	) -> Result<usize> {
		obs::observe(FlowKind::Logout, "logout_everywhere", async {
			Ok(self.store.revoke_all(subject, now).await?)
		})
		.await
	}

	/// Drops records whose expiry has passed. Returns how many were removed.
	pub async fn purge_expired(&self) -> Result<usize> {
		self.purge_expired_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`purge_expired`](Self::purge_expired) with an explicit instant.
	pub async fn purge_expired_at(&self, now: OffsetDateTime) -> Result<usize> {
		Ok(self.store.purge_expired(now).await?)
	}

	/// Looks up the non-secret user fields for `email`.
	pub async fn find_user(&self, email: &str) -> Result<Option<UserRecord>> {
		self.directory.find_user_by_email(email).await
	}

	fn mint_pair(
		&self,
		subject: &SubjectId,
		email: &str,
		lineage: &LineageId,
		now: OffsetDateTime,
	) -> Result<(TokenPair, MintedToken)> {
		let access = self.signer.mint(TokenKind::Access, subject, email, lineage, now)?;
		let refresh = self.signer.mint(TokenKind::Refresh, subject, email, lineage, now)?;
		let pair =
			TokenPair { access_token: access.token, refresh_token: refresh.token.clone() };

		Ok((pair, refresh))
	}

	// A correctly signed refresh token whose record is already revoked is a replay.
	async fn detect_replay(&self, presented: &TokenSecret, now: OffsetDateTime) -> Result<()> {
		if !self.config.replay_detection {
			return Ok(());
		}

		let Some(record) = self.store.fetch(&presented.hash()).await? else {
			return Ok(());
		};

		if record.is_revoked() {
			obs::warn(FlowKind::Rotate, "Revoked refresh token replayed; revoking its lineage.");

			self.store.revoke_lineage(&record.lineage, now).await?;
		}

		Ok(())
	}
}
impl Debug for TokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("config", &self.config)
			.field("signer", &self.signer)
			.finish_non_exhaustive()
	}
}
