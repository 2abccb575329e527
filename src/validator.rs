//! Access and refresh token validation.
//!
//! Access tokens are stateless: signature plus `now < exp`, nothing else. Refresh tokens must
//! additionally be registered and unrevoked in the [`RefreshTokenStore`]. Every rejection
//! collapses into [`Error::Unauthorized`] so callers cannot tell a bad signature from an expired
//! or revoked token.

// self
use crate::{
	_prelude::*,
	auth::{Claims, Identity, TokenKind, TokenSecret},
	jwt::TokenSigner,
	obs::{self, FlowKind},
	store::RefreshTokenStore,
};

/// Verifies presented tokens and recovers the caller's [`Identity`].
#[derive(Clone)]
pub struct TokenValidator {
	signer: Arc<TokenSigner>,
	store: Arc<dyn RefreshTokenStore>,
}
impl TokenValidator {
	/// Creates a validator over the provided signer and store.
	pub fn new(signer: Arc<TokenSigner>, store: Arc<dyn RefreshTokenStore>) -> Self {
		Self { signer, store }
	}

	/// Validates an access token against the current wall clock.
	pub fn validate_access(&self, token: &str) -> Result<Identity> {
		self.validate_access_at(token, OffsetDateTime::now_utc())
	}

	/// Validates an access token at `now`. Pure; never touches the store.
	pub fn validate_access_at(&self, token: &str, now: OffsetDateTime) -> Result<Identity> {
		let result = self.signer.verify(TokenKind::Access, token, now).map(Identity::from);

		obs::record_flow_outcome(FlowKind::Validate, match result {
			Ok(_) => obs::FlowOutcome::Success,
			Err(_) => obs::FlowOutcome::Failure,
		});

		result
	}

	/// Validates a refresh token against the current wall clock.
	pub async fn validate_refresh(&self, token: &TokenSecret) -> Result<Identity> {
		self.validate_refresh_at(token, OffsetDateTime::now_utc()).await
	}

	/// Validates a refresh token at `now`: signature, expiry, then store membership.
	pub async fn validate_refresh_at(
		&self,
		token: &TokenSecret,
		now: OffsetDateTime,
	) -> Result<Identity> {
		self.refresh_claims_at(token, now).await.map(Identity::from)
	}

	pub(crate) async fn refresh_claims_at(
		&self,
		token: &TokenSecret,
		now: OffsetDateTime,
	) -> Result<Claims> {
		obs::observe(FlowKind::Validate, "validate_refresh", async {
			let claims = self.signer.verify(TokenKind::Refresh, token.expose(), now)?;

			if !self.store.exists(&token.hash()).await? {
				return Err(Error::Unauthorized);
			}

			Ok(claims)
		})
		.await
	}
}
impl Debug for TokenValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenValidator").field("signer", &self.signer).finish_non_exhaustive()
	}
}
