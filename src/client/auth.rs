//! Login, logout, and profile calls layered on the [`RequestDispatcher`].

// crates.io
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{ApiRequest, RequestDispatcher},
	directory::UserRecord,
	obs::{self, FlowKind},
	wire::{LoginRequest, LoginResponse, LogoutAllResponse, MessageResponse, ProfileResponse},
};

impl RequestDispatcher {
	/// Exchanges credentials for a pair and stores it in the session.
	///
	/// Goes straight to the transport: a rejected login is [`Error::InvalidCredential`], never a
	/// refresh trigger.
	pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord> {
		obs::observe(FlowKind::Login, "client_login", async {
			let request = ApiRequest::post(self.endpoints.login.as_str()).json(&LoginRequest {
				email: email.to_owned(),
				password: password.to_owned(),
			})?;
			let response = self.transport.send(request).await?;

			if response.status == StatusCode::UNAUTHORIZED {
				return Err(Error::InvalidCredential);
			}

			let body = response.success_json::<LoginResponse>()?;

			self.session
				.set(TokenSecret::new(body.access_token), TokenSecret::new(body.refresh_token))?;

			Ok(body.user)
		})
		.await
	}

	/// Revokes the current lineage server-side and clears the session.
	///
	/// The session is cleared whatever the server answers. A session the server already
	/// considers gone (`401`, expired refresh) is not an error.
	pub async fn logout(&self) -> Result<()> {
		let result = self.send(ApiRequest::post(self.endpoints.logout.as_str())).await;

		self.session.clear()?;

		match result.and_then(|response| response.success_json::<MessageResponse>()) {
			Ok(_) | Err(Error::Unauthorized | Error::SessionExpired) => Ok(()),
			Err(e) => Err(e),
		}
	}

	/// Revokes every lineage of the current subject and clears the session. Returns how many
	/// refresh tokens the server revoked.
	pub async fn logout_everywhere(&self) -> Result<usize> {
		let result = self.send(ApiRequest::post(self.endpoints.logout_all.as_str())).await;

		self.session.clear()?;

		Ok(result?.success_json::<LogoutAllResponse>()?.revoked)
	}

	/// Fetches the caller's identity.
	pub async fn profile(&self) -> Result<ProfileResponse> {
		self.send(ApiRequest::get(self.endpoints.profile.as_str())).await?.success_json()
	}
}
