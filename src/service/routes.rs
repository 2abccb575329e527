// crates.io
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::{Credential, Identity},
	issuer::TokenIssuer,
	service::{self, Handler, PresentedRefresh, ServiceFuture, ServiceRequest, ServiceResponse},
	wire::{
		LoginRequest, LoginResponse, LogoutAllResponse, MessageResponse, ProfileResponse,
		TokenPairResponse,
	},
};

#[derive(Clone, Copy, Debug)]
pub(crate) enum Endpoint {
	Login,
	Refresh,
	Logout,
	LogoutAll,
	Profile,
}
impl Endpoint {
	pub(crate) fn bind(self, issuer: TokenIssuer) -> EndpointHandler {
		EndpointHandler { endpoint: self, issuer }
	}
}

pub(crate) struct EndpointHandler {
	endpoint: Endpoint,
	issuer: TokenIssuer,
}
impl EndpointHandler {
	async fn login(&self, request: ServiceRequest) -> Result<ServiceResponse> {
		let mut de = serde_json::Deserializer::from_slice(request.body());
		let body: LoginRequest = match serde_path_to_error::deserialize(&mut de) {
			Ok(body) => body,
			Err(e) => {
				let message = format!("Malformed login body at `{}`.", e.path());

				return Ok(service::error_response(StatusCode::BAD_REQUEST, message));
			},
		};

		if body.email.trim().is_empty() || body.password.is_empty() {
			return Ok(service::error_response(
				StatusCode::BAD_REQUEST,
				"Email and password are required.",
			));
		}

		let session = self.issuer.issue_pair(&Credential::new(body.email, body.password)).await?;

		Ok(service::json_response(StatusCode::OK, &LoginResponse {
			access_token: session.pair.access_token.expose().to_owned(),
			refresh_token: session.pair.refresh_token.expose().to_owned(),
			user: session.user,
		}))
	}

	async fn refresh(&self, request: ServiceRequest) -> Result<ServiceResponse> {
		let PresentedRefresh(token) =
			request.extensions().get::<PresentedRefresh>().ok_or(Error::Unauthorized)?;
		let pair = self.issuer.rotate(token).await?;

		Ok(service::json_response(StatusCode::OK, &TokenPairResponse::from(&pair)))
	}

	async fn logout(&self, request: ServiceRequest) -> Result<ServiceResponse> {
		self.issuer.logout(identity(&request)?).await?;

		Ok(service::json_response(StatusCode::OK, &MessageResponse {
			message: "Logged out successfully".into(),
		}))
	}

	async fn logout_all(&self, request: ServiceRequest) -> Result<ServiceResponse> {
		let revoked = self.issuer.logout_everywhere(&identity(&request)?.subject).await?;

		Ok(service::json_response(StatusCode::OK, &LogoutAllResponse {
			message: "Logged out from all sessions".into(),
			revoked,
		}))
	}

	async fn profile(&self, request: ServiceRequest) -> Result<ServiceResponse> {
		let identity = identity(&request)?;
		let created_at = self
			.issuer
			.find_user(&identity.email)
			.await?
			.filter(|user| user.id == identity.subject)
			.map(|user| user.created_at);

		Ok(service::json_response(StatusCode::OK, &ProfileResponse {
			id: identity.subject.to_string(),
			sub: identity.subject.to_string(),
			email: identity.email.clone(),
			created_at,
			iat: identity.issued_at.unix_timestamp(),
			exp: identity.expires_at.unix_timestamp(),
		}))
	}
}
impl Handler for EndpointHandler {
	fn call(&self, request: ServiceRequest) -> ServiceFuture<'_> {
		Box::pin(async move {
			let result = match self.endpoint {
				Endpoint::Login => self.login(request).await,
				Endpoint::Refresh => self.refresh(request).await,
				Endpoint::Logout => self.logout(request).await,
				Endpoint::LogoutAll => self.logout_all(request).await,
				Endpoint::Profile => self.profile(request).await,
			};

			result.unwrap_or_else(|e| service::error_to_response(&e))
		})
	}
}

fn identity(request: &ServiceRequest) -> Result<&Identity> {
	request.extensions().get::<Identity>().ok_or(Error::Unauthorized)
}
