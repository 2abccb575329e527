//! Bearer guards that attach the caller's credentials to the request extensions.

// crates.io
use http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, parse_bearer},
	service::{self, Interceptor, Next, ServiceFuture, ServiceRequest},
	validator::TokenValidator,
};

/// Refresh token presented to a [`RefreshGuard`], kept in the request extensions for the handler.
#[derive(Clone, Debug)]
pub struct PresentedRefresh(pub TokenSecret);

/// Requires a valid access token; inserts [`Identity`](crate::auth::Identity) on success.
#[derive(Clone, Debug)]
pub struct AccessGuard {
	validator: TokenValidator,
}
impl AccessGuard {
	/// Creates the guard.
	pub fn new(validator: TokenValidator) -> Self {
		Self { validator }
	}
}
impl Interceptor for AccessGuard {
	fn intercept<'a>(&'a self, mut request: ServiceRequest, next: Next<'a>) -> ServiceFuture<'a> {
		Box::pin(async move {
			let identity = match bearer(&request)
				.ok_or(Error::Unauthorized)
				.and_then(|token| self.validator.validate_access(token.expose()))
			{
				Ok(identity) => identity,
				Err(e) => return service::error_to_response(&e),
			};

			request.extensions_mut().insert(identity);

			next.run(request).await
		})
	}
}

/// Requires a refresh bearer; inserts it as [`PresentedRefresh`].
///
/// Signature, expiry, and store membership are checked by the rotation, where a revoked token
/// also triggers replay detection.
#[derive(Clone, Debug, Default)]
pub struct RefreshGuard;
impl RefreshGuard {
	/// Creates the guard.
	pub fn new() -> Self {
		Self
	}
}
impl Interceptor for RefreshGuard {
	fn intercept<'a>(&'a self, mut request: ServiceRequest, next: Next<'a>) -> ServiceFuture<'a> {
		Box::pin(async move {
			let Some(token) = bearer(&request) else {
				return service::error_to_response(&Error::Unauthorized);
			};

			request.extensions_mut().insert(PresentedRefresh(token));

			next.run(request).await
		})
	}
}

fn bearer(request: &ServiceRequest) -> Option<TokenSecret> {
	request.headers().get(AUTHORIZATION)?.to_str().ok().and_then(parse_bearer)
}
