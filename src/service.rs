//! Framework-agnostic handlers for the session HTTP contract.
//!
//! [`AuthService`] routes `http::Request<Vec<u8>>` values to the five session endpoints and
//! answers with `http::Response<Vec<u8>>`. Protected endpoints run behind an ordered [`Chain`]
//! of [`Interceptor`]s; the guards attach the caller's [`Identity`](crate::auth::Identity)
//! or the presented refresh token to the request extensions before the handler sees it.
//! Embedding applications adapt their framework's request type at the edge; no router or server
//! lives here.

pub mod chain;
pub mod guard;

mod routes;

pub use chain::*;
pub use guard::*;

// crates.io
use http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE};
// self
use crate::{_prelude::*, issuer::TokenIssuer, service::routes::Endpoint, wire::{self, ErrorBody}};

/// Request type accepted by the service.
pub type ServiceRequest = http::Request<Vec<u8>>;
/// Response type produced by the service.
pub type ServiceResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`Interceptor`]s and [`Handler`]s.
pub type ServiceFuture<'a> = Pin<Box<dyn Future<Output = ServiceResponse> + 'a + Send>>;

struct Route {
	method: Method,
	path: &'static str,
	chain: Chain,
}
impl Route {
	fn new(method: Method, path: &'static str, chain: Chain) -> Self {
		Self { method, path, chain }
	}
}

/// Session endpoints bound to one [`TokenIssuer`].
#[derive(Clone)]
pub struct AuthService {
	issuer: TokenIssuer,
	routes: Arc<[Route]>,
}
impl AuthService {
	/// Builds the route table. Access-protected routes share the issuer's validator.
	pub fn new(issuer: TokenIssuer) -> Self {
		let access = AccessGuard::new(issuer.validator().clone());
		let refresh = RefreshGuard::new();
		let bind = |endpoint: Endpoint| Chain::new(endpoint.bind(issuer.clone()));
		let routes = vec![
			Route::new(Method::POST, wire::LOGIN_PATH, bind(Endpoint::Login)),
			Route::new(Method::POST, wire::REFRESH_PATH, bind(Endpoint::Refresh).with(refresh)),
			Route::new(Method::POST, wire::LOGOUT_PATH, bind(Endpoint::Logout).with(access.clone())),
			Route::new(
				Method::POST,
				wire::LOGOUT_ALL_PATH,
				bind(Endpoint::LogoutAll).with(access.clone()),
			),
			Route::new(Method::GET, wire::PROFILE_PATH, bind(Endpoint::Profile).with(access)),
		];

		Self { issuer, routes: routes.into() }
	}

	/// Issuer backing the endpoints.
	pub fn issuer(&self) -> &TokenIssuer {
		&self.issuer
	}

	/// Dispatches one request. Unknown routes answer `404`.
	pub async fn handle(&self, request: ServiceRequest) -> ServiceResponse {
		let path = request.uri().path().trim_end_matches('/');
		let Some(route) =
			self.routes.iter().find(|route| route.method == request.method() && route.path == path)
		else {
			let message = format!("Cannot {} {}", request.method(), request.uri().path());

			return error_response(StatusCode::NOT_FOUND, message);
		};

		route.chain.handle(request).await
	}
}
impl Debug for AuthService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthService")
			.field("issuer", &self.issuer)
			.field("routes", &self.routes.iter().map(|r| r.path).collect::<Vec<_>>())
			.finish()
	}
}

/// Serializes `body` as a JSON response with the given status.
pub fn json_response<T>(status: StatusCode, body: &T) -> ServiceResponse
where
	T: ?Sized + Serialize,
{
	let mut response = http::Response::new(serde_json::to_vec(body).unwrap_or_default());

	*response.status_mut() = status;
	response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

	response
}

/// Builds the `{statusCode, message, error}` body for a non-2xx status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> ServiceResponse {
	json_response(status, &ErrorBody {
		status_code: status.as_u16(),
		message: message.into(),
		error: status.canonical_reason().unwrap_or("Error").to_owned(),
	})
}

/// Maps a crate error to its HTTP status. Internal failures never leak their details.
pub fn error_to_response(error: &Error) -> ServiceResponse {
	match error {
		Error::InvalidCredential => error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"),
		Error::Unauthorized | Error::SessionExpired =>
			error_response(StatusCode::UNAUTHORIZED, "Unauthorized"),
		Error::Conflict => error_response(StatusCode::CONFLICT, error.to_string()),
		_ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
	}
}
