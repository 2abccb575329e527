//! Outbound call primitives and the transports the dispatcher drives.
//!
//! [`ApiTransport`] is the dispatcher's only dependency on an HTTP stack. A transport returns
//! `Ok` for every response it receives, whatever the status; `Err` means the call never produced
//! a response (DNS, TCP, TLS, or a local construction failure). The dispatcher only refreshes on
//! an `Ok` response with status `401`.

// crates.io
use http::{
	HeaderMap, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransportError},
	service::AuthService,
};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Sends requests relative to some base location.
pub trait ApiTransport
where
	Self: Send + Sync,
{
	/// Sends `request` and returns the response, whatever its status.
	fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Outbound call. Cheap to clone so it can be replayed once after a refresh.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the transport's base location, starting with `/`.
	pub path: String,
	/// Request headers.
	pub headers: HeaderMap,
	/// Request body.
	pub body: Vec<u8>,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Serializes `body` as JSON and sets the content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		self.body = serde_json::to_vec(body).map_err(ConfigError::from)?;
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Sets `Authorization: Bearer <token>`, marked sensitive.
	pub fn bearer(mut self, token: &TokenSecret) -> Result<Self> {
		let mut value = HeaderValue::from_str(&token.bearer())
			.map_err(|e| ConfigError::from(http::Error::from(e)))?;

		value.set_sensitive(true);
		self.headers.insert(AUTHORIZATION, value);

		Ok(self)
	}
}

/// Response received by a transport.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Decodes the body as JSON, reporting the failing field path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status.as_u16() })
	}

	/// Decodes a 2xx body; maps `401` to [`Error::Unauthorized`] and any other status to
	/// [`Error::UnexpectedStatus`].
	pub fn success_json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		match self.status {
			status if status.is_success() => self.json(),
			StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
			status => Err(Error::UnexpectedStatus { status: status.as_u16() }),
		}
	}
}

/// In-process transport that hands requests straight to an [`AuthService`].
#[derive(Clone, Debug)]
pub struct LocalTransport {
	service: AuthService,
}
impl LocalTransport {
	/// Wraps the service.
	pub fn new(service: AuthService) -> Self {
		Self { service }
	}
}
impl ApiTransport for LocalTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let mut outbound = http::Request::new(request.body);

			*outbound.method_mut() = request.method;
			*outbound.uri_mut() = request
				.path
				.parse::<http::Uri>()
				.map_err(|e| ConfigError::from(http::Error::from(e)))?;
			*outbound.headers_mut() = request.headers;

			let response = self.service.handle(outbound).await;
			let (parts, body) = response.into_parts();

			Ok(ApiResponse { status: parts.status, headers: parts.headers, body })
		})
	}
}

/// `reqwest`-backed transport rooted at a base URL.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	base_url: Url,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Creates a transport with a default `reqwest` client.
	pub fn new(base_url: Url) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::http_client_build)?;

		Ok(Self::with_client(client, base_url))
	}

	/// Creates a transport around a caller-configured `reqwest` client.
	pub fn with_client(client: ReqwestClient, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Base URL every request path is appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		let joined = format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			path.trim_start_matches('/')
		);

		Ok(Url::parse(&joined).map_err(|source| ConfigError::InvalidEndpoint { source })?)
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = self.endpoint(&request.path)?;
			let network = |e: ReqwestError| Error::from(TransportError::network(&request.path, e));
			let response = self
				.client
				.request(request.method.clone(), url)
				.headers(request.headers.clone())
				.body(request.body.clone())
				.send()
				.await
				.map_err(network)?;
			let status = response.status();
			let headers = response.headers().clone();
			let body = response.bytes().await.map_err(network)?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}
