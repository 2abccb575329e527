//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// self
use auth_session::{
	auth::SubjectId,
	client::{
		ApiRequest, ApiResponse, ApiTransport, LocalTransport, RequestDispatcher, SessionClient,
		TransportFuture,
	},
	config::AuthConfig,
	directory::MemoryDirectory,
	error::TransportError,
	http::StatusCode,
	issuer::TokenIssuer,
	service::AuthService,
	store::MemoryStore,
	wire,
};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "Secret1!";
pub const SUBJECT: &str = "user-1";

pub fn config(replay_detection: bool) -> AuthConfig {
	AuthConfig::builder()
		.access_secret("test-access-secret")
		.refresh_secret("test-refresh-secret")
		.replay_detection(replay_detection)
		.build()
		.expect("Test config should build.")
}

/// Issuer over a fresh store and a directory holding one registered user.
pub fn issuer(replay_detection: bool) -> (TokenIssuer, Arc<MemoryStore>) {
	issuer_with(config(replay_detection))
}

pub fn issuer_with(config: AuthConfig) -> (TokenIssuer, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let directory = Arc::new(MemoryDirectory::default());

	directory.register(
		SubjectId::new(SUBJECT).expect("Subject fixture should be valid."),
		EMAIL,
		PASSWORD,
	);

	(TokenIssuer::new(config, store.clone(), directory), store)
}

pub fn service() -> (AuthService, Arc<MemoryStore>) {
	let (issuer, store) = issuer(false);

	(AuthService::new(issuer), store)
}

/// How [`ScriptedTransport`] answers refresh calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RefreshMode {
	/// Forward to the service.
	Forward = 0,
	/// Answer `503`.
	ServerError = 1,
	/// Fail without a response.
	NetworkDown = 2,
	/// Consume the token on the service, then answer `200` with an unreadable body.
	Garbled = 3,
}

/// In-process transport that counts calls and can be told to misbehave.
pub struct ScriptedTransport {
	inner: LocalTransport,
	refresh_calls: AtomicUsize,
	total_calls: AtomicUsize,
	refresh_mode: AtomicU8,
	refresh_delay: StdDuration,
	offline: AtomicBool,
	always_unauthorized: AtomicBool,
}
impl ScriptedTransport {
	pub fn new(service: AuthService) -> Self {
		Self::with_refresh_delay(service, StdDuration::ZERO)
	}

	pub fn with_refresh_delay(service: AuthService, refresh_delay: StdDuration) -> Self {
		Self {
			inner: LocalTransport::new(service),
			refresh_calls: AtomicUsize::new(0),
			total_calls: AtomicUsize::new(0),
			refresh_mode: AtomicU8::new(RefreshMode::Forward as u8),
			refresh_delay,
			offline: Default::default(),
			always_unauthorized: Default::default(),
		}
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn total_calls(&self) -> usize {
		self.total_calls.load(Ordering::SeqCst)
	}

	pub fn set_refresh_mode(&self, mode: RefreshMode) {
		self.refresh_mode.store(mode as u8, Ordering::SeqCst);
	}

	/// Every non-refresh call fails without a response.
	pub fn set_offline(&self, offline: bool) {
		self.offline.store(offline, Ordering::SeqCst);
	}

	/// Every non-refresh call answers `401`, whatever token it carries.
	pub fn set_always_unauthorized(&self, enabled: bool) {
		self.always_unauthorized.store(enabled, Ordering::SeqCst);
	}

	fn refresh_mode(&self) -> RefreshMode {
		match self.refresh_mode.load(Ordering::SeqCst) {
			1 => RefreshMode::ServerError,
			2 => RefreshMode::NetworkDown,
			3 => RefreshMode::Garbled,
			_ => RefreshMode::Forward,
		}
	}
}
impl ApiTransport for ScriptedTransport {
	fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			self.total_calls.fetch_add(1, Ordering::SeqCst);

			if request.path == wire::REFRESH_PATH {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);

				if !self.refresh_delay.is_zero() {
					tokio::time::sleep(self.refresh_delay).await;
				}

				return match self.refresh_mode() {
					RefreshMode::Forward => self.inner.send(request).await,
					RefreshMode::ServerError => Ok(status_only(StatusCode::SERVICE_UNAVAILABLE)),
					RefreshMode::NetworkDown => Err(network_down(&request.path)),
					RefreshMode::Garbled => {
						let mut response = self.inner.send(request).await?;

						response.body = b"<html>proxy error</html>".to_vec();

						Ok(response)
					},
				};
			}
			if self.offline.load(Ordering::SeqCst) {
				return Err(network_down(&request.path));
			}
			if self.always_unauthorized.load(Ordering::SeqCst) && request.path != wire::LOGIN_PATH
			{
				return Ok(status_only(StatusCode::UNAUTHORIZED));
			}

			self.inner.send(request).await
		})
	}
}

/// Dispatcher over a scripted transport and an in-memory session.
pub fn dispatcher(transport: Arc<ScriptedTransport>) -> RequestDispatcher {
	RequestDispatcher::new(transport, Arc::new(SessionClient::in_memory()))
}

fn status_only(status: StatusCode) -> ApiResponse {
	ApiResponse { status, headers: Default::default(), body: Vec::new() }
}

fn network_down(path: &str) -> auth_session::error::Error {
	TransportError::network(path, io::Error::other("connection refused")).into()
}
