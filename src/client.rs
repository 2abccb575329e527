//! Client side of the session: token cache, transports, and the refreshing dispatcher.
//!
//! Typical wiring: restore a [`SessionClient`] from [`SessionStorage`], pick an [`ApiTransport`]
//! ([`ReqwestTransport`] against a server, [`LocalTransport`] in-process), and send every
//! protected call through one shared [`RequestDispatcher`].

pub mod auth;
pub mod dispatcher;
pub mod session;
pub mod storage;
pub mod transport;

mod metrics;

pub use dispatcher::RequestDispatcher;
pub use metrics::RefreshMetrics;
pub use session::{SessionClient, SessionEvent, SessionSnapshot, SessionState, SubscriptionId};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
#[cfg(feature = "reqwest")] pub use transport::ReqwestTransport;
pub use transport::{ApiRequest, ApiResponse, ApiTransport, LocalTransport, TransportFuture};

// self
use crate::{_prelude::*, wire};

/// Endpoint paths the client calls, relative to the transport's base location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEndpoints {
	/// Credential exchange.
	pub login: String,
	/// Refresh token rotation.
	pub refresh: String,
	/// Lineage revocation.
	pub logout: String,
	/// Subject-wide revocation.
	pub logout_all: String,
	/// Caller identity.
	pub profile: String,
}
impl Default for ClientEndpoints {
	fn default() -> Self {
		Self {
			login: wire::LOGIN_PATH.into(),
			refresh: wire::REFRESH_PATH.into(),
			logout: wire::LOGOUT_PATH.into(),
			logout_all: wire::LOGOUT_ALL_PATH.into(),
			profile: wire::PROFILE_PATH.into(),
		}
	}
}
