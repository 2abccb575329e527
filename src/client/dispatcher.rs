//! Authorized call dispatch with single-flight refresh-and-retry.
//!
//! Every call goes out with the current access token. A `401` sends the call to the session's
//! refresh slot: the first failing call of an epoch opens a refresh, every other call failing
//! under that epoch joins it, and all of them retry exactly once after it settles. A 4xx from
//! the refresh endpoint, or a 2xx whose pair cannot be read, ends the session; a network failure
//! or 5xx leaves the pair in place so a later call can try again.

// crates.io
use http::StatusCode;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{
		ClientEndpoints, RefreshMetrics,
		session::{PendingRefresh, RefreshOutcome, RefreshSlot, SessionClient},
		transport::{ApiRequest, ApiResponse, ApiTransport},
	},
	error::TransportError,
	obs::{self, FlowKind},
	wire::TokenPairResponse,
};

/// Wraps an [`ApiTransport`] with bearer attachment and transparent refresh.
#[derive(Clone)]
pub struct RequestDispatcher {
	pub(crate) transport: Arc<dyn ApiTransport>,
	pub(crate) session: Arc<SessionClient>,
	pub(crate) endpoints: ClientEndpoints,
	metrics: Arc<RefreshMetrics>,
}
impl RequestDispatcher {
	/// Creates a dispatcher over the transport and session with the default endpoint paths.
	pub fn new(transport: Arc<dyn ApiTransport>, session: Arc<SessionClient>) -> Self {
		Self {
			transport,
			session,
			endpoints: ClientEndpoints::default(),
			metrics: Default::default(),
		}
	}

	/// Overrides the endpoint paths.
	pub fn with_endpoints(mut self, endpoints: ClientEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Session this dispatcher reads and writes.
	pub fn session(&self) -> &Arc<SessionClient> {
		&self.session
	}

	/// Refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Sends `request` with the current access token, refreshing and retrying once on `401`.
	///
	/// Statuses other than `401` are returned as `Ok`. Transport errors propagate without a
	/// refresh. A retried call that is still rejected yields [`Error::Unauthorized`]; a rejected
	/// refresh yields [`Error::SessionExpired`] for every call that joined it.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		obs::observe(FlowKind::Dispatch, "send", async {
			let snapshot = self.session.get();
			let response =
				self.send_with(request.clone(), snapshot.access_token.as_ref()).await?;

			if response.status != StatusCode::UNAUTHORIZED {
				return Ok(response);
			}

			let token = self.refreshed_access(snapshot.epoch).await?;
			let retried = self.send_with(request, Some(&token)).await?;

			if retried.status == StatusCode::UNAUTHORIZED {
				return Err(Error::Unauthorized);
			}

			Ok(retried)
		})
		.await
	}

	async fn send_with(
		&self,
		request: ApiRequest,
		access: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let request = match access {
			Some(token) => request.bearer(token)?,
			None => request,
		};

		self.transport.send(request).await
	}

	async fn refreshed_access(&self, epoch: u64) -> Result<TokenSecret> {
		let pending = match self.session.refresh_slot(epoch)? {
			RefreshSlot::Current(token) => return Ok(token),
			RefreshSlot::Pending { pending, joined } => {
				if joined {
					self.metrics.record_join();
				}

				pending
			},
		};
		let outcome = pending.outcome.get_or_init(|| self.run_refresh(&pending)).await;

		match outcome {
			RefreshOutcome::Renewed { access, .. } => Ok(access.clone()),
			RefreshOutcome::Expired => Err(Error::SessionExpired),
			RefreshOutcome::Unavailable(message) =>
				Err(TransportError::RefreshUnavailable { message: message.clone() }.into()),
		}
	}

	async fn run_refresh(&self, pending: &Arc<PendingRefresh>) -> RefreshOutcome {
		let outcome = obs::observe(FlowKind::Refresh, "run_refresh", async {
			self.metrics.record_attempt();

			let request =
				ApiRequest::post(self.endpoints.refresh.as_str()).bearer(&pending.refresh_token)?;
			let response = self.transport.send(request).await?;

			if response.status.is_client_error() {
				return Ok(RefreshOutcome::Expired);
			}
			if !response.status.is_success() {
				return Ok(RefreshOutcome::Unavailable(format!(
					"refresh endpoint answered {}",
					response.status
				)));
			}

			// The server consumed the presented token even if the new pair is unreadable.
			let Ok(pair) = response.json::<TokenPairResponse>() else {
				return Ok(RefreshOutcome::Expired);
			};

			Ok(RefreshOutcome::Renewed {
				access: TokenSecret::new(pair.access_token),
				refresh: TokenSecret::new(pair.refresh_token),
			})
		})
		.await
		.unwrap_or_else(|e| RefreshOutcome::Unavailable(e.to_string()));

		match &outcome {
			RefreshOutcome::Renewed { .. } => self.metrics.record_success(),
			_ => self.metrics.record_failure(),
		}

		self.session.settle(pending, &outcome);

		outcome
	}
}
impl Debug for RequestDispatcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestDispatcher")
			.field("session", &self.session)
			.field("endpoints", &self.endpoints)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}
