//! Client-side session cache: volatile access token, durable refresh token.
//!
//! [`SessionClient`] is the single authoritative owner of the token pair. Every write (`set`,
//! `clear`, a settled refresh) advances the session epoch, which lets the dispatcher tell a 401
//! caused by the current token apart from one caused by a token that has since been replaced.
//! The single-flight refresh slot lives here too, under the same lock as the pair, so joining a
//! refresh and observing the epoch happen atomically.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::storage::{MemoryStorage, SessionStorage},
	obs::{self, FlowKind},
	wire::REFRESH_TOKEN_STORAGE_KEY,
};

/// Lifecycle state of the client session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
	/// No refresh token is held.
	Anonymous,
	/// A refresh token is held; the access token may be missing right after a restore.
	Authenticated,
	/// A refresh call is in flight.
	Refreshing,
	/// The refresh token was rejected; the caller must sign in again.
	Expired,
}

/// Notification delivered to session observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
	/// A pair was stored by login.
	Authenticated,
	/// A refresh call started.
	Refreshing,
	/// A refresh call stored a new pair.
	Refreshed,
	/// The refresh token was rejected and the pair dropped. Emitted once per failed refresh.
	Expired,
	/// The pair was dropped on request.
	Cleared,
}

/// Point-in-time view of the session.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
	/// Current access token, if any.
	pub access_token: Option<TokenSecret>,
	/// Current refresh token, if any.
	pub refresh_token: Option<TokenSecret>,
	/// Lifecycle state.
	pub state: SessionState,
	/// Write counter; advances on every change to the pair.
	pub epoch: u64,
}
impl SessionSnapshot {
	/// Returns `true` while a refresh token is held.
	pub fn is_authenticated(&self) -> bool {
		self.refresh_token.is_some()
	}
}

/// Handle returned by [`SessionClient::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Resolution of one refresh, shared by every call that joined it.
#[derive(Clone, Debug)]
pub(crate) enum RefreshOutcome {
	Renewed { access: TokenSecret, refresh: TokenSecret },
	Expired,
	Unavailable(String),
}

/// One in-flight refresh for a given session epoch.
#[derive(Debug)]
pub(crate) struct PendingRefresh {
	pub(crate) epoch: u64,
	pub(crate) refresh_token: TokenSecret,
	pub(crate) outcome: AsyncOnceCell<RefreshOutcome>,
}

/// What a call that saw a 401 should do next.
#[derive(Debug)]
pub(crate) enum RefreshSlot {
	/// Await this refresh. `joined` is `false` for the call that opened it.
	Pending { pending: Arc<PendingRefresh>, joined: bool },
	/// The pair already moved past the failed token; retry with this one.
	Current(TokenSecret),
}

type Observer = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Debug)]
struct Inner {
	access: Option<TokenSecret>,
	refresh: Option<TokenSecret>,
	state: SessionState,
	epoch: u64,
	pending: Option<Arc<PendingRefresh>>,
}

/// Sole owner and writer of the client's token pair.
pub struct SessionClient {
	inner: Mutex<Inner>,
	storage: Arc<dyn SessionStorage>,
	observers: Mutex<Vec<(SubscriptionId, Observer)>>,
	next_subscription: AtomicU64,
}
impl SessionClient {
	/// Restores the session from durable storage.
	///
	/// A stored refresh token yields [`SessionState::Authenticated`] with no access token; the
	/// first protected call then refreshes.
	pub fn restore(storage: Arc<dyn SessionStorage>) -> Result<Self> {
		let refresh = storage.load(REFRESH_TOKEN_STORAGE_KEY)?.map(TokenSecret::new);
		let state =
			if refresh.is_some() { SessionState::Authenticated } else { SessionState::Anonymous };

		Ok(Self::with_storage(storage, refresh, state))
	}

	/// Session backed by process-local storage.
	pub fn in_memory() -> Self {
		Self::with_storage(Arc::new(MemoryStorage::default()), None, SessionState::Anonymous)
	}

	fn with_storage(
		storage: Arc<dyn SessionStorage>,
		refresh: Option<TokenSecret>,
		state: SessionState,
	) -> Self {
		Self {
			inner: Mutex::new(Inner { access: None, refresh, state, epoch: 0, pending: None }),
			storage,
			observers: Mutex::new(Vec::new()),
			next_subscription: AtomicU64::new(0),
		}
	}

	/// Returns the current pair, state, and epoch.
	pub fn get(&self) -> SessionSnapshot {
		let inner = self.inner.lock();

		SessionSnapshot {
			access_token: inner.access.clone(),
			refresh_token: inner.refresh.clone(),
			state: inner.state,
			epoch: inner.epoch,
		}
	}

	/// Current lifecycle state.
	pub fn state(&self) -> SessionState {
		self.inner.lock().state
	}

	/// Stores a pair obtained from login and persists the refresh token.
	pub fn set(&self, access: TokenSecret, refresh: TokenSecret) -> Result<()> {
		{
			let mut inner = self.inner.lock();

			self.storage.save(REFRESH_TOKEN_STORAGE_KEY, refresh.expose())?;

			inner.access = Some(access);
			inner.refresh = Some(refresh);
			inner.state = SessionState::Authenticated;
			inner.epoch += 1;
		}

		self.notify(SessionEvent::Authenticated);

		Ok(())
	}

	/// Drops both tokens and removes the durable copy.
	pub fn clear(&self) -> Result<()> {
		let removed = {
			let mut inner = self.inner.lock();

			inner.access = None;
			inner.refresh = None;
			inner.state = SessionState::Anonymous;
			inner.epoch += 1;

			self.storage.remove(REFRESH_TOKEN_STORAGE_KEY)
		};

		self.notify(SessionEvent::Cleared);

		removed
	}

	/// Registers an observer. Observers run outside of any session lock.
	pub fn subscribe(
		&self,
		observer: impl 'static + Fn(&SessionEvent) + Send + Sync,
	) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));

		self.observers.lock().push((id, Arc::new(observer)));

		id
	}

	/// Removes an observer. Returns `false` if it was not registered.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut observers = self.observers.lock();
		let before = observers.len();

		observers.retain(|(registered, _)| *registered != id);

		observers.len() != before
	}

	/// Joins the refresh for `epoch`, opens one, or hands back a token that already replaced the
	/// failed one.
	pub(crate) fn refresh_slot(&self, epoch: u64) -> Result<RefreshSlot> {
		let slot = {
			let mut inner = self.inner.lock();

			if let Some(pending) = inner.pending.as_ref().filter(|p| p.epoch == inner.epoch) {
				return Ok(RefreshSlot::Pending { pending: pending.clone(), joined: true });
			}
			if inner.epoch != epoch {
				match (inner.state, inner.access.as_ref()) {
					(SessionState::Expired, _) => return Err(Error::SessionExpired),
					(SessionState::Anonymous, _) => return Err(Error::Unauthorized),
					(_, Some(access)) => return Ok(RefreshSlot::Current(access.clone())),
					_ => {},
				}
			}

			let Some(refresh_token) = inner.refresh.clone() else {
				return Err(if inner.state == SessionState::Expired {
					Error::SessionExpired
				} else {
					Error::Unauthorized
				});
			};
			let pending = Arc::new(PendingRefresh {
				epoch: inner.epoch,
				refresh_token,
				outcome: AsyncOnceCell::new(),
			});

			inner.pending = Some(pending.clone());
			inner.state = SessionState::Refreshing;

			RefreshSlot::Pending { pending, joined: false }
		};

		self.notify(SessionEvent::Refreshing);

		Ok(slot)
	}

	/// Applies a settled refresh and empties the slot. Writes are skipped when the pair changed
	/// while the refresh was in flight.
	pub(crate) fn settle(&self, pending: &Arc<PendingRefresh>, outcome: &RefreshOutcome) {
		let event = {
			let mut inner = self.inner.lock();

			if inner.pending.as_ref().is_some_and(|p| Arc::ptr_eq(p, pending)) {
				inner.pending = None;
			}
			if inner.epoch != pending.epoch {
				return;
			}

			match outcome {
				RefreshOutcome::Renewed { access, refresh } => {
					if self.storage.save(REFRESH_TOKEN_STORAGE_KEY, refresh.expose()).is_err() {
						obs::warn(FlowKind::Refresh, "Failed to persist the rotated refresh token.");
					}

					inner.access = Some(access.clone());
					inner.refresh = Some(refresh.clone());
					inner.state = SessionState::Authenticated;
					inner.epoch += 1;

					Some(SessionEvent::Refreshed)
				},
				RefreshOutcome::Expired => {
					if self.storage.remove(REFRESH_TOKEN_STORAGE_KEY).is_err() {
						obs::warn(FlowKind::Refresh, "Failed to remove the stored refresh token.");
					}

					inner.access = None;
					inner.refresh = None;
					inner.state = SessionState::Expired;
					inner.epoch += 1;

					Some(SessionEvent::Expired)
				},
				RefreshOutcome::Unavailable(_) => {
					inner.state = SessionState::Authenticated;

					None
				},
			}
		};

		if let Some(event) = event {
			if event == SessionEvent::Expired {
				obs::warn(FlowKind::Refresh, "Refresh token rejected; session expired.");
			}

			self.notify(event);
		}
	}

	fn notify(&self, event: SessionEvent) {
		let observers =
			self.observers.lock().iter().map(|(_, observer)| observer.clone()).collect::<Vec<_>>();

		for observer in observers {
			observer(&event);
		}
	}
}
impl Debug for SessionClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let inner = self.inner.lock();

		f.debug_struct("SessionClient")
			.field("state", &inner.state)
			.field("epoch", &inner.epoch)
			.field("has_access", &inner.access.is_some())
			.field("has_refresh", &inner.refresh.is_some())
			.finish()
	}
}
