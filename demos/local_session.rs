//! Runs the whole session lifecycle in one process.
//!
//! 1. Build an [`AuthService`] over a [`MemoryStore`] and a [`MemoryDirectory`] with one user.
//! 2. Point a [`RequestDispatcher`] at it through a [`LocalTransport`].
//! 3. Sign in, swap the access token for a stale one, and watch the dispatcher refresh and retry.
//! 4. Sign out and confirm the old refresh token no longer rotates.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
// self
use auth_session::{
	auth::{SubjectId, TokenSecret},
	client::{LocalTransport, RequestDispatcher, SessionClient},
	config::AuthConfig,
	directory::MemoryDirectory,
	issuer::TokenIssuer,
	service::AuthService,
	store::MemoryStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = AuthConfig::builder()
		.access_secret("demo-access-secret")
		.refresh_secret("demo-refresh-secret")
		.build()?;
	let directory = Arc::new(MemoryDirectory::default());

	directory.register(SubjectId::new("user-1")?, "a@b.com", "Secret1!");

	let service =
		AuthService::new(TokenIssuer::new(config, Arc::new(MemoryStore::default()), directory));
	let session = Arc::new(SessionClient::in_memory());
	let dispatcher =
		RequestDispatcher::new(Arc::new(LocalTransport::new(service.clone())), session.clone());

	session.subscribe(|event| println!("session event: {event:?}"));

	let user = dispatcher.login("a@b.com", "Secret1!").await?;

	println!("signed in as {} ({})", user.email, &*user.id);

	let Some(refresh) = session.get().refresh_token else {
		return Err(color_eyre::eyre::eyre!("login did not store a refresh token"));
	};

	session.set(TokenSecret::new("stale"), refresh.clone())?;

	let profile = dispatcher.profile().await?;

	println!("profile after a transparent refresh: {} exp={}", profile.email, profile.exp);
	println!("refresh attempts: {}", dispatcher.metrics().attempts());

	dispatcher.logout().await?;

	let replay = service.issuer().rotate(&refresh).await;

	println!("rotating the pre-refresh token after logout: {replay:?}");

	Ok(())
}
