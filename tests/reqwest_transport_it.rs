#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
// self
use auth_session::{
	auth::TokenSecret,
	client::{RequestDispatcher, ReqwestTransport, SessionClient, SessionState},
	error::{Error, TransportError},
	url::Url,
	wire,
};

fn dispatcher(base_url: &str) -> RequestDispatcher {
	let transport = ReqwestTransport::new(Url::parse(base_url).expect("Base URL should parse."))
		.expect("Transport should build.");
	let session = SessionClient::in_memory();

	session
		.set(TokenSecret::new("stale"), TokenSecret::new("r-1"))
		.expect("Session write should succeed.");

	RequestDispatcher::new(Arc::new(transport), Arc::new(session))
}

#[tokio::test]
async fn stale_access_token_is_refreshed_over_http() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(wire::PROFILE_PATH).header("authorization", "Bearer stale");
			then.status(401).header("content-type", "application/json").body(
				r#"{"statusCode":401,"message":"Unauthorized","error":"Unauthorized"}"#,
			);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(wire::REFRESH_PATH).header("authorization", "Bearer r-1");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"accessToken":"a-2","refreshToken":"r-2"}"#);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path(wire::PROFILE_PATH).header("authorization", "Bearer a-2");
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":"user-1","sub":"user-1","email":"a@b.com","iat":1700000000,"exp":1700000900}"#,
			);
		})
		.await;
	let dispatcher = dispatcher(&server.base_url());
	let profile = dispatcher.profile().await.expect("Profile should succeed after a refresh.");
	let snapshot = dispatcher.session().get();

	assert_eq!(profile.email, "a@b.com");
	assert!(profile.created_at.is_none());
	assert_eq!(snapshot.access_token, Some(TokenSecret::new("a-2")));
	assert_eq!(snapshot.refresh_token, Some(TokenSecret::new("r-2")));

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_server_error_keeps_the_session() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(wire::PROFILE_PATH);
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(wire::REFRESH_PATH);
			then.status(500);
		})
		.await;
	let dispatcher = dispatcher(&server.base_url());
	let err = dispatcher.profile().await.expect_err("A failing refresh endpoint should surface.");
	let snapshot = dispatcher.session().get();

	assert!(matches!(err, Error::Transport(TransportError::RefreshUnavailable { .. })));
	assert_eq!(snapshot.state, SessionState::Authenticated);
	assert_eq!(snapshot.refresh_token, Some(TokenSecret::new("r-1")));

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_rejection_expires_the_session() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(wire::PROFILE_PATH);
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(wire::REFRESH_PATH);
			then.status(401);
		})
		.await;

	let dispatcher = dispatcher(&server.base_url());
	let err = dispatcher.profile().await.expect_err("A rejected refresh should expire the session.");

	assert!(matches!(err, Error::SessionExpired));
	assert_eq!(dispatcher.session().state(), SessionState::Expired);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
	let dispatcher = dispatcher("http://127.0.0.1:1");
	let err = dispatcher.profile().await.expect_err("An unreachable server should fail.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
	assert_eq!(dispatcher.session().state(), SessionState::Authenticated);
}
