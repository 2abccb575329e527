//! Ordered interceptor chain in front of a terminal handler.

// self
use crate::{
	_prelude::*,
	service::{ServiceFuture, ServiceRequest},
};

/// Cross-cutting step that may inspect or short-circuit a request before the handler runs.
pub trait Interceptor
where
	Self: Send + Sync,
{
	/// Handles `request`, calling [`Next::run`] to continue down the chain.
	fn intercept<'a>(&'a self, request: ServiceRequest, next: Next<'a>) -> ServiceFuture<'a>;
}

/// Terminal request handler.
pub trait Handler
where
	Self: Send + Sync,
{
	/// Produces the response for `request`.
	fn call(&self, request: ServiceRequest) -> ServiceFuture<'_>;
}

/// Remainder of a chain, handed to each [`Interceptor`].
#[derive(Clone, Copy)]
pub struct Next<'a> {
	interceptors: &'a [Arc<dyn Interceptor>],
	handler: &'a dyn Handler,
}
impl<'a> Next<'a> {
	/// Runs the next interceptor, or the handler once every interceptor has run.
	pub fn run(self, request: ServiceRequest) -> ServiceFuture<'a> {
		match self.interceptors.split_first() {
			Some((first, rest)) =>
				first.intercept(request, Next { interceptors: rest, handler: self.handler }),
			None => self.handler.call(request),
		}
	}
}
impl Debug for Next<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Next").field("remaining", &self.interceptors.len()).finish()
	}
}

/// Interceptors run in insertion order, then the handler.
#[derive(Clone)]
pub struct Chain {
	interceptors: Vec<Arc<dyn Interceptor>>,
	handler: Arc<dyn Handler>,
}
impl Chain {
	/// Creates a chain with no interceptors.
	pub fn new(handler: impl 'static + Handler) -> Self {
		Self { interceptors: Vec::new(), handler: Arc::new(handler) }
	}

	/// Appends an interceptor; it runs after every interceptor added before it.
	pub fn with(mut self, interceptor: impl 'static + Interceptor) -> Self {
		self.interceptors.push(Arc::new(interceptor));

		self
	}

	/// Runs `request` through the chain.
	pub fn handle(&self, request: ServiceRequest) -> ServiceFuture<'_> {
		Next { interceptors: &self.interceptors, handler: self.handler.as_ref() }.run(request)
	}
}
impl Debug for Chain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Chain").field("interceptors", &self.interceptors.len()).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use http::StatusCode;
	// self
	use super::*;
	use crate::service;

	const TRACE: &str = "x-trace";

	struct Tag(&'static str);
	impl Interceptor for Tag {
		fn intercept<'a>(&'a self, mut request: ServiceRequest, next: Next<'a>) -> ServiceFuture<'a> {
			Box::pin(async move {
				let trace = request
					.headers()
					.get(TRACE)
					.and_then(|v| v.to_str().ok())
					.map(|v| format!("{v},{}", self.0))
					.unwrap_or_else(|| self.0.to_owned());

				request.headers_mut().insert(TRACE, trace.parse().expect("Trace should be ASCII."));

				next.run(request).await
			})
		}
	}

	struct Reject;
	impl Interceptor for Reject {
		fn intercept<'a>(&'a self, _: ServiceRequest, _: Next<'a>) -> ServiceFuture<'a> {
			Box::pin(async { service::error_response(StatusCode::FORBIDDEN, "Rejected") })
		}
	}

	struct Echo;
	impl Handler for Echo {
		fn call(&self, request: ServiceRequest) -> ServiceFuture<'_> {
			Box::pin(async move {
				let trace = request.headers().get(TRACE).cloned();
				let mut response = http::Response::new(Vec::new());

				if let Some(trace) = trace {
					response.headers_mut().insert(TRACE, trace);
				}

				response
			})
		}
	}

	#[tokio::test]
	async fn interceptors_run_in_insertion_order() {
		let chain = Chain::new(Echo).with(Tag("first")).with(Tag("second"));
		let response = chain.handle(http::Request::new(Vec::new())).await;

		assert_eq!(response.headers()[TRACE], "first,second");
	}

	#[tokio::test]
	async fn interceptors_can_short_circuit() {
		let chain = Chain::new(Echo).with(Reject).with(Tag("unreached"));
		let response = chain.handle(http::Request::new(Vec::new())).await;

		assert_eq!(response.status(), StatusCode::FORBIDDEN);
		assert!(response.headers().get(TRACE).is_none());
	}
}
