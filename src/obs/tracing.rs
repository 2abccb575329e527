// self
use crate::{_prelude::*, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapper used by session flows.
///
/// Spans carry `flow`, `stage`, and a `subject` field that stays empty until
/// [`record_subject`](Self::record_subject) is called. Token material is never recorded.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"auth_session.flow",
				flow = kind.as_str(),
				stage,
				subject = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Attaches the subject identifier once it is known.
	pub fn record_subject(&self, subject: &str) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("subject", subject);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = subject;
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Returns the span of the innermost session flow, or a disabled span outside of one.
pub fn current_flow() -> FlowSpan {
	#[cfg(feature = "tracing")]
	{
		FlowSpan { span: tracing::Span::current() }
	}
	#[cfg(not(feature = "tracing"))]
	{
		FlowSpan {}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = FlowSpan::new(FlowKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn record_subject_is_safe_outside_a_subscriber() {
		FlowSpan::new(FlowKind::Login, "test").record_subject("user-1");
		current_flow().record_subject("user-1");
	}
}
