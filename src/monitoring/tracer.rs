/*!
 * Structured Tracing
 * Subscriber setup and segment spans using the tracing crate
 *
 * Features:
 * - Env-filtered subscriber, human-readable or JSON
 * - RAII segment spans that start and end a latency segment and record
 *   the resulting block-timeout window
 */

use crate::core::types::{SegmentId, Ticks};
use crate::segment::{segment_end, segment_start, SegmentError};
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - ADAPTIVE_LOCK_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling it again, or after the host installed its own subscriber, is a no-op.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("ADAPTIVE_LOCK_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json = use_json, "lock tracing initialized");
    }
}

/// Latency segment bound to a tracing span
///
/// Starts segment `id` on creation and ends it with `required_latency` when
/// dropped, recording the updated window on the span.
pub struct SegmentSpan {
    span: tracing::Span,
    id: SegmentId,
    required_latency: Ticks,
}

impl SegmentSpan {
    /// Start segment `id` with a budget of `required_latency` ticks
    pub fn new(id: SegmentId, required_latency: Ticks) -> Result<Self, SegmentError> {
        let span = span!(
            Level::DEBUG,
            "segment",
            id,
            required_latency,
            elapsed = tracing::field::Empty,
            wait_time = tracing::field::Empty,
        );
        segment_start(id)?;
        Ok(Self {
            span,
            id,
            required_latency,
        })
    }

    /// Segment id this span tracks
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for SegmentSpan {
    fn drop(&mut self) {
        match segment_end(self.id, self.required_latency) {
            Ok(end) => {
                self.span.record("elapsed", end.elapsed);
                self.span.record("wait_time", end.wait_time);
            }
            Err(error) => {
                let _entered = self.span.enter();
                warn!(id = self.id, %error, "segment span ended out of order");
            }
        }
    }
}

/// Start a traced segment
pub fn span_segment(id: SegmentId, required_latency: Ticks) -> Result<SegmentSpan, SegmentError> {
    SegmentSpan::new(id, required_latency)
}
