//! The body capture tap.
//!
//! A tap sits in front of a handler. [`BodyTap::intercept`] drains the request body
//! once, keeps a copy for the checker and rebuilds the request around a fresh
//! reader so the handler still sees the complete body. Once the handler has
//! produced a response, [`BodyTap::observe`] runs the comparison and forwards any
//! divergence to the diagnostic sink.

use crate::body::{ReplayBody, ReplayReader};
use crate::capture::CapturedBody;
use crate::checker::{ComparisonOutcome, ConsistencyChecker};
use crate::error::{BoxError, CaptureError};
use crate::report::{DiagnosticSink, ExchangeMeta, TracingSink};
use http::Request;
use http_body::Body as HttpBody;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct BodyTap {
    checker: Arc<ConsistencyChecker>,
    sink: Arc<dyn DiagnosticSink>,
}

/// A request whose body has been captured, ready to be passed downstream.
#[derive(Debug)]
pub struct Tapped {
    pub request: Request<ReplayReader>,
    pub captured: CapturedBody,
}

impl BodyTap {
    /// A tap reporting divergences through [`TracingSink`].
    pub fn new(checker: Arc<ConsistencyChecker>) -> Self {
        Self::with_sink(checker, Arc::new(TracingSink))
    }

    pub fn with_sink(checker: Arc<ConsistencyChecker>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { checker, sink }
    }

    pub fn checker(&self) -> &Arc<ConsistencyChecker> {
        &self.checker
    }

    /// Captures the body of `request`.
    ///
    /// Head, extensions included, is kept untouched. On failure nothing is recorded
    /// and the checker never hears about this request.
    pub async fn intercept<B>(&self, request: Request<B>) -> Result<Tapped, CaptureError>
    where
        B: HttpBody,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();

        let replay = match ReplayBody::capture(body).await {
            Ok(replay) => replay,
            Err(e) => {
                warn!(method = %parts.method, uri = %parts.uri, cause = %e, "request body capture failed, skip comparison");
                return Err(e);
            }
        };

        let request = Request::from_parts(parts, replay.reader());
        let captured = self.checker.record(replay.into_bytes());
        debug!(sequence = captured.sequence(), len = captured.len(), "request body captured");

        Ok(Tapped { request, captured })
    }

    /// Checks `captured` against the baseline and reports a divergence, if any, with `meta`.
    pub fn observe(&self, captured: CapturedBody, meta: &ExchangeMeta) -> ComparisonOutcome {
        let outcome = self.checker.check(captured);
        if let ComparisonOutcome::Diverged(report) = &outcome {
            self.sink.report(report, meta);
        }
        outcome
    }
}

impl fmt::Debug for BodyTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyTap").field("checker", &self.checker).finish_non_exhaustive()
    }
}
