//! Request body replay consistency checking
//!
//! Middleware stacks often read a request body more than once: a logger peeks at
//! it, an inspection layer parses it, a retry wrapper resends it. If any of those
//! layers fails to restore the stream, later readers see an empty, truncated or
//! reordered body. This crate catches that class of bug by capturing the body every
//! time a handler receives it and comparing each capture with the first one.
//!
//! # Components
//!
//! - [`ReplayBody`]: drains a single read body into a buffer and hands out fresh
//!   readers over it
//! - [`ConsistencyChecker`]: keeps the first captured body as the baseline and
//!   compares every later capture against it
//! - [`BodyTap`]: the interception point, capture before the handler and
//!   comparison after it
//! - [`DiagnosticSink`]: where divergences are reported, [`TracingSink`] by default
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use replay_check::{ComparisonOutcome, ConsistencyChecker};
//!
//! let checker = ConsistencyChecker::new();
//!
//! assert!(matches!(checker.capture(Bytes::from_static(b"x")), ComparisonOutcome::BaselineSet { .. }));
//! assert!(matches!(checker.capture(Bytes::from_static(b"x")), ComparisonOutcome::Consistent { .. }));
//!
//! let outcome = checker.capture(Bytes::new());
//! let report = outcome.report().unwrap();
//! assert_eq!(report.before().as_ref(), b"x");
//! assert!(report.after().is_empty());
//! ```

mod body;
mod capture;
mod checker;
mod error;
mod report;
mod tap;

pub mod diff;

pub use body::{ReplayBody, ReplayReader};
pub use capture::CapturedBody;
pub use checker::{ComparisonOutcome, ConsistencyChecker};
pub use error::{BoxError, CaptureError};
pub use report::{DiagnosticSink, DivergenceReport, Dump, ExchangeMeta, TracingSink};
pub use tap::{BodyTap, Tapped};
