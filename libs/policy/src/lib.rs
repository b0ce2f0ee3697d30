//! # jobrouter-policy
//!
//! The operator policy document: what to redirect, tune, resize, hold,
//! release, raise or drain.
//!
//! ## Shape
//!
//! The document is a JSON object keyed by category. Unknown keys are
//! ignored; a known key with the wrong shape is an error. Two legacy
//! top-level keys, `reversed_mapping` and `modifications`, are folded into
//! the `overflow` section.
//!
//! ## Thresholds
//!
//! Threshold categories (`memory`, `time`, `slope`, `read`) are keyed by
//! numeric strings. Keys are coerced through float to integer, truncating
//! toward zero, and keys that coerce to the same integer are merged.

mod document;
mod error;
mod threshold;

pub use document::*;
pub use error::PolicyError;
pub use threshold::{coerce_threshold, ThresholdMap};
