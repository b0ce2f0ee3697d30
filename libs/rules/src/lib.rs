//! # jobrouter-rules
//!
//! Compiles a [`PolicyDocument`](jobrouter_policy::PolicyDocument) into an
//! ordered set of routing rules for the external job router.
//!
//! ## Rule model
//!
//! Every [`Rule`] carries:
//! - a guard: an AND of predicates over job attributes and marker flags
//! - mutations: copy, set, eval-set and delete, applied in order
//! - marker updates, applied after the mutations
//!
//! ## Invariants
//!
//! - Idempotence: once a rule has applied, its own guard no longer holds
//! - Mutual exclusion: two rules of one category never match the same job
//! - Determinism: the same document always yields the same rules, in
//!   [`EMISSION_ORDER`]
//! - Every rule resets `HasBeenRouted` to false so the router re-evaluates
//!   the job
//!
//! ## Output
//!
//! [`emit`] renders a [`RuleSet`] as ClassAd text or JSON; [`router`]
//! replays a rule set against a job ad the way the external router would.

pub mod attr;
mod category;
pub mod compile;
pub mod emit;
pub mod marker;
pub mod priority;
pub mod router;
mod rule;

pub use category::{Category, EMISSION_ORDER};
pub use compile::{compile, Compilation, CompileOptions, SkipReason, Skipped};
pub use emit::{ClassAdFormat, EmitError, Fingerprint, JsonFormat, RuleFormat, RuleSet};
pub use priority::PriorityInputs;
pub use router::{Router, Trace};
pub use rule::{MarkerUpdate, Mutation, Rule, RuleBuilder};
