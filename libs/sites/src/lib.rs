//! # jobrouter-sites
//!
//! Site identifiers and site-list handling for the job-router policy compiler.
//!
//! ## Site Format
//!
//! Sites are named `T{tier}_{country}_{name}`:
//! - `T1_US_FNAL`
//! - `T2_CH_CERN`
//! - `T2_CH_CERN_HLT`
//!
//! Whitelists travel on job records as a single comma-separated string
//! (`"T1_US_FNAL,T2_CH_CERN"`); the [`sitelist`] helpers operate on that form.
//!
//! ## Overflow Mapping
//!
//! The [`mapping`] module turns the policy's reverse destination→sources
//! mapping into per-whitelist scoped source→destinations maps, one per
//! distinct additive whitelist.

mod error;
pub mod mapping;
mod site;
pub mod sitelist;

pub use error::SiteError;
pub use mapping::{
    GroupInsert, ScopedMapping, SiteMapGroup, SourceToDests, WhitelistGroups, WhitelistKey,
};
pub use site::SiteName;
