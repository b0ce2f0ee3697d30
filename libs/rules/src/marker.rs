//! Marker flags.
//!
//! A marker is a boolean job attribute recording that a rule category has
//! already acted on the job. Absent and `false` both mean "not yet".
//!
//! # Invariants
//!
//! - A one-shot rule guards on its marker not being true and sets it true
//! - Only release and reset rules set a marker back to false

use jobrouter_sites::SiteName;

/// Set false by every rule so the router re-evaluates the job.
pub const HAS_BEEN_ROUTED: &str = "HasBeenRouted";

pub const HAS_BEEN_ROUTED_OVERFLOW: &str = "HasBeenRouted_Overflow";
pub const HAS_BEEN_REPLACED: &str = "HasBeenReplaced";
pub const HAS_BEEN_SORTED: &str = "HasBeenSorted";
pub const HAS_PRIO_CORRECTION: &str = "HasPrioCorrection";
pub const HAS_BEEN_MEMORY_TUNED: &str = "HasBeenMemoryTuned";
pub const HAS_BEEN_TIMING_TUNED: &str = "HasBeenTimingTuned";
pub const HAS_BEEN_SLOPE_TUNED: &str = "HasBeenSlopeTuned";
pub const HAS_BEEN_READ_TUNED: &str = "HasBeenReadTuned";
pub const RESIZE_JOB: &str = "WMCore_ResizeJob";
pub const HAS_BEEN_SET_HELD: &str = "HasBeenSetHeld";
pub const HAS_BEEN_RAISED_HIGH_PRIO: &str = "HasBeenRaisedHighPrio";
pub const OUT_OF_T0: &str = "OutOfT0";

const HELD_FROM_PREFIX: &str = "HasBeenHeldFrom";

/// Per-site hold marker: `HasBeenHeldFrom<site>`.
pub fn held_from(site: &SiteName) -> String {
    format!("{HELD_FROM_PREFIX}{site}")
}

/// Returns true if `name` is the marker of `flag`, ignoring case.
pub fn same_flag(name: &str, flag: &str) -> bool {
    name.eq_ignore_ascii_case(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_from_is_site_specific() {
        let cern = SiteName::parse("T2_CH_CERN").unwrap();
        let hlt = SiteName::parse("T2_CH_CERN_HLT").unwrap();
        assert_eq!(held_from(&cern), "HasBeenHeldFromT2_CH_CERN");
        assert_ne!(held_from(&cern), held_from(&hlt));
    }

    #[test]
    fn test_same_flag_ignores_case() {
        assert!(same_flag("hasbeenrouted", HAS_BEEN_ROUTED));
        assert!(!same_flag("HasBeenRouted_Overflow", HAS_BEEN_ROUTED));
    }
}
