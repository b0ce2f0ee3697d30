//! Rule categories and the order they are emitted in.

use std::fmt;

use serde::Serialize;

/// A family of rules compiled from one part of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Overflow,
    SortWhitelist,
    PriorityCorrection,
    Memory,
    Time,
    Slope,
    Resize,
    Read,
    Hold,
    Release,
    HoldSite,
    ReleaseSite,
    PriorityRaise,
    Drain,
    AdHoc,
    Reset,
}

/// The order categories are compiled and emitted in.
///
/// The router applies the first matching rule, so earlier categories take
/// precedence when several match the same job.
pub const EMISSION_ORDER: [Category; 16] = [
    Category::Overflow,
    Category::SortWhitelist,
    Category::PriorityCorrection,
    Category::Memory,
    Category::Time,
    Category::Slope,
    Category::Resize,
    Category::Read,
    Category::Hold,
    Category::Release,
    Category::HoldSite,
    Category::ReleaseSite,
    Category::PriorityRaise,
    Category::Drain,
    Category::AdHoc,
    Category::Reset,
];

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Overflow => "overflow",
            Category::SortWhitelist => "sort-whitelist",
            Category::PriorityCorrection => "priority-correction",
            Category::Memory => "memory",
            Category::Time => "time",
            Category::Slope => "slope",
            Category::Resize => "resize",
            Category::Read => "read",
            Category::Hold => "hold",
            Category::Release => "release",
            Category::HoldSite => "hold-site",
            Category::ReleaseSite => "release-site",
            Category::PriorityRaise => "priority-raise",
            Category::Drain => "drain",
            Category::AdHoc => "ad-hoc",
            Category::Reset => "reset",
        }
    }

    /// Position in [`EMISSION_ORDER`].
    pub fn position(&self) -> usize {
        EMISSION_ORDER
            .iter()
            .position(|c| c == self)
            .unwrap_or(EMISSION_ORDER.len())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
