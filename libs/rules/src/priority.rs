//! Priority encoding.
//!
//! The agent ships two native priorities per job: a workflow priority
//! (`PostJobPrio2`) and a site priority (`PostJobPrio1`, the negated number
//! of sites in the whitelist). The router folds those plus the task name
//! length, the wall time and the disk request into two composite sort keys.
//! Higher keys are matched first.
//!
//! ```text
//! primary   = workflow_prio * 100000 + subtask_name_len * 100 + site_prio
//! secondary = -wall_minutes - disk_kb / 1000000
//! ```
//!
//! # Invariants
//!
//! - Encoding is a pure function of its inputs
//! - With everything else fixed, fewer sites give a higher primary key

use jobrouter_expr::{Expr, Func, JobAd};

use crate::attr;

pub const WORKFLOW_WEIGHT: i64 = 100_000;
pub const NAME_LENGTH_WEIGHT: i64 = 100;
pub const DISK_KB_DIVISOR: i64 = 1_000_000;

/// Inputs to the composite sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorityInputs {
    pub workflow_prio: i64,
    pub subtask_name_len: i64,
    pub site_prio: i64,
    pub wall_minutes: i64,
    pub disk_kb: i64,
}

impl PriorityInputs {
    /// The agent's native site priority for a whitelist of `site_count` sites.
    pub fn site_prio_for(site_count: usize) -> i64 {
        i64::try_from(site_count).map(|n| -n).unwrap_or(i64::MIN)
    }

    /// Reads the inputs from a job ad that has not been corrected yet.
    ///
    /// Returns `None` if any input is missing or not an integer.
    pub fn from_ad(ad: &JobAd) -> Option<Self> {
        let int = |name: &str| ad.eval_attr(name).as_i64();
        let subtask = ad.eval_attr(attr::SUBTASK_NAME);
        Some(Self {
            workflow_prio: int(attr::POST_JOB_PRIO2)?,
            subtask_name_len: i64::try_from(subtask.as_str()?.chars().count()).ok()?,
            site_prio: int(attr::POST_JOB_PRIO1)?,
            wall_minutes: int(attr::MAX_WALL_TIME)?,
            disk_kb: int(attr::REQUEST_DISK)?,
        })
    }

    /// Primary sort key, or `None` on overflow.
    pub fn primary_key(&self) -> Option<i64> {
        self.workflow_prio
            .checked_mul(WORKFLOW_WEIGHT)?
            .checked_add(self.subtask_name_len.checked_mul(NAME_LENGTH_WEIGHT)?)?
            .checked_add(self.site_prio)
    }

    /// Secondary sort key, or `None` on overflow.
    pub fn secondary_key(&self) -> Option<i64> {
        self.wall_minutes
            .checked_neg()?
            .checked_sub(self.disk_kb.checked_div(DISK_KB_DIVISOR)?)
    }
}

/// The primary key as a rule expression over the saved agent priorities.
pub fn primary_expr() -> Expr {
    Expr::attr(attr::AGENT_POST_JOB_PRIO2) * Expr::lit(WORKFLOW_WEIGHT)
        + Expr::call(Func::Size, vec![Expr::attr(attr::SUBTASK_NAME)]) * Expr::lit(NAME_LENGTH_WEIGHT)
        + Expr::attr(attr::AGENT_POST_JOB_PRIO1)
}

/// The secondary key as a rule expression.
pub fn secondary_expr() -> Expr {
    -Expr::attr(attr::MAX_WALL_TIME) - Expr::attr(attr::REQUEST_DISK) / Expr::lit(DISK_KB_DIVISOR)
}
