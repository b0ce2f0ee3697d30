//! Job attribute names read or written by compiled rules.

pub const DESIRED_SITES: &str = "DESIRED_Sites";
pub const SUBTASK_NAME: &str = "WMAgent_SubTaskName";
pub const REQUEST_NAME: &str = "WMAgent_RequestName";
pub const GLOBAL_JOB_ID: &str = "GlobalJobId";
pub const JOB_STATUS: &str = "JobStatus";
pub const JOB_PRIO: &str = "JobPrio";
pub const ACCOUNTING_GROUP: &str = "AccountingGroup";
pub const RANK: &str = "Rank";
pub const GLIDEIN_SITE: &str = "GLIDEIN_CMSSite";
pub const EXT_DESIRED_SITES: &str = "ExtDESIRED_Sites";

pub const ORIGINAL_MEMORY: &str = "OriginalMemory";
pub const ORIGINAL_CPUS: &str = "OriginalCpus";
pub const ORIGINAL_MAX_WALL_TIME: &str = "OriginalMaxWallTimeMins";
pub const ESTIMATED_SINGLE_CORE_MINS: &str = "EstimatedSingleCoreMins";
pub const ESTIMATED_INPUT_RATE: &str = "EstimatedInputRateKBs";
pub const EXTRA_MEMORY: &str = "ExtraMemory";
pub const MIN_CORES: &str = "MinCores";
pub const MAX_CORES: &str = "MaxCores";
pub const REQUEST_CPUS: &str = "RequestCpus";
pub const REQUEST_DISK: &str = "RequestDisk";
pub const MAX_WALL_TIME: &str = "MaxWallTimeMins";

pub const POST_JOB_PRIO1: &str = "PostJobPrio1";
pub const POST_JOB_PRIO2: &str = "PostJobPrio2";
pub const AGENT_POST_JOB_PRIO1: &str = "WMAgent_PostJobPrio1";
pub const AGENT_POST_JOB_PRIO2: &str = "WMAgent_PostJobPrio2";
pub const ROUTER_POST_JOB_PRIO1: &str = "JR_PostJobPrio1";
pub const ROUTER_POST_JOB_PRIO2: &str = "JR_PostJobPrio2";

/// Saved whitelists, one per rule family that rewrites `DESIRED_Sites`.
pub const PRE_DESIRED_SITES: &str = "Pre_DESIRED_Sites";
pub const PREV_DESIRED_SITES: &str = "Prev_DESIRED_Sites";
pub const HELD_DESIRED_SITES: &str = "Held_DESIRED_Sites";
pub const HOLDING_DESIRED_SITES: &str = "Holding_DESIRED_Sites";
pub const RELEASING_DESIRED_SITES: &str = "Releasing_DESIRED_Sites";
pub const T0_OFF_DESIRED_SITES: &str = "T0Off_DESIRED_Sites";
