//! Test fixtures shared by the job-router crates.
//!
//! Everything here panics on bad input; it is only linked into tests.

use jobrouter_expr::{JobAd, Value};
use jobrouter_policy::PolicyDocument;

/// A policy exercising every category except `reset_routing`, so the rules
/// it compiles to converge on any job.
pub const SAMPLE_POLICY: &str = r#"{
    "overflow": {
        "reversed_mapping": {
            "T2_US_Purdue": ["T1_US_FNAL", "T2_US_Nebraska"],
            "T2_US_MIT": ["T1_US_FNAL"],
            "T2_CH_CERN": ["T1_IT_CNAF"]
        },
        "modifications": {
            "wf_alpha": {
                "/wf_alpha/Gen": {"AddWhitelist": ["T2_US_Purdue", "T2_US_MIT"]},
                "/wf_alpha/Digi": {"AddWhitelist": ["T2_US_MIT", "T2_US_Purdue"]}
            },
            "wf_beta": {
                "/wf_beta/Reco": {"AddWhitelist": ["T2_CH_CERN"]},
                "/wf_beta/Merge": {"ReplaceSiteWhitelist": ["T1_US_FNAL", "T2_CH_CERN"]}
            }
        }
    },
    "memory": {"2000": ["/wf_alpha/Gen", "/wf_alpha/Digi"], "4000": ["/wf_beta/Reco"]},
    "time": {"600": ["/wf_alpha/Gen"]},
    "slope": {"250": ["/wf_beta/Reco"]},
    "read": {"5000": ["/wf_alpha/Digi"]},
    "resizing": {
        "/wf_alpha/Gen": {"minCores": 2, "maxCores": 4, "memoryPerThread": 1500},
        "/wf_beta/Reco": {"memoryPerThread": 2000}
    },
    "hold": {"/wf_gamma/Skim": []},
    "release": {"/wf_delta/Skim": []},
    "hold_site": ["T2_FR_GRIF"],
    "release_site": ["T2_IT_Bari"],
    "highprio": ["wf_alpha"],
    "speed_drain": ["vocms0250"]
}"#;

/// Parses a policy document.
///
/// # Panics
///
/// If `json` is not a valid policy.
pub fn policy(json: &str) -> PolicyDocument {
    match PolicyDocument::parse(json) {
        Ok(doc) => doc,
        Err(err) => panic!("invalid policy fixture: {err}"),
    }
}

/// [`SAMPLE_POLICY`], parsed.
pub fn sample_policy() -> PolicyDocument {
    policy(SAMPLE_POLICY)
}

/// Builds job ads shaped like the ones an agent submits.
#[derive(Debug, Clone)]
pub struct JobBuilder {
    ad: JobAd,
}

impl JobBuilder {
    /// An idle job of `task` in `workflow` with typical resource requests.
    pub fn new(workflow: &str, task: &str) -> Self {
        let mut ad = JobAd::new();
        ad.set("WMAgent_RequestName", workflow);
        ad.set("WMAgent_SubTaskName", task);
        ad.set("GlobalJobId", format!("vocms0100.cern.ch#{workflow}.0#1700000000"));
        ad.set("JobStatus", 1);
        ad.set("JobPrio", 100_000);
        ad.set("DESIRED_Sites", "T1_US_FNAL");
        ad.set("OriginalMemory", 2500);
        ad.set("OriginalCpus", 1);
        ad.set("RequestCpus", 1);
        ad.set("OriginalMaxWallTimeMins", 720);
        ad.set("MaxWallTimeMins", 720);
        ad.set("EstimatedSingleCoreMins", 480);
        ad.set("RequestDisk", 4_000_000);
        ad.set("PostJobPrio1", -1);
        ad.set("PostJobPrio2", 8);
        Self { ad }
    }

    pub fn sites(self, sites: &str) -> Self {
        self.with("DESIRED_Sites", sites)
    }

    pub fn memory(self, mb: i64) -> Self {
        self.with("OriginalMemory", mb)
    }

    pub fn cpus(self, cpus: i64) -> Self {
        self.with("OriginalCpus", cpus).with("RequestCpus", cpus)
    }

    /// Marks the job as resizable by the router.
    pub fn resizable(self) -> Self {
        self.with("WMCore_ResizeJob", false)
    }

    pub fn job_id(self, id: &str) -> Self {
        self.with("GlobalJobId", id)
    }

    /// Sets an arbitrary attribute.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.ad.set(name, value);
        self
    }

    pub fn build(self) -> JobAd {
        self.ad
    }
}

/// Parses a job ad from JSON.
///
/// # Panics
///
/// If `json` is not a JSON object.
pub fn job_from_json(json: &str) -> JobAd {
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(err) => panic!("invalid job fixture: {err}"),
    };
    match JobAd::from_json(&value) {
        Ok(ad) => ad,
        Err(err) => panic!("invalid job fixture: {err}"),
    }
}
