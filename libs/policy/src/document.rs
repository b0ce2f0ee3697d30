//! Policy document types.
//!
//! # Invariants
//!
//! - Every category is optional and defaults to empty.
//! - A present category with the wrong shape fails the whole document.
//! - The legacy top-level overflow keys are merged into [`Overflow`];
//!   entries under the nested `overflow` key win on conflict.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::{coerce_threshold, PolicyError, ThresholdMap};

/// A parsed policy document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    /// Overflow routing: site mapping and per-task whitelist changes.
    pub overflow: Overflow,

    /// Multicore resizing, keyed by task.
    pub resizing: BTreeMap<String, ResizePolicy>,

    /// Input-rate tuning (KB/s).
    pub read: ThresholdMap,

    /// Memory tuning (MB).
    pub memory: ThresholdMap,

    /// Single-core wall-time tuning (minutes).
    pub time: ThresholdMap,

    /// Extra memory per thread (MB).
    pub slope: ThresholdMap,

    /// Tasks to hold. The site list is accepted but every site is held.
    pub hold: BTreeMap<String, Vec<String>>,

    /// Tasks to release.
    pub release: BTreeSet<String>,

    /// Sites to take out of every whitelist.
    pub hold_site: Vec<String>,

    /// Sites to put back.
    pub release_site: Vec<String>,

    /// Workflows (request names) to raise to the high-priority group.
    pub highprio: Vec<String>,

    /// Agent patterns whose idle jobs get their priority boosted.
    pub speed_drain: Vec<String>,

    /// Marker flags to clear on every job that carries them.
    pub reset_routing: Vec<String>,
}

/// The overflow section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Overflow {
    /// `dest → [source]`: jobs whitelisted at a source may also run at dest.
    #[serde(default)]
    pub reversed_mapping: BTreeMap<String, Vec<String>>,

    /// `workflow → task → modification`.
    #[serde(default)]
    pub modifications: BTreeMap<String, BTreeMap<String, TaskModification>>,
}

impl Overflow {
    /// Merges `other` into `self`; entries already in `self` win.
    fn merge_legacy(&mut self, other: Overflow) {
        for (dest, sources) in other.reversed_mapping {
            self.reversed_mapping.entry(dest).or_insert(sources);
        }
        for (workflow, tasks) in other.modifications {
            let existing = self.modifications.entry(workflow).or_default();
            for (task, modification) in tasks {
                existing.entry(task).or_insert(modification);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reversed_mapping.is_empty() && self.modifications.is_empty()
    }
}

/// Whitelist change for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskModification {
    /// Sites to allow in addition to the current whitelist.
    #[serde(rename = "AddWhitelist", default)]
    pub add_whitelist: Option<Vec<String>>,

    /// A whitelist that replaces the current one outright.
    #[serde(rename = "ReplaceSiteWhitelist", default)]
    pub replace_site_whitelist: Option<Vec<String>>,
}

/// Multicore resize parameters for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct ResizePolicy {
    #[serde(
        rename = "minCores",
        default = "default_min_cores",
        deserialize_with = "truncated_int"
    )]
    pub min_cores: i64,

    #[serde(
        rename = "maxCores",
        default = "default_max_cores",
        deserialize_with = "truncated_int"
    )]
    pub max_cores: i64,

    #[serde(rename = "memoryPerThread", deserialize_with = "truncated_int")]
    pub memory_per_thread: i64,
}

/// Reads a JSON number as an integer, truncating floats toward zero.
fn truncated_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(i) = number.as_i64() {
        return Ok(i);
    }
    coerce_threshold("resizing", &number.to_string()).map_err(serde::de::Error::custom)
}

fn default_min_cores() -> i64 {
    3
}

fn default_max_cores() -> i64 {
    8
}

/// Wire shape of the document. Everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPolicy {
    overflow: Option<Overflow>,
    reversed_mapping: Option<BTreeMap<String, Vec<String>>>,
    modifications: Option<BTreeMap<String, BTreeMap<String, TaskModification>>>,
    resizing: BTreeMap<String, ResizePolicy>,
    read: BTreeMap<String, Vec<String>>,
    memory: BTreeMap<String, Vec<String>>,
    time: BTreeMap<String, Vec<String>>,
    slope: BTreeMap<String, Vec<String>>,
    hold: BTreeMap<String, Vec<String>>,
    release: BTreeMap<String, serde_json::Value>,
    hold_site: Vec<String>,
    release_site: Vec<String>,
    highprio: Vec<String>,
    speed_drain: Vec<String>,
    reset_routing: Vec<String>,
}

impl PolicyDocument {
    /// Parses a document from JSON text.
    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(json)
    }

    /// Builds a document from an already-parsed JSON value.
    pub fn from_json(json: serde_json::Value) -> Result<Self, PolicyError> {
        if !json.is_object() {
            return Err(PolicyError::NotAnObject(json_type(&json)));
        }
        let raw: RawPolicy = serde_json::from_value(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPolicy) -> Result<Self, PolicyError> {
        let mut overflow = raw.overflow.unwrap_or_default();
        if raw.reversed_mapping.is_some() || raw.modifications.is_some() {
            tracing::debug!("merging top-level overflow keys into overflow section");
            overflow.merge_legacy(Overflow {
                reversed_mapping: raw.reversed_mapping.unwrap_or_default(),
                modifications: raw.modifications.unwrap_or_default(),
            });
        }

        Ok(PolicyDocument {
            overflow,
            resizing: raw.resizing,
            read: ThresholdMap::from_raw("read", raw.read)?,
            memory: ThresholdMap::from_raw("memory", raw.memory)?,
            time: ThresholdMap::from_raw("time", raw.time)?,
            slope: ThresholdMap::from_raw("slope", raw.slope)?,
            hold: raw.hold,
            release: raw.release.into_keys().collect(),
            hold_site: raw.hold_site,
            release_site: raw.release_site,
            highprio: raw.highprio,
            speed_drain: raw.speed_drain,
            reset_routing: raw.reset_routing,
        })
    }

    /// Returns true if no category has any entry.
    pub fn is_empty(&self) -> bool {
        self.overflow.is_empty()
            && self.resizing.is_empty()
            && self.read.is_empty()
            && self.memory.is_empty()
            && self.time.is_empty()
            && self.slope.is_empty()
            && self.hold.is_empty()
            && self.release.is_empty()
            && self.hold_site.is_empty()
            && self.release_site.is_empty()
            && self.highprio.is_empty()
            && self.speed_drain.is_empty()
            && self.reset_routing.is_empty()
    }
}

impl FromStr for PolicyDocument {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn json_type(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_empty_object_is_empty_policy() {
        let doc = PolicyDocument::parse("{}").unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc, PolicyDocument::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let doc = PolicyDocument::parse(r#"{"not_a_category": 5, "highprio": ["wf"]}"#).unwrap();
        assert_eq!(doc.highprio, vec!["wf".to_string()]);
    }

    #[test]
    fn test_non_object_root() {
        assert_eq!(
            PolicyDocument::parse("[]").unwrap_err(),
            PolicyError::NotAnObject("array")
        );
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = PolicyDocument::parse(r#"{"hold_site": "T2_CH_CERN"}"#).unwrap_err();
        assert!(matches!(err, PolicyError::Malformed(_)));

        let err = PolicyDocument::parse(r#"{"memory": {"2000": "/wf/A"}}"#).unwrap_err();
        assert!(matches!(err, PolicyError::Malformed(_)));
    }

    #[test]
    fn test_resize_defaults_and_required_field() {
        let doc = PolicyDocument::parse(r#"{"resizing": {"/wf/A": {"memoryPerThread": 1000}}}"#)
            .unwrap();
        assert_eq!(
            doc.resizing["/wf/A"],
            ResizePolicy {
                min_cores: 3,
                max_cores: 8,
                memory_per_thread: 1000,
            }
        );

        let err = PolicyDocument::parse(r#"{"resizing": {"/wf/A": {"minCores": 2}}}"#).unwrap_err();
        assert!(err.to_string().contains("memoryPerThread"));
    }

    #[rstest]
    #[case(r#"{"minCores": 4, "maxCores": 8, "memoryPerThread": 2000}"#, (4, 8, 2000))]
    #[case(r#"{"minCores": 4, "maxCores": 8.0, "memoryPerThread": 2000.0}"#, (4, 8, 2000))]
    #[case(r#"{"minCores": 2.9, "memoryPerThread": 1500.5}"#, (2, 8, 1500))]
    fn test_resize_numbers_accept_floats(#[case] body: &str, #[case] expected: (i64, i64, i64)) {
        let doc = PolicyDocument::parse(&format!(r#"{{"resizing": {{"/wf/A": {body}}}}}"#)).unwrap();
        let resize = doc.resizing["/wf/A"];
        assert_eq!(
            (resize.min_cores, resize.max_cores, resize.memory_per_thread),
            expected
        );
    }

    #[rstest]
    #[case(r#"{"memoryPerThread": "2000"}"#)]
    #[case(r#"{"memoryPerThread": 1e300}"#)]
    fn test_resize_numbers_must_be_numeric(#[case] body: &str) {
        let err = PolicyDocument::parse(&format!(r#"{{"resizing": {{"/wf/A": {body}}}}}"#))
            .unwrap_err();
        assert!(matches!(err, PolicyError::Malformed(_)));
    }

    #[test]
    fn test_release_keeps_task_names_only() {
        let doc = PolicyDocument::parse(r#"{"release": {"/wf/A": [], "/wf/B": null}}"#).unwrap();
        let tasks: Vec<&str> = doc.release.iter().map(String::as_str).collect();
        assert_eq!(tasks, vec!["/wf/A", "/wf/B"]);
    }

    #[test]
    fn test_legacy_overflow_keys_merge() {
        let doc = PolicyDocument::parse(
            r#"{
                "overflow": {
                    "reversed_mapping": {"T2_X": ["T1_A"]},
                    "modifications": {"wf": {"/wf/A": {"AddWhitelist": ["T2_X"]}}}
                },
                "reversed_mapping": {"T2_X": ["T1_IGNORED"], "T2_Y": ["T1_B"]},
                "modifications": {"wf": {"/wf/B": {"ReplaceSiteWhitelist": ["T2_Y"]}}}
            }"#,
        )
        .unwrap();

        let overflow = &doc.overflow;
        assert_eq!(overflow.reversed_mapping["T2_X"], vec!["T1_A".to_string()]);
        assert_eq!(overflow.reversed_mapping["T2_Y"], vec!["T1_B".to_string()]);
        assert_eq!(overflow.modifications["wf"].len(), 2);
        assert_eq!(
            overflow.modifications["wf"]["/wf/B"].replace_site_whitelist,
            Some(vec!["T2_Y".to_string()])
        );
    }

    #[test]
    fn test_missing_reversed_mapping_defaults_to_empty() {
        let doc = PolicyDocument::parse(
            r#"{"modifications": {"wf": {"/wf/A": {"AddWhitelist": ["T2_X"]}}}}"#,
        )
        .unwrap();
        assert!(doc.overflow.reversed_mapping.is_empty());
        assert_eq!(doc.overflow.modifications.len(), 1);
    }

    #[test]
    fn test_thresholds_are_truncated() {
        let doc = PolicyDocument::parse(r#"{"memory": {"12000.7": ["/wf/A"]}}"#).unwrap();
        assert_eq!(doc.memory.get(12000), Some(&["/wf/A".to_string()][..]));

        let err = PolicyDocument::parse(r#"{"slope": {"steep": ["/wf/A"]}}"#).unwrap_err();
        assert_eq!(
            err,
            PolicyError::InvalidThreshold {
                category: "slope",
                key: "steep".to_string(),
            }
        );
    }
}
