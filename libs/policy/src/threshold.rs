//! Threshold-keyed task groups.

use std::collections::BTreeMap;

use crate::PolicyError;

/// Coerces a threshold key to an integer.
///
/// The key is read as a number and truncated toward zero, so `"12000.7"`
/// becomes `12000` and `"-1.5"` becomes `-1`. Keys that are not finite
/// numbers, or fall outside the i64 range, are rejected.
pub fn coerce_threshold(category: &'static str, key: &str) -> Result<i64, PolicyError> {
    let invalid = || PolicyError::InvalidThreshold {
        category,
        key: key.to_string(),
    };

    let trimmed = key.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(i);
    }

    let value: f64 = trimmed.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }

    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(truncated as i64)
}

/// Tasks grouped by integer threshold, in ascending threshold order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThresholdMap(BTreeMap<i64, Vec<String>>);

impl ThresholdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from raw document keys.
    ///
    /// Keys that coerce to the same integer are merged; their task lists are
    /// concatenated in key order with repeats removed.
    pub fn from_raw(
        category: &'static str,
        raw: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, PolicyError> {
        let mut map = ThresholdMap::new();
        for (key, tasks) in raw {
            let threshold = coerce_threshold(category, &key)?;
            map.insert(threshold, tasks);
        }
        Ok(map)
    }

    /// Adds tasks under `threshold`, merging with any existing group.
    pub fn insert<I, S>(&mut self, threshold: i64, tasks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = self.0.entry(threshold).or_default();
        for task in tasks {
            let task = task.into();
            if !group.contains(&task) {
                group.push(task);
            }
        }
    }

    pub fn get(&self, threshold: i64) -> Option<&[String]> {
        self.0.get(&threshold).map(Vec::as_slice)
    }

    /// Iterates groups from the lowest threshold up.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &[String])> {
        self.0.iter().map(|(t, tasks)| (*t, tasks.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(i64, Vec<S>)> for ThresholdMap {
    fn from_iter<T: IntoIterator<Item = (i64, Vec<S>)>>(iter: T) -> Self {
        let mut map = ThresholdMap::new();
        for (threshold, tasks) in iter {
            map.insert(threshold, tasks);
        }
        map
    }
}
