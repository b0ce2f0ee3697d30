//! Validated site identifiers.

use std::sync::OnceLock;

use regex::Regex;

use crate::SiteError;

fn site_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(T\d)_([A-Z]{2})_([A-Z][A-Za-z_]+)$").expect("site pattern is valid")
    })
}

/// A site identifier of the form `T<digit>_<CC>_<Name>`.
///
/// Only validated names can be constructed; rules keyed on a site (per-site
/// hold markers, whitelist removal) rely on the name being a plain
/// attribute-safe token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteName(String);

impl SiteName {
    /// Parses and validates a site identifier.
    pub fn parse(s: &str) -> Result<Self, SiteError> {
        if s.is_empty() {
            return Err(SiteError::Empty);
        }

        if !site_pattern().is_match(s) {
            return Err(SiteError::InvalidFormat {
                value: s.to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the site string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the tier component (`T1`, `T2`, ...).
    #[must_use]
    pub fn tier(&self) -> &str {
        &self.0[..2]
    }

    /// Returns the two-letter country component.
    #[must_use]
    pub fn country(&self) -> &str {
        &self.0[3..5]
    }

    /// Returns the site name component (everything after the country).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0[6..]
    }
}

impl std::fmt::Display for SiteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SiteName {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SiteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for SiteName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SiteName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
