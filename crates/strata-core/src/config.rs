//! Session configuration.
//!
//! A [`SessionConfig`] holds the few options that change how plans are
//! built: the default shuffle partition count, ANSI casting, whether views
//! pick up the session's configuration, and the width of grouping ids.
//!
//! Configurations can be deserialized with serde (missing fields take their
//! defaults) or built from the textual key/value pairs that views capture.

use serde::de::{self, Deserializer, Unexpected};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Key for [`SessionConfig::num_shuffle_partitions`].
pub const SHUFFLE_PARTITIONS: &str = "sql.shuffle.partitions";
/// Key for [`SessionConfig::ansi_enabled`].
pub const ANSI_ENABLED: &str = "sql.ansi.enabled";
/// Key for [`SessionConfig::use_current_sql_configs_for_view`].
pub const VIEW_USE_CURRENT_CONFIGS: &str = "sql.view.useCurrentConfigs";
/// Key for [`SessionConfig::integer_grouping_id`].
pub const INTEGER_GROUPING_ID: &str = "sql.legacy.integerGroupingId";

/// Options that influence plan construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Partition count used when a repartition does not name one. Never zero.
    #[serde(deserialize_with = "deser_positive_partitions")]
    pub num_shuffle_partitions: usize,
    /// Whether ANSI implicit-cast rules apply.
    pub ansi_enabled: bool,
    /// Whether non-temporary views are analyzed with the current session
    /// configuration instead of the one captured at creation.
    pub use_current_sql_configs_for_view: bool,
    /// Use a 32-bit grouping id column instead of a 64-bit one.
    pub integer_grouping_id: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            num_shuffle_partitions: 200,
            ansi_enabled: false,
            use_current_sql_configs_for_view: false,
            integer_grouping_id: false,
        }
    }
}

impl SessionConfig {
    /// Builds a configuration from key/value pairs applied over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if a known key has a value that
    /// cannot be parsed.
    pub fn from_pairs<'a, I>(pairs: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::default().with_overrides(pairs)
    }

    /// Applies key/value pairs on top of this configuration.
    ///
    /// Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if a known key has a value that
    /// cannot be parsed.
    pub fn with_overrides<'a, I>(mut self, pairs: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in pairs {
            match key {
                SHUFFLE_PARTITIONS => {
                    self.num_shuffle_partitions = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| CoreError::invalid_config(key, value))?;
                }
                ANSI_ENABLED => self.ansi_enabled = parse_bool(key, value)?,
                VIEW_USE_CURRENT_CONFIGS => {
                    self.use_current_sql_configs_for_view = parse_bool(key, value)?;
                }
                INTEGER_GROUPING_ID => self.integer_grouping_id = parse_bool(key, value)?,
                _ => debug!(key = %key, "ignoring unknown configuration key"),
            }
        }
        Ok(self)
    }
}

fn deser_positive_partitions<'de, D>(deser: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let n: usize = Deserialize::deserialize(deser)?;
    if n == 0 {
        return Err(de::Error::invalid_value(Unexpected::Unsigned(0), &"a positive partition count"));
    }
    Ok(n)
}

fn parse_bool(key: &str, value: &str) -> CoreResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CoreError::invalid_config(key, value)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.num_shuffle_partitions, 200);
        assert!(!config.ansi_enabled);
        assert!(!config.use_current_sql_configs_for_view);
        assert!(!config.integer_grouping_id);
    }

    #[test]
    fn deserialize_fills_missing_fields() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"num_shuffle_partitions": 8, "ansi_enabled": true}"#).expect("valid json");
        assert_eq!(config.num_shuffle_partitions, 8);
        assert!(config.ansi_enabled);
        assert!(!config.integer_grouping_id);
    }

    #[test]
    fn deserialize_rejects_non_positive_partitions() {
        assert!(serde_json::from_str::<SessionConfig>(r#"{"num_shuffle_partitions": 0}"#).is_err());
        assert!(serde_json::from_str::<SessionConfig>(r#"{"num_shuffle_partitions": -4}"#).is_err());
        let config: SessionConfig = serde_json::from_str(r#"{"num_shuffle_partitions": 1}"#).expect("valid json");
        assert_eq!(config.num_shuffle_partitions, 1);
    }

    #[test]
    fn from_pairs_parses_known_keys() {
        let config = SessionConfig::from_pairs([
            (SHUFFLE_PARTITIONS, "16"),
            (ANSI_ENABLED, "TRUE"),
            (INTEGER_GROUPING_ID, "true"),
            ("sql.unrelated", "whatever"),
        ])
        .expect("valid pairs");
        assert_eq!(config.num_shuffle_partitions, 16);
        assert!(config.ansi_enabled);
        assert!(config.integer_grouping_id);
        assert!(!config.use_current_sql_configs_for_view);
    }

    #[test]
    fn from_pairs_rejects_bad_values() {
        let err = SessionConfig::from_pairs([(ANSI_ENABLED, "maybe")]).unwrap_err();
        assert_eq!(err, CoreError::invalid_config(ANSI_ENABLED, "maybe"));

        assert!(SessionConfig::from_pairs([(SHUFFLE_PARTITIONS, "0")]).is_err());
        assert!(SessionConfig::from_pairs([(SHUFFLE_PARTITIONS, "-3")]).is_err());
    }

    #[test]
    fn overrides_keep_unrelated_fields() {
        let base = SessionConfig { ansi_enabled: true, ..SessionConfig::default() };
        let config = base.with_overrides([(SHUFFLE_PARTITIONS, "4")]).expect("valid pairs");
        assert!(config.ansi_enabled);
        assert_eq!(config.num_shuffle_partitions, 4);
    }
}
