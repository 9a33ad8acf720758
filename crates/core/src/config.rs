//! Configuration documents for introspective building.

use serde::{Deserialize, Serialize};

use crate::error::EquateResult;
use crate::selector::Mode;

/// Selection options that can live outside the code, e.g. in a JSON file.
///
/// ```json
/// { "boundary": "Shape", "exclude": ["cached_area"], "hash_seed": 31 }
/// ```
///
/// Applied with [`ReflectBuilder::configure`](crate::ReflectBuilder::configure).
/// The combining function of a custom hash rule is code, so only the seed is
/// configurable here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EquateConfig {
    /// Highest ancestor level, by type path or last path segment.
    pub boundary: Option<String>,
    pub include_transient: bool,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub mode: Option<Mode>,
    pub hash_seed: Option<i32>,
    pub cache_hash: bool,
}

impl EquateConfig {
    pub fn from_json(text: &str) -> EquateResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> EquateResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EquateError;

    #[test]
    fn reads_partial_documents() {
        let config = EquateConfig::from_json(r#"{ "exclude": ["bravo"], "mode": "exclusion" }"#).unwrap();
        assert_eq!(config.exclude, ["bravo"]);
        assert_eq!(config.mode, Some(Mode::Exclusion));
        assert!(!config.cache_hash);
        assert_eq!(config.boundary, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EquateConfig::from_json(r#"{ "exclude_all": true }"#).unwrap_err();
        assert!(matches!(err, EquateError::Config(_)));
    }

    #[test]
    fn survives_a_json_round_trip() {
        let config = EquateConfig {
            boundary: Some("Shape".into()),
            hash_seed: Some(31),
            ..EquateConfig::default()
        };
        let text = config.to_json().unwrap();
        assert_eq!(EquateConfig::from_json(&text).unwrap(), config);
    }
}
