//! World configuration.

use serde::{Deserialize, Serialize};

use crate::actor::DEFAULT_MAX_ACTOR_ID;
use crate::chunk::DEFAULT_CHUNK_CAPACITY;
use crate::filter::DEFAULT_OPTION_CAPACITY;
use crate::EcsError;

/// Tunables for a [`World`](crate::world::World).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use tessera_ecs::config::WorldConfig;
///
/// let config = WorldConfig::from_json(r#"{ "history_capacity": 256 }"#).unwrap();
/// assert_eq!(config.history_capacity, 256);
/// assert_eq!(config.chunk_capacity, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Largest actor id minted before the id counter wraps back to 1.
    pub max_actor_id: u32,
    /// Initial slot count of every chunk.
    pub chunk_capacity: usize,
    /// Initial capacity of each type list in a new `FilterOption`.
    pub option_capacity: usize,
    /// Number of change events kept in the history log. Zero disables it.
    pub history_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_actor_id: DEFAULT_MAX_ACTOR_ID,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
            option_capacity: DEFAULT_OPTION_CAPACITY,
            history_capacity: 0,
        }
    }
}

impl WorldConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, EcsError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the world cannot operate with.
    pub fn validate(&self) -> Result<(), EcsError> {
        if self.max_actor_id == 0 {
            return Err(EcsError::InvalidConfig(
                "max_actor_id must be at least 1".to_owned(),
            ));
        }
        if self.chunk_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "chunk_capacity must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.max_actor_id, i32::MAX as u32);
        assert_eq!(config.option_capacity, 7);
        assert_eq!(config.history_capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(WorldConfig::from_json("{}").unwrap(), WorldConfig::default());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = WorldConfig::from_json(r#"{ "chunk_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = WorldConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, EcsError::Serialization(_)));
    }
}
