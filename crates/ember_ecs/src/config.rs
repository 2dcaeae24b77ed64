//! # World Configuration
//!
//! Sizing and behavior knobs read once when a world is built. Usually loaded
//! from a TOML table:
//!
//! ```toml
//! expected_entity_count = 4096
//! always_delay_component_removal = false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Upper bound for pre-sizing. Larger expectations are clamped; storage
/// still grows on demand past it.
pub const MAX_EXPECTED_ENTITY_COUNT: usize = 1 << 24;

/// Configuration for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Pre-sizes entity bit vectors and component storage.
    pub expected_entity_count: usize,
    /// Treat every component type as delayed-removal.
    pub always_delay_component_removal: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            expected_entity_count: 128,
            always_delay_component_removal: false,
        }
    }
}

impl WorldConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected number of simultaneously live entities.
    #[must_use]
    pub fn with_expected_entity_count(mut self, count: usize) -> Self {
        self.expected_entity_count = count;
        self
    }

    /// Makes every component type delayed-removal.
    #[must_use]
    pub fn with_always_delay_component_removal(mut self, always: bool) -> Self {
        self.always_delay_component_removal = always;
        self
    }

    /// Parses a configuration from TOML text and validates it.
    ///
    /// Missing keys take their default value.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] on malformed TOML or an invalid value.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| EcsError::InvalidConfig(format!("failed to parse world config: {e}")))?;
        config.validated()
    }

    /// Checks values and clamps the entity expectation.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidConfig`] if `expected_entity_count` is zero.
    pub fn validated(mut self) -> EcsResult<Self> {
        if self.expected_entity_count == 0 {
            return Err(EcsError::InvalidConfig(
                "expected_entity_count must be greater than zero".into(),
            ));
        }

        if self.expected_entity_count > MAX_EXPECTED_ENTITY_COUNT {
            tracing::warn!(
                "expected_entity_count {} clamped to {}",
                self.expected_entity_count,
                MAX_EXPECTED_ENTITY_COUNT
            );
            self.expected_entity_count = MAX_EXPECTED_ENTITY_COUNT;
        }

        Ok(self)
    }
}
