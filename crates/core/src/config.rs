//! Configuration system for the ARM interpreter and recompiler core.
//!
//! This module defines all configuration structures and enums used to
//! parameterize a run. It provides:
//! 1. **Defaults:** baseline translator/optimizer/block-cache constants.
//! 2. **Structures:** hierarchical config for the CPU variant, translator,
//!    optimizer, and block cache.
//!
//! Configuration is supplied via JSON from an embedding host, or
//! `Config::default()` for a standalone run.

use serde::Deserialize;

use crate::common::error::ConfigError;

/// Default configuration constants.
///
/// These values define the baseline configuration when not explicitly
/// overridden by the embedding host.
mod defaults {
    /// Default maximum instruction count per translated block.
    pub const MAX_BLOCK_SIZE: u32 = 32;

    /// Default maximum optimizer fixed-point iterations per block.
    pub const MAX_ITERATIONS: u8 = 20;
}

/// The ARM architecture revision a [`Config`] targets.
///
/// This is not merely documentation: it gates which CP15 features the
/// interpreter exposes and which encoding the decode tables resolve certain
/// opcodes to (most notably `PLD`, undefined prior to ARMv5TE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CpuVariant {
    /// ARM7TDMI, implementing ARMv4T: ARM and Thumb, no CP15.
    #[default]
    Armv4T,
    /// ARM946E-S, implementing ARMv5TE: adds CP15, saturating arithmetic,
    /// count-leading-zeros, and the enhanced DSP multiply instructions.
    Armv5TE,
}

impl CpuVariant {
    /// Whether this variant has a CP15 coprocessor (protection unit,
    /// ITCM/DTCM, cache control).
    #[must_use]
    pub fn has_cp15(self) -> bool {
        matches!(self, CpuVariant::Armv5TE)
    }
}

/// Root configuration for an interpreter/recompiler instance.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use armcore::config::{Config, CpuVariant};
///
/// let config = Config::default();
/// assert_eq!(config.cpu_variant, CpuVariant::Armv4T);
/// assert_eq!(config.translator.max_block_size, 32);
/// ```
///
/// Deserializing from JSON, as an embedding host would:
///
/// ```
/// use armcore::config::{Config, CpuVariant};
///
/// let json = r#"{
///     "cpu_variant": "Armv5TE",
///     "translator": { "max_block_size": 16 },
///     "optimizer": { "max_iterations": 8 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.cpu_variant, CpuVariant::Armv5TE);
/// assert_eq!(config.translator.max_block_size, 16);
/// assert_eq!(config.optimizer.max_iterations, 8);
/// assert!(config.optimizer.passes.constant_propagation);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Which ARM core this instance models.
    #[serde(default)]
    pub cpu_variant: CpuVariant,

    /// Whether to consult [`crate::memory::MemoryInterface::access_cycles`]
    /// for timing, rather than charging a fixed 1 cycle per access.
    #[serde(default = "Config::default_use_memory_interface_access_timings")]
    pub use_memory_interface_access_timings: bool,

    /// ARM/Thumb-to-IR translation parameters.
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// IR optimizer parameters.
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Decoded-block cache parameters.
    #[serde(default)]
    pub block_cache: BlockCacheConfig,
}

impl Config {
    /// Returns whether the memory interface's own timing model should be
    /// consulted, defaulting to `true`.
    fn default_use_memory_interface_access_timings() -> bool {
        true
    }

    /// Validates cross-field invariants that `serde`'s per-field defaults
    /// cannot express (a deserialized zero is syntactically valid but
    /// operationally meaningless).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.optimizer.max_iterations == 0 {
            return Err(ConfigError::ZeroOptimizerIterations);
        }
        if self.translator.max_block_size == 0 {
            return Err(ConfigError::ZeroMaxBlockSize);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_variant: CpuVariant::default(),
            use_memory_interface_access_timings: true,
            translator: TranslatorConfig::default(),
            optimizer: OptimizerConfig::default(),
            block_cache: BlockCacheConfig::default(),
        }
    }
}

/// ARM/Thumb-to-IR translation parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorConfig {
    /// Maximum number of guest instructions per translated block, before the
    /// translator forces a block boundary regardless of control flow.
    #[serde(default = "TranslatorConfig::default_max_block_size")]
    pub max_block_size: u32,
}

impl TranslatorConfig {
    /// Returns the default maximum block size, in guest instructions.
    fn default_max_block_size() -> u32 {
        defaults::MAX_BLOCK_SIZE
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            max_block_size: defaults::MAX_BLOCK_SIZE,
        }
    }
}

/// IR optimizer parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Maximum number of fixed-point passes over a block before the
    /// optimizer gives up and emits whatever it has.
    #[serde(default = "OptimizerConfig::default_max_iterations")]
    pub max_iterations: u8,

    /// Which optimization passes are enabled.
    #[serde(default)]
    pub passes: PassConfig,
}

impl OptimizerConfig {
    /// Returns the default maximum fixed-point iteration count.
    fn default_max_iterations() -> u8 {
        defaults::MAX_ITERATIONS
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            passes: PassConfig::default(),
        }
    }
}

/// Enables or disables individual optimizer passes, in the order the
/// optimizer's fixed-point driver runs them.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PassConfig {
    /// Propagates known-constant variable values into their uses.
    #[serde(default = "PassConfig::default_true")]
    pub constant_propagation: bool,
    /// Removes guest-register stores never observed before the next write or
    /// block exit.
    #[serde(default = "PassConfig::default_true")]
    pub dead_register_store_elimination: bool,
    /// Removes CPSR/SPSR writes never observed before the next write or
    /// block exit.
    #[serde(default = "PassConfig::default_true")]
    pub dead_psr_store_elimination: bool,
    /// Removes host-flag computations (N/Z/C/V materialization) never
    /// consumed before being overwritten.
    #[serde(default = "PassConfig::default_true")]
    pub dead_host_flag_elimination: bool,
    /// Removes flag-value computations never consumed.
    #[serde(default = "PassConfig::default_true")]
    pub dead_flag_value_elimination: bool,
    /// Removes IR variables with no remaining uses.
    #[serde(default = "PassConfig::default_true")]
    pub dead_variable_elimination: bool,
    /// Merges adjacent bitwise operations on the same variable.
    #[serde(default = "PassConfig::default_true")]
    pub bitwise_coalescence: bool,
    /// Merges adjacent arithmetic operations on the same variable.
    #[serde(default = "PassConfig::default_true")]
    pub arithmetic_coalescence: bool,
    /// Merges adjacent host-flag-producing operations that compute the same
    /// flag set.
    #[serde(default = "PassConfig::default_true")]
    pub host_flag_coalescence: bool,
}

impl PassConfig {
    /// Every pass defaults to enabled.
    fn default_true() -> bool {
        true
    }
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            constant_propagation: true,
            dead_register_store_elimination: true,
            dead_psr_store_elimination: true,
            dead_host_flag_elimination: true,
            dead_flag_value_elimination: true,
            dead_variable_elimination: true,
            bitwise_coalescence: true,
            arithmetic_coalescence: true,
            host_flag_coalescence: true,
        }
    }
}

/// Decoded-block cache parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockCacheConfig {
    /// Whether to treat address-space mirrors (aliased regions that map to
    /// the same underlying memory) as distinct cache entries (`false`, the
    /// default) or fold them into one entry keyed by the canonical address.
    #[serde(default)]
    pub mirror_addresses: bool,
}

impl Default for BlockCacheConfig {
    fn default() -> Self {
        Self {
            mirror_addresses: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.cpu_variant, CpuVariant::Armv4T);
        assert!(config.use_memory_interface_access_timings);
        assert_eq!(config.translator.max_block_size, 32);
        assert_eq!(config.optimizer.max_iterations, 20);
        assert!(config.optimizer.passes.constant_propagation);
        assert!(!config.block_cache.mirror_addresses);
    }

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_max_iterations_fails_validation() {
        let mut config = Config::default();
        config.optimizer.max_iterations = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroOptimizerIterations)));
    }

    #[test]
    fn zero_max_block_size_fails_validation() {
        let mut config = Config::default();
        config.translator.max_block_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroMaxBlockSize)));
    }

    #[test]
    fn partial_json_fills_in_remaining_defaults() {
        let config: Config = serde_json::from_str(r#"{"cpu_variant": "Armv5TE"}"#).unwrap();
        assert_eq!(config.cpu_variant, CpuVariant::Armv5TE);
        assert_eq!(config.translator.max_block_size, 32);
        assert!(config.cpu_variant.has_cp15());
        assert!(!CpuVariant::Armv4T.has_cp15());
    }

    #[test]
    fn individual_passes_can_be_disabled_over_json() {
        let config: Config = serde_json::from_str(
            r#"{"optimizer": {"passes": {"constant_propagation": false}}}"#,
        )
        .unwrap();
        assert!(!config.optimizer.passes.constant_propagation);
        assert!(config.optimizer.passes.dead_variable_elimination);
    }
}
