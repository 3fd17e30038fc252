//! Configuration types deserialized from `kestrel.toml`.

use serde::{Deserialize, Serialize};

/// Default cap on `eval` passes per step before a settle is declared divergent.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10_000;

/// The top-level simulation configuration parsed from `kestrel.toml`.
///
/// Every section is optional; a missing file section takes its defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Convergence driver settings.
    #[serde(default)]
    pub settle: SettleConfig,
    /// Debug registry settings.
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Settings for the combinational convergence driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Maximum `eval` passes per step. Exceeding it reports divergence.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Settings for external access through the debug registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Whether registers and memories may be forced through the registry.
    #[serde(default = "default_true")]
    pub allow_state_writes: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            allow_state_writes: true,
        }
    }
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_true() -> bool {
    true
}
