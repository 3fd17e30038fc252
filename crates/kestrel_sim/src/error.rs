//! Simulation error types for the evaluation kernel.
//!
//! All errors that can occur while building a model, stepping it, or
//! accessing its signals through the debug registry are represented as
//! variants of [`SimError`].

use kestrel_config::ConfigError;

/// Errors that can occur during model construction, stepping or debug access.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Combinational logic kept changing for the whole settle budget.
    #[error("combinational logic did not settle within {iterations} eval passes")]
    Divergence {
        /// The number of `eval` passes attempted.
        iterations: u32,
    },

    /// A debug path does not name any registered signal.
    #[error("unknown signal `{path}`")]
    UnknownSignal {
        /// The path that failed to resolve.
        path: String,
    },

    /// A forced value is wider than the signal it targets.
    #[error("value of width {actual} does not fit signal `{path}` of width {expected}")]
    WidthMismatch {
        /// The signal path.
        path: String,
        /// The declared width of the signal.
        expected: u32,
        /// The width of the rejected value.
        actual: u32,
    },

    /// The signal is recomputed by `eval` and cannot be forced.
    #[error("signal `{path}` is not writable")]
    NotWritable {
        /// The signal path.
        path: String,
    },

    /// A word access was made on a signal that is not a memory.
    #[error("signal `{path}` is not a memory")]
    NotAMemory {
        /// The signal path.
        path: String,
    },

    /// A scalar access was made on a memory.
    #[error("signal `{path}` is a memory; access it by word")]
    IsAMemory {
        /// The signal path.
        path: String,
    },

    /// A memory word index is past the end of the memory.
    #[error("index {index} out of range for memory `{path}` of depth {depth}")]
    IndexOutOfRange {
        /// The memory path.
        path: String,
        /// The rejected index.
        index: usize,
        /// The memory depth.
        depth: usize,
    },

    /// Two signals or two children of one module share a name.
    #[error("duplicate name `{path}` in design hierarchy")]
    DuplicateName {
        /// The colliding hierarchical path.
        path: String,
    },

    /// A data-driven netlist failed validation at build time.
    #[error("invalid netlist: {reason}")]
    InvalidNetlist {
        /// Description of the structural problem.
        reason: String,
    },

    /// The kernel configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_display() {
        let e = SimError::Divergence { iterations: 10_000 };
        assert_eq!(
            e.to_string(),
            "combinational logic did not settle within 10000 eval passes"
        );
    }

    #[test]
    fn unknown_signal_display() {
        let e = SimError::UnknownSignal {
            path: "cpu alu y".into(),
        };
        assert_eq!(e.to_string(), "unknown signal `cpu alu y`");
    }

    #[test]
    fn width_mismatch_display() {
        let e = SimError::WidthMismatch {
            path: "rst".into(),
            expected: 1,
            actual: 8,
        };
        assert_eq!(
            e.to_string(),
            "value of width 8 does not fit signal `rst` of width 1"
        );
    }

    #[test]
    fn not_writable_display() {
        let e = SimError::NotWritable { path: "y".into() };
        assert_eq!(e.to_string(), "signal `y` is not writable");
    }

    #[test]
    fn index_out_of_range_display() {
        let e = SimError::IndexOutOfRange {
            path: "rom image".into(),
            index: 16,
            depth: 16,
        };
        assert_eq!(
            e.to_string(),
            "index 16 out of range for memory `rom image` of depth 16"
        );
    }

    #[test]
    fn duplicate_name_display() {
        let e = SimError::DuplicateName {
            path: "counter count".into(),
        };
        assert_eq!(
            e.to_string(),
            "duplicate name `counter count` in design hierarchy"
        );
    }

    #[test]
    fn config_error_is_transparent() {
        let e = SimError::from(ConfigError::ValidationError("bad".into()));
        assert_eq!(e.to_string(), "validation error: bad");
    }
}
