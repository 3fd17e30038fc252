//! The convergence driver: settle combinational logic, then commit state.
//!
//! A step repeats [`Module::eval`] until a pass reports no change (the
//! design has reached a combinational fixed point) and then calls
//! [`Module::commit`] exactly once. The number of eval passes is bounded; a
//! design that is still changing at the bound is reported as divergent and
//! its state is left uncommitted.

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::SimError;
use crate::module::Module;

/// The outcome of one [`step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepResult {
    /// Whether combinational logic reached a fixed point within the budget.
    pub converged: bool,
    /// Whether the commit changed any state. Always `false` when not converged.
    pub state_changed: bool,
    /// Number of eval passes performed, including the final quiet one.
    pub iterations: u32,
}

/// Runs eval passes until one reports no change.
///
/// Returns the number of passes on success, or [`SimError::Divergence`] if
/// `max_iterations` passes all reported changes.
pub fn settle<M: Module + ?Sized>(module: &mut M, max_iterations: u32) -> Result<u32, SimError> {
    for pass in 1..=max_iterations {
        let changed = module.eval();
        trace!(pass, changed, "eval pass");
        if !changed {
            return Ok(pass);
        }
    }
    warn!(max_iterations, "combinational logic did not settle");
    Err(SimError::Divergence {
        iterations: max_iterations,
    })
}

/// Advances `module` by one clock step.
///
/// On convergence commits once and reports whether state changed. On
/// divergence nothing is committed and `converged` is `false`.
pub fn step<M: Module + ?Sized>(module: &mut M, max_iterations: u32) -> StepResult {
    match settle(module, max_iterations) {
        Ok(iterations) => StepResult {
            converged: true,
            state_changed: module.commit(),
            iterations,
        },
        Err(_) => StepResult {
            converged: false,
            state_changed: false,
            iterations: max_iterations,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{DebugItems, Scope};
    use crate::signal::{SignalMut, SignalRef};

    /// Changes for a fixed number of passes, then goes quiet.
    struct Ripple {
        remaining: u32,
        evals: u32,
        commits: u32,
    }

    impl Ripple {
        fn new(remaining: u32) -> Self {
            Self {
                remaining,
                evals: 0,
                commits: 0,
            }
        }
    }

    impl Module for Ripple {
        fn eval(&mut self) -> bool {
            self.evals += 1;
            if self.remaining == 0 {
                return false;
            }
            self.remaining -= 1;
            true
        }

        fn commit(&mut self) -> bool {
            self.commits += 1;
            true
        }

        fn reset(&mut self) {}

        fn debug_info(&self, _items: &mut DebugItems, _scope: &Scope) -> Result<(), SimError> {
            Ok(())
        }

        fn signal(&self, _name: &str) -> Option<SignalRef<'_>> {
            None
        }

        fn signal_mut(&mut self, _name: &str) -> Option<SignalMut<'_>> {
            None
        }
    }

    #[test]
    fn settle_counts_final_quiet_pass() {
        let mut m = Ripple::new(3);
        assert_eq!(settle(&mut m, 10).unwrap(), 4);
        assert_eq!(m.evals, 4);
    }

    #[test]
    fn settle_at_exact_budget() {
        let mut m = Ripple::new(2);
        assert_eq!(settle(&mut m, 3).unwrap(), 3);
    }

    #[test]
    fn settle_reports_divergence() {
        let mut m = Ripple::new(u32::MAX);
        let err = settle(&mut m, 5).unwrap_err();
        assert!(matches!(err, SimError::Divergence { iterations: 5 }));
        assert_eq!(m.evals, 5);
    }

    #[test]
    fn step_commits_once_after_convergence() {
        let mut m = Ripple::new(1);
        let r = step(&mut m, 10);
        assert_eq!(
            r,
            StepResult {
                converged: true,
                state_changed: true,
                iterations: 2,
            }
        );
        assert_eq!(m.commits, 1);
    }

    #[test]
    fn step_skips_commit_on_divergence() {
        let mut m = Ripple::new(u32::MAX);
        let r = step(&mut m, 8);
        assert!(!r.converged);
        assert!(!r.state_changed);
        assert_eq!(r.iterations, 8);
        assert_eq!(m.commits, 0);
    }
}
