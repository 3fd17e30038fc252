//! A toplevel with only reset and clock inputs.

use kestrel_common::Value;

use crate::debug::{DebugItem, DebugItems, Scope};
use crate::error::SimError;
use crate::module::{reset_by_adoption, Adopt, Module};
use crate::signal::{SignalMut, SignalRef};

/// A design with a reset and a clock input and no logic at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmptyTop {
    /// Reset input.
    pub rst: Value,
    /// Clock input. Stepping is the clock edge, so nothing reads it.
    pub clk: Value,
}

impl Default for EmptyTop {
    fn default() -> Self {
        Self {
            rst: Value::new(1),
            clk: Value::new(1),
        }
    }
}

impl Adopt for EmptyTop {
    fn adopt(_previous: &mut Self) -> Self {
        Self::default()
    }
}

impl Module for EmptyTop {
    fn eval(&mut self) -> bool {
        false
    }

    fn commit(&mut self) -> bool {
        false
    }

    fn reset(&mut self) {
        reset_by_adoption(self);
    }

    fn debug_info(&self, items: &mut DebugItems, scope: &Scope) -> Result<(), SimError> {
        items.add(
            scope,
            "rst",
            DebugItem::new((&self.rst).into(), scope.input_flags("rst")),
        )?;
        items.add(
            scope,
            "clk",
            DebugItem::new((&self.clk).into(), scope.input_flags("clk")),
        )?;
        Ok(())
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        match name {
            "rst" => Some((&self.rst).into()),
            "clk" => Some((&self.clk).into()),
            _ => None,
        }
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        match name {
            "rst" => Some((&mut self.rst).into()),
            "clk" => Some((&mut self.clk).into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_inputs() {
        let mut top = EmptyTop::default();
        top.rst = Value::from_bool(true);
        top.reset();
        assert_eq!(top, EmptyTop::default());
    }

    #[test]
    fn eval_and_commit_never_report_change() {
        let mut top = EmptyTop::default();
        top.clk = Value::from_bool(true);
        assert!(!top.eval());
        assert!(!top.commit());
    }
}
