//! The protocol every simulated circuit implements.
//!
//! A [`Module`] owns its signals and an ordered list of uniquely named child
//! modules. The convergence driver calls [`Module::eval`] until nothing
//! changes, then [`Module::commit`] once; the debug registry walks the tree
//! through [`Module::debug_info`] and [`Module::children`] and later reaches
//! individual cells by name through [`Module::child_mut`] and
//! [`Module::signal_mut`].
//!
//! Per-circuit implementations are either hand-written in the shape
//! generated code takes (see [`crate::designs`]) or data-driven
//! ([`crate::netlist::NetlistModule`]).

use crate::debug::{DebugItems, Scope};
use crate::error::SimError;
use crate::signal::{SignalMut, SignalRef};

/// A node in the simulated design hierarchy.
pub trait Module {
    /// Recomputes every combinational signal from current inputs and state.
    ///
    /// Returns whether any combinational value differs from its value on
    /// entry. Writes only combinational values and the `next` side of state
    /// elements; once inputs and state are fixed, repeated calls return
    /// `false` and leave every value bit-identical.
    fn eval(&mut self) -> bool;

    /// Publishes every state element's pending value, recursively.
    ///
    /// Returns whether any state value changed. Calling this before `eval`
    /// has converged publishes stale next values but is otherwise harmless.
    fn commit(&mut self) -> bool;

    /// Restores power-on values for this module and its subtree.
    ///
    /// Implementations replace the instance wholesale, usually through
    /// [`reset_by_adoption`].
    fn reset(&mut self);

    /// Adds one entry per signal owned directly by this module.
    ///
    /// Children are not visited here; the registry walk calls each child with
    /// an extended scope. Undriven signals are reported with
    /// [`DebugFlags::UNDRIVEN`](crate::debug::DebugFlags::UNDRIVEN), never
    /// omitted.
    fn debug_info(&self, items: &mut DebugItems, scope: &Scope) -> Result<(), SimError>;

    /// Returns the owned children in declaration order.
    fn children(&self) -> Vec<(&str, &dyn Module)> {
        Vec::new()
    }

    /// Returns a child by name.
    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Module> {
        let _ = name;
        None
    }

    /// Names the inputs of child `name` that this module drives.
    ///
    /// `None` means all of them. Inputs left out are reported as undriven.
    fn bound_inputs(&self, name: &str) -> Option<Vec<&str>> {
        let _ = name;
        None
    }

    /// Returns a directly owned signal by name.
    fn signal(&self, name: &str) -> Option<SignalRef<'_>>;

    /// Returns a directly owned signal by name, mutably.
    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>>;
}

impl<M: Module + ?Sized> Module for Box<M> {
    fn eval(&mut self) -> bool {
        (**self).eval()
    }

    fn commit(&mut self) -> bool {
        (**self).commit()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn debug_info(&self, items: &mut DebugItems, scope: &Scope) -> Result<(), SimError> {
        (**self).debug_info(items, scope)
    }

    fn children(&self) -> Vec<(&str, &dyn Module)> {
        (**self).children()
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Module> {
        (**self).child_mut(name)
    }

    fn bound_inputs(&self, name: &str) -> Option<Vec<&str>> {
        (**self).bound_inputs(name)
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        (**self).signal(name)
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        (**self).signal_mut(name)
    }
}

/// Construction of a power-on instance that takes over host-owned resources.
///
/// `adopt` moves (never copies) whatever the previous instance holds on the
/// host's behalf, such as an external memory image or a child module, and
/// default-initializes everything else.
pub trait Adopt: Sized {
    /// Builds a fresh instance, moving adopted resources out of `previous`.
    fn adopt(previous: &mut Self) -> Self;
}

/// Resets `module` by replacing it with a freshly adopted instance.
pub fn reset_by_adoption<M: Adopt>(module: &mut M) {
    let fresh = M::adopt(module);
    *module = fresh;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Memory;
    use kestrel_common::Value;

    struct Holder {
        scratch: Value,
        image: Memory,
    }

    impl Adopt for Holder {
        fn adopt(previous: &mut Self) -> Self {
            Self {
                scratch: Value::new(8),
                image: Memory::adopt_from(&mut previous.image),
            }
        }
    }

    #[test]
    fn reset_by_adoption_keeps_only_adopted_state() {
        let mut image = Memory::external(8, 2);
        image.force(0, &Value::from_u64(0x42, 8));
        let mut holder = Holder {
            scratch: Value::from_u64(0xFF, 8),
            image,
        };
        reset_by_adoption(&mut holder);
        assert!(holder.scratch.is_zero());
        assert_eq!(holder.image.read(0).to_u64(), Some(0x42));
    }
}
