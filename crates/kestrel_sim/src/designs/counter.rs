//! Counter with synchronous reset and count enable.

use kestrel_common::Value;

use crate::debug::{DebugFlags, DebugItem, DebugItems, Scope};
use crate::error::SimError;
use crate::module::{reset_by_adoption, Adopt, Module};
use crate::signal::{SignalMut, SignalRef, Wire};

/// A free-running counter with synchronous reset and count enable.
///
/// `wrap` is high while enabled at the all-ones count, the cycle before the
/// counter rolls over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter {
    /// Synchronous reset input.
    pub rst: Value,
    /// Count enable input.
    pub en: Value,
    /// Count register.
    pub count: Wire,
    /// Rollover output.
    pub wrap: Value,
}

impl Counter {
    /// Creates a counter `width` bits wide.
    pub fn new(width: u32) -> Self {
        Self {
            rst: Value::new(1),
            en: Value::new(1),
            count: Wire::new(width),
            wrap: Value::new(1),
        }
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Adopt for Counter {
    fn adopt(previous: &mut Self) -> Self {
        Self::new(previous.count.width())
    }
}

impl Module for Counter {
    fn eval(&mut self) -> bool {
        let width = self.count.width();
        let enabled = self.en.to_bool();
        let at_max = self.count.curr == Value::all_ones(width);
        let changed = self.wrap.assign(&Value::from_bool(enabled && at_max));

        let next = if self.rst.to_bool() {
            Value::new(width)
        } else if enabled {
            self.count.curr.wrapping_add(&Value::from_u64(1, width))
        } else {
            self.count.curr.clone()
        };
        self.count.next.assign(&next);
        changed
    }

    fn commit(&mut self) -> bool {
        self.count.commit()
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
            "en",
            DebugItem::new((&self.en).into(), scope.input_flags("en")),
        )?;
        items.add(
            scope,
            "count",
            DebugItem::new(
                (&self.count).into(),
                DebugFlags::OUTPUT | DebugFlags::DRIVEN_SYNC,
            ),
        )?;
        items.add(
            scope,
            "wrap",
            DebugItem::new(
                (&self.wrap).into(),
                DebugFlags::OUTPUT | DebugFlags::DRIVEN_COMB,
            ),
        )?;
        Ok(())
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        match name {
            "rst" => Some((&self.rst).into()),
            "en" => Some((&self.en).into()),
            "count" => Some((&self.count).into()),
            "wrap" => Some((&self.wrap).into()),
            _ => None,
        }
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        match name {
            "rst" => Some((&mut self.rst).into()),
            "en" => Some((&mut self.en).into()),
            "count" => Some((&mut self.count).into()),
            "wrap" => Some((&mut self.wrap).into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::step;

    #[test]
    fn counts_when_enabled() {
        let mut c = Counter::new(4);
        c.en = Value::from_bool(true);
        for expected in 1..=3 {
            let r = step(&mut c, 16);
            assert!(r.converged && r.state_changed);
            assert_eq!(c.count.curr.to_u64(), Some(expected));
        }
    }

    #[test]
    fn holds_when_disabled() {
        let mut c = Counter::new(4);
        c.count.force(&Value::from_u64(7, 4));
        let r = step(&mut c, 16);
        assert!(r.converged);
        assert!(!r.state_changed);
        assert_eq!(c.count.curr.to_u64(), Some(7));
    }

    #[test]
    fn wraps_and_flags_rollover() {
        let mut c = Counter::new(2);
        c.en = Value::from_bool(true);
        c.count.force(&Value::from_u64(3, 2));
        step(&mut c, 16);
        assert_eq!(c.count.curr.to_u64(), Some(0));
        assert!(c.wrap.to_bool());
        step(&mut c, 16);
        assert!(!c.wrap.to_bool());
    }

    #[test]
    fn synchronous_reset_wins_over_enable() {
        let mut c = Counter::new(4);
        c.en = Value::from_bool(true);
        c.rst = Value::from_bool(true);
        c.count.force(&Value::from_u64(9, 4));
        step(&mut c, 16);
        assert!(c.count.curr.is_zero());
    }

    #[test]
    fn reset_keeps_width() {
        let mut c = Counter::new(12);
        c.count.force(&Value::from_u64(100, 12));
        c.reset();
        assert_eq!(c, Counter::new(12));
    }
}
