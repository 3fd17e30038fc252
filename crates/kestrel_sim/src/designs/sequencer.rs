//! A counter addressing a ROM, as a two-level hierarchy.

use kestrel_common::Value;

use crate::debug::{DebugFlags, DebugItem, DebugItems, Scope};
use crate::error::SimError;
use crate::module::{reset_by_adoption, Adopt, Module};
use crate::signal::{SignalMut, SignalRef};

use super::{Counter, Rom};

/// A program counter stepping through a ROM.
///
/// Hierarchy: `counter` drives the address of `rom`, and `out` follows the
/// ROM's registered data. Resetting keeps the loaded program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequencer {
    /// Synchronous reset input, forwarded to the counter.
    pub rst: Value,
    /// Advance input, forwarded to the counter.
    pub en: Value,
    /// Current ROM word.
    pub out: Value,
    counter: Counter,
    rom: Rom,
}

impl Sequencer {
    /// Creates a sequencer over a `2^addr_bits` word program.
    pub fn new(addr_bits: u32) -> Self {
        Self {
            rst: Value::new(1),
            en: Value::new(1),
            out: Value::new(32),
            counter: Counter::new(addr_bits),
            rom: Rom::new(addr_bits),
        }
    }

    /// Loads a program into the ROM from address zero.
    pub fn load_program(&mut self, words: &[u32]) -> usize {
        self.rom.load(words)
    }

    /// The program counter child.
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    /// The program ROM child.
    pub fn rom(&self) -> &Rom {
        &self.rom
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Adopt for Sequencer {
    fn adopt(previous: &mut Self) -> Self {
        Self {
            rst: Value::new(1),
            en: Value::new(1),
            out: Value::new(32),
            counter: Counter::adopt(&mut previous.counter),
            rom: Rom::adopt(&mut previous.rom),
        }
    }
}

impl Module for Sequencer {
    fn eval(&mut self) -> bool {
        let mut changed = false;
        changed |= self.counter.rst.assign(&self.rst);
        changed |= self.counter.en.assign(&self.en);
        changed |= self.counter.eval();
        changed |= self.rom.addr.assign(&self.counter.count.curr);
        changed |= self.rom.eval();
        changed |= self.out.assign(&self.rom.data.curr);
        changed
    }

    fn commit(&mut self) -> bool {
        let counter = self.counter.commit();
        let rom = self.rom.commit();
        counter || rom
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
            "out",
            DebugItem::new((&self.out).into(), DebugFlags::OUTPUT | DebugFlags::DRIVEN_COMB),
        )?;
        Ok(())
    }

    fn children(&self) -> Vec<(&str, &dyn Module)> {
        vec![
            ("counter", &self.counter as &dyn Module),
            ("rom", &self.rom as &dyn Module),
        ]
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Module> {
        match name {
            "counter" => Some(&mut self.counter),
            "rom" => Some(&mut self.rom),
            _ => None,
        }
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        match name {
            "rst" => Some((&self.rst).into()),
            "en" => Some((&self.en).into()),
            "out" => Some((&self.out).into()),
            _ => None,
        }
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        match name {
            "rst" => Some((&mut self.rst).into()),
            "en" => Some((&mut self.en).into()),
            "out" => Some((&mut self.out).into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::collect;
    use crate::driver::step;

    #[test]
    fn registry_walks_children_after_own_signals() {
        let seq = Sequencer::default();
        let items = collect(&seq).unwrap();
        let paths: Vec<&str> = items.iter().map(|e| e.path()).collect();
        assert_eq!(
            paths,
            [
                "rst",
                "en",
                "out",
                "counter rst",
                "counter en",
                "counter count",
                "counter wrap",
                "rom addr",
                "rom data",
                "rom image",
            ]
        );
        let child_en = items.get("counter en").unwrap().item();
        assert_eq!(child_en.flags, DebugFlags::INPUT | DebugFlags::DRIVEN_COMB);
    }

    #[test]
    fn steps_through_program() {
        let mut seq = Sequencer::new(2);
        seq.load_program(&[0x11, 0x22, 0x33, 0x44]);
        seq.en = Value::from_bool(true);
        let mut seen = Vec::new();
        for _ in 0..5 {
            assert!(step(&mut seq, 16).converged);
            seen.push(seq.rom().data.curr.to_u64().unwrap());
        }
        assert_eq!(seen, [0x11, 0x22, 0x33, 0x44, 0x11]);
    }

    #[test]
    fn out_follows_rom_data_after_settle() {
        let mut seq = Sequencer::new(2);
        seq.load_program(&[0x11, 0x22]);
        seq.en = Value::from_bool(true);
        step(&mut seq, 16);
        assert!(seq.out.is_zero());
        seq.eval();
        assert_eq!(seq.out.to_u64(), Some(0x11));
    }

    #[test]
    fn reset_rewinds_but_keeps_program() {
        let mut seq = Sequencer::new(2);
        seq.load_program(&[7, 8]);
        seq.en = Value::from_bool(true);
        step(&mut seq, 16);
        step(&mut seq, 16);
        seq.reset();
        assert!(seq.counter().count.curr.is_zero());
        assert!(seq.rom().data.curr.is_zero());
        assert!(!seq.en.to_bool());
        assert_eq!(seq.rom().image.read(1).to_u64(), Some(8));
    }
}
