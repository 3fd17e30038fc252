//! Word ROM with a host-loaded image and a registered read port.

use kestrel_common::Value;

use crate::debug::{DebugFlags, DebugItem, DebugItems, Scope};
use crate::error::SimError;
use crate::module::{reset_by_adoption, Adopt, Module};
use crate::signal::{Memory, SignalMut, SignalRef, Wire};

const WORD_WIDTH: u32 = 32;

/// A 32-bit word ROM with a registered read port.
///
/// The image is host-owned: it is loaded once and carried across reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    /// Word address input.
    pub addr: Value,
    /// Read data, valid the step after `addr`.
    pub data: Wire,
    /// Contents.
    pub image: Memory,
}

impl Rom {
    /// Widest supported address; the image is allocated up front.
    pub const MAX_ADDR_BITS: u32 = 24;

    /// Creates an all-zero ROM of `2^addr_bits` words.
    ///
    /// # Panics
    ///
    /// Panics if `addr_bits` exceeds [`Rom::MAX_ADDR_BITS`].
    pub fn new(addr_bits: u32) -> Self {
        assert!(
            addr_bits <= Self::MAX_ADDR_BITS,
            "ROM address width {addr_bits} exceeds {} bits",
            Self::MAX_ADDR_BITS
        );
        Self {
            addr: Value::new(addr_bits),
            data: Wire::new(WORD_WIDTH),
            image: Memory::external(WORD_WIDTH, 1usize << addr_bits),
        }
    }

    /// Creates a ROM holding `words` from address zero.
    pub fn with_image(addr_bits: u32, words: &[u32]) -> Self {
        let mut rom = Self::new(addr_bits);
        rom.load(words);
        rom
    }

    /// Replaces the image from address zero; extra words are dropped.
    pub fn load(&mut self, words: &[u32]) -> usize {
        let image: Vec<Value> = words
            .iter()
            .map(|&w| Value::from_u64(u64::from(w), WORD_WIDTH))
            .collect();
        self.image.load(0, &image)
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Adopt for Rom {
    fn adopt(previous: &mut Self) -> Self {
        Self {
            addr: Value::new(previous.addr.width()),
            data: Wire::new(WORD_WIDTH),
            image: Memory::adopt_from(&mut previous.image),
        }
    }
}

impl Module for Rom {
    fn eval(&mut self) -> bool {
        let index = self.addr.to_u64().unwrap_or(u64::MAX) as usize;
        let word = self.image.read(index).clone();
        self.data.next.assign(&word);
        false
    }

    fn commit(&mut self) -> bool {
        self.data.commit()
    }

    fn reset(&mut self) {
        reset_by_adoption(self);
    }

    fn debug_info(&self, items: &mut DebugItems, scope: &Scope) -> Result<(), SimError> {
        items.add(
            scope,
            "addr",
            DebugItem::new((&self.addr).into(), scope.input_flags("addr")),
        )?;
        items.add(
            scope,
            "data",
            DebugItem::new((&self.data).into(), DebugFlags::OUTPUT | DebugFlags::DRIVEN_SYNC),
        )?;
        items.add(
            scope,
            "image",
            DebugItem::new((&self.image).into(), DebugFlags::UNDRIVEN),
        )?;
        Ok(())
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        match name {
            "addr" => Some((&self.addr).into()),
            "data" => Some((&self.data).into()),
            "image" => Some((&self.image).into()),
            _ => None,
        }
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        match name {
            "addr" => Some((&mut self.addr).into()),
            "data" => Some((&mut self.data).into()),
            "image" => Some((&mut self.image).into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::step;

    #[test]
    fn read_is_registered() {
        let mut rom = Rom::with_image(2, &[10, 20, 30, 40]);
        rom.addr = Value::from_u64(2, 2);
        rom.eval();
        assert!(rom.data.curr.is_zero());
        let r = step(&mut rom, 4);
        assert!(r.state_changed);
        assert_eq!(rom.data.curr.to_u64(), Some(30));
    }

    #[test]
    #[should_panic(expected = "exceeds 24 bits")]
    fn oversized_address_width_panics() {
        Rom::new(64);
    }

    #[test]
    fn image_is_reported_undriven() {
        let mut items = DebugItems::default();
        Rom::new(2).debug_info(&mut items, &Scope::root()).unwrap();
        let image = items.get("image").unwrap().item();
        assert_eq!(image.flags, DebugFlags::UNDRIVEN);
        assert!(!image.is_driven());
    }

    #[test]
    fn load_truncates_to_depth() {
        let mut rom = Rom::new(1);
        assert_eq!(rom.load(&[1, 2, 3]), 2);
    }

    #[test]
    fn reset_keeps_image_and_clears_data() {
        let mut rom = Rom::with_image(2, &[0xAB]);
        step(&mut rom, 4);
        assert_eq!(rom.data.curr.to_u64(), Some(0xAB));
        rom.reset();
        assert!(rom.data.curr.is_zero());
        assert_eq!(rom.image.read(0).to_u64(), Some(0xAB));
        assert_eq!(rom.image.depth(), 4);
    }
}
