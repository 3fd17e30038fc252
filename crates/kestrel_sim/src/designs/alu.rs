//! RV32I integer ALU.

use std::cmp::Ordering;

use kestrel_common::Value;

use crate::debug::{DebugFlags, DebugItem, DebugItems, Scope};
use crate::error::SimError;
use crate::module::{reset_by_adoption, Adopt, Module};
use crate::signal::{SignalMut, SignalRef};

const XLEN: u32 = 32;

/// Function select codes: `funct3` in the low three bits, the alternate
/// operation bit (`funct7[5]`) in bit 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AluFunction {
    /// `a + b`
    Add = 0b0000,
    /// `a - b`
    Sub = 0b1000,
    /// Signed `a < b`.
    Slt = 0b0010,
    /// Unsigned `a < b`.
    Sltu = 0b0011,
    /// `a ^ b`
    Xor = 0b0100,
    /// Logical `a >> b[4:0]`.
    Srl = 0b0101,
    /// Arithmetic `a >> b[4:0]`.
    Sra = 0b1101,
    /// `a | b`
    Or = 0b0110,
    /// `a & b`
    And = 0b0111,
}

impl AluFunction {
    /// The 4-bit value to drive onto `f`.
    pub fn code(self) -> Value {
        Value::from_u64(self as u64, 4)
    }
}

/// The RV32I integer ALU, purely combinational.
///
/// Left shifts are not implemented here; a CPU built on this ALU flips the
/// operand and result of a right shift instead. Unassigned function codes
/// drive zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alu {
    /// First operand.
    pub a: Value,
    /// Second operand.
    pub b: Value,
    /// Function select, see [`AluFunction`].
    pub f: Value,
    /// Result.
    pub y: Value,
}

impl Default for Alu {
    fn default() -> Self {
        Self {
            a: Value::new(XLEN),
            b: Value::new(XLEN),
            f: Value::new(4),
            y: Value::new(XLEN),
        }
    }
}

impl Adopt for Alu {
    fn adopt(_previous: &mut Self) -> Self {
        Self::default()
    }
}

fn flag(bit: bool) -> Value {
    Value::from_u64(bit as u64, XLEN)
}

impl Module for Alu {
    fn eval(&mut self) -> bool {
        let (a, b) = (&self.a, &self.b);
        let f = self.f.to_u64().unwrap_or(0);
        let alternate = f & 0b1000 != 0;
        let y = match f & 0b111 {
            0b000 if alternate => a.wrapping_sub(b),
            0b000 => a.wrapping_add(b),
            0b010 => flag(a.scmp(b) == Ordering::Less),
            0b011 => flag(a.ucmp(b) == Ordering::Less),
            0b100 => a ^ b,
            0b101 => {
                let amount = b.slice(0, 5).to_u64().unwrap_or(0) as u32;
                if alternate {
                    a.sshr(amount)
                } else {
                    a.shr(amount)
                }
            }
            0b110 => a | b,
            0b111 => a & b,
            _ => Value::new(XLEN),
        };
        self.y.assign(&y)
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
            "a",
            DebugItem::new((&self.a).into(), scope.input_flags("a")),
        )?;
        items.add(
            scope,
            "b",
            DebugItem::new((&self.b).into(), scope.input_flags("b")),
        )?;
        items.add(
            scope,
            "f",
            DebugItem::new((&self.f).into(), scope.input_flags("f")),
        )?;
        items.add(
            scope,
            "y",
            DebugItem::new((&self.y).into(), DebugFlags::OUTPUT | DebugFlags::DRIVEN_COMB),
        )?;
        Ok(())
    }

    fn signal(&self, name: &str) -> Option<SignalRef<'_>> {
        match name {
            "a" => Some((&self.a).into()),
            "b" => Some((&self.b).into()),
            "f" => Some((&self.f).into()),
            "y" => Some((&self.y).into()),
            _ => None,
        }
    }

    fn signal_mut(&mut self, name: &str) -> Option<SignalMut<'_>> {
        match name {
            "a" => Some((&mut self.a).into()),
            "b" => Some((&mut self.b).into()),
            "f" => Some((&mut self.f).into()),
            "y" => Some((&mut self.y).into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: AluFunction, a: u64, b: u64) -> u64 {
        let mut alu = Alu {
            a: Value::from_u64(a, XLEN),
            b: Value::from_u64(b, XLEN),
            f: f.code(),
            ..Alu::default()
        };
        alu.eval();
        assert!(!alu.eval());
        alu.y.to_u64().unwrap()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run(AluFunction::Add, 0xFFFF_FFFF, 2), 1);
        assert_eq!(run(AluFunction::Sub, 1, 2), 0xFFFF_FFFF);
    }

    #[test]
    fn comparisons() {
        assert_eq!(run(AluFunction::Slt, 0xFFFF_FFFF, 0), 1);
        assert_eq!(run(AluFunction::Sltu, 0xFFFF_FFFF, 0), 0);
        assert_eq!(run(AluFunction::Sltu, 3, 4), 1);
        assert_eq!(run(AluFunction::Slt, 4, 4), 0);
    }

    #[test]
    fn logic() {
        assert_eq!(run(AluFunction::And, 0b1100, 0b1010), 0b1000);
        assert_eq!(run(AluFunction::Or, 0b1100, 0b1010), 0b1110);
        assert_eq!(run(AluFunction::Xor, 0b1100, 0b1010), 0b0110);
    }

    #[test]
    fn shifts_use_low_five_bits() {
        assert_eq!(run(AluFunction::Srl, 0x8000_0000, 4), 0x0800_0000);
        assert_eq!(run(AluFunction::Sra, 0x8000_0000, 4), 0xF800_0000);
        assert_eq!(run(AluFunction::Srl, 0x8000_0000, 33), 0x4000_0000);
    }

    #[test]
    fn unassigned_code_drives_zero() {
        let mut alu = Alu {
            a: Value::from_u64(5, XLEN),
            f: Value::from_u64(0b0001, 4),
            ..Alu::default()
        };
        alu.y = Value::from_u64(7, XLEN);
        assert!(alu.eval());
        assert!(alu.y.is_zero());
    }
}
