//! Packed fixed-width bit vectors for signal storage and arithmetic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A fixed-width vector of two-state bits packed into `u64` words.
///
/// The width is chosen at construction and never changes. Bit 0 is the least
/// significant bit. Bits at or above the width are always zero: every
/// operation re-masks the most significant word before returning.
///
/// Binary operators require both operands to have the same width; a mismatch
/// is a defect in the model being simulated and panics. The default value is
/// zero bits wide.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawValue")]
pub struct Value {
    width: u32,
    /// Packed storage, least significant word first.
    words: Vec<u64>,
}

/// Unchecked serialized form of a [`Value`].
#[derive(Deserialize)]
struct RawValue {
    width: u32,
    words: Vec<u64>,
}

impl TryFrom<RawValue> for Value {
    type Error = String;

    fn try_from(raw: RawValue) -> Result<Self, Self::Error> {
        let expected = word_count(raw.width);
        if raw.words.len() != expected {
            return Err(format!(
                "{} words given for a {}-bit value, expected {expected}",
                raw.words.len(),
                raw.width
            ));
        }
        let value = Value::from_words(&raw.words, raw.width);
        if value.words != raw.words {
            return Err(format!("bits set above width {}", raw.width));
        }
        Ok(value)
    }
}

/// Number of bits packed per storage word.
const BITS_PER_WORD: u32 = 64;

impl Value {
    /// Creates a new `Value` of the given width with all bits cleared.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            words: vec![0; word_count(width)],
        }
    }

    /// Creates a `Value` with every bit set.
    pub fn all_ones(width: u32) -> Self {
        let mut v = Self {
            width,
            words: vec![u64::MAX; word_count(width)],
        };
        v.mask();
        v
    }

    /// Creates a `Value` from a `u64`, truncated to `width` bits.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        if let Some(word) = v.words.first_mut() {
            *word = value;
        }
        v.mask();
        v
    }

    /// Creates a single-bit `Value` from a boolean.
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(u64::from(value), 1)
    }

    /// Creates a `Value` from little-endian words, truncated to `width` bits.
    ///
    /// Missing words are zero-filled.
    pub fn from_words(words: &[u64], width: u32) -> Self {
        let mut v = Self::new(width);
        for (dst, src) in v.words.iter_mut().zip(words) {
            *dst = *src;
        }
        v.mask();
        v
    }

    /// Returns the bit width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the packed storage words, least significant first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Converts to a `u64` if no bit at or above position 64 is set.
    pub fn to_u64(&self) -> Option<u64> {
        if self.words.iter().skip(1).any(|&w| w != 0) {
            return None;
        }
        Some(self.words.first().copied().unwrap_or(0))
    }

    /// Returns `true` if any bit is set.
    pub fn to_bool(&self) -> bool {
        !self.is_zero()
    }

    /// Gets the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = self.words[(index / BITS_PER_WORD) as usize];
        (word >> (index % BITS_PER_WORD)) & 1 != 0
    }

    /// Sets the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, bit: bool) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = &mut self.words[(index / BITS_PER_WORD) as usize];
        let mask = 1u64 << (index % BITS_PER_WORD);
        if bit {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Returns true if all bits are clear.
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns true if the most significant bit is set.
    pub fn is_neg(&self) -> bool {
        self.width > 0 && self.get(self.width - 1)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Copies `other` into `self`, returning whether any bit changed.
    ///
    /// # Panics
    ///
    /// Panics if the widths differ.
    pub fn assign(&mut self, other: &Value) -> bool {
        assert_eq!(self.width, other.width, "Value width mismatch in assign");
        if self.words == other.words {
            return false;
        }
        self.words.copy_from_slice(&other.words);
        true
    }

    /// Zero-extends (or truncates) to `width` bits.
    pub fn zext(&self, width: u32) -> Value {
        Value::from_words(&self.words, width)
    }

    /// Sign-extends (or truncates) to `width` bits.
    pub fn sext(&self, width: u32) -> Value {
        let mut result = self.zext(width);
        if width > self.width && self.is_neg() {
            for i in self.width..width {
                result.set(i, true);
            }
        }
        result
    }

    /// Extracts `width` bits starting at bit `offset`.
    ///
    /// Bits beyond the source width read as zero.
    pub fn slice(&self, offset: u32, width: u32) -> Value {
        self.shr(offset).zext(width)
    }

    /// Concatenates `hi` above `lo`; the result is `hi.width() + lo.width()` wide.
    pub fn concat(hi: &Value, lo: &Value) -> Value {
        let width = hi.width + lo.width;
        let mut result = hi.zext(width).shl(lo.width);
        for (dst, src) in result.words.iter_mut().zip(&lo.words) {
            *dst |= *src;
        }
        result
    }

    /// Modular addition.
    pub fn wrapping_add(&self, rhs: &Value) -> Value {
        assert_eq!(self.width, rhs.width, "Value width mismatch in add");
        self.add_with_carry(rhs, false, false)
    }

    /// Modular subtraction, computed as `self + !rhs + 1`.
    pub fn wrapping_sub(&self, rhs: &Value) -> Value {
        assert_eq!(self.width, rhs.width, "Value width mismatch in sub");
        self.add_with_carry(rhs, true, true)
    }

    /// Two's-complement negation.
    pub fn wrapping_neg(&self) -> Value {
        Value::new(self.width).wrapping_sub(self)
    }

    /// Logical shift left; vacated bits are zero.
    pub fn shl(&self, amount: u32) -> Value {
        let mut result = Value::new(self.width);
        if amount >= self.width {
            return result;
        }
        let word_shift = (amount / BITS_PER_WORD) as usize;
        let bit_shift = amount % BITS_PER_WORD;
        for i in (word_shift..self.words.len()).rev() {
            let src = i - word_shift;
            let mut word = self.words[src] << bit_shift;
            if bit_shift != 0 && src > 0 {
                word |= self.words[src - 1] >> (BITS_PER_WORD - bit_shift);
            }
            result.words[i] = word;
        }
        result.mask();
        result
    }

    /// Logical shift right; vacated bits are zero.
    pub fn shr(&self, amount: u32) -> Value {
        let mut result = Value::new(self.width);
        if amount >= self.width {
            return result;
        }
        let word_shift = (amount / BITS_PER_WORD) as usize;
        let bit_shift = amount % BITS_PER_WORD;
        let len = self.words.len();
        for i in 0..len - word_shift {
            let src = i + word_shift;
            let mut word = self.words[src] >> bit_shift;
            if bit_shift != 0 && src + 1 < len {
                word |= self.words[src + 1] << (BITS_PER_WORD - bit_shift);
            }
            result.words[i] = word;
        }
        result
    }

    /// Arithmetic shift right; vacated bits copy the sign bit.
    pub fn sshr(&self, amount: u32) -> Value {
        let mut result = self.shr(amount);
        if self.is_neg() {
            let fill = amount.min(self.width);
            for i in self.width - fill..self.width {
                result.set(i, true);
            }
        }
        result
    }

    /// Unsigned comparison.
    pub fn ucmp(&self, rhs: &Value) -> Ordering {
        assert_eq!(self.width, rhs.width, "Value width mismatch in compare");
        self.words.iter().rev().cmp(rhs.words.iter().rev())
    }

    /// Signed (two's-complement) comparison.
    pub fn scmp(&self, rhs: &Value) -> Ordering {
        match (self.is_neg(), rhs.is_neg()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.ucmp(rhs),
        }
    }

    /// OR of all bits, as a 1-bit value.
    pub fn reduce_or(&self) -> Value {
        Value::from_bool(!self.is_zero())
    }

    /// AND of all bits, as a 1-bit value.
    pub fn reduce_and(&self) -> Value {
        Value::from_bool(self.count_ones() == self.width)
    }

    /// XOR of all bits (odd parity), as a 1-bit value.
    pub fn reduce_xor(&self) -> Value {
        Value::from_bool(self.count_ones() % 2 == 1)
    }

    /// Parses a binary string like `"1010"`.
    ///
    /// The leftmost character is the most significant bit. Returns `None` if
    /// the string contains anything other than `0` and `1`.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let width = s.len() as u32;
        let mut v = Self::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            match c {
                '0' => {}
                '1' => v.set(i as u32, true),
                _ => return None,
            }
        }
        Some(v)
    }

    /// Parses a hex string; each digit contributes 4 bits.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let width = (s.len() as u32) * 4;
        let mut v = Self::new(width);
        for (digit_idx, c) in s.chars().rev().enumerate() {
            let nibble = u64::from(c.to_digit(16)?);
            let bit = digit_idx as u32 * 4;
            v.words[(bit / BITS_PER_WORD) as usize] |= nibble << (bit % BITS_PER_WORD);
        }
        Some(v)
    }

    fn add_with_carry(&self, rhs: &Value, invert_rhs: bool, carry_in: bool) -> Value {
        let mut result = Value::new(self.width);
        let mut carry = u64::from(carry_in);
        for (i, (&a, &b)) in self.words.iter().zip(&rhs.words).enumerate() {
            let b = if invert_rhs { !b } else { b };
            let (partial, c1) = a.overflowing_add(b);
            let (sum, c2) = partial.overflowing_add(carry);
            result.words[i] = sum;
            carry = u64::from(c1 || c2);
        }
        result.mask();
        result
    }

    /// Clears the bits above `width` in the top word.
    fn mask(&mut self) {
        let rem = self.width % BITS_PER_WORD;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::LowerHex for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = self.words.iter().rev().skip_while(|&&w| w == 0);
        match words.next() {
            None => f.write_str("0"),
            Some(first) => {
                write!(f, "{first:x}")?;
                for word in words {
                    write!(f, "{word:016x}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>(0x{:x})", self.width, self)
    }
}

impl BitAnd for &Value {
    type Output = Value;

    fn bitand(self, rhs: Self) -> Value {
        assert_eq!(self.width, rhs.width, "Value width mismatch in AND");
        let words = self.words.iter().zip(&rhs.words).map(|(a, b)| a & b);
        Value {
            width: self.width,
            words: words.collect(),
        }
    }
}

impl BitOr for &Value {
    type Output = Value;

    fn bitor(self, rhs: Self) -> Value {
        assert_eq!(self.width, rhs.width, "Value width mismatch in OR");
        let words = self.words.iter().zip(&rhs.words).map(|(a, b)| a | b);
        Value {
            width: self.width,
            words: words.collect(),
        }
    }
}

impl BitXor for &Value {
    type Output = Value;

    fn bitxor(self, rhs: Self) -> Value {
        assert_eq!(self.width, rhs.width, "Value width mismatch in XOR");
        let words = self.words.iter().zip(&rhs.words).map(|(a, b)| a ^ b);
        Value {
            width: self.width,
            words: words.collect(),
        }
    }
}

impl Not for &Value {
    type Output = Value;

    fn not(self) -> Value {
        let mut result = Value {
            width: self.width,
            words: self.words.iter().map(|w| !w).collect(),
        };
        result.mask();
        result
    }
}

/// Computes the number of u64 words needed to store `width` bits.
fn word_count(width: u32) -> usize {
    width.div_ceil(BITS_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zero() {
        let v = Value::new(70);
        assert_eq!(v.width(), 70);
        assert_eq!(v.words().len(), 2);
        assert!(v.is_zero());
    }

    #[test]
    fn from_u64_truncates() {
        let v = Value::from_u64(0xFF, 4);
        assert_eq!(v.to_u64(), Some(0xF));
    }

    #[test]
    fn all_ones_masks_top_word() {
        let v = Value::all_ones(65);
        assert_eq!(v.words(), &[u64::MAX, 1]);
        assert_eq!(v.count_ones(), 65);
    }

    #[test]
    fn set_get_roundtrip() {
        let mut v = Value::new(100);
        v.set(0, true);
        v.set(63, true);
        v.set(64, true);
        v.set(99, true);
        assert!(v.get(0));
        assert!(!v.get(1));
        assert!(v.get(63));
        assert!(v.get(64));
        assert!(v.get(99));
        v.set(63, false);
        assert!(!v.get(63));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn get_out_of_bounds_panics() {
        Value::new(4).get(4);
    }

    #[test]
    fn to_u64_rejects_high_bits() {
        let mut v = Value::new(80);
        v.set(70, true);
        assert_eq!(v.to_u64(), None);
        assert_eq!(Value::from_u64(7, 80).to_u64(), Some(7));
    }

    #[test]
    fn assign_reports_change() {
        let mut v = Value::new(8);
        assert!(v.assign(&Value::from_u64(3, 8)));
        assert!(!v.assign(&Value::from_u64(3, 8)));
        assert_eq!(v.to_u64(), Some(3));
    }

    #[test]
    #[should_panic(expected = "width mismatch")]
    fn assign_width_mismatch_panics() {
        Value::new(8).assign(&Value::new(4));
    }

    #[test]
    fn add_wraps() {
        let a = Value::from_u64(0xF, 4);
        let b = Value::from_u64(1, 4);
        assert!(a.wrapping_add(&b).is_zero());
    }

    #[test]
    fn add_carries_across_words() {
        let a = Value::from_u64(u64::MAX, 96);
        let b = Value::from_u64(1, 96);
        let sum = a.wrapping_add(&b);
        assert_eq!(sum.words(), &[0, 1]);
    }

    #[test]
    fn sub_and_neg() {
        let a = Value::from_u64(3, 8);
        let b = Value::from_u64(5, 8);
        assert_eq!(a.wrapping_sub(&b).to_u64(), Some(0xFE));
        assert_eq!(b.wrapping_neg().to_u64(), Some(0xFB));
        assert!(Value::new(8).wrapping_neg().is_zero());
    }

    #[test]
    fn shifts() {
        let v = Value::from_u64(0b1001, 4);
        assert_eq!(v.shl(1).to_u64(), Some(0b0010));
        assert_eq!(v.shr(1).to_u64(), Some(0b0100));
        assert_eq!(v.sshr(1).to_u64(), Some(0b1100));
        assert!(v.shl(4).is_zero());
        assert!(v.shr(10).is_zero());
        assert_eq!(v.sshr(10).to_u64(), Some(0b1111));
    }

    #[test]
    fn shifts_across_words() {
        let v = Value::from_u64(1, 128);
        let moved = v.shl(100);
        assert!(moved.get(100));
        assert_eq!(moved.count_ones(), 1);
        assert_eq!(moved.shr(100).to_u64(), Some(1));
        let v = Value::from_u64(0x3, 128).shl(63);
        assert_eq!(v.words(), &[1 << 63, 1]);
    }

    #[test]
    fn comparisons() {
        let a = Value::from_u64(0xF0, 8);
        let b = Value::from_u64(0x01, 8);
        assert_eq!(a.ucmp(&b), Ordering::Greater);
        assert_eq!(a.scmp(&b), Ordering::Less);
        assert_eq!(a.scmp(&a), Ordering::Equal);
        let wide_hi = Value::from_u64(1, 70).shl(65);
        let wide_lo = Value::from_u64(u64::MAX, 70);
        assert_eq!(wide_hi.ucmp(&wide_lo), Ordering::Greater);
    }

    #[test]
    fn reductions() {
        let v = Value::from_u64(0b0110, 4);
        assert_eq!(v.reduce_or().to_u64(), Some(1));
        assert_eq!(v.reduce_and().to_u64(), Some(0));
        assert_eq!(v.reduce_xor().to_u64(), Some(0));
        assert_eq!(Value::all_ones(4).reduce_and().to_u64(), Some(1));
    }

    #[test]
    fn extend_slice_concat() {
        let v = Value::from_u64(0b1010, 4);
        assert_eq!(v.zext(8).to_u64(), Some(0b0000_1010));
        assert_eq!(v.sext(8).to_u64(), Some(0b1111_1010));
        assert_eq!(v.sext(2).to_u64(), Some(0b10));
        assert_eq!(v.slice(1, 2).to_u64(), Some(0b01));
        assert_eq!(v.slice(3, 4).to_u64(), Some(0b0001));
        let joined = Value::concat(&Value::from_u64(0b11, 2), &v);
        assert_eq!(joined.width(), 6);
        assert_eq!(joined.to_u64(), Some(0b11_1010));
    }

    #[test]
    fn bitwise_ops() {
        let a = Value::from_u64(0b1100, 4);
        let b = Value::from_u64(0b1010, 4);
        assert_eq!((&a & &b).to_u64(), Some(0b1000));
        assert_eq!((&a | &b).to_u64(), Some(0b1110));
        assert_eq!((&a ^ &b).to_u64(), Some(0b0110));
        assert_eq!((!&a).to_u64(), Some(0b0011));
    }

    #[test]
    fn parse_strings() {
        let v = Value::from_binary_str("1010").unwrap();
        assert_eq!(v.width(), 4);
        assert_eq!(v.to_u64(), Some(0b1010));
        assert!(Value::from_binary_str("10x1").is_none());
        let h = Value::from_hex_str("a5").unwrap();
        assert_eq!(h.width(), 8);
        assert_eq!(h.to_u64(), Some(0xA5));
        assert!(Value::from_hex_str("g1").is_none());
    }

    #[test]
    fn display_and_hex() {
        let v = Value::from_u64(0b0101, 4);
        assert_eq!(format!("{v}"), "0101");
        assert_eq!(format!("{:x}", Value::from_u64(0xAB, 8)), "ab");
        assert_eq!(format!("{:x}", Value::new(8)), "0");
        let wide = Value::from_u64(1, 96).shl(64);
        assert_eq!(format!("{wide:x}"), "10000000000000000");
    }

    #[test]
    fn serde_roundtrip() {
        let v = Value::from_u64(0x1234, 16);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn deserialize_rejects_malformed_storage() {
        let wide_bits = serde_json::from_str::<Value>(r#"{"width":4,"words":[255]}"#);
        assert!(wide_bits.is_err());
        let short = serde_json::from_str::<Value>(r#"{"width":8,"words":[]}"#);
        assert!(short.is_err());
        let long = serde_json::from_str::<Value>(r#"{"width":8,"words":[1,0]}"#);
        assert!(long.is_err());
        let ok: Value = serde_json::from_str(r#"{"width":70,"words":[1,63]}"#).unwrap();
        assert_eq!(ok.width(), 70);
        assert!(ok.get(69));
    }
}
