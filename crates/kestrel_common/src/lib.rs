//! Shared foundational types for the Kestrel circuit evaluation kernel.
//!
//! This crate provides [`Value`], the fixed-width two-state bit vector every
//! wire, register and memory word in a simulated design is stored in.

#![warn(missing_docs)]

pub mod value;

pub use value::Value;
