//! Cycle-accurate evaluation kernel for compiled digital-circuit models.
//!
//! A design is a tree of [`Module`]s owning bit-accurate signals. Each clock
//! step settles combinational logic by repeated `eval` passes until a fixed
//! point, then publishes every register and memory write at once with a
//! single `commit`. A debug registry maps hierarchical, space-separated
//! paths to signals so a host can inspect and force them by name.
//!
//! # Usage
//!
//! ```ignore
//! use kestrel_sim::{designs::Counter, Toplevel};
//!
//! let mut top = Toplevel::new(Counter::new(8));
//! top.set_u64("en", 1)?;
//! top.run(10)?;
//! assert_eq!(top.get("count")?.to_u64(), Some(10));
//! ```
//!
//! # Modules
//!
//! - `error`: Kernel error type
//! - `signal`: Values, state wires and memories
//! - `module`: The module protocol and reset by adoption
//! - `driver`: Settle-then-commit stepping
//! - `debug`: Debug introspection registry
//! - `toplevel`: Host-facing handle around a root module
//! - `netlist`: Data-driven modules built from a validated netlist
//! - `designs`: Hand-written reference models

#![warn(missing_docs)]

pub mod debug;
pub mod designs;
pub mod driver;
pub mod error;
pub mod module;
pub mod netlist;
pub mod signal;
pub mod toplevel;

pub use debug::{DebugFlags, DebugInfo, DebugItem, DebugItems, Direction, Scope};
pub use driver::{settle, step, StepResult};
pub use error::SimError;
pub use kestrel_common::Value;
pub use kestrel_config::SimConfig;
pub use module::{reset_by_adoption, Adopt, Module};
pub use netlist::{CellOp, MemId, NetId, NetlistBuilder, NetlistModule, Register, WritePort};
pub use signal::{Memory, SignalMut, SignalRef, Wire};
pub use toplevel::Toplevel;
