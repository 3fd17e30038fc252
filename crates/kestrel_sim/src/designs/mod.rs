//! Hand-written models in the shape a netlist compiler generates.
//!
//! Each design owns its signals as plain fields, implements [`Module`] with
//! straight-line `eval` code and resets through [`Adopt`]. They double as
//! fixtures for the kernel's own tests.
//!
//! [`Module`]: crate::module::Module
//! [`Adopt`]: crate::module::Adopt

mod alu;
mod counter;
mod rom;
mod sequencer;
mod top;

pub use alu::{Alu, AluFunction};
pub use counter::Counter;
pub use rom::Rom;
pub use sequencer::Sequencer;
pub use top::EmptyTop;
