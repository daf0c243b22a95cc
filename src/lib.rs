//! A virtual machine for the Synacor Challenge architecture, plus solvers
//! for the puzzles that the challenge program makes too slow to brute-force
//! inside the VM.
pub mod error;
pub mod memory;
pub mod op;
pub mod operand;
pub mod patch;
pub mod solver;
pub mod vm;
pub mod word;

pub use error::{Error, Fault};
pub use memory::Memory;
pub use vm::{Exit, State, Status, Termination, Vm};
