//! The machine's numeric model.
//!
//! Words are 16-bit, but arithmetic happens modulo 32768; the eight words
//! directly above the literal range name the registers.

/// Arithmetic modulus
pub const MODULUS: u32 = 32768;

/// Mask applied to every arithmetic result
pub const MASK: u16 = 32767;

/// First word of the register alias band
pub const REGISTER_BASE: u16 = 32768;

pub const REGISTER_COUNT: usize = 8;

/// Last word of the register alias band
pub const REGISTER_LAST: u16 = REGISTER_BASE + REGISTER_COUNT as u16 - 1;

/// Number of words of addressable memory
pub const MEMORY_SIZE: usize = 32768;
