//! Host-side shortcuts for computations the challenge program makes
//! deliberately slow
pub mod checksum;
pub mod coins;
pub mod orb;
