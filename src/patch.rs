//! Out-of-band writes into a running machine
//!
//! These let the host skip over computations that would otherwise take far
//! too long inside the VM, by poking known answers into registers and
//! memory.

use crate::{
    error::{Error, Fault},
    operand::Register,
    vm::Vm,
    word::MEMORY_SIZE,
};
use log::debug;

/// Address of the confirmation call in the teleporter routine
pub const TELEPORTER_CALL: u16 = 5489;

/// Value the confirmation routine leaves in `r0` on success
pub const TELEPORTER_RESULT: u16 = 6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Patch {
    /// Write a value into a register
    Register(Register, u16),
    /// Write a word into memory
    Memory(u16, u16),
}

impl Patch {
    pub fn apply(&self, vm: &mut Vm) -> Result<(), Fault> {
        debug!("applying {self}");
        match *self {
            Patch::Register(r, v) => vm[r] = v,
            Patch::Memory(addr, v) => vm.memory_mut().write(addr, v)?,
        }
        Ok(())
    }
}

impl std::fmt::Display for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Patch::Register(r, v) => write!(f, "{r}={v}"),
            Patch::Memory(a, v) => write!(f, "{a}={v}"),
        }
    }
}

impl std::str::FromStr for Patch {
    type Err = Error;

    /// Parses `rN=VALUE` or `ADDRESS=VALUE`
    fn from_str(s: &str) -> Result<Self, Error> {
        let bad = || Error::BadPatch(s.to_owned());
        let (lhs, rhs) = s.split_once('=').ok_or_else(bad)?;
        let value = rhs.trim().parse::<u16>().map_err(|_| bad())?;
        let lhs = lhs.trim();
        if let Some(r) = lhs.strip_prefix('r') {
            let r = r
                .parse::<u8>()
                .ok()
                .and_then(Register::new)
                .ok_or_else(bad)?;
            Ok(Patch::Register(r, value))
        } else {
            let addr = lhs
                .parse::<u16>()
                .ok()
                .filter(|a| (*a as usize) < MEMORY_SIZE)
                .ok_or_else(bad)?;
            Ok(Patch::Memory(addr, value))
        }
    }
}

/// A set of patches applied once, when `ip` first reaches `at`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hook {
    pub at: u16,
    pub patches: Vec<Patch>,
}

/// Builds the hook that bypasses the teleporter's confirmation check
///
/// The two-word call at `call_site` becomes a pair of `noop`s, `r0` is
/// preloaded with the value the check would have returned, and `r7` is set
/// to the register value found by [`crate::solver::checksum::find`].
pub fn teleporter(call_site: u16, r7: u16) -> Hook {
    Hook {
        at: call_site,
        patches: vec![
            Patch::Memory(call_site, 21),
            Patch::Memory(call_site.wrapping_add(1), 21),
            Patch::Register(Register(0), TELEPORTER_RESULT),
            Patch::Register(Register(7), r7),
        ],
    }
}
