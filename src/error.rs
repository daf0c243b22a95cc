use thiserror::Error;

/// Reasons for which execution cannot continue
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
    #[error("pop from empty stack")]
    EmptyStack,
    #[error("division by zero")]
    DivideByZero,
    #[error("end of input")]
    EndOfInput,
    #[error("invalid operand {0}")]
    InvalidOperand(u16),
    #[error("address {0} is outside memory")]
    OutOfBounds(u32),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("fault at {address}: {fault}")]
    Fault { address: u16, fault: Fault },
    #[error("program image has an odd length ({0} bytes)")]
    OddImage(usize),
    #[error("program image is {0} words, larger than memory")]
    ImageTooLarge(usize),
    #[error("invalid patch {0:?}, expected `rN=VALUE` or `ADDRESS=VALUE`")]
    BadPatch(String),
    #[error("no register value satisfies the teleporter check")]
    NoRegister,
    #[error("no path through the orb grid")]
    NoOrbPath,
    #[error("no coin ordering satisfies the monument")]
    NoCoinOrder,
    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the fault and its address, if this error is a fault
    pub fn fault(&self) -> Option<(u16, Fault)> {
        match self {
            Error::Fault { address, fault } => Some((*address, *fault)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_failures_are_not_faults() {
        for e in [Error::NoRegister, Error::NoOrbPath, Error::NoCoinOrder] {
            assert!(e.fault().is_none());
        }
        assert_eq!(
            Error::NoRegister.to_string(),
            "no register value satisfies the teleporter check"
        );
    }

    #[test]
    fn fault_display() {
        let e = Error::Fault {
            address: 3,
            fault: Fault::OutOfBounds(32768),
        };
        assert_eq!(
            e.to_string(),
            "fault at 3: address 32768 is outside memory"
        );
        assert_eq!(e.fault(), Some((3, Fault::OutOfBounds(32768))));
    }
}
