use crate::{
    error::Fault,
    word::{MASK, REGISTER_BASE, REGISTER_COUNT, REGISTER_LAST},
};

/// Index of one of the eight registers
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Register(pub u8);

impl Register {
    /// Builds a register from its index, returning `None` past `r7`
    pub fn new(i: u8) -> Option<Self> {
        ((i as usize) < REGISTER_COUNT).then_some(Register(i))
    }

    /// The raw word that names this register in a program
    pub fn word(self) -> u16 {
        REGISTER_BASE + self.0 as u16
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A decoded operand: either a literal or a register reference
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Literal(u16),
    Register(Register),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Literal(i) => write!(f, "{i}"),
            Value::Register(r) => write!(f, "{r}"),
        }
    }
}

/// Where an instruction stores its result
///
/// Register words name a register.  A literal in destination position is
/// malformed, but is tolerated the way the reference machine handles it:
/// the result overwrites the operand word itself, at the given address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dest {
    Register(Register),
    Memory(u16),
}

impl Dest {
    /// Resolves the raw word found at `addr` as a destination
    pub fn resolve(raw: u16, addr: u16) -> Result<Dest, Fault> {
        Ok(match Value::try_from(raw)? {
            Value::Register(r) => Dest::Register(r),
            Value::Literal(..) => Dest::Memory(addr),
        })
    }
}

impl std::fmt::Display for Dest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Dest::Register(r) => write!(f, "{r}"),
            Dest::Memory(a) => write!(f, "[{a}]"),
        }
    }
}

impl TryFrom<u16> for Value {
    type Error = Fault;
    fn try_from(t: u16) -> Result<Value, Fault> {
        match t {
            0..=MASK => Ok(Value::Literal(t)),
            REGISTER_BASE..=REGISTER_LAST => {
                Ok(Value::Register(Register((t - REGISTER_BASE) as u8)))
            }
            _ => Err(Fault::InvalidOperand(t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_literal() {
        assert_eq!(Value::try_from(0), Ok(Value::Literal(0)));
        assert_eq!(Value::try_from(32767), Ok(Value::Literal(32767)));
    }

    #[test]
    fn resolve_register() {
        assert_eq!(Value::try_from(32768), Ok(Value::Register(Register(0))));
        assert_eq!(Value::try_from(32775), Ok(Value::Register(Register(7))));
        assert_eq!(Register(3).word(), 32771);
    }

    #[test]
    fn register_band_edges() {
        assert_eq!(REGISTER_LAST, 32775);
        assert_eq!(
            Value::try_from(REGISTER_BASE - 1),
            Ok(Value::Literal(MASK))
        );
        for i in 0..REGISTER_COUNT as u8 {
            let r = Register::new(i).unwrap();
            assert_eq!(Value::try_from(r.word()), Ok(Value::Register(r)));
        }
        assert_eq!(
            Value::try_from(REGISTER_LAST + 1),
            Err(Fault::InvalidOperand(REGISTER_LAST + 1))
        );
    }

    #[test]
    fn resolve_invalid() {
        assert_eq!(Value::try_from(32776), Err(Fault::InvalidOperand(32776)));
        assert_eq!(
            Value::try_from(u16::MAX),
            Err(Fault::InvalidOperand(u16::MAX))
        );
    }

    #[test]
    fn resolve_dest() {
        assert_eq!(Dest::resolve(32770, 9), Ok(Dest::Register(Register(2))));
        assert_eq!(Dest::resolve(5, 9), Ok(Dest::Memory(9)));
        assert_eq!(Dest::resolve(40000, 9), Err(Fault::InvalidOperand(40000)));
        assert!(Register::new(8).is_none());
    }
}
