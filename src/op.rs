use crate::{
    error::Fault,
    memory::Memory,
    operand::{Dest, Value},
};

/// A single decoded instruction
///
/// Destination operands are decoded as [`Dest`]s, except for `wmem`, whose
/// first operand is an address value like any other source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Halt,
    Set(Dest, Value),
    Push(Value),
    Pop(Dest),
    Eq(Dest, Value, Value),
    Gt(Dest, Value, Value),
    Jmp(Value),
    Jt(Value, Value),
    Jf(Value, Value),
    Add(Dest, Value, Value),
    Mult(Dest, Value, Value),
    Mod(Dest, Value, Value),
    And(Dest, Value, Value),
    Or(Dest, Value, Value),
    Not(Dest, Value),
    Rmem(Dest, Value),
    Wmem(Value, Value),
    Call(Value),
    Ret,
    Out(Value),
    In(Dest),
    Noop,
}

/// Reads operand words in order, starting just after an opcode
struct Operands<'a> {
    mem: &'a Memory,
    ip: u32,
}

impl Operands<'_> {
    /// Reads a source operand, advancing the cursor
    fn val(&mut self) -> Result<Value, Fault> {
        let raw = self.mem.read(self.ip)?;
        self.ip += 1;
        Value::try_from(raw)
    }

    /// Reads a destination operand, advancing the cursor
    fn dest(&mut self) -> Result<Dest, Fault> {
        let raw = self.mem.read(self.ip)?;
        let d = Dest::resolve(raw, self.ip as u16)?;
        self.ip += 1;
        Ok(d)
    }
}

impl Op {
    /// Decodes the operands of `opcode`, which was fetched from `addr`
    ///
    /// Memory is re-read on every call, so self-modifying programs see their
    /// own writes.
    pub fn decode(opcode: u16, mem: &Memory, addr: u16) -> Result<Op, Fault> {
        let mut r = Operands {
            mem,
            ip: addr as u32 + 1,
        };
        let op = match opcode {
            0 => Op::Halt,
            1 => {
                let a = r.dest()?;
                let b = r.val()?;
                Op::Set(a, b)
            }
            2 => Op::Push(r.val()?),
            3 => Op::Pop(r.dest()?),
            4 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::Eq(a, b, c)
            }
            5 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::Gt(a, b, c)
            }
            6 => Op::Jmp(r.val()?),
            7 => {
                let a = r.val()?;
                let b = r.val()?;
                Op::Jt(a, b)
            }
            8 => {
                let a = r.val()?;
                let b = r.val()?;
                Op::Jf(a, b)
            }
            9 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::Add(a, b, c)
            }
            10 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::Mult(a, b, c)
            }
            11 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::Mod(a, b, c)
            }
            12 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::And(a, b, c)
            }
            13 => {
                let a = r.dest()?;
                let b = r.val()?;
                let c = r.val()?;
                Op::Or(a, b, c)
            }
            14 => {
                let a = r.dest()?;
                let b = r.val()?;
                Op::Not(a, b)
            }
            15 => {
                let a = r.dest()?;
                let b = r.val()?;
                Op::Rmem(a, b)
            }
            16 => {
                let a = r.val()?;
                let b = r.val()?;
                Op::Wmem(a, b)
            }
            17 => Op::Call(r.val()?),
            18 => Op::Ret,
            19 => Op::Out(r.val()?),
            20 => Op::In(r.dest()?),
            21 => Op::Noop,
            i => return Err(Fault::UnknownOpcode(i)),
        };
        Ok(op)
    }

    /// Length of the encoded instruction, in words
    pub fn len(&self) -> u16 {
        match self {
            Op::Halt | Op::Ret | Op::Noop => 1,
            Op::Push(..)
            | Op::Pop(..)
            | Op::Jmp(..)
            | Op::Call(..)
            | Op::Out(..)
            | Op::In(..) => 2,
            Op::Set(..)
            | Op::Jt(..)
            | Op::Jf(..)
            | Op::Not(..)
            | Op::Rmem(..)
            | Op::Wmem(..) => 3,
            Op::Eq(..)
            | Op::Gt(..)
            | Op::Add(..)
            | Op::Mult(..)
            | Op::Mod(..)
            | Op::And(..)
            | Op::Or(..) => 4,
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Op::Halt => write!(f, "halt"),
            Op::Set(a, b) => write!(f, "{a} = {b}"),
            Op::Push(a) => write!(f, "push {a}"),
            Op::Pop(a) => write!(f, "pop  {a}"),
            Op::Eq(a, b, c) => write!(f, "{a} = {b} == {c}"),
            Op::Gt(a, b, c) => write!(f, "{a} = {b} > {c}"),
            Op::Jmp(a) => write!(f, "jmp  {a}"),
            Op::Jt(a, b) => write!(f, "jt   {a} {b}"),
            Op::Jf(a, b) => write!(f, "jf   {a} {b}"),
            Op::Add(a, b, c) => write!(f, "{a} = {b} + {c}"),
            Op::Mult(a, b, c) => write!(f, "{a} = {b} * {c}"),
            Op::Mod(a, b, c) => write!(f, "{a} = {b} % {c}"),
            Op::And(a, b, c) => write!(f, "{a} = {b} & {c}"),
            Op::Or(a, b, c) => write!(f, "{a} = {b} | {c}"),
            Op::Not(a, b) => write!(f, "{a} = !{b}"),
            Op::Rmem(a, b) => write!(f, "rmem {a} {b}"),
            Op::Wmem(a, b) => write!(f, "wmem {a} {b}"),
            Op::Call(a) => write!(f, "call {a}"),
            Op::Ret => write!(f, "ret"),
            Op::Out(Value::Literal(c)) => {
                write!(f, "out  {:?}", char::from(*c as u8))
            }
            Op::Out(a) => write!(f, "out  {a}"),
            Op::In(a) => write!(f, "in   {a}"),
            Op::Noop => write!(f, "noop"),
        }
    }
}
