use crate::{
    error::{Error, Fault},
    memory::Memory,
    op::Op,
    operand::{Dest, Register, Value},
    patch::Hook,
    word::{MASK, REGISTER_COUNT},
};
use log::{debug, info, trace, warn};
use std::io::{Read, Write};

/// Why execution stopped without a fault
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Termination {
    /// A `halt` instruction ran
    Halt,
    /// `ret` found the stack empty
    EmptyReturn,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Termination::Halt => write!(f, "halted"),
            Termination::EmptyReturn => write!(f, "returned with an empty stack"),
        }
    }
}

/// Graceful end of execution, with the address of the final instruction
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Exit {
    pub address: u16,
    pub reason: Termination,
}

/// Dispatcher state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Halted(Exit),
    Faulted { address: u16, fault: Fault },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Continue with normal operation
    ///
    /// The flag is true if the input byte was consumed
    Continue(bool),

    /// Stop; this is reported again by every later call to `step`
    Halt(Exit),

    /// Print the given output byte
    Out(u8),

    /// The VM requires input and no input byte is available
    ///
    /// The instruction pointer stays on the `in` instruction, so the next
    /// call to `step` retries it.
    NeedsInput,
}

#[derive(Clone, Debug)]
pub struct Vm {
    memory: Memory,
    register: [u16; REGISTER_COUNT],
    stack: Vec<u16>,
    ip: u16,
    state: State,
    hooks: Vec<Hook>,
}

impl std::ops::Index<Register> for Vm {
    type Output = u16;
    fn index(&self, r: Register) -> &Self::Output {
        &self.register[r.0 as usize]
    }
}

impl std::ops::IndexMut<Register> for Vm {
    fn index_mut(&mut self, r: Register) -> &mut Self::Output {
        &mut self.register[r.0 as usize]
    }
}

impl Vm {
    /// Builds a VM from a little-endian program image
    pub fn new(bin: &[u8]) -> Result<Self, Error> {
        Ok(Self::from_memory(Memory::from_image(bin)?))
    }

    pub fn from_memory(memory: Memory) -> Self {
        Self {
            memory,
            register: [0; REGISTER_COUNT],
            stack: vec![],
            ip: 0,
            state: State::Running,
            hooks: vec![],
        }
    }

    pub fn ip(&self) -> u16 {
        self.ip
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// True once the machine has halted or faulted
    pub fn is_halted(&self) -> bool {
        self.state != State::Running
    }

    pub fn registers(&self) -> &[u16; REGISTER_COUNT] {
        &self.register
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Installs a hook which fires when `ip` next reaches its address
    pub fn add_hook(&mut self, hook: Hook) {
        self.hooks.push(hook);
    }

    /// Gets a value from a register or literal
    fn get(&self, v: Value) -> u16 {
        match v {
            Value::Literal(i) => i,
            Value::Register(r) => self[r],
        }
    }

    /// Stores an instruction's result
    fn put(&mut self, d: Dest, v: u16) {
        match d {
            Dest::Register(r) => self[r] = v,
            Dest::Memory(addr) => {
                debug!("literal destination, writing {v} to {addr}");
                self.memory[addr] = v;
            }
        }
    }

    /// Records a fault, stopping the machine
    fn fault(&mut self, address: u16, fault: Fault) -> Error {
        warn!("fault at {address}: {fault}");
        self.state = State::Faulted { address, fault };
        Error::Fault { address, fault }
    }

    fn fire_hooks(&mut self) -> Result<(), Fault> {
        let ip = self.ip;
        if !self.hooks.iter().any(|h| h.at == ip) {
            return Ok(());
        }
        let (fire, keep): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.hooks)
                .into_iter()
                .partition(|h| h.at == ip);
        self.hooks = keep;
        for h in fire {
            debug!("hook at {ip}: applying {} patches", h.patches.len());
            for p in &h.patches {
                p.apply(self)?;
            }
        }
        Ok(())
    }

    /// Fetches the opcode at `addr` and decodes its operands
    ///
    /// The opcode word goes through the same resolution as any source
    /// operand.
    fn fetch(&self, addr: u16) -> Result<Op, Fault> {
        let raw = self.memory.read(addr as u32)?;
        let opcode = self.get(Value::try_from(raw)?);
        Op::decode(opcode, &self.memory, addr)
    }

    /// Executes a single instruction
    ///
    /// `input` is offered to an `in` instruction; whether it was used is
    /// reported through [`Status::Continue`].
    pub fn step(&mut self, input: Option<u8>) -> Result<Status, Error> {
        match self.state {
            State::Running => (),
            State::Halted(exit) => return Ok(Status::Halt(exit)),
            State::Faulted { address, fault } => {
                return Err(Error::Fault { address, fault })
            }
        }
        let addr = self.ip;
        if let Err(f) = self.fire_hooks() {
            return Err(self.fault(addr, f));
        }
        match self.execute(addr, input) {
            Ok((next, status)) => {
                self.ip = next;
                if let Status::Halt(exit) = status {
                    info!("{} at {}", exit.reason, exit.address);
                    self.state = State::Halted(exit);
                }
                Ok(status)
            }
            Err(f) => Err(self.fault(addr, f)),
        }
    }

    /// Runs the instruction at `addr`, returning the next instruction pointer
    fn execute(
        &mut self,
        addr: u16,
        input: Option<u8>,
    ) -> Result<(u16, Status), Fault> {
        let op = self.fetch(addr)?;
        trace!("{addr}: {op}");
        let next = addr + op.len();
        let mut status = Status::Continue(false);
        let next = match op {
            Op::Halt => {
                let exit = Exit {
                    address: addr,
                    reason: Termination::Halt,
                };
                return Ok((addr, Status::Halt(exit)));
            }
            Op::Set(a, b) => {
                self.put(a, self.get(b));
                next
            }
            Op::Push(a) => {
                self.stack.push(self.get(a));
                next
            }
            Op::Pop(a) => {
                let v = self.stack.pop().ok_or(Fault::EmptyStack)?;
                self.put(a, v);
                next
            }
            Op::Eq(a, b, c) => {
                self.put(a, (self.get(b) == self.get(c)) as u16);
                next
            }
            Op::Gt(a, b, c) => {
                self.put(a, (self.get(b) > self.get(c)) as u16);
                next
            }
            Op::Jmp(a) => self.get(a),
            Op::Jt(a, b) => {
                if self.get(a) != 0 {
                    self.get(b)
                } else {
                    next
                }
            }
            Op::Jf(a, b) => {
                if self.get(a) == 0 {
                    self.get(b)
                } else {
                    next
                }
            }
            Op::Add(a, b, c) => {
                self.put(a, self.get(b).wrapping_add(self.get(c)) & MASK);
                next
            }
            Op::Mult(a, b, c) => {
                self.put(a, self.get(b).wrapping_mul(self.get(c)) & MASK);
                next
            }
            Op::Mod(a, b, c) => {
                let d = self.get(c);
                if d == 0 {
                    return Err(Fault::DivideByZero);
                }
                self.put(a, (self.get(b) % d) & MASK);
                next
            }
            Op::And(a, b, c) => {
                self.put(a, (self.get(b) & self.get(c)) & MASK);
                next
            }
            Op::Or(a, b, c) => {
                self.put(a, (self.get(b) | self.get(c)) & MASK);
                next
            }
            Op::Not(a, b) => {
                self.put(a, !self.get(b) & MASK);
                next
            }
            Op::Rmem(a, b) => {
                // A register may hold a word past the end of memory
                let v = self.memory.read(self.get(b) as u32)?;
                self.put(a, v);
                next
            }
            Op::Wmem(a, b) => {
                // Always a memory write, even when `a` names a register
                let a = self.get(a);
                let v = self.get(b);
                self.memory.write(a, v)?;
                next
            }
            Op::Call(a) => {
                self.stack.push(next);
                self.get(a)
            }
            Op::Ret => {
                let Some(r) = self.stack.pop() else {
                    let exit = Exit {
                        address: addr,
                        reason: Termination::EmptyReturn,
                    };
                    return Ok((addr, Status::Halt(exit)));
                };
                r
            }
            Op::Out(a) => {
                status = Status::Out(self.get(a) as u8);
                next
            }
            Op::In(a) => {
                let Some(i) = input else {
                    return Ok((addr, Status::NeedsInput));
                };
                self.put(a, i as u16);
                status = Status::Continue(true);
                next
            }
            Op::Noop => next,
        };
        Ok((next, status))
    }

    /// Runs until the program halts or faults
    ///
    /// Input bytes are pulled from `input` one at a time, as the program
    /// asks for them; running out of input is a fault.
    pub fn run<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<Exit, Error> {
        self.run_with_limit(input, output, None)
    }

    /// Like [`Vm::run`], but fails once `max_steps` instructions have run
    pub fn run_with_limit<R: Read, W: Write>(
        &mut self,
        input: R,
        mut output: W,
        max_steps: Option<u64>,
    ) -> Result<Exit, Error> {
        let mut input = input.bytes();
        let mut pending = None;
        let mut steps = 0u64;
        loop {
            if max_steps.is_some_and(|max| steps >= max) {
                output.flush()?;
                return Err(Error::StepLimit(steps));
            }
            match self.step(pending) {
                Ok(Status::Continue(consumed)) => {
                    if consumed {
                        pending = None;
                    }
                    steps += 1;
                }
                Ok(Status::Out(c)) => {
                    output.write_all(&[c])?;
                    steps += 1;
                }
                Ok(Status::NeedsInput) => {
                    output.flush()?;
                    match input.next() {
                        Some(b) => pending = Some(b?),
                        None => {
                            return Err(self.fault(self.ip, Fault::EndOfInput))
                        }
                    }
                }
                Ok(Status::Halt(exit)) => {
                    output.flush()?;
                    return Ok(exit);
                }
                Err(e) => {
                    output.flush()?;
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R0: u16 = 32768;
    const R1: u16 = 32769;
    const R2: u16 = 32770;

    fn vm(words: &[u16]) -> Vm {
        Vm::from_memory(Memory::from_words(words).unwrap())
    }

    /// Runs a program with no input, returning the output and result
    fn run(vm: &mut Vm, input: &[u8]) -> (Vec<u8>, Result<Exit, Error>) {
        let mut out = vec![];
        let r = vm.run(input, &mut out);
        (out, r)
    }

    #[test]
    fn set_and_arithmetic() {
        let mut vm = vm(&[
            1, R0, 32767, // r0 = 32767
            9, R1, R0, 2, // r1 = r0 + 2
            10, R2, R0, R0, // r2 = r0 * r0
            0,
        ]);
        let (_, r) = run(&mut vm, &[]);
        assert_eq!(
            r.unwrap(),
            Exit {
                address: 11,
                reason: Termination::Halt
            }
        );
        assert_eq!(vm.registers()[0], 32767);
        assert_eq!(vm.registers()[1], 1);
        assert_eq!(vm.registers()[2], 1);
    }

    #[test]
    fn mod_and_bitwise() {
        let mut vm = vm(&[
            11, R0, 17, 5, // r0 = 17 % 5
            12, R1, 0b1100, 0b1010, // r1 = and
            13, R2, 0b1100, 0b1010, // r2 = or
            14, 32771, 0, // r3 = !0
            0,
        ]);
        run(&mut vm, &[]).1.unwrap();
        assert_eq!(&vm.registers()[..4], &[2, 0b1000, 0b1110, 32767]);
    }

    #[test]
    fn mod_by_zero_faults() {
        let mut vm = vm(&[21, 11, R0, 1, 0]);
        let err = run(&mut vm, &[]).1.unwrap_err();
        assert_eq!(err.fault(), Some((1, Fault::DivideByZero)));
        assert!(vm.is_halted());
    }

    #[test]
    fn comparisons_and_jumps() {
        let mut vm = vm(&[
            4, R0, 3, 3, // r0 = 3 == 3
            5, R1, 3, 4, // r1 = 3 > 4
            7, R0, 15, // jt r0 15
            0, 0, 0, 0, //
            8, R1, 20, // jf r1 20
            0, 0, //
            6, 23, // jmp 23
            0, //
            19, 'k' as u16, 0,
        ]);
        let (out, r) = run(&mut vm, &[]);
        assert_eq!(out, b"k");
        assert_eq!(r.unwrap().address, 25);
    }

    #[test]
    fn call_and_ret() {
        let mut vm = vm(&[17, 4, 19, 'a' as u16, 19, 'b' as u16, 18]);
        let (out, r) = run(&mut vm, &[]);
        // call 4 -> out 'b' -> ret to 2 -> out 'a' -> out 'b' -> ret on empty
        assert_eq!(out, b"bab");
        assert_eq!(
            r.unwrap(),
            Exit {
                address: 6,
                reason: Termination::EmptyReturn
            }
        );
    }

    #[test]
    fn rmem_wmem() {
        let mut vm = vm(&[
            1, R0, 100, // r0 = 100
            16, R0, 42, // wmem r0 42
            15, R1, 100, // rmem r1 100
            0,
        ]);
        run(&mut vm, &[]).1.unwrap();
        assert_eq!(vm.memory()[100], 42);
        assert_eq!(vm.registers()[1], 42);
        assert_eq!(vm.registers()[0], 100);
    }

    #[test]
    fn rmem_wmem_outside_memory_fault() {
        // memory[1] holds the word naming r0, which is not an address
        let mut read = vm(&[
            15, R0, 1, // rmem r0 1
            15, R1, R0, // rmem r1 r0
            0,
        ]);
        let err = run(&mut read, &[]).1.unwrap_err();
        assert_eq!(err.fault(), Some((3, Fault::OutOfBounds(32768))));
        assert_eq!(read.registers()[0], 32768);
        assert_eq!(read.registers()[1], 0);
        assert!(read.is_halted());

        let mut write = vm(&[
            15, R0, 1, // rmem r0 1
            16, R0, 5, // wmem r0 5
            0,
        ]);
        let err = run(&mut write, &[]).1.unwrap_err();
        assert_eq!(err.fault(), Some((3, Fault::OutOfBounds(32768))));
        assert_eq!(write.registers(), &[32768, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(write.memory()[5], 5);
    }

    #[test]
    fn self_modifying_code() {
        // wmem rewrites the halt at 3 into a noop, falling through to `out`
        let mut vm = vm(&[16, 3, 21, 0, 19, 'x' as u16, 0]);
        let (out, r) = run(&mut vm, &[]);
        assert_eq!(out, b"x");
        assert_eq!(r.unwrap().address, 6);
    }

    #[test]
    fn input() {
        let mut vm = vm(&[20, R0, 20, R1, 0]);
        run(&mut vm, b"hi").1.unwrap();
        assert_eq!(&vm.registers()[..2], &[b'h' as u16, b'i' as u16]);
    }

    #[test]
    fn end_of_input_faults() {
        let mut vm = vm(&[20, R0, 20, R1, 0]);
        let err = run(&mut vm, b"h").1.unwrap_err();
        assert_eq!(err.fault(), Some((2, Fault::EndOfInput)));
    }

    #[test]
    fn step_reports_needs_input() {
        let mut vm = vm(&[20, R0, 0]);
        assert_eq!(vm.step(None).unwrap(), Status::NeedsInput);
        assert_eq!(vm.ip(), 0);
        assert_eq!(vm.step(Some(7)).unwrap(), Status::Continue(true));
        assert_eq!(vm.registers()[0], 7);
        assert_eq!(vm.ip(), 2);
    }

    #[test]
    fn halted_vm_stays_halted() {
        let mut vm = vm(&[0]);
        let first = vm.step(None).unwrap();
        assert_eq!(vm.step(None).unwrap(), first);
        assert!(matches!(vm.state(), State::Halted(..)));
    }

    #[test]
    fn out_writes_low_byte() {
        let mut vm = vm(&[1, R0, 0x1ff, 19, R0, 0]);
        assert_eq!(run(&mut vm, &[]).0, vec![0xff]);
    }

    #[test]
    fn opcode_from_register() {
        // r0 holds 19, so the word at address 3 decodes as `out`
        let mut vm = vm(&[1, R0, 19, R0, 'z' as u16, 0]);
        assert_eq!(run(&mut vm, &[]).0, b"z");
    }

    #[test]
    fn literal_destination_overwrites_operand() {
        let mut vm = vm(&[1, 5, 77, 0]);
        run(&mut vm, &[]).1.unwrap();
        assert_eq!(vm.memory()[1], 77);
        assert_eq!(vm.registers(), &[0; 8]);
    }

    #[test]
    fn unknown_opcode() {
        let mut vm = vm(&[21, 30]);
        let err = run(&mut vm, &[]).1.unwrap_err();
        assert_eq!(err.fault(), Some((1, Fault::UnknownOpcode(30))));
        assert!(err.to_string().contains("unknown opcode"));
    }

    #[test]
    fn step_limit() {
        let mut vm = vm(&[6, 0]);
        let r = vm.run_with_limit(&b""[..], std::io::sink(), Some(10));
        assert!(matches!(r, Err(Error::StepLimit(10))));
    }
}
