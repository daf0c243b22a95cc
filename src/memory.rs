use crate::{
    error::{Error, Fault},
    word::MEMORY_SIZE,
};
use log::info;

/// The machine's 32768-word address space
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct Memory(Vec<u16>);

impl Default for Memory {
    fn default() -> Self {
        Memory(vec![0; MEMORY_SIZE])
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let used = self.0.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1);
        write!(f, "Memory({used} words in use)")
    }
}

/// Indexing panics past the end of memory, so it is reserved for addresses
/// already known to be in range, such as the operand slot a literal
/// destination names.  Addresses computed by a running program go through
/// [`Memory::read`] and [`Memory::write`] instead, since a register can hold
/// any 16-bit word.
impl std::ops::Index<u16> for Memory {
    type Output = u16;
    fn index(&self, i: u16) -> &Self::Output {
        &self.0[i as usize]
    }
}

impl std::ops::IndexMut<u16> for Memory {
    fn index_mut(&mut self, i: u16) -> &mut Self::Output {
        &mut self.0[i as usize]
    }
}

impl Memory {
    /// Loads a little-endian program image, zero-filling the rest of memory
    pub fn from_image(bin: &[u8]) -> Result<Self, Error> {
        if bin.len() % 2 != 0 {
            return Err(Error::OddImage(bin.len()));
        }
        let words = bin.len() / 2;
        if words > MEMORY_SIZE {
            return Err(Error::ImageTooLarge(words));
        }
        let mut out = Self::default();
        for (slot, b) in out.0.iter_mut().zip(bin.chunks_exact(2)) {
            *slot = u16::from_le_bytes([b[0], b[1]]);
        }
        info!("loaded {words} words");
        Ok(out)
    }

    /// Builds memory from a slice of words, mostly useful for tests
    pub fn from_words(words: &[u16]) -> Result<Self, Error> {
        if words.len() > MEMORY_SIZE {
            return Err(Error::ImageTooLarge(words.len()));
        }
        let mut out = Self::default();
        out.0[..words.len()].copy_from_slice(words);
        Ok(out)
    }

    /// Reads the raw word at the given address
    ///
    /// Addresses are taken as `u32` so that operand fetches which run off the
    /// end of memory are reported rather than wrapped.
    pub fn read(&self, addr: u32) -> Result<u16, Fault> {
        self.0
            .get(addr as usize)
            .copied()
            .ok_or(Fault::OutOfBounds(addr))
    }

    /// Writes a word, failing if the address is outside memory
    pub fn write(&mut self, addr: u16, value: u16) -> Result<(), Fault> {
        let slot = self
            .0
            .get_mut(addr as usize)
            .ok_or(Fault::OutOfBounds(addr as u32))?;
        *slot = value;
        Ok(())
    }

    pub fn words(&self) -> &[u16] {
        &self.0
    }

    /// Writes every word as an `Address 0x....: 0x....` line
    pub fn dump<W: std::io::Write>(&self, mut out: W) -> std::io::Result<()> {
        for (i, w) in self.0.iter().enumerate() {
            writeln!(out, "Address 0x{i:04x}: 0x{w:04x}")?;
        }
        out.flush()
    }
}
