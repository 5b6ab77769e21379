//! A flat-array [`MemoryInterface`] over a fixed-size byte buffer, with no
//! fault injection and fixed 1-cycle timing: tests only need a predictable
//! bus, not the fancier device-mapped bus a real host embeds.

use armcore::memory::{AccessKind, AccessSize, Bus, MemoryInterface};

/// A flat byte buffer standing in for a host's guest address space.
pub struct MockMemory {
    bytes: Vec<u8>,
}

impl MockMemory {
    /// Builds a zero-filled buffer of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self { bytes: vec![0; size] }
    }

    /// Writes `word` little-endian at `addr`, for precondition staging.
    pub fn poke_word(&mut self, addr: u32, word: u32) {
        self.write_word(addr, word);
    }

    /// Writes `half` little-endian at `addr`, for precondition staging.
    pub fn poke_half(&mut self, addr: u32, half: u16) {
        self.write_half(addr, half);
    }
}

impl MemoryInterface for MockMemory {
    fn read_byte(&mut self, addr: u32) -> u8 {
        self.peek_byte(addr)
    }
    fn read_half(&mut self, addr: u32) -> u16 {
        self.peek_half(addr)
    }
    fn read_word(&mut self, addr: u32) -> u32 {
        self.peek_word(addr)
    }
    fn write_byte(&mut self, addr: u32, value: u8) {
        self.bytes[addr as usize] = value;
    }
    fn write_half(&mut self, addr: u32, value: u16) {
        self.bytes[addr as usize..addr as usize + 2].copy_from_slice(&value.to_le_bytes());
    }
    fn write_word(&mut self, addr: u32, value: u32) {
        self.bytes[addr as usize..addr as usize + 4].copy_from_slice(&value.to_le_bytes());
    }
    fn peek_byte(&self, addr: u32) -> u8 {
        self.bytes[addr as usize]
    }
    fn peek_half(&self, addr: u32) -> u16 {
        u16::from_le_bytes(self.bytes[addr as usize..addr as usize + 2].try_into().unwrap())
    }
    fn peek_word(&self, addr: u32) -> u32 {
        u32::from_le_bytes(self.bytes[addr as usize..addr as usize + 4].try_into().unwrap())
    }
    fn access_cycles(&self, _addr: u32, _bus: Bus, _kind: AccessKind, _size: AccessSize) -> u64 {
        1
    }
}
