use armcore::memory::{AccessKind, AccessSize, Bus as MemBus, MemoryInterface};
use mockall::mock;

mock! {
    pub Bus {}
    impl MemoryInterface for Bus {
        fn read_byte(&mut self, addr: u32) -> u8;
        fn read_half(&mut self, addr: u32) -> u16;
        fn read_word(&mut self, addr: u32) -> u32;
        fn write_byte(&mut self, addr: u32, value: u8);
        fn write_half(&mut self, addr: u32, value: u16);
        fn write_word(&mut self, addr: u32, value: u32);
        fn peek_byte(&self, addr: u32) -> u8;
        fn peek_half(&self, addr: u32) -> u16;
        fn peek_word(&self, addr: u32) -> u32;
        fn access_cycles(&self, addr: u32, bus: MemBus, kind: AccessKind, size: AccessSize) -> u64;
    }
}
