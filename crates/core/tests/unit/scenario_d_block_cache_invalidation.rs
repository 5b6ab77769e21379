//! Block-cache invalidation: a stale decode must never survive an explicit
//! `invalidate_address`, matching the "decoded opcode tracks `peek`" universal
//! property.

use armcore::config::CpuVariant;
use armcore::memory::MemoryInterface;
use armcore::BlockCache;

use crate::common::MockMemory;

#[test]
fn invalidate_address_forces_a_redecode_of_the_patched_opcode() {
    let mut mem = MockMemory::new(0x1_0000);
    mem.write_word(0x100, 0xE320_F000); // nop
    let mut cache = BlockCache::new();

    let first = cache.get_or_decode_arm(0x100, &mem, CpuVariant::Armv4T);
    assert_eq!(first[0].opcode, 0xE320_F000);

    mem.write_word(0x100, 0xE320_F001); // patched in place
    cache.invalidate_address(0x100);

    let second = cache.get_or_decode_arm(0x100, &mem, CpuVariant::Armv4T);
    assert_eq!(second[0].opcode, mem.peek_word(0x100));
    assert_eq!(second[0].opcode, 0xE320_F001);
}

#[test]
fn arm_and_thumb_decodes_of_the_same_address_do_not_collide() {
    let mem = MockMemory::new(0x1_0000);
    let mut cache = BlockCache::new();

    let arm_len = cache.get_or_decode_arm(0x200, &mem, CpuVariant::Armv4T).len();
    let thumb_len = cache.get_or_decode_thumb(0x200, &mem).len();

    assert_eq!(arm_len, 64); // 256 bytes / 4
    assert_eq!(thumb_len, 128); // 256 bytes / 2

    // Re-fetching either after the other was cached must not panic or
    // return the wrong kind's block.
    assert_eq!(cache.get_or_decode_arm(0x200, &mem, CpuVariant::Armv4T).len(), arm_len);
    assert_eq!(cache.get_or_decode_thumb(0x200, &mem).len(), thumb_len);
}
