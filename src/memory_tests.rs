use super::*;
use test_log::test;

#[test]
fn test_cells_are_little_endian() {
    let mut space = AddressSpace::anonymous(0x20).unwrap();
    space.write_cell(0x10, 0x1234).unwrap();
    assert_eq!(space.read_byte(0x10).unwrap(), 0x34);
    assert_eq!(space.read_byte(0x11).unwrap(), 0x12);
    assert_eq!(space.read_cell(0x10).unwrap(), 0x1234);
}

#[test]
fn test_last_byte_is_addressable() {
    let mut space = AddressSpace::anonymous(0x20).unwrap();
    space.write_byte(0x1f, 0xab).unwrap();
    assert_eq!(space.read_byte(0x1f).unwrap(), 0xab);
    space.write_cell(0x1e, 0xbeef).unwrap();
    assert_eq!(space.read_cell(0x1e).unwrap(), 0xbeef);
}

#[test]
fn test_out_of_bounds_is_rejected_without_mutation() {
    let mut space = AddressSpace::anonymous(0x20).unwrap();
    space.write_byte(0x1f, 0x55).unwrap();

    assert_eq!(
        space.read_byte(0x20),
        Err(VmError::OutOfBounds {
            addr: 0x20,
            width: 1,
            size: 0x20
        })
    );
    // A cell straddling the end must not touch the in-bounds half
    assert!(space.write_cell(0x1f, 0xffff).is_err());
    assert_eq!(space.read_byte(0x1f).unwrap(), 0x55);
    assert!(space.read_cell(0x1f).is_err());
    assert!(space.check(usize::MAX, 2).is_err());
}

#[test]
fn test_size_limits() {
    assert!(AddressSpace::anonymous(NVRAM_HEADER).is_err());
    assert!(AddressSpace::anonymous(MAX_MEMORY_SIZE + 1).is_err());
    assert!(AddressSpace::anonymous(MAX_MEMORY_SIZE).is_ok());
}

#[test]
fn test_checkpoint_writes_cursors_to_header() {
    let mut space = AddressSpace::anonymous(0x40).unwrap();
    space.cursors = Header {
        ip: 0x0010,
        cp: 0x0020,
        hp: 0x0008,
    };
    space.checkpoint().unwrap();

    assert_eq!(space.read_cell(0).unwrap(), 0x0010);
    assert_eq!(space.read_cell(2).unwrap(), 0x0020);
    assert_eq!(space.read_cell(4).unwrap(), 0x0008);
    assert_eq!(Header::load(&space).unwrap(), space.cursors);
}

#[test]
fn test_header_load_rejects_cursor_past_memory() {
    let mut space = AddressSpace::anonymous(0x20).unwrap();
    Header {
        ip: 0x0040,
        cp: 0x0010,
        hp: 0,
    }
    .store(&mut space)
    .unwrap();

    match Header::load(&space) {
        Err(VmError::HeaderOutOfRange { field, value, .. }) => {
            assert_eq!(field, "Ip");
            assert_eq!(value, 0x0040);
        }
        other => panic!("expected HeaderOutOfRange, got {:?}", other),
    }
}

#[test]
fn test_header_load_accepts_empty_dictionary() {
    let mut space = AddressSpace::anonymous(0x20).unwrap();
    Header::fresh().store(&mut space).unwrap();
    assert_eq!(Header::load(&space).unwrap(), Header::fresh());
}
