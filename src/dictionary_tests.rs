use super::*;
use crate::assembler::{AsmEvent, Assembler};
use crate::header::NVRAM_HEADER;
use crate::opcodes::Opcode;

fn assemble(events: Vec<AsmEvent>) -> AddressSpace {
    let mut space = AddressSpace::anonymous(0x200).unwrap();
    Assembler::new(&mut space).assemble(events).unwrap();
    space
}

#[test]
fn test_empty_dictionary() {
    let space = assemble(vec![AsmEvent::EmitOpcode(Opcode::Nop)]);
    assert_eq!(space.cursors.hp, 0);
    assert!(Dictionary::walk(&space, 0).unwrap().words.is_empty());
}

#[test]
fn test_walk_yields_newest_first() {
    let names = ["w1", "w2", "third", "w4"];
    let mut events = Vec::new();
    for n in names.iter() {
        events.push(AsmEvent::DefineWord(n.to_string()));
        events.push(AsmEvent::EmitOpcode(Opcode::Ret));
    }
    let space = assemble(events);

    let dict = Dictionary::walk(&space, space.cursors.hp).unwrap();
    assert_eq!(dict.names(), vec!["w4", "third", "w2", "w1"]);
    assert_eq!(dict.words.last().unwrap().link, 0);
    assert_eq!(dict.words.last().unwrap().addr as usize, NVRAM_HEADER);
    for pair in dict.words.windows(2) {
        assert_eq!(pair[0].link, pair[1].addr);
    }
}

#[test]
fn test_cfa_points_at_body() {
    let space = assemble(vec![
        AsmEvent::DefineWord("body".to_string()),
        AsmEvent::EmitOpcode(Opcode::Ret),
    ]);
    let dict = Dictionary::walk(&space, space.cursors.hp).unwrap();
    let word = dict.find("body").unwrap();

    assert_eq!(word.cfa as usize, NVRAM_HEADER + 2 + 1 + 1 + 4);
    assert_eq!(
        space.read_byte(word.cfa as usize).unwrap(),
        Opcode::Ret.code()
    );
    assert!(!word.is_immediate());
}

#[test]
fn test_find_returns_latest_redefinition() {
    let space = assemble(vec![
        AsmEvent::DefineWord("dup".to_string()),
        AsmEvent::EmitOpcode(Opcode::Ret),
        AsmEvent::DefineWord("dup".to_string()),
        AsmEvent::EmitOpcode(Opcode::Nop),
        AsmEvent::EmitOpcode(Opcode::Ret),
    ]);
    let dict = Dictionary::walk(&space, space.cursors.hp).unwrap();
    assert_eq!(dict.words.len(), 2);
    assert_eq!(dict.find("dup").unwrap().addr, space.cursors.hp);
}

#[test]
fn test_self_linked_header_is_corrupt() {
    let mut space = AddressSpace::anonymous(0x40).unwrap();
    let at = NVRAM_HEADER;
    space.write_cell(at, at as Cell).unwrap();
    space.write_byte(at + 2, 0).unwrap();
    space.write_byte(at + 3, 1).unwrap();
    space.write_byte(at + 4, b'x').unwrap();

    assert_eq!(
        Dictionary::walk(&space, at as Cell).unwrap_err(),
        VmError::CorruptDictionary { addr: at as Cell }
    );
}
