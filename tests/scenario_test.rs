//! Scenario tests over a tiny 0x20-byte image.
//!
//! Layout produced by `: init jmp loop : loop nop jmp loop`:
//!
//! ```text
//! 0006  init header (LFA 0000, AFA, NFA "init")
//! 000e  jmp 0019        <- entry point
//! 0011  loop header (LFA 0006, AFA, NFA "loop")
//! 0019  nop
//! 001a  jmp 0019
//! 001d  bye
//! ```

use pvm::assembler::{AsmEvent, Assembler};
use pvm::dictionary::Dictionary;
use pvm::image::Image;
use pvm::interpreter::{ExecutionResult, Interpreter, Outcome};
use pvm::memory::AddressSpace;
use pvm::opcodes::Opcode;
use pvm::vm::VM;
use pvm::VmError;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use test_log::test;

const MSZ: usize = 0x20;

fn loop_program() -> Vec<AsmEvent> {
    vec![
        AsmEvent::DefineWord("init".to_string()),
        AsmEvent::EmitOpcode(Opcode::Jmp),
        AsmEvent::ReferenceLabel("loop".to_string()),
        AsmEvent::DefineWord("loop".to_string()),
        AsmEvent::EmitOpcode(Opcode::Nop),
        AsmEvent::EmitOpcode(Opcode::Jmp),
        AsmEvent::ReferenceLabel("loop".to_string()),
    ]
}

#[test]
fn test_loop_scenario_assembles() {
    let mut space = AddressSpace::anonymous(MSZ).unwrap();
    let symbols = Assembler::new(&mut space).assemble(loop_program()).unwrap();

    assert_eq!(space.cursors.ip, 0x0e);
    assert_eq!(space.cursors.cp, 0x1e);
    assert_eq!(space.cursors.hp, 0x11);
    assert_eq!(symbols.address_of("loop"), Some(0x19));
    // Forward reference patched to loop's body
    assert_eq!(space.read_cell(0x0f).unwrap(), 0x19);
    assert_eq!(space.read_cell(0x1b).unwrap(), 0x19);

    let dict = Dictionary::walk(&space, space.cursors.hp).unwrap();
    assert_eq!(dict.names(), vec!["loop", "init"]);
}

#[test]
fn test_loop_scenario_runs_until_bye_injected() {
    let mut space = AddressSpace::anonymous(MSZ).unwrap();
    Assembler::new(&mut space).assemble(loop_program()).unwrap();
    let mut interp = Interpreter::new(VM::new(space));

    assert_eq!(interp.step().unwrap().result, ExecutionResult::Jumped);
    assert_eq!(interp.vm.ip(), 0x19);

    for _ in 0..50 {
        let nop = interp.step().unwrap();
        assert_eq!((nop.at, nop.opcode), (0x19, Opcode::Nop));
        let jmp = interp.step().unwrap();
        assert_eq!((jmp.at, jmp.opcode), (0x1a, Opcode::Jmp));
        assert_eq!(interp.vm.ip(), 0x19);
    }
    assert_eq!(
        interp.run_with_limit(Some(1000)).unwrap(),
        Outcome::LimitReached
    );

    // Inject BYE over loop's NOP
    let ip = interp.vm.ip() as usize;
    interp.vm.space.write_byte(ip, Opcode::Bye.code()).unwrap();
    assert_eq!(interp.run().map(|_| interp.vm.ip()), Ok(0x19));
}

#[test]
fn test_reopen_with_ip_past_memory_fails_at_open() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("tiny.img");

    let mut image = Image::open(&path, MSZ).unwrap();
    Assembler::new(image.space_mut())
        .assemble(loop_program())
        .unwrap();
    image.checkpoint().unwrap();
    drop(image);

    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&0x0040u16.to_le_bytes()).unwrap();
    drop(file);

    assert_eq!(
        Image::open(&path, MSZ).err(),
        Some(VmError::HeaderOutOfRange {
            field: "Ip",
            value: 0x40,
            size: MSZ
        })
    );
}

#[test]
fn test_resumed_scenario_starts_at_entry_point() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("resume.img");

    let mut image = Image::open(&path, MSZ).unwrap();
    Assembler::new(image.space_mut())
        .assemble(loop_program())
        .unwrap();
    image.checkpoint().unwrap();
    drop(image);

    let image = Image::open(&path, MSZ).unwrap();
    assert!(image.existed());
    let mut interp = Interpreter::new(VM::new(image.into_space()));
    assert_eq!(interp.vm.ip(), 0x0e);
    interp.step().unwrap();
    assert_eq!(interp.vm.ip(), 0x19);
}
