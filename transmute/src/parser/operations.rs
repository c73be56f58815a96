use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use leb::ReadLEB;

use crate::error::TranslateError;
use crate::parse_tree::operations::{BranchTable, Immediate, Instruction, MemoryImmediate, Opcode};
use crate::parser::language_types::parse_block_type;
use crate::parser::utils::{read_varuint1, read_varuint32};

/// Reads one instruction and its immediate.
pub fn parse_instruction(reader: &mut dyn Read) -> Result<Instruction, TranslateError> {
    let byte = reader.read_u8()?;
    let op = Opcode::from_byte(byte).ok_or_else(|| TranslateError::unsupported_opcode(byte, "unknown opcode"))?;
    let immediate = match op {
        Opcode::Block | Opcode::Loop | Opcode::If => Immediate::Block(parse_block_type(reader)?),
        Opcode::Br | Opcode::BrIf => Immediate::Depth(read_varuint32(reader)?),
        Opcode::BrTable => {
            let count = read_varuint32(reader)?;
            let mut targets = vec![];
            for _ in 0..count {
                targets.push(read_varuint32(reader)?);
            }
            let default = read_varuint32(reader)?;
            Immediate::BranchTable(BranchTable { targets, default })
        }
        Opcode::Call
        | Opcode::GetLocal
        | Opcode::SetLocal
        | Opcode::TeeLocal
        | Opcode::GetGlobal
        | Opcode::SetGlobal => Immediate::Index(read_varuint32(reader)?),
        Opcode::CallIndirect => {
            let type_index = read_varuint32(reader)?;
            let reserved = read_varuint1(reader)?;
            Immediate::CallIndirect { type_index, reserved }
        }
        Opcode::CurrentMemory | Opcode::GrowMemory => {
            read_varuint1(reader)?;
            Immediate::None
        }
        Opcode::I32Const => Immediate::I32(reader.bytes().read_varint(32)? as i32),
        Opcode::I64Const => Immediate::I64(reader.bytes().read_varint(64)?),
        Opcode::F32Const => Immediate::F32(reader.read_u32::<LittleEndian>()?),
        Opcode::F64Const => Immediate::F64(reader.read_u64::<LittleEndian>()?),
        op if op.is_load() || op.is_store() => {
            let flags = read_varuint32(reader)?;
            let offset = read_varuint32(reader)?;
            Immediate::Memory(MemoryImmediate { flags, offset })
        }
        _ => Immediate::None,
    };
    Ok(Instruction::new(op, immediate))
}

/// Reads instructions until the `end` that balances the expression. Nesting
/// is tracked so inner `end`s are kept; the closing one is consumed and
/// dropped.
pub fn parse_expression(reader: &mut dyn Read) -> Result<Vec<Instruction>, TranslateError> {
    let mut code = vec![];
    let mut depth = 0usize;
    loop {
        let instruction = parse_instruction(reader)?;
        if instruction.op.opens_scope() {
            depth += 1;
        } else if instruction.op == Opcode::End {
            if depth == 0 {
                return Ok(code);
            }
            depth -= 1;
        }
        trace!("{}", instruction);
        code.push(instruction);
    }
}
