use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::globals::Global;
use crate::parse_tree::operations::{Instruction, Opcode};
use crate::parse_tree::Module;
use crate::parser::language_types::parse_global_type;
use crate::parser::operations::parse_expression;
use crate::parser::utils::read_varuint32;

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        let constraints = parse_global_type(reader)?;
        // a global may only read globals numbered before itself
        let own_index = module.imported_globals + module.globals.len();
        let init = parse_initializer(reader, own_index)?;
        module.globals.push(Global { constraints, init });
    }
    debug!("Parsed {} globals", count);
    Ok(())
}

/// Reads an initializer expression, which must be a single constant or a
/// `get_global` of one of the first `visible_globals` globals.
pub fn parse_initializer(reader: &mut dyn Read, visible_globals: usize) -> Result<Instruction, TranslateError> {
    let mut code = parse_expression(reader)?;
    if code.len() != 1 {
        return Err(TranslateError::invariant(format!(
            "initializer has {} instructions instead of one",
            code.len()
        )));
    }
    let instruction = code.remove(0);
    match instruction.op {
        Opcode::I32Const | Opcode::I64Const | Opcode::F32Const | Opcode::F64Const => Ok(instruction),
        Opcode::GetGlobal => match instruction.index() {
            Some(index) if (index as usize) < visible_globals => Ok(instruction),
            _ => Err(TranslateError::invariant(format!(
                "initializer `{}` reads a global that is not yet defined",
                instruction
            ))),
        },
        _ => Err(TranslateError::invariant(format!("initializer `{}` is not constant", instruction))),
    }
}
