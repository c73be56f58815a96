use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::Module;
use crate::parser::utils::read_varuint32;

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        let type_index = read_varuint32(reader)?;
        if type_index as usize >= module.types.len() {
            return Err(TranslateError::invariant(format!("function signature uses missing type {}", type_index)));
        }
        module.function_signatures.push(type_index);
    }
    debug!("Parsed {} function signatures", count);
    Ok(())
}
