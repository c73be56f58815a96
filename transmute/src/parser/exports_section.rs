use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::exports::Export;
use crate::parse_tree::language_types::ExternalKind;
use crate::parse_tree::Module;
use crate::parser::utils::{read_string, read_varuint32, read_varuint7};

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        let field = read_string(reader)?;
        let byte = read_varuint7(reader)?;
        let kind = ExternalKind::from_byte(byte)
            .ok_or_else(|| TranslateError::unsupported(format!("export kind {}", byte)))?;
        let index = read_varuint32(reader)?;
        let exists = match kind {
            ExternalKind::Function => module.function(index).is_some(),
            ExternalKind::Global => module.global(index).is_some(),
            // tables and memories are only known through imports
            ExternalKind::Table | ExternalKind::Memory => true,
        };
        if !exists {
            return Err(TranslateError::invariant(format!("export {} names missing {:?} {}", field, kind, index)));
        }
        module.exports.push(Export { field, kind, index });
    }
    debug!("Parsed {} exports", count);
    Ok(())
}
