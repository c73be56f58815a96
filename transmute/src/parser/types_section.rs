use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::language_types::LanguageType;
use crate::parse_tree::Module;
use crate::parser::language_types::parse_language_type;
use crate::parser::utils::read_varuint32;

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        match parse_language_type(reader)? {
            LanguageType::Func(func_type) => module.types.push(func_type),
            // the type section only holds function signatures
            other => return Err(TranslateError::unsupported(format!("{:?} in the type section", other))),
        }
    }
    debug!("Parsed {} types", count);
    Ok(())
}
