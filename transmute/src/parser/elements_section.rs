use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::elements::Element;
use crate::parse_tree::Module;
use crate::parser::globals_section::parse_initializer;
use crate::parser::utils::read_varuint32;

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        let table = read_varuint32(reader)?;
        let visible_globals = module.imported_globals + module.globals.len();
        let offset = parse_initializer(reader, visible_globals)?;
        let length = read_varuint32(reader)?;
        let mut functions = vec![];
        for _ in 0..length {
            let index = read_varuint32(reader)?;
            if module.function(index).is_none() {
                return Err(TranslateError::invariant(format!("element segment names missing function {}", index)));
            }
            functions.push(index);
        }
        module.elements.push(Element { table, offset, functions });
    }
    debug!("Parsed {} element segments", count);
    Ok(())
}
