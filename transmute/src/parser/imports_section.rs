use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::imports::{Import, ImportKind};
use crate::parse_tree::Module;
use crate::parser::language_types::{parse_global_type, parse_limits, parse_table_type};
use crate::parser::utils::{read_string, read_varuint32, read_varuint7};

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        let module_name = read_string(reader)?;
        let field = read_string(reader)?;
        let kind = match read_varuint7(reader)? {
            0 => {
                let type_index = read_varuint32(reader)?;
                if type_index as usize >= module.types.len() {
                    return Err(TranslateError::invariant(format!(
                        "import {}.{} uses missing type {}",
                        module_name, field, type_index
                    )));
                }
                ImportKind::Function(type_index)
            }
            1 => ImportKind::Table(parse_table_type(reader)?),
            2 => ImportKind::Memory(parse_limits(reader)?),
            3 => ImportKind::Global(parse_global_type(reader)?),
            kind => return Err(TranslateError::unsupported(format!("import kind {}", kind))),
        };
        trace!("import {}.{}: {:?}", module_name, field, kind);
        module.imports.push(Import {
            module: module_name,
            field,
            kind,
        });
    }
    module.count_imports();
    debug!(
        "Parsed {} imports ({} functions, {} globals, {} tables)",
        count, module.imported_functions, module.imported_globals, module.imported_tables
    );
    Ok(())
}
