use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use leb::ReadLEB;

use crate::error::TranslateError;
use crate::parse_tree::Module;

mod code_section;
mod elements_section;
mod exports_section;
mod functions_section;
mod globals_section;
mod imports_section;
pub mod language_types;
mod memory_section;
pub mod operations;
mod types_section;
mod utils;

const MAGIC_NUMBER: u32 = 0x6d73_6100;
const VERSION: u32 = 1;

const CUSTOM_SECTION: u8 = 0;
pub(crate) const CODE_SECTION: u8 = 10;

fn header_error(err: io::Error) -> TranslateError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        TranslateError::BadHeader("input ends inside the header")
    } else {
        TranslateError::Io(err)
    }
}

/// Decodes a whole binary module.
pub fn parse_module<R: Read>(mut reader: R) -> Result<Module, TranslateError> {
    let magic_number = reader.read_u32::<LittleEndian>().map_err(header_error)?;
    if magic_number != MAGIC_NUMBER {
        return Err(TranslateError::BadHeader("wrong magic number"));
    }
    let version = reader.read_u32::<LittleEndian>().map_err(header_error)?;
    if version != VERSION {
        return Err(TranslateError::BadHeader("unsupported module version"));
    }
    info!("Parsing module version {}", version);
    let mut module = Module::new(version);
    while let Some(id) = read_section_id(&mut reader)? {
        let length = reader.by_ref().bytes().read_varuint(32).map_err(|e| {
            let err = TranslateError::from(e);
            if err.is_eof() {
                section_ends_early(id)
            } else {
                err
            }
        })?;
        let mut section = (&mut reader).take(length);
        parse_section(id, &mut section, &mut module).map_err(|e| if e.is_eof() { section_ends_early(id) } else { e })?;
        if section.limit() != 0 {
            return Err(TranslateError::CorruptSection {
                id,
                reason: format!("{} of {} bytes left unread", section.limit(), length),
            });
        }
    }
    if module.functions.len() != module.function_signatures.len() {
        return Err(TranslateError::invariant(format!(
            "{} function signatures without bodies",
            module.function_signatures.len() - module.functions.len()
        )));
    }
    info!(
        "Parsed module: {} types, {} imports, {} functions, {} globals, {} exports",
        module.types.len(),
        module.imports.len(),
        module.functions.len(),
        module.globals.len(),
        module.exports.len()
    );
    Ok(module)
}

fn section_ends_early(id: u8) -> TranslateError {
    TranslateError::CorruptSection {
        id,
        reason: "payload ends before its contents do".to_string(),
    }
}

/// The next section id, or `None` at a clean end of input.
fn read_section_id<R: Read>(reader: &mut R) -> Result<Option<u8>, TranslateError> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if byte[0] & 0x80 != 0 {
        return Err(TranslateError::MalformedEncoding(format!("section id {:#04x}", byte[0])));
    }
    Ok(Some(byte[0]))
}

fn parse_section(id: u8, reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    debug!("Parsing section {}", id);
    match id {
        CUSTOM_SECTION => {
            let name = utils::read_string(reader)?;
            let skipped = utils::skip(reader)?;
            debug!("Skipped custom section {:?} ({} bytes)", name, skipped);
            module.custom_sections.push(name);
            Ok(())
        }
        1 => types_section::parse(reader, module),
        2 => imports_section::parse(reader, module),
        3 => functions_section::parse(reader, module),
        5 => memory_section::parse(reader, module),
        6 => globals_section::parse(reader, module),
        7 => exports_section::parse(reader, module),
        9 => elements_section::parse(reader, module),
        CODE_SECTION => code_section::parse(reader, module),
        _ => {
            let skipped = utils::skip(reader)?;
            debug!("Skipped section {} ({} bytes)", id, skipped);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::language_types::{ExternalKind, ValueType};
    use crate::parse_tree::operations::Opcode;
    use crate::testing::{Code, ModuleBuilder};
    use std::io::Cursor;

    fn parse(bytes: Vec<u8>) -> Result<Module, TranslateError> {
        parse_module(Cursor::new(bytes))
    }

    #[test]
    fn empty_module() {
        let module = parse(ModuleBuilder::new().build()).unwrap();
        assert_eq!(module.version, 1);
        assert!(module.functions.is_empty());
    }

    #[test]
    fn wrong_magic_number() {
        match parse(vec![0x00, 0x61, 0x73, 0x6e, 0x01, 0x00, 0x00, 0x00]) {
            Err(TranslateError::BadHeader(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn wrong_version_is_rejected_before_sections() {
        // the garbage section would be a MalformedEncoding if it were read
        match parse(vec![0x00, 0x61, 0x73, 0x6d, 0x02, 0x00, 0x00, 0x00, 0xff]) {
            Err(TranslateError::BadHeader(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn truncated_header() {
        match parse(vec![0x00, 0x61, 0x73]) {
            Err(TranslateError::BadHeader(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn section_longer_than_its_contents() {
        // a type section declaring 3 payload bytes that only uses 1
        let bytes = ModuleBuilder::new().section(1, vec![0, 0, 0]).build();
        match parse(bytes) {
            Err(TranslateError::CorruptSection { id: 1, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn section_shorter_than_its_contents() {
        // one function type squeezed into two bytes
        let bytes = ModuleBuilder::new().section(1, vec![1, 0x60]).build();
        match parse(bytes) {
            Err(TranslateError::CorruptSection { id: 1, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn input_ends_inside_a_section() {
        let mut bytes = ModuleBuilder::new().section(1, vec![1, 0x60, 0, 0]).build();
        bytes.truncate(bytes.len() - 2);
        match parse(bytes) {
            Err(TranslateError::CorruptSection { id: 1, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn custom_and_unknown_sections_are_skipped() {
        let mut custom = vec![4];
        custom.extend_from_slice(b"name");
        custom.extend_from_slice(&[1, 2, 3]);
        let bytes = ModuleBuilder::new()
            .section(0, custom)
            .section(11, vec![0])
            .func_type(&[], Some(ValueType::I32))
            .memory(1, None)
            .build();
        let module = parse(bytes).unwrap();
        assert_eq!(module.custom_sections, vec!["name".to_string()]);
        assert_eq!(module.types.len(), 1);
        assert_eq!(module.memories.len(), 1);
    }

    #[test]
    fn decodes_a_complete_module() {
        let bytes = ModuleBuilder::new()
            .func_type(&[ValueType::I32], Some(ValueType::I32))
            .func_type(&[], None)
            .import_function("env", "log", 1)
            .import_global("env", "base", ValueType::I32)
            .function(0, &[], Code::new().get_local(0).get_local(0).op(Opcode::I32Add))
            .global(ValueType::I32, true, Code::new().get_global(0))
            .export("twice", ExternalKind::Function, 1)
            .build();
        let module = parse(bytes).unwrap();
        assert_eq!(module.imported_functions, 1);
        assert_eq!(module.imported_globals, 1);
        assert_eq!(module.function_type(1).unwrap().params, vec![ValueType::I32]);
        assert_eq!(module.globals[0].init.index(), Some(0));
        assert_eq!(module.export_name(ExternalKind::Function, 1), Some("twice"));
        assert_eq!(module.functions[0].body.code.len(), 3);
    }

    #[test]
    fn signatures_need_bodies() {
        let bytes = ModuleBuilder::new().func_type(&[], None).section(3, vec![1, 0]).build();
        match parse(bytes) {
            Err(TranslateError::InvariantViolation(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn export_of_missing_function() {
        let bytes = ModuleBuilder::new().export("main", ExternalKind::Function, 0).build();
        match parse(bytes) {
            Err(TranslateError::InvariantViolation(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
