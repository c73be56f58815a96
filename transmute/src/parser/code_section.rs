use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::functions::{FuncBody, Function};
use crate::parse_tree::Module;
use crate::parser::language_types::parse_value_type;
use crate::parser::operations::parse_expression;
use crate::parser::utils::read_varuint32;
use crate::parser::CODE_SECTION;

const MAX_LOCALS: u64 = 50_000;

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)? as usize;
    if count != module.function_signatures.len() {
        return Err(TranslateError::invariant(format!(
            "{} function bodies for {} signatures",
            count,
            module.function_signatures.len()
        )));
    }
    for local_index in 0..count {
        let index = (module.imported_functions + local_index) as u32;
        let body_size = u64::from(read_varuint32(reader)?);
        let mut body_reader = reader.take(body_size);
        let body = parse_body(&mut body_reader).map_err(|e| e.in_function(index))?;
        if body_reader.limit() != 0 {
            return Err(TranslateError::CorruptSection {
                id: CODE_SECTION,
                reason: format!("body of function {} has {} unread bytes", index, body_reader.limit()),
            });
        }
        debug!(
            "Parsed function {}: {} locals, {} instructions",
            index,
            body.locals.len(),
            body.code.len()
        );
        module.functions.push(Function {
            type_index: module.function_signatures[local_index],
            body,
        });
    }
    Ok(())
}

fn parse_body(reader: &mut dyn Read) -> Result<FuncBody, TranslateError> {
    let mut body = FuncBody::new();
    let local_count = read_varuint32(reader)?;
    let mut total = 0u64;
    for _ in 0..local_count {
        let quantity = read_varuint32(reader)?;
        total += u64::from(quantity);
        if total > MAX_LOCALS {
            return Err(TranslateError::invariant(format!("more than {} locals", MAX_LOCALS)));
        }
        let local_type = parse_value_type(reader)?;
        body.locals.extend(std::iter::repeat(local_type).take(quantity as usize));
    }
    body.code = parse_expression(reader)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::language_types::{FuncType, ValueType};
    use std::io::Cursor;

    fn module_with_one_signature() -> Module {
        let mut module = Module::new(1);
        module.types.push(FuncType::default());
        module.function_signatures.push(0);
        module
    }

    #[test]
    fn expands_run_length_locals() {
        let mut module = module_with_one_signature();
        let bytes = vec![
            1, // count
            7, // body size
            2, 2, 0x7f, 1, 0x7c, // locals: 2 x i32, 1 x f64
            0x01, 0x0b, // nop end
        ];
        parse(&mut Cursor::new(bytes), &mut module).unwrap();
        let body = &module.functions[0].body;
        assert_eq!(body.locals, vec![ValueType::I32, ValueType::I32, ValueType::F64]);
        assert_eq!(body.code.len(), 1);
    }

    #[test]
    fn body_size_must_match() {
        let mut module = module_with_one_signature();
        let bytes = vec![1, 4, 0, 0x01, 0x0b, 0x01];
        match parse(&mut Cursor::new(bytes), &mut module) {
            Err(TranslateError::CorruptSection { id: 10, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn body_count_must_match_signatures() {
        let mut module = module_with_one_signature();
        match parse(&mut Cursor::new(vec![0]), &mut module) {
            Err(TranslateError::InvariantViolation(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn too_many_locals() {
        let mut module = module_with_one_signature();
        // 50_001 encoded as a varint is 0xd1 0x86 0x03
        let bytes = vec![1, 7, 1, 0xd1, 0x86, 0x03, 0x7f, 0x01, 0x0b];
        match parse(&mut Cursor::new(bytes), &mut module) {
            Err(TranslateError::InvariantViolation(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_opcode_names_function() {
        let mut module = module_with_one_signature();
        module.imported_functions = 2;
        let bytes = vec![1, 3, 0, 0xfe, 0x0b];
        match parse(&mut Cursor::new(bytes), &mut module) {
            Err(TranslateError::UnsupportedConstruct { function: Some(2), opcode: Some(0xfe), .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
