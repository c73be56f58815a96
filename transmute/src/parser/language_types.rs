use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::language_types::{
    BlockType, FuncType, GlobalType, LanguageType, ResizableLimits, TableType, ValueType,
};
use crate::parser::utils::{read_varuint1, read_varuint32, read_varuint7};

const I32: u8 = 0x7f;
const I64: u8 = 0x7e;
const F32: u8 = 0x7d;
const F64: u8 = 0x7c;
const FUNCREF: u8 = 0x70;
const FUNC: u8 = 0x60;
const EMPTY_BLOCK: u8 = 0x40;

pub fn parse_language_type(reader: &mut dyn Read) -> Result<LanguageType, TranslateError> {
    let tag = read_varuint7(reader)?;
    Ok(match tag {
        I32 => LanguageType::Value(ValueType::I32),
        I64 => LanguageType::Value(ValueType::I64),
        F32 => LanguageType::Value(ValueType::F32),
        F64 => LanguageType::Value(ValueType::F64),
        FUNCREF => LanguageType::Funcref,
        EMPTY_BLOCK => LanguageType::EmptyBlock,
        FUNC => LanguageType::Func(parse_func_type(reader)?),
        _ => return Err(TranslateError::unsupported(format!("type tag {:#04x}", tag))),
    })
}

fn parse_func_type(reader: &mut dyn Read) -> Result<FuncType, TranslateError> {
    let param_count = read_varuint32(reader)?;
    let mut params = vec![];
    for _ in 0..param_count {
        params.push(parse_value_type(reader)?);
    }
    let result = match read_varuint32(reader)? {
        0 => None,
        1 => Some(parse_value_type(reader)?),
        n => return Err(TranslateError::unsupported(format!("function type with {} results", n))),
    };
    Ok(FuncType { params, result })
}

pub fn parse_value_type(reader: &mut dyn Read) -> Result<ValueType, TranslateError> {
    match parse_language_type(reader)? {
        LanguageType::Value(value_type) => Ok(value_type),
        other => Err(TranslateError::unsupported(format!("{:?} where a value type belongs", other))),
    }
}

pub fn parse_block_type(reader: &mut dyn Read) -> Result<BlockType, TranslateError> {
    match parse_language_type(reader)? {
        LanguageType::Value(value_type) => Ok(Some(value_type)),
        LanguageType::EmptyBlock => Ok(None),
        other => Err(TranslateError::unsupported(format!("{:?} as a block type", other))),
    }
}

pub fn parse_limits(reader: &mut dyn Read) -> Result<ResizableLimits, TranslateError> {
    let has_maximum = read_varuint1(reader)?;
    let initial = read_varuint32(reader)?;
    let maximum = if has_maximum {
        Some(read_varuint32(reader)?)
    } else {
        None
    };
    Ok(ResizableLimits { initial, maximum })
}

pub fn parse_table_type(reader: &mut dyn Read) -> Result<TableType, TranslateError> {
    let elem_type = parse_language_type(reader)?;
    if elem_type != LanguageType::Funcref {
        return Err(TranslateError::unsupported(format!("table of {:?}", elem_type)));
    }
    let limits = parse_limits(reader)?;
    Ok(TableType { elem_type, limits })
}

pub fn parse_global_type(reader: &mut dyn Read) -> Result<GlobalType, TranslateError> {
    let content_type = parse_value_type(reader)?;
    let mutability = read_varuint1(reader)?;
    Ok(GlobalType { content_type, mutability })
}
