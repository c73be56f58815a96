use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    /// Spelling of the type in the emitted C.
    pub fn c_type(self) -> &'static str {
        match self {
            ValueType::I32 => "int32_t",
            ValueType::I64 => "int64_t",
            ValueType::F32 => "float",
            ValueType::F64 => "double",
        }
    }

    /// A zero of this type, as a C literal.
    pub fn zero(self) -> &'static str {
        match self {
            ValueType::I32 | ValueType::I64 => "0",
            ValueType::F32 => "0.0f",
            ValueType::F64 => "0.0",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Everything a single type constructor byte can introduce.
#[derive(Debug, Clone, PartialEq)]
pub enum LanguageType {
    Value(ValueType),
    Funcref,
    Func(FuncType),
    EmptyBlock,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub params: Vec<ValueType>,
    pub result: Option<ValueType>,
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        match self.result {
            Some(result) => write!(f, ") -> {}", result),
            None => write!(f, ")"),
        }
    }
}

/// Result type of a `block`, `loop` or `if`; `None` is the empty block type.
pub type BlockType = Option<ValueType>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    Function,
    Table,
    Memory,
    Global,
}

impl ExternalKind {
    pub fn from_byte(byte: u8) -> Option<ExternalKind> {
        match byte {
            0 => Some(ExternalKind::Function),
            1 => Some(ExternalKind::Table),
            2 => Some(ExternalKind::Memory),
            3 => Some(ExternalKind::Global),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizableLimits {
    pub initial: u32,
    pub maximum: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableType {
    pub elem_type: LanguageType,
    pub limits: ResizableLimits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalType {
    pub content_type: ValueType,
    pub mutability: bool,
}
