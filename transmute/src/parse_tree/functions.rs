use crate::parse_tree::language_types::ValueType;
use crate::parse_tree::operations::Instruction;

#[derive(Clone, Debug)]
pub struct Function {
    pub type_index: u32,
    pub body: FuncBody,
}

#[derive(Clone, Debug, Default)]
pub struct FuncBody {
    pub locals: Vec<ValueType>, // declared locals only, parameters come first in the index space
    pub code: Vec<Instruction>,
}

impl FuncBody {
    pub fn new() -> Self {
        FuncBody {
            locals: vec![],
            code: vec![],
        }
    }
}
