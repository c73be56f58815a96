use crate::parse_tree::language_types::GlobalType;
use crate::parse_tree::operations::Instruction;

#[derive(Debug, Clone)]
pub struct Global {
    pub constraints: GlobalType,
    pub init: Instruction, // exactly one constant instruction
}
