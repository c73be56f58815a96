use crate::parse_tree::operations::Instruction;

#[derive(Debug, Clone)]
pub struct Element {
    pub table: u32,
    pub offset: Instruction,
    pub functions: Vec<u32>,
}
