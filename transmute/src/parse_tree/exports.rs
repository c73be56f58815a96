use crate::parse_tree::language_types::ExternalKind;

#[derive(Debug, Clone)]
pub struct Export {
    pub field: String,
    pub kind: ExternalKind,
    pub index: u32,
}
