use crate::parse_tree::language_types::{ExternalKind, GlobalType, ResizableLimits, TableType};

#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub kind: ImportKind,
}

#[derive(Debug, Clone)]
pub enum ImportKind {
    Function(u32), // type index
    Table(TableType),
    Memory(ResizableLimits),
    Global(GlobalType),
}

impl ImportKind {
    pub fn external_kind(&self) -> ExternalKind {
        match *self {
            ImportKind::Function(_) => ExternalKind::Function,
            ImportKind::Table(_) => ExternalKind::Table,
            ImportKind::Memory(_) => ExternalKind::Memory,
            ImportKind::Global(_) => ExternalKind::Global,
        }
    }
}

impl Import {
    /// Page limits, for the two kinds that carry them.
    pub fn limits(&self) -> Option<ResizableLimits> {
        match self.kind {
            ImportKind::Table(ref table) => Some(table.limits),
            ImportKind::Memory(limits) => Some(limits),
            _ => None,
        }
    }
}
