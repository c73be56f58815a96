pub mod elements;
pub mod exports;
pub mod functions;
pub mod globals;
pub mod imports;
pub mod language_types;
pub mod operations;

use self::elements::Element;
use self::exports::Export;
use self::functions::Function;
use self::globals::Global;
use self::imports::{Import, ImportKind};
use self::language_types::{ExternalKind, FuncType, GlobalType, ResizableLimits};

/// A decoded module. Functions, globals and tables are numbered imports
/// first, then local definitions; the `imported_*` counts are where the
/// local part of each index space starts.
#[derive(Debug, Default)]
pub struct Module {
    pub version: u32,
    pub types: Vec<FuncType>,
    pub imports: Vec<Import>,
    pub function_signatures: Vec<u32>,
    pub memories: Vec<ResizableLimits>,
    pub globals: Vec<Global>,
    pub exports: Vec<Export>,
    pub elements: Vec<Element>,
    pub functions: Vec<Function>,
    pub custom_sections: Vec<String>,
    pub imported_functions: usize,
    pub imported_globals: usize,
    pub imported_tables: usize,
}

/// Where an index of the combined space points.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'m> {
    Imported(&'m Import),
    Local(usize),
}

impl Module {
    pub fn new(version: u32) -> Module {
        Module {
            version,
            ..Module::default()
        }
    }

    fn imports_of(&self, kind: ExternalKind) -> impl Iterator<Item = &Import> {
        self.imports.iter().filter(move |import| import.kind.external_kind() == kind)
    }

    /// Recomputes the import partition of every index space.
    pub fn count_imports(&mut self) {
        self.imported_functions = self.imports_of(ExternalKind::Function).count();
        self.imported_globals = self.imports_of(ExternalKind::Global).count();
        self.imported_tables = self.imports_of(ExternalKind::Table).count();
    }

    pub fn function(&self, index: u32) -> Option<Resolved> {
        let index = index as usize;
        if index < self.imported_functions {
            self.imports_of(ExternalKind::Function).nth(index).map(Resolved::Imported)
        } else if index - self.imported_functions < self.function_signatures.len() {
            Some(Resolved::Local(index - self.imported_functions))
        } else {
            None
        }
    }

    pub fn function_type(&self, index: u32) -> Option<&FuncType> {
        let type_index = match self.function(index)? {
            Resolved::Imported(&Import { kind: ImportKind::Function(type_index), .. }) => type_index,
            Resolved::Imported(_) => return None,
            Resolved::Local(local) => self.function_signatures[local],
        };
        self.types.get(type_index as usize)
    }

    pub fn global(&self, index: u32) -> Option<Resolved> {
        let index = index as usize;
        if index < self.imported_globals {
            self.imports_of(ExternalKind::Global).nth(index).map(Resolved::Imported)
        } else if index - self.imported_globals < self.globals.len() {
            Some(Resolved::Local(index - self.imported_globals))
        } else {
            None
        }
    }

    pub fn global_type(&self, index: u32) -> Option<GlobalType> {
        match self.global(index)? {
            Resolved::Imported(&Import { kind: ImportKind::Global(global_type), .. }) => Some(global_type),
            Resolved::Imported(_) => None,
            Resolved::Local(local) => Some(self.globals[local].constraints),
        }
    }

    pub fn table_import(&self, index: u32) -> Option<&Import> {
        self.imports_of(ExternalKind::Table).nth(index as usize)
    }

    pub fn imported_memories(&self) -> usize {
        self.imports_of(ExternalKind::Memory).count()
    }

    /// Limits of memory 0, imported or declared.
    pub fn memory_limits(&self) -> Option<ResizableLimits> {
        self.imports_of(ExternalKind::Memory)
            .next()
            .and_then(Import::limits)
            .or_else(|| self.memories.first().cloned())
    }

    /// The first export of `kind` naming `index`, if any.
    pub fn export_name(&self, kind: ExternalKind, index: u32) -> Option<&str> {
        self.exports
            .iter()
            .find(|export| export.kind == kind && export.index == index)
            .map(|export| export.field.as_str())
    }

    pub fn exported(&self, field: &str, kind: ExternalKind) -> Option<&Export> {
        self.exports.iter().find(|export| export.kind == kind && export.field == field)
    }
}
