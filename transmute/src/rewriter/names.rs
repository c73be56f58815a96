use std::collections::{BTreeMap, HashSet};

use crate::parse_tree::imports::Import;
use crate::parse_tree::language_types::ExternalKind;
use crate::parse_tree::{Module, Resolved};
use crate::TranslateOptions;

/// Turns an arbitrary name into a C identifier.
pub fn sanitize(name: &str) -> String {
    let mut identifier: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if identifier.is_empty() || identifier.as_bytes()[0].is_ascii_digit() {
        identifier.insert(0, '_');
    }
    identifier
}

/// C names for everything a module defines or imports.
///
/// Every file-scope name is settled up front: imports keep the host's
/// symbol, then the initializer, functions, globals and tables claim theirs
/// in index order. A name already taken gets the first free `_<n>` suffix.
pub struct Names<'m> {
    module: &'m Module,
    prefix: String,
    init: String,
    functions: Vec<String>,
    globals: Vec<String>,
    tables: BTreeMap<u32, String>,
}

fn claim(taken: &mut HashSet<String>, name: String) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}_{}", name, suffix);
        if taken.insert(candidate.clone()) {
            warn!("{} is already defined, using {}", name, candidate);
            return candidate;
        }
        suffix += 1;
    }
}

fn import_name(import: &Import) -> String {
    sanitize(&format!("{}_{}", import.module, import.field))
}

impl<'m> Names<'m> {
    pub fn new(module: &'m Module, options: &TranslateOptions) -> Names<'m> {
        let prefix = if options.namespace.is_empty() {
            sanitize(&options.container)
        } else {
            sanitize(&format!("{}_{}", options.namespace, options.container))
        };
        let mut taken = HashSet::new();
        for import in &module.imports {
            taken.insert(import_name(import));
        }
        let init = claim(&mut taken, format!("{}_init", prefix));

        let defined = |taken: &mut HashSet<String>, kind: ExternalKind, index: u32, tag: char| {
            let name = match module.export_name(kind, index) {
                Some(export) => sanitize(&format!("{}_{}", prefix, export)),
                None => format!("{}_{}{}", prefix, tag, index),
            };
            claim(taken, name)
        };

        let function_count = module.imported_functions + module.function_signatures.len();
        let mut functions = Vec::with_capacity(function_count);
        for index in 0..function_count as u32 {
            let name = match module.function(index) {
                Some(Resolved::Imported(import)) => import_name(import),
                _ => defined(&mut taken, ExternalKind::Function, index, 'F'),
            };
            functions.push(name);
        }

        let global_count = module.imported_globals + module.globals.len();
        let mut globals = Vec::with_capacity(global_count);
        for index in 0..global_count as u32 {
            let name = match module.global(index) {
                Some(Resolved::Imported(import)) => import_name(import),
                _ => defined(&mut taken, ExternalKind::Global, index, 'G'),
            };
            globals.push(name);
        }

        let mut table_indices: Vec<u32> = (0..module.imported_tables as u32).collect();
        table_indices.extend(module.elements.iter().map(|element| element.table));
        table_indices.extend(
            module
                .exports
                .iter()
                .filter(|export| export.kind == ExternalKind::Table)
                .map(|export| export.index),
        );
        table_indices.sort();
        table_indices.dedup();
        let mut tables = BTreeMap::new();
        for index in table_indices {
            let name = match module.table_import(index) {
                Some(import) => import_name(import),
                None => defined(&mut taken, ExternalKind::Table, index, 'T'),
            };
            tables.insert(index, name);
        }

        Names {
            module,
            prefix,
            init,
            functions,
            globals,
            tables,
        }
    }

    /// Name of a function in the combined index space. Unknown indices get
    /// the synthesized local name; callers check bounds themselves.
    pub fn function(&self, index: u32) -> String {
        match self.functions.get(index as usize) {
            Some(name) => name.clone(),
            None => format!("{}_F{}", self.prefix, index),
        }
    }

    pub fn global(&self, index: u32) -> String {
        match self.globals.get(index as usize) {
            Some(name) => name.clone(),
            None => format!("{}_G{}", self.prefix, index),
        }
    }

    pub fn table(&self, index: u32) -> String {
        match self.tables.get(&index) {
            Some(name) => name.clone(),
            None => format!("{}_T{}", self.prefix, index),
        }
    }

    pub fn init(&self) -> String {
        self.init.clone()
    }

    pub fn is_exported(&self, kind: ExternalKind, index: u32) -> bool {
        self.module.export_name(kind, index).is_some()
    }
}

/// Parameters and declared locals share one index space.
pub fn local(index: u32, params: usize) -> String {
    if (index as usize) < params {
        format!("p{}", index)
    } else {
        format!("l{}", index)
    }
}

pub fn temp(index: usize) -> String {
    format!("t{}", index)
}

pub fn label(id: u32) -> String {
    format!("L{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::exports::Export;
    use crate::parse_tree::imports::{Import, ImportKind};
    use crate::parse_tree::language_types::FuncType;

    #[test]
    fn sanitizes_identifiers() {
        assert_eq!(sanitize("main"), "main");
        assert_eq!(sanitize("_Z3foo.bar-baz"), "_Z3foo_bar_baz");
        assert_eq!(sanitize("2fast"), "_2fast");
        assert_eq!(sanitize(""), "_");
    }

    #[test]
    fn names_follow_index_spaces() {
        let mut module = Module::new(1);
        module.types.push(FuncType::default());
        module.imports.push(Import {
            module: "env".to_string(),
            field: "abort!".to_string(),
            kind: ImportKind::Function(0),
        });
        module.count_imports();
        module.function_signatures = vec![0, 0];
        module.exports.push(Export {
            field: "run".to_string(),
            kind: ExternalKind::Function,
            index: 2,
        });
        let options = TranslateOptions {
            namespace: "App".to_string(),
            container: "Core".to_string(),
            ..TranslateOptions::default()
        };
        let names = Names::new(&module, &options);
        assert_eq!(names.function(0), "env_abort_");
        assert_eq!(names.function(1), "App_Core_F1");
        assert_eq!(names.function(2), "App_Core_run");
        assert_eq!(names.global(0), "App_Core_G0");
        assert_eq!(names.init(), "App_Core_init");
        assert!(names.is_exported(ExternalKind::Function, 2));
    }

    #[test]
    fn empty_namespace_drops_separator() {
        let module = Module::new(1);
        let options = TranslateOptions {
            namespace: String::new(),
            container: "m".to_string(),
            ..TranslateOptions::default()
        };
        assert_eq!(Names::new(&module, &options).init(), "m_init");
    }

    fn export(module: &mut Module, field: &str, kind: ExternalKind, index: u32) {
        module.exports.push(Export {
            field: field.to_string(),
            kind,
            index,
        });
    }

    #[test]
    fn exported_init_does_not_shadow_initializer() {
        let mut module = Module::new(1);
        module.types.push(FuncType::default());
        module.function_signatures = vec![0];
        export(&mut module, "init", ExternalKind::Function, 0);
        let names = Names::new(&module, &TranslateOptions::default());
        assert_eq!(names.init(), "Wasm_Module_init");
        assert_eq!(names.function(0), "Wasm_Module_init_1");
    }

    #[test]
    fn sanitized_collisions_get_suffixes() {
        let mut module = Module::new(1);
        module.types.push(FuncType::default());
        module.function_signatures = vec![0, 0, 0];
        export(&mut module, "a.b", ExternalKind::Function, 0);
        export(&mut module, "a-b", ExternalKind::Function, 1);
        export(&mut module, "F0", ExternalKind::Function, 2);
        let names = Names::new(&module, &TranslateOptions::default());
        assert_eq!(names.function(0), "Wasm_Module_a_b");
        assert_eq!(names.function(1), "Wasm_Module_a_b_1");
        assert_eq!(names.function(2), "Wasm_Module_F0");
    }

    #[test]
    fn synthesized_names_avoid_exports() {
        let mut module = Module::new(1);
        module.types.push(FuncType::default());
        module.function_signatures = vec![0, 0];
        export(&mut module, "F2", ExternalKind::Function, 1);
        module.imports.push(Import {
            module: "Wasm".to_string(),
            field: "Module_G0".to_string(),
            kind: ImportKind::Function(0),
        });
        module.count_imports();
        let names = Names::new(&module, &TranslateOptions::default());
        // the import takes index 0, so the unexported local is F2
        assert_eq!(names.function(0), "Wasm_Module_G0");
        assert_eq!(names.function(1), "Wasm_Module_F2");
        assert_eq!(names.function(2), "Wasm_Module_F2_1");
    }

    #[test]
    fn locals_split_at_params() {
        assert_eq!(local(1, 2), "p1");
        assert_eq!(local(2, 2), "l2");
    }
}
