//! Rewrites a decoded module as one C compilation unit.

use crate::error::TranslateError;
use crate::parse_tree::imports::ImportKind;
use crate::parse_tree::language_types::{ExternalKind, ValueType};
use crate::parse_tree::operations::{Instruction, Opcode};
use crate::parse_tree::Module;
use crate::TranslateOptions;

pub mod expression;
pub mod function;
pub mod lowering;
pub mod names;


use self::expression::literal;
use self::function::{c_signature, translate_function};
use self::names::Names;

const POST_INSTANTIATE: &str = "__post_instantiate";
const MEMORY_BASE: &[&str] = &["__memory_base", "memoryBase"];
const MAX_PAGES: u32 = 65536;

/// The imported i32 global that relocates linear memory, if any.
fn memory_base(module: &Module) -> Option<u32> {
    module
        .imports
        .iter()
        .filter_map(|import| match import.kind {
            ImportKind::Global(ref global_type) => Some((import, global_type)),
            _ => None,
        })
        .position(|(import, global_type)| {
            MEMORY_BASE.contains(&import.field.as_str()) && global_type.content_type == ValueType::I32
        })
        .map(|index| index as u32)
}

/// A constant initializer as a C expression.
fn initializer(instruction: &Instruction, names: &Names) -> Result<String, TranslateError> {
    match instruction.op {
        Opcode::GetGlobal => match instruction.index() {
            Some(index) => Ok(names.global(index)),
            None => Err(TranslateError::invariant("get_global without an index")),
        },
        _ => literal(instruction)
            .map(|expr| expr.text)
            .ok_or_else(|| TranslateError::invariant(format!("`{}` is not a constant", instruction))),
    }
}

fn storage(names: &Names, kind: ExternalKind, index: u32) -> &'static str {
    if names.is_exported(kind, index) {
        ""
    } else {
        "static "
    }
}

pub fn translate_module(module: &Module, options: &TranslateOptions) -> Result<String, TranslateError> {
    let names = Names::new(module, options);
    let mut out = String::new();
    out += "#include \"wasm_rt.h\"\n";

    let mut imports = String::new();
    let (mut function_index, mut global_index, mut table_index) = (0u32, 0u32, 0u32);
    for import in &module.imports {
        match import.kind {
            ImportKind::Function(type_index) => {
                let func_type = module
                    .types
                    .get(type_index as usize)
                    .ok_or_else(|| TranslateError::invariant(format!("import {} has no type", import.field)))?;
                imports += &format!("extern {};\n", c_signature(&names.function(function_index), func_type, false));
                function_index += 1;
            }
            ImportKind::Global(global_type) => {
                imports += &format!("extern {} {};\n", global_type.content_type.c_type(), names.global(global_index));
                global_index += 1;
            }
            ImportKind::Table(_) => {
                imports += &format!("extern wasm_rt_table {};\n", names.table(table_index));
                table_index += 1;
            }
            ImportKind::Memory(_) => {}
        }
    }
    if !imports.is_empty() {
        out += "\n";
        out += &imports;
    }

    let mut fields = String::new();
    for (i, global) in module.globals.iter().enumerate() {
        let index = (module.imported_globals + i) as u32;
        fields += &format!(
            "{}{} {};\n",
            storage(&names, ExternalKind::Global, index),
            global.constraints.content_type.c_type(),
            names.global(index)
        );
    }
    let mut local_tables: Vec<u32> = vec![];
    for element in &module.elements {
        if element.table as usize >= module.imported_tables && !local_tables.contains(&element.table) {
            local_tables.push(element.table);
            fields += &format!(
                "{}wasm_rt_table {};\n",
                storage(&names, ExternalKind::Table, element.table),
                names.table(element.table)
            );
        }
    }
    if !fields.is_empty() {
        out += "\n";
        out += &fields;
    }

    out += "\n";
    for (i, function) in module.functions.iter().enumerate() {
        let index = (module.imported_functions + i) as u32;
        let func_type = module
            .types
            .get(function.type_index as usize)
            .ok_or_else(|| TranslateError::invariant(format!("function {} has no type", index)))?;
        out += &format!(
            "{}{};\n",
            storage(&names, ExternalKind::Function, index),
            c_signature(&names.function(index), func_type, true)
        );
    }
    out += &format!("void {}(void);\n", names.init());

    out += "\n";
    out += &module_initializer(module, &names, options)?;

    for i in 0..module.functions.len() {
        out += "\n";
        out += &translate_function(module, &names, i)?;
    }
    info!("Translated {} functions", module.functions.len());
    Ok(out)
}

/// Sets up memory, globals and tables, then runs the post-instantiate hook.
fn module_initializer(module: &Module, names: &Names, options: &TranslateOptions) -> Result<String, TranslateError> {
    let mut body = vec![];
    let (initial, maximum) = match module.memory_limits() {
        Some(limits) => (limits.initial, limits.maximum.unwrap_or(MAX_PAGES)),
        None => (options.memory_pages, MAX_PAGES),
    };
    body.push(format!("wasm_rt_memory_init({}u, {}u);", initial, maximum));
    if let Some(index) = memory_base(module) {
        body.push(format!("wasm_rt_memory_base = (uint32_t){};", names.global(index)));
    }
    // declaration order, so each global only sees globals already set
    for (i, global) in module.globals.iter().enumerate() {
        let index = (module.imported_globals + i) as u32;
        body.push(format!("{} = {};", names.global(index), initializer(&global.init, names)?));
    }
    for element in &module.elements {
        if element.functions.is_empty() {
            continue;
        }
        let references = element
            .functions
            .iter()
            .map(|&index| format!("(wasm_rt_funcref)&{}", names.function(index)))
            .collect::<Vec<_>>()
            .join(", ");
        body.push("{".to_string());
        body.push(format!("  static const wasm_rt_funcref elements[] = {{ {} }};", references));
        body.push(format!(
            "  wasm_rt_table_init(&{}, (uint32_t){}, elements, {}u);",
            names.table(element.table),
            initializer(&element.offset, names)?,
            element.functions.len()
        ));
        body.push("}".to_string());
    }
    if let Some(export) = module.exported(POST_INSTANTIATE, ExternalKind::Function) {
        let takes_nothing = module
            .function_type(export.index)
            .map_or(false, |func_type| func_type.params.is_empty());
        if takes_nothing {
            body.push(format!("{}();", names.function(export.index)));
        } else {
            warn!("{} takes parameters and is not called", POST_INSTANTIATE);
        }
    }

    let mut out = format!("void {}(void) {{\n", names.init());
    for line in body {
        out += "  ";
        out += &line;
        out.push('\n');
    }
    out += "}\n";
    Ok(out)
}
