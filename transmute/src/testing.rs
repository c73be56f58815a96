//! Assembles binary modules for tests.

use crate::parse_tree::language_types::{BlockType, ExternalKind, ValueType};
use crate::parse_tree::operations::Opcode;

fn type_byte(value_type: ValueType) -> u8 {
    match value_type {
        ValueType::I32 => 0x7f,
        ValueType::I64 => 0x7e,
        ValueType::F32 => 0x7d,
        ValueType::F64 => 0x7c,
    }
}

fn kind_byte(kind: ExternalKind) -> u8 {
    match kind {
        ExternalKind::Function => 0,
        ExternalKind::Table => 1,
        ExternalKind::Memory => 2,
        ExternalKind::Global => 3,
    }
}

fn limits_bytes(initial: u32, maximum: Option<u32>) -> Vec<u8> {
    let mut out = vec![maximum.is_some() as u8];
    u32_bytes(initial, &mut out);
    if let Some(maximum) = maximum {
        u32_bytes(maximum, &mut out);
    }
    out
}

fn u32_bytes(value: u32, out: &mut Vec<u8>) {
    leb::write_unsigned(u64::from(value), out);
}

fn string_bytes(value: &str, out: &mut Vec<u8>) {
    u32_bytes(value.len() as u32, out);
    out.extend_from_slice(value.as_bytes());
}

/// An instruction sequence without its closing `end`.
#[derive(Debug, Clone, Default)]
pub struct Code(pub Vec<u8>);

impl Code {
    pub fn new() -> Code {
        Code(vec![])
    }

    pub fn op(mut self, op: Opcode) -> Code {
        self.0.push(op.byte());
        self
    }

    pub fn index(mut self, op: Opcode, index: u32) -> Code {
        self.0.push(op.byte());
        u32_bytes(index, &mut self.0);
        self
    }

    pub fn get_local(self, index: u32) -> Code {
        self.index(Opcode::GetLocal, index)
    }

    pub fn set_local(self, index: u32) -> Code {
        self.index(Opcode::SetLocal, index)
    }

    pub fn tee_local(self, index: u32) -> Code {
        self.index(Opcode::TeeLocal, index)
    }

    pub fn get_global(self, index: u32) -> Code {
        self.index(Opcode::GetGlobal, index)
    }

    pub fn set_global(self, index: u32) -> Code {
        self.index(Opcode::SetGlobal, index)
    }

    pub fn call(self, index: u32) -> Code {
        self.index(Opcode::Call, index)
    }

    pub fn br(self, depth: u32) -> Code {
        self.index(Opcode::Br, depth)
    }

    pub fn br_if(self, depth: u32) -> Code {
        self.index(Opcode::BrIf, depth)
    }

    pub fn br_table(mut self, targets: &[u32], default: u32) -> Code {
        self.0.push(Opcode::BrTable.byte());
        u32_bytes(targets.len() as u32, &mut self.0);
        for &target in targets {
            u32_bytes(target, &mut self.0);
        }
        u32_bytes(default, &mut self.0);
        self
    }

    pub fn call_indirect(mut self, type_index: u32) -> Code {
        self.0.push(Opcode::CallIndirect.byte());
        u32_bytes(type_index, &mut self.0);
        self.0.push(0);
        self
    }

    pub fn i32(mut self, value: i32) -> Code {
        self.0.push(Opcode::I32Const.byte());
        leb::write_signed(i64::from(value), &mut self.0);
        self
    }

    pub fn i64(mut self, value: i64) -> Code {
        self.0.push(Opcode::I64Const.byte());
        leb::write_signed(value, &mut self.0);
        self
    }

    pub fn f32(mut self, value: f32) -> Code {
        self.0.push(Opcode::F32Const.byte());
        self.0.extend_from_slice(&value.to_bits().to_le_bytes());
        self
    }

    pub fn f64(mut self, value: f64) -> Code {
        self.0.push(Opcode::F64Const.byte());
        self.0.extend_from_slice(&value.to_bits().to_le_bytes());
        self
    }

    /// `block`, `loop` or `if` with its result type.
    pub fn open(mut self, op: Opcode, block_type: BlockType) -> Code {
        self.0.push(op.byte());
        self.0.push(block_type.map_or(0x40, type_byte));
        self
    }

    pub fn end(self) -> Code {
        self.op(Opcode::End)
    }

    pub fn memory(mut self, op: Opcode, offset: u32) -> Code {
        self.0.push(op.byte());
        u32_bytes(2, &mut self.0);
        u32_bytes(offset, &mut self.0);
        self
    }

    /// `current_memory` and `grow_memory` carry a reserved byte.
    pub fn memory_size(mut self, op: Opcode) -> Code {
        self.0.push(op.byte());
        self.0.push(0);
        self
    }

    fn finish(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
        out.push(Opcode::End.byte());
    }
}

#[derive(Debug, Default)]
pub struct ModuleBuilder {
    raw: Vec<(u8, Vec<u8>)>,
    types: Vec<Vec<u8>>,
    imports: Vec<Vec<u8>>,
    signatures: Vec<u32>,
    memories: Vec<Vec<u8>>,
    globals: Vec<Vec<u8>>,
    exports: Vec<Vec<u8>>,
    elements: Vec<Vec<u8>>,
    bodies: Vec<Vec<u8>>,
}

impl ModuleBuilder {
    pub fn new() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    /// A section written out verbatim.
    pub fn section(mut self, id: u8, payload: Vec<u8>) -> ModuleBuilder {
        self.raw.push((id, payload));
        self
    }

    pub fn func_type(mut self, params: &[ValueType], result: Option<ValueType>) -> ModuleBuilder {
        let mut entry = vec![0x60];
        u32_bytes(params.len() as u32, &mut entry);
        entry.extend(params.iter().map(|&param| type_byte(param)));
        match result {
            Some(result) => entry.extend_from_slice(&[1, type_byte(result)]),
            None => entry.push(0),
        }
        self.types.push(entry);
        self
    }

    fn import(mut self, module: &str, field: &str, kind: ExternalKind, description: &[u8]) -> ModuleBuilder {
        let mut entry = vec![];
        string_bytes(module, &mut entry);
        string_bytes(field, &mut entry);
        entry.push(kind_byte(kind));
        entry.extend_from_slice(description);
        self.imports.push(entry);
        self
    }

    pub fn import_function(self, module: &str, field: &str, type_index: u32) -> ModuleBuilder {
        let mut description = vec![];
        u32_bytes(type_index, &mut description);
        self.import(module, field, ExternalKind::Function, &description)
    }

    pub fn import_global(self, module: &str, field: &str, value_type: ValueType) -> ModuleBuilder {
        self.import(module, field, ExternalKind::Global, &[type_byte(value_type), 0])
    }

    pub fn import_memory(self, module: &str, field: &str, initial: u32, maximum: Option<u32>) -> ModuleBuilder {
        self.import(module, field, ExternalKind::Memory, &limits_bytes(initial, maximum))
    }

    /// A memory declared by the module itself.
    pub fn memory(mut self, initial: u32, maximum: Option<u32>) -> ModuleBuilder {
        self.memories.push(limits_bytes(initial, maximum));
        self
    }

    pub fn import_table(self, module: &str, field: &str, initial: u32) -> ModuleBuilder {
        let mut description = vec![0x70, 0];
        u32_bytes(initial, &mut description);
        self.import(module, field, ExternalKind::Table, &description)
    }

    /// A local function: its signature and its body.
    pub fn function(mut self, type_index: u32, locals: &[(u32, ValueType)], code: Code) -> ModuleBuilder {
        self.signatures.push(type_index);
        let mut body = vec![];
        u32_bytes(locals.len() as u32, &mut body);
        for &(count, value_type) in locals {
            u32_bytes(count, &mut body);
            body.push(type_byte(value_type));
        }
        code.finish(&mut body);
        self.bodies.push(body);
        self
    }

    pub fn global(mut self, value_type: ValueType, mutable: bool, init: Code) -> ModuleBuilder {
        let mut entry = vec![type_byte(value_type), mutable as u8];
        init.finish(&mut entry);
        self.globals.push(entry);
        self
    }

    pub fn export(mut self, field: &str, kind: ExternalKind, index: u32) -> ModuleBuilder {
        let mut entry = vec![];
        string_bytes(field, &mut entry);
        entry.push(kind_byte(kind));
        u32_bytes(index, &mut entry);
        self.exports.push(entry);
        self
    }

    pub fn element(mut self, table: u32, offset: Code, functions: &[u32]) -> ModuleBuilder {
        let mut entry = vec![];
        u32_bytes(table, &mut entry);
        offset.finish(&mut entry);
        u32_bytes(functions.len() as u32, &mut entry);
        for &function in functions {
            u32_bytes(function, &mut entry);
        }
        self.elements.push(entry);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut sections = self.raw;
        let mut vector = |id: u8, entries: Vec<Vec<u8>>| {
            if !entries.is_empty() {
                let mut payload = vec![];
                u32_bytes(entries.len() as u32, &mut payload);
                for entry in entries {
                    payload.extend(entry);
                }
                sections.push((id, payload));
            }
        };
        vector(1, self.types);
        vector(2, self.imports);
        vector(
            3,
            self.signatures
                .iter()
                .map(|&index| {
                    let mut entry = vec![];
                    u32_bytes(index, &mut entry);
                    entry
                })
                .collect(),
        );
        vector(5, self.memories);
        vector(6, self.globals);
        vector(7, self.exports);
        vector(9, self.elements);
        vector(
            10,
            self.bodies
                .into_iter()
                .map(|body| {
                    let mut entry = vec![];
                    u32_bytes(body.len() as u32, &mut entry);
                    entry.extend(body);
                    entry
                })
                .collect(),
        );
        sections.sort_by_key(|&(id, _)| id);

        let mut out = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
        for (id, payload) in sections {
            out.push(id);
            u32_bytes(payload.len() as u32, &mut out);
            out.extend(payload);
        }
        out
    }
}
