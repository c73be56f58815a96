use crate::parse_tree::language_types::ValueType;
use crate::parse_tree::operations::{Immediate, Instruction};

/// A C expression waiting on the operand stack, with enough about what it
/// reads and does to decide when it has to be evaluated early.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub text: String,
    pub ty: ValueType,
    pub locals: Vec<u32>,
    pub reads_globals: bool,
    pub reads_memory: bool,
    pub effects: bool,
}

impl Expr {
    /// A literal or temporary: reads nothing that can change under it.
    pub fn atom<S: Into<String>>(text: S, ty: ValueType) -> Expr {
        Expr {
            text: text.into(),
            ty,
            locals: vec![],
            reads_globals: false,
            reads_memory: false,
            effects: false,
        }
    }

    pub fn local(index: u32, name: String, ty: ValueType) -> Expr {
        Expr {
            locals: vec![index],
            ..Expr::atom(name, ty)
        }
    }

    pub fn global(name: String, ty: ValueType) -> Expr {
        Expr {
            reads_globals: true,
            ..Expr::atom(name, ty)
        }
    }

    /// An expression built from `parts`, inheriting everything they read.
    pub fn combine(text: String, ty: ValueType, parts: &[&Expr]) -> Expr {
        let mut expr = Expr::atom(text, ty);
        for part in parts {
            for &local in &part.locals {
                if !expr.locals.contains(&local) {
                    expr.locals.push(local);
                }
            }
            expr.reads_globals |= part.reads_globals;
            expr.reads_memory |= part.reads_memory;
            expr.effects |= part.effects;
        }
        expr
    }

    pub fn with_memory_read(mut self) -> Expr {
        self.reads_memory = true;
        self
    }

    pub fn with_effects(mut self) -> Expr {
        self.effects = true;
        self
    }

    pub fn reads_local(&self, index: u32) -> bool {
        self.locals.contains(&index)
    }

    pub fn reads_state(&self) -> bool {
        self.reads_globals || self.reads_memory
    }

    /// Whether the value could differ if evaluated after some call or store.
    pub fn depends_on_state(&self) -> bool {
        self.reads_state() || self.effects
    }

    pub fn is_stable(&self) -> bool {
        self.locals.is_empty() && !self.depends_on_state()
    }
}

/// `text` wrapped in parentheses unless it already binds tighter than any
/// operator it could be placed next to.
pub fn operand(text: &str) -> String {
    if is_atomic(text) {
        text.to_string()
    } else {
        format!("({})", text)
    }
}

fn is_atomic(text: &str) -> bool {
    if text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return !text.is_empty();
    }
    // `name(...)` or `(...)` where the first open parenthesis closes last
    let start = match text.find('(') {
        Some(start) => start,
        None => return false,
    };
    if !text[..start].chars().all(|c| c.is_ascii_alphanumeric() || c == '_') || !text.ends_with(')') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip(start) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Fills `$a` and `$b` in a template with the given operands.
pub fn render(template: &str, operands: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c == '$' {
            match chars.next() {
                Some('a') => out.push_str(&operand(operands[0])),
                Some('b') => out.push_str(&operand(operands[1])),
                Some(other) => {
                    out.push('$');
                    out.push(other);
                }
                None => out.push('$'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// The C spelling of a constant instruction.
pub fn literal(instruction: &Instruction) -> Option<Expr> {
    Some(match instruction.immediate {
        Immediate::I32(value) => {
            let text = if value == i32::min_value() {
                "INT32_MIN".to_string()
            } else {
                value.to_string()
            };
            Expr::atom(text, ValueType::I32)
        }
        Immediate::I64(value) => {
            let text = if value == i64::min_value() {
                "INT64_MIN".to_string()
            } else {
                format!("INT64_C({})", value)
            };
            Expr::atom(text, ValueType::I64)
        }
        Immediate::F32(bits) => Expr::atom(format!("wasm_rt_f32_bits(0x{:08x}u)", bits), ValueType::F32),
        Immediate::F64(bits) => Expr::atom(format!("wasm_rt_f64_bits(UINT64_C(0x{:016x}))", bits), ValueType::F64),
        _ => return None,
    })
}
