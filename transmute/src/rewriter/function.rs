use std::mem;

use crate::error::TranslateError;
use crate::parse_tree::language_types::{BlockType, ExternalKind, FuncType, ValueType};
use crate::parse_tree::operations::{Immediate, Instruction, Opcode};
use crate::parse_tree::Module;
use crate::rewriter::expression::{literal, operand, render, Expr};
use crate::rewriter::lowering::{access_function, access_type, lower};
use crate::rewriter::names::{self, Names};

/// `<result> name(<params>)`, with parameter names for definitions.
pub fn c_signature(name: &str, func_type: &FuncType, named: bool) -> String {
    let result = func_type.result.map_or("void", ValueType::c_type);
    let params = if func_type.params.is_empty() {
        "void".to_string()
    } else {
        func_type
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                if named {
                    format!("{} p{}", param.c_type(), i)
                } else {
                    param.c_type().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("{} {}({})", result, name, params)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LabelKind {
    Function,
    Block,
    Loop,
    If,
    Else,
    // opened inside unreachable code, never emitted
    Dead,
}

#[derive(Debug)]
struct Label {
    kind: LabelKind,
    result: BlockType,
    id: Option<u32>,
    referenced: bool,
    temp: Option<usize>,
    base: usize,
    if_line: usize,
    else_line: usize,
    condition: Option<Expr>,
    // value of a then arm that emitted no statements, kept for folding
    then_value: Option<Expr>,
    then_live: bool,
}

impl Label {
    fn new(kind: LabelKind, result: BlockType, base: usize) -> Label {
        Label {
            kind,
            result,
            id: None,
            referenced: false,
            temp: None,
            base,
            if_line: 0,
            else_line: 0,
            condition: None,
            then_value: None,
            then_live: false,
        }
    }
}

/// What is about to run, for deciding which pending expressions must be
/// evaluated first.
#[derive(Debug, Default, Clone, Copy)]
struct Hazard {
    local: Option<u32>,
    writes_state: bool,
    reads_state: bool,
}

impl Hazard {
    fn of(expr: &Expr) -> Hazard {
        Hazard {
            local: None,
            writes_state: expr.effects,
            reads_state: expr.depends_on_state(),
        }
    }

    /// Flushes pending calls before control leaves or traps.
    fn leaving() -> Hazard {
        Hazard {
            reads_state: true,
            ..Hazard::default()
        }
    }

    fn conflicts(&self, expr: &Expr) -> bool {
        self.local.map_or(false, |local| expr.reads_local(local))
            || (self.writes_state && expr.depends_on_state())
            || (self.reads_state && expr.effects)
    }

    fn absorb(&mut self, expr: &Expr) {
        self.writes_state |= expr.effects;
        self.reads_state |= expr.depends_on_state();
    }

    fn and(mut self, other: Hazard) -> Hazard {
        self.writes_state |= other.writes_state;
        self.reads_state |= other.reads_state;
        self.local = self.local.or(other.local);
        self
    }
}

/// Rewrites one function body. Owns all of its state, so functions can be
/// translated independently of each other.
struct FunctionWriter<'a> {
    module: &'a Module,
    names: &'a Names<'a>,
    index: u32,
    signature: &'a FuncType,
    locals: Vec<ValueType>,
    stack: Vec<Expr>,
    labels: Vec<Label>,
    lines: Vec<String>,
    temps: Vec<ValueType>,
    next_label: u32,
    depth: usize,
    dead: bool,
    op: Opcode,
}

/// Translates the local function `local_index` into a C definition.
pub fn translate_function(module: &Module, names: &Names, local_index: usize) -> Result<String, TranslateError> {
    let function = &module.functions[local_index];
    let index = (module.imported_functions + local_index) as u32;
    let signature = module
        .types
        .get(function.type_index as usize)
        .ok_or_else(|| TranslateError::invariant(format!("function {} has no type", index)))?;

    let mut locals = signature.params.clone();
    locals.extend_from_slice(&function.body.locals);
    let mut writer = FunctionWriter {
        module,
        names,
        index,
        signature,
        locals,
        stack: vec![],
        labels: vec![Label::new(LabelKind::Function, signature.result, 0)],
        lines: vec![],
        temps: vec![],
        next_label: 0,
        depth: 1,
        dead: false,
        op: Opcode::Nop,
    };
    for instruction in &function.body.code {
        writer.step(instruction).map_err(|e| e.in_function(index))?;
    }
    let text = writer.finish()?;
    debug!("Translated function {} ({} instructions)", index, function.body.code.len());
    Ok(text)
}

impl<'a> FunctionWriter<'a> {
    fn invalid<S: AsRef<str>>(&self, what: S) -> TranslateError {
        TranslateError::invariant(format!("function {}: {} at {}", self.index, what.as_ref(), self.op.name()))
    }

    fn unsupported<S: Into<String>>(&self, what: S) -> TranslateError {
        TranslateError::UnsupportedConstruct {
            function: Some(self.index),
            opcode: Some(self.op.byte()),
            what: what.into(),
        }
    }

    fn emit<S: AsRef<str>>(&mut self, line: S) {
        self.lines.push(format!("{}{}", "  ".repeat(self.depth), line.as_ref()));
    }

    fn new_temp(&mut self, ty: ValueType) -> usize {
        self.temps.push(ty);
        self.temps.len() - 1
    }

    fn new_label_id(&mut self) -> u32 {
        self.next_label += 1;
        self.next_label
    }

    fn label_id(&mut self, target: usize) -> u32 {
        match self.labels[target].id {
            Some(id) => id,
            None => {
                let id = self.new_label_id();
                self.labels[target].id = Some(id);
                id
            }
        }
    }

    fn result_temp(&mut self, target: usize, ty: ValueType) -> usize {
        match self.labels[target].temp {
            Some(temp) => temp,
            None => {
                let temp = self.new_temp(ty);
                self.labels[target].temp = Some(temp);
                temp
            }
        }
    }

    fn base(&self) -> usize {
        self.labels.last().map_or(0, |label| label.base)
    }

    fn require(&self, count: usize) -> Result<(), TranslateError> {
        if self.stack.len() < self.base() + count {
            return Err(self.invalid(format!("needs {} operands", count)));
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Expr, TranslateError> {
        self.require(1)?;
        self.stack.pop().ok_or_else(|| self.invalid("operand stack underflow"))
    }

    fn pop_typed(&mut self, ty: ValueType) -> Result<Expr, TranslateError> {
        let expr = self.pop()?;
        if expr.ty != ty {
            return Err(self.invalid(format!("expected {} operand, found {}", ty, expr.ty)));
        }
        Ok(expr)
    }

    fn peek_typed(&self, ty: ValueType) -> Result<&Expr, TranslateError> {
        self.require(1)?;
        match self.stack.last() {
            Some(expr) if expr.ty == ty => Ok(expr),
            Some(expr) => Err(self.invalid(format!("expected {} operand, found {}", ty, expr.ty))),
            None => Err(self.invalid("operand stack underflow")),
        }
    }

    /// Pops arguments for `params`, returning them in call order.
    fn pop_args(&mut self, params: &[ValueType]) -> Result<Vec<Expr>, TranslateError> {
        let mut args = vec![];
        for &param in params.iter().rev() {
            args.push(self.pop_typed(param)?);
        }
        args.reverse();
        Ok(args)
    }

    /// Evaluates the marked stack entries into temporaries, together with
    /// every entry below them that their evaluation, or the `hazard` that
    /// follows, would disturb. Temporaries are assigned in stack order.
    fn spill(&mut self, mut marked: Vec<bool>, mut hazard: Hazard) {
        for i in (0..self.stack.len()).rev() {
            if !marked[i] && hazard.conflicts(&self.stack[i]) {
                marked[i] = true;
            }
            if marked[i] {
                hazard.absorb(&self.stack[i]);
            }
        }
        for i in 0..self.stack.len() {
            if marked[i] && !self.stack[i].is_stable() {
                let ty = self.stack[i].ty;
                let temp = names::temp(self.new_temp(ty));
                let value = mem::replace(&mut self.stack[i], Expr::atom(temp.clone(), ty));
                self.emit(format!("{} = {};", temp, value.text));
            }
        }
    }

    fn settle(&mut self, hazard: Hazard) {
        let marked = vec![false; self.stack.len()];
        self.spill(marked, hazard);
    }

    fn spill_all(&mut self) {
        let marked = vec![true; self.stack.len()];
        self.spill(marked, Hazard::default());
    }

    /// C leaves the evaluation order of operands open, so when operands
    /// could observe each other all but the last are evaluated up front.
    fn order_operands(&mut self, count: usize) -> Result<(), TranslateError> {
        self.require(count)?;
        let start = self.stack.len() - count;
        let operands = &self.stack[start..];
        let effects = operands.iter().any(|expr| expr.effects);
        let stateful = operands.iter().filter(|expr| expr.depends_on_state()).count();
        if effects && stateful > 1 {
            let mut marked = vec![false; self.stack.len()];
            for i in start..self.stack.len() - 1 {
                marked[i] = self.stack[i].depends_on_state();
            }
            self.spill(marked, Hazard::default());
        }
        Ok(())
    }

    /// The rest of the current construct is unreachable.
    fn kill(&mut self) {
        self.dead = true;
        let base = self.base();
        self.stack.truncate(base);
    }

    fn index_immediate(&self, instruction: &Instruction) -> Result<u32, TranslateError> {
        instruction.index().ok_or_else(|| self.invalid("missing index immediate"))
    }

    fn depth_immediate(&self, instruction: &Instruction) -> Result<u32, TranslateError> {
        instruction.depth().ok_or_else(|| self.invalid("missing depth immediate"))
    }

    fn local_type(&self, index: u32) -> Result<ValueType, TranslateError> {
        self.locals
            .get(index as usize)
            .cloned()
            .ok_or_else(|| self.invalid(format!("no local {}", index)))
    }

    fn local_name(&self, index: u32) -> String {
        names::local(index, self.signature.params.len())
    }

    fn step(&mut self, instruction: &Instruction) -> Result<(), TranslateError> {
        self.op = instruction.op;
        if self.dead {
            return self.step_dead(instruction);
        }
        trace!("function {}: {}", self.index, instruction);
        match instruction.op {
            Opcode::Nop => {}
            Opcode::Unreachable => {
                self.settle(Hazard::leaving());
                self.emit("wasm_rt_trap(WASM_RT_TRAP_UNREACHABLE);");
                self.kill();
            }
            Opcode::Block | Opcode::Loop | Opcode::If => {
                let result = instruction.block_type().ok_or_else(|| self.invalid("missing block type"))?;
                self.open(instruction.op, result)?;
            }
            Opcode::Else => self.else_arm()?,
            Opcode::End => self.end()?,
            Opcode::Br => {
                let depth = self.depth_immediate(instruction)?;
                self.br(depth)?;
            }
            Opcode::BrIf => {
                let depth = self.depth_immediate(instruction)?;
                self.br_if(depth)?;
            }
            Opcode::BrTable => match instruction.immediate {
                Immediate::BranchTable(ref table) if table.targets.is_empty() => {
                    let index = self.pop_typed(ValueType::I32)?;
                    if index.effects {
                        self.settle(Hazard::of(&index));
                        self.emit(format!("(void){};", operand(&index.text)));
                    }
                    self.br(table.default)?;
                }
                Immediate::BranchTable(ref table) => {
                    return Err(self.unsupported(format!("br_table with {} targets", table.targets.len())));
                }
                _ => return Err(self.invalid("missing branch table")),
            },
            Opcode::Return => self.ret()?,
            Opcode::Call => {
                let index = self.index_immediate(instruction)?;
                self.call(index)?;
            }
            Opcode::CallIndirect => match instruction.immediate {
                Immediate::CallIndirect { type_index, .. } => self.call_indirect(type_index)?,
                _ => return Err(self.invalid("missing call_indirect immediate")),
            },
            Opcode::Drop => {
                let value = self.pop()?;
                if value.effects {
                    self.settle(Hazard::of(&value));
                    self.emit(format!("(void){};", operand(&value.text)));
                }
            }
            Opcode::Select => self.select()?,
            Opcode::GetLocal => {
                let index = self.index_immediate(instruction)?;
                let ty = self.local_type(index)?;
                let name = self.local_name(index);
                self.stack.push(Expr::local(index, name, ty));
            }
            Opcode::SetLocal | Opcode::TeeLocal => {
                let index = self.index_immediate(instruction)?;
                let ty = self.local_type(index)?;
                let value = self.pop_typed(ty)?;
                self.settle(Hazard {
                    local: Some(index),
                    ..Hazard::of(&value)
                });
                let name = self.local_name(index);
                self.emit(format!("{} = {};", name, value.text));
                if instruction.op == Opcode::TeeLocal {
                    self.stack.push(Expr::local(index, name, ty));
                }
            }
            Opcode::GetGlobal => {
                let index = self.index_immediate(instruction)?;
                let global = self
                    .module
                    .global_type(index)
                    .ok_or_else(|| self.invalid(format!("no global {}", index)))?;
                self.stack.push(Expr::global(self.names.global(index), global.content_type));
            }
            Opcode::SetGlobal => {
                let index = self.index_immediate(instruction)?;
                let global = self
                    .module
                    .global_type(index)
                    .ok_or_else(|| self.invalid(format!("no global {}", index)))?;
                if !global.mutability {
                    return Err(self.invalid(format!("global {} is immutable", index)));
                }
                let value = self.pop_typed(global.content_type)?;
                self.settle(Hazard::of(&value).and(Hazard {
                    writes_state: true,
                    ..Hazard::default()
                }));
                self.emit(format!("{} = {};", self.names.global(index), value.text));
            }
            Opcode::CurrentMemory => {
                self.stack.push(Expr::atom("wasm_rt_memory_size()", ValueType::I32).with_memory_read());
            }
            Opcode::GrowMemory => {
                let delta = self.pop_typed(ValueType::I32)?;
                let text = format!("wasm_rt_memory_grow({})", delta.text);
                self.stack.push(Expr::combine(text, ValueType::I32, &[&delta]).with_effects());
            }
            Opcode::I32Const | Opcode::I64Const | Opcode::F32Const | Opcode::F64Const => {
                let value = literal(instruction).ok_or_else(|| self.invalid("missing constant"))?;
                self.stack.push(value);
            }
            op if op.is_load() => {
                let memory = instruction.memory().ok_or_else(|| self.invalid("missing memory immediate"))?;
                let address = self.pop_typed(ValueType::I32)?;
                let text = format!("{}({}, {}u)", access_function(op), address.text, memory.offset);
                self.stack
                    .push(Expr::combine(text, access_type(op), &[&address]).with_memory_read());
            }
            op if op.is_store() => {
                let memory = instruction.memory().ok_or_else(|| self.invalid("missing memory immediate"))?;
                self.order_operands(2)?;
                let value = self.pop_typed(access_type(op))?;
                let address = self.pop_typed(ValueType::I32)?;
                self.settle(Hazard {
                    local: None,
                    writes_state: true,
                    reads_state: true,
                });
                self.emit(format!(
                    "{}({}, {}u, {});",
                    access_function(op),
                    address.text,
                    memory.offset,
                    value.text
                ));
            }
            op => {
                let lowering = lower(op).ok_or_else(|| self.unsupported(format!("no lowering for {}", op.name())))?;
                self.order_operands(lowering.arity)?;
                let mut operands = vec![];
                for _ in 0..lowering.arity {
                    operands.push(self.pop_typed(lowering.operand)?);
                }
                operands.reverse();
                let texts: Vec<&str> = operands.iter().map(|expr| expr.text.as_str()).collect();
                let text = render(lowering.template, &texts);
                let parts: Vec<&Expr> = operands.iter().collect();
                self.stack.push(Expr::combine(text, lowering.result, &parts));
            }
        }
        Ok(())
    }

    /// Skips unreachable instructions, keeping track of nesting so the
    /// construct that ends the dead region is found.
    fn step_dead(&mut self, instruction: &Instruction) -> Result<(), TranslateError> {
        let top_is_dead = self.labels.last().map_or(false, |label| label.kind == LabelKind::Dead);
        match instruction.op {
            op if op.opens_scope() => {
                let base = self.stack.len();
                self.labels.push(Label::new(LabelKind::Dead, None, base));
                Ok(())
            }
            Opcode::Else if top_is_dead => Ok(()),
            Opcode::Else => self.else_arm(),
            Opcode::End if top_is_dead => {
                self.labels.pop();
                Ok(())
            }
            Opcode::End => self.end(),
            _ => Ok(()),
        }
    }

    fn open(&mut self, op: Opcode, result: BlockType) -> Result<(), TranslateError> {
        let condition = if op == Opcode::If {
            Some(self.pop_typed(ValueType::I32)?)
        } else {
            None
        };
        // pending values must not be evaluated inside the construct
        self.spill_all();
        let mut label = Label::new(LabelKind::Block, result, self.stack.len());
        match op {
            Opcode::Loop => {
                let id = self.new_label_id();
                label.kind = LabelKind::Loop;
                label.id = Some(id);
                self.emit(format!("{}:;", names::label(id)));
                self.emit("{");
            }
            Opcode::If => {
                label.kind = LabelKind::If;
                label.if_line = self.lines.len();
                if let Some(ref condition) = condition {
                    self.emit(format!("if ({}) {{", condition.text));
                }
                label.condition = condition;
            }
            _ => self.emit("{"),
        }
        self.depth += 1;
        self.labels.push(label);
        Ok(())
    }

    /// Checks the values a construct leaves behind and takes its result.
    fn take_fallthrough(&mut self, base: usize, result: BlockType) -> Result<Option<Expr>, TranslateError> {
        let residual = self.stack.len().saturating_sub(base);
        let expected = if result.is_some() { 1 } else { 0 };
        if residual != expected {
            return Err(self.invalid(format!("construct leaves {} values instead of {}", residual, expected)));
        }
        match result {
            Some(ty) => self.pop_typed(ty).map(Some),
            None => Ok(None),
        }
    }

    fn else_arm(&mut self) -> Result<(), TranslateError> {
        let target = self.labels.len() - 1;
        if self.labels[target].kind != LabelKind::If {
            return Err(self.invalid("else outside of an if"));
        }
        let base = self.labels[target].base;
        let result = self.labels[target].result;
        let live = !self.dead;
        let value = if live { self.take_fallthrough(base, result)? } else { None };
        let pure = live && self.lines.len() == self.labels[target].if_line + 1;
        self.labels[target].then_live = live;
        if let (Some(value), Some(ty)) = (value, result) {
            if pure && self.labels[target].temp.is_none() {
                self.labels[target].then_value = Some(value);
            } else {
                let temp = self.result_temp(target, ty);
                self.emit(format!("{} = {};", names::temp(temp), value.text));
            }
        }
        self.stack.truncate(base);
        self.depth -= 1;
        self.labels[target].else_line = self.lines.len();
        self.emit("} else {");
        self.depth += 1;
        self.labels[target].kind = LabelKind::Else;
        self.dead = false;
        Ok(())
    }

    fn end(&mut self) -> Result<(), TranslateError> {
        let target = self.labels.len() - 1;
        if self.labels[target].kind == LabelKind::Function {
            return Err(self.invalid("end without an open construct"));
        }
        let base = self.labels[target].base;
        let result = self.labels[target].result;
        let live = !self.dead;
        let value = if live { self.take_fallthrough(base, result)? } else { None };
        self.stack.truncate(base);

        let kind = self.labels[target].kind;
        if kind == LabelKind::Else && self.try_fold(target, &value) {
            return Ok(());
        }

        let carried = match result {
            Some(ty) if kind == LabelKind::Else || self.labels[target].temp.is_some() => {
                let temp = self.result_temp(target, ty);
                if let Some(then_value) = self.labels[target].then_value.take() {
                    let line = format!("{}{} = {};", "  ".repeat(self.depth), names::temp(temp), then_value.text);
                    let at = self.labels[target].else_line;
                    self.lines.insert(at, line);
                }
                if let Some(ref value) = value {
                    self.emit(format!("{} = {};", names::temp(temp), value.text));
                }
                Some(Expr::atom(names::temp(temp), ty))
            }
            Some(_) => value,
            None => None,
        };

        self.depth -= 1;
        self.emit("}");
        let label = match self.labels.pop() {
            Some(label) => label,
            None => return Err(self.invalid("label stack underflow")),
        };
        if label.referenced && label.kind != LabelKind::Loop {
            if let Some(id) = label.id {
                self.emit(format!("{}:;", names::label(id)));
            }
        }

        let reachable = match label.kind {
            LabelKind::Loop => live,
            LabelKind::If => true,
            LabelKind::Else => live || label.then_live || label.referenced,
            _ => live || label.referenced,
        };
        if label.kind == LabelKind::If && result.is_some() {
            return Err(self.invalid("if without else cannot produce a value"));
        }
        self.dead = !reachable;
        if reachable {
            if let Some(ty) = result {
                let value = carried.ok_or_else(|| self.invalid(format!("no {} result reaches the end", ty)))?;
                self.stack.push(value);
            }
        }
        Ok(())
    }

    /// Folds an if/else whose arms only compute a value into `c ? a : b`.
    fn try_fold(&mut self, target: usize, value: &Option<Expr>) -> bool {
        let label = &self.labels[target];
        let foldable = label.result.is_some()
            && label.then_value.is_some()
            && value.is_some()
            && label.temp.is_none()
            && !label.referenced
            && self.lines.len() == label.else_line + 1;
        if !foldable {
            return false;
        }
        let label = match self.labels.pop() {
            Some(label) => label,
            None => return false,
        };
        let (condition, then_value, else_value) = match (label.condition, label.then_value, value) {
            (Some(condition), Some(then_value), Some(else_value)) => (condition, then_value, else_value),
            _ => return false,
        };
        self.lines.truncate(label.if_line);
        self.depth -= 1;
        let text = format!(
            "({} ? {} : {})",
            operand(&condition.text),
            operand(&then_value.text),
            operand(&else_value.text)
        );
        let ty = then_value.ty;
        self.stack
            .push(Expr::combine(text, ty, &[&condition, &then_value, else_value]));
        self.dead = false;
        true
    }

    fn resolve(&self, depth: u32) -> Result<usize, TranslateError> {
        let depth = depth as usize;
        if depth >= self.labels.len() {
            return Err(self.invalid(format!("branch depth {} is out of range", depth)));
        }
        Ok(self.labels.len() - 1 - depth)
    }

    fn br(&mut self, depth: u32) -> Result<(), TranslateError> {
        let target = self.resolve(depth)?;
        let kind = self.labels[target].kind;
        match kind {
            LabelKind::Function => return self.ret(),
            LabelKind::Loop => self.settle(Hazard::leaving()),
            _ => match self.labels[target].result {
                Some(ty) => {
                    let value = self.pop_typed(ty)?;
                    self.settle(Hazard::of(&value).and(Hazard::leaving()));
                    let temp = self.result_temp(target, ty);
                    self.emit(format!("{} = {};", names::temp(temp), value.text));
                }
                None => self.settle(Hazard::leaving()),
            },
        }
        let id = self.label_id(target);
        self.labels[target].referenced = true;
        self.emit(format!("goto {};", names::label(id)));
        self.kill();
        Ok(())
    }

    fn br_if(&mut self, depth: u32) -> Result<(), TranslateError> {
        let condition = self.pop_typed(ValueType::I32)?;
        let target = self.resolve(depth)?;
        // pending calls must happen whether or not the branch is taken
        self.settle(Hazard::of(&condition).and(Hazard::leaving()));
        let kind = self.labels[target].kind;
        let result = if kind == LabelKind::Loop {
            None
        } else {
            self.labels[target].result
        };
        let carried = match result {
            Some(ty) => Some(self.peek_typed(ty)?.text.clone()),
            None => None,
        };
        if kind == LabelKind::Function {
            match carried {
                Some(value) => self.emit(format!("if ({}) return {};", condition.text, value)),
                None => self.emit(format!("if ({}) return;", condition.text)),
            }
            return Ok(());
        }
        let id = self.label_id(target);
        self.labels[target].referenced = true;
        match (carried, result) {
            (Some(value), Some(ty)) => {
                let temp = names::temp(self.result_temp(target, ty));
                self.emit(format!(
                    "if ({}) {{ {} = {}; goto {}; }}",
                    condition.text,
                    temp,
                    value,
                    names::label(id)
                ));
            }
            _ => self.emit(format!("if ({}) goto {};", condition.text, names::label(id))),
        }
        Ok(())
    }

    fn ret(&mut self) -> Result<(), TranslateError> {
        match self.signature.result {
            Some(ty) => {
                let value = self.pop_typed(ty)?;
                self.settle(Hazard::of(&value).and(Hazard::leaving()));
                self.emit(format!("return {};", value.text));
            }
            None => {
                self.settle(Hazard::leaving());
                self.emit("return;");
            }
        }
        self.kill();
        Ok(())
    }

    fn call(&mut self, index: u32) -> Result<(), TranslateError> {
        let func_type = self
            .module
            .function_type(index)
            .cloned()
            .ok_or_else(|| self.invalid(format!("call to missing function {}", index)))?;
        self.order_operands(func_type.params.len())?;
        let args = self.pop_args(&func_type.params)?;
        let text = format!(
            "{}({})",
            self.names.function(index),
            args.iter().map(|arg| arg.text.as_str()).collect::<Vec<_>>().join(", ")
        );
        let parts: Vec<&Expr> = args.iter().collect();
        match func_type.result {
            Some(ty) => self.stack.push(Expr::combine(text, ty, &parts).with_effects()),
            None => {
                self.settle(Hazard {
                    local: None,
                    writes_state: true,
                    reads_state: true,
                });
                self.emit(format!("{};", text));
            }
        }
        Ok(())
    }

    /// Indirect calls keep the stack balanced but always trap.
    fn call_indirect(&mut self, type_index: u32) -> Result<(), TranslateError> {
        let func_type = self
            .module
            .types
            .get(type_index as usize)
            .cloned()
            .ok_or_else(|| self.invalid(format!("call_indirect to missing type {}", type_index)))?;
        let callee = self.pop_typed(ValueType::I32)?;
        let mut operands = self.pop_args(&func_type.params)?;
        operands.push(callee);
        self.settle(Hazard::leaving());
        for operand_expr in operands.iter().filter(|expr| expr.effects) {
            self.emit(format!("(void){};", operand(&operand_expr.text)));
        }
        self.emit("wasm_rt_trap(WASM_RT_TRAP_INDIRECT_CALL);");
        if let Some(ty) = func_type.result {
            self.stack.push(Expr::atom(ty.zero(), ty));
        }
        Ok(())
    }

    fn select(&mut self) -> Result<(), TranslateError> {
        self.require(3)?;
        // both values are evaluated whichever one is picked
        let len = self.stack.len();
        let mut marked = vec![false; len];
        marked[len - 3] = true;
        marked[len - 2] = true;
        self.spill(marked, Hazard::default());
        let condition = self.pop_typed(ValueType::I32)?;
        let second = self.pop()?;
        let first = self.pop_typed(second.ty)?;
        let text = format!(
            "({} ? {} : {})",
            operand(&condition.text),
            operand(&first.text),
            operand(&second.text)
        );
        self.stack
            .push(Expr::combine(text, first.ty, &[&condition, &first, &second]));
        Ok(())
    }

    fn finish(mut self) -> Result<String, TranslateError> {
        self.op = Opcode::End;
        if self.labels.len() != 1 {
            return Err(self.invalid(format!("{} constructs left open", self.labels.len() - 1)));
        }
        if !self.dead {
            match self.signature.result {
                Some(ty) => {
                    if self.stack.len() != 1 {
                        return Err(self.invalid(format!("body leaves {} values instead of 1", self.stack.len())));
                    }
                    let value = self.pop_typed(ty)?;
                    self.emit(format!("return {};", value.text));
                }
                None => {
                    if !self.stack.is_empty() {
                        return Err(self.invalid(format!("body leaves {} values instead of 0", self.stack.len())));
                    }
                }
            }
        }

        let name = self.names.function(self.index);
        let storage = if self.names.is_exported(ExternalKind::Function, self.index) {
            ""
        } else {
            "static "
        };
        let mut out = format!("{}{} {{\n", storage, c_signature(&name, self.signature, true));
        let params = self.signature.params.len();
        for (i, local) in self.locals.iter().enumerate().skip(params) {
            out += &format!("  {} {} = {};\n", local.c_type(), names::local(i as u32, params), local.zero());
        }
        for (i, temp) in self.temps.iter().enumerate() {
            out += &format!("  {} {} = {};\n", temp.c_type(), names::temp(i), temp.zero());
        }
        for line in &self.lines {
            out += line;
            out.push('\n');
        }
        out += "}\n";
        Ok(out)
    }
}
