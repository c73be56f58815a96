use crate::parse_tree::language_types::ValueType::{self, F32, F64, I32, I64};
use crate::parse_tree::operations::Opcode;

/// How a numeric, comparison or conversion opcode is spelled in C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lowering {
    pub operand: ValueType,
    pub arity: usize,
    pub result: ValueType,
    pub template: &'static str,
}

fn unary(operand: ValueType, result: ValueType, template: &'static str) -> Option<Lowering> {
    Some(Lowering {
        operand,
        arity: 1,
        result,
        template,
    })
}

fn binary(operand: ValueType, result: ValueType, template: &'static str) -> Option<Lowering> {
    Some(Lowering {
        operand,
        arity: 2,
        result,
        template,
    })
}

pub fn lower(op: Opcode) -> Option<Lowering> {
    match op {
        Opcode::I32Eqz => unary(I32, I32, "(int32_t)($a == 0)"),
        Opcode::I32Eq => binary(I32, I32, "(int32_t)($a == $b)"),
        Opcode::I32Ne => binary(I32, I32, "(int32_t)($a != $b)"),
        Opcode::I32LtS => binary(I32, I32, "(int32_t)($a < $b)"),
        Opcode::I32LtU => binary(I32, I32, "(int32_t)((uint32_t)$a < (uint32_t)$b)"),
        Opcode::I32GtS => binary(I32, I32, "(int32_t)($a > $b)"),
        Opcode::I32GtU => binary(I32, I32, "(int32_t)((uint32_t)$a > (uint32_t)$b)"),
        Opcode::I32LeS => binary(I32, I32, "(int32_t)($a <= $b)"),
        Opcode::I32LeU => binary(I32, I32, "(int32_t)((uint32_t)$a <= (uint32_t)$b)"),
        Opcode::I32GeS => binary(I32, I32, "(int32_t)($a >= $b)"),
        Opcode::I32GeU => binary(I32, I32, "(int32_t)((uint32_t)$a >= (uint32_t)$b)"),
        Opcode::I64Eqz => unary(I64, I32, "(int32_t)($a == 0)"),
        Opcode::I64Eq => binary(I64, I32, "(int32_t)($a == $b)"),
        Opcode::I64Ne => binary(I64, I32, "(int32_t)($a != $b)"),
        Opcode::I64LtS => binary(I64, I32, "(int32_t)($a < $b)"),
        Opcode::I64LtU => binary(I64, I32, "(int32_t)((uint64_t)$a < (uint64_t)$b)"),
        Opcode::I64GtS => binary(I64, I32, "(int32_t)($a > $b)"),
        Opcode::I64GtU => binary(I64, I32, "(int32_t)((uint64_t)$a > (uint64_t)$b)"),
        Opcode::I64LeS => binary(I64, I32, "(int32_t)($a <= $b)"),
        Opcode::I64LeU => binary(I64, I32, "(int32_t)((uint64_t)$a <= (uint64_t)$b)"),
        Opcode::I64GeS => binary(I64, I32, "(int32_t)($a >= $b)"),
        Opcode::I64GeU => binary(I64, I32, "(int32_t)((uint64_t)$a >= (uint64_t)$b)"),
        Opcode::F32Eq => binary(F32, I32, "(int32_t)($a == $b)"),
        Opcode::F32Ne => binary(F32, I32, "(int32_t)($a != $b)"),
        Opcode::F32Lt => binary(F32, I32, "(int32_t)($a < $b)"),
        Opcode::F32Gt => binary(F32, I32, "(int32_t)($a > $b)"),
        Opcode::F32Le => binary(F32, I32, "(int32_t)($a <= $b)"),
        Opcode::F32Ge => binary(F32, I32, "(int32_t)($a >= $b)"),
        Opcode::F64Eq => binary(F64, I32, "(int32_t)($a == $b)"),
        Opcode::F64Ne => binary(F64, I32, "(int32_t)($a != $b)"),
        Opcode::F64Lt => binary(F64, I32, "(int32_t)($a < $b)"),
        Opcode::F64Gt => binary(F64, I32, "(int32_t)($a > $b)"),
        Opcode::F64Le => binary(F64, I32, "(int32_t)($a <= $b)"),
        Opcode::F64Ge => binary(F64, I32, "(int32_t)($a >= $b)"),

        Opcode::I32Clz => unary(I32, I32, "wasm_rt_i32_clz($a)"),
        Opcode::I32Ctz => unary(I32, I32, "wasm_rt_i32_ctz($a)"),
        Opcode::I32Popcnt => unary(I32, I32, "wasm_rt_i32_popcnt($a)"),
        Opcode::I32Add => binary(I32, I32, "(int32_t)((uint32_t)$a + (uint32_t)$b)"),
        Opcode::I32Sub => binary(I32, I32, "(int32_t)((uint32_t)$a - (uint32_t)$b)"),
        Opcode::I32Mul => binary(I32, I32, "(int32_t)((uint32_t)$a * (uint32_t)$b)"),
        Opcode::I32DivS => binary(I32, I32, "($a / $b)"),
        Opcode::I32DivU => binary(I32, I32, "(int32_t)((uint32_t)$a / (uint32_t)$b)"),
        Opcode::I32RemS => binary(I32, I32, "($a % $b)"),
        Opcode::I32RemU => binary(I32, I32, "(int32_t)((uint32_t)$a % (uint32_t)$b)"),
        Opcode::I32And => binary(I32, I32, "($a & $b)"),
        Opcode::I32Or => binary(I32, I32, "($a | $b)"),
        Opcode::I32Xor => binary(I32, I32, "($a ^ $b)"),
        Opcode::I32Shl => binary(I32, I32, "(int32_t)((uint32_t)$a << ($b & 31))"),
        Opcode::I32ShrS => binary(I32, I32, "($a >> ($b & 31))"),
        Opcode::I32ShrU => binary(I32, I32, "(int32_t)((uint32_t)$a >> ($b & 31))"),
        Opcode::I32Rotl => binary(I32, I32, "wasm_rt_i32_rotl($a, $b)"),
        Opcode::I32Rotr => binary(I32, I32, "wasm_rt_i32_rotr($a, $b)"),
        Opcode::I64Clz => unary(I64, I64, "wasm_rt_i64_clz($a)"),
        Opcode::I64Ctz => unary(I64, I64, "wasm_rt_i64_ctz($a)"),
        Opcode::I64Popcnt => unary(I64, I64, "wasm_rt_i64_popcnt($a)"),
        Opcode::I64Add => binary(I64, I64, "(int64_t)((uint64_t)$a + (uint64_t)$b)"),
        Opcode::I64Sub => binary(I64, I64, "(int64_t)((uint64_t)$a - (uint64_t)$b)"),
        Opcode::I64Mul => binary(I64, I64, "(int64_t)((uint64_t)$a * (uint64_t)$b)"),
        Opcode::I64DivS => binary(I64, I64, "($a / $b)"),
        Opcode::I64DivU => binary(I64, I64, "(int64_t)((uint64_t)$a / (uint64_t)$b)"),
        Opcode::I64RemS => binary(I64, I64, "($a % $b)"),
        Opcode::I64RemU => binary(I64, I64, "(int64_t)((uint64_t)$a % (uint64_t)$b)"),
        Opcode::I64And => binary(I64, I64, "($a & $b)"),
        Opcode::I64Or => binary(I64, I64, "($a | $b)"),
        Opcode::I64Xor => binary(I64, I64, "($a ^ $b)"),
        Opcode::I64Shl => binary(I64, I64, "(int64_t)((uint64_t)$a << ($b & 63))"),
        Opcode::I64ShrS => binary(I64, I64, "($a >> ($b & 63))"),
        Opcode::I64ShrU => binary(I64, I64, "(int64_t)((uint64_t)$a >> ($b & 63))"),
        Opcode::I64Rotl => binary(I64, I64, "wasm_rt_i64_rotl($a, $b)"),
        Opcode::I64Rotr => binary(I64, I64, "wasm_rt_i64_rotr($a, $b)"),

        Opcode::F32Abs => unary(F32, F32, "fabsf($a)"),
        Opcode::F32Neg => unary(F32, F32, "(-$a)"),
        Opcode::F32Ceil => unary(F32, F32, "ceilf($a)"),
        Opcode::F32Floor => unary(F32, F32, "floorf($a)"),
        Opcode::F32Trunc => unary(F32, F32, "truncf($a)"),
        Opcode::F32Nearest => unary(F32, F32, "nearbyintf($a)"),
        Opcode::F32Sqrt => unary(F32, F32, "sqrtf($a)"),
        Opcode::F32Add => binary(F32, F32, "($a + $b)"),
        Opcode::F32Sub => binary(F32, F32, "($a - $b)"),
        Opcode::F32Mul => binary(F32, F32, "($a * $b)"),
        Opcode::F32Div => binary(F32, F32, "($a / $b)"),
        Opcode::F32Min => binary(F32, F32, "wasm_rt_f32_min($a, $b)"),
        Opcode::F32Max => binary(F32, F32, "wasm_rt_f32_max($a, $b)"),
        Opcode::F32Copysign => binary(F32, F32, "copysignf($a, $b)"),
        Opcode::F64Abs => unary(F64, F64, "fabs($a)"),
        Opcode::F64Neg => unary(F64, F64, "(-$a)"),
        Opcode::F64Ceil => unary(F64, F64, "ceil($a)"),
        Opcode::F64Floor => unary(F64, F64, "floor($a)"),
        Opcode::F64Trunc => unary(F64, F64, "trunc($a)"),
        Opcode::F64Nearest => unary(F64, F64, "nearbyint($a)"),
        Opcode::F64Sqrt => unary(F64, F64, "sqrt($a)"),
        Opcode::F64Add => binary(F64, F64, "($a + $b)"),
        Opcode::F64Sub => binary(F64, F64, "($a - $b)"),
        Opcode::F64Mul => binary(F64, F64, "($a * $b)"),
        Opcode::F64Div => binary(F64, F64, "($a / $b)"),
        Opcode::F64Min => binary(F64, F64, "wasm_rt_f64_min($a, $b)"),
        Opcode::F64Max => binary(F64, F64, "wasm_rt_f64_max($a, $b)"),
        Opcode::F64Copysign => binary(F64, F64, "copysign($a, $b)"),

        Opcode::I32WrapI64 => unary(I64, I32, "(int32_t)(uint32_t)$a"),
        Opcode::I32TruncSF32 => unary(F32, I32, "(int32_t)$a"),
        Opcode::I32TruncUF32 => unary(F32, I32, "(int32_t)(uint32_t)$a"),
        Opcode::I32TruncSF64 => unary(F64, I32, "(int32_t)$a"),
        Opcode::I32TruncUF64 => unary(F64, I32, "(int32_t)(uint32_t)$a"),
        Opcode::I64ExtendSI32 => unary(I32, I64, "(int64_t)$a"),
        Opcode::I64ExtendUI32 => unary(I32, I64, "(int64_t)(uint32_t)$a"),
        Opcode::I64TruncSF32 => unary(F32, I64, "(int64_t)$a"),
        Opcode::I64TruncUF32 => unary(F32, I64, "(int64_t)(uint64_t)$a"),
        Opcode::I64TruncSF64 => unary(F64, I64, "(int64_t)$a"),
        Opcode::I64TruncUF64 => unary(F64, I64, "(int64_t)(uint64_t)$a"),
        Opcode::F32ConvertSI32 => unary(I32, F32, "(float)$a"),
        Opcode::F32ConvertUI32 => unary(I32, F32, "(float)(uint32_t)$a"),
        Opcode::F32ConvertSI64 => unary(I64, F32, "(float)$a"),
        Opcode::F32ConvertUI64 => unary(I64, F32, "(float)(uint64_t)$a"),
        Opcode::F32DemoteF64 => unary(F64, F32, "(float)$a"),
        Opcode::F64ConvertSI32 => unary(I32, F64, "(double)$a"),
        Opcode::F64ConvertUI32 => unary(I32, F64, "(double)(uint32_t)$a"),
        Opcode::F64ConvertSI64 => unary(I64, F64, "(double)$a"),
        Opcode::F64ConvertUI64 => unary(I64, F64, "(double)(uint64_t)$a"),
        Opcode::F64PromoteF32 => unary(F32, F64, "(double)$a"),

        Opcode::I32ReinterpretF32 => unary(F32, I32, "wasm_rt_i32_reinterpret_f32($a)"),
        Opcode::I64ReinterpretF64 => unary(F64, I64, "wasm_rt_i64_reinterpret_f64($a)"),
        Opcode::F32ReinterpretI32 => unary(I32, F32, "wasm_rt_f32_reinterpret_i32($a)"),
        Opcode::F64ReinterpretI64 => unary(I64, F64, "wasm_rt_f64_reinterpret_i64($a)"),
        _ => None,
    }
}

/// Type a load produces or a store consumes, read off the opcode name.
pub fn access_type(op: Opcode) -> ValueType {
    let name = op.name();
    if name.starts_with("i64") {
        I64
    } else if name.starts_with("f32") {
        F32
    } else if name.starts_with("f64") {
        F64
    } else {
        I32
    }
}

/// Runtime function performing a load or store.
pub fn access_function(op: Opcode) -> String {
    format!("wasm_rt_{}", op.name().replace('.', "_"))
}
