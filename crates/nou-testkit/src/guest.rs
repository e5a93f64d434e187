//! Modules shaped like the output of the `u` compiler.

use nou_abi::names::{GET_INT, GET_STR, HOST_MODULE, LOG_INT, LOG_STR, MEMORY_EXPORT};
use nou_abi::{decode, encode, Slice};
use wasm_encoder::{
    CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection, Function,
    FunctionSection, ImportSection, Instruction, MemorySection, MemoryType, Module, TypeSection,
    ValType,
};

// ── Imported function indices ────────────────────────────────────────────────

const IMPORT_LOG_INT: u32 = 0;
const IMPORT_LOG_STR: u32 = 1;
const IMPORT_GET_INT: u32 = 2;
const IMPORT_GET_STR: u32 = 3;
const IMPORT_COUNT: u32 = 4;

// ── Type indices ─────────────────────────────────────────────────────────────

const TYPE_I32_VOID: u32 = 0;
const TYPE_I64_VOID: u32 = 1;
const TYPE_I32_I32: u32 = 2;
const TYPE_I64_I64: u32 = 3;
const TYPE_VOID_VOID: u32 = 4;

const DATA_START: u32 = 256;

#[derive(Debug, Clone)]
enum Op {
    LogInt(i32),
    LogSum(i32, i32),
    LogSlice(u64),
    EchoInt(i32),
    EchoStr(Slice),
    DivideByZero,
    Trap,
}

/// Builder for a NoU-style guest module.
#[derive(Debug, Clone)]
pub struct GuestProgram {
    ops: Vec<Op>,
    data: Vec<u8>,
    entry_name: Option<String>,
    entry_takes_param: bool,
    export_memory: bool,
}

impl Default for GuestProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl GuestProgram {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            data: Vec::new(),
            entry_name: Some("run".to_string()),
            entry_takes_param: false,
            export_memory: true,
        }
    }

    fn intern(&mut self, bytes: &[u8]) -> Slice {
        let pointer = DATA_START + self.data.len() as u32;
        self.data.extend_from_slice(bytes);
        Slice::new(bytes.len() as u32, pointer)
    }

    /// `log_int(value)`
    pub fn log_int(mut self, value: i32) -> Self {
        self.ops.push(Op::LogInt(value));
        self
    }

    /// `log_int(a + b)`
    pub fn log_sum(mut self, a: i32, b: i32) -> Self {
        self.ops.push(Op::LogSum(a, b));
        self
    }

    /// `log_str(text)` with `text` placed in the data segment.
    pub fn log_str(mut self, text: &str) -> Self {
        let slice = self.intern(text.as_bytes());
        self.ops.push(Op::LogSlice(slice.encode()));
        self
    }

    /// `log_str` with an arbitrary packed slice.
    pub fn log_raw_slice(mut self, packed: u64) -> Self {
        self.ops.push(Op::LogSlice(packed));
        self
    }

    /// `log_int(get_int(default))`
    pub fn echo_int(mut self, default: i32) -> Self {
        self.ops.push(Op::EchoInt(default));
        self
    }

    /// `log_str(get_str(buffer))` where `buffer` holds `capacity` bytes
    /// starting with `default` and zero-padded.
    pub fn echo_str(mut self, capacity: u32, default: &str) -> Self {
        let mut buffer = default.as_bytes().to_vec();
        buffer.resize(capacity.max(default.len() as u32) as usize, 0);
        let slice = self.intern(&buffer);
        self.ops.push(Op::EchoStr(slice));
        self
    }

    /// `get_str` with an arbitrary packed slice, result logged.
    pub fn echo_raw_slice(mut self, packed: u64) -> Self {
        self.ops.push(Op::EchoStr(decode(packed)));
        self
    }

    /// `log_int(1 / 0)`
    pub fn divide_by_zero(mut self) -> Self {
        self.ops.push(Op::DivideByZero);
        self
    }

    /// Execute `unreachable`.
    pub fn trap(mut self) -> Self {
        self.ops.push(Op::Trap);
        self
    }

    /// Export the entry point under `name` instead of `run`.
    pub fn entry_name(mut self, name: &str) -> Self {
        self.entry_name = Some(name.to_string());
        self
    }

    /// Do not export any entry point.
    pub fn without_entry_point(mut self) -> Self {
        self.entry_name = None;
        self
    }

    /// Give the entry point an `i32` parameter.
    pub fn entry_with_param(mut self) -> Self {
        self.entry_takes_param = true;
        self
    }

    pub fn without_memory_export(mut self) -> Self {
        self.export_memory = false;
        self
    }

    /// Assemble the module.
    pub fn build(&self) -> Vec<u8> {
        let mut module = Module::new();

        let mut types = TypeSection::new();
        types.ty().function(vec![ValType::I32], vec![]);
        types.ty().function(vec![ValType::I64], vec![]);
        types.ty().function(vec![ValType::I32], vec![ValType::I32]);
        types.ty().function(vec![ValType::I64], vec![ValType::I64]);
        types.ty().function(vec![], vec![]);
        module.section(&types);

        let mut imports = ImportSection::new();
        imports.import(HOST_MODULE, LOG_INT, EntityType::Function(TYPE_I32_VOID));
        imports.import(HOST_MODULE, LOG_STR, EntityType::Function(TYPE_I64_VOID));
        imports.import(HOST_MODULE, GET_INT, EntityType::Function(TYPE_I32_I32));
        imports.import(HOST_MODULE, GET_STR, EntityType::Function(TYPE_I64_I64));
        module.section(&imports);

        let mut functions = FunctionSection::new();
        let entry_type = if self.entry_takes_param {
            TYPE_I32_VOID
        } else {
            TYPE_VOID_VOID
        };
        functions.function(entry_type);
        module.section(&functions);

        let mut memory = MemorySection::new();
        memory.memory(MemoryType {
            minimum: 1,
            maximum: None,
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        module.section(&memory);

        let mut exports = ExportSection::new();
        if self.export_memory {
            exports.export(MEMORY_EXPORT, ExportKind::Memory, 0);
        }
        if let Some(name) = &self.entry_name {
            exports.export(name, ExportKind::Func, IMPORT_COUNT);
        }
        module.section(&exports);

        let mut codes = CodeSection::new();
        codes.function(&self.emit_entry());
        module.section(&codes);

        let mut data = DataSection::new();
        data.active(0, &ConstExpr::i32_const(DATA_START as i32), self.data.clone());
        module.section(&data);

        module.finish()
    }

    fn emit_entry(&self) -> Function {
        let mut f = Function::new(vec![]);
        for op in &self.ops {
            match *op {
                Op::LogInt(value) => {
                    f.instruction(&Instruction::I32Const(value));
                    f.instruction(&Instruction::Call(IMPORT_LOG_INT));
                }
                Op::LogSum(a, b) => {
                    f.instruction(&Instruction::I32Const(a));
                    f.instruction(&Instruction::I32Const(b));
                    f.instruction(&Instruction::I32Add);
                    f.instruction(&Instruction::Call(IMPORT_LOG_INT));
                }
                Op::LogSlice(packed) => {
                    f.instruction(&Instruction::I64Const(packed as i64));
                    f.instruction(&Instruction::Call(IMPORT_LOG_STR));
                }
                Op::EchoInt(default) => {
                    f.instruction(&Instruction::I32Const(default));
                    f.instruction(&Instruction::Call(IMPORT_GET_INT));
                    f.instruction(&Instruction::Call(IMPORT_LOG_INT));
                }
                Op::EchoStr(slice) => {
                    let packed = encode(slice.length, slice.pointer) as i64;
                    f.instruction(&Instruction::I64Const(packed));
                    f.instruction(&Instruction::Call(IMPORT_GET_STR));
                    f.instruction(&Instruction::Call(IMPORT_LOG_STR));
                }
                Op::DivideByZero => {
                    f.instruction(&Instruction::I32Const(1));
                    f.instruction(&Instruction::I32Const(0));
                    f.instruction(&Instruction::I32DivS);
                    f.instruction(&Instruction::Call(IMPORT_LOG_INT));
                }
                Op::Trap => {
                    f.instruction(&Instruction::Unreachable);
                }
            }
        }
        f.instruction(&Instruction::End);
        f
    }
}

/// A module whose only content is one function import and a `run` export
/// calling nothing. Used to exercise import-shape checks.
pub fn module_importing(
    module_name: &str,
    name: &str,
    params: &[ValType],
    results: &[ValType],
) -> Vec<u8> {
    let mut module = Module::new();

    let mut types = TypeSection::new();
    types.ty().function(params.to_vec(), results.to_vec());
    types.ty().function(vec![], vec![]);
    module.section(&types);

    let mut imports = ImportSection::new();
    imports.import(module_name, name, EntityType::Function(0));
    module.section(&imports);

    let mut functions = FunctionSection::new();
    functions.function(1);
    module.section(&functions);

    let mut exports = ExportSection::new();
    exports.export("run", ExportKind::Func, 1);
    module.section(&exports);

    let mut codes = CodeSection::new();
    let mut f = Function::new(vec![]);
    f.instruction(&Instruction::End);
    codes.function(&f);
    module.section(&codes);

    module.finish()
}
