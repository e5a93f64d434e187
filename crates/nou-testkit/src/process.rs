//! Scripted WASI command modules.

use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection,
    Function, FunctionSection, ImportSection, Instruction, MemorySection, MemoryType, Module,
    TypeSection, ValType,
};

use crate::memarg;

const WASI: &str = "wasi_snapshot_preview1";

// ── Imported function indices ────────────────────────────────────────────────

const FD_WRITE: u32 = 0;
const FD_READ: u32 = 1;
const PATH_OPEN: u32 = 2;
const FD_CLOSE: u32 = 3;
const PROC_EXIT: u32 = 4;
const ARGS_SIZES_GET: u32 = 5;
const ARGS_GET: u32 = 6;
const FD_SEEK: u32 = 7;
const IMPORT_COUNT: u32 = 8;

// ── Memory map ───────────────────────────────────────────────────────────────

const NWRITTEN: i32 = 8;
const FD_SLOT: i32 = 12;
const IOVEC: i32 = 16;
const ARGC: i32 = 24;
const ARGV_BUF_SIZE: i32 = 28;
const NEW_OFFSET: i32 = 40;
const ARGV_PTRS: i32 = 64;
const DATA_START: u32 = 1024;
const SCRATCH: i32 = 32_768;
const SCRATCH_LEN: i32 = 16_384;
const ARGV_BUF: i32 = 49_152;

const OFLAGS_CREAT_TRUNC: i32 = 1 | 8;
const RIGHTS_READ: i64 = 1 << 1;
const RIGHTS_WRITE: i64 = 1 << 6;

/// Origin for [`WasiProcess::write_file_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    End,
}

impl Whence {
    fn code(self) -> i32 {
        match self {
            Self::Set => 0,
            Self::End => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bytes {
    ptr: i32,
    len: i32,
}

#[derive(Debug, Clone)]
enum Step {
    Write { fd: i32, bytes: Bytes },
    EchoFile {
        path: Bytes,
        fd: i32,
        missing: Bytes,
    },
    WriteFile {
        path: Bytes,
        bytes: Bytes,
        missing: Bytes,
    },
    WriteFileAt {
        path: Bytes,
        whence: Whence,
        offset: i64,
        bytes: Bytes,
        missing: Bytes,
    },
    EchoArgs,
    RejectIfFirstByte {
        path: Bytes,
        byte: u8,
        message: Bytes,
        code: i32,
        missing: Bytes,
    },
    Exit(i32),
    Trap,
}

/// Builder for a WASI command whose `_start` executes steps in order.
#[derive(Debug, Clone, Default)]
pub struct WasiProcess {
    steps: Vec<Step>,
    data: Vec<u8>,
    export_start: bool,
}

impl WasiProcess {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            data: Vec::new(),
            export_start: true,
        }
    }

    fn intern(&mut self, bytes: &[u8]) -> Bytes {
        let ptr = DATA_START as usize + self.data.len();
        self.data.extend_from_slice(bytes);
        Bytes {
            ptr: ptr as i32,
            len: bytes.len() as i32,
        }
    }

    fn missing(&mut self, path: &str) -> Bytes {
        self.intern(format!("cannot open {path}\n").as_bytes())
    }

    /// Write `text` to stdout.
    pub fn stdout(mut self, text: &str) -> Self {
        let bytes = self.intern(text.as_bytes());
        self.steps.push(Step::Write { fd: 1, bytes });
        self
    }

    /// Write `text` to stderr.
    pub fn stderr(mut self, text: &str) -> Self {
        let bytes = self.intern(text.as_bytes());
        self.steps.push(Step::Write { fd: 2, bytes });
        self
    }

    /// Copy the contents of file `path` to `fd`; exit 2 if it cannot be opened.
    pub fn echo_file(mut self, path: &str, fd: i32) -> Self {
        let missing = self.missing(path);
        let path = self.intern(path.as_bytes());
        self.steps.push(Step::EchoFile { path, fd, missing });
        self
    }

    /// Create or truncate `path` and write `bytes` into it.
    pub fn write_file(mut self, path: &str, bytes: &[u8]) -> Self {
        let missing = self.missing(path);
        let path = self.intern(path.as_bytes());
        let bytes = self.intern(bytes);
        self.steps.push(Step::WriteFile {
            path,
            bytes,
            missing,
        });
        self
    }

    /// Create or truncate `path`, seek to `offset`, and write `bytes` there.
    ///
    /// The write is skipped when the seek is refused; a refused write is
    /// ignored.
    pub fn write_file_at(
        mut self,
        path: &str,
        whence: Whence,
        offset: i64,
        bytes: &[u8],
    ) -> Self {
        let missing = self.missing(path);
        let path = self.intern(path.as_bytes());
        let bytes = self.intern(bytes);
        self.steps.push(Step::WriteFileAt {
            path,
            whence,
            offset,
            bytes,
            missing,
        });
        self
    }

    /// Write the raw argv buffer (NUL-separated) to stdout.
    pub fn echo_args(mut self) -> Self {
        self.steps.push(Step::EchoArgs);
        self
    }

    /// If the first byte of `path` is `byte`, print `message` to stderr and exit.
    pub fn reject_if_first_byte(mut self, path: &str, byte: u8, message: &str, code: i32) -> Self {
        let missing = self.missing(path);
        let path = self.intern(path.as_bytes());
        let message = self.intern(message.as_bytes());
        self.steps.push(Step::RejectIfFirstByte {
            path,
            byte,
            message,
            code,
            missing,
        });
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.steps.push(Step::Exit(code));
        self
    }

    /// Execute `unreachable`.
    pub fn trap(mut self) -> Self {
        self.steps.push(Step::Trap);
        self
    }

    /// Leave `_start` unexported.
    pub fn without_start(mut self) -> Self {
        self.export_start = false;
        self
    }

    /// Assemble the module.
    pub fn build(&self) -> Vec<u8> {
        let mut module = Module::new();

        let mut types = TypeSection::new();
        // 0: fd_write / fd_read
        types.ty().function(vec![ValType::I32; 4], vec![ValType::I32]);
        // 1: path_open
        types.ty().function(
            vec![
                ValType::I32,
                ValType::I32,
                ValType::I32,
                ValType::I32,
                ValType::I32,
                ValType::I64,
                ValType::I64,
                ValType::I32,
                ValType::I32,
            ],
            vec![ValType::I32],
        );
        // 2: fd_close
        types.ty().function(vec![ValType::I32], vec![ValType::I32]);
        // 3: proc_exit
        types.ty().function(vec![ValType::I32], vec![]);
        // 4: args_sizes_get / args_get
        types.ty().function(vec![ValType::I32; 2], vec![ValType::I32]);
        // 5: _start
        types.ty().function(vec![], vec![]);
        // 6: fd_seek
        types.ty().function(
            vec![ValType::I32, ValType::I64, ValType::I32, ValType::I32],
            vec![ValType::I32],
        );
        module.section(&types);

        let mut imports = ImportSection::new();
        imports.import(WASI, "fd_write", EntityType::Function(0));
        imports.import(WASI, "fd_read", EntityType::Function(0));
        imports.import(WASI, "path_open", EntityType::Function(1));
        imports.import(WASI, "fd_close", EntityType::Function(2));
        imports.import(WASI, "proc_exit", EntityType::Function(3));
        imports.import(WASI, "args_sizes_get", EntityType::Function(4));
        imports.import(WASI, "args_get", EntityType::Function(4));
        imports.import(WASI, "fd_seek", EntityType::Function(6));
        module.section(&imports);

        let mut functions = FunctionSection::new();
        functions.function(5);
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
        exports.export("memory", ExportKind::Memory, 0);
        if self.export_start {
            exports.export("_start", ExportKind::Func, IMPORT_COUNT);
        }
        module.section(&exports);

        let mut codes = CodeSection::new();
        codes.function(&self.emit_start());
        module.section(&codes);

        let mut data = DataSection::new();
        data.active(0, &ConstExpr::i32_const(DATA_START as i32), self.data.clone());
        module.section(&data);

        module.finish()
    }

    fn emit_start(&self) -> Function {
        let mut f = Function::new(vec![]);
        for step in &self.steps {
            match *step {
                Step::Write { fd, bytes } => {
                    set_iovec(&mut f, bytes.ptr, bytes.len);
                    write_iovec(&mut f, FdSource::Const(fd));
                }
                Step::EchoFile { path, fd, missing } => {
                    open(&mut f, path, 0, RIGHTS_READ, missing);
                    read_scratch(&mut f);
                    close(&mut f);
                    set_iovec(&mut f, SCRATCH, 0);
                    set_iovec_len_from(&mut f, NWRITTEN);
                    write_iovec(&mut f, FdSource::Const(fd));
                }
                Step::WriteFile {
                    path,
                    bytes,
                    missing,
                } => {
                    open(&mut f, path, OFLAGS_CREAT_TRUNC, RIGHTS_WRITE, missing);
                    set_iovec(&mut f, bytes.ptr, bytes.len);
                    write_iovec(&mut f, FdSource::Slot);
                    close(&mut f);
                }
                Step::WriteFileAt {
                    path,
                    whence,
                    offset,
                    bytes,
                    missing,
                } => {
                    open(&mut f, path, OFLAGS_CREAT_TRUNC, RIGHTS_WRITE, missing);
                    push_fd(&mut f, FdSource::Slot);
                    f.instruction(&Instruction::I64Const(offset));
                    f.instruction(&Instruction::I32Const(whence.code()));
                    f.instruction(&Instruction::I32Const(NEW_OFFSET));
                    f.instruction(&Instruction::Call(FD_SEEK));
                    f.instruction(&Instruction::I32Eqz);
                    f.instruction(&Instruction::If(BlockType::Empty));
                    set_iovec(&mut f, bytes.ptr, bytes.len);
                    write_iovec(&mut f, FdSource::Slot);
                    f.instruction(&Instruction::End);
                    close(&mut f);
                }
                Step::EchoArgs => {
                    f.instruction(&Instruction::I32Const(ARGC));
                    f.instruction(&Instruction::I32Const(ARGV_BUF_SIZE));
                    f.instruction(&Instruction::Call(ARGS_SIZES_GET));
                    f.instruction(&Instruction::Drop);
                    f.instruction(&Instruction::I32Const(ARGV_PTRS));
                    f.instruction(&Instruction::I32Const(ARGV_BUF));
                    f.instruction(&Instruction::Call(ARGS_GET));
                    f.instruction(&Instruction::Drop);
                    set_iovec(&mut f, ARGV_BUF, 0);
                    set_iovec_len_from(&mut f, ARGV_BUF_SIZE);
                    write_iovec(&mut f, FdSource::Const(1));
                }
                Step::RejectIfFirstByte {
                    path,
                    byte,
                    message,
                    code,
                    missing,
                } => {
                    open(&mut f, path, 0, RIGHTS_READ, missing);
                    read_scratch(&mut f);
                    close(&mut f);
                    f.instruction(&Instruction::I32Const(SCRATCH));
                    f.instruction(&Instruction::I32Load8U(memarg(0, 0)));
                    f.instruction(&Instruction::I32Const(byte as i32));
                    f.instruction(&Instruction::I32Eq);
                    f.instruction(&Instruction::If(BlockType::Empty));
                    set_iovec(&mut f, message.ptr, message.len);
                    write_iovec(&mut f, FdSource::Const(2));
                    f.instruction(&Instruction::I32Const(code));
                    f.instruction(&Instruction::Call(PROC_EXIT));
                    f.instruction(&Instruction::End);
                }
                Step::Exit(code) => {
                    f.instruction(&Instruction::I32Const(code));
                    f.instruction(&Instruction::Call(PROC_EXIT));
                }
                Step::Trap => {
                    f.instruction(&Instruction::Unreachable);
                }
            }
        }
        f.instruction(&Instruction::End);
        f
    }
}

enum FdSource {
    Const(i32),
    Slot,
}

fn push_fd(f: &mut Function, fd: FdSource) {
    match fd {
        FdSource::Const(fd) => {
            f.instruction(&Instruction::I32Const(fd));
        }
        FdSource::Slot => {
            f.instruction(&Instruction::I32Const(FD_SLOT));
            f.instruction(&Instruction::I32Load(memarg(0, 2)));
        }
    }
}

fn set_iovec(f: &mut Function, ptr: i32, len: i32) {
    f.instruction(&Instruction::I32Const(IOVEC));
    f.instruction(&Instruction::I32Const(ptr));
    f.instruction(&Instruction::I32Store(memarg(0, 2)));
    f.instruction(&Instruction::I32Const(IOVEC));
    f.instruction(&Instruction::I32Const(len));
    f.instruction(&Instruction::I32Store(memarg(4, 2)));
}

fn set_iovec_len_from(f: &mut Function, addr: i32) {
    f.instruction(&Instruction::I32Const(IOVEC));
    f.instruction(&Instruction::I32Const(addr));
    f.instruction(&Instruction::I32Load(memarg(0, 2)));
    f.instruction(&Instruction::I32Store(memarg(4, 2)));
}

/// `fd_write(fd, IOVEC, 1, NWRITTEN)`, result dropped.
fn write_iovec(f: &mut Function, fd: FdSource) {
    push_fd(f, fd);
    f.instruction(&Instruction::I32Const(IOVEC));
    f.instruction(&Instruction::I32Const(1));
    f.instruction(&Instruction::I32Const(NWRITTEN));
    f.instruction(&Instruction::Call(FD_WRITE));
    f.instruction(&Instruction::Drop);
}

/// Read up to `SCRATCH_LEN` bytes from the slot fd; count lands in `NWRITTEN`.
fn read_scratch(f: &mut Function) {
    set_iovec(f, SCRATCH, SCRATCH_LEN);
    push_fd(f, FdSource::Slot);
    f.instruction(&Instruction::I32Const(IOVEC));
    f.instruction(&Instruction::I32Const(1));
    f.instruction(&Instruction::I32Const(NWRITTEN));
    f.instruction(&Instruction::Call(FD_READ));
    f.instruction(&Instruction::Drop);
}

fn close(f: &mut Function) {
    push_fd(f, FdSource::Slot);
    f.instruction(&Instruction::Call(FD_CLOSE));
    f.instruction(&Instruction::Drop);
}

/// `path_open` relative to fd 3 into `FD_SLOT`; on error print `missing` and exit 2.
fn open(f: &mut Function, path: Bytes, oflags: i32, rights: i64, missing: Bytes) {
    f.instruction(&Instruction::I32Const(3));
    f.instruction(&Instruction::I32Const(0));
    f.instruction(&Instruction::I32Const(path.ptr));
    f.instruction(&Instruction::I32Const(path.len));
    f.instruction(&Instruction::I32Const(oflags));
    f.instruction(&Instruction::I64Const(rights));
    f.instruction(&Instruction::I64Const(rights));
    f.instruction(&Instruction::I32Const(0));
    f.instruction(&Instruction::I32Const(FD_SLOT));
    f.instruction(&Instruction::Call(PATH_OPEN));
    f.instruction(&Instruction::If(BlockType::Empty));
    set_iovec(f, missing.ptr, missing.len);
    write_iovec(f, FdSource::Const(2));
    f.instruction(&Instruction::I32Const(2));
    f.instruction(&Instruction::Call(PROC_EXIT));
    f.instruction(&Instruction::End);
}
