//! Bytecode definitions: opcodes, builtin id tables, and the chunk.
//!
//! The numeric values here are ABI. Persisted chunks are only portable if
//! opcode values and the variable/function id tables never change.

/// One-byte operation codes. Operand payloads are little-endian and inline:
/// `PushConst` is followed by an 8-byte double, `LoadVar` by a 1-byte
/// variable id, `CallFunc` by a 1-byte function id and a 1-byte argument
/// count, `JumpIfFalse`/`Jump` by a 4-byte signed offset measured from the
/// byte after the offset field, and `Buy`/`Sell` by a 4-byte signed
/// quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Halt = 0,
    PushConst,
    LoadVar,
    CallFunc,
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
    Neg,
    Not,
    JumpIfFalse,
    Jump,
    Buy,
    Sell,
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        match byte {
            0 => Some(OpCode::Halt),
            1 => Some(OpCode::PushConst),
            2 => Some(OpCode::LoadVar),
            3 => Some(OpCode::CallFunc),
            4 => Some(OpCode::Add),
            5 => Some(OpCode::Sub),
            6 => Some(OpCode::Mul),
            7 => Some(OpCode::Div),
            8 => Some(OpCode::Gt),
            9 => Some(OpCode::Lt),
            10 => Some(OpCode::Ge),
            11 => Some(OpCode::Le),
            12 => Some(OpCode::Eq),
            13 => Some(OpCode::Ne),
            14 => Some(OpCode::And),
            15 => Some(OpCode::Or),
            16 => Some(OpCode::Neg),
            17 => Some(OpCode::Not),
            18 => Some(OpCode::JumpIfFalse),
            19 => Some(OpCode::Jump),
            20 => Some(OpCode::Buy),
            21 => Some(OpCode::Sell),
            _ => None,
        }
    }
}

/// Builtin variable ids for `LoadVar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VarId {
    Open = 0,
    High,
    Low,
    Close,
    Volume,
    /// YYYYMMDD
    Date,
    /// HHMM
    Time,
    Hour,
    Minute,
    /// 1 = Monday … 7 = Sunday
    Weekday,
}

impl VarId {
    pub fn from_name(name: &str) -> Option<VarId> {
        match name {
            "open" => Some(VarId::Open),
            "high" => Some(VarId::High),
            "low" => Some(VarId::Low),
            "close" => Some(VarId::Close),
            "volume" => Some(VarId::Volume),
            "date" => Some(VarId::Date),
            "time" => Some(VarId::Time),
            "hour" => Some(VarId::Hour),
            "minute" => Some(VarId::Minute),
            "weekday" => Some(VarId::Weekday),
            _ => None,
        }
    }

    pub fn from_u8(byte: u8) -> Option<VarId> {
        match byte {
            0 => Some(VarId::Open),
            1 => Some(VarId::High),
            2 => Some(VarId::Low),
            3 => Some(VarId::Close),
            4 => Some(VarId::Volume),
            5 => Some(VarId::Date),
            6 => Some(VarId::Time),
            7 => Some(VarId::Hour),
            8 => Some(VarId::Minute),
            9 => Some(VarId::Weekday),
            _ => None,
        }
    }
}

/// Builtin function ids for `CallFunc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FuncId {
    Sma = 0,
    Ema,
    Rsi,
}

impl FuncId {
    pub fn from_name(name: &str) -> Option<FuncId> {
        match name {
            "sma" => Some(FuncId::Sma),
            "ema" => Some(FuncId::Ema),
            "rsi" => Some(FuncId::Rsi),
            _ => None,
        }
    }

    pub fn from_u8(byte: u8) -> Option<FuncId> {
        match byte {
            0 => Some(FuncId::Sma),
            1 => Some(FuncId::Ema),
            2 => Some(FuncId::Rsi),
            _ => None,
        }
    }
}

/// A growable byte buffer holding compiled bytecode. Written once by the
/// compiler, then read by the VM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    code: Vec<u8>,
}

impl Chunk {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    pub fn count(&self) -> usize {
        self.code.len()
    }

    pub fn capacity(&self) -> usize {
        self.code.capacity()
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn write_byte(&mut self, byte: u8) {
        if self.code.len() == self.code.capacity() {
            let capacity = if self.code.capacity() == 0 {
                64
            } else {
                self.code.capacity() * 2
            };
            self.code.reserve_exact(capacity - self.code.len());
        }
        self.code.push(byte);
    }

    pub fn write_i32(&mut self, value: i32) {
        for byte in value.to_le_bytes() {
            self.write_byte(byte);
        }
    }

    pub fn write_f64(&mut self, value: f64) {
        for byte in value.to_le_bytes() {
            self.write_byte(byte);
        }
    }

    /// Overwrite four bytes at `pos` with a little-endian i32. Used to patch
    /// jump placeholders after the jump target is known.
    pub fn patch_i32(&mut self, pos: usize, value: i32) {
        self.code[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }
}
