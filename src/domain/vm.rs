//! Stack-based virtual machine.
//!
//! Executes one chunk against one candle, emitting trade actions through an
//! [`ActionPort`] and resolving indicator calls through an
//! [`IndicatorPort`]. The evaluation stack holds at most [`STACK_MAX`]
//! doubles; booleans are encoded as 0.0/1.0 and `and`/`or` coerce operands
//! via non-zero. Faults (arity mismatch, unknown opcode, stack overflow) end
//! the run; nothing is caught or retried.

use crate::domain::bytecode::{Chunk, FuncId, OpCode, VarId};
use crate::domain::candle::Candle;
use crate::domain::error::{RuntimeError, TradeLangError};
use crate::domain::trade::{Side, TradeAction};
use crate::ports::action_port::ActionPort;
use crate::ports::indicator_port::IndicatorPort;

pub const STACK_MAX: usize = 256;

pub struct Vm<'a> {
    chunk: &'a Chunk,
    candle: Candle,
    symbol: &'a str,
    stack: Vec<f64>,
    ip: usize,
}

fn truth(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl<'a> Vm<'a> {
    pub fn new(chunk: &'a Chunk, candle: Candle, symbol: &'a str) -> Self {
        Self {
            chunk,
            candle,
            symbol,
            stack: Vec::with_capacity(STACK_MAX),
            ip: 0,
        }
    }

    pub fn run(
        &mut self,
        indicators: &dyn IndicatorPort,
        actions: &mut dyn ActionPort,
    ) -> Result<(), TradeLangError> {
        loop {
            let byte = self.read_byte()?;
            let Some(op) = OpCode::from_u8(byte) else {
                return Err(RuntimeError::UnknownOpcode(byte).into());
            };
            match op {
                OpCode::Halt => return Ok(()),

                OpCode::PushConst => {
                    let value = self.read_f64()?;
                    self.push(value)?;
                }

                OpCode::LoadVar => {
                    let id = self.read_byte()?;
                    // Unknown ids load 0.0.
                    let value = VarId::from_u8(id)
                        .map(|id| self.candle.get(id))
                        .unwrap_or(0.0);
                    self.push(value)?;
                }

                OpCode::CallFunc => self.call_func(indicators)?,

                OpCode::Add => self.binary(|a, b| a + b)?,
                OpCode::Sub => self.binary(|a, b| a - b)?,
                OpCode::Mul => self.binary(|a, b| a * b)?,
                OpCode::Div => self.binary(|a, b| a / b)?,

                OpCode::Gt => self.binary(|a, b| truth(a > b))?,
                OpCode::Lt => self.binary(|a, b| truth(a < b))?,
                OpCode::Ge => self.binary(|a, b| truth(a >= b))?,
                OpCode::Le => self.binary(|a, b| truth(a <= b))?,
                OpCode::Eq => self.binary(|a, b| truth(a == b))?,
                OpCode::Ne => self.binary(|a, b| truth(a != b))?,

                OpCode::And => self.binary(|a, b| truth(a != 0.0 && b != 0.0))?,
                OpCode::Or => self.binary(|a, b| truth(a != 0.0 || b != 0.0))?,

                OpCode::Neg => {
                    let a = self.pop()?;
                    self.push(-a)?;
                }
                OpCode::Not => {
                    let a = self.pop()?;
                    self.push(truth(a == 0.0))?;
                }

                OpCode::JumpIfFalse => {
                    let offset = self.read_i32()?;
                    let condition = self.pop()?;
                    if condition == 0.0 {
                        self.jump(offset);
                    }
                }
                OpCode::Jump => {
                    let offset = self.read_i32()?;
                    self.jump(offset);
                }

                OpCode::Buy => {
                    let quantity = self.read_i32()?;
                    self.emit(actions, Side::Buy, quantity)?;
                }
                OpCode::Sell => {
                    let quantity = self.read_i32()?;
                    self.emit(actions, Side::Sell, quantity)?;
                }
            }
        }
    }

    fn call_func(&mut self, indicators: &dyn IndicatorPort) -> Result<(), RuntimeError> {
        let fid = self.read_byte()?;
        let argc = self.read_byte()?;
        let result = match FuncId::from_u8(fid) {
            Some(FuncId::Sma) => {
                if argc != 2 {
                    return Err(RuntimeError::Arity {
                        func: "sma",
                        expected: 2,
                    });
                }
                let period = self.pop()?;
                let series = self.pop()?;
                indicators.sma(series, period)
            }
            Some(FuncId::Ema) => {
                if argc != 2 {
                    return Err(RuntimeError::Arity {
                        func: "ema",
                        expected: 2,
                    });
                }
                let period = self.pop()?;
                let series = self.pop()?;
                indicators.ema(series, period)
            }
            Some(FuncId::Rsi) => {
                if argc != 1 {
                    return Err(RuntimeError::Arity {
                        func: "rsi",
                        expected: 1,
                    });
                }
                let period = self.pop()?;
                indicators.rsi(period)
            }
            // Unreachable through the compiler; mirrors the reference VM.
            None => 0.0,
        };
        self.push(result)
    }

    fn emit(
        &self,
        actions: &mut dyn ActionPort,
        side: Side,
        quantity: i32,
    ) -> Result<(), TradeLangError> {
        actions.emit(&TradeAction {
            symbol: self.symbol.to_string(),
            side,
            quantity,
        })
    }

    fn binary<F>(&mut self, op: F) -> Result<(), RuntimeError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(op(a, b))
    }

    fn push(&mut self, value: f64) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<f64, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn jump(&mut self, offset: i32) {
        self.ip = (self.ip as i64 + i64::from(offset)) as usize;
    }

    fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        let byte = self
            .chunk
            .code()
            .get(self.ip)
            .copied()
            .ok_or(RuntimeError::TruncatedChunk)?;
        self.ip += 1;
        Ok(byte)
    }

    fn read_i32(&mut self) -> Result<i32, RuntimeError> {
        let mut bytes = [0u8; 4];
        for byte in &mut bytes {
            *byte = self.read_byte()?;
        }
        Ok(i32::from_le_bytes(bytes))
    }

    fn read_f64(&mut self) -> Result<f64, RuntimeError> {
        let mut bytes = [0u8; 8];
        for byte in &mut bytes {
            *byte = self.read_byte()?;
        }
        Ok(f64::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Indicator stub matching the reference semantics: moving averages pass
    /// the series value through, rsi is pinned at 50.
    struct StubIndicators;

    impl IndicatorPort for StubIndicators {
        fn sma(&self, series: f64, _period: f64) -> f64 {
            series
        }
        fn ema(&self, series: f64, _period: f64) -> f64 {
            series
        }
        fn rsi(&self, _period: f64) -> f64 {
            50.0
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        actions: Vec<TradeAction>,
    }

    impl ActionPort for RecordingSink {
        fn emit(&mut self, action: &TradeAction) -> Result<(), TradeLangError> {
            self.actions.push(action.clone());
            Ok(())
        }
    }

    fn sample_candle() -> Candle {
        Candle {
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close: 108.0,
            volume: 1_000_000.0,
            date: 20_251_117,
            time: 940,
            hour: 9,
            minute: 40,
            weekday: 1,
        }
    }

    fn push_const(chunk: &mut Chunk, value: f64) {
        chunk.write_byte(OpCode::PushConst as u8);
        chunk.write_f64(value);
    }

    /// Run a chunk and return (final stack, emitted actions).
    fn run_chunk(chunk: &Chunk) -> (Vec<f64>, Vec<TradeAction>) {
        let mut vm = Vm::new(chunk, sample_candle(), "\"X\"");
        let mut sink = RecordingSink::default();
        vm.run(&StubIndicators, &mut sink).unwrap();
        (vm.stack.clone(), sink.actions)
    }

    fn run_chunk_err(chunk: &Chunk) -> TradeLangError {
        let mut vm = Vm::new(chunk, sample_candle(), "\"X\"");
        let mut sink = RecordingSink::default();
        vm.run(&StubIndicators, &mut sink).unwrap_err()
    }

    /// Build `a <op> b; Halt` and return the single result.
    fn eval_binary(a: f64, op: OpCode, b: f64) -> f64 {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, a);
        push_const(&mut chunk, b);
        chunk.write_byte(op as u8);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack.len(), 1);
        stack[0]
    }

    #[test]
    fn halt_on_empty_program() {
        let mut chunk = Chunk::new();
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, actions) = run_chunk(&chunk);
        assert!(stack.is_empty());
        assert!(actions.is_empty());
    }

    #[test]
    fn arithmetic_ops() {
        assert_eq!(eval_binary(2.0, OpCode::Add, 3.0), 5.0);
        assert_eq!(eval_binary(2.0, OpCode::Sub, 3.0), -1.0);
        assert_eq!(eval_binary(2.0, OpCode::Mul, 3.0), 6.0);
        assert_eq!(eval_binary(6.0, OpCode::Div, 3.0), 2.0);
    }

    #[test]
    fn division_by_zero_is_non_trapping() {
        assert_eq!(eval_binary(1.0, OpCode::Div, 0.0), f64::INFINITY);
        assert_eq!(eval_binary(-1.0, OpCode::Div, 0.0), f64::NEG_INFINITY);
        assert!(eval_binary(0.0, OpCode::Div, 0.0).is_nan());
    }

    #[test]
    fn comparisons_encode_booleans_as_unit_doubles() {
        assert_eq!(eval_binary(2.0, OpCode::Gt, 1.0), 1.0);
        assert_eq!(eval_binary(1.0, OpCode::Gt, 2.0), 0.0);
        assert_eq!(eval_binary(1.0, OpCode::Lt, 2.0), 1.0);
        assert_eq!(eval_binary(2.0, OpCode::Ge, 2.0), 1.0);
        assert_eq!(eval_binary(2.0, OpCode::Le, 1.0), 0.0);
        assert_eq!(eval_binary(2.0, OpCode::Eq, 2.0), 1.0);
        assert_eq!(eval_binary(2.0, OpCode::Ne, 2.0), 0.0);
        assert_eq!(eval_binary(2.0, OpCode::Ne, 3.0), 1.0);
    }

    #[test]
    fn nan_compares_unequal() {
        assert_eq!(eval_binary(f64::NAN, OpCode::Eq, f64::NAN), 0.0);
        assert_eq!(eval_binary(f64::NAN, OpCode::Ne, f64::NAN), 1.0);
        assert_eq!(eval_binary(f64::NAN, OpCode::Gt, 0.0), 0.0);
    }

    #[test]
    fn logical_ops_coerce_non_zero() {
        assert_eq!(eval_binary(2.5, OpCode::And, -1.0), 1.0);
        assert_eq!(eval_binary(2.5, OpCode::And, 0.0), 0.0);
        assert_eq!(eval_binary(0.0, OpCode::Or, 0.0), 0.0);
        assert_eq!(eval_binary(0.0, OpCode::Or, 7.0), 1.0);
    }

    #[test]
    fn neg_and_not() {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, 3.0);
        chunk.write_byte(OpCode::Neg as u8);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack, vec![-3.0]);

        let mut chunk = Chunk::new();
        push_const(&mut chunk, 0.0);
        chunk.write_byte(OpCode::Not as u8);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack, vec![1.0]);

        let mut chunk = Chunk::new();
        push_const(&mut chunk, 5.0);
        chunk.write_byte(OpCode::Not as u8);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack, vec![0.0]);
    }

    #[test]
    fn load_var_reads_candle_fields() {
        for (id, expected) in [
            (VarId::Open, 100.0),
            (VarId::High, 110.0),
            (VarId::Low, 95.0),
            (VarId::Close, 108.0),
            (VarId::Volume, 1_000_000.0),
            (VarId::Date, 20_251_117.0),
            (VarId::Time, 940.0),
            (VarId::Hour, 9.0),
            (VarId::Minute, 40.0),
            (VarId::Weekday, 1.0),
        ] {
            let mut chunk = Chunk::new();
            chunk.write_byte(OpCode::LoadVar as u8);
            chunk.write_byte(id as u8);
            chunk.write_byte(OpCode::Halt as u8);
            let (stack, _) = run_chunk(&chunk);
            assert_eq!(stack, vec![expected], "var {id:?}");
        }
    }

    #[test]
    fn load_var_unknown_id_pushes_zero() {
        let mut chunk = Chunk::new();
        chunk.write_byte(OpCode::LoadVar as u8);
        chunk.write_byte(42);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack, vec![0.0]);
    }

    #[test]
    fn call_func_sma_pops_two_pushes_one() {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, 108.0); // series
        push_const(&mut chunk, 20.0); // period
        chunk.write_byte(OpCode::CallFunc as u8);
        chunk.write_byte(FuncId::Sma as u8);
        chunk.write_byte(2);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack, vec![108.0]);
    }

    #[test]
    fn call_func_rsi_returns_stub_value() {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, 14.0);
        chunk.write_byte(OpCode::CallFunc as u8);
        chunk.write_byte(FuncId::Rsi as u8);
        chunk.write_byte(1);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack, vec![50.0]);
    }

    #[test]
    fn call_func_arity_faults() {
        for (fid, argc, message) in [
            (FuncId::Sma, 1u8, "sma expects 2 args"),
            (FuncId::Ema, 3u8, "ema expects 2 args"),
            (FuncId::Rsi, 2u8, "rsi expects 1 arg"),
        ] {
            let mut chunk = Chunk::new();
            push_const(&mut chunk, 1.0);
            push_const(&mut chunk, 2.0);
            push_const(&mut chunk, 3.0);
            chunk.write_byte(OpCode::CallFunc as u8);
            chunk.write_byte(fid as u8);
            chunk.write_byte(argc);
            chunk.write_byte(OpCode::Halt as u8);
            let err = run_chunk_err(&chunk);
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn jump_if_false_skips_on_zero() {
        // 0.0; JumpIfFalse +5; Buy 1; Halt
        let mut chunk = Chunk::new();
        push_const(&mut chunk, 0.0);
        chunk.write_byte(OpCode::JumpIfFalse as u8);
        chunk.write_i32(5);
        chunk.write_byte(OpCode::Buy as u8);
        chunk.write_i32(1);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, actions) = run_chunk(&chunk);
        assert!(stack.is_empty());
        assert!(actions.is_empty());
    }

    #[test]
    fn jump_if_false_falls_through_on_true() {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, 1.0);
        chunk.write_byte(OpCode::JumpIfFalse as u8);
        chunk.write_i32(5);
        chunk.write_byte(OpCode::Buy as u8);
        chunk.write_i32(1);
        chunk.write_byte(OpCode::Halt as u8);
        let (_, actions) = run_chunk(&chunk);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn nan_condition_is_truthy() {
        let mut chunk = Chunk::new();
        push_const(&mut chunk, f64::NAN);
        chunk.write_byte(OpCode::JumpIfFalse as u8);
        chunk.write_i32(5);
        chunk.write_byte(OpCode::Buy as u8);
        chunk.write_i32(1);
        chunk.write_byte(OpCode::Halt as u8);
        let (_, actions) = run_chunk(&chunk);
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn unconditional_jump() {
        let mut chunk = Chunk::new();
        chunk.write_byte(OpCode::Jump as u8);
        chunk.write_i32(5);
        chunk.write_byte(OpCode::Buy as u8);
        chunk.write_i32(1);
        chunk.write_byte(OpCode::Halt as u8);
        let (_, actions) = run_chunk(&chunk);
        assert!(actions.is_empty());
    }

    #[test]
    fn buy_and_sell_emit_in_order() {
        let mut chunk = Chunk::new();
        chunk.write_byte(OpCode::Sell as u8);
        chunk.write_i32(5);
        chunk.write_byte(OpCode::Buy as u8);
        chunk.write_i32(1);
        chunk.write_byte(OpCode::Halt as u8);
        let (stack, actions) = run_chunk(&chunk);
        assert!(stack.is_empty());
        assert_eq!(
            actions,
            vec![
                TradeAction {
                    symbol: "\"X\"".into(),
                    side: Side::Sell,
                    quantity: 5,
                },
                TradeAction {
                    symbol: "\"X\"".into(),
                    side: Side::Buy,
                    quantity: 1,
                },
            ]
        );
    }

    #[test]
    fn unknown_opcode_faults() {
        let mut chunk = Chunk::new();
        chunk.write_byte(99);
        let err = run_chunk_err(&chunk);
        assert_eq!(err.to_string(), "Unknown opcode 99");
    }

    #[test]
    fn stack_overflow_is_fatal() {
        let mut chunk = Chunk::new();
        for _ in 0..=STACK_MAX {
            push_const(&mut chunk, 1.0);
        }
        chunk.write_byte(OpCode::Halt as u8);
        let err = run_chunk_err(&chunk);
        assert_eq!(err.to_string(), "Stack overflow");
    }

    #[test]
    fn truncated_chunk_is_fatal() {
        let chunk = Chunk::new();
        let err = run_chunk_err(&chunk);
        assert_eq!(err.to_string(), "Truncated chunk");
    }

    #[test]
    fn expression_leaves_exactly_one_value() {
        // close > sma(close, 20) and rsi(14) < 30, compiled by hand.
        let mut chunk = Chunk::new();
        chunk.write_byte(OpCode::LoadVar as u8);
        chunk.write_byte(VarId::Close as u8);
        chunk.write_byte(OpCode::LoadVar as u8);
        chunk.write_byte(VarId::Close as u8);
        push_const(&mut chunk, 20.0);
        chunk.write_byte(OpCode::CallFunc as u8);
        chunk.write_byte(FuncId::Sma as u8);
        chunk.write_byte(2);
        chunk.write_byte(OpCode::Gt as u8);
        push_const(&mut chunk, 14.0);
        chunk.write_byte(OpCode::CallFunc as u8);
        chunk.write_byte(FuncId::Rsi as u8);
        chunk.write_byte(1);
        push_const(&mut chunk, 30.0);
        chunk.write_byte(OpCode::Lt as u8);
        chunk.write_byte(OpCode::And as u8);
        chunk.write_byte(OpCode::Halt as u8);

        let (stack, _) = run_chunk(&chunk);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[0], 0.0);
    }
}
