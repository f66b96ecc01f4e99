//! Single-pass compiler lowering the AST into bytecode.
//!
//! Each expression compiles to code that leaves exactly one double on the VM
//! stack. A rule compiles to its condition, a `JumpIfFalse` over the action,
//! and the action itself; the jump offset is back-patched once the action
//! length is known. Rules are emitted in program order with no separators, so
//! a true condition falls through its action into the next rule. The final
//! byte of every compiled program is `Halt`.

use crate::domain::ast::{BinOp, Expr, Program, Rule, Stmt, UnOp};
use crate::domain::bytecode::{Chunk, FuncId, OpCode, VarId};
use crate::domain::error::CompileError;

pub fn compile_program(program: &Program) -> Result<Chunk, CompileError> {
    let mut chunk = Chunk::new();
    for rule in &program.rules {
        compile_rule(&mut chunk, rule)?;
    }
    chunk.write_byte(OpCode::Halt as u8);
    Ok(chunk)
}

fn compile_rule(chunk: &mut Chunk, rule: &Rule) -> Result<(), CompileError> {
    compile_expr(chunk, &rule.condition)?;

    chunk.write_byte(OpCode::JumpIfFalse as u8);
    let jump_pos = chunk.count();
    chunk.write_i32(0); // placeholder

    match rule.action {
        Stmt::Buy(qty) => {
            chunk.write_byte(OpCode::Buy as u8);
            chunk.write_i32(qty);
        }
        Stmt::Sell(qty) => {
            chunk.write_byte(OpCode::Sell as u8);
            chunk.write_i32(qty);
        }
    }

    // Offset is measured from the byte after the offset field.
    let offset = (chunk.count() - (jump_pos + 4)) as i32;
    chunk.patch_i32(jump_pos, offset);
    Ok(())
}

fn compile_expr(chunk: &mut Chunk, expr: &Expr) -> Result<(), CompileError> {
    match expr {
        Expr::Number(value) => {
            chunk.write_byte(OpCode::PushConst as u8);
            chunk.write_f64(*value);
        }
        Expr::Ident(name) => {
            let id = VarId::from_name(name)
                .ok_or_else(|| CompileError::UnknownIdentifier(name.clone()))?;
            chunk.write_byte(OpCode::LoadVar as u8);
            chunk.write_byte(id as u8);
        }
        Expr::Str(_) => {
            // Strings are reserved for the symbol declaration.
            return Err(CompileError::BareString);
        }
        Expr::Call { name, args } => {
            let func = FuncId::from_name(name)
                .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
            for arg in args {
                compile_expr(chunk, arg)?;
            }
            chunk.write_byte(OpCode::CallFunc as u8);
            chunk.write_byte(func as u8);
            chunk.write_byte(args.len() as u8);
        }
        Expr::Binary { op, left, right } => {
            compile_expr(chunk, left)?;
            compile_expr(chunk, right)?;
            chunk.write_byte(binary_opcode(*op) as u8);
        }
        Expr::Unary { op, operand } => {
            compile_expr(chunk, operand)?;
            let opcode = match op {
                UnOp::Neg => OpCode::Neg,
                UnOp::Not => OpCode::Not,
            };
            chunk.write_byte(opcode as u8);
        }
    }
    Ok(())
}

fn binary_opcode(op: BinOp) -> OpCode {
    match op {
        BinOp::Add => OpCode::Add,
        BinOp::Sub => OpCode::Sub,
        BinOp::Mul => OpCode::Mul,
        BinOp::Div => OpCode::Div,
        BinOp::Gt => OpCode::Gt,
        BinOp::Lt => OpCode::Lt,
        BinOp::Ge => OpCode::Ge,
        BinOp::Le => OpCode::Le,
        BinOp::Eq => OpCode::Eq,
        BinOp::Ne => OpCode::Ne,
        BinOp::And => OpCode::And,
        BinOp::Or => OpCode::Or,
    }
}
