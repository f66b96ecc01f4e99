//! tradelang — a small rule language for per-candle trading decisions.
//!
//! A program declares a symbol and a list of `if <cond> then buy|sell N end`
//! rules over builtin market variables and indicator calls. The pipeline is
//! scanner → parser → bytecode compiler → stack VM.
//!
//! Hexagonal architecture: language core in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
