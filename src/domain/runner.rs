//! Pipeline orchestration: parse → compile → execute.

use crate::domain::candle::Candle;
use crate::domain::compiler::compile_program;
use crate::domain::error::TradeLangError;
use crate::domain::parser::parse_program;
use crate::domain::vm::Vm;
use crate::ports::action_port::ActionPort;
use crate::ports::indicator_port::IndicatorPort;

/// Run a source program against a single candle. Each phase completes before
/// the next begins; the first failure ends the run. Trade actions flow
/// through `actions` in rule order.
pub fn run_source(
    source: &str,
    candle: Candle,
    indicators: &dyn IndicatorPort,
    actions: &mut dyn ActionPort,
) -> Result<(), TradeLangError> {
    let program = parse_program(source)?;
    let chunk = compile_program(&program)?;
    Vm::new(&chunk, candle, &program.symbol).run(indicators, actions)
}
