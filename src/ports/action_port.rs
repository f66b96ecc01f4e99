//! Trade-emission port trait.

use crate::domain::error::TradeLangError;
use crate::domain::trade::TradeAction;

/// Sink for trade actions emitted during a run. Expected to be synchronous;
/// the VM calls it inline from `Buy`/`Sell` dispatch.
pub trait ActionPort {
    fn emit(&mut self, action: &TradeAction) -> Result<(), TradeLangError>;
}
