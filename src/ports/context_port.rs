//! Candle context source port trait.

use crate::domain::candle::Candle;
use crate::domain::error::TradeLangError;

/// Source of the per-run candle context the VM executes against.
pub trait ContextPort {
    fn load_candle(&self) -> Result<Candle, TradeLangError>;
}
