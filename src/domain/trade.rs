//! Trade actions emitted by the VM.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// One emitted trading directive. The `Display` form is the canonical sink
/// line: `SYMBOL <symbol>: BUY|SELL <quantity>`. The symbol is carried
/// verbatim as the parser captured it, quotes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeAction {
    pub symbol: String,
    pub side: Side,
    pub quantity: i32,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SYMBOL {}: {} {}", self.symbol, self.side, self.quantity)
    }
}
