//! Text-stream trade sink.

use std::io::Write;

use crate::domain::error::TradeLangError;
use crate::domain::trade::TradeAction;
use crate::ports::action_port::ActionPort;

/// Writes one canonical line per action to any writer: stdout in the CLI,
/// an in-memory buffer in tests.
pub struct StreamActionAdapter<W: Write> {
    out: W,
}

impl<W: Write> StreamActionAdapter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ActionPort for StreamActionAdapter<W> {
    fn emit(&mut self, action: &TradeAction) -> Result<(), TradeLangError> {
        writeln!(self.out, "{action}")?;
        Ok(())
    }
}
