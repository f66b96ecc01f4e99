//! INI-backed candle context.
//!
//! Reads the `[candle]` section of an INI file straight into a [`Candle`]:
//! the four prices are required, `volume` defaults to 0, and `timestamp`
//! (`YYYY-MM-DD HH:MM`) expands into the date/time/hour/minute/weekday
//! fields.

use chrono::NaiveDateTime;
use configparser::ini::Ini;
use std::path::Path;

use crate::domain::candle::Candle;
use crate::domain::error::TradeLangError;
use crate::ports::context_port::ContextPort;

const SECTION: &str = "candle";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug)]
pub struct CandleConfigAdapter {
    config: Ini,
}

fn missing(key: &str) -> TradeLangError {
    TradeLangError::ConfigMissing {
        section: SECTION.into(),
        key: key.into(),
    }
}

fn invalid(key: &str, reason: String) -> TradeLangError {
    TradeLangError::ConfigInvalid {
        section: SECTION.into(),
        key: key.into(),
        reason,
    }
}

impl CandleConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradeLangError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|reason| TradeLangError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TradeLangError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TradeLangError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn price(&self, key: &str) -> Result<f64, TradeLangError> {
        let value = self.config.get(SECTION, key).ok_or_else(|| missing(key))?;
        value
            .parse()
            .map_err(|_| invalid(key, format!("not a number: {value}")))
    }

    fn volume(&self) -> Result<f64, TradeLangError> {
        match self.config.get(SECTION, "volume") {
            None => Ok(0.0),
            Some(value) => value
                .parse()
                .map_err(|_| invalid("volume", format!("not a number: {value}"))),
        }
    }

    fn timestamp(&self) -> Result<NaiveDateTime, TradeLangError> {
        let value = self
            .config
            .get(SECTION, "timestamp")
            .ok_or_else(|| missing("timestamp"))?;
        NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT)
            .map_err(|e| invalid("timestamp", e.to_string()))
    }
}

impl ContextPort for CandleConfigAdapter {
    fn load_candle(&self) -> Result<Candle, TradeLangError> {
        let open = self.price("open")?;
        let high = self.price("high")?;
        let low = self.price("low")?;
        let close = self.price("close")?;
        let volume = self.volume()?;
        let at = self.timestamp()?;
        Ok(Candle::from_ohlcv(open, high, low, close, volume, at))
    }
}
