//! Per-candle market context.
//!
//! One row of builtin variable values for a single bar. Calendar fields use
//! the compact integer encodings of the language ABI: `date` is YYYYMMDD,
//! `time` is HHMM, `weekday` is ISO numbered from Monday = 1.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::domain::bytecode::VarId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub date: i32,
    pub time: i32,
    pub hour: i32,
    pub minute: i32,
    pub weekday: i32,
}

impl Candle {
    /// Build a candle from price data and a bar timestamp, deriving the
    /// integer calendar fields.
    pub fn from_ohlcv(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        at: NaiveDateTime,
    ) -> Self {
        let date = at.year() * 10_000 + at.month() as i32 * 100 + at.day() as i32;
        let hour = at.hour() as i32;
        let minute = at.minute() as i32;
        Candle {
            open,
            high,
            low,
            close,
            volume,
            date,
            time: hour * 100 + minute,
            hour,
            minute,
            weekday: at.weekday().number_from_monday() as i32,
        }
    }

    /// Value of a builtin variable, promoted to double.
    pub fn get(&self, id: VarId) -> f64 {
        match id {
            VarId::Open => self.open,
            VarId::High => self.high,
            VarId::Low => self.low,
            VarId::Close => self.close,
            VarId::Volume => self.volume,
            VarId::Date => f64::from(self.date),
            VarId::Time => f64::from(self.time),
            VarId::Hour => f64::from(self.hour),
            VarId::Minute => f64::from(self.minute),
            VarId::Weekday => f64::from(self.weekday),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_candle() -> Candle {
        let at = NaiveDate::from_ymd_opt(2025, 11, 17)
            .unwrap()
            .and_hms_opt(9, 40, 0)
            .unwrap();
        Candle::from_ohlcv(100.0, 110.0, 95.0, 108.0, 1_000_000.0, at)
    }

    #[test]
    fn derives_compact_date() {
        assert_eq!(sample_candle().date, 20_251_117);
    }

    #[test]
    fn derives_compact_time() {
        let candle = sample_candle();
        assert_eq!(candle.time, 940);
        assert_eq!(candle.hour, 9);
        assert_eq!(candle.minute, 40);
    }

    #[test]
    fn weekday_numbered_from_monday() {
        // 2025-11-17 is a Monday.
        assert_eq!(sample_candle().weekday, 1);

        let sunday = NaiveDate::from_ymd_opt(2025, 11, 23)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let candle = Candle::from_ohlcv(1.0, 1.0, 1.0, 1.0, 0.0, sunday);
        assert_eq!(candle.weekday, 7);
    }

    #[test]
    fn get_promotes_every_variable() {
        let candle = sample_candle();
        assert_eq!(candle.get(VarId::Open), 100.0);
        assert_eq!(candle.get(VarId::High), 110.0);
        assert_eq!(candle.get(VarId::Low), 95.0);
        assert_eq!(candle.get(VarId::Close), 108.0);
        assert_eq!(candle.get(VarId::Volume), 1_000_000.0);
        assert_eq!(candle.get(VarId::Date), 20_251_117.0);
        assert_eq!(candle.get(VarId::Time), 940.0);
        assert_eq!(candle.get(VarId::Hour), 9.0);
        assert_eq!(candle.get(VarId::Minute), 40.0);
        assert_eq!(candle.get(VarId::Weekday), 1.0);
    }
}
