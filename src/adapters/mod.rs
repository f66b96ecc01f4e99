//! Concrete implementations of the port traits.

pub mod stream_action_adapter;
pub mod spot_indicator_adapter;
pub mod candle_config_adapter;
