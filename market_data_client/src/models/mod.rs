pub mod bar;
pub mod quote;
pub mod request;
pub mod timeframe;
