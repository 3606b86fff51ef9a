//! Core rate abstractions and conversion logic

pub mod cache;
pub mod config;
pub mod conversion;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use cache::{RateCache, RefreshHandle, StalePolicy};
pub use conversion::{convert, convert_reverse, format_for_display, get_exchange_rate};
pub use error::RateError;
pub use rates::{CurrencyPair, RateFetcher, RateSnapshot, RateTable};
