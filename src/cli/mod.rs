//! Terminal front end over the rate cache and conversion functions

pub mod convert;
pub mod rates;
pub mod setup;
pub mod ui;
pub mod watch;
