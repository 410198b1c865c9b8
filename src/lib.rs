//! Time tracking from the terminal. A stopwatch follows the entry that is running in the
//! document store, so several terminals (or machines sharing the store) show the same timer.
//!

pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod store;
pub mod summary;
pub mod tracker;
pub mod utils;
