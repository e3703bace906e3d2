#![forbid(unsafe_code)]

pub mod entry;
pub mod error;
pub mod import;
pub mod model;
pub mod scoring;
pub mod time;

pub use error::Error;
pub use time::Clock;
