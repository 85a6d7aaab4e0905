//! Configuration parsing and types.
//!
//! - `types` - Root config structure (`Config`, `CacheConfig`)
//! - `duration` - Duration strings used by `probe_timeout`
//! - `parser` - Locating and parsing `mosi.yaml`
//! - `validation` - Config validation

mod duration;
mod parser;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use types::*;
