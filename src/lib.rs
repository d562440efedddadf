// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod asynch;
pub mod band;
pub mod cancel;
pub mod command;
pub mod config;
pub mod error;
pub mod hex;
pub mod modules;
pub mod plugins;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_helpers;
