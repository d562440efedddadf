//! Vendor plugins.
//!
//! Every plugin wraps the host's modem object and implements the generic
//! object traits ([`SimOps`](crate::asynch::sim::SimOps),
//! [`Bearer3gpp`](crate::asynch::bearer::Bearer3gpp)), overriding only the
//! operations its vendor does differently.

pub mod huawei;
pub mod linktop;
pub mod novatel;
pub mod sierra;
pub mod telit;
pub mod via;

pub use huawei::HuaweiPlugin;
pub use linktop::LinktopPlugin;
pub use novatel::NovatelPlugin;
pub use sierra::SierraPlugin;
pub use telit::TelitPlugin;
pub use via::ViaPlugin;
