//! Async workflows: the AT sequence engine and the generic modem object
//! behaviour vendor plugins build on.

pub mod at;
pub mod bearer;
pub mod call;
pub mod processors;
pub mod sim;
pub mod sms;

use crate::config::PluginConfig;
use crate::traits::Modem;

/// What every vendor plugin is built around: the modem it drives and its
/// tunables.
pub trait ModemPlugin {
    type Modem: Modem;

    fn modem(&self) -> &Self::Modem;

    fn config(&self) -> &PluginConfig;
}

/// Whether an optional device feature was found to work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureSupport {
    #[default]
    Unknown,
    NotSupported,
    Supported,
}
