use std::rc::Rc;

use crate::asynch::bearer::Bearer3gpp;
use crate::asynch::sim::SimOps;
use crate::asynch::ModemPlugin;
use crate::config::PluginConfig;
use crate::traits::Modem;

/// Linktop devices follow the generic behaviour throughout.
pub struct LinktopPlugin<M> {
    modem: Rc<M>,
    config: PluginConfig,
}

impl<M: Modem> LinktopPlugin<M> {
    pub fn new(modem: Rc<M>, config: PluginConfig) -> Self {
        Self { modem, config }
    }
}

impl<M: Modem> ModemPlugin for LinktopPlugin<M> {
    type Modem = M;

    fn modem(&self) -> &M {
        &self.modem
    }

    fn config(&self) -> &PluginConfig {
        &self.config
    }
}

impl<M: Modem> SimOps for LinktopPlugin<M> {}

impl<M: Modem> Bearer3gpp for LinktopPlugin<M> {}
