use super::ModuleParams;
use embassy_time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sierra {
    /// Icera based firmware (`%IPDPCFG` instead of `$QCPDPP`)
    pub icera: bool,
}

impl ModuleParams for Sierra {
    fn power_up_wait(&self, drivers: &[String]) -> Duration {
        if drivers.iter().any(|d| d == "sierra") {
            Duration::from_secs(5)
        } else {
            Duration::from_secs(10)
        }
    }
    fn is_icera(&self) -> bool {
        self.icera
    }
}
