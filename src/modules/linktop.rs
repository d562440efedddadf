use super::ModuleParams;

#[derive(Debug, Clone, Copy)]
pub struct Linktop;

impl ModuleParams for Linktop {}
