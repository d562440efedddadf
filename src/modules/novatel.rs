use super::ModuleParams;

#[derive(Debug, Clone, Copy)]
pub struct Novatel;

impl ModuleParams for Novatel {}
