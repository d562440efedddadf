use super::ModuleParams;

#[derive(Debug, Clone, Copy)]
pub struct Via;

impl ModuleParams for Via {}
