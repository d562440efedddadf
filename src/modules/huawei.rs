use super::{AudioSettings, ModuleParams};

#[derive(Debug, Clone, Copy, Default)]
pub struct Huawei {
    /// Voice format announced by the device, if it streams call audio
    pub audio: Option<AudioSettings>,
}

impl ModuleParams for Huawei {
    fn call_supports_dialing_to_ringing(&self) -> bool {
        true
    }
    fn call_supports_ringing_to_active(&self) -> bool {
        true
    }
    fn audio_settings(&self) -> Option<AudioSettings> {
        self.audio
    }
}
