//! ### 5 - General

use embassy_time::Duration;

pub const REVISION_TIMEOUT: Duration = Duration::from_secs(3);

/// 5.3 Request revision identification +CGMR
pub const GET_REVISION: &str = "+CGMR";

/// V.25ter revision identification +GMR
pub const GET_REVISION_V25: &str = "+GMR";
