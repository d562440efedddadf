//! ### 10 - Packet domain

use embassy_time::Duration;

pub const ATTACH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEACTIVATE_TIMEOUT: Duration = Duration::from_secs(120);

/// 10.1.9 PS attach or detach +CGATT
pub const PS_ATTACH: &str = "+CGATT=1";

/// 10.2.1.1 Request packet domain service 'D', `D*99***<cid>#`
pub fn dial_packet_service(cid: u8) -> String {
    format!("D*99***{}#", cid)
}

/// 10.1.10 PDP context activate or deactivate +CGACT
pub fn deactivate_context(cid: u8) -> String {
    format!("+CGACT=0,{}", cid)
}
