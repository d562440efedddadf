use core::str::FromStr;

/// Final result codes a modem uses to end a call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("no carrier")]
    NoCarrier,
    #[error("no dialtone")]
    NoDialtone,
    #[error("busy")]
    Busy,
    #[error("no answer")]
    NoAnswer,
}

/// Errors reported by the device itself, as opposed to the transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("modem replied ERROR")]
    Generic,
    #[error("mobile equipment error: {0:?}")]
    Cme(CmeError),
    #[error("message service error: {0:?}")]
    Cms(CmsError),
    #[error("connection error: {0}")]
    Connection(ConnectionError),
}

impl FromStr for DeviceError {
    type Err = ();

    /// Classify a final result line. Anything that is not an error result
    /// is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(if let Some(err) = s.strip_prefix("+CME ERROR:") {
            Self::Cme(err.parse().unwrap_or(CmeError::Unknown))
        } else if let Some(err) = s.strip_prefix("+CMS ERROR:") {
            Self::Cms(err.parse().unwrap_or(CmsError::Unknown))
        } else {
            match s {
                "ERROR" => Self::Generic,
                "NO CARRIER" => Self::Connection(ConnectionError::NoCarrier),
                "NO DIALTONE" | "NO DIAL TONE" => Self::Connection(ConnectionError::NoDialtone),
                "BUSY" => Self::Connection(ConnectionError::Busy),
                "NO ANSWER" => Self::Connection(ConnectionError::NoAnswer),
                _ => return Err(()),
            }
        })
    }
}

/// Mobile termination error result codes +CME ERROR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmeError {
    PhoneFailure,
    NoConnectionToPhone,
    PhoneAdaptorLinkReserved,
    OperationNotAllowed,
    OperationNotSupported,
    PhSimPinRequired,
    PhFsimPinRequired,
    PhFsimPukRequired,
    SimNotInserted,
    SimPinRequired,
    SimPukRequired,
    SimFailure,
    SimBusy,
    SimWrong,
    IncorrectPassword,
    SimPin2Required,
    SimPuk2Required,
    MemoryFull,
    InvalidIndex,
    NotFound,
    MemoryFailure,
    TextStringTooLong,
    InvalidCharactersInTextString,
    DialStringTooLong,
    InvalidCharactersInDialString,
    NoNetworkService,
    NetworkTimeout,
    NetworkNotAllowedEmergencyCallsOnly,
    NetworkPersonalisationPinRequired,
    NetworkPersonalisationPukRequired,
    IncorrectParameters,
    Unknown,
    GprsServicesNotAllowed,
    PlmnNotAllowed,
    MissingOrUnknownApn,
    UserAuthenticationFailed,
    ServiceOptionNotSupported,
    RequestedServiceOptionNotSubscribed,
}

impl FromStr for CmeError {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "0" | "Phone failure" => Self::PhoneFailure,
            "1" | "No connection to phone" => Self::NoConnectionToPhone,
            "2" | "Phone-adaptor link reserved" => Self::PhoneAdaptorLinkReserved,
            "3" | "Operation not allowed" => Self::OperationNotAllowed,
            "4" | "Operation not supported" => Self::OperationNotSupported,
            "5" | "PH-SIM PIN required" => Self::PhSimPinRequired,
            "6" | "PH-FSIM PIN required" => Self::PhFsimPinRequired,
            "7" | "PH-FSIM PUK required" => Self::PhFsimPukRequired,
            "10" | "SIM not inserted" => Self::SimNotInserted,
            "11" | "SIM PIN required" => Self::SimPinRequired,
            "12" | "SIM PUK required" => Self::SimPukRequired,
            "13" | "SIM failure" => Self::SimFailure,
            "14" | "SIM busy" => Self::SimBusy,
            "15" | "SIM wrong" => Self::SimWrong,
            "16" | "Incorrect password" => Self::IncorrectPassword,
            "17" | "SIM PIN2 required" => Self::SimPin2Required,
            "18" | "SIM PUK2 required" => Self::SimPuk2Required,
            "20" | "Memory full" => Self::MemoryFull,
            "21" | "Invalid index" => Self::InvalidIndex,
            "22" | "Not found" => Self::NotFound,
            "23" | "Memory failure" => Self::MemoryFailure,
            "24" | "Text string too long" => Self::TextStringTooLong,
            "25" | "Invalid characters in text string" => Self::InvalidCharactersInTextString,
            "26" | "Dial string too long" => Self::DialStringTooLong,
            "27" | "Invalid characters in dial string" => Self::InvalidCharactersInDialString,
            "30" | "No network service" => Self::NoNetworkService,
            "31" | "Network timeout" => Self::NetworkTimeout,
            "32" | "Network not allowed - emergency calls only" => {
                Self::NetworkNotAllowedEmergencyCallsOnly
            }
            "40" | "Network personalization PIN required" => {
                Self::NetworkPersonalisationPinRequired
            }
            "41" | "Network personalization PUK required" => {
                Self::NetworkPersonalisationPukRequired
            }
            "50" | "Incorrect parameters" => Self::IncorrectParameters,
            "100" | "Unknown" | "unknown" => Self::Unknown,
            "107" | "GPRS services not allowed" => Self::GprsServicesNotAllowed,
            "111" | "PLMN not allowed" => Self::PlmnNotAllowed,
            "533" | "Missing or unknown APN" => Self::MissingOrUnknownApn,
            "149" | "User authentication failed" => Self::UserAuthenticationFailed,
            "132" | "Service option not supported" => Self::ServiceOptionNotSupported,
            "133" | "Requested service option not subscribed" => {
                Self::RequestedServiceOptionNotSubscribed
            }
            _ => return Err(()),
        })
    }
}

/// Message service error result codes +CMS ERROR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmsError {
    MeFailure,
    SmsServiceReserved,
    OperationNotAllowed,
    OperationNotSupported,
    InvalidPduModeParameter,
    InvalidTextModeParameter,
    SimNotInserted,
    SimPinRequired,
    SimFailure,
    SimBusy,
    SimWrong,
    MemoryFailure,
    InvalidMemoryIndex,
    MemoryFull,
    SmscAddressUnknown,
    NoNetworkService,
    NetworkTimeout,
    Unknown,
}

impl FromStr for CmsError {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "300" | "ME failure" => Self::MeFailure,
            "301" | "SMS service of ME reserved" => Self::SmsServiceReserved,
            "302" | "Operation not allowed" => Self::OperationNotAllowed,
            "303" | "Operation not supported" => Self::OperationNotSupported,
            "304" | "Invalid PDU mode parameter" => Self::InvalidPduModeParameter,
            "305" | "Invalid text mode parameter" => Self::InvalidTextModeParameter,
            "310" | "SIM not inserted" => Self::SimNotInserted,
            "311" | "SIM PIN required" => Self::SimPinRequired,
            "313" | "SIM failure" => Self::SimFailure,
            "314" | "SIM busy" => Self::SimBusy,
            "315" | "SIM wrong" => Self::SimWrong,
            "320" | "Memory failure" => Self::MemoryFailure,
            "321" | "Invalid memory index" => Self::InvalidMemoryIndex,
            "322" | "Memory full" => Self::MemoryFull,
            "330" | "SMSC address unknown" => Self::SmscAddressUnknown,
            "331" | "No network service" => Self::NoNetworkService,
            "332" | "Network timeout" => Self::NetworkTimeout,
            "500" | "Unknown error" => Self::Unknown,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Serial transport failure: timeout, read/write or framing parse error.
    #[error("AT transport error: {0:?}")]
    Atat(atat::Error),

    /// The modem answered with an error result code.
    #[error("{0}")]
    Device(DeviceError),

    /// The response did not match the expected grammar.
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    WrongState(String),

    #[error("{0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    TooMany(String),

    #[error("{0}")]
    NoPort(String),

    #[error("port is connected")]
    Connected,

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

impl Error {
    /// Whether the error was reported by the device rather than the
    /// transport or this crate.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::Device(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Atat(atat::Error::Timeout))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn cme(&self) -> Option<CmeError> {
        match self {
            Self::Device(DeviceError::Cme(e)) => Some(*e),
            _ => None,
        }
    }

    pub(crate) fn connection(&self) -> Option<ConnectionError> {
        match self {
            Self::Device(DeviceError::Connection(e)) => Some(*e),
            _ => None,
        }
    }
}

impl From<atat::Error> for Error {
    fn from(e: atat::Error) -> Self {
        Self::Atat(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}
