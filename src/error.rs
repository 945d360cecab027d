/// Everything that can end a weigh session without a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScaleError {
    #[error("No USB scale found on this computer")]
    NoScaleFound,
    #[error("No scale with index {0} found on this computer")]
    ScaleIndexNotFound(usize),
    #[error("Permission denied to scale")]
    PermissionDenied,
    #[error("Scale has been disconnected")]
    Disconnected,
    #[error("Error in USB transfer: {0}")]
    Transfer(rusb::Error),
    #[error("Error reading scale data: unrecognized report id {0:#04x}")]
    UnrecognizedReport(u8),
    #[error("Error reading scale data: unit code {0} out of range")]
    UnknownUnit(u8),
    #[error("Scale reports Fault")]
    ScaleFault,
    #[error("Unknown status code: {0}")]
    UnknownStatus(u8),
}

impl ScaleError {
    /// Classify a failed transfer. Access and missing-device failures get
    /// their own variants so the user sees udev hints rather than a raw
    /// libusb code.
    pub fn from_transfer(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Access => ScaleError::PermissionDenied,
            rusb::Error::NoDevice => ScaleError::Disconnected,
            other => ScaleError::Transfer(other),
        }
    }
}

pub type Result<T, E = ScaleError> = std::result::Result<T, E>;
