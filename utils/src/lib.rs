pub mod capture;
pub mod device;

/// Failures while opening a local capture device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no input device found: {0}")]
    NoDevice(String),
    #[error("input device refused to open: {0}")]
    Denied(String),
    #[error("input device is not usable: {0}")]
    Unsupported(String),
}
