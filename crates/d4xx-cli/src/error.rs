// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 RealSense MIPI Platform Contributors

use std::fmt;
use std::process::ExitCode;

/// CLI-specific error type with exit code mapping
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments
    InvalidArgs(String),
    /// Camera or device node not found or inaccessible
    CameraNotFound(String),
    /// The driver rejected a request
    DeviceError(String),
    /// Operation timed out
    Timeout(String),
    /// A validation check ran but did not pass
    CheckFailed(String),
    /// General error from the d4xx library
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::CameraNotFound(msg) => write!(f, "Camera not found: {}", msg),
            CliError::DeviceError(msg) => write!(f, "Device error: {}", msg),
            CliError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            CliError::CheckFailed(msg) => write!(f, "Check failed: {}", msg),
            CliError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::InvalidArgs(_) => ExitCode::from(2),
            CliError::CameraNotFound(_) => ExitCode::from(3),
            CliError::DeviceError(_) => ExitCode::from(4),
            CliError::CheckFailed(_) => ExitCode::from(5),
            CliError::Timeout(_) => ExitCode::from(6),
            CliError::General(_) => ExitCode::from(1),
        }
    }
}

/// Map d4xx::Error to CliError with appropriate exit codes
impl From<d4xx::Error> for CliError {
    fn from(err: d4xx::Error) -> Self {
        use d4xx::Error;

        match err {
            Error::Open(path, io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    CliError::CameraNotFound(format!("{}: {}", path.display(), io_err))
                }
                _ => CliError::DeviceError(format!("{}: {}", path.display(), io_err)),
            },
            Error::Timeout(_) => CliError::Timeout(err.to_string()),
            Error::InvalidArgument(msg) => CliError::InvalidArgs(msg),
            Error::Ioctl(..) | Error::Mmap(_) | Error::NoBuffers | Error::InvalidBuffer(_) => {
                CliError::DeviceError(err.to_string())
            }
            Error::Closed | Error::TryFromInt(_) => CliError::General(err.to_string()),
        }
    }
}

/// Helper function to convert result to exit code
pub fn result_to_exit_code<T>(result: Result<T, CliError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            CliError::InvalidArgs("test".into()).exit_code(),
            ExitCode::from(2)
        );
        assert_eq!(
            CliError::CameraNotFound("test".into()).exit_code(),
            ExitCode::from(3)
        );
        assert_eq!(
            CliError::DeviceError("test".into()).exit_code(),
            ExitCode::from(4)
        );
        assert_eq!(
            CliError::CheckFailed("test".into()).exit_code(),
            ExitCode::from(5)
        );
        assert_eq!(
            CliError::Timeout("test".into()).exit_code(),
            ExitCode::from(6)
        );
        assert_eq!(
            CliError::General("test".into()).exit_code(),
            ExitCode::from(1)
        );
    }

    #[test]
    fn test_error_display() {
        let err = CliError::CameraNotFound("/dev/video0".to_string());
        assert_eq!(format!("{}", err), "Camera not found: /dev/video0");
    }

    #[test]
    fn test_library_error_mapping() {
        let missing = d4xx::Error::Open(
            PathBuf::from("/dev/video99"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(CliError::from(missing), CliError::CameraNotFound(_)));

        let timeout = d4xx::Error::Timeout(Duration::from_millis(10));
        assert!(matches!(CliError::from(timeout), CliError::Timeout(_)));

        let ioctl = d4xx::Error::Ioctl("VIDIOC_S_FMT", io::Error::from(io::ErrorKind::Other));
        assert!(matches!(CliError::from(ioctl), CliError::DeviceError(_)));

        let arg = d4xx::Error::InvalidArgument("fps must be positive".into());
        match CliError::from(arg) {
            CliError::InvalidArgs(msg) => assert_eq!(msg, "fps must be positive"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
