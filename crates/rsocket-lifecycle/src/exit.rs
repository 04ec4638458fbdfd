use std::fmt;
use std::io;

use rsocket_frame::FrameError;

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => FAILURE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn json_error(context: &str, err: serde_json::Error) -> CliError {
    if err.is_io() {
        return CliError::new(INTERNAL, format!("{context}: {err}"));
    }
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_failure() {
        let err = io_error("read", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("read: "));
    }

    #[test]
    fn malformed_json_is_invalid_data() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(json_error("parse", err).code, DATA_INVALID);
    }

    #[test]
    fn frame_validation_is_invalid_data() {
        assert_eq!(frame_error("step 1", FrameError::ZeroRequestN).code, DATA_INVALID);
    }
}
