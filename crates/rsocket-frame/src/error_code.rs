//! Protocol error codes.
//!
//! Codes below 0x200 are connection-scoped and only valid on stream 0.
//! Codes from 0x200 up to 0x2FF are stream-scoped.

/// The SETUP frame is invalid for the server.
pub const INVALID_SETUP: u32 = 0x0000_0001;

/// Some (or all) of the SETUP parameters are not supported by the server.
pub const UNSUPPORTED_SETUP: u32 = 0x0000_0002;

/// The server rejected the SETUP.
pub const REJECTED_SETUP: u32 = 0x0000_0003;

/// The server rejected the RESUME.
pub const REJECTED_RESUME: u32 = 0x0000_0004;

/// The connection is being terminated.
pub const CONNECTION_ERROR: u32 = 0x0000_0101;

/// The connection is being closed cleanly.
pub const CONNECTION_CLOSE: u32 = 0x0000_0102;

/// Application-layer logic generated an error.
pub const APPLICATION_ERROR: u32 = 0x0000_0201;

/// The responder rejected the request without processing it.
pub const REJECTED: u32 = 0x0000_0202;

/// The responder cancelled the request but may have started processing it.
pub const CANCELED: u32 = 0x0000_0203;

/// The request is invalid.
pub const INVALID: u32 = 0x0000_0204;

/// Returns a human-readable name for an error code.
pub fn error_code_name(code: u32) -> &'static str {
    match code {
        INVALID_SETUP => "INVALID_SETUP",
        UNSUPPORTED_SETUP => "UNSUPPORTED_SETUP",
        REJECTED_SETUP => "REJECTED_SETUP",
        REJECTED_RESUME => "REJECTED_RESUME",
        CONNECTION_ERROR => "CONNECTION_ERROR",
        CONNECTION_CLOSE => "CONNECTION_CLOSE",
        APPLICATION_ERROR => "APPLICATION_ERROR",
        REJECTED => "REJECTED",
        CANCELED => "CANCELED",
        INVALID => "INVALID",
        _ => "UNKNOWN",
    }
}

/// Parse a code name produced by [`error_code_name`].
pub fn error_code_from_name(name: &str) -> Option<u32> {
    let code = match name {
        "INVALID_SETUP" => INVALID_SETUP,
        "UNSUPPORTED_SETUP" => UNSUPPORTED_SETUP,
        "REJECTED_SETUP" => REJECTED_SETUP,
        "REJECTED_RESUME" => REJECTED_RESUME,
        "CONNECTION_ERROR" => CONNECTION_ERROR,
        "CONNECTION_CLOSE" => CONNECTION_CLOSE,
        "APPLICATION_ERROR" => APPLICATION_ERROR,
        "REJECTED" => REJECTED,
        "CANCELED" => CANCELED,
        "INVALID" => INVALID,
        _ => return None,
    };
    Some(code)
}

/// Returns true if the code is one of the defined connection-scoped codes.
pub fn is_connection_scoped(code: u32) -> bool {
    matches!(
        code,
        INVALID_SETUP
            | UNSUPPORTED_SETUP
            | REJECTED_SETUP
            | REJECTED_RESUME
            | CONNECTION_ERROR
            | CONNECTION_CLOSE
    )
}

/// Returns true if the code is one of the defined stream-scoped codes.
pub fn is_stream_scoped(code: u32) -> bool {
    matches!(code, APPLICATION_ERROR | REJECTED | CANCELED | INVALID)
}

/// Every defined code, connection-scoped first.
pub const ALL: [u32; 10] = [
    INVALID_SETUP,
    UNSUPPORTED_SETUP,
    REJECTED_SETUP,
    REJECTED_RESUME,
    CONNECTION_ERROR,
    CONNECTION_CLOSE,
    APPLICATION_ERROR,
    REJECTED,
    CANCELED,
    INVALID,
];
