//! Unified error types for amf-rs

use std::fmt;
use std::io;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all remoting operations
#[derive(Debug)]
pub enum Error {
    /// I/O error during network operations
    Io(io::Error),
    /// AMF encoding/decoding error
    Codec(CodecError),
    /// Malformed or oversized HTTP request
    Http(String),
    /// Operation timed out
    Timeout,
    /// Connection was closed
    ConnectionClosed,
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Codec(e) => write!(f, "AMF error: {}", e),
            Error::Http(msg) => write!(f, "HTTP error: {}", msg),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::ConnectionClosed => write!(f, "Connection closed"),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        Error::Codec(err)
    }
}

/// The three reference tables a decoder maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTable {
    Strings,
    Traits,
    Objects,
}

impl fmt::Display for RefTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTable::Strings => write!(f, "string"),
            RefTable::Traits => write!(f, "traits"),
            RefTable::Objects => write!(f, "object"),
        }
    }
}

/// AMF encoding/decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Envelope preamble carried an AMF version above 9
    MalformedPreamble(u16),
    /// Fewer bytes available than the wire format requires
    Truncated,
    /// Type marker byte not defined by either dialect
    UnknownMarker(u8),
    /// Reference index at or past the current table length
    BadReference {
        table: RefTable,
        index: usize,
        len: usize,
    },
    /// Wire type recognized but outside the supported subset
    Unsupported(&'static str),
    /// Invalid UTF-8 in a string payload
    InvalidUtf8,
    /// Value nesting beyond the recursion cap
    NestingTooDeep,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::MalformedPreamble(version) => {
                write!(f, "Malformed stream (wrong amfVersion: {})", version)
            }
            CodecError::Truncated => write!(f, "Unexpected end of AMF data"),
            CodecError::UnknownMarker(m) => write!(f, "Unknown AMF marker: 0x{:02x}", m),
            CodecError::BadReference { table, index, len } => {
                write!(
                    f,
                    "Invalid {} reference: index {} (table length {})",
                    table, index, len
                )
            }
            CodecError::Unsupported(what) => write!(f, "Unsupported AMF type: {}", what),
            CodecError::InvalidUtf8 => write!(f, "Invalid UTF-8 in AMF string"),
            CodecError::NestingTooDeep => write!(f, "AMF nesting too deep"),
        }
    }
}

impl std::error::Error for CodecError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::io;

    #[test]
    fn test_error_display() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error"));

        let err = Error::Codec(CodecError::UnknownMarker(0xFF));
        assert!(err.to_string().contains("AMF error"));
        assert!(err.to_string().contains("0xff"));

        let err = Error::Http("missing content-length".into());
        assert!(err.to_string().contains("content-length"));

        let err = Error::Timeout;
        assert!(err.to_string().contains("timed out"));

        let err = Error::ConnectionClosed;
        assert!(err.to_string().contains("closed"));

        let err = Error::Config("invalid port".into());
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = Error::Io(io_err);
        assert!(StdError::source(&err).is_some());

        let err = Error::Codec(CodecError::Truncated);
        assert!(StdError::source(&err).is_some());

        let err = Error::Timeout;
        assert!(StdError::source(&err).is_none());
    }

    #[test]
    fn test_from_conversions() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "timeout");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));

        let err: Error = CodecError::Truncated.into();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_codec_error_display() {
        assert!(CodecError::MalformedPreamble(16)
            .to_string()
            .contains("amfVersion"));

        assert!(CodecError::UnknownMarker(0xAB).to_string().contains("0xab"));

        assert!(CodecError::Truncated.to_string().contains("end of AMF"));

        let err = CodecError::BadReference {
            table: RefTable::Strings,
            index: 4,
            len: 2,
        };
        assert!(err.to_string().contains("string reference"));
        assert!(err.to_string().contains("4"));
        assert!(err.to_string().contains("2"));

        assert!(CodecError::Unsupported("date").to_string().contains("date"));

        assert!(CodecError::InvalidUtf8.to_string().contains("UTF-8"));

        assert!(CodecError::NestingTooDeep.to_string().contains("deep"));
    }
}
