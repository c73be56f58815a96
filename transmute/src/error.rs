use std::error;
use std::fmt;
use std::io::{self, ErrorKind};

#[derive(Debug)]
pub enum TranslateError {
    BadHeader(&'static str),
    MalformedEncoding(String),
    CorruptSection { id: u8, reason: String },
    UnsupportedConstruct {
        function: Option<u32>,
        opcode: Option<u8>,
        what: String,
    },
    InvariantViolation(String),
    Io(io::Error),
}

impl TranslateError {
    pub fn unsupported<S: Into<String>>(what: S) -> TranslateError {
        TranslateError::UnsupportedConstruct {
            function: None,
            opcode: None,
            what: what.into(),
        }
    }

    pub fn unsupported_opcode<S: Into<String>>(opcode: u8, what: S) -> TranslateError {
        TranslateError::UnsupportedConstruct {
            function: None,
            opcode: Some(opcode),
            what: what.into(),
        }
    }

    pub fn invariant<S: Into<String>>(what: S) -> TranslateError {
        TranslateError::InvariantViolation(what.into())
    }

    /// Attaches a function index to an `UnsupportedConstruct` that lacks one.
    pub fn in_function(self, index: u32) -> TranslateError {
        match self {
            TranslateError::UnsupportedConstruct { function: None, opcode, what } => {
                TranslateError::UnsupportedConstruct {
                    function: Some(index),
                    opcode,
                    what,
                }
            }
            other => other,
        }
    }

    pub fn is_eof(&self) -> bool {
        match *self {
            TranslateError::Io(ref e) => e.kind() == ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TranslateError::BadHeader(reason) => write!(f, "bad module header: {}", reason),
            TranslateError::MalformedEncoding(ref reason) => write!(f, "malformed encoding: {}", reason),
            TranslateError::CorruptSection { id, ref reason } => write!(f, "corrupt section {}: {}", id, reason),
            TranslateError::UnsupportedConstruct { function, opcode, ref what } => {
                write!(f, "unsupported construct: {}", what)?;
                if let Some(opcode) = opcode {
                    write!(f, " (opcode {:#04x})", opcode)?;
                }
                if let Some(function) = function {
                    write!(f, " in function {}", function)?;
                }
                Ok(())
            }
            TranslateError::InvariantViolation(ref what) => write!(f, "invalid module: {}", what),
            TranslateError::Io(ref e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl error::Error for TranslateError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            TranslateError::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TranslateError {
    fn from(err: io::Error) -> TranslateError {
        TranslateError::Io(err)
    }
}

impl From<leb::Error> for TranslateError {
    fn from(err: leb::Error) -> TranslateError {
        match err {
            leb::Error::UnexpectedEof => TranslateError::Io(io::Error::new(ErrorKind::UnexpectedEof, "stream ended inside a varint")),
            leb::Error::Malformed(reason) => TranslateError::MalformedEncoding(reason.to_string()),
            leb::Error::Io(e) => TranslateError::from(e),
        }
    }
}
