use std::fmt;

use failure::{Backtrace, Context, Fail};

pub mod prelude {
    pub use super::{err_msg, ClCryptoError, ClCryptoErrorExt, ClCryptoErrorKind, ClCryptoResult};
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ClCryptoErrorKind {
    // Common errors
    #[fail(display = "Invalid library state")]
    InvalidState,
    #[fail(display = "Invalid structure")]
    InvalidStructure,
    #[fail(display = "Invalid parameter {}", _0)]
    InvalidParam(u32),
    // Group errors
    #[fail(display = "Unsupported parameter size")]
    UnsupportedParameterSize,
    #[fail(display = "Group generation failed")]
    GroupGenerationFailure,
    #[fail(display = "Element is not in group")]
    Membership,
    // CL errors
    #[fail(display = "Proof rejected")]
    ProofRejected,
    #[fail(display = "Attribute index out of range")]
    IndexOutOfRange,
    #[fail(display = "Attribute capacity exceeded")]
    CapacityExceeded,
    #[fail(display = "Unbound pseudonym")]
    UnboundNym,
    #[fail(display = "Nonce rejected")]
    NonceRejected,
}

impl ClCryptoErrorKind {
    /// Malformed input as opposed to a cryptographic check that did not pass.
    pub fn is_malformed_input(&self) -> bool {
        match *self {
            ClCryptoErrorKind::InvalidStructure
            | ClCryptoErrorKind::InvalidParam(_)
            | ClCryptoErrorKind::UnsupportedParameterSize
            | ClCryptoErrorKind::IndexOutOfRange
            | ClCryptoErrorKind::CapacityExceeded => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct ClCryptoError {
    inner: Context<ClCryptoErrorKind>,
}

impl Fail for ClCryptoError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl ClCryptoError {
    pub fn from_msg<D>(kind: ClCryptoErrorKind, msg: D) -> ClCryptoError
        where D: fmt::Display + fmt::Debug + Send + Sync + 'static {
        ClCryptoError { inner: Context::new(msg).context(kind) }
    }

    pub fn kind(&self) -> ClCryptoErrorKind {
        *self.inner.get_context()
    }
}

impl fmt::Display for ClCryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;

        for cause in <dyn Fail>::iter_chain(&self.inner) {
            if first {
                first = false;
                writeln!(f, "Error: {}", cause)?;
            } else {
                writeln!(f, "Caused by: {}", cause)?;
            }
        }

        Ok(())
    }
}

pub fn err_msg<D>(kind: ClCryptoErrorKind, msg: D) -> ClCryptoError
    where D: fmt::Display + fmt::Debug + Send + Sync + 'static {
    ClCryptoError::from_msg(kind, msg)
}

impl From<Context<ClCryptoErrorKind>> for ClCryptoError {
    fn from(inner: Context<ClCryptoErrorKind>) -> ClCryptoError {
        ClCryptoError { inner }
    }
}

impl From<ClCryptoErrorKind> for ClCryptoError {
    fn from(kind: ClCryptoErrorKind) -> ClCryptoError {
        ClCryptoError { inner: Context::new(kind) }
    }
}

impl From<log::SetLoggerError> for ClCryptoError {
    fn from(err: log::SetLoggerError) -> ClCryptoError {
        err_msg(ClCryptoErrorKind::InvalidState, format!("Logger is already set: {}", err))
    }
}

impl From<serde_json::Error> for ClCryptoError {
    fn from(err: serde_json::Error) -> ClCryptoError {
        err_msg(ClCryptoErrorKind::InvalidStructure, format!("Invalid json: {}", err))
    }
}

pub type ClCryptoResult<T> = Result<T, ClCryptoError>;

/// Extension methods for `Error`.
pub trait ClCryptoErrorExt {
    fn to_cl<D>(self, kind: ClCryptoErrorKind, msg: D) -> ClCryptoError where D: fmt::Display + Send + Sync + 'static;
}

impl<E> ClCryptoErrorExt for E where E: Fail
{
    fn to_cl<D>(self, kind: ClCryptoErrorKind, msg: D) -> ClCryptoError where D: fmt::Display + Send + Sync + 'static {
        self.context(msg).context(kind).into()
    }
}
