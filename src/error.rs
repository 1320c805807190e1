use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedError>;

/// Error kind taxonomy carried on every failed bridge response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidBuffer,
    InvalidPane,
    InvalidFile,
    AlreadyLinked,
    NotLinked,
    OutOfBounds,
    BoundaryViolation,
    IoFailure,
    ScriptFault,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidBuffer => "invalid_buffer",
            ErrorKind::InvalidPane => "invalid_pane",
            ErrorKind::InvalidFile => "invalid_file",
            ErrorKind::AlreadyLinked => "already_linked",
            ErrorKind::NotLinked => "not_linked",
            ErrorKind::OutOfBounds => "out_of_bounds",
            ErrorKind::BoundaryViolation => "boundary_violation",
            ErrorKind::IoFailure => "io_failure",
            ErrorKind::ScriptFault => "script_fault",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", kind.name())]
pub struct RedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_buffer(detail: impl std::fmt::Debug) -> Self {
        Self::new(
            ErrorKind::InvalidBuffer,
            format!("no buffer for id {:?}", detail),
        )
    }

    pub fn invalid_pane(detail: impl std::fmt::Debug) -> Self {
        Self::new(ErrorKind::InvalidPane, format!("no pane for id {:?}", detail))
    }

    pub fn invalid_file(detail: impl std::fmt::Debug) -> Self {
        Self::new(ErrorKind::InvalidFile, format!("no file for id {:?}", detail))
    }

    pub fn out_of_bounds(what: &str, index: usize, limit: usize) -> Self {
        Self::new(
            ErrorKind::OutOfBounds,
            format!("{} index {} out of bounds (limit {})", what, index, limit),
        )
    }

    pub fn boundary(byte_index: usize) -> Self {
        Self::new(
            ErrorKind::BoundaryViolation,
            format!("byte index {} is not a codepoint boundary", byte_index),
        )
    }

    pub fn io(context: &str, err: std::io::Error) -> Self {
        Self::new(ErrorKind::IoFailure, format!("{}: {}", context, err))
    }

    pub fn script_fault(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ScriptFault, message)
    }
}
