//! Evaluation faults.
//!
//! A [`Fault`] is data, not a process error: it stops the fragment that
//! raised it, gets rendered into that request's stderr buffer, and never
//! propagates past the `Execute` call.

use std::fmt;

/// The kind of a runtime fault, named like the error classes scripts expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    SyntaxError,
    NameError,
    TypeError,
    ValueError,
    ZeroDivisionError,
    IndexError,
    KeyError,
    OverflowError,
    RuntimeError,
}

impl FaultKind {
    pub fn name(self) -> &'static str {
        match self {
            FaultKind::SyntaxError => "SyntaxError",
            FaultKind::NameError => "NameError",
            FaultKind::TypeError => "TypeError",
            FaultKind::ValueError => "ValueError",
            FaultKind::ZeroDivisionError => "ZeroDivisionError",
            FaultKind::IndexError => "IndexError",
            FaultKind::KeyError => "KeyError",
            FaultKind::OverflowError => "OverflowError",
            FaultKind::RuntimeError => "RuntimeError",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A contained evaluation fault: kind plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(FaultKind::SyntaxError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Self::new(FaultKind::NameError, format!("name '{name}' is not defined"))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ValueError, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ZeroDivisionError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::IndexError, message)
    }

    pub fn key_error(key_repr: impl Into<String>) -> Self {
        Self::new(FaultKind::KeyError, key_repr)
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self::new(FaultKind::OverflowError, message)
    }
}

/// Renders as `Kind: message`, the shape written into stderr buffers.
impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
