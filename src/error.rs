// zjs Error Handling Module
// Load-time and call-time errors with help text and a call trace

use colored::*;
use std::fmt;

/// Types of errors raised by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NameConflict,
    InvalidSuperCall,
    InvalidName,
    TypeError,
    AttributeError,
    ArgumentError,
    RuntimeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NameConflict => write!(f, "NameConflict"),
            ErrorKind::InvalidSuperCall => write!(f, "InvalidSuperCall"),
            ErrorKind::InvalidName => write!(f, "InvalidName"),
            ErrorKind::TypeError => write!(f, "TypeError"),
            ErrorKind::AttributeError => write!(f, "AttributeError"),
            ErrorKind::ArgumentError => write!(f, "ArgumentError"),
            ErrorKind::RuntimeError => write!(f, "RuntimeError"),
        }
    }
}

/// Main error type for zjs
#[derive(Debug, Clone)]
pub struct ZjsError {
    pub kind: ErrorKind,
    pub message: String,
    pub help: Option<String>,
    /// Fullnames of the functions the error propagated through, innermost first
    pub trace: Vec<String>,
}

impl ZjsError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            help: None,
            trace: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn push_frame(&mut self, frame: impl Into<String>) {
        self.trace.push(frame.into());
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Format the error for terminal display
    pub fn format(&self) -> String {
        let mut output = format!(
            "{}: {}\n",
            self.kind.to_string().red().bold(),
            self.message.white().bold()
        );

        if let Some(ref help) = self.help {
            output.push_str(&format!("\n      {}: {}\n", "Help".cyan().bold(), help));
        }

        if !self.trace.is_empty() {
            output.push_str(&format!("\n{}:\n", "Call trace".yellow().bold()));
            for frame in &self.trace {
                output.push_str(&format!("  at {}\n", frame));
            }
        }

        output
    }
}

impl fmt::Display for ZjsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ZjsError {}

/// Result type for zjs operations
pub type ZjsResult<T> = Result<T, ZjsError>;

// Convenience constructors for common errors
impl ZjsError {
    pub fn name_conflict(name: &str, namespace: &str) -> Self {
        let owner = if namespace.is_empty() { "<root>" } else { namespace };
        Self::new(
            ErrorKind::NameConflict,
            format!("'{}' is already defined in namespace '{}'", name, owner),
        )
        .with_help("each name may be registered once per namespace; check module load order")
    }

    pub fn invalid_super_call(count: usize) -> Self {
        Self::new(
            ErrorKind::InvalidSuperCall,
            format!("super call expects 1 to 3 arguments, got {}", count),
        )
        .with_help("pass the method's own arguments object first")
    }

    pub fn invalid_name(name: &str) -> Self {
        Self::new(ErrorKind::InvalidName, format!("'{}' is not a valid identifier", name))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AttributeError, message)
    }

    pub fn argument_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentError, message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }
}
