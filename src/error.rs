//! Diagnostics: values, not exceptions. Validation never throws — it
//! always returns the full list of diagnostics it found, so tooling built
//! on top can surface every issue in one pass rather than whack-a-mole one
//! error at a time. Diagnostics accumulate across every node and
//! connection and are reported together rather than bailing on the first.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// The error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Malformed literal properties (the "Zod-equivalent" shape checks).
    Schema,
    /// Overload mismatch, swizzle out-of-bounds, strict mixed-vector rejection.
    Type,
    /// Missing resource/variable/function/struct reference.
    Reference,
    /// Recursion (structs or functions), draw-target aliasing, cpu-only op
    /// in a shader function, `.` in a node id.
    Structural,
    /// Static out-of-bounds access against a fixed-size resource.
    Bounds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub function_id: Option<String>,
    pub node_id: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            function_id: None,
            node_id: None,
            message: message.into(),
            severity: Severity::Error,
            kind,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            function_id: None,
            node_id: None,
            message: message.into(),
            severity: Severity::Warning,
            kind,
        }
    }

    pub fn in_function(mut self, function_id: impl Into<String>) -> Self {
        self.function_id = Some(function_id.into());
        self
    }

    pub fn at_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{sev}")?;
        if let Some(fid) = &self.function_id {
            write!(f, " [{fid}")?;
            if let Some(nid) = &self.node_id {
                write!(f, ":{nid}")?;
            }
            write!(f, "]")?;
        } else if let Some(nid) = &self.node_id {
            write!(f, " [{nid}]")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// `true` iff no diagnostic in the list is fatal. Code generation only ever
/// runs against a document with zero error-severity diagnostics.
pub fn has_fatal(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}
