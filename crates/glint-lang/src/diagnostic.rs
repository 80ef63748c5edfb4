use crate::ast::NodeId;
use crate::lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// What stage of analysis produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum DiagnosticKind {
    LexError,
    SyntaxError,
    UnresolvedReference,
    Redefinition,
    TypeError,
    AmbiguousOverload,
    UnusedVariable,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
    /// The node the diagnostic is attached to, when there is one.
    #[serde(skip)]
    pub node: Option<NodeId>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            kind,
            message: message.into(),
            span,
            node: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(kind, message, span)
        }
    }

    pub fn at_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Info => "info",
        };
        write!(f, "{prefix}: {} at {}:{}", self.message, self.span.line, self.span.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::error(
            DiagnosticKind::SyntaxError,
            "expected ';', found '}'",
            Span::new(10, 11, 2, 5),
        );
        assert_eq!(d.to_string(), "error: expected ';', found '}' at 2:5");
    }

    #[test]
    fn test_warning_keeps_kind() {
        let d = Diagnostic::warning(DiagnosticKind::UnusedVariable, "unused", Span::default());
        assert_eq!(d.severity, DiagnosticSeverity::Warning);
        assert_eq!(d.kind, DiagnosticKind::UnusedVariable);
        assert!(!d.is_error());
    }
}
