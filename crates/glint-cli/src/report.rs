//! Plain-text rendering for the CLI.

use std::path::Path;

use glint_lang::{ColorLiteral, ColorRange, DeclKind, Diagnostic, DiagnosticSeverity, OutlineItem};

/// `path:line:column: severity[Kind]: message`
pub fn diagnostic_line(path: &Path, diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        DiagnosticSeverity::Error => "error",
        DiagnosticSeverity::Warning => "warning",
        DiagnosticSeverity::Info => "info",
    };
    format!(
        "{}:{}:{}: {}[{:?}]: {}",
        path.display(),
        diagnostic.span.line,
        diagnostic.span.column,
        severity,
        diagnostic.kind,
        diagnostic.message
    )
}

pub fn outline_tree(items: &[OutlineItem]) -> String {
    let mut out = String::new();
    write_items(&mut out, items, 0);
    out
}

fn write_items(out: &mut String, items: &[OutlineItem], depth: usize) {
    for item in items {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{} {}", kind_label(item.kind), item.name));
        if !item.detail.is_empty() {
            out.push_str(&format!(": {}", item.detail));
        }
        out.push_str(&format!("  [{}:{}]\n", item.selection_span.line, item.selection_span.column));
        write_items(out, &item.children, depth + 1);
    }
}

fn kind_label(kind: DeclKind) -> &'static str {
    match kind {
        DeclKind::Variable => "var",
        DeclKind::Parameter => "param",
        DeclKind::Function => "fn",
        DeclKind::Struct => "struct",
        DeclKind::Field => "field",
        DeclKind::Block => "block",
    }
}

pub fn color_line(source: &str, literal: &ColorLiteral) -> String {
    let range = match literal.range {
        ColorRange::Normalized => "0-1",
        ColorRange::Byte => "0-255",
    };
    format!(
        "{}:{}  {}  {:<5}  {}",
        literal.span.line,
        literal.span.column,
        literal.color,
        range,
        source.get(literal.span.start..literal.span.end).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_lang::{color_literals, outline, Analysis};

    #[test]
    fn test_diagnostic_line() {
        let analysis = Analysis::new("void main() {\n  int x = 1.5;\n}");
        let diagnostic = analysis
            .diagnostics()
            .into_iter()
            .find(Diagnostic::is_error)
            .unwrap();
        let line = diagnostic_line(Path::new("a.frag"), &diagnostic);
        assert!(line.starts_with("a.frag:2:"), "{}", line);
        assert!(line.contains("error[TypeError]"));
    }

    #[test]
    fn test_outline_tree_indents_children() {
        let analysis = Analysis::new("float f(float a) { return a; }");
        let text = outline_tree(&outline(&analysis));
        assert_eq!(text, "fn f: (float) -> float  [1:7]\n  param a: float  [1:15]\n");
    }

    #[test]
    fn test_color_line() {
        let src = "vec3 c = vec3(255.0, 0.0, 0.0);";
        let analysis = Analysis::new(src);
        let literals = color_literals(&analysis);
        assert_eq!(
            color_line(src, &literals[0]),
            "1:10  #FF0000  0-255  vec3(255.0, 0.0, 0.0)"
        );
    }
}
