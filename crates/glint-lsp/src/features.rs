//! Editor features computed from one [`Analysis`]. Everything here is
//! synchronous and independent of the client connection.

use glint_lang::builtins::builtins;
use glint_lang::resolver::Binding;
use glint_lang::types::Type;
use glint_lang::{
    color_edits, color_literals, outline, Analysis, DeclKind, DiagnosticKind, DiagnosticSeverity,
    NodeId, NodeKind, OutlineItem,
};
use tower_lsp::lsp_types as lsp;

use crate::line_index::LineIndex;

const KEYWORDS: &[&str] = &[
    "break", "case", "const", "continue", "default", "discard", "do", "else", "false", "flat",
    "for", "highp", "if", "in", "inout", "invariant", "layout", "lowp", "mediump", "out",
    "precision", "return", "shared", "smooth", "struct", "switch", "true", "uniform", "buffer",
    "while",
];

const SCALAR_TYPES: &[&str] = &["void", "bool", "int", "uint", "float", "double", "atomic_uint"];

const SAMPLER_TYPES: &[&str] = &[
    "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler2DShadow", "sampler2DArray",
    "samplerCubeShadow", "isampler2D", "usampler2D", "image2D", "image3D",
];

pub fn diagnostics(analysis: &Analysis, index: &LineIndex) -> Vec<lsp::Diagnostic> {
    analysis
        .diagnostics()
        .into_iter()
        .map(|d| lsp::Diagnostic {
            range: index.range(d.span),
            severity: Some(match d.severity {
                DiagnosticSeverity::Error => lsp::DiagnosticSeverity::ERROR,
                DiagnosticSeverity::Warning => lsp::DiagnosticSeverity::WARNING,
                DiagnosticSeverity::Info => lsp::DiagnosticSeverity::INFORMATION,
            }),
            code: Some(lsp::NumberOrString::String(format!("{:?}", d.kind))),
            source: Some("glint".to_string()),
            message: d.message,
            tags: (d.kind == DiagnosticKind::UnusedVariable)
                .then(|| vec![lsp::DiagnosticTag::UNNECESSARY]),
            ..Default::default()
        })
        .collect()
}

/// Hover text at `offset`: the signature of a declared name, the overload a
/// call resolved to, or the type (and constant value) of an expression.
pub fn hover_text(analysis: &Analysis, offset: usize) -> Option<String> {
    let resolution = analysis.resolution();
    if let Some(decl) = resolution
        .declarations()
        .iter()
        .find(|d| d.name_span.contains(offset))
    {
        return Some(analysis.declaration_signature(decl));
    }

    let tree = analysis.tree();
    let node = analysis.node_at(offset);
    if let NodeKind::TypeSpecifier { .. } = tree.kind(node) {
        let decl = analysis.declaration_of(node)?;
        return Some(analysis.declaration_signature(decl));
    }
    if !tree.kind(node).is_expression() {
        return None;
    }
    if let Some(call) = callee_of(analysis, node) {
        return analysis
            .resolved_function(call)
            .map(|sig| sig.to_string())
            .or_else(|| {
                let NodeKind::Identifier(ident) = tree.kind(node) else {
                    return None;
                };
                builtins()
                    .functions(&ident.name)
                    .first()
                    .map(|sig| sig.to_string())
            });
    }

    let mut text = match (tree.kind(node), resolution.binding(node)) {
        (NodeKind::Identifier(_), Some(Binding::Declaration(_))) => {
            let decl = analysis.declaration_of(node)?;
            analysis.declaration_signature(decl)
        }
        (NodeKind::Identifier(ident), Some(Binding::Builtin)) => {
            let var = builtins().variable(&ident.name)?;
            format!("{} {}", var.ty, var.name)
        }
        _ => {
            let ty = analysis.type_of(node);
            if ty.is_error() {
                return None;
            }
            ty.to_string()
        }
    };
    if let Some(value) = analysis.constant_value_of(node) {
        text.push_str(&format!(" = {}", value));
    }
    Some(text)
}

pub fn hover(analysis: &Analysis, offset: usize) -> Option<lsp::Hover> {
    let text = hover_text(analysis, offset)?;
    Some(lsp::Hover {
        contents: lsp::HoverContents::Markup(lsp::MarkupContent {
            kind: lsp::MarkupKind::Markdown,
            value: format!("```glsl\n{}\n```", text),
        }),
        range: None,
    })
}

/// The call whose callee is `node`.
fn callee_of(analysis: &Analysis, node: NodeId) -> Option<NodeId> {
    let parent = analysis.tree().parent(node)?;
    match analysis.tree().kind(parent) {
        NodeKind::Call {
            callee,
            constructor: false,
            ..
        } if *callee == node => Some(parent),
        _ => None,
    }
}

/// Completion candidates at `offset`. After a `.` these are the members of
/// the expression before it; elsewhere, visible names, built-ins and
/// keywords.
pub fn completions(analysis: &Analysis, offset: usize) -> Vec<lsp::CompletionItem> {
    let source = analysis.source();
    let offset = offset.min(source.len());
    let word_start = source[..offset]
        .trim_end_matches(|c: char| c.is_ascii_alphanumeric() || c == '_')
        .len();
    if source[..word_start].ends_with('.') && word_start >= 2 {
        return member_completions(analysis, word_start - 2);
    }

    let mut items: Vec<lsp::CompletionItem> = analysis
        .declarations_visible_at(offset)
        .into_iter()
        .filter(|d| d.kind != DeclKind::Field)
        .map(|d| lsp::CompletionItem {
            label: d.name.clone(),
            kind: Some(completion_kind(d.kind)),
            detail: Some(analysis.declaration_signature(d)),
            ..Default::default()
        })
        .collect();

    let table = builtins();
    items.extend(table.function_names().into_iter().map(|name| {
        let overloads = table.functions(name);
        let detail = match overloads {
            [only] => only.to_string(),
            [first, rest @ ..] => format!("{} (+{} overloads)", first, rest.len()),
            [] => String::new(),
        };
        lsp::CompletionItem {
            label: name.to_string(),
            kind: Some(lsp::CompletionItemKind::FUNCTION),
            detail: Some(detail),
            ..Default::default()
        }
    }));
    items.extend(table.variables().into_iter().map(|var| lsp::CompletionItem {
        label: var.name.clone(),
        kind: Some(lsp::CompletionItemKind::VARIABLE),
        detail: Some(var.ty.to_string()),
        ..Default::default()
    }));
    items.extend(type_names().into_iter().map(|name| lsp::CompletionItem {
        label: name,
        kind: Some(lsp::CompletionItemKind::CLASS),
        ..Default::default()
    }));
    items.extend(KEYWORDS.iter().map(|kw| lsp::CompletionItem {
        label: kw.to_string(),
        kind: Some(lsp::CompletionItemKind::KEYWORD),
        ..Default::default()
    }));
    items
}

/// Members of the expression whose last character is at `last`.
fn member_completions(analysis: &Analysis, last: usize) -> Vec<lsp::CompletionItem> {
    let tree = analysis.tree();
    let mut base = analysis.node_at(last);
    if !tree.kind(base).is_expression() {
        return Vec::new();
    }
    while let Some(parent) = tree.parent(base) {
        if !tree.kind(parent).is_expression() || tree.span(parent).end != last + 1 {
            break;
        }
        base = parent;
    }

    let ty = analysis.type_of(base);
    let field = |label: String, detail: String| lsp::CompletionItem {
        label,
        kind: Some(lsp::CompletionItemKind::FIELD),
        detail: Some(detail),
        ..Default::default()
    };
    let length = || lsp::CompletionItem {
        label: "length".to_string(),
        kind: Some(lsp::CompletionItemKind::METHOD),
        detail: Some("int length()".to_string()),
        ..Default::default()
    };
    match &ty {
        Type::Struct(s) => s
            .fields
            .iter()
            .map(|f| field(f.name.clone(), f.ty.to_string()))
            .collect(),
        Type::Scalar(kind) | Type::Vector(kind, _) => {
            let size = ty.component_count().unwrap_or(1) as usize;
            let mut items: Vec<lsp::CompletionItem> = ["xyzw", "rgba", "stpq"]
                .iter()
                .flat_map(|set| {
                    let letters = &set[..size];
                    let singles = letters.chars().map(|c| c.to_string());
                    let prefixes = (2..=size).map(move |n| letters[..n].to_string());
                    singles.chain(prefixes).collect::<Vec<_>>()
                })
                .map(|swizzle| {
                    let detail = Type::vector(*kind, swizzle.len() as u8).to_string();
                    field(swizzle, detail)
                })
                .collect();
            if ty.is_vector() {
                items.push(length());
            }
            items
        }
        Type::Matrix { .. } | Type::Array(..) => vec![length()],
        _ => Vec::new(),
    }
}

fn type_names() -> Vec<String> {
    let mut names: Vec<String> = SCALAR_TYPES.iter().map(|s| s.to_string()).collect();
    for prefix in ["", "b", "i", "u", "d"] {
        names.extend((2..=4).map(|n| format!("{}vec{}", prefix, n)));
    }
    for prefix in ["", "d"] {
        for cols in 2..=4 {
            names.push(format!("{}mat{}", prefix, cols));
            names.extend((2..=4).map(|rows| format!("{}mat{}x{}", prefix, cols, rows)));
        }
    }
    names.extend(SAMPLER_TYPES.iter().map(|s| s.to_string()));
    names
}

fn completion_kind(kind: DeclKind) -> lsp::CompletionItemKind {
    match kind {
        DeclKind::Variable | DeclKind::Parameter => lsp::CompletionItemKind::VARIABLE,
        DeclKind::Function => lsp::CompletionItemKind::FUNCTION,
        DeclKind::Struct => lsp::CompletionItemKind::STRUCT,
        DeclKind::Field => lsp::CompletionItemKind::FIELD,
        DeclKind::Block => lsp::CompletionItemKind::INTERFACE,
    }
}

/// Name span of the declaration the reference at `offset` binds to.
pub fn definition(analysis: &Analysis, offset: usize) -> Option<glint_lang::Span> {
    let node = analysis.node_at(offset);
    analysis.declaration_of(node).map(|d| d.name_span)
}

#[allow(deprecated)]
fn document_symbol(item: OutlineItem, index: &LineIndex) -> lsp::DocumentSymbol {
    lsp::DocumentSymbol {
        name: item.name,
        detail: (!item.detail.is_empty()).then_some(item.detail),
        kind: match item.kind {
            DeclKind::Variable | DeclKind::Parameter => lsp::SymbolKind::VARIABLE,
            DeclKind::Function => lsp::SymbolKind::FUNCTION,
            DeclKind::Struct => lsp::SymbolKind::STRUCT,
            DeclKind::Field => lsp::SymbolKind::FIELD,
            DeclKind::Block => lsp::SymbolKind::INTERFACE,
        },
        tags: None,
        deprecated: None,
        range: index.range(item.span),
        selection_range: index.range(item.selection_span),
        children: (!item.children.is_empty()).then(|| {
            item.children
                .into_iter()
                .map(|child| document_symbol(child, index))
                .collect()
        }),
    }
}

pub fn document_symbols(analysis: &Analysis, index: &LineIndex) -> Vec<lsp::DocumentSymbol> {
    outline(analysis)
        .into_iter()
        .map(|item| document_symbol(item, index))
        .collect()
}

pub fn document_colors(analysis: &Analysis, index: &LineIndex) -> Vec<lsp::ColorInformation> {
    color_literals(analysis)
        .into_iter()
        .map(|literal| lsp::ColorInformation {
            range: index.range(literal.span),
            color: lsp::Color {
                red: literal.color.r,
                green: literal.color.g,
                blue: literal.color.b,
                alpha: literal.color.a,
            },
        })
        .collect()
}

/// Presentations for recoloring the literal whose span is `range`. Empty
/// when nothing there can be rewritten in place.
pub fn color_presentations(
    analysis: &Analysis,
    index: &LineIndex,
    range: lsp::Range,
    color: lsp::Color,
) -> Vec<lsp::ColorPresentation> {
    let target = glint_core::Color::rgba(color.red, color.green, color.blue, color.alpha);
    let Some(literal) = color_literals(analysis)
        .into_iter()
        .find(|literal| index.range(literal.span) == range)
    else {
        return Vec::new();
    };
    let Some(edits) = color_edits(analysis, literal.call, target) else {
        return Vec::new();
    };
    let mut edits = edits.into_iter().map(|edit| lsp::TextEdit {
        range: index.range(edit.span),
        new_text: edit.new_text,
    });
    let text_edit = edits.next();
    let additional: Vec<lsp::TextEdit> = edits.collect();
    vec![lsp::ColorPresentation {
        label: target.to_string(),
        text_edit,
        additional_text_edits: (!additional.is_empty()).then_some(additional),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = "#version 450
struct Light { vec3 color; float power; };
uniform Light light;
const float SCALE = 2.0 * 3.0;
vec3 tint = vec3(1.0, 0.5, 0.0);
float brightness(vec3 c) { return dot(c, vec3(0.299, 0.587, 0.114)); }
void main() {
    vec3 lit = light.color * SCALE;
    float b = brightness(lit);
}
";

    fn setup() -> (Analysis, LineIndex) {
        (Analysis::new(SHADER), LineIndex::new(SHADER))
    }

    fn offset_of(needle: &str) -> usize {
        SHADER.find(needle).unwrap()
    }

    fn labels(items: &[lsp::CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn test_diagnostics_convert_ranges() {
        let src = "void main() {\n  int x = 1.5;\n}";
        let analysis = Analysis::new(src);
        let diagnostics = diagnostics(&analysis, &LineIndex::new(src));
        let error = diagnostics
            .iter()
            .find(|d| d.severity == Some(lsp::DiagnosticSeverity::ERROR))
            .unwrap();
        assert_eq!(error.range.start.line, 1);
        assert_eq!(error.source.as_deref(), Some("glint"));
        assert!(diagnostics
            .iter()
            .any(|d| d.tags == Some(vec![lsp::DiagnosticTag::UNNECESSARY])));
    }

    #[test]
    fn test_hover() {
        let (analysis, _) = setup();
        assert_eq!(
            hover_text(&analysis, offset_of("tint")).as_deref(),
            Some("vec3 tint")
        );
        assert_eq!(
            hover_text(&analysis, offset_of("SCALE;") + 1).as_deref(),
            Some("const float SCALE = 6.0")
        );
        assert_eq!(
            hover_text(&analysis, offset_of("dot(")).as_deref(),
            Some("float dot(vec3, vec3)")
        );
        assert_eq!(
            hover_text(&analysis, offset_of("brightness(lit)")).as_deref(),
            Some("float brightness(vec3)")
        );
        let markup = hover(&analysis, offset_of("light.color")).unwrap();
        let lsp::HoverContents::Markup(content) = markup.contents else {
            panic!("expected markup");
        };
        assert!(content.value.contains("uniform Light light"));
    }

    #[test]
    fn test_completion_scope_and_builtins() {
        let (analysis, _) = setup();
        let items = completions(&analysis, offset_of("float b"));
        let labels = labels(&items);
        for expected in ["lit", "tint", "brightness", "Light", "dot", "gl_FragCoord", "vec3", "return"] {
            assert!(labels.contains(&expected), "missing {}", expected);
        }
        assert!(!labels.contains(&"c"));
    }

    #[test]
    fn test_member_completion() {
        let src = "struct Light { vec3 color; float power; };\nuniform Light light;\nvoid main() { vec3 v; v.; light.; }";
        let analysis = Analysis::new(src);
        let swizzles = completions(&analysis, src.find("v.;").unwrap() + 2);
        let swizzles = labels(&swizzles);
        assert!(swizzles.contains(&"x") && swizzles.contains(&"rgb") && swizzles.contains(&"length"));
        assert!(!swizzles.contains(&"w"));

        let fields = completions(&analysis, src.find("light.;").unwrap() + 6);
        assert_eq!(labels(&fields), ["color", "power"]);
    }

    #[test]
    fn test_definition() {
        let (analysis, _) = setup();
        let span = definition(&analysis, offset_of("lit)")).unwrap();
        assert_eq!(span.start, offset_of("lit ="));
        assert_eq!(definition(&analysis, offset_of("void main")), None);
    }

    #[test]
    fn test_document_symbols_nest() {
        let (analysis, index) = setup();
        let symbols = document_symbols(&analysis, &index);
        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Light", "light", "SCALE", "tint", "brightness", "main"]);
        let light = &symbols[0];
        assert_eq!(light.kind, lsp::SymbolKind::STRUCT);
        assert_eq!(light.children.as_ref().map(Vec::len), Some(2));
        assert_eq!(symbols[0].selection_range.start, lsp::Position::new(1, 7));
    }

    #[test]
    fn test_colors_and_presentation() {
        let (analysis, index) = setup();
        let colors = document_colors(&analysis, &index);
        // The luma weights read as a color too.
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].color.green, 0.5);

        let red = lsp::Color {
            red: 1.0,
            green: 0.0,
            blue: 0.0,
            alpha: 1.0,
        };
        let presentations = color_presentations(&analysis, &index, colors[0].range, red);
        assert_eq!(presentations.len(), 1);
        assert_eq!(presentations[0].label, "#FF0000");
        let first = presentations[0].text_edit.as_ref().unwrap();
        assert_eq!(first.new_text, "1.0");
        let rest = presentations[0].additional_text_edits.as_ref().unwrap();
        assert_eq!(rest[0].new_text, "0.0");

        let nowhere = lsp::Range::new(lsp::Position::new(0, 0), lsp::Position::new(0, 1));
        assert!(color_presentations(&analysis, &index, nowhere, red).is_empty());
    }
}
