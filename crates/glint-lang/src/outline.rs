//! Document outline: declarations nested by the construct that contains them.

use std::collections::HashMap;

use serde::Serialize;

use crate::analysis::Analysis;
use crate::ast::NodeId;
use crate::lexer::Span;
use crate::resolver::{DeclId, DeclKind, Declaration};
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineItem {
    pub name: String,
    /// Type for variables, `(params) -> return` for functions.
    pub detail: String,
    pub kind: DeclKind,
    /// The whole declaration.
    pub span: Span,
    /// The declared name.
    pub selection_span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

/// Outline of the whole translation unit, ordered by source position.
pub fn outline(analysis: &Analysis) -> Vec<OutlineItem> {
    let resolution = analysis.resolution();
    let tree = analysis.tree();
    let containers: HashMap<NodeId, DeclId> = resolution
        .declarations()
        .iter()
        .filter(|d| matches!(d.kind, DeclKind::Function | DeclKind::Struct | DeclKind::Block))
        .map(|d| (d.node, d.id))
        .collect();

    let mut children: HashMap<Option<DeclId>, Vec<&Declaration>> = HashMap::new();
    for decl in resolution.declarations() {
        // A block instance sits beside its block, not inside it.
        let start = match (decl.kind, decl.type_node) {
            (DeclKind::Variable, None) => tree.parent(decl.node).unwrap_or(decl.node),
            _ => decl.node,
        };
        let owner = tree
            .ancestors(start)
            .find_map(|a| containers.get(&a).copied());
        children.entry(owner).or_default().push(decl);
    }
    build(analysis, &children, None)
}

fn build(
    analysis: &Analysis,
    children: &HashMap<Option<DeclId>, Vec<&Declaration>>,
    owner: Option<DeclId>,
) -> Vec<OutlineItem> {
    let mut items: Vec<OutlineItem> = children
        .get(&owner)
        .map(|decls| {
            decls
                .iter()
                .map(|decl| OutlineItem {
                    name: decl.name.clone(),
                    detail: detail(analysis, decl),
                    kind: decl.kind,
                    span: analysis.tree().span(decl.node),
                    selection_span: decl.name_span,
                    children: match decl.kind {
                        DeclKind::Function | DeclKind::Struct | DeclKind::Block => {
                            build(analysis, children, Some(decl.id))
                        }
                        _ => Vec::new(),
                    },
                })
                .collect()
        })
        .unwrap_or_default();
    items.sort_by_key(|item| item.selection_span.start);
    items
}

fn detail(analysis: &Analysis, decl: &Declaration) -> String {
    match (decl.kind, analysis.declaration_type(decl.id)) {
        (DeclKind::Function, Type::Function(sig)) => {
            let params: Vec<String> = sig.params.iter().map(|p| p.ty.to_string()).collect();
            format!("({}) -> {}", params.join(", "), sig.return_type)
        }
        (DeclKind::Struct, _) => "struct".to_string(),
        (DeclKind::Block, _) => decl.qualifiers.to_string(),
        (_, ty) => ty.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = "
struct Light { vec3 color; float power; };
uniform Globals { mat4 view; } globals;
uniform vec3 tint;
vec4 shade(vec3 n, float k) {
    float d = k;
    { vec3 c = n; }
    return vec4(n * d, 1.0);
}
";

    #[test]
    fn test_top_level_order_and_nesting() {
        let analysis = Analysis::new(SHADER);
        let items = outline(&analysis);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Light", "Globals", "globals", "tint", "shade"]);

        let light = &items[0];
        assert_eq!(light.detail, "struct");
        let fields: Vec<(&str, &str)> = light
            .children
            .iter()
            .map(|c| (c.name.as_str(), c.detail.as_str()))
            .collect();
        assert_eq!(fields, [("color", "vec3"), ("power", "float")]);

        assert_eq!(items[1].detail, "uniform");
        assert_eq!(items[1].children.len(), 1);
        assert_eq!(items[2].detail, "Globals");
    }

    #[test]
    fn test_function_detail_and_locals() {
        let analysis = Analysis::new(SHADER);
        let items = outline(&analysis);
        let shade = items.iter().find(|i| i.name == "shade").unwrap();
        assert_eq!(shade.kind, DeclKind::Function);
        assert_eq!(shade.detail, "(vec3, float) -> vec4");
        let locals: Vec<&str> = shade.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(locals, ["n", "k", "d", "c"]);
        assert!(shade.children.iter().all(|c| c.children.is_empty()));
        assert_eq!(&SHADER[shade.selection_span.start..shade.selection_span.end], "shade");
    }

    #[test]
    fn test_outline_of_broken_source() {
        let analysis = Analysis::new("float x = ; void main() { int y");
        let names: Vec<String> = outline(&analysis).into_iter().map(|i| i.name).collect();
        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"main".to_string()));
    }
}
