use glint_lang::builtins::builtins;
use glint_lang::checker::{resolve_overload, Overload};
use glint_lang::types::Type;
use glint_lang::{
    color_literals, parse, Analysis, ColorRange, ConstValue, DiagnosticKind, NodeId, NodeKind,
};

const SHADER: &str = "struct Material { vec3 albedo; float roughness; };
uniform Material material;
layout(location = 0) out vec4 fragColor;
const float EXPOSURE = 1.5;
float luminance(vec3 c) { return dot(c, vec3(0.2126, 0.7152, 0.0722)); }
void main() {
    vec3 base = material.albedo * EXPOSURE;
    float weights[3] = float[](0.25, 0.5, 0.25);
    for (int i = 0; i < weights.length(); i++) { base *= weights[i]; }
    fragColor = vec4(base, luminance(base));
}
";

fn expression(analysis: &Analysis, text: &str) -> NodeId {
    let tree = analysis.tree();
    tree.ids()
        .filter(|&id| tree.kind(id).is_expression() && tree.text(id) == text)
        .max()
        .unwrap_or_else(|| panic!("no expression {:?}", text))
}

#[test]
fn tree_keeps_every_token() {
    let tree = parse(SHADER);
    let expected: String = SHADER.chars().filter(|c| !c.is_whitespace()).collect();
    assert_eq!(tree.leaf_text(tree.root()), expected);
    assert!(tree.diagnostics().is_empty());

    let broken = "void main() { float x = ; }}} vec3";
    let tree = parse(broken);
    assert_eq!(tree.span(tree.root()).start, 0);
    assert_eq!(tree.span(tree.root()).end, broken.len());
}

#[test]
fn clean_shader_has_no_diagnostics() {
    let analysis = Analysis::new(SHADER);
    assert_eq!(analysis.diagnostics(), Vec::new());
}

#[test]
fn type_of_is_idempotent() {
    let analysis = Analysis::new(SHADER);
    let tree = analysis.tree();
    let first: Vec<Type> = tree
        .ids()
        .filter(|&id| tree.kind(id).is_expression())
        .map(|id| analysis.type_of(id))
        .collect();
    analysis.check_all();
    let second: Vec<Type> = tree
        .ids()
        .filter(|&id| tree.kind(id).is_expression())
        .map(|id| analysis.type_of(id))
        .collect();
    assert_eq!(first, second);
    assert_eq!(
        analysis.type_of(expression(&analysis, "material.albedo * EXPOSURE")),
        Type::vector(glint_lang::types::ScalarKind::Float, 3)
    );
}

#[test]
fn overload_resolution_is_deterministic() {
    let mut candidates = builtins().functions("clamp").to_vec();
    let args = [Type::FLOAT, Type::FLOAT, Type::FLOAT];
    let forward = match resolve_overload(&candidates, &args) {
        Overload::Unique(sig) => sig.to_string(),
        _ => panic!("expected a unique overload"),
    };
    candidates.reverse();
    let backward = match resolve_overload(&candidates, &args) {
        Overload::Unique(sig) => sig.to_string(),
        _ => panic!("expected a unique overload"),
    };
    assert_eq!(forward, backward);
    assert_eq!(forward, "float clamp(float, float, float)");

    let analysis = Analysis::new(SHADER);
    let call = expression(&analysis, "luminance(base)");
    assert_eq!(
        analysis.resolved_function(call).map(|s| s.to_string()),
        Some("float luminance(vec3)".to_string())
    );
}

#[test]
fn constructor_folds_to_composite() {
    let analysis = Analysis::new("vec3 c = vec3(1.0, 0.5, 0.25);");
    let call = expression(&analysis, "vec3(1.0, 0.5, 0.25)");
    assert!(analysis.is_constructor_call(call));
    assert_eq!(analysis.type_of(call).to_string(), "vec3");
    let folded: Vec<ConstValue> = analysis
        .constructor_arguments(call)
        .unwrap()
        .into_iter()
        .filter_map(|arg| analysis.constant_value_of(arg))
        .collect();
    assert_eq!(
        folded,
        [
            ConstValue::Float(1.0),
            ConstValue::Float(0.5),
            ConstValue::Float(0.25)
        ]
    );
    assert_eq!(
        analysis.constant_value_of(call),
        Some(ConstValue::Composite(folded))
    );
}

#[test]
fn color_ranges() {
    let analysis = Analysis::new("vec3 a = vec3(255.0, 128.0, 0.0);\nvec3 b = vec3(1.0, 0.5, 0.0);");
    let ranges: Vec<ColorRange> = color_literals(&analysis).iter().map(|c| c.range).collect();
    assert_eq!(ranges, [ColorRange::Byte, ColorRange::Normalized]);
}

#[test]
fn inner_declaration_shadows_outer() {
    let src = "void use(float v) {}\nvoid main() { int x; { float x; use(x); } }";
    let analysis = Analysis::new(src);
    let reference = expression(&analysis, "x");
    let decl = analysis.declaration_of(reference).unwrap();
    assert_eq!(analysis.declaration_signature(decl), "float x");
    assert_eq!(decl.name_span.start, src.find("float x").unwrap() + 6);
    let names: Vec<&str> = analysis
        .declarations_visible_at(src.find("use(x)").unwrap())
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names.iter().filter(|&&n| n == "x").count(), 1);
}

#[test]
fn const_cycle_is_error_without_looping() {
    let analysis = Analysis::new("const int a = b;\nconst int b = a;");
    let resolution = analysis.resolution();
    for decl in resolution.declarations() {
        assert!(analysis.declaration_type(decl.id).is_error(), "{}", decl.name);
    }
    assert!(analysis.has_errors());
}

#[test]
fn incomplete_constructor_is_covered() {
    let src = "vec3(1.0,";
    let analysis = Analysis::new(src);
    let tree = analysis.tree();
    assert_eq!(tree.span(tree.root()).end, src.len());
    assert!(analysis
        .diagnostics()
        .iter()
        .any(|d| d.kind == DiagnosticKind::SyntaxError));
    assert!(tree.ids().any(|id| {
        tree.kind(id).is_expression() && analysis.type_of(id).is_error()
    }));
}

#[test]
fn analyses_move_across_threads() {
    let sources = [SHADER, "void main() { int x = 1.5; }"];
    let handles: Vec<_> = sources
        .iter()
        .map(|src| Analysis::new(*src))
        .map(|analysis| std::thread::spawn(move || analysis.has_errors()))
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, [false, true]);
}

#[test]
fn node_kinds_at_offsets() {
    let analysis = Analysis::new(SHADER);
    let offset = SHADER.find("weights[i]").unwrap();
    let node = analysis.node_at(offset);
    assert!(matches!(analysis.tree().kind(node), NodeKind::Identifier(_)));
    assert_eq!(analysis.type_of(node).to_string(), "float[3]");
}

fn nesting_errors(src: &str) -> usize {
    let analysis = Analysis::new(src);
    let tree = analysis.tree();
    assert_eq!(tree.span(tree.root()).end, src.len());
    analysis
        .diagnostics()
        .iter()
        .filter(|d| {
            d.kind == DiagnosticKind::SyntaxError && d.message.starts_with("nesting too deep")
        })
        .count()
}

#[test]
fn deep_nesting_is_a_syntax_error() {
    let parens = format!("float x = {}1.0{};", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(nesting_errors(&parens), 1);

    let blocks = format!("void main() {{ {}{} }}", "{".repeat(10_000), "}".repeat(10_000));
    assert_eq!(nesting_errors(&blocks), 1);

    let negations = format!("void main() {{ float y = {}1.0; }}", "-".repeat(20_000));
    assert_eq!(nesting_errors(&negations), 1);

    let calls = format!(
        "float f(float v) {{ return v; }}\nfloat x = {}1.0{};",
        "f(".repeat(5_000),
        ")".repeat(5_000)
    );
    assert_eq!(nesting_errors(&calls), 1);
}

#[test]
fn compute_builtins_type_check() {
    let src = "layout(local_size_x = 8) in;\n\
               void main() {\n\
                   ivec3 count = gl_MaxComputeWorkGroupCount;\n\
                   ivec3 size = gl_MaxComputeWorkGroupSize;\n\
                   uvec3 id = gl_GlobalInvocationID + gl_WorkGroupSize;\n\
                   int total = count.x * size.y + int(id.z);\n\
               }";
    let analysis = Analysis::new(src);
    let errors: Vec<_> = analysis
        .diagnostics()
        .into_iter()
        .filter(|d| d.is_error())
        .collect();
    assert!(errors.is_empty(), "{:?}", errors);
    let limit = expression(&analysis, "gl_MaxComputeWorkGroupCount");
    assert_eq!(analysis.type_of(limit).to_string(), "ivec3");
}

#[test]
fn float_constants_fold_at_single_precision() {
    let src = "const float big = 16777217.0;\n\
               const float sum = big + 1.0;\n\
               const double wide = 16777217.0lf;\n\
               void main() { float a = big; float b = sum; double c = wide; }";
    let analysis = Analysis::new(src);
    let folded = |text: &str| analysis.constant_value_of(expression(&analysis, text));
    assert_eq!(folded("big"), Some(ConstValue::Float(16_777_216.0)));
    assert_eq!(folded("sum"), Some(ConstValue::Float(16_777_216.0)));
    assert_eq!(folded("wide"), Some(ConstValue::Double(16_777_217.0)));
    assert_eq!(folded("big + 1.0").map(|v| v.to_string()), Some("16777216.0".to_string()));
}
