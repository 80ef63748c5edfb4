//! Color swatches for `vec3`-style constructor calls.
//!
//! A call such as `vec3(1.0, 0.5, 0.0)` or `vec3(255.0, 128.0, 0.0)` with
//! three numeric constant arguments is read as an RGB color. When any
//! component exceeds 1.0 the triple is taken as 0–255 channels (truncated to
//! integers), otherwise as normalized 0–1 values.

use glint_core::Color;
use serde::Serialize;

use crate::analysis::Analysis;
use crate::ast::{NodeId, NodeKind, TypeName};
use crate::lexer::Span;

const COLOR_CONSTRUCTORS: [&str; 4] = ["vec3", "ivec3", "uvec3", "dvec3"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorRange {
    /// Components in 0–1.
    Normalized,
    /// Components in 0–255.
    Byte,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorLiteral {
    #[serde(skip)]
    pub call: NodeId,
    pub color: Color,
    pub range: ColorRange,
    pub span: Span,
}

/// Replace the text covered by `span` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub span: Span,
    pub new_text: String,
}

/// Every constructor call in the unit that reads as a color.
pub fn color_literals(analysis: &Analysis) -> Vec<ColorLiteral> {
    analysis
        .tree()
        .ids()
        .filter_map(|id| color_literal(analysis, id))
        .collect()
}

/// The color a single call denotes, if any.
pub fn color_literal(analysis: &Analysis, call: NodeId) -> Option<ColorLiteral> {
    constructor_name(analysis, call)?;
    if analysis.type_of(call).is_error() {
        return None;
    }
    let args = analysis.constructor_arguments(call)?;
    let [r, g, b] = args.as_slice() else {
        return None;
    };
    let values = [*r, *g, *b].map(|arg| component_value(analysis, arg));
    let [Some(r), Some(g), Some(b)] = values else {
        return None;
    };
    let range = if [r, g, b].iter().any(|&v| v > 1.0) {
        ColorRange::Byte
    } else {
        ColorRange::Normalized
    };
    let color = match range {
        ColorRange::Byte => Color::try_rgb8(r as i64, g as i64, b as i64),
        ColorRange::Normalized => Color::try_rgb(r as f32, g as f32, b as f32),
    }
    .ok()?;
    Some(ColorLiteral {
        call,
        color,
        range,
        span: analysis.tree().span(call),
    })
}

/// Edits that rewrite the literal arguments of `call` to `color`, keeping
/// each literal's decimal precision and suffix. `None` when the call is not
/// a color literal or an argument is not a plain literal.
pub fn color_edits(analysis: &Analysis, call: NodeId, color: Color) -> Option<Vec<TextEdit>> {
    let literal = color_literal(analysis, call)?;
    let integer = matches!(constructor_name(analysis, call)?, "ivec3" | "uvec3");
    let args = analysis.constructor_arguments(call)?;
    let tree = analysis.tree();
    let [r, g, b, _] = color.to_rgba8();
    args.iter()
        .zip([r, g, b])
        .map(|(&arg, channel)| {
            if !matches!(tree.kind(arg), NodeKind::Literal(_)) {
                return None;
            }
            let value = match literal.range {
                ColorRange::Byte => channel as f64,
                ColorRange::Normalized => channel as f64 / 255.0,
            };
            Some(TextEdit {
                span: tree.span(arg),
                new_text: format_component(tree.text(arg), value, integer),
            })
        })
        .collect()
}

fn constructor_name(analysis: &Analysis, call: NodeId) -> Option<&str> {
    let tree = analysis.tree();
    let NodeKind::Call {
        callee,
        constructor: true,
        ..
    } = tree.kind(call)
    else {
        return None;
    };
    match tree.kind(*callee) {
        NodeKind::TypeSpecifier {
            name: TypeName::Builtin(name),
            array_sizes,
        } if array_sizes.is_empty() && COLOR_CONSTRUCTORS.contains(&name.as_str()) => Some(name),
        _ => None,
    }
}

fn component_value(analysis: &Analysis, arg: NodeId) -> Option<f64> {
    let value = analysis.constant_value_of(arg)?;
    match value.scalar_kind()? {
        kind if kind.is_numeric() => value.as_f64(),
        _ => None,
    }
}

/// Format `value` the way `original` is written: same number of decimals and
/// the same suffix.
fn format_component(original: &str, value: f64, integer: bool) -> String {
    if let Some(hex) = original.strip_prefix("0x").or_else(|| original.strip_prefix("0X")) {
        let suffix = hex.trim_start_matches(|c: char| c.is_ascii_hexdigit());
        return format!("0x{:X}{}", value.round() as i64, suffix);
    }
    let digits_end = original
        .find(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
        .unwrap_or(original.len());
    let (number, suffix) = original.split_at(digits_end);
    if integer {
        return format!("{}{}", value.round() as i64, suffix);
    }
    match number.split_once('.') {
        Some((_, fraction)) => {
            let decimals = fraction.chars().take_while(char::is_ascii_digit).count();
            if decimals == 0 {
                format!("{}.{}", value.round() as i64, suffix)
            } else {
                format!("{:.*}{}", decimals, value, suffix)
            }
        }
        // An integer literal in a float vector.
        None if value.fract() == 0.0 => format!("{}{}", value as i64, suffix),
        None => format!("{:.3}{}", value, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calls(analysis: &Analysis) -> Vec<NodeId> {
        analysis
            .tree()
            .ids()
            .filter(|&id| analysis.is_constructor_call(id))
            .collect()
    }

    #[test]
    fn test_byte_and_normalized_ranges() {
        let analysis = Analysis::new("vec3 a = vec3(255.0, 128.0, 0.0); vec3 b = vec3(1.0, 0.5, 0.0);");
        let literals = color_literals(&analysis);
        assert_eq!(literals.len(), 2);
        assert_eq!(literals[0].range, ColorRange::Byte);
        assert_eq!(literals[0].color.to_rgba8(), [255, 128, 0, 255]);
        assert_eq!(literals[1].range, ColorRange::Normalized);
        assert_eq!(literals[1].color, Color::rgb(1.0, 0.5, 0.0));
    }

    #[test]
    fn test_declines_non_colors() {
        let src = "uniform float t;
                   vec3 a = vec3(t, 0.0, 0.0);
                   vec3 b = vec3(300.0, 0.0, 0.0);
                   vec3 c = vec3(-0.5, 0.0, 0.0);
                   vec4 d = vec4(1.0, 0.0, 0.0, 1.0);
                   vec3 e = vec3(1.0);
                   bvec3 f = bvec3(true, false, true);";
        let analysis = Analysis::new(src);
        assert!(color_literals(&analysis).is_empty());
    }

    #[test]
    fn test_constant_expressions_count() {
        let analysis = Analysis::new("const float h = 0.5; vec3 a = vec3(h, 1.0 - h, 0.25 * 2.0);");
        let literals = color_literals(&analysis);
        assert_eq!(literals.len(), 1);
        assert_eq!(literals[0].color, Color::rgb(0.5, 0.5, 0.5));
        // Not plain literals, so no edits.
        assert_eq!(color_edits(&analysis, literals[0].call, Color::RED), None);
    }

    #[test]
    fn test_edits_keep_precision_and_suffix() {
        let src = "vec3 a = vec3(1.00, 0.5f, 0.0); vec3 b = vec3(255.0, 0.0, 10.);";
        let analysis = Analysis::new(src);
        let calls = calls(&analysis);
        let color = Color::try_rgb8(255, 128, 0).unwrap();

        let edits = color_edits(&analysis, calls[0], color).unwrap();
        let texts: Vec<&str> = edits.iter().map(|e| e.new_text.as_str()).collect();
        assert_eq!(texts, ["1.00", "0.5f", "0.0"]);
        assert_eq!(&src[edits[1].span.start..edits[1].span.end], "0.5f");

        let edits = color_edits(&analysis, calls[1], color).unwrap();
        let texts: Vec<&str> = edits.iter().map(|e| e.new_text.as_str()).collect();
        assert_eq!(texts, ["255.0", "128.0", "0."]);
    }

    #[test]
    fn test_integer_vectors() {
        let analysis = Analysis::new("ivec3 a = ivec3(255, 0, 64); uvec3 b = uvec3(10u, 20u, 30u);");
        let calls = calls(&analysis);
        let color = Color::try_rgb8(1, 2, 3).unwrap();
        let edits = color_edits(&analysis, calls[0], color).unwrap();
        let texts: Vec<&str> = edits.iter().map(|e| e.new_text.as_str()).collect();
        assert_eq!(texts, ["1", "2", "3"]);
        let edits = color_edits(&analysis, calls[1], color).unwrap();
        assert_eq!(edits[0].new_text, "1u");
    }

    #[test]
    fn test_declines_on_error_type() {
        let analysis = Analysis::new("vec3 a = vec3(1.0, 0.5, 0.0, 1.0);");
        let call = calls(&analysis)[0];
        assert!(color_literal(&analysis, call).is_none());
        assert_eq!(color_edits(&analysis, call, Color::WHITE), None);
    }
}
