//! Compile-time constant values and the arithmetic used to fold them.

use std::cmp::Ordering;
use std::fmt;

use crate::ast::{BinaryOp, UnaryOp};
use crate::types::{ScalarKind, Type};

/// A folded constant. Vectors hold their components, matrices their columns,
/// arrays and structs their elements. `float` is single precision; only
/// `double` keeps 64 bits.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ConstValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
    Double(f64),
    Composite(Vec<ConstValue>),
}

impl ConstValue {
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            ConstValue::Bool(_) => ScalarKind::Bool,
            ConstValue::Int(_) => ScalarKind::Int,
            ConstValue::Uint(_) => ScalarKind::Uint,
            ConstValue::Float(_) => ScalarKind::Float,
            ConstValue::Double(_) => ScalarKind::Double,
            ConstValue::Composite(_) => return None,
        })
    }

    /// Numeric value of a scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ConstValue::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            ConstValue::Int(v) => Some(v as f64),
            ConstValue::Uint(v) => Some(v as f64),
            ConstValue::Float(v) => Some(v as f64),
            ConstValue::Double(v) => Some(v),
            ConstValue::Composite(_) => None,
        }
    }

    /// Integer value of an `int` or `uint` scalar.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ConstValue::Int(v) => Some(v as i64),
            ConstValue::Uint(v) => Some(v as i64),
            _ => None,
        }
    }

    /// Convert a scalar to another scalar kind, GLSL constructor style.
    pub fn cast(&self, kind: ScalarKind) -> Option<ConstValue> {
        let value = match (self, kind) {
            (ConstValue::Composite(_), _) => return None,
            (ConstValue::Bool(b), ScalarKind::Bool) => ConstValue::Bool(*b),
            (other, ScalarKind::Bool) => ConstValue::Bool(other.as_f64()? != 0.0),
            (ConstValue::Int(v), ScalarKind::Int) => ConstValue::Int(*v),
            (ConstValue::Uint(v), ScalarKind::Int) => ConstValue::Int(*v as i32),
            (other, ScalarKind::Int) => ConstValue::Int(other.as_f64()? as i32),
            (ConstValue::Int(v), ScalarKind::Uint) => ConstValue::Uint(*v as u32),
            (ConstValue::Uint(v), ScalarKind::Uint) => ConstValue::Uint(*v),
            (other, ScalarKind::Uint) => ConstValue::Uint(other.as_f64()? as u32),
            (other, ScalarKind::Float) => ConstValue::Float(other.as_f64()? as f32),
            (other, ScalarKind::Double) => ConstValue::Double(other.as_f64()?),
        };
        Some(value)
    }

    /// All scalar components in order (matrix columns flattened).
    pub fn components(&self) -> Vec<ConstValue> {
        match self {
            ConstValue::Composite(items) => items.iter().flat_map(|i| i.components()).collect(),
            scalar => vec![scalar.clone()],
        }
    }

    /// Convert the value to the shape and component kind of `ty`.
    pub fn convert_to(&self, ty: &Type) -> Option<ConstValue> {
        match (self, ty) {
            (ConstValue::Composite(_), Type::Scalar(_)) => None,
            (scalar, Type::Scalar(kind)) => scalar.cast(*kind),
            (ConstValue::Composite(items), Type::Vector(kind, n)) if items.len() == *n as usize => {
                items.iter().map(|c| c.cast(*kind)).collect::<Option<_>>().map(ConstValue::Composite)
            }
            (ConstValue::Composite(cols), Type::Matrix { base, cols: c, rows }) if cols.len() == *c as usize => {
                let column = Type::Vector(*base, *rows);
                cols.iter()
                    .map(|col| col.convert_to(&column))
                    .collect::<Option<_>>()
                    .map(ConstValue::Composite)
            }
            (ConstValue::Composite(items), Type::Array(elem, len)) => {
                if len.is_some_and(|n| n as usize != items.len()) {
                    return None;
                }
                items.iter()
                    .map(|i| i.convert_to(elem))
                    .collect::<Option<_>>()
                    .map(ConstValue::Composite)
            }
            (ConstValue::Composite(items), Type::Struct(s)) if items.len() == s.fields.len() => items
                .iter()
                .zip(&s.fields)
                .map(|(i, f)| i.convert_to(&f.ty))
                .collect::<Option<_>>()
                .map(ConstValue::Composite),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{}", b),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Uint(v) => write!(f, "{}u", v),
            ConstValue::Float(v) => write!(f, "{:?}", v),
            ConstValue::Double(v) => write!(f, "{:?}lf", v),
            ConstValue::Composite(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Rebuild a value of type `ty` from its flattened components.
pub fn from_components(ty: &Type, components: Vec<ConstValue>) -> Option<ConstValue> {
    match ty {
        Type::Scalar(_) => components.into_iter().next(),
        Type::Vector(_, n) if components.len() == *n as usize => Some(ConstValue::Composite(components)),
        Type::Matrix { cols, rows, .. } if components.len() == (*cols * *rows) as usize => Some(
            ConstValue::Composite(
                components
                    .chunks(*rows as usize)
                    .map(|c| ConstValue::Composite(c.to_vec()))
                    .collect(),
            ),
        ),
        _ => None,
    }
}

pub fn fold_unary(op: UnaryOp, value: &ConstValue) -> Option<ConstValue> {
    if let ConstValue::Composite(items) = value {
        return items
            .iter()
            .map(|i| fold_unary(op, i))
            .collect::<Option<_>>()
            .map(ConstValue::Composite);
    }
    Some(match (op, value) {
        (UnaryOp::Plus, v) => v.clone(),
        (UnaryOp::Minus, ConstValue::Int(v)) => ConstValue::Int(v.wrapping_neg()),
        (UnaryOp::Minus, ConstValue::Uint(v)) => ConstValue::Uint(v.wrapping_neg()),
        (UnaryOp::Minus, ConstValue::Float(v)) => ConstValue::Float(-v),
        (UnaryOp::Minus, ConstValue::Double(v)) => ConstValue::Double(-v),
        (UnaryOp::Not, ConstValue::Bool(b)) => ConstValue::Bool(!b),
        (UnaryOp::BitNot, ConstValue::Int(v)) => ConstValue::Int(!v),
        (UnaryOp::BitNot, ConstValue::Uint(v)) => ConstValue::Uint(!v),
        _ => return None,
    })
}

/// Apply a componentwise operator to two scalars of the same kind.
pub fn scalar_binary(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Option<ConstValue> {
    use ConstValue::*;
    let value = match (a, b) {
        (Int(x), Int(y)) => Int(match op {
            BinaryOp::Add => x.wrapping_add(*y),
            BinaryOp::Sub => x.wrapping_sub(*y),
            BinaryOp::Mul => x.wrapping_mul(*y),
            BinaryOp::Div if *y != 0 => x.wrapping_div(*y),
            BinaryOp::Mod if *y != 0 => x.wrapping_rem(*y),
            BinaryOp::BitAnd => x & y,
            BinaryOp::BitOr => x | y,
            BinaryOp::BitXor => x ^ y,
            _ => return None,
        }),
        (Uint(x), Uint(y)) => Uint(match op {
            BinaryOp::Add => x.wrapping_add(*y),
            BinaryOp::Sub => x.wrapping_sub(*y),
            BinaryOp::Mul => x.wrapping_mul(*y),
            BinaryOp::Div if *y != 0 => x / y,
            BinaryOp::Mod if *y != 0 => x % y,
            BinaryOp::BitAnd => x & y,
            BinaryOp::BitOr => x | y,
            BinaryOp::BitXor => x ^ y,
            _ => return None,
        }),
        (Float(x), Float(y)) => Float(float_op(op, *x as f64, *y as f64)? as f32),
        (Double(x), Double(y)) => Double(float_op(op, *x, *y)?),
        (Bool(x), Bool(y)) => Bool(match op {
            BinaryOp::And => *x && *y,
            BinaryOp::Or => *x || *y,
            BinaryOp::Xor => x != y,
            _ => return None,
        }),
        _ => return None,
    };
    Some(value)
}

fn float_op(op: BinaryOp, x: f64, y: f64) -> Option<f64> {
    Some(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        _ => return None,
    })
}

pub fn shift(op: BinaryOp, value: &ConstValue, amount: &ConstValue) -> Option<ConstValue> {
    let amount = amount.as_i64()? as u32;
    Some(match (op, value) {
        (BinaryOp::Shl, ConstValue::Int(v)) => ConstValue::Int(v.wrapping_shl(amount)),
        (BinaryOp::Shr, ConstValue::Int(v)) => ConstValue::Int(v.wrapping_shr(amount)),
        (BinaryOp::Shl, ConstValue::Uint(v)) => ConstValue::Uint(v.wrapping_shl(amount)),
        (BinaryOp::Shr, ConstValue::Uint(v)) => ConstValue::Uint(v.wrapping_shr(amount)),
        _ => return None,
    })
}

/// Compare two scalars of the same kind.
pub fn compare(a: &ConstValue, b: &ConstValue) -> Option<Ordering> {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Relational operator on two scalars.
pub fn relational(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Option<bool> {
    let ordering = compare(a, b)?;
    Some(match op {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::LessEq => ordering != Ordering::Greater,
        BinaryOp::GreaterEq => ordering != Ordering::Less,
        _ => return None,
    })
}

/// Column-major matrix product of `a` (`a_rows` rows, `inner` columns) and
/// `b` (`inner` rows), both given as flattened components.
pub fn matrix_product(
    a: &[ConstValue],
    b: &[ConstValue],
    a_rows: usize,
    inner: usize,
) -> Option<Vec<ConstValue>> {
    if inner == 0 || a.len() != a_rows * inner || b.len() % inner != 0 {
        return None;
    }
    let b_cols = b.len() / inner;
    let mut out = Vec::with_capacity(a_rows * b_cols);
    for col in 0..b_cols {
        for row in 0..a_rows {
            let mut sum: Option<ConstValue> = None;
            for k in 0..inner {
                let term = scalar_binary(BinaryOp::Mul, &a[k * a_rows + row], &b[col * inner + k])?;
                sum = Some(match sum {
                    Some(s) => scalar_binary(BinaryOp::Add, &s, &term)?,
                    None => term,
                });
            }
            out.push(sum?);
        }
    }
    Some(out)
}
