//! The GLSL type universe and its implicit-conversion rules.
//!
//! Types are plain values compared structurally. Struct layouts, function
//! signatures and array element types sit behind `Arc`, so cloning a `Type`
//! never copies more than a pointer.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
    Double,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    /// Prefix used by vector and sampler names (`ivec3`, `usampler2D`).
    pub fn prefix(self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Float => "",
            ScalarKind::Double => "d",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "b" => ScalarKind::Bool,
            "i" => ScalarKind::Int,
            "u" => ScalarKind::Uint,
            "" => ScalarKind::Float,
            "d" => ScalarKind::Double,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        self != ScalarKind::Bool
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ScalarKind::Int | ScalarKind::Uint)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ScalarKind::Float | ScalarKind::Double)
    }
}

/// Cost of implicitly converting one scalar kind to another, `None` when the
/// conversion is not allowed.
pub fn scalar_conversion_cost(from: ScalarKind, to: ScalarKind) -> Option<u32> {
    use ScalarKind::*;
    match (from, to) {
        _ if from == to => Some(0),
        (Int, Uint) => Some(1),
        (Int | Uint, Float) => Some(2),
        (Float, Double) => Some(2),
        (Int | Uint, Double) => Some(3),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerShape {
    Tex1D,
    Tex2D,
    Tex3D,
    Cube,
    Rect,
    Tex1DArray,
    Tex2DArray,
    CubeArray,
    Buffer,
    Tex2DMS,
    Tex2DMSArray,
}

const SHAPES: &[(&str, SamplerShape)] = &[
    ("1D", SamplerShape::Tex1D),
    ("2D", SamplerShape::Tex2D),
    ("3D", SamplerShape::Tex3D),
    ("Cube", SamplerShape::Cube),
    ("2DRect", SamplerShape::Rect),
    ("1DArray", SamplerShape::Tex1DArray),
    ("2DArray", SamplerShape::Tex2DArray),
    ("CubeArray", SamplerShape::CubeArray),
    ("Buffer", SamplerShape::Buffer),
    ("2DMS", SamplerShape::Tex2DMS),
    ("2DMSArray", SamplerShape::Tex2DMSArray),
];

impl SamplerShape {
    pub fn suffix(self) -> &'static str {
        SHAPES
            .iter()
            .find(|(_, shape)| *shape == self)
            .map(|(name, _)| *name)
            .unwrap_or("")
    }

    fn supports_shadow(self) -> bool {
        matches!(
            self,
            SamplerShape::Tex1D
                | SamplerShape::Tex2D
                | SamplerShape::Cube
                | SamplerShape::Rect
                | SamplerShape::Tex1DArray
                | SamplerShape::Tex2DArray
                | SamplerShape::CubeArray
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// Combined texture/sampler (`sampler2D`).
    Sampler,
    /// Storage image (`image2D`).
    Image,
}

/// An opaque texture or image type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerType {
    pub kind: SamplerKind,
    /// Float, Int or Uint depending on the `i`/`u` prefix.
    pub base: ScalarKind,
    pub shape: SamplerShape,
    pub shadow: bool,
}

impl SamplerType {
    pub fn from_name(name: &str) -> Option<Self> {
        let (base, rest) = match name.as_bytes().first() {
            Some(b'i') => (ScalarKind::Int, &name[1..]),
            Some(b'u') => (ScalarKind::Uint, &name[1..]),
            _ => (ScalarKind::Float, name),
        };
        let (kind, rest) = if let Some(rest) = rest.strip_prefix("sampler") {
            (SamplerKind::Sampler, rest)
        } else if let Some(rest) = rest.strip_prefix("image") {
            (SamplerKind::Image, rest)
        } else {
            return None;
        };
        let (rest, shadow) = match rest.strip_suffix("Shadow") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let shape = SHAPES.iter().find(|(s, _)| *s == rest).map(|(_, shape)| *shape)?;
        if shadow && (kind == SamplerKind::Image || base != ScalarKind::Float || !shape.supports_shadow()) {
            return None;
        }
        Some(Self {
            kind,
            base,
            shape,
            shadow,
        })
    }
}

impl fmt::Display for SamplerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SamplerKind::Sampler => "sampler",
            SamplerKind::Image => "image",
        };
        write!(f, "{}{}{}", self.base.prefix(), kind, self.shape.suffix())?;
        if self.shadow {
            write!(f, "Shadow")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

/// A user struct or interface block layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<StructField>,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamDirection {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamType {
    pub ty: Type,
    pub direction: ParamDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<ParamType>,
    pub return_type: Type,
}

impl FunctionSignature {
    pub fn same_parameters(&self, other: &FunctionSignature) -> bool {
        self.params.len() == other.params.len()
            && self.params.iter().zip(&other.params).all(|(a, b)| a.ty == b.ty)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match p.direction {
                ParamDirection::In => {}
                ParamDirection::Out => write!(f, "out ")?,
                ParamDirection::InOut => write!(f, "inout ")?,
            }
            write!(f, "{}", p.ty)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    Matrix { base: ScalarKind, cols: u8, rows: u8 },
    /// Element type and length; `None` for unsized arrays.
    Array(Arc<Type>, Option<u32>),
    Struct(Arc<StructType>),
    Sampler(SamplerType),
    AtomicUint,
    Function(Arc<FunctionSignature>),
    Error,
}

impl Type {
    pub const BOOL: Type = Type::Scalar(ScalarKind::Bool);
    pub const INT: Type = Type::Scalar(ScalarKind::Int);
    pub const UINT: Type = Type::Scalar(ScalarKind::Uint);
    pub const FLOAT: Type = Type::Scalar(ScalarKind::Float);
    pub const DOUBLE: Type = Type::Scalar(ScalarKind::Double);

    /// Resolve a built-in type keyword.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "void" => return Some(Type::Void),
            "bool" => return Some(Type::BOOL),
            "int" => return Some(Type::INT),
            "uint" => return Some(Type::UINT),
            "float" => return Some(Type::FLOAT),
            "double" => return Some(Type::DOUBLE),
            "atomic_uint" => return Some(Type::AtomicUint),
            _ => {}
        }
        if let Some(at) = name.find("vec") {
            let base = ScalarKind::from_prefix(&name[..at])?;
            let size = single_dimension(&name[at + 3..])?;
            return Some(Type::Vector(base, size));
        }
        if let Some(at) = name.find("mat") {
            let base = match &name[..at] {
                "" => ScalarKind::Float,
                "d" => ScalarKind::Double,
                _ => return None,
            };
            let dims = &name[at + 3..];
            let (cols, rows) = match dims.split_once('x') {
                Some((c, r)) => (single_dimension(c)?, single_dimension(r)?),
                None => {
                    let n = single_dimension(dims)?;
                    (n, n)
                }
            };
            return Some(Type::Matrix { base, cols, rows });
        }
        SamplerType::from_name(name).map(Type::Sampler)
    }

    pub fn vector(base: ScalarKind, size: u8) -> Type {
        if size == 1 {
            Type::Scalar(base)
        } else {
            Type::Vector(base, size)
        }
    }

    pub fn array_of(element: Type, len: Option<u32>) -> Type {
        Type::Array(Arc::new(element), len)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Matrix { .. })
    }

    pub fn is_bool(&self) -> bool {
        *self == Type::BOOL
    }

    /// Scalar, vector or matrix.
    pub fn is_arithmetic_shape(&self) -> bool {
        matches!(self, Type::Scalar(_) | Type::Vector(..) | Type::Matrix { .. })
    }

    /// The component kind of a scalar, vector or matrix.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(k) | Type::Vector(k, _) | Type::Matrix { base: k, .. } => Some(*k),
            _ => None,
        }
    }

    /// Number of scalar components in a scalar, vector or matrix.
    pub fn component_count(&self) -> Option<u32> {
        match self {
            Type::Scalar(_) => Some(1),
            Type::Vector(_, n) => Some(*n as u32),
            Type::Matrix { cols, rows, .. } => Some(*cols as u32 * *rows as u32),
            _ => None,
        }
    }

    /// The same shape with a different component kind.
    pub fn with_scalar_kind(&self, kind: ScalarKind) -> Option<Type> {
        match self {
            Type::Scalar(_) => Some(Type::Scalar(kind)),
            Type::Vector(_, n) => Some(Type::Vector(kind, *n)),
            Type::Matrix { cols, rows, .. } if kind.is_floating() => Some(Type::Matrix {
                base: kind,
                cols: *cols,
                rows: *rows,
            }),
            _ => None,
        }
    }

    /// Whether the type may be used where a `const` constant is expected.
    pub fn is_opaque(&self) -> bool {
        match self {
            Type::Sampler(_) | Type::AtomicUint => true,
            Type::Array(elem, _) => elem.is_opaque(),
            Type::Struct(s) => s.fields.iter().any(|f| f.ty.is_opaque()),
            _ => false,
        }
    }
}

fn single_dimension(s: &str) -> Option<u8> {
    match s {
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Scalar(k) => write!(f, "{}", k.name()),
            Type::Vector(k, n) => write!(f, "{}vec{}", k.prefix(), n),
            Type::Matrix { base, cols, rows } => {
                write!(f, "{}mat{}", base.prefix(), cols)?;
                if cols != rows {
                    write!(f, "x{}", rows)?;
                }
                Ok(())
            }
            Type::Array(..) => {
                // Outermost dimension first, as written in source.
                let mut base = self;
                let mut dims = String::new();
                while let Type::Array(elem, len) = base {
                    match len {
                        Some(n) => dims.push_str(&format!("[{}]", n)),
                        None => dims.push_str("[]"),
                    }
                    base = elem;
                }
                write!(f, "{}{}", base, dims)
            }
            Type::Struct(s) => write!(f, "{}", s.name),
            Type::Sampler(s) => write!(f, "{}", s),
            Type::AtomicUint => write!(f, "atomic_uint"),
            Type::Function(sig) => write!(f, "{}", sig),
            Type::Error => write!(f, "<error>"),
        }
    }
}

/// Whether `name` is a built-in type keyword.
pub fn is_builtin_type_name(name: &str) -> bool {
    Type::from_name(name).is_some()
}

/// Cost of implicitly converting `from` to `to`: 0 for an exact match,
/// `None` when no implicit conversion exists.
pub fn conversion_cost(from: &Type, to: &Type) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    match (from, to) {
        (Type::Scalar(a), Type::Scalar(b)) => scalar_conversion_cost(*a, *b),
        (Type::Vector(a, n), Type::Vector(b, m)) if n == m => scalar_conversion_cost(*a, *b),
        (
            Type::Matrix {
                base: ScalarKind::Float,
                cols: c1,
                rows: r1,
            },
            Type::Matrix {
                base: ScalarKind::Double,
                cols: c2,
                rows: r2,
            },
        ) if c1 == c2 && r1 == r2 => Some(2),
        _ => None,
    }
}

pub fn can_implicitly_convert(from: &Type, to: &Type) -> bool {
    conversion_cost(from, to).is_some()
}

/// The component kind both operands convert to, preferring the cheaper side.
pub fn common_scalar_kind(a: ScalarKind, b: ScalarKind) -> Option<ScalarKind> {
    if a == b {
        return Some(a);
    }
    match (scalar_conversion_cost(a, b), scalar_conversion_cost(b, a)) {
        (Some(_), _) => Some(b),
        (None, Some(_)) => Some(a),
        (None, None) => None,
    }
}

/// The type two binary-operator operands are converted to, allowing a scalar
/// to broadcast against a vector or matrix. `None` when the operands are
/// incompatible.
pub fn common_type(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    let base = common_scalar_kind(a.scalar_kind()?, b.scalar_kind()?)?;
    match (a, b) {
        (Type::Scalar(_), Type::Scalar(_)) => Some(Type::Scalar(base)),
        (Type::Scalar(_), Type::Vector(_, n)) | (Type::Vector(_, n), Type::Scalar(_)) => {
            Some(Type::Vector(base, *n))
        }
        (Type::Vector(_, n), Type::Vector(_, m)) if n == m => Some(Type::Vector(base, *n)),
        (Type::Scalar(_), Type::Matrix { cols, rows, .. })
        | (Type::Matrix { cols, rows, .. }, Type::Scalar(_))
            if base.is_floating() =>
        {
            Some(Type::Matrix {
                base,
                cols: *cols,
                rows: *rows,
            })
        }
        (
            Type::Matrix {
                cols: c1, rows: r1, ..
            },
            Type::Matrix {
                cols: c2, rows: r2, ..
            },
        ) if c1 == c2 && r1 == r2 => Some(Type::Matrix {
            base,
            cols: *c1,
            rows: *r1,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> Type {
        Type::from_name(name).unwrap()
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ty("vec3"), Type::Vector(ScalarKind::Float, 3));
        assert_eq!(ty("ivec2"), Type::Vector(ScalarKind::Int, 2));
        assert_eq!(ty("bvec4"), Type::Vector(ScalarKind::Bool, 4));
        assert_eq!(
            ty("dmat2x3"),
            Type::Matrix {
                base: ScalarKind::Double,
                cols: 2,
                rows: 3
            }
        );
        assert_eq!(
            ty("mat4"),
            Type::Matrix {
                base: ScalarKind::Float,
                cols: 4,
                rows: 4
            }
        );
        assert!(Type::from_name("vec5").is_none());
        assert!(Type::from_name("imat2").is_none());
        assert!(Type::from_name("vector").is_none());
    }

    #[test]
    fn test_sampler_names() {
        let s = SamplerType::from_name("usampler2DArray").unwrap();
        assert_eq!(s.base, ScalarKind::Uint);
        assert_eq!(s.shape, SamplerShape::Tex2DArray);
        assert!(!s.shadow);
        assert!(SamplerType::from_name("samplerCubeShadow").unwrap().shadow);
        assert!(SamplerType::from_name("isampler2DShadow").is_none());
        assert!(SamplerType::from_name("image2DShadow").is_none());
        assert_eq!(ty("iimage3D").to_string(), "iimage3D");
    }

    #[test]
    fn test_display_round_trips_names() {
        for name in ["float", "uvec3", "mat3", "mat2x4", "dmat4", "sampler2DShadow", "atomic_uint"] {
            assert_eq!(ty(name).to_string(), name);
        }
        assert_eq!(Type::array_of(Type::FLOAT, Some(3)).to_string(), "float[3]");
    }

    #[test]
    fn test_implicit_conversions() {
        assert!(can_implicitly_convert(&Type::INT, &Type::FLOAT));
        assert!(can_implicitly_convert(&Type::INT, &Type::UINT));
        assert!(can_implicitly_convert(&Type::FLOAT, &Type::DOUBLE));
        assert!(!can_implicitly_convert(&Type::FLOAT, &Type::INT));
        assert!(!can_implicitly_convert(&Type::UINT, &Type::INT));
        assert!(!can_implicitly_convert(&Type::BOOL, &Type::INT));
        assert!(can_implicitly_convert(&ty("ivec3"), &ty("vec3")));
        assert!(!can_implicitly_convert(&ty("vec3"), &ty("vec4")));
        assert!(can_implicitly_convert(&ty("mat3"), &ty("dmat3")));
        assert!(!can_implicitly_convert(&Type::FLOAT, &ty("vec3")));
    }

    #[test]
    fn test_conversion_costs_rank_widening() {
        assert_eq!(conversion_cost(&Type::FLOAT, &Type::FLOAT), Some(0));
        let to_float = conversion_cost(&Type::INT, &Type::FLOAT).unwrap();
        let to_double = conversion_cost(&Type::INT, &Type::DOUBLE).unwrap();
        assert!(to_float < to_double);
    }

    #[test]
    fn test_common_type() {
        assert_eq!(common_type(&Type::INT, &Type::FLOAT), Some(Type::FLOAT));
        assert_eq!(common_type(&Type::FLOAT, &ty("vec3")), Some(ty("vec3")));
        assert_eq!(common_type(&ty("ivec2"), &ty("vec2")), Some(ty("vec2")));
        assert_eq!(common_type(&ty("vec2"), &ty("vec3")), None);
        assert_eq!(common_type(&Type::BOOL, &Type::INT), None);
        assert_eq!(common_type(&Type::FLOAT, &ty("mat2")), Some(ty("mat2")));
        assert_eq!(common_type(&Type::INT, &Type::UINT), Some(Type::UINT));
    }
}
