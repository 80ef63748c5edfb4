//! Type checking.
//!
//! [`TypeChecker`] computes the type of a node on first request from the types
//! of its children and memoises it in a [`TypeCache`]. Declaration types,
//! folded constants and resolved call targets are memoised the same way.
//! Diagnostics are recorded the first time the offending node is computed, so
//! asking for a type twice never reports twice.
//!
//! [`TypeChecker::check_all`] additionally visits every node once and runs the
//! statement-level checks (conditions, returns, jumps, initializers).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::ast::*;
use crate::builtins::builtins;
use crate::constant::{self, ConstValue};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::resolver::{Binding, DeclId, DeclKind, Declaration, Resolution, ScopeId};
use crate::types::*;

#[derive(Debug, Clone)]
enum State<T> {
    InProgress,
    Done(T),
}

/// Memoised checker results for one tree and its resolution.
///
/// Uses interior mutability, so a cache can be shared by reference but not
/// across threads.
#[derive(Debug, Default)]
pub struct TypeCache {
    nodes: RefCell<HashMap<NodeId, State<Type>>>,
    declarations: RefCell<HashMap<DeclId, State<Type>>>,
    constants: RefCell<HashMap<NodeId, State<Option<ConstValue>>>>,
    calls: RefCell<HashMap<NodeId, Arc<FunctionSignature>>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    checked: Cell<bool>,
}

impl TypeCache {
    /// Type diagnostics recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Whether [`TypeChecker::check_all`] has run.
    pub fn is_checked(&self) -> bool {
        self.checked.get()
    }
}

fn memo<K: Copy + Eq + Hash, T: Clone>(
    map: &RefCell<HashMap<K, State<T>>>,
    key: K,
    on_cycle: impl FnOnce() -> T,
    compute: impl FnOnce() -> T,
) -> T {
    let state = map.borrow().get(&key).cloned();
    match state {
        Some(State::Done(value)) => return value,
        Some(State::InProgress) => return on_cycle(),
        None => {}
    }
    map.borrow_mut().insert(key, State::InProgress);
    let value = compute();
    map.borrow_mut().insert(key, State::Done(value.clone()));
    value
}

/// Outcome of overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Overload {
    Unique(Arc<FunctionSignature>),
    Ambiguous(Vec<Arc<FunctionSignature>>),
    NoMatch,
}

/// Pick the candidate with the lowest total conversion cost. `in`
/// parameters accept implicit conversions; `out` and `inout` parameters need
/// an exact type match.
pub fn resolve_overload(candidates: &[Arc<FunctionSignature>], args: &[Type]) -> Overload {
    let scored: Vec<(u32, &Arc<FunctionSignature>)> = candidates
        .iter()
        .filter(|c| c.params.len() == args.len())
        .filter_map(|c| call_cost(c, args).map(|cost| (cost, c)))
        .collect();
    let Some(min) = scored.iter().map(|(cost, _)| *cost).min() else {
        return Overload::NoMatch;
    };
    let best: Vec<Arc<FunctionSignature>> = scored
        .into_iter()
        .filter(|(cost, _)| *cost == min)
        .map(|(_, sig)| sig.clone())
        .collect();
    match best.as_slice() {
        [only] => Overload::Unique(only.clone()),
        _ => Overload::Ambiguous(best),
    }
}

fn call_cost(sig: &FunctionSignature, args: &[Type]) -> Option<u32> {
    sig.params
        .iter()
        .zip(args)
        .map(|(param, arg)| match param.direction {
            ParamDirection::In => conversion_cost(arg, &param.ty),
            ParamDirection::Out | ParamDirection::InOut => (*arg == param.ty).then_some(0),
        })
        .sum()
}

fn is_numeric_shape(ty: &Type) -> bool {
    ty.is_arithmetic_shape() && ty.scalar_kind().is_some_and(ScalarKind::is_numeric)
}

fn is_integer_shape(ty: &Type) -> bool {
    matches!(ty, Type::Scalar(k) | Type::Vector(k, _) if k.is_integer())
}

/// Result type of a binary operator, or a message describing why the
/// operands are invalid.
pub fn binary_result(op: BinaryOp, l: &Type, r: &Type) -> Result<Type, String> {
    let mismatch = || format!("invalid operands to '{}': '{}' and '{}'", op, l, r);
    match op {
        _ if op.is_logical() => {
            if l.is_bool() && r.is_bool() {
                Ok(Type::BOOL)
            } else {
                Err(format!("operator '{}' requires 'bool' operands, found '{}' and '{}'", op, l, r))
            }
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            let comparable = |t: &Type| !t.is_opaque() && !matches!(t, Type::Void | Type::Function(_));
            if comparable(l) && comparable(r) && (l == r || common_type(l, r).is_some()) {
                Ok(Type::BOOL)
            } else {
                Err(mismatch())
            }
        }
        _ if op.is_relational() => match (l, r) {
            (Type::Scalar(a), Type::Scalar(b))
                if a.is_numeric() && b.is_numeric() && common_scalar_kind(*a, *b).is_some() =>
            {
                Ok(Type::BOOL)
            }
            _ => Err(mismatch()),
        },
        BinaryOp::Shl | BinaryOp::Shr => match (l, r) {
            (Type::Scalar(a) | Type::Vector(a, _), Type::Scalar(b)) if a.is_integer() && b.is_integer() => {
                Ok(l.clone())
            }
            (Type::Vector(a, n), Type::Vector(b, m)) if a.is_integer() && b.is_integer() && n == m => {
                Ok(l.clone())
            }
            _ => Err(mismatch()),
        },
        BinaryOp::Mod | BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
            if !is_integer_shape(l) || !is_integer_shape(r) {
                return Err(format!(
                    "operator '{}' requires integer operands, found '{}' and '{}'",
                    op, l, r
                ));
            }
            common_type(l, r).ok_or_else(mismatch)
        }
        _ => {
            if !is_numeric_shape(l) || !is_numeric_shape(r) {
                return Err(mismatch());
            }
            if op == BinaryOp::Mul {
                if let Some(product) = matrix_product_type(l, r) {
                    return product.ok_or_else(mismatch);
                }
            }
            common_type(l, r).ok_or_else(mismatch)
        }
    }
}

/// Linear-algebra product shape. `None` when neither side is a matrix or one
/// side is a scalar; `Some(None)` when the shapes do not line up.
fn matrix_product_type(l: &Type, r: &Type) -> Option<Option<Type>> {
    if l.is_scalar() || r.is_scalar() || !(l.is_matrix() || r.is_matrix()) {
        return None;
    }
    let base = common_scalar_kind(l.scalar_kind()?, r.scalar_kind()?).filter(|k| k.is_floating());
    let Some(base) = base else {
        return Some(None);
    };
    let product = match (l, r) {
        (Type::Matrix { cols: c1, rows: r1, .. }, Type::Matrix { cols: c2, rows: r2, .. }) => {
            (c1 == r2).then_some(Type::Matrix { base, cols: *c2, rows: *r1 })
        }
        (Type::Matrix { cols, rows, .. }, Type::Vector(_, n)) => (n == cols).then_some(Type::Vector(base, *rows)),
        (Type::Vector(_, n), Type::Matrix { cols, rows, .. }) => (n == rows).then_some(Type::Vector(base, *cols)),
        _ => None,
    };
    Some(product)
}

/// Result type of constructing `target` from arguments of the given types.
pub fn constructor_result(target: &Type, args: &[Type]) -> Result<Type, String> {
    if args.is_empty() {
        return Err(format!("constructor for '{}' requires arguments", target));
    }
    let shape_check = || match args.iter().find(|a| !a.is_arithmetic_shape()) {
        Some(bad) => Err(format!("cannot construct '{}' from a value of type '{}'", target, bad)),
        None => Ok(()),
    };
    let no_matrix_mix = || {
        if args.len() > 1 && args.iter().any(Type::is_matrix) {
            Err(format!(
                "matrix arguments cannot be combined with other arguments when constructing '{}'",
                target
            ))
        } else {
            Ok(())
        }
    };
    let counts: Vec<u32> = args.iter().filter_map(Type::component_count).collect();
    let total: u32 = counts.iter().sum();
    match target {
        Type::Scalar(_) => {
            shape_check()?;
            if args.len() != 1 {
                return Err(format!("constructor for '{}' takes exactly one argument", target));
            }
            Ok(target.clone())
        }
        Type::Vector(_, n) => {
            shape_check()?;
            let n = *n as u32;
            if let [single] = args {
                if single.is_scalar() || total >= n {
                    return Ok(target.clone());
                }
                return Err(format!(
                    "not enough components to construct '{}': {} of {}",
                    target, total, n
                ));
            }
            no_matrix_mix()?;
            let last = counts.last().copied().unwrap_or(0);
            if total < n {
                Err(format!("not enough components to construct '{}': {} of {}", target, total, n))
            } else if total - last >= n {
                Err(format!("too many arguments to constructor for '{}'", target))
            } else {
                Ok(target.clone())
            }
        }
        Type::Matrix { cols, rows, .. } => {
            shape_check()?;
            if let [single] = args {
                if single.is_scalar() || single.is_matrix() {
                    return Ok(target.clone());
                }
            }
            no_matrix_mix()?;
            let need = *cols as u32 * *rows as u32;
            if total == need {
                Ok(target.clone())
            } else {
                Err(format!(
                    "constructor for '{}' needs {} components, found {}",
                    target, need, total
                ))
            }
        }
        Type::Struct(s) => {
            if args.len() != s.fields.len() {
                return Err(format!(
                    "'{}' has {} fields but {} arguments were given",
                    s.name,
                    s.fields.len(),
                    args.len()
                ));
            }
            for (arg, field) in args.iter().zip(&s.fields) {
                if !can_implicitly_convert(arg, &field.ty) {
                    return Err(format!(
                        "cannot initialize field '{}' of type '{}' with a value of type '{}'",
                        field.name, field.ty, arg
                    ));
                }
            }
            Ok(target.clone())
        }
        Type::Array(elem, len) => {
            if let Some(n) = len {
                if *n as usize != args.len() {
                    return Err(format!(
                        "array constructor for '{}' takes {} arguments, found {}",
                        target,
                        n,
                        args.len()
                    ));
                }
            }
            if let Some(bad) = args.iter().find(|a| !can_implicitly_convert(a, elem)) {
                return Err(format!("cannot use a value of type '{}' as an element of '{}'", bad, target));
            }
            Ok(Type::Array(elem.clone(), Some(args.len() as u32)))
        }
        _ => Err(format!("cannot construct a value of type '{}'", target)),
    }
}

const SWIZZLE_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

/// Component indices selected by a swizzle on a value with `size` components.
pub fn swizzle_indices(name: &str, size: u32) -> Result<Vec<usize>, String> {
    if name.is_empty() || name.len() > 4 {
        return Err(format!("invalid swizzle '{}'", name));
    }
    let mut set: Option<&str> = None;
    let mut indices = Vec::with_capacity(name.len());
    for c in name.chars() {
        let found = SWIZZLE_SETS
            .iter()
            .find_map(|s| s.find(c).map(|i| (*s, i)));
        let Some((this_set, index)) = found else {
            return Err(format!("invalid swizzle '{}'", name));
        };
        match set {
            Some(previous) if previous != this_set => {
                return Err(format!("swizzle '{}' mixes component sets", name));
            }
            _ => set = Some(this_set),
        }
        if index as u32 >= size {
            return Err(format!(
                "swizzle component '{}' is out of range for a {}-component value",
                c, size
            ));
        }
        indices.push(index);
    }
    Ok(indices)
}

fn literal_type(lit: &Literal) -> Type {
    match lit {
        Literal::Int(_) => Type::INT,
        Literal::Uint(_) => Type::UINT,
        Literal::Float(_) => Type::FLOAT,
        Literal::Double(_) => Type::DOUBLE,
        Literal::Bool(_) => Type::BOOL,
    }
}

fn literal_value(lit: &Literal) -> ConstValue {
    match *lit {
        Literal::Int(v) => ConstValue::Int(v),
        Literal::Uint(v) => ConstValue::Uint(v),
        Literal::Float(v) => ConstValue::Float(v as f32),
        Literal::Double(v) => ConstValue::Double(v),
        Literal::Bool(v) => ConstValue::Bool(v),
    }
}

/// Type of the `index`th element of an initializer list for `ty`.
fn element_type(ty: &Type, index: usize) -> Option<Type> {
    match ty {
        Type::Array(elem, _) => Some((**elem).clone()),
        Type::Vector(k, _) => Some(Type::Scalar(*k)),
        Type::Matrix { base, rows, .. } => Some(Type::Vector(*base, *rows)),
        Type::Struct(s) => s.fields.get(index).map(|f| f.ty.clone()),
        _ => None,
    }
}

/// Value of a constructor call whose arguments are all constant.
fn fold_constructor(target: &Type, values: &[ConstValue], arg_types: &[Type]) -> Option<ConstValue> {
    match target {
        Type::Scalar(k) => values.first()?.components().first()?.cast(*k),
        Type::Vector(k, n) => {
            let n = *n as usize;
            let flat: Vec<ConstValue> = values.iter().flat_map(|v| v.components()).collect();
            let picked: Vec<ConstValue> = match flat.as_slice() {
                [single] => vec![single.clone(); n],
                _ => flat.into_iter().take(n).collect(),
            };
            let cast = picked.iter().map(|c| c.cast(*k)).collect::<Option<Vec<_>>>()?;
            constant::from_components(target, cast)
        }
        Type::Matrix { base, cols, rows } => {
            let (cols, rows) = (*cols as usize, *rows as usize);
            let zero = ConstValue::Float(0.0).cast(*base)?;
            let one = ConstValue::Float(1.0).cast(*base)?;
            let flat: Vec<ConstValue> = match (values, arg_types) {
                ([single], [Type::Scalar(_)]) => {
                    let diagonal = single.cast(*base)?;
                    (0..cols * rows)
                        .map(|i| if i / rows == i % rows { diagonal.clone() } else { zero.clone() })
                        .collect()
                }
                ([ConstValue::Composite(source)], [Type::Matrix { .. }]) => {
                    let mut out = Vec::with_capacity(cols * rows);
                    for c in 0..cols {
                        for r in 0..rows {
                            let existing = match source.get(c) {
                                Some(ConstValue::Composite(column)) => column.get(r),
                                _ => None,
                            };
                            out.push(match existing {
                                Some(value) => value.cast(*base)?,
                                None if c == r => one.clone(),
                                None => zero.clone(),
                            });
                        }
                    }
                    out
                }
                _ => values
                    .iter()
                    .flat_map(|v| v.components())
                    .map(|c| c.cast(*base))
                    .collect::<Option<Vec<_>>>()?,
            };
            constant::from_components(target, flat)
        }
        Type::Struct(_) | Type::Array(..) => ConstValue::Composite(values.to_vec()).convert_to(target),
        _ => None,
    }
}

fn broadcast(values: &[ConstValue], index: usize) -> Option<&ConstValue> {
    match values {
        [single] => Some(single),
        _ => values.get(index),
    }
}

/// Lazily computes types, constants and checks for one tree.
pub struct TypeChecker<'a> {
    tree: &'a SyntaxTree,
    resolution: &'a Resolution,
    cache: &'a TypeCache,
}

impl<'a> TypeChecker<'a> {
    pub fn new(tree: &'a SyntaxTree, resolution: &'a Resolution, cache: &'a TypeCache) -> Self {
        Self {
            tree,
            resolution,
            cache,
        }
    }

    fn kind(&self, id: NodeId) -> &'a NodeKind {
        self.tree.kind(id)
    }

    fn report(&self, kind: DiagnosticKind, node: NodeId, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(kind, message, self.tree.span(node)).at_node(node);
        self.cache.diagnostics.borrow_mut().push(diagnostic);
    }

    fn type_error(&self, node: NodeId, message: impl Into<String>) {
        self.report(DiagnosticKind::TypeError, node, message);
    }

    /// Type of an expression, type specifier or declaring node. Statements
    /// have type `void`.
    pub fn type_of(&self, node: NodeId) -> Type {
        memo(
            &self.cache.nodes,
            node,
            || {
                self.type_error(node, "the type of this expression depends on itself");
                Type::Error
            },
            || self.compute(node),
        )
    }

    /// Declared type of a declaration. Functions get a [`Type::Function`].
    pub fn declaration_type(&self, decl: DeclId) -> Type {
        memo(
            &self.cache.declarations,
            decl,
            || {
                let d = self.resolution.declaration(decl);
                self.type_error(d.node, format!("the type of '{}' depends on itself", d.name));
                Type::Error
            },
            || self.compute_declaration(self.resolution.declaration(decl)),
        )
    }

    /// Folded value of a constant expression.
    pub fn constant_value_of(&self, node: NodeId) -> Option<ConstValue> {
        memo(&self.cache.constants, node, || None, || self.fold(node))
    }

    /// The overload a function call resolved to.
    pub fn resolved_function(&self, call: NodeId) -> Option<Arc<FunctionSignature>> {
        self.type_of(call);
        self.cache.calls.borrow().get(&call).cloned()
    }

    /// Signature of a function definition or prototype node.
    pub fn function_signature(&self, function: NodeId) -> Option<Arc<FunctionSignature>> {
        match self.type_of(function) {
            Type::Function(sig) => Some(sig),
            _ => None,
        }
    }

    fn compute(&self, node: NodeId) -> Type {
        match self.kind(node) {
            NodeKind::Literal(lit) => literal_type(lit),
            NodeKind::Identifier(ident) => self.check_identifier(node, ident),
            NodeKind::Unary { op, operand } => self.check_unary(node, *op, *operand),
            NodeKind::Postfix { operand, .. } => {
                let ty = self.type_of(*operand);
                self.check_increment(node, *operand, ty)
            }
            NodeKind::Binary { op, lhs, rhs } => self.check_binary(node, *op, *lhs, *rhs),
            NodeKind::Assignment { op, lhs, rhs } => self.check_assignment(node, *op, *lhs, *rhs),
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => self.check_conditional(node, *condition, *then_expr, *else_expr),
            NodeKind::Sequence { exprs } => exprs
                .iter()
                .map(|&e| self.type_of(e))
                .last()
                .unwrap_or(Type::Error),
            NodeKind::Call {
                callee,
                args,
                constructor: true,
            } => self.check_constructor(node, *callee, *args),
            NodeKind::Call { callee, args, .. } => self.check_call(node, *callee, *args),
            NodeKind::MethodCall {
                object,
                method,
                args,
            } => self.check_method(node, *object, method, *args),
            NodeKind::Field { base, field } => self.check_field(node, *base, field),
            NodeKind::Index { base, index } => self.check_index(node, *base, *index),
            NodeKind::InitializerList { elements } => self.check_initializer_list(node, elements),
            NodeKind::Error { .. } => Type::Error,
            NodeKind::TypeSpecifier { name, array_sizes } => {
                let base = match name {
                    TypeName::Builtin(word) => Type::from_name(word).unwrap_or(Type::Error),
                    TypeName::Named(_) => match self.resolution.binding(node) {
                        Some(Binding::Declaration(id)) => self.declaration_type(id),
                        _ => Type::Error,
                    },
                    TypeName::Struct(spec) => self.type_of(*spec),
                };
                self.apply_sizes(base, array_sizes)
            }
            NodeKind::StructSpecifier { name, fields } => {
                let name = name.as_ref().map_or("struct", |n| n.name.as_str());
                self.struct_type(name, fields)
            }
            NodeKind::InterfaceBlock { name, fields, .. } => self.struct_type(&name.name, fields),
            NodeKind::Declarator { .. }
            | NodeKind::Parameter { .. }
            | NodeKind::FunctionDefinition { .. } => match self.resolution.declaration_for_node(node) {
                Some(decl) => self.declaration_type(decl.id),
                None if matches!(self.kind(node), NodeKind::Parameter { .. }) => self.parameter_type(node),
                None => Type::Error,
            },
            NodeKind::FunctionPrototype { .. } => {
                // Inside a definition the declaration belongs to the definition.
                let owner = match self.tree.parent(node) {
                    Some(parent) if matches!(self.kind(parent), NodeKind::FunctionDefinition { .. }) => parent,
                    _ => node,
                };
                match self.resolution.declaration_for_node(owner) {
                    Some(decl) => self.declaration_type(decl.id),
                    None => Type::Function(self.signature(node)),
                }
            }
            _ => Type::Void,
        }
    }

    // ── Declarations ────────────────────────────────────────────────

    fn compute_declaration(&self, decl: &Declaration) -> Type {
        match decl.kind {
            DeclKind::Function => Type::Function(self.signature(decl.node)),
            DeclKind::Struct | DeclKind::Block => self.type_of(decl.node),
            DeclKind::Parameter | DeclKind::Field => self.declared_type(decl),
            DeclKind::Variable => self.variable_type(decl),
        }
    }

    /// Type written in the declaration, before any inference from the
    /// initializer.
    fn declared_type(&self, decl: &Declaration) -> Type {
        let base = match decl.type_node {
            Some(ty) => self.type_of(ty),
            // Interface block instance.
            None => match self.tree.parent(decl.node) {
                Some(block) => self.type_of(block),
                None => Type::Error,
            },
        };
        let sizes: &[Option<NodeId>] = match self.kind(decl.node) {
            NodeKind::Declarator { array_sizes, .. } | NodeKind::Parameter { array_sizes, .. } => {
                array_sizes.as_slice()
            }
            _ => &[],
        };
        self.apply_sizes(base, sizes)
    }

    fn variable_type(&self, decl: &Declaration) -> Type {
        let declared = self.declared_type(decl);
        let NodeKind::Declarator {
            initializer: Some(init),
            ..
        } = self.kind(decl.node)
        else {
            return declared;
        };
        if decl.is_const() && self.type_of(*init).is_error() {
            return Type::Error;
        }
        // Unsized arrays take their length from the initializer.
        if let Type::Array(elem, None) = &declared {
            if let NodeKind::InitializerList { elements } = self.kind(*init) {
                return Type::Array(elem.clone(), Some(elements.len() as u32));
            }
            if let Type::Array(init_elem, Some(n)) = self.type_of(*init) {
                if init_elem == *elem {
                    return Type::Array(init_elem, Some(n));
                }
            }
        }
        declared
    }

    fn parameter_type(&self, param: NodeId) -> Type {
        match self.kind(param) {
            NodeKind::Parameter { ty, array_sizes, .. } => {
                let base = self.type_of(*ty);
                self.apply_sizes(base, array_sizes)
            }
            _ => Type::Error,
        }
    }

    fn signature(&self, function: NodeId) -> Arc<FunctionSignature> {
        let prototype = match self.kind(function) {
            NodeKind::FunctionDefinition { prototype, .. } => *prototype,
            _ => function,
        };
        let NodeKind::FunctionPrototype {
            return_type,
            name,
            params,
        } = self.kind(prototype)
        else {
            return Arc::new(FunctionSignature {
                name: String::new(),
                params: Vec::new(),
                return_type: Type::Error,
            });
        };
        let params = match self.kind(*params) {
            NodeKind::ParameterList { params } => params
                .iter()
                .map(|&param| {
                    let direction = match self.kind(param) {
                        NodeKind::Parameter { qualifiers, .. } if qualifiers.has(Qualifier::Inout) => {
                            ParamDirection::InOut
                        }
                        NodeKind::Parameter { qualifiers, .. } if qualifiers.has(Qualifier::Out) => {
                            ParamDirection::Out
                        }
                        _ => ParamDirection::In,
                    };
                    ParamType {
                        ty: self.parameter_type(param),
                        direction,
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        Arc::new(FunctionSignature {
            name: name.name.clone(),
            params,
            return_type: self.type_of(*return_type),
        })
    }

    fn struct_type(&self, name: &str, fields: &[NodeId]) -> Type {
        let mut out = Vec::new();
        for &field in fields {
            let NodeKind::Declaration {
                ty: Some(ty),
                declarators,
                ..
            } = self.kind(field)
            else {
                continue;
            };
            let base = self.type_of(*ty);
            for &declarator in declarators {
                if let NodeKind::Declarator {
                    name, array_sizes, ..
                } = self.kind(declarator)
                {
                    out.push(StructField {
                        name: name.name.clone(),
                        ty: self.apply_sizes(base.clone(), array_sizes),
                    });
                }
            }
        }
        Type::Struct(Arc::new(StructType {
            name: name.to_string(),
            fields: out,
        }))
    }

    /// Wrap `base` in the written array dimensions. Sizes that do not fold
    /// to a positive integer leave that dimension unsized.
    fn apply_sizes(&self, base: Type, sizes: &[Option<NodeId>]) -> Type {
        if base.is_error() {
            return base;
        }
        sizes.iter().rev().fold(base, |ty, size| {
            let len = size
                .and_then(|s| self.constant_value_of(s))
                .and_then(|v| v.as_i64())
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| n > 0);
            Type::array_of(ty, len)
        })
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn check_identifier(&self, node: NodeId, ident: &Ident) -> Type {
        match self.resolution.binding(node) {
            Some(Binding::Declaration(id)) => {
                let decl = self.resolution.declaration(id);
                if matches!(decl.kind, DeclKind::Struct | DeclKind::Block) {
                    self.type_error(node, format!("'{}' is a type, not a value", ident.name));
                    return Type::Error;
                }
                self.declaration_type(id)
            }
            Some(Binding::Builtin) => {
                let table = builtins();
                if let Some(var) = table.variable(&ident.name) {
                    return var.ty.clone();
                }
                match table.functions(&ident.name).first() {
                    Some(sig) => Type::Function(sig.clone()),
                    None => Type::Error,
                }
            }
            _ => Type::Error,
        }
    }

    fn check_unary(&self, node: NodeId, op: UnaryOp, operand: NodeId) -> Type {
        let ty = self.type_of(operand);
        if ty.is_error() {
            return Type::Error;
        }
        let valid = match op {
            UnaryOp::Plus | UnaryOp::Minus => is_numeric_shape(&ty),
            UnaryOp::Not => ty.is_bool(),
            UnaryOp::BitNot => is_integer_shape(&ty),
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => {
                return self.check_increment(node, operand, ty);
            }
        };
        if valid {
            ty
        } else {
            self.type_error(node, format!("invalid operand to unary '{}': '{}'", op, ty));
            Type::Error
        }
    }

    fn check_increment(&self, node: NodeId, operand: NodeId, ty: Type) -> Type {
        if ty.is_error() {
            return Type::Error;
        }
        if !is_numeric_shape(&ty) {
            self.type_error(node, format!("cannot increment or decrement a value of type '{}'", ty));
            return Type::Error;
        }
        if let Err(message) = self.lvalue(operand) {
            self.type_error(operand, message);
        }
        ty
    }

    /// Whether the expression can be written to.
    fn lvalue(&self, node: NodeId) -> Result<(), String> {
        match self.kind(node) {
            NodeKind::Identifier(ident) => match self.resolution.binding(node) {
                Some(Binding::Declaration(id)) => {
                    let decl = self.resolution.declaration(id);
                    let read_only = match decl.kind {
                        DeclKind::Variable => {
                            decl.is_const()
                                || decl.qualifiers.has(Qualifier::Readonly)
                                || (decl.scope == ScopeId(0) && decl.qualifiers.is_read_only_global())
                        }
                        DeclKind::Parameter => decl.is_const(),
                        _ => return Err(format!("'{}' is not assignable", ident.name)),
                    };
                    if read_only {
                        Err(format!("cannot assign to read-only variable '{}'", ident.name))
                    } else {
                        Ok(())
                    }
                }
                Some(Binding::Builtin) => match builtins().variable(&ident.name) {
                    Some(var) if !var.read_only => Ok(()),
                    _ => Err(format!("cannot assign to read-only built-in '{}'", ident.name)),
                },
                _ => Ok(()),
            },
            NodeKind::Field { base, field } => {
                let is_swizzle = matches!(self.type_of(*base), Type::Scalar(_) | Type::Vector(..));
                if is_swizzle {
                    let mut seen = std::collections::HashSet::new();
                    if let Ok(indices) = swizzle_indices(&field.name, 4) {
                        if !indices.iter().all(|i| seen.insert(*i)) {
                            return Err(format!(
                                "swizzle '{}' repeats a component and cannot be assigned",
                                field.name
                            ));
                        }
                    }
                }
                self.lvalue(*base)
            }
            NodeKind::Index { base, .. } => self.lvalue(*base),
            NodeKind::Error { .. } => Ok(()),
            _ => Err("expression is not assignable".to_string()),
        }
    }

    fn check_binary(&self, node: NodeId, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Type {
        let (l, r) = (self.type_of(lhs), self.type_of(rhs));
        if l.is_error() || r.is_error() {
            return Type::Error;
        }
        match binary_result(op, &l, &r) {
            Ok(ty) => ty,
            Err(message) => {
                self.type_error(node, message);
                Type::Error
            }
        }
    }

    fn check_assignment(&self, node: NodeId, op: AssignOp, lhs: NodeId, rhs: NodeId) -> Type {
        let (l, r) = (self.type_of(lhs), self.type_of(rhs));
        if l.is_error() {
            return Type::Error;
        }
        if let Err(message) = self.lvalue(lhs) {
            self.type_error(lhs, message);
        }
        if r.is_error() {
            return l;
        }
        let value = match op {
            AssignOp::Assign => r,
            AssignOp::Compound(bin) => match binary_result(bin, &l, &r) {
                Ok(ty) => ty,
                Err(message) => {
                    self.type_error(node, message);
                    return l;
                }
            },
        };
        if !can_implicitly_convert(&value, &l) {
            self.type_error(
                node,
                format!("cannot assign a value of type '{}' to '{}'", value, l),
            );
        }
        l
    }

    fn check_conditional(&self, node: NodeId, condition: NodeId, a: NodeId, b: NodeId) -> Type {
        self.check_condition(condition);
        let (a, b) = (self.type_of(a), self.type_of(b));
        if a.is_error() || b.is_error() {
            return Type::Error;
        }
        if a == b {
            a
        } else if can_implicitly_convert(&a, &b) {
            b
        } else if can_implicitly_convert(&b, &a) {
            a
        } else {
            self.type_error(
                node,
                format!("conditional branches have incompatible types '{}' and '{}'", a, b),
            );
            Type::Error
        }
    }

    fn argument_types(&self, list: NodeId) -> (Vec<NodeId>, Vec<Type>) {
        let args = self.tree.arguments(list).unwrap_or_default();
        let types = args.iter().map(|&a| self.type_of(a)).collect();
        (args, types)
    }

    fn check_constructor(&self, node: NodeId, callee: NodeId, args: NodeId) -> Type {
        let target = self.type_of(callee);
        let (_, arg_types) = self.argument_types(args);
        if target.is_error() || arg_types.iter().any(Type::is_error) {
            return Type::Error;
        }
        match constructor_result(&target, &arg_types) {
            Ok(ty) => ty,
            Err(message) => {
                self.type_error(node, message);
                Type::Error
            }
        }
    }

    /// User overloads (definitions before prototypes, deduplicated by
    /// parameter types) followed by built-in overloads.
    fn candidates(&self, name: &str) -> Vec<Arc<FunctionSignature>> {
        let mut user = self.resolution.functions_named(name);
        user.sort_by_key(|d| !matches!(self.kind(d.node), NodeKind::FunctionDefinition { .. }));
        let mut out: Vec<Arc<FunctionSignature>> = Vec::new();
        for decl in user {
            if let Type::Function(sig) = self.declaration_type(decl.id) {
                if !out.iter().any(|o| o.same_parameters(&sig)) {
                    out.push(sig);
                }
            }
        }
        for sig in builtins().functions(name) {
            if !out.iter().any(|o| o.same_parameters(sig)) {
                out.push(sig.clone());
            }
        }
        out
    }

    fn check_call(&self, node: NodeId, callee: NodeId, args: NodeId) -> Type {
        let NodeKind::Identifier(ident) = self.kind(callee) else {
            return Type::Error;
        };
        let (args, arg_types) = self.argument_types(args);
        match self.resolution.binding(callee) {
            Some(Binding::Declaration(id)) => {
                if self.resolution.declaration(id).kind != DeclKind::Function {
                    self.type_error(callee, format!("'{}' is not a function", ident.name));
                    return Type::Error;
                }
            }
            Some(Binding::Builtin) => {}
            _ => return Type::Error,
        }
        let candidates = self.candidates(&ident.name);
        if candidates.is_empty() {
            self.type_error(callee, format!("'{}' is not a function", ident.name));
            return Type::Error;
        }
        if arg_types.iter().any(Type::is_error) {
            return Type::Error;
        }
        match resolve_overload(&candidates, &arg_types) {
            Overload::Unique(sig) => {
                for (param, &arg) in sig.params.iter().zip(&args) {
                    if param.direction == ParamDirection::In {
                        continue;
                    }
                    if let Err(message) = self.lvalue(arg) {
                        self.type_error(
                            arg,
                            format!("{} (passed to an out parameter of '{}')", message, sig.name),
                        );
                    }
                }
                let ty = sig.return_type.clone();
                self.cache.calls.borrow_mut().insert(node, sig);
                ty
            }
            Overload::Ambiguous(best) => {
                let listed: Vec<String> = best.iter().map(|s| s.to_string()).collect();
                self.report(
                    DiagnosticKind::AmbiguousOverload,
                    node,
                    format!(
                        "call to '{}' is ambiguous; candidates are: {}",
                        ident.name,
                        listed.join(", ")
                    ),
                );
                Type::Error
            }
            Overload::NoMatch => {
                let shown: Vec<String> = arg_types.iter().map(|t| t.to_string()).collect();
                let mut message = format!(
                    "no matching overload for '{}({})'",
                    ident.name,
                    shown.join(", ")
                );
                let listed: Vec<String> = candidates.iter().take(4).map(|s| s.to_string()).collect();
                message.push_str(&format!("; candidates are: {}", listed.join(", ")));
                if candidates.len() > 4 {
                    message.push_str(&format!(" and {} more", candidates.len() - 4));
                }
                self.type_error(node, message);
                Type::Error
            }
        }
    }

    fn check_method(&self, node: NodeId, object: NodeId, method: &Ident, args: NodeId) -> Type {
        let ty = self.type_of(object);
        let arg_count = self.tree.arguments(args).map_or(0, |a| a.len());
        if ty.is_error() {
            return Type::Error;
        }
        if method.name != "length" {
            self.type_error(node, format!("type '{}' has no method '{}'", ty, method.name));
            return Type::Error;
        }
        if arg_count != 0 {
            self.type_error(node, "'length' takes no arguments");
        }
        match ty {
            Type::Array(..) | Type::Vector(..) | Type::Matrix { .. } => Type::INT,
            _ => {
                self.type_error(node, format!("type '{}' has no method 'length'", ty));
                Type::Error
            }
        }
    }

    fn check_field(&self, node: NodeId, base: NodeId, field: &Ident) -> Type {
        let ty = self.type_of(base);
        // An empty name comes from `v.` and is already a syntax error.
        if ty.is_error() || field.name.is_empty() {
            return Type::Error;
        }
        match &ty {
            Type::Struct(s) => match s.field(&field.name) {
                Some(f) => f.ty.clone(),
                None => {
                    self.type_error(node, format!("'{}' has no field named '{}'", s.name, field.name));
                    Type::Error
                }
            },
            Type::Scalar(k) | Type::Vector(k, _) => {
                let size = ty.component_count().unwrap_or(1);
                match swizzle_indices(&field.name, size) {
                    Ok(indices) => Type::vector(*k, indices.len() as u8),
                    Err(message) => {
                        self.type_error(node, message);
                        Type::Error
                    }
                }
            }
            _ => {
                self.type_error(node, format!("type '{}' has no fields", ty));
                Type::Error
            }
        }
    }

    fn check_index(&self, node: NodeId, base: NodeId, index: NodeId) -> Type {
        let (b, i) = (self.type_of(base), self.type_of(index));
        if b.is_error() || i.is_error() {
            return Type::Error;
        }
        if !matches!(i, Type::Scalar(k) if k.is_integer()) {
            self.type_error(index, format!("index must be an integer scalar, found '{}'", i));
        }
        let (element, bound) = match &b {
            Type::Array(elem, len) => ((**elem).clone(), *len),
            Type::Vector(k, n) => (Type::Scalar(*k), Some(*n as u32)),
            Type::Matrix { base, cols, rows } => (Type::Vector(*base, *rows), Some(*cols as u32)),
            _ => {
                self.type_error(node, format!("type '{}' cannot be indexed", b));
                return Type::Error;
            }
        };
        let value = self.constant_value_of(index).and_then(|v| v.as_i64());
        if let (Some(bound), Some(value)) = (bound, value) {
            if value < 0 || value >= bound as i64 {
                self.type_error(index, format!("index {} is out of range for '{}'", value, b));
            }
        }
        element
    }

    /// The type an initializer list is expected to produce, from its
    /// declarator or enclosing list.
    fn expected_type(&self, list: NodeId) -> Option<Type> {
        let parent = self.tree.parent(list)?;
        match self.kind(parent) {
            NodeKind::Declarator { .. } => {
                let decl = self.resolution.declaration_for_node(parent)?;
                Some(self.declared_type(decl))
            }
            NodeKind::InitializerList { elements } => {
                let outer = self.expected_type(parent)?;
                let position = elements.iter().position(|&e| e == list)?;
                element_type(&outer, position)
            }
            _ => None,
        }
    }

    fn check_initializer_list(&self, node: NodeId, elements: &[NodeId]) -> Type {
        let Some(expected) = self.expected_type(node) else {
            elements.iter().for_each(|&e| {
                self.type_of(e);
            });
            self.type_error(node, "initializer list is not allowed here");
            return Type::Error;
        };
        if expected.is_error() {
            return Type::Error;
        }
        let count = match &expected {
            Type::Array(_, Some(n)) => *n as usize,
            Type::Array(_, None) => elements.len(),
            Type::Vector(_, n) => *n as usize,
            Type::Matrix { cols, .. } => *cols as usize,
            Type::Struct(s) => s.fields.len(),
            _ => {
                self.type_error(node, format!("'{}' cannot be initialized with a list", expected));
                return Type::Error;
            }
        };
        if count != elements.len() {
            self.type_error(
                node,
                format!(
                    "expected {} initializers for '{}', found {}",
                    count,
                    expected,
                    elements.len()
                ),
            );
        }
        for (position, &element) in elements.iter().enumerate() {
            let ty = self.type_of(element);
            let Some(target) = element_type(&expected, position) else {
                continue;
            };
            if !ty.is_error() && !can_implicitly_convert(&ty, &target) {
                self.type_error(
                    element,
                    format!("cannot initialize '{}' with a value of type '{}'", target, ty),
                );
            }
        }
        match expected {
            Type::Array(elem, None) => Type::Array(elem, Some(elements.len() as u32)),
            other => other,
        }
    }

    // ── Constant folding ────────────────────────────────────────────

    fn fold(&self, node: NodeId) -> Option<ConstValue> {
        let kind = self.kind(node);
        if !kind.is_expression() {
            return None;
        }
        let ty = self.type_of(node);
        if ty.is_error() {
            return None;
        }
        match kind {
            NodeKind::Literal(lit) => Some(literal_value(lit)),
            NodeKind::Identifier(_) => {
                let decl = self.resolution.declaration_of(node)?;
                if decl.kind != DeclKind::Variable || !decl.is_const() {
                    return None;
                }
                let NodeKind::Declarator {
                    initializer: Some(init),
                    ..
                } = self.kind(decl.node)
                else {
                    return None;
                };
                self.constant_value_of(*init)?.convert_to(&ty)
            }
            NodeKind::Unary { op, operand } => constant::fold_unary(*op, &self.constant_value_of(*operand)?),
            NodeKind::Binary { op, lhs, rhs } => self.fold_binary(*op, *lhs, *rhs, &ty),
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let chosen = match self.constant_value_of(*condition)? {
                    ConstValue::Bool(true) => *then_expr,
                    ConstValue::Bool(false) => *else_expr,
                    _ => return None,
                };
                self.constant_value_of(chosen)?.convert_to(&ty)
            }
            NodeKind::Call {
                args,
                constructor: true,
                ..
            } => {
                let (args, arg_types) = self.argument_types(*args);
                let values = args
                    .iter()
                    .map(|&a| self.constant_value_of(a))
                    .collect::<Option<Vec<_>>>()?;
                fold_constructor(&ty, &values, &arg_types)
            }
            NodeKind::Field { base, field } => {
                let value = self.constant_value_of(*base)?;
                match self.type_of(*base) {
                    Type::Struct(s) => {
                        let position = s.fields.iter().position(|f| f.name == field.name)?;
                        match value {
                            ConstValue::Composite(items) => items.get(position).cloned(),
                            _ => None,
                        }
                    }
                    base_ty => {
                        let indices = swizzle_indices(&field.name, base_ty.component_count()?).ok()?;
                        let components = value.components();
                        let picked = indices
                            .iter()
                            .map(|&i| components.get(i).cloned())
                            .collect::<Option<Vec<_>>>()?;
                        constant::from_components(&ty, picked)
                    }
                }
            }
            NodeKind::Index { base, index } => {
                let position = usize::try_from(self.constant_value_of(*index)?.as_i64()?).ok()?;
                match self.constant_value_of(*base)? {
                    ConstValue::Composite(items) => items.get(position).cloned(),
                    _ => None,
                }
            }
            NodeKind::MethodCall { object, .. } => match self.type_of(*object) {
                Type::Array(_, Some(n)) => Some(ConstValue::Int(n as i32)),
                Type::Vector(_, n) => Some(ConstValue::Int(n as i32)),
                Type::Matrix { cols, .. } => Some(ConstValue::Int(cols as i32)),
                _ => None,
            },
            NodeKind::InitializerList { elements } => {
                let values = elements
                    .iter()
                    .map(|&e| self.constant_value_of(e))
                    .collect::<Option<Vec<_>>>()?;
                ConstValue::Composite(values).convert_to(&ty)
            }
            _ => None,
        }
    }

    fn fold_binary(&self, op: BinaryOp, lhs: NodeId, rhs: NodeId, ty: &Type) -> Option<ConstValue> {
        let (lt, rt) = (self.type_of(lhs), self.type_of(rhs));
        let a = self.constant_value_of(lhs)?;
        let b = self.constant_value_of(rhs)?;
        match op {
            BinaryOp::Shl | BinaryOp::Shr => {
                let amounts = b.components();
                let shifted = a
                    .components()
                    .iter()
                    .enumerate()
                    .map(|(i, v)| constant::shift(op, v, broadcast(&amounts, i)?))
                    .collect::<Option<Vec<_>>>()?;
                constant::from_components(&lt, shifted)
            }
            _ if op.is_logical() => constant::scalar_binary(op, &a, &b),
            BinaryOp::Eq | BinaryOp::NotEq => {
                let common = if lt == rt { lt.clone() } else { common_type(&lt, &rt)? };
                let equal = a.convert_to(&common)? == b.convert_to(&common)?;
                Some(ConstValue::Bool(equal == (op == BinaryOp::Eq)))
            }
            _ if op.is_relational() => {
                let kind = common_scalar_kind(lt.scalar_kind()?, rt.scalar_kind()?)?;
                constant::relational(op, &a.cast(kind)?, &b.cast(kind)?).map(ConstValue::Bool)
            }
            _ => {
                let kind = ty.scalar_kind()?;
                let cast = |v: &ConstValue| {
                    v.components()
                        .iter()
                        .map(|c| c.cast(kind))
                        .collect::<Option<Vec<_>>>()
                };
                let (ca, cb) = (cast(&a)?, cast(&b)?);
                if op == BinaryOp::Mul && matrix_product_type(&lt, &rt).is_some() {
                    let (a_rows, inner) = match &lt {
                        Type::Matrix { cols, rows, .. } => (*rows as usize, *cols as usize),
                        Type::Vector(_, n) => (1, *n as usize),
                        _ => return None,
                    };
                    return constant::from_components(ty, constant::matrix_product(&ca, &cb, a_rows, inner)?);
                }
                let len = ca.len().max(cb.len());
                let out = (0..len)
                    .map(|i| constant::scalar_binary(op, broadcast(&ca, i)?, broadcast(&cb, i)?))
                    .collect::<Option<Vec<_>>>()?;
                constant::from_components(ty, out)
            }
        }
    }

    // ── Statements ──────────────────────────────────────────────────

    /// Type every expression and run the statement-level checks. Runs once
    /// per cache.
    pub fn check_all(&self) {
        if self.cache.checked.replace(true) {
            return;
        }
        let started = Instant::now();
        for id in self.tree.ids() {
            let kind = self.kind(id);
            if kind.is_expression() {
                if !self.is_callee(id) {
                    self.type_of(id);
                }
                continue;
            }
            match kind {
                NodeKind::Declarator {
                    array_sizes,
                    initializer,
                    ..
                } => {
                    self.check_sizes(array_sizes);
                    self.check_declarator(id, *initializer);
                }
                NodeKind::Parameter { array_sizes, .. } => {
                    self.check_sizes(array_sizes);
                    self.type_of(id);
                }
                NodeKind::TypeSpecifier { array_sizes, .. } => {
                    self.check_sizes(array_sizes);
                    self.type_of(id);
                }
                NodeKind::If { condition, .. }
                | NodeKind::While { condition, .. }
                | NodeKind::DoWhile { condition, .. }
                | NodeKind::For {
                    condition: Some(condition),
                    ..
                } => self.check_condition(*condition),
                NodeKind::Switch { selector, .. } => self.check_selector(*selector),
                NodeKind::CaseLabel { value: Some(value) } => self.check_case_label(*value),
                NodeKind::Return { value } => self.check_return(id, *value),
                NodeKind::Break => self.check_jump(id, true),
                NodeKind::Continue => self.check_jump(id, false),
                NodeKind::FunctionDefinition { .. } => self.check_function_definition(id),
                _ => {}
            }
        }
        debug!(
            nodes = self.tree.len(),
            diagnostics = self.cache.diagnostics.borrow().len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "type checked translation unit"
        );
    }

    fn is_callee(&self, id: NodeId) -> bool {
        self.tree
            .parent(id)
            .is_some_and(|p| matches!(self.kind(p), NodeKind::Call { callee, .. } if *callee == id))
    }

    fn check_sizes(&self, sizes: &[Option<NodeId>]) {
        for &size in sizes.iter().flatten() {
            if self.type_of(size).is_error() {
                continue;
            }
            match self.constant_value_of(size).and_then(|v| v.as_i64()) {
                Some(n) if n > 0 => {}
                _ => self.type_error(size, "array size must be a positive constant integer expression"),
            }
        }
    }

    fn check_declarator(&self, id: NodeId, initializer: Option<NodeId>) {
        let Some(decl) = self.resolution.declaration_for_node(id) else {
            return;
        };
        if decl.kind != DeclKind::Variable {
            return;
        }
        let declared = self.declared_type(decl);
        if declared.is_void() {
            self.type_error(id, format!("variable '{}' cannot be declared 'void'", decl.name));
            return;
        }
        let Some(init) = initializer else {
            if decl.is_const() {
                self.type_error(id, format!("const variable '{}' must be initialized", decl.name));
            }
            return;
        };
        let value = self.type_of(init);
        if value.is_error() || declared.is_error() || matches!(self.kind(init), NodeKind::InitializerList { .. }) {
            return;
        }
        let target = self.declaration_type(decl.id);
        if !target.is_error() && !can_implicitly_convert(&value, &target) {
            self.type_error(
                init,
                format!(
                    "cannot initialize '{}' of type '{}' with a value of type '{}'",
                    decl.name, target, value
                ),
            );
        }
    }

    fn check_condition(&self, condition: NodeId) {
        if !self.kind(condition).is_expression() {
            return;
        }
        let ty = self.type_of(condition);
        if !ty.is_error() && !ty.is_bool() {
            self.type_error(condition, format!("condition must be 'bool', found '{}'", ty));
        }
    }

    fn check_selector(&self, selector: NodeId) {
        let ty = self.type_of(selector);
        if !ty.is_error() && !matches!(ty, Type::Scalar(k) if k.is_integer()) {
            self.type_error(selector, format!("switch selector must be 'int' or 'uint', found '{}'", ty));
        }
    }

    fn check_case_label(&self, value: NodeId) {
        if self.type_of(value).is_error() {
            return;
        }
        if self.constant_value_of(value).and_then(|v| v.as_i64()).is_none() {
            self.type_error(value, "case label must be a constant integer expression");
        }
    }

    fn check_return(&self, id: NodeId, value: Option<NodeId>) {
        let Some(function) = self
            .tree
            .enclosing(id, |k| matches!(k, NodeKind::FunctionDefinition { .. }))
        else {
            return;
        };
        let Some(sig) = self.function_signature(function) else {
            return;
        };
        let expected = &sig.return_type;
        if expected.is_error() {
            return;
        }
        match value {
            Some(value) => {
                let ty = self.type_of(value);
                if ty.is_error() {
                    return;
                }
                if expected.is_void() {
                    self.type_error(id, format!("void function '{}' cannot return a value", sig.name));
                } else if !can_implicitly_convert(&ty, expected) {
                    self.type_error(
                        value,
                        format!(
                            "cannot return a value of type '{}' from a function returning '{}'",
                            ty, expected
                        ),
                    );
                }
            }
            None if !expected.is_void() => {
                self.type_error(
                    id,
                    format!("function '{}' must return a value of type '{}'", sig.name, expected),
                );
            }
            None => {}
        }
    }

    fn check_jump(&self, id: NodeId, is_break: bool) {
        for ancestor in self.tree.ancestors(id) {
            match self.kind(ancestor) {
                NodeKind::For { .. } | NodeKind::While { .. } | NodeKind::DoWhile { .. } => return,
                NodeKind::Switch { .. } if is_break => return,
                NodeKind::FunctionDefinition { .. } => break,
                _ => {}
            }
        }
        let message = if is_break {
            "'break' outside of a loop or switch"
        } else {
            "'continue' outside of a loop"
        };
        self.type_error(id, message);
    }

    fn check_function_definition(&self, id: NodeId) {
        let Some(decl) = self.resolution.declaration_for_node(id) else {
            return;
        };
        let Type::Function(sig) = self.declaration_type(decl.id) else {
            return;
        };
        for other in self.resolution.functions_named(&decl.name) {
            if other.id == decl.id {
                continue;
            }
            let Type::Function(other_sig) = self.declaration_type(other.id) else {
                continue;
            };
            if !other_sig.same_parameters(&sig) {
                continue;
            }
            let is_definition = matches!(self.kind(other.node), NodeKind::FunctionDefinition { .. });
            if is_definition && other.id < decl.id {
                let diagnostic = Diagnostic::error(
                    DiagnosticKind::Redefinition,
                    format!(
                        "redefinition of function '{}' (previously defined at line {})",
                        sig, other.name_span.line
                    ),
                    decl.name_span,
                )
                .at_node(id);
                self.cache.diagnostics.borrow_mut().push(diagnostic);
                return;
            }
            if !is_definition && other_sig.return_type != sig.return_type {
                self.type_error(
                    id,
                    format!(
                        "function '{}' was declared returning '{}'",
                        decl.name, other_sig.return_type
                    ),
                );
                return;
            }
        }
    }
}

/// Type named by a type specifier node, without sharing a cache.
pub fn type_of_specifier(tree: &SyntaxTree, resolution: &Resolution, node: NodeId) -> Type {
    let cache = TypeCache::default();
    TypeChecker::new(tree, resolution, &cache).type_of(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::resolver::Resolver;

    struct Fixture {
        tree: SyntaxTree,
        resolution: Resolution,
        cache: TypeCache,
    }

    impl Fixture {
        fn new(src: &str) -> Self {
            let tree = parse(src);
            let resolution = Resolver::resolve(&tree);
            Fixture {
                tree,
                resolution,
                cache: TypeCache::default(),
            }
        }

        fn checker(&self) -> TypeChecker<'_> {
            TypeChecker::new(&self.tree, &self.resolution, &self.cache)
        }

        fn errors(&self) -> Vec<String> {
            self.checker().check_all();
            self.cache.diagnostics().into_iter().map(|d| d.message).collect()
        }

        /// The outermost expression whose text is exactly `text`.
        fn expr(&self, text: &str) -> NodeId {
            self.tree
                .ids()
                .filter(|&id| self.tree.kind(id).is_expression() && self.tree.text(id) == text)
                .max()
                .unwrap_or_else(|| panic!("no expression '{}'", text))
        }

        fn type_of(&self, text: &str) -> String {
            self.checker().type_of(self.expr(text)).to_string()
        }

        fn decl_type(&self, name: &str) -> String {
            let decl = self
                .resolution
                .declarations()
                .iter()
                .find(|d| d.name == name)
                .unwrap();
            self.checker().declaration_type(decl.id).to_string()
        }
    }

    #[test]
    fn test_arithmetic_conversions() {
        let f = Fixture::new("void main() { float x = 1.0 + 2; uint u = 1u + 2u; double d = 1.0 * 2.0lf; }");
        assert_eq!(f.type_of("1.0 + 2"), "float");
        assert_eq!(f.type_of("1u + 2u"), "uint");
        assert_eq!(f.type_of("1.0 * 2.0lf"), "double");
        assert!(f.errors().is_empty(), "{:?}", f.errors());
    }

    #[test]
    fn test_constructor_folds() {
        let f = Fixture::new("vec3 c = vec3(1.0, 0.5, 0.25);");
        let call = f.expr("vec3(1.0, 0.5, 0.25)");
        assert_eq!(f.checker().type_of(call).to_string(), "vec3");
        let value = f.checker().constant_value_of(call).unwrap();
        assert_eq!(
            value,
            ConstValue::Composite(vec![
                ConstValue::Float(1.0),
                ConstValue::Float(0.5),
                ConstValue::Float(0.25)
            ])
        );
    }

    #[test]
    fn test_constructor_rules() {
        let f = Fixture::new(
            "void main() {
                vec4 a = vec4(vec2(1.0), 0.0, 1.0);
                vec2 b = vec2(vec4(1.0));
                mat3 m = mat3(1.0);
                mat2 n = mat2(vec4(1.0));
                vec3 bad = vec3(1.0, 2.0);
                vec2 extra = vec2(1.0, 2.0, 3.0);
            }",
        );
        let errors = f.errors();
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors[0].contains("not enough components"));
        assert!(errors[1].contains("too many arguments"));
    }

    #[test]
    fn test_matrix_constant_folding() {
        let f = Fixture::new("const mat2 m = mat2(2.0); const vec2 v = m * vec2(1.0, 3.0);");
        let call = f.expr("m * vec2(1.0, 3.0)");
        assert_eq!(f.checker().type_of(call).to_string(), "vec2");
        assert_eq!(
            f.checker().constant_value_of(call),
            Some(ConstValue::Composite(vec![ConstValue::Float(2.0), ConstValue::Float(6.0)]))
        );
    }

    #[test]
    fn test_integer_constant_folding() {
        let f = Fixture::new("const int N = 2 * 3 + 1; float a[N];");
        assert_eq!(f.checker().constant_value_of(f.expr("2 * 3 + 1")), Some(ConstValue::Int(7)));
        assert_eq!(f.decl_type("a"), "float[7]");
    }

    #[test]
    fn test_swizzles() {
        let f = Fixture::new(
            "void main() {
                vec3 v = vec3(1.0);
                vec2 a = v.xy;
                float b = v.b;
                vec4 c = v.xxyy;
                float d = v.xg;
                float e = v.w;
                v.xx = vec2(0.0);
            }",
        );
        assert_eq!(f.type_of("v.xy"), "vec2");
        assert_eq!(f.type_of("v.b"), "float");
        assert_eq!(f.type_of("v.xxyy"), "vec4");
        let errors = f.errors();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors[0].contains("mixes component sets"));
        assert!(errors[1].contains("out of range"));
        assert!(errors[2].contains("repeats a component"));
    }

    #[test]
    fn test_matrix_products() {
        let f = Fixture::new(
            "void main() { mat3 m; vec3 v; mat2x3 a; mat3x2 b; vec3 x = m * v; vec3 y = v * m; mat3 z = a * b; }",
        );
        assert_eq!(f.type_of("m * v"), "vec3");
        assert_eq!(f.type_of("v * m"), "vec3");
        assert_eq!(f.type_of("a * b"), "mat3");
        assert!(f.errors().is_empty(), "{:?}", f.errors());
    }

    #[test]
    fn test_user_overloads() {
        let f = Fixture::new(
            "float f(float x) { return x; }
             int f(int x) { return x; }
             void main() { f(1); f(1u); f(1.0); }",
        );
        assert_eq!(f.type_of("f(1)"), "int");
        assert_eq!(f.type_of("f(1u)"), "float");
        assert_eq!(f.type_of("f(1.0)"), "float");
        assert!(f.errors().is_empty(), "{:?}", f.errors());
    }

    #[test]
    fn test_ambiguous_overload() {
        let f = Fixture::new(
            "void g(int a, float b) {}
             void g(float a, int b) {}
             void main() { g(1, 1); }",
        );
        f.checker().check_all();
        let diagnostics = f.cache.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::AmbiguousOverload);
    }

    #[test]
    fn test_builtin_calls() {
        let f = Fixture::new(
            "uniform sampler2D tex;
             void main() {
                 float d = dot(vec3(1.0), vec3(0.0));
                 vec4 c = texture(tex, vec2(0.5));
                 float n = normalize(1);
                 vec3 bad = cross(vec2(1.0), vec2(1.0));
             }",
        );
        assert_eq!(f.type_of("dot(vec3(1.0), vec3(0.0))"), "float");
        assert_eq!(f.type_of("texture(tex, vec2(0.5))"), "vec4");
        assert_eq!(f.type_of("normalize(1)"), "float");
        let errors = f.errors();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].starts_with("no matching overload for 'cross(vec2, vec2)'"));
        let call = f.expr("dot(vec3(1.0), vec3(0.0))");
        let sig = f.checker().resolved_function(call).unwrap();
        assert_eq!(sig.to_string(), "float dot(vec3, vec3)");
    }

    #[test]
    fn test_out_argument_must_be_assignable() {
        let f = Fixture::new("void main() { float i; float a = modf(1.5, i); float b = modf(1.5, 2.0); }");
        let errors = f.errors();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("out parameter of 'modf'"));
    }

    #[test]
    fn test_const_cycle_is_error() {
        let f = Fixture::new("const int a = b; const int b = a;");
        assert_eq!(f.decl_type("a"), "<error>");
        assert_eq!(f.decl_type("b"), "<error>");
        // The unresolved name is reported by the resolver, not here.
        assert!(f.errors().is_empty(), "{:?}", f.errors());
    }

    #[test]
    fn test_errors_do_not_cascade() {
        let f = Fixture::new("void main() { float y = missing + 1.0; vec3 v = vec3(missing, 1.0, 2.0); }");
        assert_eq!(f.type_of("missing + 1.0"), "<error>");
        assert!(f.errors().is_empty(), "{:?}", f.errors());
    }

    #[test]
    fn test_statement_checks() {
        let f = Fixture::new(
            "float f() { return; }
             void g() { return 1.0; }
             void main() {
                 if (1) {}
                 break;
                 for (int i = 0; i < 4; i++) { continue; }
                 const float k;
                 int x = 1.5;
             }",
        );
        let errors = f.errors();
        assert_eq!(errors.len(), 6, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("must return a value of type 'float'")));
        assert!(errors.iter().any(|e| e.contains("cannot return a value")));
        assert!(errors.iter().any(|e| e.contains("condition must be 'bool'")));
        assert!(errors.iter().any(|e| e.contains("'break' outside")));
        assert!(errors.iter().any(|e| e.contains("must be initialized")));
        assert!(errors.iter().any(|e| e.contains("cannot initialize 'x'")));
    }

    #[test]
    fn test_assignment_targets() {
        let f = Fixture::new(
            "uniform float u;
             const float k = 1.0;
             out vec4 color;
             void main() {
                 u = 1.0;
                 k = 2.0;
                 gl_FragCoord = vec4(0.0);
                 color = vec4(1.0);
                 gl_Position = vec4(0.0);
             }",
        );
        let errors = f.errors();
        assert_eq!(errors.len(), 3, "{:?}", errors);
        assert!(errors.iter().all(|e| e.contains("read-only")));
    }

    #[test]
    fn test_indexing() {
        let f = Fixture::new(
            "void main() { vec3 v; float a[2]; mat4 m; float x = v[3]; float y = a[1]; vec4 c = m[0]; float z = v[1.0]; }",
        );
        assert_eq!(f.type_of("m[0]"), "vec4");
        assert_eq!(f.type_of("a[1]"), "float");
        let errors = f.errors();
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors[0].contains("out of range"));
        assert!(errors[1].contains("integer scalar"));
    }

    #[test]
    fn test_arrays_and_length() {
        let f = Fixture::new(
            "void main() { float a[] = float[](1.0, 2.0); float b[] = {1.0, 2.0, 3.0}; int n = b.length(); float c[2][3]; }",
        );
        assert_eq!(f.decl_type("a"), "float[2]");
        assert_eq!(f.decl_type("b"), "float[3]");
        assert_eq!(f.decl_type("c"), "float[2][3]");
        assert_eq!(f.checker().constant_value_of(f.expr("b.length()")), Some(ConstValue::Int(3)));
        assert!(f.errors().is_empty(), "{:?}", f.errors());
    }

    #[test]
    fn test_structs_and_blocks() {
        let f = Fixture::new(
            "struct Light { vec3 color; float power; };
             uniform Lights { Light lights[4]; } ubo;
             void main() {
                 Light l = Light(vec3(1.0), 2.0);
                 vec3 c = ubo.lights[0].color;
                 float bad = l.missing;
             }",
        );
        assert_eq!(f.type_of("ubo.lights[0].color"), "vec3");
        assert_eq!(f.decl_type("ubo"), "Lights");
        let errors = f.errors();
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("no field named 'missing'"));
    }

    #[test]
    fn test_function_redefinition() {
        let f = Fixture::new("void f(float x) {} void f(float y) {} void f(int z) {}");
        f.checker().check_all();
        let diagnostics = f.cache.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Redefinition);
    }

    #[test]
    fn test_type_of_is_idempotent() {
        let f = Fixture::new("void main() { vec2 v = vec3(1.0); }");
        let node = f.expr("vec3(1.0)");
        let first = f.checker().type_of(node);
        let count = f.cache.diagnostics().len();
        assert_eq!(f.checker().type_of(node), first);
        f.checker().check_all();
        f.checker().check_all();
        assert_eq!(f.cache.diagnostics().len(), count + 1);
    }

    #[test]
    fn test_overload_resolution_is_pure() {
        let sig = |ty: Type| {
            Arc::new(FunctionSignature {
                name: "f".into(),
                params: vec![ParamType {
                    ty,
                    direction: ParamDirection::In,
                }],
                return_type: Type::Void,
            })
        };
        let candidates = vec![sig(Type::FLOAT), sig(Type::DOUBLE)];
        assert_eq!(
            resolve_overload(&candidates, &[Type::INT]),
            Overload::Unique(candidates[0].clone())
        );
        assert_eq!(resolve_overload(&candidates, &[Type::BOOL]), Overload::NoMatch);
    }
}
