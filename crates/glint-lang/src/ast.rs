//! GLSL syntax tree.
//!
//! All nodes of one tree live in an arena owned by [`SyntaxTree`] and are
//! addressed by [`NodeId`]. Children are referenced from the parent's
//! [`NodeKind`]; the parent link stored on each [`Node`] is a plain index used
//! for upward queries only.

use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::lexer::{Span, Token, TokenKind};

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage, interpolation, precision and memory qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Const,
    In,
    Out,
    Inout,
    Uniform,
    Buffer,
    Shared,
    Attribute,
    Varying,
    Centroid,
    Sample,
    Patch,
    Flat,
    Smooth,
    Noperspective,
    Layout,
    Invariant,
    Precise,
    Highp,
    Mediump,
    Lowp,
    Coherent,
    Volatile,
    Restrict,
    Readonly,
    Writeonly,
}

impl Qualifier {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "const" => Qualifier::Const,
            "in" => Qualifier::In,
            "out" => Qualifier::Out,
            "inout" => Qualifier::Inout,
            "uniform" => Qualifier::Uniform,
            "buffer" => Qualifier::Buffer,
            "shared" => Qualifier::Shared,
            "attribute" => Qualifier::Attribute,
            "varying" => Qualifier::Varying,
            "centroid" => Qualifier::Centroid,
            "sample" => Qualifier::Sample,
            "patch" => Qualifier::Patch,
            "flat" => Qualifier::Flat,
            "smooth" => Qualifier::Smooth,
            "noperspective" => Qualifier::Noperspective,
            "layout" => Qualifier::Layout,
            "invariant" => Qualifier::Invariant,
            "precise" => Qualifier::Precise,
            "highp" => Qualifier::Highp,
            "mediump" => Qualifier::Mediump,
            "lowp" => Qualifier::Lowp,
            "coherent" => Qualifier::Coherent,
            "volatile" => Qualifier::Volatile,
            "restrict" => Qualifier::Restrict,
            "readonly" => Qualifier::Readonly,
            "writeonly" => Qualifier::Writeonly,
            _ => return None,
        })
    }

    pub fn is_precision(self) -> bool {
        matches!(self, Qualifier::Highp | Qualifier::Mediump | Qualifier::Lowp)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Qualifier::Const => "const",
            Qualifier::In => "in",
            Qualifier::Out => "out",
            Qualifier::Inout => "inout",
            Qualifier::Uniform => "uniform",
            Qualifier::Buffer => "buffer",
            Qualifier::Shared => "shared",
            Qualifier::Attribute => "attribute",
            Qualifier::Varying => "varying",
            Qualifier::Centroid => "centroid",
            Qualifier::Sample => "sample",
            Qualifier::Patch => "patch",
            Qualifier::Flat => "flat",
            Qualifier::Smooth => "smooth",
            Qualifier::Noperspective => "noperspective",
            Qualifier::Layout => "layout",
            Qualifier::Invariant => "invariant",
            Qualifier::Precise => "precise",
            Qualifier::Highp => "highp",
            Qualifier::Mediump => "mediump",
            Qualifier::Lowp => "lowp",
            Qualifier::Coherent => "coherent",
            Qualifier::Volatile => "volatile",
            Qualifier::Restrict => "restrict",
            Qualifier::Readonly => "readonly",
            Qualifier::Writeonly => "writeonly",
        };
        write!(f, "{}", s)
    }
}

/// One `name` or `name = value` entry of a `layout(...)` qualifier.
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    pub name: Ident,
    pub value: Option<NodeId>,
}

/// The qualifiers in front of a declaration or parameter.
#[derive(Debug, Clone, Default)]
pub struct Qualifiers {
    pub list: Vec<Qualifier>,
    pub layout: Vec<LayoutEntry>,
}

impl Qualifiers {
    pub fn has(&self, q: Qualifier) -> bool {
        self.list.contains(&q)
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn is_const(&self) -> bool {
        self.has(Qualifier::Const)
    }

    /// Global variables with these qualifiers cannot be assigned.
    pub fn is_read_only_global(&self) -> bool {
        self.has(Qualifier::Const)
            || self.has(Qualifier::Uniform)
            || self.has(Qualifier::In)
            || self.has(Qualifier::Attribute)
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = self.list.iter().map(|q| q.to_string()).collect();
        write!(f, "{}", words.join(" "))
    }
}

/// A name together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i32),
    Uint(u32),
    Float(f64),
    Double(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreIncrement => "++",
            UnaryOp::PreDecrement => "--",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Eq,
    NotEq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Xor | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEq => "<=",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Xor => "^^",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

/// `=` or a compound assignment; compound forms carry their binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => write!(f, "="),
            AssignOp::Compound(op) => write!(f, "{}=", op),
        }
    }
}

/// What a type specifier names.
#[derive(Debug, Clone)]
pub enum TypeName {
    /// A built-in type keyword (`void`, `vec3`, `sampler2D`, ...).
    Builtin(String),
    /// A user type referenced by name.
    Named(Ident),
    /// An inline `struct { ... }` specifier.
    Struct(NodeId),
}

/// The closed set of syntax node kinds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    TranslationUnit {
        items: Vec<NodeId>,
    },

    // Declarations
    FunctionPrototype {
        return_type: NodeId,
        name: Ident,
        params: NodeId,
    },
    FunctionDefinition {
        prototype: NodeId,
        body: NodeId,
    },
    ParameterList {
        params: Vec<NodeId>,
    },
    Parameter {
        qualifiers: Qualifiers,
        ty: NodeId,
        name: Option<Ident>,
        array_sizes: Vec<Option<NodeId>>,
    },
    /// A variable declaration with zero or more declarators. `ty` is `None`
    /// for qualifier-only declarations such as `layout(...) in;` or
    /// `invariant gl_Position;`.
    Declaration {
        qualifiers: Qualifiers,
        ty: Option<NodeId>,
        declarators: Vec<NodeId>,
    },
    Declarator {
        name: Ident,
        array_sizes: Vec<Option<NodeId>>,
        initializer: Option<NodeId>,
    },
    InterfaceBlock {
        qualifiers: Qualifiers,
        name: Ident,
        fields: Vec<NodeId>,
        instance: Option<NodeId>,
    },
    Precision {
        precision: Qualifier,
        ty: NodeId,
    },
    TypeSpecifier {
        name: TypeName,
        array_sizes: Vec<Option<NodeId>>,
    },
    StructSpecifier {
        name: Option<Ident>,
        fields: Vec<NodeId>,
    },

    // Statements
    Block {
        statements: Vec<NodeId>,
    },
    ExpressionStatement {
        expr: Option<NodeId>,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        condition: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        condition: NodeId,
    },
    Switch {
        selector: NodeId,
        body: NodeId,
    },
    CaseLabel {
        /// `None` for `default:`.
        value: Option<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    Break,
    Continue,
    Discard,

    // Expressions
    Literal(Literal),
    Identifier(Ident),
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Postfix {
        op: PostfixOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Assignment {
        op: AssignOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Conditional {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Sequence {
        exprs: Vec<NodeId>,
    },
    /// A call. `callee` is an `Identifier` node for function calls and a
    /// `TypeSpecifier` node for constructor calls.
    Call {
        callee: NodeId,
        args: NodeId,
        constructor: bool,
    },
    MethodCall {
        object: NodeId,
        method: Ident,
        args: NodeId,
    },
    ArgumentList {
        args: Vec<NodeId>,
    },
    Field {
        base: NodeId,
        field: Ident,
    },
    Index {
        base: NodeId,
        index: NodeId,
    },
    InitializerList {
        elements: Vec<NodeId>,
    },

    /// Input the parser could not make sense of.
    Error {
        message: String,
    },
}

fn push_sizes(out: &mut Vec<NodeId>, sizes: &[Option<NodeId>]) {
    out.extend(sizes.iter().flatten().copied());
}

impl NodeKind {
    /// Child node ids in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            NodeKind::TranslationUnit { items } => out.extend(items),
            NodeKind::FunctionPrototype {
                return_type,
                params,
                ..
            } => {
                out.push(*return_type);
                out.push(*params);
            }
            NodeKind::FunctionDefinition { prototype, body } => {
                out.push(*prototype);
                out.push(*body);
            }
            NodeKind::ParameterList { params } => out.extend(params),
            NodeKind::Parameter {
                qualifiers,
                ty,
                array_sizes,
                ..
            } => {
                out.extend(qualifiers.layout.iter().filter_map(|l| l.value));
                out.push(*ty);
                push_sizes(&mut out, array_sizes);
            }
            NodeKind::Declaration {
                qualifiers,
                ty,
                declarators,
            } => {
                out.extend(qualifiers.layout.iter().filter_map(|l| l.value));
                out.extend(ty);
                out.extend(declarators);
            }
            NodeKind::Declarator {
                array_sizes,
                initializer,
                ..
            } => {
                push_sizes(&mut out, array_sizes);
                out.extend(initializer);
            }
            NodeKind::InterfaceBlock {
                qualifiers,
                fields,
                instance,
                ..
            } => {
                out.extend(qualifiers.layout.iter().filter_map(|l| l.value));
                out.extend(fields);
                out.extend(instance);
            }
            NodeKind::Precision { ty, .. } => out.push(*ty),
            NodeKind::TypeSpecifier { name, array_sizes } => {
                if let TypeName::Struct(s) = name {
                    out.push(*s);
                }
                push_sizes(&mut out, array_sizes);
            }
            NodeKind::StructSpecifier { fields, .. } => out.extend(fields),
            NodeKind::Block { statements } => out.extend(statements),
            NodeKind::ExpressionStatement { expr } => out.extend(expr),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(*condition);
                out.push(*then_branch);
                out.extend(else_branch);
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                out.extend(init);
                out.extend(condition);
                out.extend(step);
                out.push(*body);
            }
            NodeKind::While { condition, body } => {
                out.push(*condition);
                out.push(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                out.push(*body);
                out.push(*condition);
            }
            NodeKind::Switch { selector, body } => {
                out.push(*selector);
                out.push(*body);
            }
            NodeKind::CaseLabel { value } => out.extend(value),
            NodeKind::Return { value } => out.extend(value),
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Discard
            | NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::Error { .. } => {}
            NodeKind::Unary { operand, .. } | NodeKind::Postfix { operand, .. } => {
                out.push(*operand)
            }
            NodeKind::Binary { lhs, rhs, .. } | NodeKind::Assignment { lhs, rhs, .. } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                out.push(*condition);
                out.push(*then_expr);
                out.push(*else_expr);
            }
            NodeKind::Sequence { exprs } => out.extend(exprs),
            NodeKind::Call { callee, args, .. } => {
                out.push(*callee);
                out.push(*args);
            }
            NodeKind::MethodCall { object, args, .. } => {
                out.push(*object);
                out.push(*args);
            }
            NodeKind::ArgumentList { args } => out.extend(args),
            NodeKind::Field { base, .. } => out.push(*base),
            NodeKind::Index { base, index } => {
                out.push(*base);
                out.push(*index);
            }
            NodeKind::InitializerList { elements } => out.extend(elements),
        }
        out
    }

    /// Whether the node denotes a value-producing expression.
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Literal(_)
                | NodeKind::Identifier(_)
                | NodeKind::Unary { .. }
                | NodeKind::Postfix { .. }
                | NodeKind::Binary { .. }
                | NodeKind::Assignment { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::Sequence { .. }
                | NodeKind::Call { .. }
                | NodeKind::MethodCall { .. }
                | NodeKind::Field { .. }
                | NodeKind::Index { .. }
                | NodeKind::InitializerList { .. }
                | NodeKind::Error { .. }
        )
    }

    /// Short human-readable name of the node kind.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::TranslationUnit { .. } => "translation unit",
            NodeKind::FunctionPrototype { .. } => "function prototype",
            NodeKind::FunctionDefinition { .. } => "function definition",
            NodeKind::ParameterList { .. } => "parameter list",
            NodeKind::Parameter { .. } => "parameter",
            NodeKind::Declaration { .. } => "declaration",
            NodeKind::Declarator { .. } => "declarator",
            NodeKind::InterfaceBlock { .. } => "interface block",
            NodeKind::Precision { .. } => "precision statement",
            NodeKind::TypeSpecifier { .. } => "type specifier",
            NodeKind::StructSpecifier { .. } => "struct specifier",
            NodeKind::Block { .. } => "block",
            NodeKind::ExpressionStatement { .. } => "expression statement",
            NodeKind::If { .. } => "if statement",
            NodeKind::For { .. } => "for loop",
            NodeKind::While { .. } => "while loop",
            NodeKind::DoWhile { .. } => "do-while loop",
            NodeKind::Switch { .. } => "switch statement",
            NodeKind::CaseLabel { .. } => "case label",
            NodeKind::Return { .. } => "return statement",
            NodeKind::Break => "break statement",
            NodeKind::Continue => "continue statement",
            NodeKind::Discard => "discard statement",
            NodeKind::Literal(_) => "literal",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Unary { .. } => "unary expression",
            NodeKind::Postfix { .. } => "postfix expression",
            NodeKind::Binary { .. } => "binary expression",
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::Conditional { .. } => "conditional expression",
            NodeKind::Sequence { .. } => "sequence expression",
            NodeKind::Call { constructor: true, .. } => "constructor call",
            NodeKind::Call { .. } => "function call",
            NodeKind::MethodCall { .. } => "method call",
            NodeKind::ArgumentList { .. } => "argument list",
            NodeKind::Field { .. } => "field access",
            NodeKind::Index { .. } => "index expression",
            NodeKind::InitializerList { .. } => "initializer list",
            NodeKind::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

/// A preprocessor directive recorded verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub text: String,
    pub span: Span,
}

/// A parsed GLSL translation unit.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub(crate) source: String,
    pub(crate) tokens: Vec<Token>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl SyntaxTree {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// All node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// The nearest ancestor (or `id` itself) satisfying `pred`.
    pub fn enclosing(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| pred(self.kind(n)))
    }

    /// Source text covered by the node.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.span(id);
        &self.source[span.start..span.end]
    }

    /// Concatenated text of the significant tokens covered by the node.
    pub fn leaf_text(&self, id: NodeId) -> String {
        let span = self.span(id);
        let first = self.tokens.partition_point(|t| t.span.start < span.start);
        self.tokens[first..]
            .iter()
            .take_while(|t| t.span.end <= span.end)
            .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
            .map(|t| t.text.as_str())
            .collect()
    }

    /// The deepest node whose span contains `offset`.
    pub fn node_at(&self, offset: usize) -> NodeId {
        let mut current = self.root;
        'descend: loop {
            for child in self.children(current) {
                let span = self.span(child);
                if !span.is_empty() && span.contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Syntax and lexical diagnostics produced while building the tree.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Preprocessor directives in source order.
    pub fn directives(&self) -> Vec<Directive> {
        self.tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Directive(text) => Some(Directive {
                    text: text.clone(),
                    span: t.span,
                }),
                _ => None,
            })
            .collect()
    }

    /// The number from a `#version` directive, if present.
    pub fn version(&self) -> Option<u32> {
        self.directives().iter().find_map(|d| {
            let mut words = d.text.split_whitespace();
            match (words.next(), words.next()) {
                (Some("version"), Some(number)) => number.parse().ok(),
                _ => None,
            }
        })
    }

    /// For a constructor call, the argument expressions in order.
    pub fn constructor_arguments(&self, id: NodeId) -> Option<Vec<NodeId>> {
        match self.kind(id) {
            NodeKind::Call {
                args,
                constructor: true,
                ..
            } => self.arguments(*args),
            _ => None,
        }
    }

    /// Arguments of an `ArgumentList` node.
    pub fn arguments(&self, list: NodeId) -> Option<Vec<NodeId>> {
        match self.kind(list) {
            NodeKind::ArgumentList { args } => Some(args.clone()),
            _ => None,
        }
    }

    /// Allocate a node and point its children back at it.
    pub(crate) fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    use super::*;

    #[test]
    fn test_parent_links() {
        let tree = parse("void main() { float x = 1.0 + 2.0; }");
        let root = tree.root();
        assert!(tree.parent(root).is_none());
        for id in tree.ids() {
            for child in tree.children(id) {
                assert_eq!(tree.parent(child), Some(id));
            }
        }
    }

    #[test]
    fn test_node_at_finds_innermost() {
        let src = "void main() { float x = 1.0 + 2.0; }";
        let tree = parse(src);
        let offset = src.find("2.0").unwrap() + 1;
        let node = tree.node_at(offset);
        assert!(matches!(tree.kind(node), NodeKind::Literal(Literal::Float(v)) if *v == 2.0));
        let binary = tree
            .enclosing(node, |k| matches!(k, NodeKind::Binary { .. }))
            .unwrap();
        assert_eq!(tree.text(binary), "1.0 + 2.0");
    }

    #[test]
    fn test_version_directive() {
        let tree = parse("#version 330 core\nvoid main() {}");
        assert_eq!(tree.version(), Some(330));
        assert_eq!(tree.directives().len(), 1);
        assert_eq!(parse("void main() {}").version(), None);
    }

    #[test]
    fn test_constructor_arguments() {
        let src = "vec3 c = vec3(1.0, 0.5, 0.25);";
        let tree = parse(src);
        let call = tree
            .ids()
            .find(|&id| matches!(tree.kind(id), NodeKind::Call { .. }))
            .unwrap();
        let args = tree.constructor_arguments(call).unwrap();
        let texts: Vec<&str> = args.iter().map(|&a| tree.text(a)).collect();
        assert_eq!(texts, ["1.0", "0.5", "0.25"]);
    }
}
