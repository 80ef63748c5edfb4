//! Scope resolution.
//!
//! [`Resolver::resolve`] walks a [`SyntaxTree`] once, top-down, keeping a stack
//! of lexical scopes, and produces a [`Resolution`]: every declaration in the
//! unit plus a binding for every identifier and named type reference. The tree
//! itself is never modified.

use std::collections::HashMap;

use crate::ast::*;
use crate::builtins::builtins;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Variable,
    Parameter,
    Function,
    Struct,
    Field,
    /// An interface block's type name.
    Block,
}

/// One named entity declared in the translation unit.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    /// Declarator, parameter, function prototype/definition, struct specifier
    /// or interface block.
    pub node: NodeId,
    /// The type specifier, when the declaration has one. For functions this
    /// is the return type.
    pub type_node: Option<NodeId>,
    pub qualifiers: Qualifiers,
    pub name_span: Span,
    pub scope: ScopeId,
    /// Byte offset from which the name can be referenced.
    pub visible_from: usize,
}

impl Declaration {
    pub fn is_const(&self) -> bool {
        self.qualifiers.is_const()
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// The node that opened the scope.
    pub node: NodeId,
    pub span: Span,
    pub declarations: Vec<DeclId>,
}

/// What an identifier or named type refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Declaration(DeclId),
    /// A built-in variable or function.
    Builtin,
    Unresolved,
}

/// Output of [`Resolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    declarations: Vec<Declaration>,
    scopes: Vec<Scope>,
    bindings: HashMap<NodeId, Binding>,
    by_node: HashMap<NodeId, DeclId>,
    functions: HashMap<String, Vec<DeclId>>,
    references: HashMap<DeclId, usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn declaration(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.index()]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Binding of an `Identifier` expression node or a named `TypeSpecifier`.
    pub fn binding(&self, node: NodeId) -> Option<Binding> {
        self.bindings.get(&node).copied()
    }

    /// The declaration a reference node binds to.
    pub fn declaration_of(&self, reference: NodeId) -> Option<&Declaration> {
        match self.binding(reference)? {
            Binding::Declaration(id) => Some(self.declaration(id)),
            _ => None,
        }
    }

    /// The declaration created for `node` (declarator, parameter, function,
    /// struct specifier or block).
    pub fn declaration_for_node(&self, node: NodeId) -> Option<&Declaration> {
        self.by_node.get(&node).map(|&id| self.declaration(id))
    }

    /// User functions (prototypes and definitions) with the given name.
    pub fn functions_named(&self, name: &str) -> Vec<&Declaration> {
        self.functions
            .get(name)
            .map(|ids| ids.iter().map(|&id| self.declaration(id)).collect())
            .unwrap_or_default()
    }

    /// Number of references bound to the declaration.
    pub fn reference_count(&self, id: DeclId) -> usize {
        self.references.get(&id).copied().unwrap_or(0)
    }

    /// The innermost scope containing `offset`.
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        let mut best = ScopeId(0);
        for (i, scope) in self.scopes.iter().enumerate() {
            let current = &self.scopes[best.0 as usize];
            if scope.span.contains(offset) && scope.span.len() <= current.span.len() {
                best = ScopeId(i as u32);
            }
        }
        best
    }

    /// Declarations that can be referenced at `offset`, inner declarations
    /// shadowing outer ones, sorted by source position. Struct fields are not
    /// included.
    pub fn declarations_visible_at(&self, offset: usize) -> Vec<&Declaration> {
        let mut seen = std::collections::HashSet::new();
        let mut visible = Vec::new();
        let mut scope = Some(self.scope_at(offset));
        while let Some(id) = scope {
            let current = self.scope(id);
            for &decl_id in current.declarations.iter().rev() {
                let decl = self.declaration(decl_id);
                if decl.kind == DeclKind::Field || decl.visible_from > offset {
                    continue;
                }
                // Overloads share a name but are all visible.
                if decl.kind == DeclKind::Function || seen.insert(decl.name.clone()) {
                    visible.push(decl);
                }
            }
            scope = current.parent;
        }
        visible.sort_by_key(|d| d.name_span.start);
        visible
    }

    /// Syntax-independent diagnostics: unresolved names and redefinitions.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Warnings for local variables that are never referenced.
    pub fn unused_variable_warnings(&self) -> Vec<Diagnostic> {
        self.declarations
            .iter()
            .filter(|d| d.kind == DeclKind::Variable && d.scope != ScopeId(0))
            .filter(|d| !d.name.starts_with('_') && self.reference_count(d.id) == 0)
            .map(|d| {
                Diagnostic::warning(
                    DiagnosticKind::UnusedVariable,
                    format!("variable '{}' is never used", d.name),
                    d.name_span,
                )
                .at_node(d.node)
            })
            .collect()
    }
}

/// Builds a [`Resolution`] for one tree.
pub struct Resolver<'t> {
    tree: &'t SyntaxTree,
    out: Resolution,
    stack: Vec<ScopeId>,
}

impl<'t> Resolver<'t> {
    pub fn resolve(tree: &'t SyntaxTree) -> Resolution {
        let mut resolver = Resolver {
            tree,
            out: Resolution::default(),
            stack: Vec::new(),
        };
        let root = tree.root();
        resolver.push_scope(root);
        resolver.declare_functions(root);
        resolver.walk_items(root);
        resolver.pop_scope();
        tracing::debug!(
            declarations = resolver.out.declarations.len(),
            scopes = resolver.out.scopes.len(),
            "resolved translation unit"
        );
        resolver.out
    }

    fn kind(&self, id: NodeId) -> &'t NodeKind {
        self.tree.kind(id)
    }

    fn current_scope(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeId(0))
    }

    fn push_scope(&mut self, node: NodeId) {
        let id = ScopeId(self.out.scopes.len() as u32);
        self.out.scopes.push(Scope {
            parent: self.stack.last().copied(),
            node,
            span: self.tree.span(node),
            declarations: Vec::new(),
        });
        self.stack.push(id);
    }

    fn pop_scope(&mut self) {
        self.stack.pop();
    }

    fn error(&mut self, kind: DiagnosticKind, message: String, span: Span, node: NodeId) {
        self.out
            .diagnostics
            .push(Diagnostic::error(kind, message, span).at_node(node));
    }

    fn declare(
        &mut self,
        name: &Ident,
        kind: DeclKind,
        node: NodeId,
        type_node: Option<NodeId>,
        qualifiers: &Qualifiers,
        visible_from: usize,
    ) -> DeclId {
        let scope = self.current_scope();
        let id = DeclId(self.out.declarations.len() as u32);
        if kind != DeclKind::Function && !name.name.is_empty() {
            let clash = self.out.scopes[scope.0 as usize]
                .declarations
                .iter()
                .map(|&d| &self.out.declarations[d.index()])
                .find(|d| d.name == name.name && d.kind != DeclKind::Block);
            if let Some(previous) = clash {
                let message = format!(
                    "redefinition of '{}' (previously declared at line {})",
                    name.name, previous.name_span.line
                );
                self.error(DiagnosticKind::Redefinition, message, name.span, node);
            }
        }
        self.out.declarations.push(Declaration {
            id,
            name: name.name.clone(),
            kind,
            node,
            type_node,
            qualifiers: qualifiers.clone(),
            name_span: name.span,
            scope,
            visible_from,
        });
        self.out.scopes[scope.0 as usize].declarations.push(id);
        self.out.by_node.insert(node, id);
        if kind == DeclKind::Function {
            self.out
                .functions
                .entry(name.name.clone())
                .or_default()
                .push(id);
        }
        id
    }

    /// Functions are visible throughout the unit, so register them first.
    fn declare_functions(&mut self, root: NodeId) {
        let NodeKind::TranslationUnit { items } = self.kind(root) else {
            return;
        };
        for &item in items {
            let prototype = match self.kind(item) {
                NodeKind::FunctionDefinition { prototype, .. } => *prototype,
                NodeKind::FunctionPrototype { .. } => item,
                _ => continue,
            };
            if let NodeKind::FunctionPrototype {
                return_type, name, ..
            } = self.kind(prototype)
            {
                self.declare(
                    name,
                    DeclKind::Function,
                    item,
                    Some(*return_type),
                    &Qualifiers::default(),
                    0,
                );
            }
        }
    }

    fn walk_items(&mut self, root: NodeId) {
        let NodeKind::TranslationUnit { items } = self.kind(root) else {
            return;
        };
        for &item in items {
            match self.kind(item) {
                NodeKind::FunctionDefinition { prototype, body } => {
                    self.walk_function(item, *prototype, *body);
                }
                NodeKind::FunctionPrototype {
                    return_type,
                    params,
                    ..
                } => {
                    self.walk_type(*return_type);
                    self.walk_parameters(*params, false);
                }
                _ => self.walk_statement(item),
            }
        }
    }

    fn walk_function(&mut self, definition: NodeId, prototype: NodeId, body: NodeId) {
        let NodeKind::FunctionPrototype {
            return_type,
            params,
            ..
        } = self.kind(prototype)
        else {
            return;
        };
        self.walk_type(*return_type);
        self.push_scope(definition);
        self.walk_parameters(*params, true);
        // The body shares the parameters' scope.
        match self.kind(body) {
            NodeKind::Block { statements } => {
                for &statement in statements {
                    self.walk_statement(statement);
                }
            }
            _ => self.walk_statement(body),
        }
        self.pop_scope();
    }

    fn walk_parameters(&mut self, list: NodeId, declare: bool) {
        let NodeKind::ParameterList { params } = self.kind(list) else {
            return;
        };
        for &param in params {
            if let NodeKind::Parameter {
                qualifiers,
                ty,
                name,
                array_sizes,
            } = self.kind(param)
            {
                self.walk_type(*ty);
                self.walk_sizes(array_sizes);
                if let (true, Some(name)) = (declare, name) {
                    let visible_from = self.tree.span(param).end;
                    self.declare(
                        name,
                        DeclKind::Parameter,
                        param,
                        Some(*ty),
                        qualifiers,
                        visible_from,
                    );
                }
            }
        }
    }

    fn walk_sizes(&mut self, sizes: &[Option<NodeId>]) {
        for size in sizes.iter().flatten() {
            self.walk_expression(*size);
        }
    }

    fn walk_layout(&mut self, qualifiers: &Qualifiers) {
        for value in qualifiers.layout.iter().filter_map(|l| l.value) {
            self.walk_expression(value);
        }
    }

    /// Resolve a type specifier, declaring any inline struct it contains.
    fn walk_type(&mut self, ty: NodeId) {
        let NodeKind::TypeSpecifier { name, array_sizes } = self.kind(ty) else {
            return;
        };
        match name {
            TypeName::Builtin(_) => {}
            TypeName::Named(ident) => self.bind_type_name(ty, ident),
            TypeName::Struct(spec) => self.walk_struct(*spec),
        }
        self.walk_sizes(array_sizes);
    }

    fn bind_type_name(&mut self, node: NodeId, ident: &Ident) {
        let binding = match self.lookup(&ident.name, ident.span.start) {
            Some(decl) => {
                let d = self.out.declaration(decl);
                if matches!(d.kind, DeclKind::Struct | DeclKind::Block) {
                    *self.out.references.entry(decl).or_default() += 1;
                    Binding::Declaration(decl)
                } else {
                    let message = format!("'{}' does not name a type", ident.name);
                    self.error(DiagnosticKind::TypeError, message, ident.span, node);
                    Binding::Unresolved
                }
            }
            None => {
                let message = format!("unknown type '{}'", ident.name);
                self.error(DiagnosticKind::UnresolvedReference, message, ident.span, node);
                Binding::Unresolved
            }
        };
        self.out.bindings.insert(node, binding);
    }

    fn walk_struct(&mut self, spec: NodeId) {
        let NodeKind::StructSpecifier { name, fields } = self.kind(spec) else {
            return;
        };
        self.push_scope(spec);
        self.walk_fields(fields);
        self.pop_scope();
        if let Some(name) = name {
            let visible_from = self.tree.span(spec).end;
            self.declare(
                name,
                DeclKind::Struct,
                spec,
                None,
                &Qualifiers::default(),
                visible_from,
            );
        }
    }

    /// Member declarations of a struct or block, declared in the current scope.
    fn walk_fields(&mut self, fields: &[NodeId]) {
        for &field in fields {
            let NodeKind::Declaration {
                qualifiers,
                ty,
                declarators,
            } = self.kind(field)
            else {
                continue;
            };
            if let Some(ty) = ty {
                self.walk_type(*ty);
            }
            for &declarator in declarators {
                if let NodeKind::Declarator {
                    name, array_sizes, ..
                } = self.kind(declarator)
                {
                    self.walk_sizes(array_sizes);
                    self.declare(name, DeclKind::Field, declarator, *ty, qualifiers, 0);
                }
            }
        }
    }

    fn walk_interface_block(&mut self, block: NodeId) {
        let NodeKind::InterfaceBlock {
            qualifiers,
            name,
            fields,
            instance,
        } = self.kind(block)
        else {
            return;
        };
        self.walk_layout(qualifiers);
        let visible_from = self.tree.span(block).end;
        self.declare(name, DeclKind::Block, block, None, qualifiers, visible_from);
        match instance {
            Some(instance) => {
                self.push_scope(block);
                self.walk_fields(fields);
                self.pop_scope();
                if let NodeKind::Declarator {
                    name, array_sizes, ..
                } = self.kind(*instance)
                {
                    self.walk_sizes(array_sizes);
                    self.declare(
                        name,
                        DeclKind::Variable,
                        *instance,
                        None,
                        qualifiers,
                        visible_from,
                    );
                }
            }
            // Members of an anonymous block are global names.
            None => {
                for &field in fields {
                    let NodeKind::Declaration { ty, declarators, .. } = self.kind(field) else {
                        continue;
                    };
                    if let Some(ty) = ty {
                        self.walk_type(*ty);
                    }
                    for &declarator in declarators {
                        if let NodeKind::Declarator {
                            name, array_sizes, ..
                        } = self.kind(declarator)
                        {
                            self.walk_sizes(array_sizes);
                            self.declare(
                                name,
                                DeclKind::Variable,
                                declarator,
                                *ty,
                                qualifiers,
                                visible_from,
                            );
                        }
                    }
                }
            }
        }
    }

    fn walk_declaration(&mut self, node: NodeId) {
        let NodeKind::Declaration {
            qualifiers,
            ty,
            declarators,
        } = self.kind(node)
        else {
            return;
        };
        self.walk_layout(qualifiers);
        match ty {
            Some(ty) => self.walk_type(*ty),
            None => {
                // `invariant gl_Position;` re-qualifies an existing name.
                for &declarator in declarators {
                    if let NodeKind::Declarator { name, .. } = self.kind(declarator) {
                        self.bind_reference(declarator, name);
                    }
                }
                return;
            }
        }
        for &declarator in declarators {
            let NodeKind::Declarator {
                name,
                array_sizes,
                initializer,
            } = self.kind(declarator)
            else {
                continue;
            };
            self.walk_sizes(array_sizes);
            if let Some(init) = initializer {
                self.walk_expression(*init);
            }
            let visible_from = self.tree.span(declarator).end;
            self.declare(
                name,
                DeclKind::Variable,
                declarator,
                *ty,
                qualifiers,
                visible_from,
            );
        }
    }

    fn walk_statement(&mut self, node: NodeId) {
        match self.kind(node) {
            NodeKind::Declaration { .. } => self.walk_declaration(node),
            NodeKind::InterfaceBlock { .. } => self.walk_interface_block(node),
            NodeKind::Precision { ty, .. } => self.walk_type(*ty),
            NodeKind::Block { statements } => {
                self.push_scope(node);
                for &statement in statements {
                    self.walk_statement(statement);
                }
                self.pop_scope();
            }
            NodeKind::ExpressionStatement { expr } => {
                if let Some(expr) = expr {
                    self.walk_expression(*expr);
                }
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.walk_expression(*condition);
                self.walk_statement(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.walk_statement(*else_branch);
                }
            }
            NodeKind::For {
                init,
                condition,
                step,
                body,
            } => {
                self.push_scope(node);
                if let Some(init) = init {
                    self.walk_statement(*init);
                }
                if let Some(condition) = condition {
                    self.walk_expression(*condition);
                }
                if let Some(step) = step {
                    self.walk_expression(*step);
                }
                self.walk_statement(*body);
                self.pop_scope();
            }
            NodeKind::While { condition, body } => {
                self.walk_expression(*condition);
                self.walk_statement(*body);
            }
            NodeKind::DoWhile { body, condition } => {
                self.walk_statement(*body);
                self.walk_expression(*condition);
            }
            NodeKind::Switch { selector, body } => {
                self.walk_expression(*selector);
                self.walk_statement(*body);
            }
            NodeKind::CaseLabel { value } | NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.walk_expression(*value);
                }
            }
            NodeKind::FunctionDefinition { prototype, body } => {
                // Only reachable for definitions nested where they do not belong.
                self.walk_function(node, *prototype, *body);
            }
            NodeKind::FunctionPrototype {
                return_type,
                params,
                ..
            } => {
                self.walk_type(*return_type);
                self.walk_parameters(*params, false);
            }
            NodeKind::Break | NodeKind::Continue | NodeKind::Discard | NodeKind::Error { .. } => {}
            _ if self.kind(node).is_expression() => self.walk_expression(node),
            _ => {
                for child in self.tree.children(node) {
                    self.walk_statement(child);
                }
            }
        }
    }

    fn walk_expression(&mut self, node: NodeId) {
        match self.kind(node) {
            NodeKind::Identifier(ident) => self.bind_reference(node, ident),
            NodeKind::Call { callee, args, .. } => {
                match self.kind(*callee) {
                    NodeKind::TypeSpecifier { .. } => self.walk_type(*callee),
                    _ => self.walk_expression(*callee),
                }
                self.walk_expression(*args);
            }
            // Field and method names are resolved against the base's type.
            NodeKind::Field { base, .. } => self.walk_expression(*base),
            NodeKind::MethodCall { object, args, .. } => {
                self.walk_expression(*object);
                self.walk_expression(*args);
            }
            _ => {
                for child in self.tree.children(node) {
                    self.walk_expression(child);
                }
            }
        }
    }

    fn bind_reference(&mut self, node: NodeId, ident: &Ident) {
        let binding = match self.lookup(&ident.name, ident.span.start) {
            Some(decl) => {
                *self.out.references.entry(decl).or_default() += 1;
                Binding::Declaration(decl)
            }
            None => {
                let table = builtins();
                if table.variable(&ident.name).is_some() || table.is_function(&ident.name) {
                    Binding::Builtin
                } else {
                    let message = format!("use of undeclared identifier '{}'", ident.name);
                    self.error(DiagnosticKind::UnresolvedReference, message, ident.span, node);
                    Binding::Unresolved
                }
            }
        };
        self.out.bindings.insert(node, binding);
    }

    /// Innermost visible declaration named `name` at `offset`.
    fn lookup(&self, name: &str, offset: usize) -> Option<DeclId> {
        for &scope in self.stack.iter().rev() {
            let found = self.out.scopes[scope.0 as usize]
                .declarations
                .iter()
                .rev()
                .copied()
                .find(|&id| {
                    let d = &self.out.declarations[id.index()];
                    d.name == name && d.visible_from <= offset && d.kind != DeclKind::Field
                });
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn resolve(src: &str) -> (SyntaxTree, Resolution) {
        let tree = parse(src);
        let resolution = Resolver::resolve(&tree);
        (tree, resolution)
    }

    /// The identifier node whose text is `name`, the `nth` occurrence.
    fn ident(tree: &SyntaxTree, name: &str, nth: usize) -> NodeId {
        tree.ids()
            .filter(|&id| matches!(tree.kind(id), NodeKind::Identifier(i) if i.name == name))
            .nth(nth)
            .unwrap()
    }

    fn type_of_decl(tree: &SyntaxTree, decl: &Declaration) -> String {
        tree.leaf_text(decl.type_node.unwrap())
    }

    #[test]
    fn test_inner_scope_shadows() {
        let (tree, res) = resolve("void main() { int x; { float x; use(x); } }");
        let decl = res.declaration_of(ident(&tree, "x", 0)).unwrap();
        assert_eq!(type_of_decl(&tree, decl), "float");
    }

    #[test]
    fn test_initializer_sees_outer_name() {
        let (tree, res) = resolve("int x = 1;\nvoid main() { int x = x; }");
        let decl = res.declaration_of(ident(&tree, "x", 0)).unwrap();
        assert_eq!(decl.scope, ScopeId(0));
    }

    #[test]
    fn test_later_declarations_are_invisible() {
        let (tree, res) = resolve("void main() { y = 1; int y; }");
        assert_eq!(res.binding(ident(&tree, "y", 0)), Some(Binding::Unresolved));
        assert!(res
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedReference));
    }

    #[test]
    fn test_functions_visible_before_definition() {
        let (tree, res) = resolve("void main() { helper(); }\nvoid helper() {}");
        let decl = res.declaration_of(ident(&tree, "helper", 0)).unwrap();
        assert_eq!(decl.kind, DeclKind::Function);
        assert!(res.diagnostics().is_empty());
    }

    #[test]
    fn test_builtins_bind() {
        let (tree, res) = resolve("void main() { gl_Position = vec4(sin(1.0)); }");
        assert_eq!(res.binding(ident(&tree, "gl_Position", 0)), Some(Binding::Builtin));
        assert_eq!(res.binding(ident(&tree, "sin", 0)), Some(Binding::Builtin));
        assert!(res.diagnostics().is_empty());
    }

    #[test]
    fn test_redefinition() {
        let (_, res) = resolve("void main() { float a; int a; }\nfloat f(float a) { float a; return a; }");
        let redefinitions = res
            .diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Redefinition)
            .count();
        assert_eq!(redefinitions, 2);
    }

    #[test]
    fn test_struct_type_binding() {
        let (tree, res) = resolve("struct Light { vec3 color; };\nuniform Light light;\nvoid main() { Foo f; }");
        let named: Vec<NodeId> = tree
            .ids()
            .filter(|&id| {
                matches!(
                    tree.kind(id),
                    NodeKind::TypeSpecifier {
                        name: TypeName::Named(_),
                        ..
                    }
                )
            })
            .collect();
        assert_eq!(res.declaration_of(named[0]).unwrap().kind, DeclKind::Struct);
        assert_eq!(res.binding(named[1]), Some(Binding::Unresolved));
    }

    #[test]
    fn test_anonymous_block_members_are_global() {
        let (tree, res) = resolve("uniform Params { float scale; };\nvoid main() { float s = scale; }");
        let decl = res.declaration_of(ident(&tree, "scale", 0)).unwrap();
        assert_eq!(decl.kind, DeclKind::Variable);
        assert_eq!(decl.scope, ScopeId(0));
    }

    #[test]
    fn test_visible_at_applies_shadowing_and_order() {
        let src = "float a; float b;\nvoid main(int b) { float c; /*here*/ float d; }";
        let (_, res) = resolve(src);
        let offset = src.find("/*here*/").unwrap();
        let visible: Vec<(&str, DeclKind)> = res
            .declarations_visible_at(offset)
            .iter()
            .map(|d| (d.name.as_str(), d.kind))
            .collect();
        assert_eq!(
            visible,
            [
                ("a", DeclKind::Variable),
                ("main", DeclKind::Function),
                ("b", DeclKind::Parameter),
                ("c", DeclKind::Variable),
            ]
        );
    }

    #[test]
    fn test_unused_locals() {
        let (_, res) = resolve("float g;\nvoid main() { float used = 1.0; float unused; g = used; }");
        let warnings = res.unused_variable_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("unused"));
    }
}
