//! GLSL parser: tokens to [`SyntaxTree`].
//!
//! The parser never gives up. Anything it cannot make sense of becomes an
//! [`NodeKind::Error`] node plus a `SyntaxError` diagnostic, and parsing
//! resumes at the next statement or declaration boundary.

use std::collections::HashSet;

use crate::ast::*;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::{Lexer, Span, Token, TokenKind};

/// Deepest nesting of expressions, statements, initializers and struct
/// specifiers the parser descends into.
pub const MAX_NESTING: usize = 128;

/// Parse GLSL source text. Always returns a tree whose root spans the whole
/// input; problems are reported through [`SyntaxTree::diagnostics`].
pub fn parse(text: &str) -> SyntaxTree {
    Parser::new(text).parse()
}

/// The GLSL parser.
pub struct Parser {
    /// Significant tokens only; directives and lexer errors are filtered out.
    tokens: Vec<Token>,
    pos: usize,
    prev_span: Span,
    tree: SyntaxTree,
    /// Struct names declared so far, used to tell declarations from
    /// expressions and constructors from calls.
    struct_names: HashSet<String>,
    last_error_at: Option<usize>,
    depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let all = Lexer::new(source).tokenize();
        let mut diagnostics = Vec::new();
        let mut tokens = Vec::new();
        for token in &all {
            match &token.kind {
                TokenKind::Directive(_) => {}
                TokenKind::Error(message) => diagnostics.push(Diagnostic::error(
                    DiagnosticKind::LexError,
                    message.clone(),
                    token.span,
                )),
                _ => tokens.push(token.clone()),
            }
        }
        Self {
            tokens,
            pos: 0,
            prev_span: Span::default(),
            tree: SyntaxTree {
                source: source.to_string(),
                tokens: all,
                nodes: Vec::new(),
                root: NodeId(0),
                diagnostics,
            },
            struct_names: HashSet::new(),
            last_error_at: None,
            depth: 0,
        }
    }

    /// Parse the whole token stream.
    pub fn parse(mut self) -> SyntaxTree {
        let root = self.parse_translation_unit();
        self.tree.root = root;
        self.tree.diagnostics.sort_by_key(|d| d.span.start);
        self.tree
    }

    // ── Token helpers ──────────────────────────────────────────────

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, n: usize) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.prev_span = token.span;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.unexpected(&format!("'{}'", kind));
        false
    }

    fn expect_semicolon(&mut self) {
        if !self.expect(&TokenKind::Semicolon) {
            self.synchronize();
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<Ident> {
        if let TokenKind::Identifier(name) = self.peek() {
            let name = name.clone();
            let span = self.advance().span;
            return Some(Ident { name, span });
        }
        self.unexpected(what);
        None
    }

    /// The span from `start` to the end of the last consumed token.
    fn finish(&self, start: Span) -> Span {
        if self.prev_span.end <= start.start {
            start.empty_start()
        } else {
            start.to(self.prev_span)
        }
    }

    fn node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.tree.alloc(kind, span)
    }

    // ── Errors and recovery ────────────────────────────────────────

    fn error(&mut self, message: impl Into<String>, span: Span) {
        // One report per position; follow-on failures at the same token are noise.
        if self.last_error_at == Some(span.start) {
            return;
        }
        self.last_error_at = Some(span.start);
        self.tree.diagnostics.push(Diagnostic::error(
            DiagnosticKind::SyntaxError,
            message,
            span,
        ));
    }

    fn unexpected(&mut self, expected: &str) {
        let message = format!("expected {}, found {}", expected, describe(self.peek()));
        self.error(message, self.current_span());
    }

    /// An empty error node at the current token, without consuming it.
    fn error_node(&mut self, expected: &str) -> NodeId {
        let message = format!("expected {}, found {}", expected, describe(self.peek()));
        let span = self.current_span();
        self.error(message.clone(), span);
        self.node(NodeKind::Error { message }, span.empty_start())
    }

    /// Consume one token the caller could not use.
    fn skip_unexpected(&mut self) -> NodeId {
        let start = self.current_span();
        let message = format!("unexpected {}", describe(self.peek()));
        self.error(message.clone(), start);
        self.advance();
        self.node(NodeKind::Error { message }, self.finish(start))
    }

    /// Run `parse` one nesting level deeper. Past [`MAX_NESTING`] the rest of
    /// the group is skipped instead.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> NodeId) -> NodeId {
        if self.depth >= MAX_NESTING {
            return self.skip_too_deep();
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    /// Skip up to the close token of the enclosing group, or to a `;` at the
    /// current level.
    fn skip_too_deep(&mut self) -> NodeId {
        let start = self.current_span();
        let message = format!("nesting too deep (more than {} levels)", MAX_NESTING);
        self.error(message.clone(), start);
        let mut open = 0usize;
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Semicolon if open == 0 => break,
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => open += 1,
                TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                    if open == 0 {
                        break;
                    }
                    open -= 1;
                }
                _ => {}
            }
            self.advance();
        }
        self.node(NodeKind::Error { message }, self.finish(start))
    }

    /// Skip to the end of the current statement: past the next `;`, or up to
    /// a token that can start a new statement or declaration.
    fn synchronize(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::Eof
                | TokenKind::LeftBrace
                | TokenKind::RightBrace
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Discard
                | TokenKind::Precision
                | TokenKind::Struct
                | TokenKind::Qualifier(_)
                | TokenKind::TypeName(_) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Declarations ───────────────────────────────────────────────

    fn parse_translation_unit(&mut self) -> NodeId {
        let mut items = Vec::new();
        while !self.at(&TokenKind::Eof) {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            let item = self.parse_external_declaration();
            items.push(item);
            if self.pos == before {
                items.push(self.skip_unexpected());
            }
        }
        let span = Span::new(0, self.tree.source.len(), 1, 1);
        self.node(NodeKind::TranslationUnit { items }, span)
    }

    fn parse_external_declaration(&mut self) -> NodeId {
        match self.peek() {
            TokenKind::Precision => self.parse_precision(),
            TokenKind::TypeName(_) if self.type_followed_by_paren() => {
                let span = self.current_span();
                self.error("expected a declaration, found an expression", span);
                self.parse_expression_statement()
            }
            TokenKind::Qualifier(_)
            | TokenKind::TypeName(_)
            | TokenKind::Struct
            | TokenKind::Identifier(_) => self.parse_declaration(),
            _ => self.skip_to_declaration(),
        }
    }

    /// Skip a run of tokens that cannot start a declaration.
    fn skip_to_declaration(&mut self) -> NodeId {
        let start = self.current_span();
        let message = format!("expected a declaration, found {}", describe(self.peek()));
        self.error(message.clone(), start);
        loop {
            match self.peek() {
                TokenKind::Eof
                | TokenKind::Precision
                | TokenKind::Qualifier(_)
                | TokenKind::TypeName(_)
                | TokenKind::Struct
                | TokenKind::Identifier(_) => break,
                TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.node(NodeKind::Error { message }, self.finish(start))
    }

    fn parse_precision(&mut self) -> NodeId {
        let start = self.current_span();
        self.advance();
        let precision = match self.peek() {
            TokenKind::Qualifier(q) if q.is_precision() => {
                let q = *q;
                self.advance();
                q
            }
            _ => {
                self.unexpected("a precision qualifier");
                Qualifier::Highp
            }
        };
        let ty = self.parse_type_specifier();
        self.expect_semicolon();
        let span = self.finish(start);
        self.node(NodeKind::Precision { precision, ty }, span)
    }

    fn parse_qualifiers(&mut self) -> Qualifiers {
        let mut qualifiers = Qualifiers::default();
        while let TokenKind::Qualifier(q) = self.peek() {
            let q = *q;
            self.advance();
            if q == Qualifier::Layout {
                self.parse_layout(&mut qualifiers.layout);
            }
            qualifiers.list.push(q);
        }
        qualifiers
    }

    fn parse_layout(&mut self, entries: &mut Vec<LayoutEntry>) {
        if !self.expect(&TokenKind::LeftParen) {
            return;
        }
        loop {
            let name = match self.peek() {
                TokenKind::Identifier(name) => name.clone(),
                // `layout(shared)` reuses a keyword.
                TokenKind::Qualifier(q) => q.to_string(),
                _ => {
                    self.unexpected("a layout qualifier");
                    break;
                }
            };
            let span = self.advance().span;
            let value = if self.eat(&TokenKind::Equals) {
                Some(self.parse_conditional())
            } else {
                None
            };
            entries.push(LayoutEntry {
                name: Ident { name, span },
                value,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(&TokenKind::RightParen) {
            while !matches!(
                self.peek(),
                TokenKind::RightParen | TokenKind::Semicolon | TokenKind::LeftBrace | TokenKind::Eof
            ) {
                self.advance();
            }
            self.eat(&TokenKind::RightParen);
        }
    }

    /// A declaration, function prototype or function definition.
    fn parse_declaration(&mut self) -> NodeId {
        let start = self.current_span();
        let qualifiers = self.parse_qualifiers();

        if !qualifiers.is_empty() {
            match (self.peek().clone(), self.peek_at(1).clone()) {
                (TokenKind::Identifier(name), TokenKind::LeftBrace)
                    if !self.struct_names.contains(&name) =>
                {
                    return self.parse_interface_block(start, qualifiers);
                }
                (TokenKind::Semicolon, _) => {
                    self.advance();
                    let span = self.finish(start);
                    return self.node(
                        NodeKind::Declaration {
                            qualifiers,
                            ty: None,
                            declarators: Vec::new(),
                        },
                        span,
                    );
                }
                (TokenKind::Identifier(name), TokenKind::Comma | TokenKind::Semicolon)
                    if !self.struct_names.contains(&name) =>
                {
                    // `invariant gl_Position;`
                    let declarators = self.parse_declarators();
                    self.expect_semicolon();
                    let span = self.finish(start);
                    return self.node(
                        NodeKind::Declaration {
                            qualifiers,
                            ty: None,
                            declarators,
                        },
                        span,
                    );
                }
                _ => {}
            }
        }

        let ty = self.parse_type_specifier();
        let is_function = matches!(self.peek(), TokenKind::Identifier(_))
            && self.peek_at(1) == &TokenKind::LeftParen;
        if is_function {
            return self.parse_function(start, ty);
        }
        let declarators = if self.at(&TokenKind::Semicolon) {
            Vec::new()
        } else {
            self.parse_declarators()
        };
        self.expect_semicolon();
        let span = self.finish(start);
        self.node(
            NodeKind::Declaration {
                qualifiers,
                ty: Some(ty),
                declarators,
            },
            span,
        )
    }

    fn parse_declarators(&mut self) -> Vec<NodeId> {
        let mut declarators = Vec::new();
        loop {
            let start = self.current_span();
            let Some(name) = self.expect_ident("a variable name") else {
                break;
            };
            let array_sizes = self.parse_array_sizes();
            let initializer = if self.eat(&TokenKind::Equals) {
                Some(self.parse_initializer())
            } else {
                None
            };
            let span = self.finish(start);
            declarators.push(self.node(
                NodeKind::Declarator {
                    name,
                    array_sizes,
                    initializer,
                },
                span,
            ));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        declarators
    }

    fn parse_initializer(&mut self) -> NodeId {
        if !self.at(&TokenKind::LeftBrace) {
            return self.parse_assignment();
        }
        let start = self.current_span();
        self.advance();
        let mut elements = Vec::new();
        while !self.at(&TokenKind::RightBrace) {
            elements.push(self.nested(Self::parse_initializer));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightBrace);
        let span = self.finish(start);
        self.node(NodeKind::InitializerList { elements }, span)
    }

    fn parse_array_sizes(&mut self) -> Vec<Option<NodeId>> {
        let mut sizes = Vec::new();
        while self.eat(&TokenKind::LeftBracket) {
            if self.eat(&TokenKind::RightBracket) {
                sizes.push(None);
                continue;
            }
            sizes.push(Some(self.nested(Self::parse_expression)));
            self.expect(&TokenKind::RightBracket);
        }
        sizes
    }

    fn parse_interface_block(&mut self, start: Span, qualifiers: Qualifiers) -> NodeId {
        let token = self.advance();
        let name = Ident {
            name: token.text,
            span: token.span,
        };
        self.advance();
        let fields = self.parse_member_declarations();
        self.expect(&TokenKind::RightBrace);
        let instance = if let TokenKind::Identifier(_) = self.peek() {
            let inst_start = self.current_span();
            let name = self.expect_ident("an instance name");
            name.map(|name| {
                let array_sizes = self.parse_array_sizes();
                let span = self.finish(inst_start);
                self.node(
                    NodeKind::Declarator {
                        name,
                        array_sizes,
                        initializer: None,
                    },
                    span,
                )
            })
        } else {
            None
        };
        self.expect_semicolon();
        let span = self.finish(start);
        self.node(
            NodeKind::InterfaceBlock {
                qualifiers,
                name,
                fields,
                instance,
            },
            span,
        )
    }

    /// Member declarations of a struct or block body, up to the closing `}`.
    fn parse_member_declarations(&mut self) -> Vec<NodeId> {
        let mut fields = Vec::new();
        while !matches!(self.peek(), TokenKind::RightBrace | TokenKind::Eof) {
            let before = self.pos;
            let start = self.current_span();
            let qualifiers = self.parse_qualifiers();
            let ty = self.parse_type_specifier();
            let declarators = self.parse_declarators();
            self.expect_semicolon();
            let span = self.finish(start);
            fields.push(self.node(
                NodeKind::Declaration {
                    qualifiers,
                    ty: Some(ty),
                    declarators,
                },
                span,
            ));
            if self.pos == before {
                fields.push(self.skip_unexpected());
            }
        }
        fields
    }

    fn parse_struct_specifier(&mut self) -> NodeId {
        let start = self.current_span();
        self.advance();
        let name = if let TokenKind::Identifier(_) = self.peek() {
            let ident = self.expect_ident("a struct name");
            if let Some(ident) = &ident {
                self.struct_names.insert(ident.name.clone());
            }
            ident
        } else {
            None
        };
        let fields = if self.expect(&TokenKind::LeftBrace) {
            let fields = self.parse_member_declarations();
            self.expect(&TokenKind::RightBrace);
            fields
        } else {
            Vec::new()
        };
        let span = self.finish(start);
        self.node(NodeKind::StructSpecifier { name, fields }, span)
    }

    fn parse_type_specifier(&mut self) -> NodeId {
        let start = self.current_span();
        let name = match self.peek().clone() {
            TokenKind::TypeName(name) => {
                self.advance();
                TypeName::Builtin(name)
            }
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                TypeName::Named(Ident { name, span })
            }
            TokenKind::Struct => TypeName::Struct(self.nested(Self::parse_struct_specifier)),
            _ => return self.error_node("a type"),
        };
        let array_sizes = self.parse_array_sizes();
        let span = self.finish(start);
        self.node(NodeKind::TypeSpecifier { name, array_sizes }, span)
    }

    fn parse_function(&mut self, start: Span, return_type: NodeId) -> NodeId {
        let token = self.advance();
        let name = Ident {
            name: token.text,
            span: token.span,
        };
        let params = self.parse_parameter_list();
        let proto_span = self.finish(start);
        let prototype = self.node(
            NodeKind::FunctionPrototype {
                return_type,
                name,
                params,
            },
            proto_span,
        );
        if self.at(&TokenKind::LeftBrace) {
            let body = self.parse_block();
            let span = self.finish(start);
            return self.node(NodeKind::FunctionDefinition { prototype, body }, span);
        }
        self.expect_semicolon();
        prototype
    }

    fn parse_parameter_list(&mut self) -> NodeId {
        let start = self.current_span();
        self.expect(&TokenKind::LeftParen);
        let mut params = Vec::new();
        let void_only = matches!(self.peek(), TokenKind::TypeName(t) if t == "void")
            && self.peek_at(1) == &TokenKind::RightParen;
        if void_only {
            self.advance();
        } else if !self.at(&TokenKind::RightParen) {
            loop {
                params.push(self.parse_parameter());
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if !self.expect(&TokenKind::RightParen) {
            while !matches!(
                self.peek(),
                TokenKind::RightParen | TokenKind::LeftBrace | TokenKind::Semicolon | TokenKind::Eof
            ) {
                self.advance();
            }
            self.eat(&TokenKind::RightParen);
        }
        let span = self.finish(start);
        self.node(NodeKind::ParameterList { params }, span)
    }

    fn parse_parameter(&mut self) -> NodeId {
        let start = self.current_span();
        let qualifiers = self.parse_qualifiers();
        let ty = self.parse_type_specifier();
        let name = if let TokenKind::Identifier(_) = self.peek() {
            self.expect_ident("a parameter name")
        } else {
            None
        };
        let array_sizes = self.parse_array_sizes();
        let span = self.finish(start);
        self.node(
            NodeKind::Parameter {
                qualifiers,
                ty,
                name,
                array_sizes,
            },
            span,
        )
    }

    /// Whether the type keyword at the cursor (plus any `[...]` groups) is
    /// followed by `(`, i.e. starts a constructor call.
    fn type_followed_by_paren(&self) -> bool {
        let mut i = 1;
        while self.peek_at(i) == &TokenKind::LeftBracket {
            let mut depth = 0;
            loop {
                match self.peek_at(i) {
                    TokenKind::LeftBracket => depth += 1,
                    TokenKind::RightBracket => depth -= 1,
                    TokenKind::Eof => return false,
                    _ => {}
                }
                i += 1;
                if depth == 0 {
                    break;
                }
            }
        }
        self.peek_at(i) == &TokenKind::LeftParen
    }

    fn at_declaration(&self) -> bool {
        match self.peek() {
            TokenKind::Qualifier(_) | TokenKind::Struct => true,
            TokenKind::TypeName(_) => !self.type_followed_by_paren(),
            TokenKind::Identifier(name) => match self.peek_at(1) {
                TokenKind::Identifier(_) => true,
                TokenKind::LeftBracket => {
                    self.struct_names.contains(name) && !self.type_followed_by_paren()
                }
                _ => false,
            },
            _ => false,
        }
    }

    // ── Statements ─────────────────────────────────────────────────

    fn parse_block(&mut self) -> NodeId {
        let start = self.current_span();
        self.expect(&TokenKind::LeftBrace);
        let mut statements = Vec::new();
        while !matches!(self.peek(), TokenKind::RightBrace | TokenKind::Eof) {
            let before = self.pos;
            let statement = self.parse_statement();
            statements.push(statement);
            if self.pos == before {
                statements.push(self.skip_unexpected());
            }
        }
        self.expect(&TokenKind::RightBrace);
        let span = self.finish(start);
        self.node(NodeKind::Block { statements }, span)
    }

    fn parse_statement(&mut self) -> NodeId {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> NodeId {
        let start = self.current_span();
        match self.peek() {
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::Semicolon => {
                self.advance();
                self.node(NodeKind::ExpressionStatement { expr: None }, start)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => {
                self.advance();
                let condition = self.parse_condition();
                let body = self.parse_statement();
                let span = self.finish(start);
                self.node(NodeKind::While { condition, body }, span)
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_statement();
                self.expect(&TokenKind::While);
                let condition = self.parse_condition();
                self.expect_semicolon();
                let span = self.finish(start);
                self.node(NodeKind::DoWhile { body, condition }, span)
            }
            TokenKind::Switch => {
                self.advance();
                let selector = self.parse_condition();
                let body = self.parse_block();
                let span = self.finish(start);
                self.node(NodeKind::Switch { selector, body }, span)
            }
            TokenKind::Case => {
                self.advance();
                let value = self.parse_expression();
                self.expect(&TokenKind::Colon);
                let span = self.finish(start);
                self.node(NodeKind::CaseLabel { value: Some(value) }, span)
            }
            TokenKind::Default => {
                self.advance();
                self.expect(&TokenKind::Colon);
                let span = self.finish(start);
                self.node(NodeKind::CaseLabel { value: None }, span)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression())
                };
                self.expect_semicolon();
                let span = self.finish(start);
                self.node(NodeKind::Return { value }, span)
            }
            TokenKind::Break => self.parse_jump(NodeKind::Break),
            TokenKind::Continue => self.parse_jump(NodeKind::Continue),
            TokenKind::Discard => self.parse_jump(NodeKind::Discard),
            TokenKind::Precision => self.parse_precision(),
            _ if self.at_declaration() => self.parse_declaration(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_jump(&mut self, kind: NodeKind) -> NodeId {
        let start = self.current_span();
        self.advance();
        self.expect_semicolon();
        let span = self.finish(start);
        self.node(kind, span)
    }

    /// A parenthesized condition: `( expr )`.
    fn parse_condition(&mut self) -> NodeId {
        self.expect(&TokenKind::LeftParen);
        let condition = self.parse_expression();
        self.expect(&TokenKind::RightParen);
        condition
    }

    fn parse_if(&mut self) -> NodeId {
        let start = self.current_span();
        self.advance();
        let condition = self.parse_condition();
        let then_branch = self.parse_statement();
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(self.parse_statement())
        } else {
            None
        };
        let span = self.finish(start);
        self.node(
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    fn parse_for(&mut self) -> NodeId {
        let start = self.current_span();
        self.advance();
        self.expect(&TokenKind::LeftParen);
        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else if self.at_declaration() {
            Some(self.parse_declaration())
        } else {
            Some(self.parse_expression_statement())
        };
        let condition = if self.at(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::Semicolon);
        let step = if self.at(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::RightParen);
        let body = self.parse_statement();
        let span = self.finish(start);
        self.node(
            NodeKind::For {
                init,
                condition,
                step,
                body,
            },
            span,
        )
    }

    fn parse_expression_statement(&mut self) -> NodeId {
        let start = self.current_span();
        let expr = self.parse_expression();
        self.expect_semicolon();
        let span = self.finish(start);
        self.node(NodeKind::ExpressionStatement { expr: Some(expr) }, span)
    }

    // ── Expressions ────────────────────────────────────────────────

    /// Comma-separated sequence of assignment expressions.
    fn parse_expression(&mut self) -> NodeId {
        let start = self.current_span();
        let first = self.parse_assignment();
        if !self.at(&TokenKind::Comma) {
            return first;
        }
        let mut exprs = vec![first];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_assignment());
        }
        let span = self.finish(start);
        self.node(NodeKind::Sequence { exprs }, span)
    }

    fn parse_assignment(&mut self) -> NodeId {
        let start = self.current_span();
        let lhs = self.parse_conditional();
        let Some(op) = assign_op(self.peek()) else {
            return lhs;
        };
        self.advance();
        let rhs = self.nested(Self::parse_assignment);
        let span = self.finish(start);
        self.node(NodeKind::Assignment { op, lhs, rhs }, span)
    }

    fn parse_conditional(&mut self) -> NodeId {
        let start = self.current_span();
        let condition = self.parse_binary(0);
        if !self.eat(&TokenKind::Question) {
            return condition;
        }
        let then_expr = self.nested(Self::parse_expression);
        self.expect(&TokenKind::Colon);
        let else_expr = self.nested(Self::parse_assignment);
        let span = self.finish(start);
        self.node(
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            },
            span,
        )
    }

    /// Precedence climbing over the binary operators.
    fn parse_binary(&mut self, min_precedence: u8) -> NodeId {
        let start = self.current_span();
        let mut lhs = self.parse_unary();
        while let Some((op, precedence)) = binary_op(self.peek()) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(precedence + 1);
            let span = self.finish(start);
            lhs = self.node(NodeKind::Binary { op, lhs, rhs }, span);
        }
        lhs
    }

    fn parse_unary(&mut self) -> NodeId {
        let start = self.current_span();
        let op = match self.peek() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::PlusPlus => UnaryOp::PreIncrement,
            TokenKind::MinusMinus => UnaryOp::PreDecrement,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary);
        let span = self.finish(start);
        self.node(NodeKind::Unary { op, operand }, span)
    }

    fn parse_postfix(&mut self) -> NodeId {
        let start = self.current_span();
        let mut expr = self.parse_primary();
        loop {
            match self.peek() {
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.nested(Self::parse_expression);
                    self.expect(&TokenKind::RightBracket);
                    let span = self.finish(start);
                    expr = self.node(NodeKind::Index { base: expr, index }, span);
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = match self.expect_ident("a field name") {
                        Some(ident) => ident,
                        // Keep `v.` around so completion can see the base.
                        None => Ident {
                            name: String::new(),
                            span: self.current_span().empty_start(),
                        },
                    };
                    if self.at(&TokenKind::LeftParen) && !field.name.is_empty() {
                        let args = self.parse_arguments();
                        let span = self.finish(start);
                        expr = self.node(
                            NodeKind::MethodCall {
                                object: expr,
                                method: field,
                                args,
                            },
                            span,
                        );
                    } else {
                        let span = self.finish(start);
                        expr = self.node(NodeKind::Field { base: expr, field }, span);
                    }
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.at(&TokenKind::PlusPlus) {
                        PostfixOp::Increment
                    } else {
                        PostfixOp::Decrement
                    };
                    self.advance();
                    let span = self.finish(start);
                    expr = self.node(NodeKind::Postfix { op, operand: expr }, span);
                }
                _ => return expr,
            }
        }
    }

    fn parse_primary(&mut self) -> NodeId {
        let start = self.current_span();
        let literal = match self.peek() {
            TokenKind::IntLiteral(v) => Some(Literal::Int(*v as i32)),
            TokenKind::UintLiteral(v) => Some(Literal::Uint(*v)),
            TokenKind::FloatLiteral(v) => Some(Literal::Float(*v)),
            TokenKind::DoubleLiteral(v) => Some(Literal::Double(*v)),
            TokenKind::BoolLiteral(v) => Some(Literal::Bool(*v)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return self.node(NodeKind::Literal(literal), start);
        }

        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                let is_constructor = self.struct_names.contains(&name);
                if self.peek_at(1) == &TokenKind::LeftParen && is_constructor {
                    return self.parse_constructor();
                }
                self.advance();
                let callee = self.node(NodeKind::Identifier(Ident { name, span: start }), start);
                if !self.at(&TokenKind::LeftParen) {
                    return callee;
                }
                let args = self.parse_arguments();
                let span = self.finish(start);
                self.node(
                    NodeKind::Call {
                        callee,
                        args,
                        constructor: false,
                    },
                    span,
                )
            }
            TokenKind::TypeName(_) if self.type_followed_by_paren() => self.parse_constructor(),
            TokenKind::TypeName(name) => {
                self.advance();
                let message = format!("expected '(' after type name '{}'", name);
                self.error(message.clone(), start);
                self.node(NodeKind::Error { message }, start)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.nested(Self::parse_expression);
                self.expect(&TokenKind::RightParen);
                inner
            }
            _ => self.error_node("an expression"),
        }
    }

    /// `Type(args)` or `Type[n](args)`.
    fn parse_constructor(&mut self) -> NodeId {
        let start = self.current_span();
        let callee = self.parse_type_specifier();
        let args = self.parse_arguments();
        let span = self.finish(start);
        self.node(
            NodeKind::Call {
                callee,
                args,
                constructor: true,
            },
            span,
        )
    }

    fn parse_arguments(&mut self) -> NodeId {
        let start = self.current_span();
        self.expect(&TokenKind::LeftParen);
        let mut args = Vec::new();
        let void_only = matches!(self.peek(), TokenKind::TypeName(t) if t == "void")
            && self.peek_at(1) == &TokenKind::RightParen;
        if void_only {
            self.advance();
        } else if !self.at(&TokenKind::RightParen) {
            loop {
                args.push(self.nested(Self::parse_assignment));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen);
        let span = self.finish(start);
        self.node(NodeKind::ArgumentList { args }, span)
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Eof => "end of input".to_string(),
        other => format!("'{}'", other),
    }
}

fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    Some(match kind {
        TokenKind::PipePipe => (BinaryOp::Or, 1),
        TokenKind::CaretCaret => (BinaryOp::Xor, 2),
        TokenKind::AmpAmp => (BinaryOp::And, 3),
        TokenKind::Pipe => (BinaryOp::BitOr, 4),
        TokenKind::Caret => (BinaryOp::BitXor, 5),
        TokenKind::Amp => (BinaryOp::BitAnd, 6),
        TokenKind::EqEq => (BinaryOp::Eq, 7),
        TokenKind::NotEq => (BinaryOp::NotEq, 7),
        TokenKind::Less => (BinaryOp::Less, 8),
        TokenKind::Greater => (BinaryOp::Greater, 8),
        TokenKind::LessEq => (BinaryOp::LessEq, 8),
        TokenKind::GreaterEq => (BinaryOp::GreaterEq, 8),
        TokenKind::Shl => (BinaryOp::Shl, 9),
        TokenKind::Shr => (BinaryOp::Shr, 9),
        TokenKind::Plus => (BinaryOp::Add, 10),
        TokenKind::Minus => (BinaryOp::Sub, 10),
        TokenKind::Star => (BinaryOp::Mul, 11),
        TokenKind::Slash => (BinaryOp::Div, 11),
        TokenKind::Percent => (BinaryOp::Mod, 11),
        _ => return None,
    })
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Equals => return Some(AssignOp::Assign),
        TokenKind::PlusEquals => BinaryOp::Add,
        TokenKind::MinusEquals => BinaryOp::Sub,
        TokenKind::StarEquals => BinaryOp::Mul,
        TokenKind::SlashEquals => BinaryOp::Div,
        TokenKind::PercentEquals => BinaryOp::Mod,
        TokenKind::ShlEquals => BinaryOp::Shl,
        TokenKind::ShrEquals => BinaryOp::Shr,
        TokenKind::AmpEquals => BinaryOp::BitAnd,
        TokenKind::CaretEquals => BinaryOp::BitXor,
        TokenKind::PipeEquals => BinaryOp::BitOr,
        _ => return None,
    };
    Some(AssignOp::Compound(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(tree: &SyntaxTree, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        tree.ids().filter(|&id| pred(tree.kind(id))).collect()
    }

    fn items(tree: &SyntaxTree) -> Vec<NodeId> {
        match tree.kind(tree.root()) {
            NodeKind::TranslationUnit { items } => items.clone(),
            other => panic!("root is {}", other.name()),
        }
    }

    fn syntax_errors(tree: &SyntaxTree) -> usize {
        tree.diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::SyntaxError)
            .count()
    }

    #[test]
    fn test_parse_function_definition() {
        let tree = parse("void main() { gl_FragColor = vec4(1.0); }");
        assert!(tree.diagnostics().is_empty());
        let items = items(&tree);
        assert_eq!(items.len(), 1);
        let NodeKind::FunctionDefinition { prototype, .. } = tree.kind(items[0]) else {
            panic!("expected a function definition");
        };
        let NodeKind::FunctionPrototype { name, .. } = tree.kind(*prototype) else {
            panic!("expected a prototype");
        };
        assert_eq!(name.name, "main");
    }

    #[test]
    fn test_parse_prototype_and_params() {
        let tree = parse("float f(in vec3 a, out float b[2]);\nvoid g(void);");
        assert!(tree.diagnostics().is_empty());
        let params = find(&tree, |k| matches!(k, NodeKind::Parameter { .. }));
        assert_eq!(params.len(), 2);
        let NodeKind::Parameter {
            qualifiers,
            array_sizes,
            ..
        } = tree.kind(params[1])
        else {
            unreachable!()
        };
        assert!(qualifiers.has(Qualifier::Out));
        assert_eq!(array_sizes.len(), 1);
    }

    #[test]
    fn test_parse_precedence() {
        let src = "void main() { x = a + b * c; }";
        let tree = parse(src);
        let adds = find(&tree, |k| matches!(k, NodeKind::Binary { op: BinaryOp::Add, .. }));
        assert_eq!(adds.len(), 1);
        let NodeKind::Binary { rhs, .. } = tree.kind(adds[0]) else {
            unreachable!()
        };
        assert!(matches!(tree.kind(*rhs), NodeKind::Binary { op: BinaryOp::Mul, .. }));
        assert_eq!(tree.text(adds[0]), "a + b * c");
    }

    #[test]
    fn test_parse_assignment_is_right_associative() {
        let tree = parse("void main() { a = b += 1; }");
        let assignments = find(&tree, |k| matches!(k, NodeKind::Assignment { .. }));
        assert_eq!(assignments.len(), 2);
        let outer = assignments
            .iter()
            .copied()
            .find(|&a| matches!(tree.kind(a), NodeKind::Assignment { op: AssignOp::Assign, .. }))
            .unwrap();
        let NodeKind::Assignment { rhs, .. } = tree.kind(outer) else {
            unreachable!()
        };
        assert!(matches!(
            tree.kind(*rhs),
            NodeKind::Assignment {
                op: AssignOp::Compound(BinaryOp::Add),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_constructor_vs_call() {
        let tree = parse(
            "struct Light { vec3 pos; };\n\
             void main() { vec3 a = vec3(1.0); float b = foo(a); Light l = Light(a); float c[2] = float[2](1.0, 2.0); }",
        );
        let calls = find(&tree, |k| matches!(k, NodeKind::Call { .. }));
        let flags: Vec<bool> = calls
            .iter()
            .map(|&c| matches!(tree.kind(c), NodeKind::Call { constructor: true, .. }))
            .collect();
        assert_eq!(flags, [true, false, true, true]);
    }

    #[test]
    fn test_parse_declaration_vs_expression() {
        let tree = parse("struct S { float v; };\nvoid main() { S s; a[0] = 1; S arr[2]; }");
        assert!(tree.diagnostics().is_empty());
        // The struct member `v` is a declarator too.
        let decls = find(&tree, |k| matches!(k, NodeKind::Declarator { .. }));
        assert_eq!(decls.len(), 3);
        let stmts = find(&tree, |k| matches!(k, NodeKind::ExpressionStatement { .. }));
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_parse_swizzle_and_method() {
        let tree = parse("void main() { float n = v.xyz.length(); }");
        assert!(tree.diagnostics().is_empty());
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::Field { .. })).len(), 1);
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::MethodCall { .. })).len(), 1);
    }

    #[test]
    fn test_parse_interface_block_and_layout() {
        let tree = parse(
            "layout(std140, binding = 0) uniform Camera { mat4 view; mat4 proj; } camera;\n\
             layout(local_size_x = 8) in;",
        );
        assert!(tree.diagnostics().is_empty());
        let items = items(&tree);
        let NodeKind::InterfaceBlock {
            qualifiers,
            name,
            fields,
            instance,
        } = tree.kind(items[0])
        else {
            panic!("expected an interface block");
        };
        assert_eq!(name.name, "Camera");
        assert_eq!(fields.len(), 2);
        assert!(instance.is_some());
        assert_eq!(qualifiers.layout.len(), 2);
        assert_eq!(qualifiers.layout[1].name.name, "binding");
        assert!(matches!(
            tree.kind(items[1]),
            NodeKind::Declaration { ty: None, .. }
        ));
    }

    #[test]
    fn test_parse_control_flow() {
        let src = "void main() {\n\
                   for (int i = 0; i < 4; ++i) { if (i == 2) continue; else break; }\n\
                   while (true) { discard; }\n\
                   do { x--; } while (x > 0);\n\
                   switch (x) { case 1: return; default: break; }\n\
                   }";
        let tree = parse(src);
        assert!(tree.diagnostics().is_empty(), "{:?}", tree.diagnostics());
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::For { .. })).len(), 1);
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::DoWhile { .. })).len(), 1);
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::CaseLabel { .. })).len(), 2);
    }

    #[test]
    fn test_parse_recovers_from_missing_semicolon() {
        let tree = parse("void main() { float a = 1.0 float b = 2.0; }");
        assert_eq!(syntax_errors(&tree), 1);
        let names: Vec<String> = find(&tree, |k| matches!(k, NodeKind::Declarator { .. }))
            .into_iter()
            .map(|d| match tree.kind(d) {
                NodeKind::Declarator { name, .. } => name.name.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_parse_unterminated_constructor() {
        let src = "vec3(1.0,";
        let tree = parse(src);
        assert_eq!(tree.span(tree.root()).end, src.len());
        assert!(syntax_errors(&tree) >= 1);
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::Call { .. })).len(), 1);
        assert!(!find(&tree, |k| matches!(k, NodeKind::Error { .. })).is_empty());
    }

    #[test]
    fn test_parse_lex_errors_are_reported() {
        let tree = parse("float x = 1.0 § 2.0;");
        assert!(tree
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::LexError));
    }

    #[test]
    fn test_parse_limits_nesting() {
        let src = format!("float x = {}1.0{};", "(".repeat(600), ")".repeat(600));
        let tree = parse(&src);
        assert_eq!(syntax_errors(&tree), 1);
        assert!(tree.diagnostics()[0].message.starts_with("nesting too deep"));
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::Declarator { .. })).len(), 1);

        // Parsing resumes after the skipped group.
        let src = format!(
            "void main() {{ {}; float y = 1.0; }}",
            "-".repeat(MAX_NESTING * 4)
        );
        let tree = parse(&src);
        assert_eq!(syntax_errors(&tree), 1);
        assert_eq!(find(&tree, |k| matches!(k, NodeKind::Declarator { .. })).len(), 1);

        let shallow = format!("float x = {}1.0{};", "(".repeat(64), ")".repeat(64));
        assert!(parse(&shallow).diagnostics().is_empty());
    }

    #[test]
    fn test_parse_never_fails() {
        for src in [
            "",
            "}}}",
            "void main( {",
            "float x = ;",
            "struct {",
            "int a[ = 3;",
            "uniform",
            "void main() { if (",
            "layout(",
            "1 + 2",
        ] {
            let tree = parse(src);
            assert_eq!(tree.span(tree.root()), Span::new(0, src.len(), 1, 1));
            for id in tree.ids() {
                let span = tree.span(id);
                assert!(span.start <= span.end && span.end <= src.len(), "{src:?}");
            }
        }
    }
}
