//! # glint-lang
//!
//! GLSL language core: lexer, error-tolerant parser, scope resolution, type
//! system with built-in function tables, lazy type checking and constant
//! folding, plus the outline and color features built on top of them.

pub mod analysis;
pub mod ast;
pub mod builtins;
pub mod checker;
pub mod color;
pub mod constant;
pub mod diagnostic;
pub mod lexer;
pub mod outline;
pub mod parser;
pub mod resolver;
pub mod types;

pub use analysis::Analysis;
pub use ast::{NodeId, NodeKind, SyntaxTree};
pub use checker::TypeChecker;
pub use color::{color_edits, color_literals, ColorLiteral, ColorRange, TextEdit};
pub use constant::ConstValue;
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSeverity};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use outline::{outline, OutlineItem};
pub use parser::parse;
pub use resolver::{DeclId, DeclKind, Declaration, Resolution, Resolver};
pub use types::Type;
