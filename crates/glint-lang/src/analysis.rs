//! The query surface over one analysed GLSL source.
//!
//! [`Analysis::new`] lexes, parses and resolves eagerly; types, constants and
//! type diagnostics are computed on demand and memoised. An `Analysis` can be
//! moved to another thread but not shared between threads.

use std::sync::Arc;
use std::time::Instant;

use glint_core::AnalysisConfig;
use tracing::debug;

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::checker::{TypeCache, TypeChecker};
use crate::constant::ConstValue;
use crate::diagnostic::Diagnostic;
use crate::parser::parse;
use crate::resolver::{DeclId, DeclKind, Declaration, Resolution, Resolver};
use crate::types::{FunctionSignature, Type};

pub struct Analysis {
    tree: SyntaxTree,
    resolution: Resolution,
    cache: TypeCache,
    config: AnalysisConfig,
}

impl Analysis {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_config(text, AnalysisConfig::default())
    }

    pub fn with_config(text: impl Into<String>, config: AnalysisConfig) -> Self {
        let text = text.into();
        let started = Instant::now();
        let tree = parse(&text);
        let parsed = started.elapsed();
        let resolution = Resolver::resolve(&tree);
        debug!(
            bytes = text.len(),
            nodes = tree.len(),
            parse_us = parsed.as_micros() as u64,
            resolve_us = (started.elapsed() - parsed).as_micros() as u64,
            "analysed source"
        );
        Self {
            tree,
            resolution,
            cache: TypeCache::default(),
            config,
        }
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn source(&self) -> &str {
        self.tree.source()
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// The `#version` of the shader, or the configured default.
    pub fn version(&self) -> u32 {
        self.tree.version().unwrap_or(self.config.default_version)
    }

    pub fn checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(&self.tree, &self.resolution, &self.cache)
    }

    /// Type every expression and run all statement checks now.
    pub fn check_all(&self) {
        self.checker().check_all();
    }

    pub fn node_at(&self, offset: usize) -> NodeId {
        self.tree.node_at(offset)
    }

    pub fn type_of(&self, node: NodeId) -> Type {
        self.checker().type_of(node)
    }

    pub fn constant_value_of(&self, node: NodeId) -> Option<ConstValue> {
        self.checker().constant_value_of(node)
    }

    pub fn declaration_of(&self, reference: NodeId) -> Option<&Declaration> {
        self.resolution.declaration_of(reference)
    }

    pub fn declarations_visible_at(&self, offset: usize) -> Vec<&Declaration> {
        self.resolution.declarations_visible_at(offset)
    }

    pub fn declaration_type(&self, decl: DeclId) -> Type {
        self.checker().declaration_type(decl)
    }

    pub fn is_constructor_call(&self, node: NodeId) -> bool {
        matches!(
            self.tree.kind(node),
            NodeKind::Call {
                constructor: true,
                ..
            }
        )
    }

    pub fn constructor_arguments(&self, node: NodeId) -> Option<Vec<NodeId>> {
        self.tree.constructor_arguments(node)
    }

    /// The overload a function call resolved to.
    pub fn resolved_function(&self, call: NodeId) -> Option<Arc<FunctionSignature>> {
        self.checker().resolved_function(call)
    }

    /// One-line description of a declaration, e.g. `uniform vec3 tint` or
    /// `vec4 shade(vec3, float)`.
    pub fn declaration_signature(&self, decl: &Declaration) -> String {
        let ty = self.declaration_type(decl.id);
        match decl.kind {
            DeclKind::Function => ty.to_string(),
            DeclKind::Struct => format!("struct {}", decl.name),
            DeclKind::Block => {
                if decl.qualifiers.is_empty() {
                    format!("block {}", decl.name)
                } else {
                    format!("{} {}", decl.qualifiers, decl.name)
                }
            }
            DeclKind::Variable | DeclKind::Parameter | DeclKind::Field => {
                if decl.qualifiers.is_empty() {
                    format!("{} {}", ty, decl.name)
                } else {
                    format!("{} {} {}", decl.qualifiers, ty, decl.name)
                }
            }
        }
    }

    /// All diagnostics (lexical, syntax, resolution, type and, when enabled,
    /// warnings) sorted by position and capped at the configured maximum.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.check_all();
        let mut all: Vec<Diagnostic> = self.tree.diagnostics().to_vec();
        all.extend_from_slice(self.resolution.diagnostics());
        all.extend(self.cache.diagnostics());
        if self.config.warnings {
            all.extend(self.resolution.unused_variable_warnings());
        }
        all.sort_by_key(|d| (d.span.start, d.span.end));
        if all.len() > self.config.max_diagnostics {
            debug!(
                total = all.len(),
                max = self.config.max_diagnostics,
                "truncating diagnostics"
            );
            all.truncate(self.config.max_diagnostics);
        }
        all
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().iter().any(Diagnostic::is_error)
    }
}
