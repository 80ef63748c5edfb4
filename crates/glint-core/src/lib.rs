//! # glint-core
//!
//! Shared primitives for the glint GLSL tooling: error types, the
//! `glint.toml` configuration and the color type used by editor features.

pub mod color;
pub mod config;
pub mod error;

pub use config::*;

pub use color::{Color, ColorError};
pub use error::{GlintError, GlintResult};
