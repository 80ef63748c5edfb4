mod report;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glint_core::error::read_source;
use glint_core::{GlintConfig, GlintError};
use glint_lang::builtins::builtins;
use glint_lang::{color_literals, outline, Analysis, Diagnostic, Span};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "glint",
    version,
    about = "Glint: GLSL diagnostics, outlines and color literals",
    long_about = "Glint analyses GLSL shaders: syntax, name resolution and type checking.\nReads glint.toml from the working directory when present."
)]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check shader files and report diagnostics
    Check {
        /// Shader files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the declarations of a shader as a tree
    Outline {
        #[arg()]
        file: PathBuf,
    },

    /// List the constructor calls that read as colors
    Colors {
        #[arg()]
        file: PathBuf,
    },

    /// Describe the syntax node at a byte offset
    Inspect {
        #[arg()]
        file: PathBuf,

        /// Byte offset into the file
        #[arg(long)]
        offset: usize,
    },

    /// List built-in functions and variables, or show one by name
    Builtins {
        #[arg()]
        name: Option<String>,
    },

    /// Start the language server on stdio
    Lsp,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr);

    if matches!(cli.command, Commands::Lsp) {
        // stdout carries the JSON-RPC stream.
        subscriber.with_ansi(false).init();
    } else {
        subscriber.init();
    }

    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let config = GlintConfig::discover(&cwd).context("failed to load glint.toml")?;
    let json = cli.json;

    match cli.command {
        Commands::Check { files } => cmd_check(&files, &config, json),
        Commands::Outline { file } => cmd_outline(&file, &config, json),
        Commands::Colors { file } => cmd_colors(&file, &config, json),
        Commands::Inspect { file, offset } => cmd_inspect(&file, offset, &config, json),
        Commands::Builtins { name } => cmd_builtins(name.as_deref(), json),
        Commands::Lsp => run_async(async move {
            glint_lsp::start_lsp(config).await;
            Ok(())
        }),
    }
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    runtime.block_on(future)
}

fn load(file: &Path, config: &GlintConfig) -> Result<Analysis> {
    let source = read_source(file)?;
    Ok(Analysis::with_config(source, config.analysis.clone()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).map_err(GlintError::from)?);
    Ok(())
}

#[derive(Serialize)]
struct FileReport {
    file: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

fn check_file(file: &Path, config: &GlintConfig) -> Result<FileReport> {
    let started = Instant::now();
    let analysis = load(file, config)?;
    let diagnostics = analysis.diagnostics();
    debug!(
        file = %file.display(),
        diagnostics = diagnostics.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "checked file"
    );
    Ok(FileReport {
        file: file.to_path_buf(),
        diagnostics,
    })
}

/// Check `files` on scoped worker threads. Each analysis stays on the
/// thread that built it; results come back in input order.
fn check_files(files: &[PathBuf], config: &GlintConfig) -> Vec<Result<FileReport>> {
    let workers = std::thread::available_parallelism()
        .map_or(1, |n| n.get())
        .min(files.len())
        .max(1);
    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<Result<FileReport>>>> =
        Mutex::new(files.iter().map(|_| None).collect());

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let Some(file) = files.get(i) else {
                    break;
                };
                let report = check_file(file, config);
                if let Ok(mut slots) = slots.lock() {
                    slots[i] = Some(report);
                }
            });
        }
    });
    debug!(files = files.len(), workers, "check finished");

    slots
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .into_iter()
        .flatten()
        .collect()
}

fn cmd_check(files: &[PathBuf], config: &GlintConfig, json: bool) -> Result<()> {
    let mut reports = Vec::new();
    let mut unreadable = 0;
    for result in check_files(files, config) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("error: {:#}", e);
                unreadable += 1;
            }
        }
    }

    let errors = reports
        .iter()
        .flat_map(|r| &r.diagnostics)
        .filter(|d| d.is_error())
        .count();
    let warnings = reports
        .iter()
        .flat_map(|r| &r.diagnostics)
        .filter(|d| !d.is_error())
        .count();

    if json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            for diagnostic in &report.diagnostics {
                println!("{}", report::diagnostic_line(&report.file, diagnostic));
            }
        }
        println!(
            "checked {} files: {} errors, {} warnings",
            reports.len(),
            errors,
            warnings
        );
    }

    if errors > 0 || unreadable > 0 {
        anyhow::bail!(
            "check failed: {} errors, {} unreadable files",
            errors,
            unreadable
        );
    }
    Ok(())
}

fn cmd_outline(file: &Path, config: &GlintConfig, json: bool) -> Result<()> {
    let analysis = load(file, config)?;
    let items = outline(&analysis);
    if json {
        print_json(&items)
    } else {
        print!("{}", report::outline_tree(&items));
        Ok(())
    }
}

fn cmd_colors(file: &Path, config: &GlintConfig, json: bool) -> Result<()> {
    if !config.colors.enabled {
        info!("color literals are disabled in glint.toml");
        return Ok(());
    }
    let analysis = load(file, config)?;
    let literals = color_literals(&analysis);
    if json {
        return print_json(&literals);
    }
    for literal in &literals {
        println!("{}", report::color_line(analysis.source(), literal));
    }
    Ok(())
}

#[derive(Serialize)]
struct Inspection {
    node: &'static str,
    span: Span,
    text: String,
    #[serde(rename = "type")]
    ty: Option<String>,
    constant: Option<String>,
    declaration: Option<String>,
    declared_at: Option<Span>,
}

fn inspect(analysis: &Analysis, offset: usize) -> Inspection {
    let tree = analysis.tree();
    let node = analysis.node_at(offset);
    let kind = tree.kind(node);
    let expression = kind.is_expression();
    let declaration = analysis
        .declaration_of(node)
        .or_else(|| analysis.resolution().declaration_for_node(node));
    Inspection {
        node: kind.name(),
        span: tree.span(node),
        text: tree.text(node).to_string(),
        ty: expression.then(|| analysis.type_of(node).to_string()),
        constant: expression
            .then(|| analysis.constant_value_of(node))
            .flatten()
            .map(|v| v.to_string()),
        declaration: declaration.map(|d| analysis.declaration_signature(d)),
        declared_at: declaration.map(|d| d.name_span),
    }
}

fn cmd_inspect(file: &Path, offset: usize, config: &GlintConfig, json: bool) -> Result<()> {
    let analysis = load(file, config)?;
    if offset > analysis.source().len() {
        return Err(GlintError::InvalidArgument(format!(
            "offset {} is past the end of {} ({} bytes)",
            offset,
            file.display(),
            analysis.source().len()
        ))
        .into());
    }
    let inspection = inspect(&analysis, offset);
    if json {
        return print_json(&inspection);
    }

    println!(
        "node:        {} at {}:{}",
        inspection.node, inspection.span.line, inspection.span.column
    );
    let text = inspection.text.lines().next().unwrap_or_default();
    println!("text:        {}", text);
    if let Some(ty) = &inspection.ty {
        println!("type:        {}", ty);
    }
    if let Some(constant) = &inspection.constant {
        println!("constant:    {}", constant);
    }
    if let (Some(decl), Some(at)) = (&inspection.declaration, inspection.declared_at) {
        println!("declaration: {} at {}:{}", decl, at.line, at.column);
    }
    Ok(())
}

fn cmd_builtins(name: Option<&str>, json: bool) -> Result<()> {
    let table = builtins();
    let Some(name) = name else {
        let names = table.function_names();
        let variables = table.variables();
        if json {
            return print_json(&serde_json::json!({
                "functions": names,
                "variables": variables
                    .iter()
                    .map(|v| serde_json::json!({
                        "name": v.name,
                        "type": v.ty.to_string(),
                        "read_only": v.read_only,
                    }))
                    .collect::<Vec<_>>(),
            }));
        }
        println!("{} functions, {} variables", names.len(), variables.len());
        for name in names {
            println!("  {}", name);
        }
        for var in variables {
            println!("  {} {}", var.ty, var.name);
        }
        return Ok(());
    };

    let overloads: Vec<String> = table.functions(name).iter().map(|s| s.to_string()).collect();
    if !overloads.is_empty() {
        if json {
            return print_json(&overloads);
        }
        for overload in overloads {
            println!("{}", overload);
        }
        return Ok(());
    }
    match table.variable(name) {
        Some(var) if json => print_json(&serde_json::json!({
            "name": var.name,
            "type": var.ty.to_string(),
            "read_only": var.read_only,
        })),
        Some(var) => {
            let access = if var.read_only { "read-only" } else { "writable" };
            println!("{} {} ({})", var.ty, var.name, access);
            Ok(())
        }
        None => anyhow::bail!("no built-in function or variable named '{}'", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("glint-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_check_files_keeps_input_order() {
        let files: Vec<PathBuf> = (0..6)
            .map(|i| {
                let src = if i % 2 == 0 {
                    "void main() {}".to_string()
                } else {
                    format!("void main() {{ int x{} = 1.5; }}", i)
                };
                write_temp(&format!("order{}.frag", i), &src)
            })
            .collect();
        let reports = check_files(&files, &GlintConfig::default());
        assert_eq!(reports.len(), 6);
        for (i, report) in reports.iter().enumerate() {
            let report = report.as_ref().unwrap();
            assert_eq!(report.file, files[i]);
            assert_eq!(report.diagnostics.iter().any(|d| d.is_error()), i % 2 == 1);
        }
    }

    #[test]
    fn test_check_files_reports_missing_file() {
        let reports = check_files(
            &[PathBuf::from("/definitely/not/here.frag")],
            &GlintConfig::default(),
        );
        assert!(reports[0].is_err());
    }

    #[test]
    fn test_inspect_reference() {
        let src = "const float k = 2.0;\nfloat f() { return k * 3.0; }";
        let analysis = Analysis::new(src);
        let inspection = inspect(&analysis, src.find("k *").unwrap());
        assert_eq!(inspection.node, "identifier");
        assert_eq!(inspection.ty.as_deref(), Some("float"));
        assert_eq!(inspection.constant.as_deref(), Some("2.0"));
        assert_eq!(inspection.declaration.as_deref(), Some("const float k"));
        assert_eq!(inspection.declared_at.map(|s| s.line), Some(1));
    }

    #[test]
    fn test_inspect_declarator() {
        let src = "uniform vec3 tint;";
        let analysis = Analysis::new(src);
        let inspection = inspect(&analysis, src.find("tint").unwrap());
        assert_eq!(inspection.node, "declarator");
        assert_eq!(inspection.ty, None);
        assert_eq!(inspection.declaration.as_deref(), Some("uniform vec3 tint"));
    }
}
