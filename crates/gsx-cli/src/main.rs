// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use console::style;
use gsx::{Bundle, Diagnostic, GoImports, Passthrough, Severity, SourceContext, SourceMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gsx")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Compile GSX templates to Go TUI code", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile templates and write .gsx.go files with source maps
    Build {
        /// Files or directories to compile (directories are searched
        /// recursively for *.gsx)
        #[arg(default_value = ".")]
        paths: Vec<String>,
        /// Output directory (defaults to writing next to each template)
        #[arg(short, long)]
        output: Option<String>,
        /// Skip the external goimports/gofmt pass
        #[arg(long)]
        no_format: bool,
    },
    /// Type-check templates without writing output
    Check {
        /// Files or directories to check
        #[arg(default_value = ".")]
        paths: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let failed = match cli.command {
        Commands::Build {
            paths,
            output,
            no_format,
        } => build(&paths, output.as_deref(), no_format)?,
        Commands::Check { paths } => check(&paths)?,
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn build(paths: &[String], output: Option<&str>, no_format: bool) -> anyhow::Result<bool> {
    let files = discover(paths)?;
    if files.is_empty() {
        println!("No templates found");
        return Ok(false);
    }
    println!(
        "{} {} template(s)",
        style("Compiling").cyan(),
        files.len()
    );

    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
    }

    let goimports = GoImports::new();
    let mut failed = false;
    let mut written = 0usize;

    for file in &files {
        let source = fs::read_to_string(file)?;
        let name = file.to_string_lossy();
        let bundle = if no_format {
            gsx::compile_with(&name, &source, &Passthrough)
        } else {
            gsx::compile_with(&name, &source, &goimports)
        };
        let bundle = match bundle {
            Ok(bundle) => bundle,
            Err(err) => {
                eprintln!("{} {}: {}", style("error:").red().bold(), name, err);
                failed = true;
                continue;
            }
        };

        report(&bundle, &source);
        if bundle.has_errors() {
            failed = true;
            continue;
        }

        let out_path = output_file(file, output);
        fs::write(&out_path, &bundle.generated)?;
        let map_path = SourceMap::map_path(&out_path.to_string_lossy());
        fs::write(&map_path, bundle.source_map.to_json()?)?;
        written += 1;
    }

    if !failed {
        println!(
            "{} {} file(s) written",
            style("Build complete!").green().bold(),
            written
        );
    }
    Ok(failed)
}

fn check(paths: &[String]) -> anyhow::Result<bool> {
    let files = discover(paths)?;
    if files.is_empty() {
        println!("No templates found");
        return Ok(false);
    }

    let mut failed = false;
    for file in &files {
        let source = fs::read_to_string(file)?;
        let name = file.to_string_lossy();
        match gsx::compile_with(&name, &source, &Passthrough) {
            Ok(bundle) => {
                report(&bundle, &source);
                failed |= bundle.has_errors();
            }
            Err(err) => {
                eprintln!("{} {}: {}", style("error:").red().bold(), name, err);
                failed = true;
            }
        }
    }
    if !failed {
        println!("{}", style("All templates OK").green());
    }
    Ok(failed)
}

/// Collects .gsx files from the given paths, searching directories
/// recursively. Results are sorted for stable output.
fn discover(paths: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let p = Path::new(path);
        if p.is_file() {
            files.push(p.to_path_buf());
        } else {
            let pattern = format!("{}/**/*.gsx", path.trim_end_matches('/'));
            for entry in (glob::glob(&pattern)?).flatten() {
                files.push(entry);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn output_file(input: &Path, output_dir: Option<&str>) -> PathBuf {
    let generated = gsx::output_path(&input.to_string_lossy());
    match output_dir {
        Some(dir) => {
            let file_name = Path::new(&generated)
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            Path::new(dir).join(file_name)
        }
        None => PathBuf::from(generated),
    }
}

/// Prints every diagnostic of a bundle, with a source snippet for errors.
fn report(bundle: &Bundle, source: &str) {
    for diagnostic in bundle.diagnostics.items() {
        print_diagnostic(diagnostic, source);
    }
}

fn print_diagnostic(diagnostic: &Diagnostic, source: &str) {
    let severity = match diagnostic.severity {
        Severity::Error => style("error").red().bold(),
        Severity::Warning => style("warning").yellow().bold(),
    };
    eprintln!(
        "{}:{}:{}: {}: {}",
        diagnostic.position.file,
        diagnostic.position.line,
        diagnostic.position.column,
        severity,
        diagnostic.message
    );
    if let Some(hint) = &diagnostic.hint {
        eprintln!("hint: {hint}");
    }
    if diagnostic.severity == Severity::Error {
        let context =
            SourceContext::from_source(source, diagnostic.position.line, diagnostic.position.column);
        eprint!("{}", context.format_snippet());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_finds_nested_templates() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.gsx"), "package x\n").unwrap();
        fs::write(dir.path().join("sub/b.gsx"), "package x\n").unwrap();
        fs::write(dir.path().join("sub/ignored.go"), "package x\n").unwrap();

        let files = discover(&[dir.path().to_string_lossy().to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_output_file_next_to_input() {
        let path = output_file(Path::new("ui/app.gsx"), None);
        assert_eq!(path, PathBuf::from("ui/app.gsx.go"));
    }

    #[test]
    fn test_output_file_into_dir() {
        let path = output_file(Path::new("ui/app.gsx"), Some("dist"));
        assert_eq!(path, PathBuf::from("dist/app.gsx.go"));
    }

    #[test]
    fn test_build_round_trip_without_formatter() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("hello.gsx");
        fs::write(
            &template,
            "package x\ntempl Hello() { <span>Hello World</span> }\n",
        )
        .unwrap();

        let failed = build(
            &[template.to_string_lossy().to_string()],
            None,
            true, // no external formatter in tests
        )
        .unwrap();
        assert!(!failed);

        let generated = fs::read_to_string(dir.path().join("hello.gsx.go")).unwrap();
        assert!(generated.contains("func Hello() HelloView {"));
        let map = fs::read_to_string(dir.path().join("hello.gsx.go.map")).unwrap();
        assert!(map.contains("\"mappings\""));
    }

    #[test]
    fn test_check_reports_errors() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("bad.gsx");
        fs::write(&template, "package x\ntempl T() { <badTag/> }\n").unwrap();

        let failed = check(&[template.to_string_lossy().to_string()]).unwrap();
        assert!(failed);
    }
}
