//! contemplative-md command line
//!
//! Renders a markdown file (or stdin) to sanitized HTML, or views a source
//! file through the code viewer and prints the result as JSON.

use anyhow::Context;
use contemplative_md::config::{Config, APP_ID};
use contemplative_md::error::{AppError, FileError};
use contemplative_md::file_handler::read_file;
use contemplative_md::markdown::{Highlighter, MarkdownRenderer};
use contemplative_md::utils::path;
use contemplative_md::CodeViewer;
use std::io::Read;
use std::path::{Path, PathBuf};

/// What the invocation should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Markdown,
    Code,
    Css,
}

#[derive(Debug, Default)]
struct Flags {
    mode: Mode,
    origin: Option<String>,
    config: Option<PathBuf>,
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let flags = parse_args();
    let mut config = match &flags.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if flags.origin.is_some() {
        config.site.origin = flags.origin.clone();
        config.validate()?;
    }

    match flags.mode {
        Mode::Css => {
            let highlighter = Highlighter::shared().await?;
            print!("{}", highlighter.theme().css_variables());
        }
        Mode::Code => {
            let file = flags
                .file
                .context("--code requires a file argument")?;
            let view = match CodeViewer::from_config(&config).view_file(&file).await {
                Ok(view) => view,
                Err(AppError::FileIO(e)) => return Err(file_failure(&file, e)),
                Err(e) => return Err(e.into()),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Mode::Markdown => {
            let source = match &flags.file {
                Some(file) => {
                    if !path::is_markdown(file) {
                        log::warn!("{} does not look like markdown", file.display());
                    }
                    read_file(file)
                        .await
                        .map_err(|e| file_failure(file, e))?
                        .content
                }
                None => read_stdin()?,
            };
            let renderer = MarkdownRenderer::from_config(&config)?;
            println!("{}", renderer.render(&source).await.to_html());
        }
    }

    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,contemplative_md=debug"),
    )
    .format_timestamp_millis()
    .init();
}

/// Report a file error with its user-facing message
fn file_failure(file: &Path, e: FileError) -> anyhow::Error {
    log::debug!("{:?}", e);
    anyhow::anyhow!("{}: {}", file.display(), e.user_message())
}

fn read_stdin() -> anyhow::Result<String> {
    let mut source = String::new();
    std::io::stdin()
        .read_to_string(&mut source)
        .context("reading stdin")?;
    Ok(source)
}

/// Parse command line arguments
fn parse_args() -> Flags {
    let args: Vec<String> = std::env::args().collect();
    let mut flags = Flags::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--code" => flags.mode = Mode::Code,
            "--css" => flags.mode = Mode::Css,
            "-o" | "--origin" => {
                i += 1;
                match args.get(i) {
                    Some(origin) => flags.origin = Some(origin.clone()),
                    None => {
                        eprintln!("Error: --origin requires a URL argument");
                        std::process::exit(1);
                    }
                }
            }
            "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => flags.config = Some(PathBuf::from(path)),
                    None => {
                        eprintln!("Error: --config requires a path argument");
                        std::process::exit(1);
                    }
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
            arg => {
                if flags.file.is_some() {
                    eprintln!("Error: only one input file is supported");
                    std::process::exit(1);
                }
                flags.file = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    flags
}

/// Print help message
fn print_help() {
    println!(
        r#"contemplative-md - Markdown to safe HTML

USAGE:
    {app} [OPTIONS] [FILE]

With no FILE, markdown is read from stdin.

OPTIONS:
    -h, --help            Show this help message
    -v, --version         Show version information
    -c, --code            View FILE as source code and print JSON
    -o, --origin <URL>    Site origin used to classify links
        --config <PATH>   Load configuration from PATH
        --css             Print the highlighting theme's CSS variables

EXAMPLES:
    {app} essay.md
    {app} --origin https://example.com < essay.md
    {app} --code src/main.ts
"#,
        app = APP_ID
    );
}

/// Print version information
fn print_version() {
    println!("{} {}", APP_ID, env!("CARGO_PKG_VERSION"));
}
