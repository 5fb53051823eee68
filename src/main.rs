//! # Mobiledoc Compiler CLI
//!
//! Command-line interface for compiling documents.
//!
//! ## Usage
//!
//! ```bash
//! # Serialize a Markdown file to Mobiledoc
//! mobiledoc-compiler mobiledoc post.md --pretty
//!
//! # Render a Mobiledoc or node-tree JSON file to HTML
//! mobiledoc-compiler html post.json
//!
//! # Show the opcode stream the HTML backend would execute
//! mobiledoc-compiler opcodes --backend html post.md
//!
//! # Read from stdin
//! cat post.md | mobiledoc-compiler html --from markdown -
//! ```
//!
//! Set `RUST_LOG=mobiledoc_compiler=trace` (or pass `-vv`) to log every
//! visited node and executed opcode to stderr.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mobiledoc_compiler::{
    CompileError, Compiler, Node, Opcodes, Post, compile,
    renderers::{
        html::{HtmlRenderer, HtmlVisitor},
        mobiledoc::{MobiledocBuilder, MobiledocVisitor},
    },
    visit,
};

/// Mobiledoc compiler - Compile rich-text documents through an opcode pipeline
#[derive(Parser, Debug)]
#[command(name = "mobiledoc-compiler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the opcode stream for a document as JSON
    Opcodes {
        #[command(flatten)]
        input: InputArgs,

        /// Which backend's opcode set to emit
        #[arg(long, value_enum, default_value_t = Backend::Mobiledoc)]
        backend: Backend,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Render a document to HTML
    Html {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Serialize a document to Mobiledoc 0.3.2 JSON
    Mobiledoc {
        #[command(flatten)]
        input: InputArgs,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input file ("-" for stdin)
    input: PathBuf,

    /// Input format
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    from: InputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum InputFormat {
    /// Markdown by file extension or when the input isn't JSON; JSON is
    /// Mobiledoc if it has a "version" key, a node tree if not
    Auto,
    /// Node-tree JSON tagged with "type"
    Tree,
    /// Mobiledoc 0.3.x JSON
    Mobiledoc,
    /// Markdown text
    Markdown,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    Mobiledoc,
    Html,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mobiledoc_compiler={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), CompileError> {
    match command {
        Commands::Opcodes {
            input,
            backend,
            pretty,
        } => {
            let node = load(&input)?;
            let mut opcodes = Opcodes::new();
            match backend {
                Backend::Mobiledoc => visit(&MobiledocVisitor, &node, &mut opcodes)?,
                Backend::Html => visit(&HtmlVisitor, &node, &mut opcodes)?,
            }
            println!("{}", to_json(&opcodes, pretty)?);
        }
        Commands::Html { input } => {
            let node = load(&input)?;
            let mut opcodes = Opcodes::new();
            visit(&HtmlVisitor, &node, &mut opcodes)?;

            let mut renderer = HtmlRenderer::new();
            compile(&mut renderer, &HtmlRenderer::handlers(), &opcodes)?;
            println!("{}", renderer.finish());
        }
        Commands::Mobiledoc { input, pretty } => {
            let node = load(&input)?;
            let mut opcodes = Opcodes::new();
            visit(&MobiledocVisitor, &node, &mut opcodes)?;

            let mut builder = MobiledocBuilder::new();
            compile(&mut builder, &MobiledocBuilder::handlers(), &opcodes)?;
            println!("{}", to_json(&builder.finish(), pretty)?);
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, CompileError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn read_input(path: &Path) -> Result<String, CompileError> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn is_markdown_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("md" | "markdown")
    )
}

/// Read the input and build the root node.
fn load(args: &InputArgs) -> Result<Node, CompileError> {
    let text = read_input(&args.input)?;
    parse_input(&text, &args.input, args.from)
}

fn parse_input(text: &str, path: &Path, from: InputFormat) -> Result<Node, CompileError> {
    let format = match from {
        InputFormat::Auto if is_markdown_path(path) => InputFormat::Markdown,
        InputFormat::Auto => {
            // Anything that isn't JSON is read as Markdown
            let Ok(value) = serde_json::from_str::<Value>(text) else {
                debug!("input is not JSON, reading as markdown");
                return Ok(Post::from_markdown(text).into());
            };
            let format = if value.get("version").is_some() {
                InputFormat::Mobiledoc
            } else {
                InputFormat::Tree
            };
            debug!(?format, "detected input format");
            return node_from_json(value, format);
        }
        other => other,
    };

    match format {
        InputFormat::Markdown => Ok(Post::from_markdown(text).into()),
        other => node_from_json(serde_json::from_str(text)?, other),
    }
}

fn node_from_json(value: Value, format: InputFormat) -> Result<Node, CompileError> {
    match format {
        InputFormat::Mobiledoc => Ok(Post::from_mobiledoc(&value)?.into()),
        _ => Ok(serde_json::from_value(value)?),
    }
}
