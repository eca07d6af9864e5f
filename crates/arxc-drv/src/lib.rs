//! arxc-drv - Compiler driver.
//!
//! The driver is the entry point and orchestrator for the compilation
//! pipeline:
//!
//! ```text
//! Source files (.arx)
//!        │
//!        ▼
//!   [Read files]
//!        │
//!        ▼
//!   [Lexer] ──▶ token stream        (--show-tokens stops here)
//!        │
//!        ▼
//!   [Parser] ──▶ AST modules        (--show-ast stops here)
//!        │
//!        ▼
//!   [LLVM lowering] ──▶ IR module   (--show-llvm-ir stops here)
//!        │
//!        ▼
//!   [Object emission] ──▶ .o file
//! ```
//!
//! All phases run strictly sequentially in the calling thread. The
//! first error aborts the invocation; the driver renders it as
//! `<kind>: <message> at <file>:<line>:<col>` and the process exits
//! non-zero.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::Parser as ClapParser;
use inkwell::context::Context;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use arxc_gen::{emit_ast, LlvmBackend};
use arxc_lex::{Lexer, SourceBuffer, TokenStream};
use arxc_par::{Module, Parser};
use arxc_util::CompileError;

/// Arx ahead-of-time compiler.
///
/// Compiles one or more `.arx` source files into a single native object
/// file, or stops after an earlier phase to inspect its output.
#[derive(ClapParser, Debug)]
#[command(name = "arxc")]
#[command(author = "Arx Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ahead-of-time compiler for the Arx language", long_about = None)]
pub struct Cli {
    /// Input source files
    #[arg(required = true)]
    pub input_files: Vec<PathBuf>,

    /// Output object file (default: `<first input>.o`)
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Print the lexed token stream and exit
    #[arg(long)]
    pub show_tokens: bool,

    /// Print the parsed AST and exit
    #[arg(long)]
    pub show_ast: bool,

    /// Print the textual LLVM IR and exit without writing an object file
    #[arg(long)]
    pub show_llvm_ir: bool,

    /// Open an interactive shell (reserved)
    #[arg(long)]
    pub shell: bool,

    /// Enable verbose output
    #[arg(short, long, env = "ARXC_VERBOSE")]
    pub verbose: bool,
}

/// What the invocation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitType {
    /// Lexer output only.
    Tokens,
    /// Parser output only.
    Ast,
    /// Textual LLVM IR only.
    LlvmIr,
    /// Native object file.
    #[default]
    Object,
}

/// Compiler configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input source files.
    pub input_files: Vec<PathBuf>,

    /// Output object file path; `None` derives `<first input>.o`.
    pub output_file: Option<PathBuf>,

    /// What to produce.
    pub emit: EmitType,
}

impl Config {
    fn from_cli(cli: &Cli) -> Self {
        let emit = if cli.show_tokens {
            EmitType::Tokens
        } else if cli.show_ast {
            EmitType::Ast
        } else if cli.show_llvm_ir {
            EmitType::LlvmIr
        } else {
            EmitType::Object
        };

        Self {
            input_files: cli.input_files.clone(),
            output_file: cli.output_file.clone(),
            emit,
        }
    }

    /// The object file path: explicit, or the first input with `.o`
    /// appended.
    pub fn output_path(&self) -> PathBuf {
        match &self.output_file {
            Some(path) => path.clone(),
            None => PathBuf::from(format!("{}.o", self.input_files[0].display())),
        }
    }
}

/// State for one compiler invocation.
pub struct Session {
    pub config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the configured pipeline.
    pub fn run(&self) -> anyhow::Result<()> {
        match self.config.emit {
            EmitType::Tokens => self.show_tokens(),
            EmitType::Ast => self.show_ast(),
            EmitType::LlvmIr => self.compile(true),
            EmitType::Object => self.compile(false),
        }
    }

    fn show_tokens(&self) -> anyhow::Result<()> {
        for path in &self.config.input_files {
            let tokens = self.lex_file(path)?;
            for token in tokens.tokens() {
                println!("{}", token);
            }
        }
        Ok(())
    }

    fn show_ast(&self) -> anyhow::Result<()> {
        let mut modules = Vec::new();
        for path in &self.config.input_files {
            modules.push(self.parse_file(path)?);
        }
        println!("{}", emit_ast(&modules));
        Ok(())
    }

    fn compile(&self, show_llvm_ir: bool) -> anyhow::Result<()> {
        let first = &self.config.input_files[0];
        let context = Context::create();
        let mut backend = LlvmBackend::new(&context, &module_name(first))
            .map_err(|e| diagnostic(first, e))?;

        for path in &self.config.input_files {
            let module = self.parse_file(path)?;
            debug!("lowering {}", path.display());
            backend
                .lower_module(&module)
                .map_err(|e| diagnostic(path, e))?;
        }

        if show_llvm_ir {
            println!("{}", backend.emit_ir());
            return Ok(());
        }

        let output = self.config.output_path();
        debug!("writing object file {}", output.display());
        backend
            .write_object_file(&output)
            .map_err(|e| diagnostic(first, e))?;
        println!("Wrote {}", output.display());

        Ok(())
    }

    fn lex_file(&self, path: &Path) -> anyhow::Result<TokenStream> {
        debug!("lexing {}", path.display());
        let buffer = SourceBuffer::from_file(path).map_err(|e| diagnostic(path, e))?;
        Lexer::new(buffer).lex().map_err(|e| diagnostic(path, e))
    }

    fn parse_file(&self, path: &Path) -> anyhow::Result<Module> {
        let tokens = self.lex_file(path)?;
        debug!("parsing {}", path.display());
        Parser::new(tokens)
            .parse_module(&module_name(path))
            .map_err(|e| diagnostic(path, e))
    }
}

/// The module name for a source file: its final component without the
/// `.arx` extension.
fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}

/// Renders a compile error as the user-facing diagnostic line.
fn diagnostic(path: &Path, err: CompileError) -> anyhow::Error {
    match err.location() {
        Some(loc) => anyhow!("{} at {}:{}", err, path.display(), loc),
        None => anyhow!("{}: {}", path.display(), err),
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}

/// Parses the command line and runs the compiler.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    if cli.shell {
        anyhow::bail!("the interactive shell is not implemented yet");
    }

    Session::new(Config::from_cli(&cli)).run()
}
