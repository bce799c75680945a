use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use scriptc::ast::{AstPrinter, DataType};
use scriptc::common::consts::SCRIPT_EXTENSION;
use scriptc::common::{ClassManager, Config, Error, MethodContext, ScriptEnv};
use scriptc::{compile_script, compile_script_file};
use scriptc::parser::{parse_script, Lexer};

#[derive(Parser)]
#[command(name = "scriptc")]
#[command(about = "Compiler for Java-flavoured method scripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log compiler phases
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a script and print the generated code
    Compile {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        method: MethodArgs,
    },

    /// Analyse a script, or every script under a directory
    Check {
        #[arg(value_name = "PATH")]
        input: PathBuf,

        #[command(flatten)]
        method: MethodArgs,
    },

    /// Parse a script and show the tree
    Parse {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show the full debug representation
        #[arg(short, long)]
        detailed: bool,
    },

    /// Lexically analyze a script
    Lex {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show token locations
        #[arg(short, long)]
        locations: bool,
    },
}

/// The method a script is compiled as
#[derive(Args)]
struct MethodArgs {
    /// Line-accurate code: no folding or dead branch elimination
    #[arg(long)]
    debug: bool,

    /// Class the method belongs to
    #[arg(long, default_value = "Script")]
    class: String,

    #[arg(long, default_value = "run")]
    method: String,

    /// Parameter as TYPE:NAME, or `final TYPE:NAME`; repeatable
    #[arg(long = "param", value_name = "TYPE:NAME")]
    params: Vec<String>,

    /// Return type
    #[arg(long, value_name = "TYPE", default_value = "void")]
    returns: String,

    /// Compile as a static method
    #[arg(long = "static")]
    is_static: bool,
}

impl MethodArgs {
    fn env(&self, classes: &ClassManager) -> Result<ScriptEnv> {
        let mut method = MethodContext::new(self.class.as_str(), self.method.as_str());
        for param in &self.params {
            let (ty, name) = param
                .split_once(':')
                .with_context(|| format!("parameter '{}' is not TYPE:NAME", param))?;
            method = match ty.trim().strip_prefix("final ") {
                Some(ty) => method.final_param(name.trim(), resolve_type(classes, ty.trim())?),
                None => method.param(name.trim(), resolve_type(classes, ty.trim())?),
            };
        }
        method = method.returns(resolve_type(classes, self.returns.trim())?);
        if self.is_static {
            method = method.static_method();
        }
        Ok(ScriptEnv::new(classes.clone(), method).with_debug(self.debug))
    }
}

/// `int`, `String`, `java.util.Map`, `byte[][]`, ...
fn resolve_type(classes: &ClassManager, text: &str) -> Result<DataType> {
    if let Some(elem) = text.strip_suffix("[]") {
        return Ok(resolve_type(classes, elem.trim_end())?.array_of());
    }
    if text == "void" {
        return Ok(DataType::Void);
    }
    if let Some(primitive) = DataType::from_primitive_name(text) {
        return Ok(primitive);
    }
    let qualified = format!("java.lang.{}", text);
    for candidate in [text, qualified.as_str()] {
        if classes.get(candidate).is_some() {
            return Ok(DataType::class(candidate));
        }
    }
    bail!("unknown type '{}'", text)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "warn"
    }))
    .init();

    match &cli.command {
        Commands::Compile { input, method } => compile_file(input, method, cli.verbose),
        Commands::Check { input, method } => check_path(input, method, cli.verbose),
        Commands::Parse { input, detailed } => parse_file(input, *detailed),
        Commands::Lex { input, locations } => lex_file(input, *locations),
    }
}

fn config(method: &MethodArgs, verbose: bool) -> Result<Config> {
    let mut config = Config::from_env()?;
    config.verbose = verbose;
    Ok(if method.debug { config.with_debug(true) } else { config })
}

fn compile_file(input: &Path, method: &MethodArgs, verbose: bool) -> Result<()> {
    let config = config(method, verbose)?;
    let env = method.env(&ClassManager::with_runtime())?.with_debug(config.debug);

    let compiled = match compile_script_file(input, &env, &config) {
        Ok(compiled) => compiled,
        Err(Error::Diagnostics(list)) => {
            for diagnostic in &list {
                eprintln!("{}: {}", input.display(), diagnostic);
            }
            bail!("{} failed to compile", input.display());
        }
        Err(Error::ParseErrors(list)) => {
            for error in &list {
                eprintln!("{}: {}", input.display(), error);
            }
            bail!("{} failed to parse", input.display());
        }
        Err(other) => return Err(other.into()),
    };
    for warning in &compiled.warnings {
        eprintln!("{}: {}", input.display(), warning);
    }
    print!("{}", compiled.code);
    if config.verbose {
        println!("dependencies: {:?}", compiled.dependencies);
    }
    Ok(())
}

fn script_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == SCRIPT_EXTENSION))
        .collect()
}

fn check_path(input: &Path, method: &MethodArgs, verbose: bool) -> Result<()> {
    let config = config(method, verbose)?;
    let env = method.env(&ClassManager::with_runtime())?.with_debug(config.debug);
    let files = script_files(input);
    log::debug!("checking {} scripts under {}", files.len(), input.display());

    let mut failed = 0;
    for file in &files {
        let source = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        match compile_script(&source, &env, &config) {
            Ok(compiled) => {
                for warning in &compiled.warnings {
                    eprintln!("{}: {}", file.display(), warning);
                }
            }
            Err(Error::Diagnostics(list)) => {
                failed += 1;
                for diagnostic in &list {
                    eprintln!("{}: {}", file.display(), diagnostic);
                }
            }
            Err(Error::ParseErrors(list)) => {
                failed += 1;
                for error in &list {
                    eprintln!("{}: {}", file.display(), error);
                }
            }
            Err(other) => {
                failed += 1;
                eprintln!("{}: {}", file.display(), other);
            }
        }
    }
    println!("{} scripts checked, {} failed", files.len(), failed);
    if failed > 0 {
        bail!("{} of {} scripts failed", failed, files.len());
    }
    Ok(())
}

fn parse_file(input: &Path, detailed: bool) -> Result<()> {
    let source = fs::read_to_string(input)?;
    let script = parse_script(&source)?;

    if detailed {
        println!("{:#?}", script);
    } else {
        print!("{}", AstPrinter::new().print(&script));
    }

    Ok(())
}

fn lex_file(input: &Path, locations: bool) -> Result<()> {
    let source = fs::read_to_string(input)?;
    let tokens = Lexer::new(&source).tokenize().map_err(|e| {
        anyhow::anyhow!(
            "Lexical error at line {}, column {}: unrecognized input '{}'",
            e.location.line,
            e.location.column,
            e.text
        )
    })?;

    for token in tokens {
        if locations {
            println!("{:?} at {}:{}", token.token_type(), token.location().line, token.location().column);
        } else {
            println!("{:?}: '{}'", token.token_type(), token.lexeme());
        }
    }

    Ok(())
}
