use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use treelox as lox;

use lox::ast::Stmt;
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token stream as pretty JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints each statement as an s-expression
    Parse { filename: PathBuf },

    /// Evaluates a file holding a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program, or starts a REPL when no file is given
    Run { filename: Option<PathBuf> },
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with timestamp and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'treelox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

/// Maps `filename` into memory and hands back a process-lifetime view of it.
///
/// The mapping is leaked: tokens and AST nodes borrow from the source text,
/// and the interpreter can keep closures built from them alive for the rest
/// of the process.
fn load_source(filename: &Path) -> lox::error::Result<&'static str> {
    info!("Loading source file: {:?}", filename);

    let file = File::open(filename)?;

    // Mapping a zero-length file fails on some platforms.
    if file.metadata()?.len() == 0 {
        return Ok("");
    }

    // SAFETY: the mapping is read-only and never unmapped, so the returned
    // slice stays valid for the whole process.
    let mmap = unsafe { Mmap::map(&file)? };
    let mmap: &'static Mmap = Box::leak(Box::new(mmap));

    Ok(std::str::from_utf8(&mmap[..])?)
}

/// Scans `source` to completion, splitting the stream into tokens and
/// lexical errors.
fn scan(source: &'static str) -> (Vec<Token<'static>>, Vec<LoxError>) {
    let mut tokens: Vec<Token<'static>> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    debug!("Scanned {} tokens, {} errors", tokens.len(), errors.len());

    (tokens, errors)
}

/// Static front half of the pipeline: scan, then parse.  Scan and parse
/// errors come back together, and execution must not start if there were
/// any.
fn front_end(source: &'static str) -> std::result::Result<Vec<Stmt<'static>>, Vec<LoxError>> {
    let (tokens, mut errors) = scan(source);

    // The AST holds references into the token buffer, so the buffer has to
    // outlive whatever the interpreter retains.
    let tokens: &'static [Token<'static>] = Vec::leak(tokens);

    match Parser::new(tokens).parse() {
        Ok(statements) if errors.is_empty() => Ok(statements),
        Ok(_) => Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);

            Err(errors)
        }
    }
}

fn report_all(errors: &[LoxError]) {
    for error in errors {
        eprintln!("{}", error);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");

    let source = load_source(filename).with_context(|| format!("Failed to load {:?}", filename))?;
    let (tokens, errors) = scan(source);

    report_all(&errors);

    if json {
        println!("{}", serde_json::to_string_pretty(&tokens)?);
    } else {
        for token in &tokens {
            println!("{}", token);
        }
    }

    if !errors.is_empty() {
        debug!("Tokenization failed, exiting with code 65");

        std::process::exit(65);
    }

    info!("Tokenization completed successfully");

    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    info!("Running Parse subcommand");

    let source = load_source(filename).with_context(|| format!("Failed to load {:?}", filename))?;

    match front_end(source) {
        Ok(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }
        Err(errors) => {
            report_all(&errors);

            std::process::exit(65);
        }
    }

    info!("Parse subcommand completed");

    Ok(())
}

fn evaluate(filename: &Path) -> Result<()> {
    info!("Running Evaluate subcommand");

    let source = load_source(filename).with_context(|| format!("Failed to load {:?}", filename))?;
    let (tokens, errors) = scan(source);

    if !errors.is_empty() {
        report_all(&errors);

        std::process::exit(65);
    }

    let tokens: &'static [Token<'static>] = Vec::leak(tokens);

    match Parser::new(tokens).parse_expression() {
        Ok(expr) => {
            // A bare expression declares nothing, so there is nothing to
            // resolve; names in it read from the global scope.
            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    eprintln!("{}", e);

                    std::process::exit(70);
                }
            }
        }
        Err(errors) => {
            report_all(&errors);

            std::process::exit(65);
        }
    }

    info!("Evaluate subcommand completed");

    Ok(())
}

fn run_file(filename: &Path) -> Result<()> {
    info!("Running Run subcommand on {:?}", filename);

    let source = load_source(filename).with_context(|| format!("Failed to load {:?}", filename))?;

    let statements = match front_end(source) {
        Ok(statements) => statements,
        Err(errors) => {
            report_all(&errors);

            std::process::exit(65);
        }
    };

    let locals = match Resolver::new().resolve(&statements) {
        Ok(locals) => locals,
        Err(errors) => {
            report_all(&errors);

            std::process::exit(65);
        }
    };

    let mut interpreter = Interpreter::new();
    interpreter.add_locals(locals);

    if let Err(fault) = interpreter.interpret(&statements) {
        eprintln!("{}", fault);

        std::process::exit(70);
    }

    info!("Program executed successfully");

    Ok(())
}

/// Interactive session.  One statement list per line; the interpreter and
/// its resolution table persist, so later lines see earlier definitions.
fn repl() -> Result<()> {
    info!("Starting REPL session");

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            // EOF.
            break;
        }

        let line = line.trim_end();
        if line.is_empty() {
            break;
        }

        // Closures built from this line can outlive the iteration, so the
        // line joins the leaked sources.
        let source: &'static str = Box::leak(line.to_owned().into_boxed_str());

        run_line(source, &mut interpreter);
    }

    info!("REPL session ended");

    Ok(())
}

/// Runs one REPL line; errors print without ending the session.
fn run_line(source: &'static str, interpreter: &mut Interpreter<'static>) {
    let statements = match front_end(source) {
        Ok(statements) => statements,
        Err(errors) => {
            report_all(&errors);

            return;
        }
    };

    match Resolver::new().resolve(&statements) {
        Ok(locals) => interpreter.add_locals(locals),
        Err(errors) => {
            report_all(&errors);

            return;
        }
    }

    if let Err(fault) = interpreter.interpret(&statements) {
        eprintln!("{}", fault);
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&filename, json),
        Commands::Parse { filename } => parse(&filename),
        Commands::Evaluate { filename } => evaluate(&filename),
        Commands::Run { filename } => match filename {
            Some(filename) => run_file(&filename),
            None => repl(),
        },
    }
}
