use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::Ast;
use rox::error::{Diagnostics, LoxError};
use rox::lox::{Lox, Outcome, EXIT_STATIC_ERROR};
use rox::parser::Parser;
use rox::scanner::{scan_tokens, Scanner};
use rox::token::Token;

/// Stack of the thread that runs Lox code.  It must hold
/// [`MAX_CALL_DEPTH`](rox::interpreter::MAX_CALL_DEPTH) nested calls in an
/// unoptimized build.
const INTERPRETER_STACK_SIZE: usize = 32 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints the AST of every statement
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive session (the default)
    Repl,
}

/// Reads a whole file as UTF-8 source text.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    let source = String::from_utf8(buf)
        .map_err(LoxError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))?;

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(errors: impl IntoIterator<Item = impl std::fmt::Display>) {
    for e in errors {
        eprintln!("{}", e);
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<i32> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;

    if json {
        let mut diagnostics = Diagnostics::new();
        let tokens: Vec<Token> = scan_tokens(&source, &mut diagnostics);

        report(&diagnostics);
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?
        );

        return Ok(if diagnostics.had_error() { EXIT_STATIC_ERROR } else { 0 });
    }

    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        return Ok(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(0)
}

fn parse(filename: &Path) -> Result<i32> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;

    let mut diagnostics = Diagnostics::new();
    let tokens = scan_tokens(&source, &mut diagnostics);
    let statements = Parser::new(&tokens).parse(&mut diagnostics);

    if diagnostics.had_error() {
        report(&diagnostics);
        return Ok(EXIT_STATIC_ERROR);
    }

    let printer = Ast;
    for stmt in &statements {
        let ast_str = printer.print_stmt(stmt);
        debug!("AST: {}", ast_str);
        println!("{}", ast_str);
    }

    info!("Parse subcommand completed");
    Ok(0)
}

fn run(filename: &Path) -> Result<i32> {
    info!("Running Run subcommand");
    let source = read_file(filename)?;
    info!("Provided input:\n {}", source);

    let outcome: Outcome = Lox::new().run(&source);
    report(outcome.errors());

    info!("Run finished with exit code {}", outcome.exit_code());
    Ok(outcome.exit_code())
}

fn repl() -> Result<i32> {
    info!("Starting REPL");

    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        // Each line is its own unit; its errors don't leak into the next.
        let outcome = lox.run(&line);
        report(outcome.errors());
    }

    info!("REPL finished");
    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let commands: Option<Commands> = args.commands;

    let code: i32 = thread::Builder::new()
        .name("interpreter".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || match commands {
            Some(Commands::Tokenize { filename, json }) => tokenize(&filename, json),
            Some(Commands::Parse { filename }) => parse(&filename),
            Some(Commands::Run { filename }) => run(&filename),
            Some(Commands::Repl) | None => repl(),
        })
        .context("Failed to start interpreter thread")?
        .join()
        .map_err(|_| anyhow!("Interpreter thread panicked"))??;

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}
