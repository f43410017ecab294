use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use colored::Colorize;

use kotolang::error::DiagnosticError;
use kotolang::interpreter::{Interpreter, RunOutcome};

#[derive(Parser)]
#[command(name = "kotolang")]
#[command(author, version, about = "The Koto language interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Koto source file
    Run {
        /// The source file to run
        input: PathBuf,
    },

    /// Check a Koto source file for errors without executing it
    Check {
        /// The source file to check
        input: PathBuf,

        /// Dump the AST to stdout
        #[arg(long)]
        dump_ast: bool,
    },

    /// Start an interactive REPL
    Repl,
}

fn main() -> Result<()> {
    // Initialize logger before parsing CLI args
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let result = match cli.command {
        Commands::Run { input } => run(input),
        Commands::Check { input, dump_ast } => check(input, dump_ast),
        Commands::Repl => repl(),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

/// ソースファイルと診断用のファイルテーブル
struct SourceState {
    name: String,
    source: String,
    files: SimpleFiles<String, String>,
    file_id: usize,
}

impl SourceState {
    fn new(input: &PathBuf) -> Result<Self> {
        let source = fs::read_to_string(input)
            .with_context(|| format!("Failed to read source file: {:?}", input))?;
        let name = input.display().to_string();

        let mut files = SimpleFiles::new();
        let file_id = files.add(name.clone(), source.clone());

        Ok(Self {
            name,
            source,
            files,
            file_id,
        })
    }

    fn report_error(&self, error: kotolang::KotoError) -> Result<()> {
        let diagnostic = DiagnosticError::new(error, self.file_id).to_diagnostic();
        let writer = StandardStream::stderr(ColorChoice::Always);
        let config = codespan_reporting::term::Config::default();
        codespan_reporting::term::emit(&mut writer.lock(), &config, &self.files, &diagnostic)?;
        Ok(())
    }
}

fn new_interpreter() -> Result<Interpreter> {
    Interpreter::new().map_err(|e| anyhow::anyhow!("{}", e))
}

fn run(input: PathBuf) -> Result<()> {
    log::info!("Running {:?}", input);

    let state = SourceState::new(&input)?;
    let mut interpreter = new_interpreter()?;

    match interpreter.run(&state.name, &state.source) {
        Ok(outcome) => {
            let status = outcome.status();
            if status != 0 {
                std::process::exit(status as i32);
            }
            Ok(())
        }
        Err(error) => {
            state.report_error(error)?;
            anyhow::bail!("Execution failed");
        }
    }
}

fn check(input: PathBuf, dump_ast: bool) -> Result<()> {
    log::info!("Checking {:?}", input);

    let state = SourceState::new(&input)?;
    let mut interpreter = new_interpreter()?;

    if dump_ast {
        match interpreter.parse_all(&state.name, &state.source) {
            Ok(statements) => {
                println!("{}", "=== AST ===".blue().bold());
                println!("{}", serde_json::to_string_pretty(&statements)?);
            }
            Err(error) => {
                state.report_error(error)?;
                anyhow::bail!("Parsing failed");
            }
        }
        return Ok(());
    }

    if let Err(error) = interpreter.validate(&state.name, &state.source) {
        state.report_error(error)?;
        anyhow::bail!("Validation failed");
    }

    println!("{}: No errors found", "success".green().bold());
    Ok(())
}

fn repl() -> Result<()> {
    println!("{}", "Koto Language REPL".blue().bold());
    println!("Type ':quit' or ':q' to exit, ':help' for help\n");

    // 一つのインタプリタを使い続けるので、宣言や登録は行をまたいで残る
    let mut interpreter = new_interpreter()?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line_number = 1usize;

    loop {
        print!("koto:{:03}> ", line_number);
        stdout.flush()?;

        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            println!();
            break;
        }
        let input = input.trim();

        match input {
            ":quit" | ":q" => {
                println!("Goodbye!");
                break;
            }
            ":help" | ":h" => {
                println!("REPL commands:");
                println!("  :quit, :q     Exit the REPL");
                println!("  :help, :h     Show this help message");
                println!("  :release, :r  Release cached literal nodes");
                println!("\nEnter Koto statements (terminated with ';') to execute them.");
                continue;
            }
            ":release" | ":r" => {
                let count = interpreter.release_cached_nodes();
                println!("{}: released {} cached nodes", "info".blue(), count);
                continue;
            }
            "" => continue,
            _ => {}
        }

        let name = format!("<repl:{}>", line_number);
        match interpreter.run(&name, input) {
            Ok(RunOutcome::Completed(value)) => {
                if !value.is_null() {
                    println!("{}: {}", "result".green(), value);
                }
            }
            Ok(RunOutcome::Terminated(status)) => {
                println!("{}: terminated with status {}", "info".blue(), status);
                break;
            }
            Err(error) => {
                eprintln!("{}: {}", "error".red(), error);
            }
        }

        line_number += 1;
    }

    Ok(())
}
