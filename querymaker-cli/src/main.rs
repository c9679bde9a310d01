mod display;
mod parser;

use std::path::{Path, PathBuf};

use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use parser::Command;
use querymaker::{BuilderConfig, PipelineBuilder, check, recipe};

#[derive(Parser)]
#[command(name = "querymaker", version, about = "Build MongoDB aggregation pipelines")]
struct Cli {
    /// Recipe file (JSON array of steps) to build and print
    #[arg(long, conflicts_with = "eval")]
    recipe: Option<PathBuf>,

    /// Recipe given inline as JSON; build, print and exit
    #[arg(long)]
    eval: Option<String>,

    /// Builder config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output raw JSON (no pretty-printing)
    #[arg(long)]
    json: bool,

    /// Check stage shapes before printing
    #[arg(long)]
    check: bool,

    /// Log builder activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config(path),
        None => BuilderConfig::default(),
    };

    let recipe_json = if let Some(path) = &cli.recipe {
        Some(std::fs::read_to_string(path).unwrap_or_else(|e| {
            fail(&format!("failed to read recipe {}: {e}", path.display()))
        }))
    } else {
        cli.eval.clone()
    };

    match recipe_json {
        Some(text) => run_one(&text, config, cli.json, cli.check),
        None => run_repl(config, cli.json),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> BuilderConfig {
    match BuilderConfig::load_from_file(path) {
        Ok(config) => {
            info!(path = %path.display(), "loaded builder config");
            config
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(msg: &str) -> ! {
    eprintln!("{}", display::format_error(msg));
    std::process::exit(1);
}

fn run_one(text: &str, config: BuilderConfig, raw_json: bool, run_check: bool) {
    let value: Value = serde_json::from_str(text)
        .unwrap_or_else(|e| fail(&format!("invalid recipe JSON: {e}")));
    let stages = recipe::build(&value, config).unwrap_or_else(|e| fail(&e.to_string()));
    debug!(stages = stages.len(), "recipe built");

    if run_check {
        if let Err(e) = check::validate(&stages) {
            fail(&e.to_string());
        }
    }
    println!("{}", display::format_pipeline(&stages, raw_json));
}

fn run_repl(config: BuilderConfig, raw_json: bool) {
    let mut rl = match rustyline::DefaultEditor::new() {
        Ok(r) => r,
        Err(e) => fail(&format!("failed to initialize readline: {e}")),
    };

    display::print_banner(env!("CARGO_PKG_VERSION"));

    let mut builder = PipelineBuilder::with_config(config.clone());

    loop {
        let prompt = format!("querymaker[{}]> ", builder.len());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(
                rustyline::error::ReadlineError::Interrupted
                | rustyline::error::ReadlineError::Eof,
            ) => break,
            Err(e) => {
                eprintln!("{}", display::format_error(&e.to_string()));
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let cmd = match parser::parse(line) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", display::format_error(&format!("parse error: {e}")));
                continue;
            }
        };

        match cmd {
            Command::Step(step) => recipe::apply_step(&mut builder, &step),
            Command::Show => println!("{}", display::format_pipeline(builder.get(), raw_json)),
            Command::Check => match check::validate(builder.get()) {
                Ok(()) => println!("{}", display::format_ok("ok")),
                Err(e) => eprintln!("{}", display::format_error(&e.to_string())),
            },
            Command::Reset => builder = PipelineBuilder::with_config(config.clone()),
            Command::Help => display::print_help(),
            Command::Exit => break,
        }
    }
}
