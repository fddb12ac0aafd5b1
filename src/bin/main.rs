use std::path::PathBuf;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use skink::Skink;

const PROMPT: &str = "skink> ";

#[derive(Debug, Parser)]
#[command(name = "skink", version, about = "Run skink scripts or start an interactive session")]
struct Args {
    /// Script to run. Starts the REPL when omitted.
    file: Option<PathBuf>,

    /// Evaluate the given source and print its value.
    #[arg(short = 'e', long = "eval", value_name = "SOURCE", conflicts_with = "file")]
    eval: Option<String>,
}

fn main() -> Result<(), anyhow::Error> {
    init_tracing();
    let args = Args::parse();

    let mut skink = Skink::new();
    match (args.file, args.eval) {
        (Some(file), _) => {
            if let Err(e) = skink.run_file(&file) {
                eprintln!("{e}");
                std::process::exit(1);
            }
            Ok(())
        }
        (None, Some(source)) => match skink.run(&source, "<eval>") {
            Ok(value) => {
                println!("{value}");
                Ok(())
            }
            Err(e) => {
                eprintln!("{}", e.render());
                std::process::exit(1);
            }
        },
        (None, None) => run_prompt(&mut skink),
    }
}

fn run_prompt(skink: &mut Skink) -> Result<(), anyhow::Error> {
    let mut editor = DefaultEditor::new()?;
    println!("Type :help for help, :quit to exit.");

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if let Err(e) = editor.add_history_entry(line) {
                    tracing::debug!(error = %e, "failed to record history entry");
                }

                match line {
                    ":quit" | ":q" => break,
                    ":help" => print_help(),
                    _ => println!("{}", skink.run_pretty(line, "<stdin>")),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help        Show this help");
    println!("  :quit, :q    Exit the REPL");
    println!();
    println!("Bindings persist between lines, e.g.");
    println!("  int a = 2");
    println!("  int twice(int x) = x * 2");
    println!("  twice(a)");
}

/// Logs go to stderr, and only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
