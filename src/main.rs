use std::io::{self, IsTerminal, Read};
use std::panic;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;

use clap::Parser as ClapParser;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tinylisp::{Options, PROMPT, Program};

#[derive(ClapParser)]
#[command(name = "tl", about = "The tinylisp interpreter")]
struct Cli {
    /// Program to run. Without it, starts a REPL, or runs stdin when piped
    file: Option<PathBuf>,
    /// Do not load the core library
    #[arg(long)]
    no_library: bool,
    /// Log evaluation steps to stderr
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("tinylisp=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = panic::catch_unwind(|| run(cli));

    match result {
        Ok(code) => process::exit(code),
        Err(panic_info) => {
            eprintln!("The interpreter encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> i32 {
    let options = Options {
        library: !cli.no_library,
        ..Options::default()
    };

    if let Some(path) = cli.file {
        let mut program = Program::new(options);
        install_interrupt_handler(&program);
        return match program.run_file(&path) {
            Ok(_) => 0,
            Err(err) => {
                eprintln!("Error: {err}");
                1
            }
        };
    }

    if io::stdin().is_terminal() {
        return run_repl(Options {
            repl: true,
            ..options
        });
    }

    // Piped input is a program
    let mut code = String::new();
    if let Err(err) = io::stdin().read_to_string(&mut code) {
        eprintln!("Error: could not read standard input: {err}");
        return 1;
    }
    let mut program = Program::new(options);
    install_interrupt_handler(&program);
    program.execute(&code);
    0
}

/// Ctrl-C during evaluation aborts the current top-level form
fn install_interrupt_handler(program: &Program) {
    let flag = program.interrupt_flag();
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(%err, "could not install Ctrl-C handler");
    }
}

fn run_repl(options: Options) -> i32 {
    println!("(tinylisp)");
    println!("Type (help) for information");

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Error: could not initialize REPL: {err}");
            return 1;
        }
    };
    let mut program = Program::new(options);
    install_interrupt_handler(&program);
    let interrupt = program.interrupt_flag();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                // Discard a Ctrl-C that arrived while idle
                interrupt.store(false, Ordering::SeqCst);
                if let Some(value) = program.execute(&line) {
                    program.set_global("_", value);
                }
                // Already echoed to stderr
                program.take_diagnostics();
                if program.quit_requested() {
                    break;
                }
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    println!("Bye!");
    0
}
