use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use mrt::config::{DEFAULT_MAX_CALL_DEPTH, RuntimeConfig};
use mrt::diagnostics;
use rustyline::DefaultEditor;
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "mrt")]
#[command(about = "The MRT scripting language")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<String>,

    /// User-level call frames allowed before a run fails with StackOverflow
    #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let runtime_config = RuntimeConfig {
        max_call_depth: cli.max_call_depth,
    };

    match cli.script {
        None => {
            run_prompt(&runtime_config)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(path) => run_file(&path, &runtime_config),
    }
}

// Only install a subscriber when RUST_LOG asks for one, so plain runs stay quiet.
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_prompt(runtime_config: &RuntimeConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut buffer = String::new();

    let history_path = dirs::home_dir().map(|p| p.join(".mrt_history"));
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "| " };

        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                if is_complete(&buffer) {
                    if !buffer.trim().is_empty() {
                        let _ = rl.add_history_entry(buffer.trim());
                        run(&buffer, runtime_config);
                    }
                    buffer.clear();
                }
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

/// True once every brace, paren, bracket, string and block comment opened in `code` is closed.
fn is_complete(code: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut in_block_comment = false;
    let mut iter = code.chars().peekable();

    while let Some(c) = iter.next() {
        if in_block_comment {
            if c == '*' && iter.peek() == Some(&'/') {
                iter.next();
                in_block_comment = false;
            }
            continue;
        }

        if in_string {
            match c {
                '\\' if iter.peek() == Some(&'"') => {
                    iter.next();
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' if iter.peek() == Some(&'/') => {
                while iter.next_if(|&next| next != '\n').is_some() {}
            }
            '/' if iter.peek() == Some(&'*') => {
                iter.next();
                in_block_comment = true;
            }
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_string && !in_block_comment
}

fn run_file(path: &str, runtime_config: &RuntimeConfig) -> Result<ExitCode> {
    let contents = fs::read_to_string(path).with_context(|| format!("could not read '{}'", path))?;
    Ok(if run(&contents, runtime_config) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// Prints the program's output, then the error if there was one. Returns false on error.
fn run(source: &str, runtime_config: &RuntimeConfig) -> bool {
    let execution = mrt::execute_with_config(source, runtime_config);

    for line in &execution.output {
        println!("{}", line);
    }

    match execution.error {
        Some(ref e) => {
            eprint!("{}", diagnostics::render_error(source, e));
            false
        }
        None => true,
    }
}
