use std::path::PathBuf;
use std::process;

use log::{error, info};
use loam::{Context, Options, Parser, Value, options, register_stdlib};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

const HISTORY_FILE: &str = ".loam_history";

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HISTORY_FILE))
}

/// True when `input` stops partway through a form, so the REPL should keep
/// reading lines before evaluating.
fn is_incomplete(ctx: &Context, input: &str) -> bool {
    Parser::new(ctx, input).any(|form| form.is_err_and(|e| e.is_incomplete_input()))
}

fn repl(ctx: &Context) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to start line editor: {e}");
            process::exit(1);
        }
    };
    let history = history_path();
    if let Some(path) = &history {
        // A missing history file is normal on first run.
        let _ = rl.load_history(path);
    }

    println!("loam REPL");
    println!("Type expressions to evaluate, or Ctrl-D to quit");
    println!();

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() {
            match ctx.current_ns() {
                Ok(ns) => format!("{}=> ", ns.name()),
                Err(_) => "=> ".to_string(),
            }
        } else {
            "... ".to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                if is_incomplete(ctx, &buffer) {
                    continue;
                }

                let input = std::mem::take(&mut buffer);
                if input.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input.trim());

                match ctx.eval_string(&input) {
                    Ok(Some(result)) => println!("{result}"),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }

    if let Some(path) = &history
        && let Err(e) = rl.save_history(path)
    {
        info!("could not save history to {}: {e}", path.display());
    }
}

fn run(ctx: &Context, opts: &Options) -> loam::Result<Option<Value>> {
    let mut last = None;
    for expr in &opts.eval {
        last = ctx.eval_string(expr)?;
    }
    if let Some(filename) = &opts.filename {
        last = ctx.eval_file(filename)?;
    }
    Ok(last)
}

fn main() {
    env_logger::init();

    let opts = match options::parse() {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            println!("{}", options::USAGE);
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{}", options::USAGE);
            process::exit(2);
        }
    };

    let ctx = Context::with_options(opts.clone());
    register_stdlib(&ctx);
    if opts.load_prelude
        && let Err(e) = ctx.eval_prelude()
    {
        error!("failed to load prelude: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }

    if opts.eval.is_empty() && opts.filename.is_none() {
        repl(&ctx);
    } else {
        match run(&ctx, &opts) {
            Ok(Some(result)) => println!("{result}"),
            Ok(None) => {}
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }

    if opts.dump
        && let Err(e) = ctx.dump()
    {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
