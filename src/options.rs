//! Runtime and command-line options.
//!
//! Defaults can be overridden from the environment (`LOAM_PRELUDE`,
//! `LOAM_MACROEXPAND_LIMIT`) and then from command-line flags.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_MACROEXPAND_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Options {
    /// Explicit prelude file; otherwise it's found next to the executable.
    pub prelude_path: Option<PathBuf>,
    pub load_prelude: bool,
    /// Upper bound on `macroexpand` steps for a single form.
    pub macroexpand_limit: usize,
    /// Expressions given with `-e`, evaluated in order before any file.
    pub eval: Vec<String>,
    pub filename: Option<PathBuf>,
    /// Print the registry after running.
    pub dump: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            prelude_path: None,
            load_prelude: true,
            macroexpand_limit: DEFAULT_MACROEXPAND_LIMIT,
            eval: Vec::new(),
            filename: None,
            dump: false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(path) = env::var_os("LOAM_PRELUDE") {
            options.prelude_path = Some(PathBuf::from(path));
        }
        if let Some(limit) = env::var("LOAM_MACROEXPAND_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            options.macroexpand_limit = limit;
        }
        options
    }

    pub fn with_prelude_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prelude_path = Some(path.into());
        self
    }

    pub fn with_macroexpand_limit(mut self, limit: usize) -> Self {
        self.macroexpand_limit = limit;
        self
    }
}

pub const USAGE: &str = "\
Usage: loam [options] [file]

With no file and no -e, starts an interactive REPL.

Options:
  -h, --help                  Print this help message
  -e, --eval <expr>           Evaluate an expression (repeatable)
  --prelude <path>            Load the prelude from <path>
  --no-prelude                Don't load the prelude
  --macroexpand-limit <n>     Give up on macroexpansion after n steps (default: 10000)
  --dump                      Print every namespace and var before exiting";

/// Parse command-line flags on top of `Options::from_env`.
/// Returns `Ok(None)` when help was requested.
pub fn parse() -> Result<Option<Options>, String> {
    parse_from(pico_args::Arguments::from_env())
}

pub fn parse_from(mut args: pico_args::Arguments) -> Result<Option<Options>, String> {
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let mut options = Options::from_env();

    if let Some(path) = args
        .opt_value_from_str::<_, PathBuf>("--prelude")
        .map_err(|e| e.to_string())?
    {
        options.prelude_path = Some(path);
    }
    if args.contains("--no-prelude") {
        options.load_prelude = false;
    }
    if let Some(limit) = args
        .opt_value_from_str::<_, usize>("--macroexpand-limit")
        .map_err(|e| e.to_string())?
    {
        options.macroexpand_limit = limit;
    }
    options.dump = args.contains("--dump");
    options.eval = args
        .values_from_str::<_, String>(["-e", "--eval"])
        .map_err(|e| e.to_string())?;
    options.filename = args
        .opt_free_from_str::<PathBuf>()
        .map_err(|e| e.to_string())?;

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(format!("unexpected arguments: {rest:?}"));
    }

    Ok(Some(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn args(list: &[&str]) -> pico_args::Arguments {
        pico_args::Arguments::from_vec(list.iter().map(OsString::from).collect())
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert!(options.load_prelude);
        assert_eq!(options.macroexpand_limit, DEFAULT_MACROEXPAND_LIMIT);
        assert!(options.prelude_path.is_none());
    }

    #[test]
    fn test_help() {
        assert!(parse_from(args(&["--help"])).unwrap().is_none());
    }

    #[test]
    fn test_flags() {
        let options = parse_from(args(&[
            "--no-prelude",
            "--macroexpand-limit",
            "7",
            "-e",
            "(+ 1 2)",
            "--eval",
            "(+ 3 4)",
            "--dump",
            "main.clj",
        ]))
        .unwrap()
        .unwrap();
        assert!(!options.load_prelude);
        assert_eq!(options.macroexpand_limit, 7);
        assert_eq!(options.eval, vec!["(+ 1 2)", "(+ 3 4)"]);
        assert!(options.dump);
        assert_eq!(options.filename, Some(PathBuf::from("main.clj")));
    }

    #[test]
    fn test_bad_limit() {
        assert!(parse_from(args(&["--macroexpand-limit", "many"])).is_err());
    }
}
