use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::analyze::{Analyzer, ExpressionType};
use crate::error::{Error, Result};
use crate::evaluate;
use crate::language::{Locals, Value};
use crate::parser::Parser;
use crate::runtime::Context;

/// Where the prelude sits relative to the directory holding the executable.
const PRELUDE_RELATIVE_PATH: &str = "../../src/clojure/core.clj";

impl Context {
    /// Read, analyze and evaluate every form in `code`, in order.
    ///
    /// Returns the value of the last form, or `None` when there were no forms.
    pub fn eval_string(&self, code: &str) -> Result<Option<Value>> {
        let mut analyzer = Analyzer::new(self);
        let mut ret = None;
        for form in Parser::new(self, code) {
            let expr = analyzer.analyze(&form?, ExpressionType::Statement)?;
            ret = Some(evaluate::eval(self, &expr, &Locals::new())?);
        }
        Ok(ret)
    }

    pub fn eval_file(&self, path: impl AsRef<Path>) -> Result<Option<Value>> {
        let path = path.as_ref();
        info!("loading {}", path.display());
        let code = fs::read_to_string(path).map_err(|source| Error::MapFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.eval_string(&code)
    }

    /// Load the bundled `clojure.core` source that defines what isn't native.
    pub fn eval_prelude(&self) -> Result<Option<Value>> {
        let path = self.prelude_path()?;
        self.eval_file(path)
    }

    pub fn prelude_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.options().prelude_path {
            return Ok(path.clone());
        }
        let exe = env::current_exe().map_err(Error::ProcessLocation)?;
        let dir = exe.parent().ok_or_else(|| {
            Error::ProcessLocation(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} has no parent directory", exe.display()),
            ))
        })?;
        Ok(dir.join(PRELUDE_RELATIVE_PATH))
    }
}
