use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

static EMPTY: Lazy<InternedStr> = Lazy::new(|| InternedStr::new(""));

/// A piece of text interned in the process-wide string interner.
///
/// Symbol and keyword components are stored this way so that comparing and
/// hashing them never touches the text itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InternedStr(DefaultSymbol);

impl InternedStr {
    /// Intern a string and return its handle.
    pub fn new(s: &str) -> Self {
        // Most text is already interned once a program is loaded.
        if let Some(sym) = INTERNER.read().get(s) {
            return InternedStr(sym);
        }
        let mut interner = INTERNER.write();
        InternedStr(interner.get_or_intern(s))
    }

    /// The interned empty string.
    pub fn empty() -> Self {
        *EMPTY
    }

    pub fn is_empty(&self) -> bool {
        *self == *EMPTY
    }

    /// Resolve the handle back to an owned string.
    pub fn resolve(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Run `f` against the interned text without allocating.
    ///
    /// The interner lock is held while `f` runs, so `f` must not block or
    /// intern anything itself.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read();
        // Handles are only minted by `new`, so resolution cannot miss.
        f(interner.resolve(self.0).unwrap_or_default())
    }
}

// Formatting copies the text out first; the sink may be a blocking writer.
impl fmt::Display for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolve())
    }
}

impl fmt::Debug for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_same_string_returns_same_handle() {
        let a = InternedStr::new("foo");
        let b = InternedStr::new("foo");
        assert_eq!(a, b);
    }

    #[test]
    fn test_intern_different_strings_returns_different_handles() {
        assert_ne!(InternedStr::new("foo"), InternedStr::new("bar"));
    }

    #[test]
    fn test_resolve_returns_original_string() {
        assert_eq!(InternedStr::new("hello").resolve(), "hello");
    }

    #[test]
    fn test_empty() {
        assert!(InternedStr::new("").is_empty());
        assert!(InternedStr::empty().is_empty());
        assert!(!InternedStr::new("x").is_empty());
    }

    #[test]
    fn test_display_and_debug() {
        let s = InternedStr::new("display-test");
        assert_eq!(format!("{s}"), "display-test");
        assert_eq!(format!("{s:?}"), "\"display-test\"");
    }

    #[test]
    fn test_interning_while_formatter_sink_is_busy() {
        use std::fmt::Write;
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        // A sink that interns new text on another thread and waits for it
        // before accepting any output.
        struct Waiting;
        impl Write for Waiting {
            fn write_str(&mut self, _: &str) -> fmt::Result {
                let (tx, rx) = mpsc::channel();
                thread::spawn(move || {
                    let _ = tx.send(InternedStr::new("interned-during-write").resolve());
                });
                match rx.recv_timeout(Duration::from_secs(5)) {
                    Ok(text) if text == "interned-during-write" => Ok(()),
                    _ => Err(fmt::Error),
                }
            }
        }

        let s = InternedStr::new("busy-sink");
        let mut sink = Waiting;
        assert!(write!(sink, "{s}").is_ok());
        assert!(write!(sink, "{s:?}").is_ok());
    }
}
