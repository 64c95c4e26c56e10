use std::io::{self, Write};

use crate::error::{Error, Result};
use crate::language::Value;
use crate::runtime::Context;

/// Write `items` space separated.
fn write_items<W: Write>(out: &mut W, items: &[Value]) -> io::Result<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        out.write_all(item.to_display_string().as_bytes())?;
    }
    Ok(())
}

fn sequence_items(more: &Value) -> Result<Vec<Value>> {
    more.seq_items()
        .ok_or_else(|| Error::ExpectedSequence(more.to_string()))
}

impl Context {
    pub fn print(&self, o: &Value) -> Result<Value> {
        self.print_to(&mut io::stdout().lock(), o)
    }

    /// Print `o` followed by every element of the sequence `more`.
    pub fn print_more(&self, o: &Value, more: &Value) -> Result<Value> {
        self.print_more_to(&mut io::stdout().lock(), o, more)
    }

    /// Print every element of the sequence `more`, then a newline.
    pub fn println(&self, more: &Value) -> Result<Value> {
        self.println_to(&mut io::stdout().lock(), more)
    }

    pub fn print_to<W: Write>(&self, out: &mut W, o: &Value) -> Result<Value> {
        out.write_all(o.to_display_string().as_bytes())?;
        out.flush()?;
        Ok(Value::Nil)
    }

    pub fn print_more_to<W: Write>(&self, out: &mut W, o: &Value, more: &Value) -> Result<Value> {
        let mut items = vec![o.clone()];
        items.extend(sequence_items(more)?);
        write_items(out, &items)?;
        out.flush()?;
        Ok(Value::Nil)
    }

    pub fn println_to<W: Write>(&self, out: &mut W, more: &Value) -> Result<Value> {
        let items = sequence_items(more)?;
        write_items(out, &items)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(Value::Nil)
    }

    /// Debug listing of every namespace and var.
    pub fn dump(&self) -> Result<()> {
        self.dump_to(&mut io::stdout().lock())
    }

    /// Each line is rendered to a `String` before it reaches `out`, so no
    /// lock is held during the write.
    pub fn dump_to<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "context dump")?;
        for ns in self.namespaces() {
            let line = format!("  {}\n", ns.name());
            out.write_all(line.as_bytes())?;
            for var in ns.vars() {
                let line = match var.get_root() {
                    Some(root) => format!("    {var} = {root}\n"),
                    None => format!("    {var} = nil\n"),
                };
                out.write_all(line.as_bytes())?;
            }
        }
        out.flush()?;
        Ok(())
    }
}
