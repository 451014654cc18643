//! Serialization of [`Value`]s back into Lua source.

use std::io::{self, Write};

use super::value::{Key, Table, Value};

const INDENT: &str = "\t";

/// Writes `name = <value>` followed by a newline.
///
/// Tables are written one field per line with tab indentation. Sequences are
/// written positionally, other tables with explicit `[key] =` fields.
pub fn write_assignment<W>(out: &mut W, name: &str, value: &Value) -> io::Result<()>
where
    W: Write + ?Sized,
{
    write!(out, "{name} = ")?;
    write_value(out, value, 0)?;
    writeln!(out)
}

pub fn write_value<W>(out: &mut W, value: &Value, depth: usize) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match value {
        Value::Nil => out.write_all(b"nil"),
        Value::Bool(b) => write!(out, "{b}"),
        Value::Int(i) => write!(out, "{i}"),
        Value::Float(f) => write_float(out, *f),
        Value::Str(s) => write_string(out, s),
        Value::Table(t) => write_table(out, t, depth),
    }
}

fn write_table<W>(out: &mut W, table: &Table, depth: usize) -> io::Result<()>
where
    W: Write + ?Sized,
{
    if table.is_empty() {
        return out.write_all(b"{}");
    }
    let positional = table.is_sequence();
    writeln!(out, "{{")?;
    for (key, value) in table.iter() {
        write!(out, "{}", INDENT.repeat(depth + 1))?;
        if !positional {
            write_key(out, key)?;
            out.write_all(b" = ")?;
        }
        write_value(out, value, depth + 1)?;
        writeln!(out, ",")?;
    }
    write!(out, "{}}}", INDENT.repeat(depth))
}

fn write_key<W>(out: &mut W, key: &Key) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match key {
        Key::Int(i) => write!(out, "[{i}]"),
        Key::Str(s) => {
            out.write_all(b"[")?;
            write_string(out, s)?;
            out.write_all(b"]")
        }
    }
}

fn write_float<W>(out: &mut W, f: f64) -> io::Result<()>
where
    W: Write + ?Sized,
{
    if f.is_nan() {
        out.write_all(b"(0/0)")
    } else if f.is_infinite() {
        out.write_all(if f > 0.0 { "math.huge" } else { "-math.huge" }.as_bytes())
    } else {
        // `{:?}` keeps a fractional part (`500.0`), so the value reads back as a float.
        write!(out, "{f:?}")
    }
}

fn write_string<W>(out: &mut W, s: &str) -> io::Result<()>
where
    W: Write + ?Sized,
{
    out.write_all(b"\"")?;
    for ch in s.chars() {
        match ch {
            '"' => out.write_all(b"\\\"")?,
            '\\' => out.write_all(b"\\\\")?,
            '\n' => out.write_all(b"\\n")?,
            '\r' => out.write_all(b"\\r")?,
            '\t' => out.write_all(b"\\t")?,
            c if c.is_ascii_control() => write!(out, "\\{:03}", u32::from(c))?,
            c => write!(out, "{c}")?,
        }
    }
    out.write_all(b"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua::parse_assignments;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_assignment(&mut buf, "x", value).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_layout() {
        let mut inner = Table::new();
        inner.push(500.0);
        inner.push(250.5);
        inner.push(99_i64);
        let mut outer = Table::new();
        outer.insert("all", Value::Int(1));
        outer.insert(2_i64, inner);
        outer.insert("empty", Table::new());

        assert_eq!(
            render(&Value::Table(outer)),
            "x = {\n\t[\"all\"] = 1,\n\t[2] = {\n\t\t500.0,\n\t\t250.5,\n\t\t99,\n\t},\n\t[\"empty\"] = {},\n}\n"
        );
    }

    #[test]
    fn test_string_escaping_reads_back() {
        let original = "say \"hi\"\\\n\u{1}ok";
        let text = render(&Value::from(original));
        let parsed = parse_assignments(&text).unwrap();
        assert_eq!(parsed[0].1, Value::from(original));
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(render(&Value::Float(f64::INFINITY)), "x = math.huge\n");
        assert_eq!(render(&Value::Float(f64::NAN)), "x = (0/0)\n");
    }
}
