//! CLI utilities for the livestatus client.
//!
//! The utilities present in this module can be used to create an
//! interactive query tool on top of a [`Session`](crate::Session).
use std::io::{self, BufRead, Write};

use crate::protocol::QueryResult;

/// Field delimiter used when printing results.
pub const OUTPUT_SEPARATOR: &str = ";";

/// Possible commands from a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Exit command `.exit`, or end of input.
    Exit,
    /// Statement lines, sent as they are.
    Statement(String),
}

/// Prompt user for a statement.
///
/// A statement spans every line up to the next blank line. A lone `.exit`
/// line or the end of input leaves.
pub fn prompt<R, W>(mut reader: R, mut writer: W) -> io::Result<Command>
where
    R: BufRead,
    W: Write,
{
    write!(&mut writer, "> ")?;
    writer.flush()?;

    let mut statement = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        match line.trim_end() {
            ".exit" if statement.is_empty() => return Ok(Command::Exit),
            "" if statement.is_empty() => continue,
            "" => break,
            l => {
                statement.push_str(l);
                statement.push('\n');
            }
        }
    }

    if statement.is_empty() {
        Ok(Command::Exit)
    } else {
        Ok(Command::Statement(statement))
    }
}

/// Writes keys then rows, one line each.
pub fn render<W: Write>(result: &QueryResult, mut writer: W) -> io::Result<()> {
    if !result.keys.is_empty() {
        writeln!(writer, "{}", result.keys.join(OUTPUT_SEPARATOR))?;
    }
    for row in &result.rows {
        writeln!(writer, "{}", row.join(OUTPUT_SEPARATOR))?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_prints_correctly() {
        let input = b".exit\n";
        let mut output = Vec::new();

        prompt(&input[..], &mut output).unwrap();

        let output = String::from_utf8(output).expect("not valid UTF-8");
        assert_eq!("> ", output);
    }

    #[test]
    fn prompt_reads_until_blank_line() {
        let input = b"\nGET hosts\nColumns: name\n\nGET services\n";
        let mut output = Vec::new();

        let res = prompt(&input[..], &mut output).unwrap();
        assert_eq!(
            Command::Statement("GET hosts\nColumns: name\n".to_string()),
            res
        );
    }

    #[test]
    fn prompt_end_of_input() {
        let mut output = Vec::new();

        assert_eq!(prompt(&b""[..], &mut output).unwrap(), Command::Exit);
        assert_eq!(
            prompt(&b"GET hosts"[..], &mut output).unwrap(),
            Command::Statement("GET hosts\n".to_string())
        );
    }

    #[test]
    fn render_rows() {
        let result = QueryResult {
            keys: vec!["name".into(), "state".into()],
            rows: vec![vec!["a".into(), "0".into()], vec!["b".into(), "1".into()]],
        };
        let mut output = Vec::new();

        render(&result, &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "name;state\na;0\nb;1\n");
    }
}
