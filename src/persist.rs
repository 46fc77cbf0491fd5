//! The flat parameter file: one real number per line, no header.

use std::fmt;
use std::io::{self, BufRead, Write};

/// Why a parameter file was rejected.
#[derive(Debug)]
pub enum LoadFailure {
    Io(io::Error),
    Malformed { line: usize, text: String },
    NonFinite { line: usize },
    Count { expected: usize, got: usize },
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadFailure::Io(e) => write!(f, "io error: {e}"),
            LoadFailure::Malformed { line, text } => {
                write!(f, "line {line}: `{text}` is not a number")
            }
            LoadFailure::NonFinite { line } => write!(f, "line {line}: value is not finite"),
            LoadFailure::Count { expected, got } => write!(
                f,
                "expected {expected} values, found {got}; the topology probably differs from the saved model"
            ),
        }
    }
}

/// Writes every value on its own line.
///
/// `f64`'s `Display` output is the shortest string that parses back to the
/// same bits, so a write/read cycle is lossless.
pub fn write_values<'a, W, I>(writer: &mut W, values: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a f64>,
{
    for value in values {
        writeln!(writer, "{value}")?;
    }
    Ok(())
}

/// Reads exactly `expected` values. Blank lines are skipped.
pub fn read_values<R: BufRead>(reader: R, expected: usize) -> Result<Vec<f64>, LoadFailure> {
    let mut values = Vec::with_capacity(expected);
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(LoadFailure::Io)?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let value: f64 = text.parse().map_err(|_| LoadFailure::Malformed {
            line: index + 1,
            text: text.to_string(),
        })?;
        if !value.is_finite() {
            return Err(LoadFailure::NonFinite { line: index + 1 });
        }
        values.push(value);
    }
    if values.len() != expected {
        return Err(LoadFailure::Count {
            expected,
            got: values.len(),
        });
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_a_write_read_cycle() {
        let values = [0.1, -1.0 / 3.0, 5e-300, 0.0, 123456.789];
        let mut buf = Vec::new();
        write_values(&mut buf, &values).unwrap();
        let read = read_values(&buf[..], values.len()).unwrap();
        assert_eq!(read, values);
    }

    #[test]
    fn one_value_per_line() {
        let mut buf = Vec::new();
        write_values(&mut buf, &[1.5, -2.0]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1.5\n-2\n");
    }

    #[test]
    fn rejects_wrong_counts() {
        let text = "1\n2\n3\n";
        assert!(matches!(
            read_values(text.as_bytes(), 2),
            Err(LoadFailure::Count { expected: 2, got: 3 })
        ));
        assert!(matches!(
            read_values(text.as_bytes(), 4),
            Err(LoadFailure::Count { expected: 4, got: 3 })
        ));
    }

    #[test]
    fn rejects_garbage_and_non_finite() {
        assert!(matches!(
            read_values("1\nabc\n".as_bytes(), 2),
            Err(LoadFailure::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            read_values("NaN\n".as_bytes(), 1),
            Err(LoadFailure::NonFinite { line: 1 })
        ));
    }

    #[test]
    fn tolerates_trailing_blank_lines() {
        assert_eq!(read_values("1\n2\n\n\n".as_bytes(), 2).unwrap(), [1.0, 2.0]);
    }
}
