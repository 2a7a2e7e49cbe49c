//! One JSON object per line, in both directions.

use std::io::{self, BufRead, Write};

use serde_json::{Map, Value};

/// A decoded request line. Always an object; the `type` field names the command.
pub type Request = Map<String, Value>;

/// Sink for result lines.
///
/// Handlers receive one so they can stream intermediate results (session
/// output) ahead of their final result.
pub trait Emit {
    fn emit(&mut self, result: &Value) -> io::Result<()>;
}

/// Collects results in memory.
impl Emit for Vec<Value> {
    fn emit(&mut self, result: &Value) -> io::Result<()> {
        self.push(result.clone());
        Ok(())
    }
}

/// Reads requests from a line-oriented stream.
#[derive(Debug)]
pub struct RequestReader<R> {
    reader: R,
    buf: Vec<u8>,
    line: u64,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }

    /// Next well-formed request, or `None` at end of input.
    ///
    /// Blank lines are skipped silently. Lines that are not UTF-8, not JSON, or
    /// not a JSON object are logged and skipped; no result is owed for them.
    pub fn next_request(&mut self) -> io::Result<Option<Request>> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let Ok(text) = std::str::from_utf8(&self.buf) else {
                tracing::warn!(line = self.line, "skipping request line that is not valid UTF-8");
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(request)) => return Ok(Some(request)),
                Ok(other) => {
                    tracing::warn!(line = self.line, found = json_kind(&other), "skipping request that is not a JSON object");
                }
                Err(err) => tracing::warn!(line = self.line, error = %err, "skipping malformed request line"),
            }
        }
    }
}

/// Writes each result as one line and flushes it.
#[derive(Debug)]
pub struct ResultWriter<W> {
    writer: W,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Emit for ResultWriter<W> {
    fn emit(&mut self, result: &Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, result)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn skips_what_cannot_be_a_request() {
        let input: &[u8] = b"{\"type\":\"a\"}\n\nnot json\n[1,2]\n\xff\xfe\n  {\"type\":\"b\"}  \n{\"type\":\"c\"}";
        let mut reader = RequestReader::new(input);
        let mut types = Vec::new();
        while let Some(request) = reader.next_request().unwrap() {
            types.push(request["type"].clone());
        }
        assert_eq!(types, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn writes_one_line_per_result() {
        let mut writer = ResultWriter::new(Vec::new());
        writer.emit(&json!({"success": true})).unwrap();
        writer.emit(&json!({"text": "two\nlines"})).unwrap();
        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "{\"success\":true}\n{\"text\":\"two\\nlines\"}\n");
    }
}
