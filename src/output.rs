use std::io::{self, Write};

/// Line the model is told to print after its output.
pub const SENTINEL: &str = "[END OF OUTPUT]";

fn is_sentinel(line: &str) -> bool {
    line.trim() == SENTINEL
}

/// Splits a complete response into lines and drops the final sentinel line,
/// along with any blank lines trailing it. Without a final sentinel every
/// line is kept.
pub fn strip_sentinel(response: &str) -> Vec<String> {
    let mut lines: Vec<String> = response.lines().map(String::from).collect();

    let last_text = lines.iter().rposition(|l| !l.trim().is_empty());
    if let Some(index) = last_text.filter(|&i| is_sentinel(&lines[i])) {
        lines.truncate(index);
    }

    lines
}

/// Writes streamed text through to `out` one completed line at a time.
/// The sentinel line and everything after it are swallowed.
pub struct LineFilter<'a> {
    out: &'a mut (dyn Write + Send),
    pending: Vec<u8>,
    lines: Vec<String>,
    done: bool,
}

impl<'a> LineFilter<'a> {
    pub fn new(out: &'a mut (dyn Write + Send)) -> Self {
        Self {
            out,
            pending: Vec::new(),
            lines: Vec::new(),
            done: false,
        }
    }

    /// Emits a trailing partial line, if any, and returns every line shown.
    pub fn finish(mut self) -> io::Result<Vec<String>> {
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line)?;
        }
        self.out.flush()?;
        Ok(self.lines)
    }

    fn emit(&mut self, raw: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(raw);
        let line = text.strip_suffix('\r').unwrap_or(&*text);

        if is_sentinel(line) {
            self.done = true;
            return Ok(());
        }

        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        self.lines.push(line.to_string());
        Ok(())
    }
}

impl Write for LineFilter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if self.done {
                break;
            }
            if byte == b'\n' {
                let line = std::mem::take(&mut self.pending);
                self.emit(&line)?;
            } else {
                self.pending.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_through(chunks: &[&str]) -> (String, Vec<String>) {
        let mut out: Vec<u8> = Vec::new();
        let mut filter = LineFilter::new(&mut out);
        for chunk in chunks {
            filter.write_all(chunk.as_bytes()).unwrap();
        }
        let lines = filter.finish().unwrap();
        (String::from_utf8(out).unwrap(), lines)
    }

    #[test]
    fn test_strip_removes_only_sentinel() {
        let response = format!("total 8\ndrwxr-xr-x 2 root root 4096 .\n{}\n", SENTINEL);

        assert_eq!(
            strip_sentinel(&response),
            vec!["total 8", "drwxr-xr-x 2 root root 4096 ."]
        );
    }

    #[test]
    fn test_strip_without_sentinel_keeps_everything() {
        assert_eq!(strip_sentinel("a\n\nb"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_strip_keeps_trailing_blanks_without_sentinel() {
        assert_eq!(strip_sentinel("a\n\n"), vec!["a", ""]);
        assert_eq!(strip_sentinel("\n\n"), vec!["", ""]);
    }

    #[test]
    fn test_strip_keeps_blank_output_lines() {
        let response = format!("\nfoo\n\n{}\n\n", SENTINEL);

        assert_eq!(strip_sentinel(&response), vec!["", "foo", ""]);
    }

    #[test]
    fn test_strip_sentinel_only() {
        assert!(strip_sentinel(SENTINEL).is_empty());
        assert!(strip_sentinel("").is_empty());
    }

    #[test]
    fn test_filter_emits_completed_lines() {
        let (out, lines) = stream_through(&["Linux serv", "er 6.8.0\nx86", "_64\n"]);

        assert_eq!(out, "Linux server 6.8.0\nx86_64\n");
        assert_eq!(lines, vec!["Linux server 6.8.0", "x86_64"]);
    }

    #[test]
    fn test_filter_stops_at_sentinel() {
        let sentinel = format!("\n{}\nleftover chatter\n", SENTINEL);
        let (out, lines) = stream_through(&["hello", &sentinel]);

        assert_eq!(out, "hello\n");
        assert_eq!(lines, vec!["hello"]);
    }

    #[test]
    fn test_filter_sentinel_split_across_chunks() {
        let (head, tail) = SENTINEL.split_at(4);
        let (out, lines) = stream_through(&["/root\n", head, tail]);

        assert_eq!(out, "/root\n");
        assert_eq!(lines, vec!["/root"]);
    }

    #[test]
    fn test_filter_flushes_partial_line() {
        let (out, lines) = stream_through(&["no newline"]);

        assert_eq!(out, "no newline\n");
        assert_eq!(lines, vec!["no newline"]);
    }

    #[test]
    fn test_filter_handles_crlf() {
        let (out, _) = stream_through(&[&format!("a\r\nb\r\n{}\r\n", SENTINEL)]);

        assert_eq!(out, "a\nb\n");
    }
}
