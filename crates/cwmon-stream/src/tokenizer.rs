//! Reassembles arbitrarily split text chunks into complete line tokens.
//!
//! [`tokenize`] and [`flush`] are pure; [`LineAssembler`] owns the leftover
//! tail for one feed.

/// Reserved string that tells the output surface to reset.
pub const CLEAR_SENTINEL: &str = "::CLEAR::";

/// What a token asks the surface to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Render-ready content
    Line,
    /// Reset the surface; never rendered as content
    Control,
}

/// One render-ready unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogToken {
    pub text: String,
    pub kind: TokenKind,
}

impl LogToken {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TokenKind::Line,
        }
    }

    pub fn clear() -> Self {
        Self {
            text: CLEAR_SENTINEL.to_string(),
            kind: TokenKind::Control,
        }
    }

    pub fn is_control(&self) -> bool {
        self.kind == TokenKind::Control
    }
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens: Vec<LogToken>,
    /// Unterminated tail to prepend to the next chunk
    pub leftover: String,
}

fn is_sentinel(unit: &str) -> bool {
    unit.trim() == CLEAR_SENTINEL
}

/// Split `leftover + chunk` into completed lines.
///
/// Content not yet followed by `\n` is returned as the new leftover. A chunk
/// that is exactly the clear sentinel (ignoring whitespace) yields a single
/// control token and discards the leftover.
pub fn tokenize(leftover: &str, chunk: &str) -> Tokenized {
    if is_sentinel(chunk) {
        return Tokenized {
            tokens: vec![LogToken::clear()],
            leftover: String::new(),
        };
    }

    let mut buffer = String::with_capacity(leftover.len() + chunk.len());
    buffer.push_str(leftover);
    buffer.push_str(chunk);

    let mut tokens = Vec::new();
    let mut rest = buffer.as_str();
    while let Some(pos) = rest.find('\n') {
        let line = rest[..pos].strip_suffix('\r').unwrap_or(&rest[..pos]);
        if is_sentinel(line) {
            tokens.push(LogToken::clear());
        } else {
            tokens.push(LogToken::line(line));
        }
        rest = &rest[pos + 1..];
    }

    Tokenized {
        tokens,
        leftover: rest.to_string(),
    }
}

/// Emit the remaining tail as a final token, even if unterminated.
pub fn flush(leftover: &str) -> Vec<LogToken> {
    let tail = leftover.strip_suffix('\r').unwrap_or(leftover);
    if tail.is_empty() {
        Vec::new()
    } else if is_sentinel(tail) {
        vec![LogToken::clear()]
    } else {
        vec![LogToken::line(tail)]
    }
}

/// Per-feed tokenizer state.
#[derive(Debug, Clone, Default)]
pub struct LineAssembler {
    leftover: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the tokens it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<LogToken> {
        let Tokenized { tokens, leftover } = tokenize(&self.leftover, chunk);
        self.leftover = leftover;
        tokens
    }

    /// Emit and clear whatever tail is pending.
    pub fn flush(&mut self) -> Vec<LogToken> {
        let tokens = flush(&self.leftover);
        self.leftover.clear();
        tokens
    }

    /// Discard the tail without emitting it.
    pub fn reset(&mut self) {
        self.leftover.clear();
    }

    /// The unterminated tail.
    pub fn pending(&self) -> &str {
        &self.leftover
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[LogToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_split_mid_line() {
        let first = "[SYNC] snapshot PLEX watchlist: 12 items"; // 40 bytes, no newline
        assert_eq!(first.len(), 40);
        let out = tokenize("", first);
        assert!(out.tokens.is_empty());
        assert_eq!(out.leftover, first);

        let second = " (cached)\n";
        assert_eq!(second.len(), 10);
        let out = tokenize(&out.leftover, second);
        assert_eq!(out.tokens.len(), 1);
        assert_eq!(out.tokens[0].text, format!("{first} (cached)"));
        assert!(out.leftover.is_empty());
    }

    #[test]
    fn test_multiple_lines_and_crlf() {
        let out = tokenize("", "a\r\nb\nc");
        assert_eq!(texts(&out.tokens), vec!["a", "b"]);
        assert_eq!(out.leftover, "c");
    }

    #[test]
    fn test_empty_lines_are_tokens() {
        let out = tokenize("", "\n\n");
        assert_eq!(texts(&out.tokens), vec!["", ""]);
    }

    #[test]
    fn test_whole_chunk_sentinel_discards_leftover() {
        let out = tokenize("half a li", "  ::CLEAR::\n");
        assert_eq!(out.tokens, vec![LogToken::clear()]);
        assert!(out.leftover.is_empty());
    }

    #[test]
    fn test_sentinel_line_mid_chunk() {
        let out = tokenize("", "before\n::CLEAR::\nafter\n");
        assert_eq!(out.tokens.len(), 3);
        assert!(out.tokens[1].is_control());
        assert_eq!(out.tokens[2].text, "after");
    }

    #[test]
    fn test_sentinel_embedded_in_text_is_content() {
        let out = tokenize("", "saw ::CLEAR:: in a log\n");
        assert_eq!(out.tokens, vec![LogToken::line("saw ::CLEAR:: in a log")]);
    }

    #[test]
    fn test_flush() {
        assert!(flush("").is_empty());
        assert_eq!(flush("tail"), vec![LogToken::line("tail")]);
        assert_eq!(flush("::CLEAR::"), vec![LogToken::clear()]);
    }

    #[test]
    fn test_assembler_keeps_tail_between_pushes() {
        let mut assembler = LineAssembler::new();
        assert!(assembler.push("par").is_empty());
        assert_eq!(assembler.pending(), "par");
        assert_eq!(assembler.push("tial\nnext"), vec![LogToken::line("partial")]);
        assert_eq!(assembler.flush(), vec![LogToken::line("next")]);
        assert_eq!(assembler.pending(), "");
    }

    #[test]
    fn test_control_clears_unemitted_tail() {
        let mut assembler = LineAssembler::new();
        assembler.push("never finished");
        let tokens = assembler.push("::CLEAR::");
        assert_eq!(tokens, vec![LogToken::clear()]);
        assert!(assembler.flush().is_empty());
    }

    fn reassemble<'a>(chunks: impl IntoIterator<Item = &'a str>) -> String {
        let mut assembler = LineAssembler::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(assembler.push(chunk));
        }
        lines.extend(assembler.flush());
        assert!(lines.iter().all(|t| !t.is_control()));
        lines.into_iter().map(|t| t.text).collect::<Vec<_>>().join("\n")
    }

    /// Splits on char boundaries, `size` chars per chunk.
    fn chunked(input: &str, size: usize) -> Vec<String> {
        let chars: Vec<char> = input.chars().collect();
        chars.chunks(size).map(|c| c.iter().collect()).collect()
    }

    fn expected(input: &str) -> String {
        let normalized = input.replace("\r\n", "\n");
        normalized
            .strip_suffix('\n')
            .map(str::to_string)
            .unwrap_or(normalized)
    }

    const ROUND_TRIP_INPUTS: [&str; 5] = [
        "alpha\nbeta gamma\r\ndelta\nepsilon",
        "[SYNC] start\r\n[SYNC] plan +3 / -1\r\n[SYNC] done\r\n",
        "\n\nblank lines first\n\nand between\npartial tail",
        "✔ unicode ✔\r\nmore ▶ text\nunterminated ✔",
        "{\"event\":\"run:start\"}\n{\"event\":\"run:done\"}\n{\"event\":\"pl",
    ];

    #[test]
    fn test_round_trip_for_every_chunk_size() {
        for input in ROUND_TRIP_INPUTS {
            let len = input.chars().count();
            for size in 1..=len {
                let chunks = chunked(input, size);
                assert_eq!(
                    reassemble(chunks.iter().map(String::as_str)),
                    expected(input),
                    "input {input:?} chunk size {size}"
                );
            }
        }
    }

    #[test]
    fn test_round_trip_for_uneven_chunks() {
        let pattern = [1usize, 4, 2, 7, 3, 11];
        for input in ROUND_TRIP_INPUTS {
            let chars: Vec<char> = input.chars().collect();
            for shift in 0..pattern.len() {
                let mut chunks = Vec::new();
                let mut at = 0;
                let mut i = shift;
                while at < chars.len() {
                    let end = (at + pattern[i % pattern.len()]).min(chars.len());
                    chunks.push(chars[at..end].iter().collect::<String>());
                    at = end;
                    i += 1;
                }
                assert_eq!(
                    reassemble(chunks.iter().map(String::as_str)),
                    expected(input),
                    "input {input:?} shift {shift}"
                );
            }
        }
    }
}
