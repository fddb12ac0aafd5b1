use std::fmt::Display;
use std::rc::Rc;

/// A snapshot of the scanner cursor.
///
/// `offset` counts characters from the start of the source, `line` is
/// 1-based and `column` is 0-based. The source text and file name are shared
/// so that cloning a position (which happens for every token and node) stays
/// cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub source: Rc<str>,
    pub file: Rc<str>,
}

impl Position {
    pub fn start(source: &str, file: &str) -> Self {
        Self { offset: 0, line: 1, column: 0, source: source.into(), file: file.into() }
    }

    /// Move past `current`, which is the character at `self.offset`.
    pub fn advance(&mut self, current: char) {
        self.offset += 1;
        if current == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column + 1)
    }
}

/// Half-open source range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start.clone(), other.end.clone())
    }

    /// Source text covered by the span.
    pub fn text(&self) -> String {
        self.start
            .source
            .chars()
            .skip(self.start.offset)
            .take(self.end.offset.saturating_sub(self.start.offset))
            .collect()
    }

    /// Render the covered lines with carets under the covered columns.
    pub fn underline(&self) -> String {
        let lines: Vec<&str> = self.start.source.split('\n').collect();
        let mut out = vec![];

        for line_no in self.start.line..=self.end.line.max(self.start.line) {
            let text = lines.get(line_no - 1).copied().unwrap_or("").trim_end_matches('\r');
            let text = text.replace('\t', " ");
            let width = text.chars().count();

            let col_start = if line_no == self.start.line { self.start.column } else { 0 };
            let col_end = if line_no == self.end.line { self.end.column } else { width };
            let carets = col_end.saturating_sub(col_start).max(1);

            out.push(format!("{text}\n{}{}", " ".repeat(col_start), "^".repeat(carets)));
        }

        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_of(source: &str, from: usize, to: usize) -> Span {
        let mut start = Position::start(source, "<test>");
        let chars: Vec<char> = source.chars().collect();
        for c in &chars[..from] {
            start.advance(*c);
        }
        let mut end = start.clone();
        for c in &chars[from..to] {
            end.advance(*c);
        }
        Span::new(start, end)
    }

    #[test]
    fn advance_tracks_lines_and_columns() {
        let span = span_of("ab\ncd", 0, 4);
        assert_eq!(span.end.line, 2);
        assert_eq!(span.end.column, 1);
        assert_eq!(span.end.offset, 4);
    }

    #[test]
    fn underline_single_line() {
        let span = span_of("int a = foo", 8, 11);
        assert_eq!(span.text(), "foo");
        assert_eq!(span.underline(), "int a = foo\n        ^^^");
    }

    #[test]
    fn underline_multiple_lines() {
        let span = span_of("a = (1 +\n 2)", 4, 12);
        assert_eq!(span.underline(), "a = (1 +\n    ^^^^\n 2)\n^^^");
    }

    #[test]
    fn underline_empty_span_has_one_caret() {
        let span = span_of("abc", 3, 3);
        assert_eq!(span.underline(), "abc\n   ^");
    }
}
