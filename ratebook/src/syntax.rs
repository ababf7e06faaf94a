//! Parser for `MARKER = [ Ctor(name=value, ...), ... ]` listings embedded in source files.

use std::collections::HashSet;

use crate::error::{RatebookError, Result};
use crate::listing::{Layout, Listing, RawRecord};
use crate::literal::Literal;

/// Parses the listing anchored at `marker` out of `source`.
///
/// Text before the marker line and after the closing bracket is kept verbatim, as is the text
/// between records.
pub(crate) fn parse_listing(source: &str, marker: &str) -> Result<Listing> {
    let (marker_start, body_start) =
        find_marker(source, marker, 0).ok_or_else(|| RatebookError::MissingMarker {
            marker: marker.to_owned(),
        })?;

    let mut cursor = Cursor::new(source, body_start);
    cursor.rest_of_line();
    let opening = source[marker_start..cursor.pos].to_owned();
    let (records, closing) = cursor.listing_body()?;
    let epilogue_start = cursor.pos;

    if let Some((duplicate, _)) = find_marker(source, marker, epilogue_start) {
        let (line, _) = position(source, duplicate);
        return Err(RatebookError::DuplicateMarker {
            marker: marker.to_owned(),
            line,
        });
    }

    tracing::debug!(records = records.len(), marker, "parsed listing");

    Ok(Listing {
        preamble: source[..marker_start].to_owned(),
        marker: marker.to_owned(),
        opening,
        records,
        closing,
        epilogue: source[epilogue_start..].to_owned(),
    })
}

/// Finds the first line at or after `from` that opens the listing.
///
/// Returns the byte offset of the marker and the offset just past the `[`.
fn find_marker(source: &str, marker: &str, from: usize) -> Option<(usize, usize)> {
    let mut line_start = from;
    for line in source[from..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if let Some(after) = line[indent..].strip_prefix(marker) {
            let rest = after.trim_start();
            let separated = rest.len() < after.len() || rest.starts_with('=');
            if separated {
                if let Some(value) = rest.strip_prefix('=') {
                    let value_trimmed = value.trim_start();
                    if value_trimmed.starts_with('[') {
                        let bracket = line.len() - value_trimmed.len();
                        return Some((line_start + indent, line_start + bracket + 1));
                    }
                }
            }
        }
        line_start += line.len();
    }
    None
}

/// Converts a byte offset into a 1-based line and column.
fn position(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, pos: usize) -> Self {
        Self { source, pos }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> RatebookError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> RatebookError {
        let (line, column) = position(self.source, offset);
        RatebookError::syntax(line, column, message)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(ch) if ch == expected => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected `{expected}`, found `{ch}`"))),
            None => Err(self.error(format!("expected `{expected}`, found end of file"))),
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        let rest = &self.source[self.pos..];
        self.pos += rest.find('\n').unwrap_or(rest.len());
    }

    /// Consumes blanks and a comment up to and including the end of the current line.
    ///
    /// Stops early, before any other content found on the line.
    fn rest_of_line(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '#' => self.skip_comment(),
                '\n' => {
                    self.bump();
                    return;
                }
                _ => return,
            }
        }
    }

    /// Parses records up to and including the closing `]`, returning them with the text before `]`.
    fn listing_body(&mut self) -> Result<(Vec<RawRecord>, String)> {
        let mut records = Vec::new();

        loop {
            let gap_start = self.pos;
            self.skip_trivia();
            match self.peek() {
                None => return Err(self.error("unterminated listing, expected `]`")),
                Some(']') => {
                    let closing = self.source[gap_start..self.pos].to_owned();
                    self.bump();
                    return Ok((records, closing));
                }
                Some(_) => {}
            }

            let leading = self.source[gap_start..self.pos].to_owned();
            let start = self.pos;
            let (constructor, fields) = self.record()?;
            let end = self.pos;

            self.skip_trivia();
            let comma = match self.peek() {
                Some(',') => {
                    self.bump();
                    true
                }
                Some(']') => {
                    self.pos = end;
                    false
                }
                Some(ch) => return Err(self.error(format!("expected `,` or `]`, found `{ch}`"))),
                None => return Err(self.error("unterminated listing, expected `]`")),
            };
            self.rest_of_line();

            let layout = Layout {
                leading,
                source: self.source[start..end].to_owned(),
                separator: self.source[end..self.pos].to_owned(),
                comma,
            };
            records.push(RawRecord::parsed(constructor, fields, Some(layout)));

            if !comma {
                let gap_start = self.pos;
                self.skip_trivia();
                let closing = self.source[gap_start..self.pos].to_owned();
                self.expect(']')?;
                return Ok((records, closing));
            }
        }
    }

    fn record(&mut self) -> Result<(String, Vec<(String, Literal)>)> {
        let constructor = self.identifier()?;
        self.skip_trivia();
        self.expect('(')?;

        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
                break;
            }

            let name_start = self.pos;
            let name = self.identifier()?;
            if !seen.insert(name.clone()) {
                return Err(self.error_at(name_start, format!("duplicate field `{name}`")));
            }
            self.skip_trivia();
            self.expect('=')?;
            self.skip_trivia();
            let value = self.value()?;
            fields.push((name, value));

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(ch) => return Err(self.error(format!("expected `,` or `)`, found `{ch}`"))),
                None => return Err(self.error("unterminated record, expected `)`")),
            }
        }

        Ok((constructor, fields))
    }

    fn identifier(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {}
            Some(ch) => return Err(self.error(format!("expected identifier, found `{ch}`"))),
            None => return Err(self.error("expected identifier, found end of file")),
        }
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        Ok(self.source[start..self.pos].to_owned())
    }

    fn value(&mut self) -> Result<Literal> {
        match self.peek() {
            Some('"') | Some('\'') => self.string().map(Literal::String),
            Some('[') => self.list(),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '+' || ch == '.' => {
                self.number()
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let start = self.pos;
                let word = self.identifier()?;
                match word.as_str() {
                    "None" => Ok(Literal::None),
                    "True" => Ok(Literal::Bool(true)),
                    "False" => Ok(Literal::Bool(false)),
                    other => Err(self.error_at(start, format!("unsupported expression `{other}`"))),
                }
            }
            Some(ch) => Err(self.error(format!("expected a value, found `{ch}`"))),
            None => Err(self.error("expected a value, found end of file")),
        }
    }

    fn list(&mut self) -> Result<Literal> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Literal::List(items));
            }
            items.push(self.value()?);
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {
                    self.bump();
                    return Ok(Literal::List(items));
                }
                Some(ch) => return Err(self.error(format!("expected `,` or `]`, found `{ch}`"))),
                None => return Err(self.error("unterminated list, expected `]`")),
            }
        }
    }

    fn number(&mut self) -> Result<Literal> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }

        let mut is_float = false;
        let mut previous = None;
        while let Some(ch) = self.peek() {
            let accepted = match ch {
                '0'..='9' | '_' => true,
                '.' => {
                    is_float = true;
                    true
                }
                'e' | 'E' => {
                    is_float = true;
                    true
                }
                '+' | '-' => matches!(previous, Some('e') | Some('E')),
                _ => false,
            };
            if !accepted {
                break;
            }
            previous = Some(ch);
            self.bump();
        }

        let text: String = self.source[start..self.pos]
            .chars()
            .filter(|ch| *ch != '_')
            .collect();
        if is_float {
            text.parse::<f64>()
                .map(Literal::Float)
                .map_err(|_| self.error_at(start, format!("invalid number `{text}`")))
        } else {
            text.parse::<i64>()
                .map(Literal::Integer)
                .map_err(|_| self.error_at(start, format!("invalid integer `{text}`")))
        }
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();

        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error_at(start, "unterminated string")),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(ch) => out.push(ch),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let escape_start = self.pos - 1;
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(digit @ '0'..='7') => out.push(self.octal_escape(digit, escape_start)?),
            Some('x') => out.push(self.hex_escape(2, escape_start)?),
            Some('u') => out.push(self.hex_escape(4, escape_start)?),
            Some('U') => out.push(self.hex_escape(8, escape_start)?),
            Some('N') => {
                return Err(self.error_at(escape_start, "named unicode escapes are not supported"));
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(self.error_at(escape_start, "unterminated string")),
        }
        Ok(())
    }

    /// Up to three octal digits, the first already consumed.
    fn octal_escape(&mut self, first: char, escape_start: usize) -> Result<char> {
        let mut code = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|ch| ch.to_digit(8)) {
                Some(digit) => {
                    code = code * 8 + digit;
                    self.bump();
                }
                None => break,
            }
        }
        char::from_u32(code)
            .ok_or_else(|| self.error_at(escape_start, "escape is not a valid character"))
    }

    fn hex_escape(&mut self, digits: usize, escape_start: usize) -> Result<char> {
        let rest = &self.source[self.pos..];
        let hex = rest
            .get(..digits)
            .filter(|hex| hex.chars().all(|ch| ch.is_ascii_hexdigit()))
            .ok_or_else(|| self.error_at(escape_start, "truncated escape sequence"))?;
        let code = u32::from_str_radix(hex, 16)
            .map_err(|_| self.error_at(escape_start, "invalid escape sequence"))?;
        let ch = char::from_u32(code)
            .ok_or_else(|| self.error_at(escape_start, "escape is not a valid character"))?;
        self.pos += digits;
        Ok(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"from dataclasses import dataclass

CONFIG = [
    # primary tenant
    Files(
        client="acme",
        number1=None,
        rate=720,
        ratio=0.5,
        chargeable_call_types=['outbound call', "predictive dialer"],
    ),
    Files(client='beta', rate=-3, enabled=True),
]

print(len(CONFIG))
"#;

    #[test]
    fn parses_records_and_surrounding_text() -> Result<()> {
        let listing = parse_listing(SAMPLE, "CONFIG")?;
        assert_eq!(listing.preamble, "from dataclasses import dataclass\n\n");
        assert_eq!(listing.epilogue, "\n\nprint(len(CONFIG))\n");
        assert_eq!(listing.len(), 2);

        let first = &listing.records()[0];
        assert_eq!(first.constructor(), "Files");
        assert_eq!(first.comments().collect::<Vec<_>>(), ["# primary tenant"]);
        assert_eq!(first.get("number1"), Some(&Literal::None));
        assert_eq!(first.get("ratio"), Some(&Literal::Float(0.5)));
        assert_eq!(
            first.get("chargeable_call_types"),
            Some(&Literal::List(vec![
                Literal::String("outbound call".into()),
                Literal::String("predictive dialer".into()),
            ]))
        );

        let second = &listing.records()[1];
        assert_eq!(second.string_field("client"), Some("beta"));
        assert_eq!(second.get("rate"), Some(&Literal::Integer(-3)));
        assert_eq!(second.get("enabled"), Some(&Literal::Bool(true)));
        Ok(())
    }

    #[test]
    fn untouched_listing_renders_unchanged() -> Result<()> {
        let listing = parse_listing(SAMPLE, "CONFIG")?;
        assert_eq!(listing.render_source(), SAMPLE);
        Ok(())
    }

    #[test]
    fn escaped_strings_decode() -> Result<()> {
        let listing = parse_listing("CONFIG = [\n    F(a=\"x\\\"y\\\\z\\n\\x41\"),\n]\n", "CONFIG")?;
        assert_eq!(listing.records()[0].string_field("a"), Some("x\"y\\z\nA"));
        Ok(())
    }

    #[test]
    fn python_escapes_decode() -> Result<()> {
        let listing = parse_listing(
            "CONFIG = [F(a=\"\\012|\\0|\\101\\1011|\\U0001F600|\\a\\v\")]\n",
            "CONFIG",
        )?;
        assert_eq!(
            listing.records()[0].string_field("a"),
            Some("\n|\0|AA1|\u{1F600}|\u{07}\u{0b}")
        );
        Ok(())
    }

    #[test]
    fn named_escapes_are_rejected() {
        let err = parse_listing("CONFIG = [F(a=\"\\N{DASH}\")]\n", "CONFIG").unwrap_err();
        match err {
            RatebookError::Syntax { line, column, .. } => assert_eq!((line, column), (1, 16)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn text_around_records_is_kept() -> Result<()> {
        let source = "CONFIG = [  # all tenants\n    Files(client=\"alpha\"),  # billed via partner\n\n      Files(client=\"beta\"),\n    # retired\n]\n";
        let listing = parse_listing(source, "CONFIG")?;
        assert_eq!(listing.opening, "CONFIG = [  # all tenants\n");
        assert_eq!(listing.records()[0].trailing_comment(), Some("# billed via partner"));
        assert_eq!(listing.records()[1].comments().count(), 0);
        assert_eq!(listing.closing, "    # retired\n");
        assert_eq!(listing.render_source(), source);
        Ok(())
    }

    #[test]
    fn last_record_without_comma_renders_unchanged() -> Result<()> {
        let source = "CONFIG = [\n    F(a=1),\n    F(a=2)\n]\n";
        let listing = parse_listing(source, "CONFIG")?;
        assert_eq!(listing.render_source(), source);
        Ok(())
    }

    #[test]
    fn missing_marker_is_an_error() {
        let err = parse_listing("OTHER = [\n]\n", "CONFIG").unwrap_err();
        assert!(matches!(err, RatebookError::MissingMarker { .. }));
    }

    #[test]
    fn marker_prefix_does_not_match() {
        let err = parse_listing("CONFIG_OLD = [\n]\n", "CONFIG").unwrap_err();
        assert!(matches!(err, RatebookError::MissingMarker { .. }));
    }

    #[test]
    fn second_marker_is_rejected() {
        let err = parse_listing("CONFIG = [\n]\nCONFIG = [\n]\n", "CONFIG").unwrap_err();
        assert!(matches!(err, RatebookError::DuplicateMarker { line: 3, .. }));
    }

    #[test]
    fn syntax_errors_report_position() {
        let err = parse_listing("CONFIG = [\n    Files(client=\"a\" rate=1),\n]\n", "CONFIG").unwrap_err();
        match err {
            RatebookError::Syntax { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 22);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = parse_listing("CONFIG = [F(a=1, a=2)]\n", "CONFIG").unwrap_err();
        assert!(matches!(err, RatebookError::Syntax { .. }));
    }

    #[test]
    fn nested_parentheses_in_strings_are_fine() -> Result<()> {
        let listing = parse_listing("CONFIG = [F(a=\"(x), y\"), F(a=\"z\")]\n", "CONFIG")?;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.records()[0].string_field("a"), Some("(x), y"));
        Ok(())
    }
}
