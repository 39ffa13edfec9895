use std::fmt;

const MAX_NESTING: usize = 128;

/// Why a serialized passage list could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParseError {
    pub position: usize,
    pub reason: &'static str,
}

impl fmt::Display for ListParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.position)
    }
}

impl std::error::Error for ListParseError {}

/// Parses a JSON array or a Python list/tuple literal into passages.
///
/// Elements that are not strings (`None`, numbers, nested lists) become empty
/// passages so list length and rank positions are preserved.
pub fn parse_passage_list(raw: &str) -> Result<Vec<String>, ListParseError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[')
        && let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed)
    {
        return Ok(values
            .into_iter()
            .map(|value| match value {
                serde_json::Value::String(text) => text,
                _ => String::new(),
            })
            .collect());
    }

    let mut parser = LiteralParser::new(raw);
    parser.skip_whitespace();
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }

    match value {
        Literal::Sequence(items) => Ok(items
            .into_iter()
            .map(|item| match item {
                Literal::Text(text) => text,
                _ => String::new(),
            })
            .collect()),
        _ => Err(ListParseError {
            position: 0,
            reason: "value is not a list",
        }),
    }
}

enum Literal {
    Text(String),
    Sequence(Vec<Literal>),
    Scalar,
}

struct LiteralParser<'a> {
    chars: Vec<(usize, char)>,
    cursor: usize,
    depth: usize,
    source: &'a str,
}

impl<'a> LiteralParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().collect(),
            cursor: 0,
            depth: 0,
            source,
        }
    }

    fn at_end(&self) -> bool {
        self.cursor >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).map(|(_, ch)| *ch)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.cursor + offset).map(|(_, ch)| *ch)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.cursor += 1;
        }
        ch
    }

    fn position(&self) -> usize {
        self.chars
            .get(self.cursor)
            .map_or(self.source.len(), |(offset, _)| *offset)
    }

    fn error(&self, reason: &'static str) -> ListParseError {
        ListParseError {
            position: self.position(),
            reason,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.cursor += 1;
        }
    }

    fn parse_value(&mut self) -> Result<Literal, ListParseError> {
        match self.peek() {
            None => Err(self.error("empty value")),
            Some('[') => self.parse_sequence(']'),
            Some('(') => self.parse_sequence(')'),
            Some('\'' | '"') => self.parse_adjacent_strings(),
            Some(ch) if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '+' | '.') => {
                self.parse_bare_word()
            }
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn parse_sequence(&mut self, close: char) -> Result<Literal, ListParseError> {
        if self.depth == MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                self.depth -= 1;
                return Ok(Literal::Sequence(items));
            }

            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(ch) if ch == close => {
                    self.depth -= 1;
                    return Ok(Literal::Sequence(items));
                }
                Some(_) => {
                    self.cursor -= 1;
                    return Err(self.error("expected ',' or closing bracket"));
                }
                None => return Err(self.error("unterminated list")),
            }
        }
    }

    // Adjacent literals concatenate: 'a' "b" reads as "ab".
    fn parse_adjacent_strings(&mut self) -> Result<Literal, ListParseError> {
        let mut text = self.parse_string()?;
        loop {
            let resume = self.cursor;
            self.skip_whitespace();
            if matches!(self.peek(), Some('\'' | '"')) {
                text.push_str(&self.parse_string()?);
            } else {
                self.cursor = resume;
                return Ok(Literal::Text(text));
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ListParseError> {
        let Some(quote) = self.bump() else {
            return Err(self.error("expected string"));
        };
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.cursor += 2;
        }

        let mut out = String::new();
        loop {
            let Some(ch) = self.bump() else {
                return Err(self.error("unterminated string"));
            };
            match ch {
                '\\' => self.parse_escape(&mut out)?,
                _ if ch == quote && !triple => return Ok(out),
                _ if ch == quote && self.peek() == Some(quote) && self.peek_at(1) == Some(quote) => {
                    self.cursor += 2;
                    return Ok(out);
                }
                '\n' if !triple => return Err(self.error("line break inside string")),
                _ => out.push(ch),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ListParseError> {
        let Some(ch) = self.bump() else {
            return Err(self.error("dangling escape"));
        };
        match ch {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0'..='7' => out.push(self.parse_octal_escape(ch)),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '\n' => {}
            'x' => out.push(self.parse_hex_escape(2)?),
            'u' => out.push(self.parse_hex_escape(4)?),
            'U' => out.push(self.parse_hex_escape(8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    // Up to three octal digits; the first one is already consumed.
    fn parse_octal_escape(&mut self, first: char) -> char {
        let mut code = first.to_digit(8).unwrap_or_default();
        for _ in 0..2 {
            let Some(digit) = self.peek().and_then(|ch| ch.to_digit(8)) else {
                break;
            };
            self.cursor += 1;
            code = code * 8 + digit;
        }
        // At most 0o777, always a valid scalar value.
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, ListParseError> {
        let mut code = 0_u32;
        for _ in 0..digits {
            let digit = self
                .bump()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(|| self.error("invalid hex escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_bare_word(&mut self) -> Result<Literal, ListParseError> {
        let start = self.cursor;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '+' | '.' | '_'))
        {
            self.cursor += 1;
        }

        let word = self.chars[start..self.cursor]
            .iter()
            .map(|(_, ch)| *ch)
            .collect::<String>();
        let is_keyword = matches!(word.as_str(), "None" | "True" | "False");
        let is_number = word
            .starts_with(|ch: char| ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.'))
            && word.replace('_', "").parse::<f64>().is_ok();
        if is_keyword || is_number {
            Ok(Literal::Scalar)
        } else {
            self.cursor = start;
            Err(self.error("unknown bare word"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_passage_list;

    #[test]
    fn parses_python_list_with_mixed_quotes() {
        let raw = r#"['First passage.', "It's the second", 'escaped \'quote\'']"#;
        assert_eq!(
            parse_passage_list(raw).expect("valid list"),
            vec![
                "First passage.".to_string(),
                "It's the second".to_string(),
                "escaped 'quote'".to_string(),
            ]
        );
    }

    #[test]
    fn decodes_escape_sequences() {
        let raw = r"['line one\nline two', 'tab\there', 'caf\xe9', 'ñandú']";
        let passages = parse_passage_list(raw).expect("valid list");
        assert_eq!(passages[0], "line one\nline two");
        assert_eq!(passages[1], "tab\there");
        assert_eq!(passages[2], "café");
        assert_eq!(passages[3], "ñandú");
    }

    #[test]
    fn decodes_octal_and_control_escapes() {
        let raw = r"['a\012b', 'nul\0end', 'bell\a', '\b\f\v', '\1011']";
        let passages = parse_passage_list(raw).expect("valid list");
        assert_eq!(passages[0], "a\nb");
        assert_eq!(passages[1], "nul\0end");
        assert_eq!(passages[2], "bell\u{7}");
        assert_eq!(passages[3], "\u{8}\u{c}\u{b}");
        assert_eq!(passages[4], "A1");
    }

    #[test]
    fn parses_json_arrays() {
        let raw = r#"["a", "b\nc"]"#;
        assert_eq!(
            parse_passage_list(raw).expect("valid json"),
            vec!["a".to_string(), "b\nc".to_string()]
        );
    }

    #[test]
    fn accepts_empty_lists_tuples_and_trailing_commas() {
        assert!(parse_passage_list("[]").expect("empty list").is_empty());
        assert!(parse_passage_list("  [ ]  ").expect("padded empty").is_empty());
        assert_eq!(parse_passage_list("('a', 'b',)").expect("tuple").len(), 2);
        assert_eq!(parse_passage_list("['a',\n 'b',\n]").expect("multiline").len(), 2);
    }

    #[test]
    fn non_string_elements_keep_their_rank_slot() {
        let passages = parse_passage_list("['a', None, 3, ['nested'], 'b']").expect("valid list");
        assert_eq!(
            passages,
            vec![
                "a".to_string(),
                String::new(),
                String::new(),
                String::new(),
                "b".to_string(),
            ]
        );
    }

    #[test]
    fn concatenates_adjacent_and_triple_quoted_strings() {
        let raw = "['part one ' 'part two', '''multi\nline''']";
        assert_eq!(
            parse_passage_list(raw).expect("valid list"),
            vec!["part one part two".to_string(), "multi\nline".to_string()]
        );
    }

    #[test]
    fn rejects_malformed_cells() {
        for raw in [
            "",
            "   ",
            "nan",
            "'just a string'",
            "['unterminated",
            "['a' 'b'",
            "['a'] trailing",
            "['a', oops]",
            "{'a': 1}",
        ] {
            assert!(parse_passage_list(raw).is_err(), "should reject {raw:?}");
        }
    }

    #[test]
    fn deeply_nested_cell_is_rejected_without_overflow() {
        let depth = 100_000;
        let raw = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let error = parse_passage_list(&raw).expect_err("nesting beyond the limit");
        assert_eq!(error.reason, "nesting too deep");
        assert_eq!(error.position, 128);

        let tuples = format!("{}{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(
            parse_passage_list(&tuples).expect_err("nested tuples").reason,
            "nesting too deep"
        );
    }

    #[test]
    fn nesting_within_the_limit_still_parses() {
        let raw = format!("['a', {}{}]", "[".repeat(100), "]".repeat(100));
        assert_eq!(
            parse_passage_list(&raw).expect("shallow enough"),
            vec!["a".to_string(), String::new()]
        );
    }

    #[test]
    fn error_reports_byte_position() {
        let error = parse_passage_list("['a', oops]").expect_err("bare word");
        assert_eq!(error.position, 6);
        assert_eq!(error.to_string(), "unknown bare word at byte 6");
    }
}
