// ABOUTME: Encoding and parsing of KEY='value' state records.
// ABOUTME: Reads the POSIX shell subset needed to recover values byte-for-byte.

use std::iter::Peekable;
use std::str::Chars;

/// A record that could not be parsed, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    pub line: usize,
    pub message: String,
}

/// Whether `key` is usable as a shell variable name.
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Single-quote a value so a shell (or [`parse_entries`]) reads it back unchanged.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Encode one record, including the trailing newline.
pub fn encode_entry(key: &str, value: &str) -> String {
    format!("{}={}\n", key, quote(value))
}

/// Parse every record in `input`, in file order. Duplicate keys are returned as-is.
pub fn parse_entries(input: &str) -> Result<Vec<(String, String)>, CodecError> {
    Parser::new(input).parse()
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError {
            line: self.line,
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn parse(mut self) -> Result<Vec<(String, String)>, CodecError> {
        let mut entries = Vec::new();

        loop {
            while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            match self.chars.peek() {
                None => break,
                Some('#') => self.skip_line(),
                Some(_) => entries.push(self.record()?),
            }
        }

        Ok(entries)
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn record(&mut self) -> Result<(String, String), CodecError> {
        let mut key = self.word();
        if key == "export" && self.chars.peek().is_some_and(|c| *c == ' ' || *c == '\t') {
            while self.chars.peek().is_some_and(|c| *c == ' ' || *c == '\t') {
                self.bump();
            }
            key = self.word();
        }

        if !is_valid_key(&key) {
            return Err(self.error(format!("invalid key {:?}", key)));
        }
        if self.chars.peek() != Some(&'=') {
            return Err(self.error(format!("expected '=' after {}", key)));
        }
        self.bump();

        let value = self.value()?;
        self.end_of_record()?;
        Ok((key, value))
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn value(&mut self) -> Result<String, CodecError> {
        let mut value = String::new();

        while let Some(&c) = self.chars.peek() {
            match c {
                '\n' | ' ' | '\t' => break,
                '\'' => {
                    self.bump();
                    self.single_quoted(&mut value)?;
                }
                '"' => {
                    self.bump();
                    self.double_quoted(&mut value)?;
                }
                '\\' => {
                    self.bump();
                    match self.bump() {
                        // Line continuation.
                        Some('\n') => {}
                        Some(escaped) => value.push(escaped),
                        None => return Err(self.error("dangling backslash")),
                    }
                }
                _ => {
                    value.push(c);
                    self.bump();
                }
            }
        }

        Ok(value)
    }

    fn single_quoted(&mut self, value: &mut String) -> Result<(), CodecError> {
        let start = self.line;
        loop {
            match self.bump() {
                Some('\'') => return Ok(()),
                Some(c) => value.push(c),
                None => {
                    return Err(CodecError {
                        line: start,
                        message: "unterminated single quote".to_string(),
                    });
                }
            }
        }
    }

    fn double_quoted(&mut self, value: &mut String) -> Result<(), CodecError> {
        let start = self.line;
        loop {
            match self.bump() {
                Some('"') => return Ok(()),
                Some('\\') => match self.chars.peek() {
                    Some(&c @ ('"' | '\\' | '$' | '`')) => {
                        value.push(c);
                        self.bump();
                    }
                    Some('\n') => {
                        self.bump();
                    }
                    _ => value.push('\\'),
                },
                Some(c) => value.push(c),
                None => {
                    return Err(CodecError {
                        line: start,
                        message: "unterminated double quote".to_string(),
                    });
                }
            }
        }
    }

    fn end_of_record(&mut self) -> Result<(), CodecError> {
        while self.chars.peek().is_some_and(|c| *c == ' ' || *c == '\t') {
            self.bump();
        }
        match self.chars.peek() {
            None | Some('\n') => Ok(()),
            Some('#') => {
                self.skip_line();
                Ok(())
            }
            Some(&c) => Err(self.error(format!("unexpected {:?} after value", c))),
        }
    }
}
