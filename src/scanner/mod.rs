//! Lexical analysis for Uguisu source text.
//!
//! Turns a source string into a stream of positioned, classified tokens.
//! The scanner is pull-based: [`Scanner::new`] performs the initial scan
//! (`setup`) and materializes the first token; [`Scanner::advance`] moves
//! to the next one (`next`). Only a single token of lookahead is ever
//! exposed, which is all the parser's precedence climbing and suffix
//! chains need.

mod token;

pub use token::{LiteralKind, Token};

use std::fmt::{self, Display};

use log::{error, trace};

use crate::diagnostics::Pos;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
    pub position: Pos,
}

impl Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.position)
    }
}

impl std::error::Error for ScanError {}

pub type ScanResult<T> = Result<T, ScanError>;

fn keyword(word: &str, position: Pos) -> Option<Token> {
    Some(match word {
        "fn" => Token::Fn { position },
        "var" => Token::Var { position },
        "struct" => Token::Struct { position },
        "new" => Token::New { position },
        "return" => Token::Return { position },
        "if" => Token::If { position },
        "else" => Token::Else { position },
        "loop" => Token::Loop { position },
        "break" => Token::Break { position },
        "import" => Token::Import { position },
        "export" => Token::Export { position },
        "true" => Token::Literal {
            kind: LiteralKind::Bool,
            text: "true".to_owned(),
            position,
        },
        "false" => Token::Literal {
            kind: LiteralKind::Bool,
            text: "false".to_owned(),
            position,
        },
        _ => return None,
    })
}

/// Single-character and two-character punctuation. Two-character forms
/// are tried first by the caller, so this table only needs to resolve
/// whichever slice it is handed.
fn punctuation(text: &str, position: Pos) -> Option<Token> {
    Some(match text {
        "==" => Token::Eq2 { position },
        "!=" => Token::NotEq { position },
        "<=" => Token::LessThanEq { position },
        ">=" => Token::GreaterThanEq { position },
        "&&" => Token::And2 { position },
        "||" => Token::Or2 { position },
        "+=" => Token::AddAssign { position },
        "-=" => Token::SubAssign { position },
        "*=" => Token::MultAssign { position },
        "/=" => Token::DivAssign { position },
        "%=" => Token::ModAssign { position },
        "+" => Token::Plus { position },
        "-" => Token::Minus { position },
        "*" => Token::Asterisk { position },
        "/" => Token::Slash { position },
        "%" => Token::Percent { position },
        "{" => Token::BeginBrace { position },
        "}" => Token::EndBrace { position },
        "(" => Token::BeginParen { position },
        ")" => Token::EndParen { position },
        "[" => Token::BeginBracket { position },
        "]" => Token::EndBracket { position },
        "." => Token::Dot { position },
        "," => Token::Comma { position },
        ":" => Token::Colon { position },
        ";" => Token::Semi { position },
        "=" => Token::Assign { position },
        "<" => Token::LessThan { position },
        ">" => Token::GreaterThan { position },
        "!" => Token::Not { position },
        "|" => Token::Or { position },
        "&" => Token::And { position },
        _ => return None,
    })
}

const TWO_CHAR_PUNCTUATION: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "%=",
];

pub struct Scanner<'a> {
    source: &'a str,
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    token: Token,
}

impl<'a> Scanner<'a> {
    /// `setup(source)`: build a scanner over `source` and materialize its
    /// first token.
    pub fn new(source: &'a str) -> ScanResult<Self> {
        let mut scanner = Self {
            source,
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            token: Token::Eof {
                position: Pos::new(1, 1),
            },
        };
        scanner.token = scanner.scan_one().map_err(log_scan_error)?;
        Ok(scanner)
    }

    /// `next()`: advance past the current token. Reading past the end of
    /// input repeatedly yields `EOF`.
    pub fn advance(&mut self) -> ScanResult<()> {
        self.token = self.scan_one().map_err(log_scan_error)?;
        Ok(())
    }

    /// `getToken()`
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// `getPos()`
    pub fn pos(&self) -> Pos {
        self.token.position()
    }

    /// `getIdentValue()`
    pub fn ident_value(&self) -> Option<&str> {
        match &self.token {
            Token::Ident { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// `getLiteralValue()`
    pub fn literal_value(&self) -> Option<(LiteralKind, &str)> {
        match &self.token {
            Token::Literal { kind, text, .. } => Some((*kind, text.as_str())),
            _ => None,
        }
    }

    fn here(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else if c != '\r' {
            self.column += 1;
        }
        Some(c)
    }

    fn eat_whitespace_and_comments(&mut self) -> ScanResult<()> {
        loop {
            match self.peek() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.here();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => {
                                return Err(ScanError {
                                    message: "unexpected EOF".to_owned(),
                                    position: start,
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_one(&mut self) -> ScanResult<Token> {
        self.eat_whitespace_and_comments()?;

        let position = self.here();

        let Some(c) = self.peek() else {
            return Ok(Token::Eof { position });
        };

        let token = match c {
            '0'..='9' => Ok(self.scan_number(position)),
            c if is_word_start(c) => Ok(self.scan_word(position)),
            '"' => self.scan_string(position),
            '\'' => self.scan_char(position),
            _ => self.scan_punctuation(position),
        };
        if let Ok(token) = &token {
            trace!("scanned {} at {position}", token.describe());
        }
        token
    }

    fn scan_number(&mut self, position: Pos) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Token::Literal {
            kind: LiteralKind::Number,
            text,
            position,
        }
    }

    fn scan_word(&mut self, position: Pos) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_word_char(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        keyword(&text, position).unwrap_or(Token::Ident {
            name: text,
            position,
        })
    }

    fn scan_string(&mut self, position: Pos) -> ScanResult<Token> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ScanError {
                        message: "unexpected EOF".to_owned(),
                        position,
                    })
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    let escape_pos = self.here();
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('r') => text.push('\r'),
                        Some('t') => text.push('\t'),
                        _ => {
                            return Err(ScanError {
                                message: "invalid special character".to_owned(),
                                position: escape_pos,
                            })
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Ok(Token::Literal {
            kind: LiteralKind::String,
            text,
            position,
        })
    }

    fn scan_char(&mut self, position: Pos) -> ScanResult<Token> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ScanError {
                        message: "unexpected EOF".to_owned(),
                        position,
                    })
                }
                Some('\'') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    let escape_pos = self.here();
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('r') => text.push('\r'),
                        Some('t') => text.push('\t'),
                        _ => {
                            return Err(ScanError {
                                message: "invalid special character".to_owned(),
                                position: escape_pos,
                            })
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Ok(Token::Literal {
            kind: LiteralKind::Char,
            text,
            position,
        })
    }

    fn scan_punctuation(&mut self, position: Pos) -> ScanResult<Token> {
        let c = self.peek().expect("scan_punctuation called at EOF");
        if let Some(next) = self.peek_at(1) {
            let two: String = [c, next].iter().collect();
            if TWO_CHAR_PUNCTUATION.contains(&two.as_str()) {
                self.bump();
                self.bump();
                return Ok(punctuation(&two, position).expect("checked membership above"));
            }
        }

        let one = c.to_string();
        match punctuation(&one, position) {
            Some(token) => {
                self.bump();
                Ok(token)
            }
            None => Err(ScanError {
                message: format!("invalid character: {c}"),
                position,
            }),
        }
    }

    /// The original source this scanner was constructed over.
    pub fn source(&self) -> &'a str {
        self.source
    }
}

fn log_scan_error(err: ScanError) -> ScanError {
    error!("{err}");
    err
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(source: &str) -> Vec<Token> {
        let mut scanner = Scanner::new(source).expect("scan should succeed");
        let mut tokens = vec![scanner.token().clone()];
        loop {
            scanner.advance().expect("scan should succeed");
            let done = matches!(scanner.token(), Token::Eof { .. });
            tokens.push(scanner.token().clone());
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn scans_identifier() {
        let tokens = scan_all("letter");
        assert!(matches!(&tokens[0], Token::Ident { name, .. } if name == "letter"));
    }

    #[test]
    fn scans_number() {
        let tokens = scan_all("1337");
        assert!(matches!(
            &tokens[0],
            Token::Literal { kind: LiteralKind::Number, text, .. } if text == "1337"
        ));
    }

    #[test]
    fn prefers_two_char_operators() {
        let tokens = scan_all("a == b");
        assert!(matches!(tokens[1], Token::Eq2 { .. }));
    }

    #[test]
    fn keywords_are_not_identifiers() {
        let tokens = scan_all("fn loop break");
        assert!(matches!(tokens[0], Token::Fn { .. }));
        assert!(matches!(tokens[1], Token::Loop { .. }));
        assert!(matches!(tokens[2], Token::Break { .. }));
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = scan_all("a\nbb");
        assert_eq!(tokens[0].position(), Pos::new(1, 1));
        assert_eq!(tokens[1].position(), Pos::new(2, 1));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let tokens = scan_all("// hi\na /* mid */ b");
        assert!(matches!(&tokens[0], Token::Ident { name, .. } if name == "a"));
        assert!(matches!(&tokens[1], Token::Ident { name, .. } if name == "b"));
    }

    #[test]
    fn string_literal_handles_known_escapes() {
        let tokens = scan_all("\"a\\nb\"");
        assert!(matches!(
            &tokens[0],
            Token::Literal { kind: LiteralKind::String, text, .. } if text == "a\nb"
        ));
    }

    #[test]
    fn string_literal_rejects_unknown_escape() {
        let err = Scanner::new("\"a\\qb\"").and_then(|mut s| {
            loop {
                s.advance()?;
                if matches!(s.token(), Token::Eof { .. }) {
                    break;
                }
            }
            Ok(())
        });
        assert!(err.is_err());
    }

    #[test]
    fn unterminated_string_fails() {
        let result = Scanner::new("\"abc");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_character_fails() {
        let result = Scanner::new("@");
        assert!(result.is_err());
    }

    #[test]
    fn scanner_totality_always_reaches_eof() {
        for src in ["", "   ", "1 + 2", "fn main() {}", "// only a comment"] {
            let tokens = scan_all(src);
            assert!(matches!(tokens.last().unwrap(), Token::Eof { .. }));
        }
    }
}
