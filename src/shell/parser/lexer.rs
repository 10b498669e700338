use thiserror::Error;

/// Operators in match priority order. Two-character operators come before
/// the one-character operators they start with.
const OPERATORS: [&str; 11] = ["||", "&&", ">>", "&", ";;", ";", "(", ")", "|", ">", "<"];

const METACHARACTERS: &str = "|&;()<> \t\n";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Word,
    #[allow(dead_code)]
    Reserved,
    Operator,
    RedirectIn,     // <
    RedirectOut,    // >
    RedirectAppend, // >>
    End,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub text: Option<String>,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(text: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            text: Some(text.into()),
            kind,
        }
    }

    pub fn word(text: impl Into<String>) -> Self {
        Self::new(text, TokenKind::Word)
    }

    pub fn end() -> Self {
        Self {
            text: None,
            kind: TokenKind::End,
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LexErrorKind {
    UnclosedQuote(char),
    UnexpectedChar(char),
}

/// A lexical error. `tokens` holds everything scanned before the error,
/// terminated by an end token.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("syntax error near {}", self.location())]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: usize,
    pub tokens: Vec<Token>,
}

impl LexError {
    pub fn location(&self) -> String {
        match self.kind {
            LexErrorKind::UnclosedQuote(quote) => {
                format!("unclosed quote `{}` at column {}", quote, self.position + 1)
            }
            LexErrorKind::UnexpectedChar(c) => {
                format!("unexpected `{}` at column {}", c.escape_default(), self.position + 1)
            }
        }
    }
}

pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\n'
}

pub fn is_metacharacter(c: char) -> bool {
    METACHARACTERS.contains(c)
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Scans the whole input. The returned sequence always ends with one end token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek_char() {
            if is_blank(c) {
                self.skip_blanks();
                continue;
            }

            let token = if is_quote(c) {
                self.read_quoted_word(c)
            } else if let Some(op) = self.match_operator() {
                Ok(self.read_operator(op))
            } else if !is_metacharacter(c) {
                Ok(self.read_word())
            } else {
                Err(LexErrorKind::UnexpectedChar(c))
            };

            match token {
                Ok(token) => tokens.push(token),
                Err(kind) => {
                    tokens.push(Token::end());
                    return Err(LexError {
                        kind,
                        position: self.pos,
                        tokens,
                    });
                }
            }
        }

        tokens.push(Token::end());
        Ok(tokens)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_blanks(&mut self) {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start_matches(is_blank).len();
        self.pos += skipped;
    }

    fn match_operator(&self) -> Option<&'static str> {
        let rest = self.rest();
        OPERATORS.iter().copied().find(|op| rest.starts_with(op))
    }

    fn read_operator(&mut self, op: &'static str) -> Token {
        self.pos += op.len();
        let kind = match op {
            ">>" => TokenKind::RedirectAppend,
            ">" => TokenKind::RedirectOut,
            "<" => TokenKind::RedirectIn,
            _ => TokenKind::Operator,
        };
        Token::new(op, kind)
    }

    fn read_word(&mut self) -> Token {
        let rest = self.rest();
        let len = rest.find(is_metacharacter).unwrap_or(rest.len());
        self.pos += len;
        Token::word(&rest[..len])
    }

    // Quoted text is taken verbatim: no escapes, no expansion.
    fn read_quoted_word(&mut self, quote: char) -> Result<Token, LexErrorKind> {
        let body = &self.rest()[quote.len_utf8()..];
        match body.find(quote) {
            Some(len) => {
                self.pos += quote.len_utf8() * 2 + len;
                Ok(Token::word(&body[..len]))
            }
            None => Err(LexErrorKind::UnclosedQuote(quote)),
        }
    }
}

pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(line).tokenize()
}
