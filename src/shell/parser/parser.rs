use log::warn;
use thiserror::Error;

use super::ast::{Node, RedirectKind, Redirection, SimpleCommand};
use super::lexer::{Token, TokenKind};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("expected filename after redirection `{operator}`")]
pub struct ParseError {
    pub operator: RedirectKind,
    /// The tree built up to the point of failure.
    pub partial: Node,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn current_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).filter(|tok| !tok.is_end())
    }

    fn next_token(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Pipes fold to the left: `a | b | c` is `Pipe(Pipe(a, b), c)`.
    /// Other operators are consumed without effect on the tree.
    pub fn parse(&mut self) -> Result<Node, ParseError> {
        let mut left = match self.parse_simple_command() {
            Ok(cmd) => Node::Simple(cmd),
            Err((operator, cmd)) => {
                return Err(ParseError {
                    operator,
                    partial: Node::Simple(cmd),
                })
            }
        };

        while let Some(tok) = self.current_token() {
            if tok.kind != TokenKind::Operator {
                break;
            }
            self.next_token();

            if tok.text() != "|" {
                warn!("unsupported operator `{}` ignored", tok.text());
                continue;
            }

            match self.parse_simple_command() {
                Ok(right) => left = Node::pipe(left, Node::Simple(right)),
                Err((operator, right)) => {
                    return Err(ParseError {
                        operator,
                        partial: Node::pipe(left, Node::Simple(right)),
                    })
                }
            }
        }

        Ok(left)
    }

    fn parse_simple_command(&mut self) -> Result<SimpleCommand, (RedirectKind, SimpleCommand)> {
        let mut command = SimpleCommand::default();

        while let Some(tok) = self.current_token() {
            let kind = match tok.kind {
                TokenKind::Word => {
                    command.words.push(tok.text().to_string());
                    self.next_token();
                    continue;
                }
                TokenKind::RedirectIn => RedirectKind::Input,
                TokenKind::RedirectOut => RedirectKind::Output,
                TokenKind::RedirectAppend => RedirectKind::Append,
                _ => break,
            };

            match self.parse_redirection(kind) {
                Some(redirection) => command.redirects.push(redirection),
                None => return Err((kind, command)),
            }
        }

        Ok(command)
    }

    fn parse_redirection(&mut self, kind: RedirectKind) -> Option<Redirection> {
        self.next_token(); // skip the operator

        match self.current_token() {
            Some(tok) if tok.kind == TokenKind::Word => {
                let redirection = Redirection::new(kind, tok.text());
                self.next_token();
                Some(redirection)
            }
            _ => None,
        }
    }
}

pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    Parser::new(tokens).parse()
}
