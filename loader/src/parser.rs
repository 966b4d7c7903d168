//! Recursive-descent parser over the token stream from [`crate::lexer`].

use crate::ast::{Call, Chain, EntityDef, Literal};
use crate::lexer::Token;
use erm_core::ErmError;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: &Token, context: &str) -> Result<(), ErmError> {
        match self.advance() {
            Some(t) if t == expected => Ok(()),
            Some(t) => Err(parse_err(format!(
                "expected {expected:?} {context}, found {t:?}"
            ))),
            None => Err(parse_err(format!(
                "expected {expected:?} {context}, found end of input"
            ))),
        }
    }

    fn parse_entities(&mut self) -> Result<Vec<EntityDef>, ErmError> {
        let mut entities = Vec::new();
        while self.peek().is_some() {
            entities.push(self.parse_entity()?);
        }
        Ok(entities)
    }

    fn parse_entity(&mut self) -> Result<EntityDef, ErmError> {
        self.expect(&Token::Entity, "to start an entity block")?;
        let name = match self.advance() {
            Some(Token::Ident(name)) => name.clone(),
            other => return Err(parse_err(format!("expected entity name, found {other:?}"))),
        };
        self.expect(&Token::LBrace, "after entity name")?;

        let mut statements = Vec::new();
        while !matches!(self.peek(), Some(Token::RBrace) | None) {
            statements.push(self.parse_chain(&name)?);
        }
        self.expect(&Token::RBrace, "to close entity block")?;

        Ok(EntityDef { name, statements })
    }

    fn parse_chain(&mut self, entity: &str) -> Result<Chain, EntityError> {
        let root = self.parse_call(entity)?;
        let mut calls = Vec::new();
        while matches!(self.peek(), Some(Token::Dot)) {
            self.advance();
            calls.push(self.parse_call(entity)?);
        }
        Ok(Chain { root, calls })
    }

    fn parse_call(&mut self, entity: &str) -> Result<Call, EntityError> {
        let method = match self.advance() {
            Some(Token::Ident(name)) => name.clone(),
            other => {
                return Err(parse_err(format!(
                    "entity `{entity}`: expected a method name, found {other:?}"
                )));
            }
        };
        self.expect(&Token::LParen, &format!("after `{method}`"))?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.parse_literal(entity, &method)?);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(&Token::RParen, &format!("to close `{method}(...)`"))?;
        Ok(Call { method, args })
    }

    fn parse_literal(&mut self, entity: &str, method: &str) -> Result<Literal, EntityError> {
        match self.advance() {
            Some(Token::Str(s)) => Ok(Literal::Str(s.clone())),
            Some(Token::Num(n)) => Ok(Literal::Num(*n)),
            Some(Token::Bool(b)) => Ok(Literal::Bool(*b)),
            Some(Token::Ident(id)) => {
                let mut full = id.clone();
                // Allow dotted references like `Post.author_id`.
                while matches!(self.peek(), Some(Token::Dot)) {
                    self.advance();
                    match self.advance() {
                        Some(Token::Ident(part)) => {
                            full.push('.');
                            full.push_str(part);
                        }
                        other => {
                            return Err(parse_err(format!(
                                "entity `{entity}`, method `{method}`: expected identifier after `.`, found {other:?}"
                            )));
                        }
                    }
                }
                Ok(Literal::Ident(full))
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !matches!(self.peek(), Some(Token::RBracket)) {
                    loop {
                        items.push(self.parse_literal(entity, method)?);
                        if matches!(self.peek(), Some(Token::Comma)) {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                }
                self.expect(&Token::RBracket, "to close array literal")?;
                Ok(Literal::Array(items))
            }
            other => Err(parse_err(format!(
                "entity `{entity}`, method `{method}`: unresolvable argument kind {other:?}"
            ))),
        }
    }
}

type EntityError = ErmError;

fn parse_err(message: String) -> ErmError {
    ErmError::SchemaDiscovery {
        message,
        suggestion: None,
    }
}

pub fn parse(source: &str) -> Result<Vec<EntityDef>, ErmError> {
    let tokens = crate::lexer::tokenize(source)?;
    Parser::new(&tokens).parse_entities()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_entity_with_fields_and_edges() {
        let src = r#"
            entity User {
                field("id", Uuid).primary()
                field("email", Text).unique()
                edge("posts", ToMany, "Post").inverse("author")
                index(["email"]).unique()
            }
        "#;
        let entities = parse(src).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "User");
        assert_eq!(entities[0].statements.len(), 4);
        assert_eq!(entities[0].statements[0].root.method, "field");
        assert_eq!(entities[0].statements[0].calls[0].method, "primary");
    }

    #[test]
    fn rejects_unknown_entity_name_token() {
        let src = "entity { field(\"id\", Uuid) }";
        assert!(parse(src).is_err());
    }

    #[test]
    fn parses_multiple_entities_in_one_file() {
        let src = r#"
            entity User { field("id", Uuid).primary() }
            entity Post { field("id", Uuid).primary() }
        "#;
        let entities = parse(src).unwrap();
        assert_eq!(entities.len(), 2);
    }
}
