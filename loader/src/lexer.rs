//! Hand-rolled scanner for the restricted builder-expression language.
//!
//! The grammar is a flat sequence of chained method calls
//! (`field("email", Text).nullable().unique()`), not general-purpose source
//! text, so this scans by hand rather than composing `nom` combinators the
//! way `migrations/src/parser/combinators.rs` does for SQL statement
//! splitting in the teacher workspace — see DESIGN.md.

use erm_core::ErmError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Entity,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ErmError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != '"' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(ErmError::SchemaDiscovery {
                        message: "unterminated string literal".to_string(),
                        suggestion: None,
                    });
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text.parse().map_err(|_| ErmError::SchemaDiscovery {
                    message: format!("invalid numeric literal `{text}`"),
                    suggestion: None,
                })?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "entity" => tokens.push(Token::Entity),
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            other => {
                return Err(ErmError::SchemaDiscovery {
                    message: format!("unexpected character `{other}`"),
                    suggestion: None,
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_chained_call() {
        let tokens = tokenize(r#"field("email", Text).nullable().unique()"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("field".into()),
                Token::LParen,
                Token::Str("email".into()),
                Token::Comma,
                Token::Ident("Text".into()),
                Token::RParen,
                Token::Dot,
                Token::Ident("nullable".into()),
                Token::LParen,
                Token::RParen,
                Token::Dot,
                Token::Ident("unique".into()),
                Token::LParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(tokenize(r#"field("email)"#).is_err());
    }
}
