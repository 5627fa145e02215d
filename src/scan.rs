//! SQL text screening using nom.
//!
//! A shallow lexer that only knows enough SQLite to tell code apart from
//! string literals, quoted identifiers and comments. It backs two checks run
//! on every assembled query: no second statement after a `;`, and no text
//! longer than the configured limit.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_until, take_while},
    character::complete::{anychar, char, multispace1},
    combinator::{cut, recognize, value},
    multi::many0,
    sequence::{pair, preceded, terminated},
    IResult,
};
use tracing::warn;

use crate::error::{SqlError, SqlResult};

/// Lexical class of a slice of SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Whitespace or comment.
    Trivia,
    /// Statement terminator.
    Semicolon,
    /// `'...'` with `''` escapes.
    StringLiteral,
    /// `"..."` or `` `...` `` with doubled escapes, or `[...]`.
    QuotedIdent,
    /// Anything else.
    Code,
}

/// A token with its position in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("--"), take_while(|c: char| c != '\n')))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(preceded(tag("/*"), cut(pair(take_until("*/"), tag("*/")))))(input)
}

/// Text between two `delim`s, where a doubled `delim` is an escape.
fn quoted(delim: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input: &str| {
        let escape = recognize(pair(char(delim), char(delim)));
        let body = take_till1(move |c: char| c == delim);
        recognize(preceded(
            char(delim),
            cut(terminated(many0(alt((escape, body))), char(delim))),
        ))(input)
    }
}

/// `[name]`; brackets have no escape.
fn bracketed(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        char('['),
        cut(pair(take_while(|c: char| c != ']'), char(']'))),
    ))(input)
}

fn code(input: &str) -> IResult<&str, &str> {
    alt((
        take_till1(|c: char| c.is_whitespace() || matches!(c, ';' | '\'' | '"' | '`' | '[' | '-' | '/')),
        recognize(anychar),
    ))(input)
}

fn token(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::Trivia, multispace1),
        value(TokenKind::Trivia, line_comment),
        value(TokenKind::Trivia, block_comment),
        value(TokenKind::StringLiteral, quoted('\'')),
        value(TokenKind::QuotedIdent, quoted('"')),
        value(TokenKind::QuotedIdent, quoted('`')),
        value(TokenKind::QuotedIdent, bracketed),
        value(TokenKind::Semicolon, char(';')),
        value(TokenKind::Code, code),
    ))(input)
}

fn unterminated(rest: &str) -> SqlError {
    let what = if rest.starts_with('\'') {
        "string literal"
    } else if rest.starts_with(['"', '`', '[']) {
        "quoted identifier"
    } else {
        "block comment"
    };
    SqlError::UnterminatedLiteral(what)
}

/// Split SQL text into lexemes.
pub fn lex(sql: &str) -> SqlResult<Vec<Lexeme<'_>>> {
    let mut out = Vec::new();
    let mut rest = sql;
    while !rest.is_empty() {
        let offset = sql.len() - rest.len();
        let (next, kind) = token(rest).map_err(|_| unterminated(rest))?;
        out.push(Lexeme {
            kind,
            text: &rest[..rest.len() - next.len()],
            offset,
        });
        rest = next;
    }
    Ok(out)
}

/// Byte offset of the first token of a second statement, if any.
///
/// A trailing `;` followed only by whitespace or comments is fine.
pub fn find_stacked_statement(sql: &str) -> SqlResult<Option<usize>> {
    let mut ended = false;
    for lexeme in lex(sql)? {
        match lexeme.kind {
            TokenKind::Trivia => {}
            TokenKind::Semicolon => ended = true,
            _ if ended => return Ok(Some(lexeme.offset)),
            _ => {}
        }
    }
    Ok(None)
}

/// Number of `?` placeholders outside literals and comments.
pub fn count_placeholders(sql: &str) -> SqlResult<usize> {
    Ok(lex(sql)?
        .iter()
        .filter(|l| l.kind == TokenKind::Code)
        .map(|l| l.text.matches('?').count())
        .sum())
}

/// Reject text that is too long or carries a stacked statement.
pub fn screen(sql: &str, max_len: usize) -> SqlResult<()> {
    if sql.len() > max_len {
        warn!(len = sql.len(), max = max_len, "rejected oversized query");
        return Err(SqlError::QueryTooLong {
            len: sql.len(),
            max: max_len,
        });
    }
    if let Some(offset) = find_stacked_statement(sql)? {
        warn!(offset, "rejected stacked query");
        return Err(SqlError::StackedQuery { offset });
    }
    Ok(())
}
