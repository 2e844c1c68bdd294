//! Minimal mmCIF tokenizer
//!
//! Only what is needed to walk `loop_` tables of model files: data names,
//! loop headers, bare and quoted values. Text fields are skipped as opaque
//! values.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::value,
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};

/// A CIF token borrowing from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `data_` block header
    DataBlock(&'a str),
    /// `loop_` keyword
    Loop,
    /// `_category.item` name including the leading underscore
    Name(&'a str),
    /// Any value (bare, quoted or text field); `.` and `?` are kept verbatim
    Value(&'a str),
}

impl<'a> Token<'a> {
    /// The value text, if this is a value token
    pub fn as_value(&self) -> Option<&'a str> {
        match self {
            Token::Value(v) => Some(v),
            _ => None,
        }
    }
}

fn skip_ws_comments(input: &str) -> IResult<&str, ()> {
    let (input, _) = many0(alt((
        value((), multispace1),
        value((), preceded(char('#'), not_line_ending)),
    )))(input)?;
    Ok((input, ()))
}

fn data_block(input: &str) -> IResult<&str, Token<'_>> {
    let (input, name) = preceded(tag("data_"), take_while(|c: char| !c.is_whitespace()))(input)?;
    Ok((input, Token::DataBlock(name)))
}

fn loop_keyword(input: &str) -> IResult<&str, Token<'_>> {
    value(Token::Loop, tag("loop_"))(input)
}

fn data_name(input: &str) -> IResult<&str, Token<'_>> {
    let start = input;
    let (input, _) = char('_')(input)?;
    let (input, rest) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((input, Token::Name(&start[..rest.len() + 1])))
}

fn quoted(input: &str) -> IResult<&str, Token<'_>> {
    let (input, content) = alt((
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
    ))(input)?;
    Ok((input, Token::Value(content)))
}

fn text_field(input: &str) -> IResult<&str, Token<'_>> {
    let (body, _) = char(';')(input)?;
    match body.find("\n;") {
        Some(end) => Ok((&body[end + 2..], Token::Value(&body[..end]))),
        None => Ok(("", Token::Value(body))),
    }
}

fn bare_value(input: &str) -> IResult<&str, Token<'_>> {
    let (input, text) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((input, Token::Value(text)))
}

/// Parse the next token, returning `None` at end of input
pub fn next_token(input: &str) -> IResult<&str, Option<Token<'_>>> {
    let (input, _) = skip_ws_comments(input)?;
    if input.is_empty() {
        return Ok((input, None));
    }

    let (input, token) = alt((data_block, loop_keyword, data_name, quoted, text_field, bare_value))(input)?;
    Ok((input, Some(token)))
}

/// Tokenize a whole document
///
/// Unparseable characters are skipped; model files in the wild are not
/// always strictly conforming.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut remaining = input;

    loop {
        match next_token(remaining) {
            Ok((_, None)) => break,
            Ok((rest, Some(token))) => {
                tokens.push(token);
                remaining = rest;
            }
            Err(_) => {
                let mut chars = remaining.chars();
                if chars.next().is_none() {
                    break;
                }
                remaining = chars.as_str();
            }
        }
    }

    tokens
}
