//! Tokenizer built on winnow combinators

use pi_expr_ast::ItemRef;
use pi_expr_diagnostics::{ErrorCode, ExpressionError, Result, Span};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use winnow::ascii::{digit1, multispace0, space0};
use winnow::combinator::{alt, cut_err, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_till, take_while};

/// Input type for the lexer
pub(crate) type Input<'a> = &'a str;

/// Parser result type
pub(crate) type PResult<O> = winnow::ModalResult<O>;

/// Token kinds of the expression language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(Decimal),
    String(String),
    Boolean(bool),
    Identifier(String),
    /// `#{..}`, `A{..}`, `C{..}`, `PS_EVENTDATE:..` and unsupported `X{..}` forms
    Item(ItemRef),
    /// `V{name}`
    Variable(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    EqualEqual,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    /// `!` or `not`
    Not,
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    LeftParen,
    RightParen,
    Comma,
    Colon,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Identifier(name) => write!(f, "{name}"),
            Self::Item(item) => write!(f, "{item}"),
            Self::Variable(name) => write!(f, "V{{{name}}}"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Percent => write!(f, "%"),
            Self::Caret => write!(f, "^"),
            Self::EqualEqual => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
            Self::Greater => write!(f, ">"),
            Self::GreaterEqual => write!(f, ">="),
            Self::Less => write!(f, "<"),
            Self::LessEqual => write!(f, "<="),
            Self::Not => write!(f, "!"),
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Colon => write!(f, ":"),
        }
    }
}

/// A token with its byte span in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Split an expression into tokens, skipping whitespace
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut input: Input<'_> = source;
    let mut tokens = Vec::new();

    loop {
        ws(&mut input).ok();
        if input.is_empty() {
            break;
        }

        let start = source.len() - input.len();
        match token(&mut input) {
            Ok(kind) => {
                let end = source.len() - input.len();
                tokens.push(Token::new(kind, Span::new(start, end)));
            }
            Err(_) => return Err(lex_error(source, start)),
        }
    }

    Ok(tokens)
}

/// Classify a failed token start into a positioned syntax error
fn lex_error(source: &str, start: usize) -> ExpressionError {
    let rest = &source[start..];
    let to_end = Span::new(start, source.len());

    if rest.starts_with(['\'', '"']) {
        return ExpressionError::syntax(ErrorCode::UnterminatedString, "Unterminated string literal", source, to_end);
    }

    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        return ExpressionError::syntax(
            ErrorCode::InvalidNumber,
            format!("Invalid number literal '{}'", &rest[..len]),
            source,
            Span::new(start, start + len),
        );
    }

    if is_reference_start(rest) {
        return match rest.find('}') {
            Some(close) => ExpressionError::syntax(
                ErrorCode::UnexpectedToken,
                format!("Malformed reference '{}'", &rest[..=close]),
                source,
                Span::new(start, start + close + 1),
            ),
            None => ExpressionError::syntax(ErrorCode::UnclosedDelimiter, "Missing closing '}'", source, to_end),
        };
    }

    let ch = rest.chars().next().unwrap_or(' ');
    ExpressionError::syntax(
        ErrorCode::UnexpectedToken,
        format!("Unexpected character '{ch}'"),
        source,
        Span::new(start, start + ch.len_utf8()),
    )
}

fn is_reference_start(rest: &str) -> bool {
    if rest.starts_with("#{") || rest.starts_with("PS_EVENTDATE:") {
        return true;
    }
    let prefix_len = rest
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(rest.len());
    prefix_len > 0 && rest[prefix_len..].starts_with('{')
}

/// Skip whitespace
fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

fn token(input: &mut Input<'_>) -> PResult<TokenKind> {
    alt((
        event_date_reference,
        bracketed_reference,
        number,
        string_literal,
        comparison_operator,
        punctuation,
        word,
    ))
    .parse_next(input)
}

fn uid<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric()).parse_next(input)
}

/// `PS_EVENTDATE:stageUid`
fn event_date_reference(input: &mut Input<'_>) -> PResult<TokenKind> {
    preceded(("PS_EVENTDATE:", space0), cut_err(uid))
        .map(|stage: &str| {
            TokenKind::Item(ItemRef::EventDate {
                stage: stage.to_string(),
            })
        })
        .parse_next(input)
}

/// `#{stage.element}`, `A{uid}`, `C{uid}`, `V{name}` or any other upper-case prefix
fn bracketed_reference(input: &mut Input<'_>) -> PResult<TokenKind> {
    let prefix = alt(("#", take_while(1.., |c: char| c.is_ascii_uppercase()))).parse_next(input)?;
    '{'.parse_next(input)?;
    let body: &str = cut_err(take_till(0.., |c: char| c == '}' || c == '{')).parse_next(input)?;
    cut_err('}').parse_next(input)?;

    let body = body.trim();
    let kind = match prefix {
        "#" => {
            let (stage, element) = body.split_once('.').ok_or_else(malformed)?;
            let (stage, element) = (stage.trim(), element.trim());
            if !is_uid(stage) || !is_uid(element) {
                return Err(malformed());
            }
            TokenKind::Item(ItemRef::DataElement {
                stage: stage.to_string(),
                element: element.to_string(),
            })
        }
        "A" if is_uid(body) => TokenKind::Item(ItemRef::Attribute {
            attribute: body.to_string(),
        }),
        "C" if is_uid(body) => TokenKind::Item(ItemRef::Constant {
            constant: body.to_string(),
        }),
        "V" if is_variable_name(body) => TokenKind::Variable(body.to_string()),
        "A" | "C" | "V" => return Err(malformed()),
        other => TokenKind::Item(ItemRef::Other {
            prefix: other.to_string(),
            body: body.to_string(),
        }),
    };

    Ok(kind)
}

fn malformed() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

fn is_uid(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_variable_name(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decimal literal; scale is kept as written
fn number(input: &mut Input<'_>) -> PResult<TokenKind> {
    (digit1, opt(('.', digit1)))
        .take()
        .try_map(Decimal::from_str)
        .map(TokenKind::Number)
        .parse_next(input)
}

/// Single- or double-quoted string with backslash escapes
fn string_literal(input: &mut Input<'_>) -> PResult<TokenKind> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut value = String::new();

    loop {
        let next: PResult<char> = any.parse_next(input);
        match next {
            Ok(c) if c == quote => return Ok(TokenKind::String(value)),
            Ok('\\') => {
                let escaped: char = cut_err(any).parse_next(input)?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            Ok(c) => value.push(c),
            Err(_) => return Err(malformed()),
        }
    }
}

fn comparison_operator(input: &mut Input<'_>) -> PResult<TokenKind> {
    alt((
        "==".value(TokenKind::EqualEqual),
        "!=".value(TokenKind::NotEqual),
        ">=".value(TokenKind::GreaterEqual),
        "<=".value(TokenKind::LessEqual),
        "&&".value(TokenKind::And),
        "||".value(TokenKind::Or),
        '>'.value(TokenKind::Greater),
        '<'.value(TokenKind::Less),
        '!'.value(TokenKind::Not),
    ))
    .parse_next(input)
}

fn punctuation(input: &mut Input<'_>) -> PResult<TokenKind> {
    alt((
        '+'.value(TokenKind::Plus),
        '-'.value(TokenKind::Minus),
        '*'.value(TokenKind::Star),
        '/'.value(TokenKind::Slash),
        '%'.value(TokenKind::Percent),
        '^'.value(TokenKind::Caret),
        '('.value(TokenKind::LeftParen),
        ')'.value(TokenKind::RightParen),
        ','.value(TokenKind::Comma),
        ':'.value(TokenKind::Colon),
    ))
    .parse_next(input)
}

/// Identifiers and word operators (`and`, `or`, `not`, `true`, `false`)
fn word(input: &mut Input<'_>) -> PResult<TokenKind> {
    let text = (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)?;

    Ok(match text {
        "true" => TokenKind::Boolean(true),
        "false" => TokenKind::Boolean(false),
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        _ => TokenKind::Identifier(text.to_string()),
    })
}
