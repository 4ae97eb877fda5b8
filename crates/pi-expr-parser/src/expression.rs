//! Recursive descent parser over the token stream
//!
//! One function per precedence level, lowest first:
//! or, and, equality, relational, additive, multiplicative, unary, power, primary.

use crate::lexer::{Token, TokenKind};
use pi_expr_ast::{
    BinaryOp, BinaryOpExpr, Expression, FunctionCall, Literal, Spanned, UnaryOp, UnaryOpExpr,
};
use pi_expr_diagnostics::{ErrorCode, ExpressionError, Result, Span};

pub(crate) struct TokenParser<'t> {
    source: &'t str,
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t> TokenParser<'t> {
    pub(crate) fn new(source: &'t str, tokens: &'t [Token], max_depth: usize) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Parse a complete expression; trailing tokens are an error
    pub(crate) fn parse_root(&mut self) -> Result<Spanned<Expression>> {
        if self.tokens.is_empty() {
            return Err(self.error(ErrorCode::UnexpectedEnd, "Empty expression", Span::point(0)));
        }

        let expr = self.or_expression()?;

        if let Some(token) = self.peek() {
            return Err(self.error(
                ErrorCode::UnexpectedToken,
                format!("Unexpected token '{}'", token.kind),
                token.span,
            ));
        }

        Ok(expr)
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it has the given kind
    fn eat(&mut self, kind: &TokenKind) -> Option<&'t Token> {
        match self.peek() {
            Some(token) if &token.kind == kind => self.advance(),
            _ => None,
        }
    }

    fn end_span(&self) -> Span {
        Span::point(self.source.len())
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> ExpressionError {
        ExpressionError::syntax(code, message, self.source, span)
    }

    fn enter(&mut self, span: Span) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(
                ErrorCode::NestingTooDeep,
                format!("Expression nesting exceeds maximum depth of {}", self.max_depth),
                span,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Consume the operator of a left-associative chain. Every fold deepens the tree by
    /// one level and counts toward the depth limit until the chain ends.
    fn chain_operator(&mut self) -> Result<()> {
        match self.advance() {
            Some(token) => self.enter(token.span),
            None => Ok(()),
        }
    }

    fn binary(left: Spanned<Expression>, op: BinaryOp, right: Spanned<Expression>) -> Spanned<Expression> {
        let span = left.span.merge(right.span);
        Spanned::new(
            Expression::BinaryOp(BinaryOpExpr {
                left: Box::new(left),
                op,
                right: Box::new(right),
            }),
            span,
        )
    }

    /// Parse `||` / `or`
    fn or_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.depth;
        let mut left = self.and_expression()?;

        while matches!(self.peek_kind(), Some(TokenKind::Or)) {
            self.chain_operator()?;
            let right = self.and_expression()?;
            left = Self::binary(left, BinaryOp::Or, right);
        }

        self.depth = base;
        Ok(left)
    }

    /// Parse `&&` / `and`
    fn and_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.depth;
        let mut left = self.equality_expression()?;

        while matches!(self.peek_kind(), Some(TokenKind::And)) {
            self.chain_operator()?;
            let right = self.equality_expression()?;
            left = Self::binary(left, BinaryOp::And, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn equality_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.depth;
        let mut left = self.relational_expression()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqualEqual) => BinaryOp::Equal,
                Some(TokenKind::NotEqual) => BinaryOp::NotEqual,
                _ => break,
            };
            self.chain_operator()?;
            let right = self.relational_expression()?;
            left = Self::binary(left, op, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn relational_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.depth;
        let mut left = self.additive_expression()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::LessEqual) => BinaryOp::LessOrEqual,
                Some(TokenKind::GreaterEqual) => BinaryOp::GreaterOrEqual,
                Some(TokenKind::Less) => BinaryOp::Less,
                Some(TokenKind::Greater) => BinaryOp::Greater,
                _ => break,
            };
            self.chain_operator()?;
            let right = self.additive_expression()?;
            left = Self::binary(left, op, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn additive_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.depth;
        let mut left = self.multiplicative_expression()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.chain_operator()?;
            let right = self.multiplicative_expression()?;
            left = Self::binary(left, op, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn multiplicative_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.depth;
        let mut left = self.unary_expression()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Multiply,
                Some(TokenKind::Slash) => BinaryOp::Divide,
                Some(TokenKind::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.chain_operator()?;
            let right = self.unary_expression()?;
            left = Self::binary(left, op, right);
        }

        self.depth = base;
        Ok(left)
    }

    /// Parse prefix `!`, `not`, `-` and `+`
    fn unary_expression(&mut self) -> Result<Spanned<Expression>> {
        let op = match self.peek_kind() {
            Some(TokenKind::Not) => UnaryOp::Not,
            Some(TokenKind::Minus) => UnaryOp::Negate,
            Some(TokenKind::Plus) => UnaryOp::Plus,
            _ => return self.power_expression(),
        };

        let Some(op_token) = self.advance() else {
            return self.power_expression();
        };
        self.enter(op_token.span)?;
        let operand = self.unary_expression()?;
        self.leave();

        let span = op_token.span.merge(operand.span);
        Ok(Spanned::new(
            Expression::UnaryOp(UnaryOpExpr {
                op,
                operand: Box::new(operand),
            }),
            span,
        ))
    }

    /// Parse `^`, right-associative and tighter than unary minus
    fn power_expression(&mut self) -> Result<Spanned<Expression>> {
        let base = self.primary_expression()?;

        let Some(caret) = self.eat(&TokenKind::Caret) else {
            return Ok(base);
        };
        self.enter(caret.span)?;
        let exponent = self.unary_expression()?;
        self.leave();

        Ok(Self::binary(base, BinaryOp::Power, exponent))
    }

    fn primary_expression(&mut self) -> Result<Spanned<Expression>> {
        let Some(token) = self.advance() else {
            return Err(self.error(ErrorCode::UnexpectedEnd, "Unexpected end of expression", self.end_span()));
        };

        let expr = match &token.kind {
            TokenKind::Number(n) => Expression::Literal(Literal::Number(*n)),
            TokenKind::String(s) => Expression::Literal(Literal::String(s.clone())),
            TokenKind::Boolean(b) => Expression::Literal(Literal::Boolean(*b)),
            TokenKind::Item(item) => Expression::Item(item.clone()),
            TokenKind::Variable(name) => Expression::Variable(name.clone()),
            TokenKind::LeftParen => return self.group(token),
            TokenKind::Identifier(name) => return self.call_or_error(token, name),
            other => {
                return Err(self.error(
                    ErrorCode::ExpectedOperand,
                    format!("Expected expression, found '{other}'"),
                    token.span,
                ));
            }
        };

        Ok(Spanned::new(expr, token.span))
    }

    /// Parse the rest of a parenthesized group after `(`
    fn group(&mut self, open: &Token) -> Result<Spanned<Expression>> {
        self.enter(open.span)?;
        let inner = self.or_expression()?;
        self.leave();

        let close = self.expect_close(open)?;
        Ok(Spanned::new(
            Expression::Group(Box::new(inner)),
            open.span.merge(close.span),
        ))
    }

    fn expect_close(&mut self, open: &Token) -> Result<&'t Token> {
        if let Some(close) = self.eat(&TokenKind::RightParen) {
            return Ok(close);
        }
        match self.peek() {
            None => Err(self.error(ErrorCode::UnclosedDelimiter, "Missing closing ')'", open.span)),
            Some(token) => Err(self.error(
                ErrorCode::UnexpectedToken,
                format!("Expected ')' but found '{}'", token.kind),
                token.span,
            )),
        }
    }

    /// `ns:name(args)` or `name(args)`; anything else is a bare identifier
    fn call_or_error(&mut self, first: &'t Token, first_name: &str) -> Result<Spanned<Expression>> {
        let (namespace, name) = if self.eat(&TokenKind::Colon).is_some() {
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Identifier(name),
                    ..
                }) => (Some(first_name.to_string()), name.clone()),
                Some(token) => {
                    return Err(self.error(
                        ErrorCode::UnexpectedToken,
                        format!("Expected function name after '{first_name}:' but found '{}'", token.kind),
                        token.span,
                    ));
                }
                None => {
                    return Err(self.error(ErrorCode::UnexpectedEnd, "Unexpected end of expression", self.end_span()));
                }
            }
        } else {
            (None, first_name.to_string())
        };

        let Some(open) = self.eat(&TokenKind::LeftParen) else {
            return Err(self.error(
                ErrorCode::BareIdentifier,
                format!("Unexpected identifier '{first_name}'"),
                first.span,
            ));
        };

        self.enter(open.span)?;
        let (distinct, args) = self.arguments()?;
        self.leave();
        let close = self.expect_close(open)?;

        Ok(Spanned::new(
            Expression::FunctionCall(FunctionCall {
                namespace,
                name,
                distinct,
                args,
            }),
            first.span.merge(close.span),
        ))
    }

    /// Comma separated arguments, optionally led by `distinct`
    fn arguments(&mut self) -> Result<(bool, Vec<Spanned<Expression>>)> {
        let mut args = Vec::new();
        if matches!(self.peek_kind(), Some(TokenKind::RightParen)) {
            return Ok((false, args));
        }

        let distinct = match (self.peek_kind(), self.tokens.get(self.pos + 1).map(|t| &t.kind)) {
            (Some(TokenKind::Identifier(word)), next)
                if word == "distinct"
                    && !matches!(next, Some(TokenKind::LeftParen | TokenKind::Colon)) =>
            {
                self.advance();
                true
            }
            _ => false,
        };

        loop {
            args.push(self.or_expression()?);
            if self.eat(&TokenKind::Comma).is_none() {
                break;
            }
        }

        Ok((distinct, args))
    }
}

/// Move every span in the tree right by `offset` bytes
pub(crate) fn shift_spans(expr: Spanned<Expression>, offset: usize) -> Spanned<Expression> {
    let span = expr.span.shift(offset);
    let shift_box = |e: Box<Spanned<Expression>>| Box::new(shift_spans(*e, offset));

    let inner = match expr.inner {
        Expression::Group(inner) => Expression::Group(shift_box(inner)),
        Expression::BinaryOp(BinaryOpExpr { left, op, right }) => Expression::BinaryOp(BinaryOpExpr {
            left: shift_box(left),
            op,
            right: shift_box(right),
        }),
        Expression::UnaryOp(UnaryOpExpr { op, operand }) => Expression::UnaryOp(UnaryOpExpr {
            op,
            operand: shift_box(operand),
        }),
        Expression::FunctionCall(call) => Expression::FunctionCall(FunctionCall {
            args: call
                .args
                .into_iter()
                .map(|arg| shift_spans(arg, offset))
                .collect(),
            ..call
        }),
        leaf => leaf,
    };

    Spanned::new(inner, span)
}
