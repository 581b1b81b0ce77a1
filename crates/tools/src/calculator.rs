//! Calculator tool — evaluates arithmetic so the model does not have to.
//!
//! Supports `+ - * / % ^`, parentheses, unary signs, and decimal numbers.
//! `^` is right-associative and binds tighter than unary minus, so
//! `-2^2 == -4` and `2^3^2 == 512`.

use async_trait::async_trait;
use kangae_core::error::{ToolError, ValidationError};
use kangae_core::tool::{Tool, ToolInput};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub struct CalculatorTool;

#[derive(Debug, Deserialize)]
pub struct CalculatorInput {
    pub expression: String,
}

impl ToolInput for CalculatorInput {
    fn check(&self) -> Result<(), ValidationError> {
        if self.expression.trim().is_empty() {
            return Err(ValidationError("expression must not be empty".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    type Input = CalculatorInput;

    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "四則演算を評価するツール。+ - * / % ^ と括弧に対応。入力は数式。"
    }

    fn primary_parameter(&self) -> &str {
        "expression"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The arithmetic expression to evaluate, e.g. '(2 + 3) * 4'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn call(&self, input: CalculatorInput) -> Result<String, ToolError> {
        debug!(expression = %input.expression, "Evaluating expression");
        let value = evaluate(&input.expression).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "calculator".into(),
            reason: e.to_string(),
        })?;
        Ok(format_number(value))
    }
}

/// Render integers without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("missing closing parenthesis")]
    UnclosedParen,
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NotFinite,
    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Deepest nesting of parentheses, signs and exponents accepted.
pub const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let mut cursor = Cursor {
        chars: expr.chars().collect(),
        pos: 0,
        depth: 0,
    };
    cursor.skip_ws();
    if cursor.at_end() {
        return Err(CalcError::Empty);
    }

    let value = cursor.expr()?;
    cursor.skip_ws();
    if let Some(c) = cursor.peek() {
        return Err(CalcError::UnexpectedChar(c, cursor.pos));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

// ── Recursive descent over characters ─────────────────────────────────────

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    /// Active `unary` frames; every recursive path passes through `unary`.
    depth: usize,
}

impl Cursor {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Consume `op` if it is the next non-blank character.
    fn eat(&mut self, op: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // expr = term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.term()?;
        loop {
            if self.eat('+') {
                acc += self.term()?;
            } else if self.eat('-') {
                acc -= self.term()?;
            } else {
                return Ok(acc);
            }
        }
    }

    // term = unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut acc = self.unary()?;
        loop {
            if self.eat('*') {
                acc *= self.unary()?;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                acc /= rhs;
            } else if self.eat('%') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                acc %= rhs;
            } else {
                return Ok(acc);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    // unary = ('-' | '+') unary | power
    fn signed(&mut self) -> Result<f64, CalcError> {
        if self.eat('-') {
            return Ok(-self.unary()?);
        }
        if self.eat('+') {
            return self.unary();
        }
        self.power()
    }

    // power = primary ('^' unary)?
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.eat('^') {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary = NUMBER | '(' expr ')'
    fn primary(&mut self) -> Result<f64, CalcError> {
        if self.eat('(') {
            let value = self.expr()?;
            if !self.eat(')') {
                return Err(CalcError::UnclosedParen);
            }
            return Ok(value);
        }

        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if start == self.pos {
            return match self.peek() {
                Some(c) => Err(CalcError::UnexpectedChar(c, self.pos)),
                None => Err(CalcError::UnexpectedEnd),
            };
        }

        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse()
            .map_err(|_| CalcError::InvalidNumber(literal))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kangae_core::tool::{ToolArguments, ToolRegistry, dispatch, parse_arguments};

    #[test]
    fn precedence_and_parentheses() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("((1 + 2) * (3 + 4))").unwrap(), 21.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(evaluate("2^3^2").unwrap(), 512.0);
        assert_eq!(evaluate("-2^2").unwrap(), -4.0);
        assert_eq!(evaluate("2^-1").unwrap(), 0.5);
    }

    #[test]
    fn modulo_and_division() {
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
        assert_eq!(evaluate("10 / 4").unwrap(), 2.5);
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("1 % 0"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(evaluate(""), Err(CalcError::Empty));
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnclosedParen));
        assert_eq!(evaluate("2 $ 3"), Err(CalcError::UnexpectedChar('$', 2)));
        assert!(matches!(evaluate("1.2.3"), Err(CalcError::InvalidNumber(_))));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(evaluate(&nested(200)).unwrap(), 1.0);
        assert_eq!(evaluate(&nested(100_000)), Err(CalcError::TooDeep(MAX_DEPTH)));

        let signs = format!("{}1", "-".repeat(100_000));
        assert_eq!(evaluate(&signs), Err(CalcError::TooDeep(MAX_DEPTH)));
        let powers = format!("2{}", "^2".repeat(100_000));
        assert_eq!(evaluate(&powers), Err(CalcError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn formatting() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-2.0), "-2");
        assert!(format_number(10.0 / 3.0).starts_with("3.333"));
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(CalculatorTool);
        registry
    }

    #[tokio::test]
    async fn dispatch_with_json_arguments() {
        let args = parse_arguments(r#"{"expression": "10 / 2"}"#, "expression");
        assert_eq!(dispatch("calculator", &args, &registry()).await.unwrap(), "5");
    }

    #[tokio::test]
    async fn dispatch_with_bare_expression() {
        let args = parse_arguments("(2 + 3) * 4", "expression");
        assert_eq!(dispatch("calculator", &args, &registry()).await.unwrap(), "20");
    }

    #[tokio::test]
    async fn missing_expression_is_rejected() {
        let output = dispatch("calculator", &ToolArguments::new(), &registry())
            .await
            .unwrap();
        assert!(output.starts_with("Invalid arguments for calculator:"));
    }

    #[tokio::test]
    async fn evaluation_failure_is_a_tool_error() {
        let args = parse_arguments("1 / 0", "expression");
        let err = dispatch("calculator", &args, &registry()).await.unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn deep_nesting_is_a_tool_error() {
        let expression = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let args = parse_arguments(&expression, "expression");
        let err = dispatch("calculator", &args, &registry()).await.unwrap_err();
        assert!(err.to_string().contains("nested deeper than 256"));
    }
}
