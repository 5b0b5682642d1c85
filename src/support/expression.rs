use crate::core::{DataError, Entity, Result, Value};

/// Pure evaluation of an attribute expression against a record.
///
/// Used for computed attributes and attribute-level validation expressions.
/// Implementations must not mutate the record or have side effects.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, entity: &Entity) -> Result<Value>;
}

/// Built-in evaluator for a small expression language:
///
/// - attribute references: `firstName`
/// - string literals: `'hello'`
/// - integer and float literals: `42`, `3.5`
/// - concatenation / addition with `+`
/// - comparisons with `=`, `!=`, `<`, `>` (yielding `Bool`)
///
/// A comparison splits the expression in two `+`-expressions; nesting and
/// parentheses are out of scope here.
#[derive(Debug, Default)]
pub struct SimpleEvaluator;

impl SimpleEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn eval_operand(&self, token: &str, entity: &Entity) -> Result<Value> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DataError::Expression("empty operand".to_string()));
        }
        if let Some(inner) = token.strip_prefix('\'') {
            let literal = inner.strip_suffix('\'').ok_or_else(|| {
                DataError::Expression(format!("unterminated string literal: {}", token))
            })?;
            return Ok(Value::Text(literal.to_string()));
        }
        if token == "null" {
            return Ok(Value::Null);
        }
        if token == "true" {
            return Ok(Value::Bool(true));
        }
        if token == "false" {
            return Ok(Value::Bool(false));
        }
        if let Ok(i) = token.parse::<i64>() {
            return Ok(Value::Int(i));
        }
        if let Ok(f) = token.parse::<f64>() {
            return Ok(Value::Float(f));
        }
        Ok(entity.get(token).cloned().unwrap_or(Value::Null))
    }

    fn eval_sum(&self, expression: &str, entity: &Entity) -> Result<Value> {
        let mut result: Option<Value> = None;
        for token in split_plus(expression) {
            let operand = self.eval_operand(&token, entity)?;
            result = Some(match result {
                None => operand,
                Some(acc) => combine(acc, operand)?,
            });
        }
        result.ok_or_else(|| DataError::Expression("empty expression".to_string()))
    }
}

/// Splits on `+` outside string literals.
fn split_plus(expression: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_literal = false;
    for ch in expression.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                current.push(ch);
            }
            '+' if !in_literal => {
                tokens.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    tokens.push(current);
    tokens
}

fn combine(left: Value, right: Value) -> Result<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (Value::Float(_), _) | (_, Value::Float(_))
            if left.is_numeric() && right.is_numeric() =>
        {
            // as_f64 is total for numeric values
            let a = left.as_f64().unwrap_or(0.0);
            let b = right.as_f64().unwrap_or(0.0);
            Ok(Value::Float(a + b))
        }
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        _ => Ok(Value::Text(format!("{}{}", left, right))),
    }
}

/// Finds the top-level comparison operator, if any.
fn find_comparison(expression: &str) -> Option<(usize, usize, &'static str)> {
    let bytes = expression.as_bytes();
    let mut in_literal = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_literal = !in_literal,
            b'!' if !in_literal && i + 1 < bytes.len() && bytes[i + 1] == b'=' => {
                return Some((i, 2, "!="));
            }
            b'=' if !in_literal => return Some((i, 1, "=")),
            b'<' if !in_literal => return Some((i, 1, "<")),
            b'>' if !in_literal => return Some((i, 1, ">")),
            _ => {}
        }
        i += 1;
    }
    None
}

impl ExpressionEvaluator for SimpleEvaluator {
    fn evaluate(&self, expression: &str, entity: &Entity) -> Result<Value> {
        if let Some((pos, len, op)) = find_comparison(expression) {
            let left = self.eval_sum(&expression[..pos], entity)?;
            let right = self.eval_sum(&expression[pos + len..], entity)?;
            let result = match op {
                "=" => left == right,
                "!=" => left != right,
                "<" => left.compare(&right)? == std::cmp::Ordering::Less,
                ">" => left.compare(&right)? == std::cmp::Ordering::Greater,
                _ => unreachable!(),
            };
            return Ok(Value::Bool(result));
        }
        self.eval_sum(expression, entity)
    }
}
