//! Linear cursor over a command's flat token stream
//!
//! Command payloads are persisted as a flat array mixing bare literals and
//! `(kind, value)` dynamic pairs. Each command's decode knows its own layout;
//! the cursor only provides typed consumption with overrun checks.

use crate::dynamic::DynamicValue;
use crate::error::{Error, Result};
use serde_json::Value as Json;

pub struct Cursor<'a> {
    tokens: &'a [Json],
    index: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Json]) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn done(&self) -> bool {
        self.index >= self.tokens.len()
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.index)
    }

    fn next(&mut self) -> Result<&'a Json> {
        let token = self
            .tokens
            .get(self.index)
            .ok_or_else(|| Error::MalformedStream(format!("cursor overrun at {}", self.index)))?;
        self.index += 1;
        Ok(token)
    }

    pub fn next_i64(&mut self) -> Result<i64> {
        let token = self.next()?;
        token
            .as_i64()
            .or_else(|| token.as_f64().map(|f| f as i64))
            .ok_or_else(|| Error::MalformedStream(format!("expected integer, got {}", token)))
    }

    pub fn next_f64(&mut self) -> Result<f64> {
        let token = self.next()?;
        token
            .as_f64()
            .ok_or_else(|| Error::MalformedStream(format!("expected number, got {}", token)))
    }

    pub fn next_bool(&mut self) -> Result<bool> {
        let token = self.next()?;
        match token {
            Json::Bool(b) => Ok(*b),
            Json::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
            _ => Err(Error::MalformedStream(format!(
                "expected boolean, got {}",
                token
            ))),
        }
    }

    pub fn next_string(&mut self) -> Result<String> {
        let token = self.next()?;
        token
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedStream(format!("expected string, got {}", token)))
    }

    /// Consume a `(kind, value)` dynamic pair
    ///
    /// Vector kinds nest further pairs inline; custom structures and lists
    /// carry their body as a single object token.
    pub fn next_dynamic(&mut self) -> Result<DynamicValue> {
        let k = self.next_i64()?;
        match k {
            27 => {
                let x = self.next_dynamic()?;
                let y = self.next_dynamic()?;
                Ok(DynamicValue::Vector2(Box::new(x), Box::new(y)))
            }
            28 => {
                let x = self.next_dynamic()?;
                let y = self.next_dynamic()?;
                let z = self.next_dynamic()?;
                Ok(DynamicValue::Vector3(Box::new(x), Box::new(y), Box::new(z)))
            }
            29 => {
                let body = self.next()?;
                DynamicValue::from_json(&serde_json::json!({ "k": k, "customStructure": body }))
            }
            30 => {
                let body = self.next()?;
                DynamicValue::from_json(&serde_json::json!({ "k": k, "customList": body }))
            }
            _ => DynamicValue::from_kind_raw(k, self.next()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_consumption() {
        let tokens = vec![json!(4), json!(true), json!("go"), json!(3), json!(12)];
        let mut cursor = Cursor::new(&tokens);
        assert_eq!(cursor.next_i64().unwrap(), 4);
        assert!(cursor.next_bool().unwrap());
        assert_eq!(cursor.next_string().unwrap(), "go");
        assert_eq!(cursor.next_dynamic().unwrap(), DynamicValue::Number(12));
        assert!(cursor.done());
        assert!(cursor.next_i64().is_err());
    }

    #[test]
    fn test_vector_pairs_nest() {
        let tokens = vec![json!(27), json!(3), json!(1), json!(8), json!(5)];
        let mut cursor = Cursor::new(&tokens);
        assert_eq!(
            cursor.next_dynamic().unwrap(),
            DynamicValue::Vector2(
                Box::new(DynamicValue::Number(1)),
                Box::new(DynamicValue::Variable(5))
            )
        );
    }
}
