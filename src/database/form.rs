use std::{collections::HashMap, str::FromStr};

use potion::Error;
use serde_json::Value;

use super::error::TypeError;
use crate::constants::TRUTHY_VALUES;

pub type FormData = HashMap<String, Value>;

/// Loosely typed request parameters, as they arrive from a query string.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self {
            inner: query
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get_value<T>(&self, key: &str) -> Result<T, Error>
    where
        T: TryFrom<Value>,
    {
        match self.inner.get(key) {
            Some(value) => value
                .to_owned()
                .try_into()
                .map_err(|_e| TypeError::new("Invalid type conversion").into()),
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<T, Error>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(value) => match value {
                Value::String(v) => v
                    .trim()
                    .parse()
                    .map_err(|_e| TypeError::new("Invalid type conversion").into()),
                Value::Number(n) => n
                    .to_string()
                    .parse()
                    .map_err(|_e| TypeError::new("Invalid type conversion").into()),
                _ => Err(TypeError::new("Failed to parse value as str").into()),
            },
            None => Err(TypeError::new("Invalid key").into()),
        }
    }

    /// Missing keys are `Ok(None)`; present but malformed values are errors.
    pub fn get_optional_number<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: FromStr,
    {
        if !self.contains(key) {
            return Ok(None);
        }
        self.get_number(key).map(Some)
    }

    pub fn get_str(&self, key: &str) -> Result<String, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(v.to_string()),
                None => Err(TypeError::new("Invalid key")),
            },
            None => Err(TypeError::new("Invalid key")),
        }
    }

    /// `"true"`/`"1"` (any case) are true, every other present value is false.
    pub fn get_flag(&self, key: &str) -> Option<bool> {
        self.inner.get(key).map(|value| match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => TRUTHY_VALUES.contains(&s.to_lowercase().as_str()),
            _ => false,
        })
    }
}
