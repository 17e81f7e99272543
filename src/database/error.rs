use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use potion::{Error, HtmlError};
use warp::reject::Rejection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug)]
pub struct QueryError {
    kind: QueryErrorKind,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: QueryErrorKind::Internal,
            info,
        }
    }

    pub fn conflict(info: String) -> Self {
        Self {
            kind: QueryErrorKind::Conflict,
            info,
        }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::conflict(format!("Already exists ({})", e.constraint().unwrap_or("unique")))
            }
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
                Self::conflict(format!("Referenced row does not exist ({e})"))
            }
            sqlx::Error::Database(e) if e.is_check_violation() => {
                Self::conflict(format!("Value out of range ({e})"))
            }
            sqlx::Error::RowNotFound => Self {
                kind: QueryErrorKind::NotFound,
                info: String::from("RowNotFound"),
            },
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

/// `map_err` adapter for sqlx calls inside actions.
pub fn query_error(value: sqlx::Error) -> Error {
    QueryError::from(value).into()
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Into<Error> for QueryError {
    fn into(self) -> Error {
        match self.kind {
            QueryErrorKind::Conflict => HtmlError::InvalidRequest.new(&self.info),
            QueryErrorKind::NotFound => not_found(&self.info),
            QueryErrorKind::Internal => {
                log::error!("Query failed: {}", self.info);
                Error {
                    code: 500,
                    info: Some(self.info),
                    redirect: None,
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Into<potion::Error> for TypeError {
    fn into(self) -> potion::Error {
        HtmlError::InvalidRequest.new(&self.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
impl Into<Rejection> for TypeError {
    fn into(self) -> Rejection {
        HtmlError::InvalidRequest.new(&self.info).into()
    }
}

/// Raised by the short-link codec for values outside its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArgument {
    info: String,
}

impl InvalidArgument {
    pub fn new(info: impl Into<String>) -> Self {
        Self { info: info.into() }
    }

    pub fn info(&self) -> &str {
        &self.info
    }
}

impl Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid argument: {}", self.info)
    }
}

impl std::error::Error for InvalidArgument {}

impl Into<potion::Error> for InvalidArgument {
    fn into(self) -> potion::Error {
        HtmlError::InvalidRequest.new(&self.info)
    }
}

/// Field level validation failures of a request, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when no field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<String>>()
            .join("; ");
        write!(f, "{fields}")
    }
}

impl std::error::Error for ValidationError {}

impl Into<potion::Error> for ValidationError {
    fn into(self) -> potion::Error {
        HtmlError::InvalidRequest.new(&self.to_string())
    }
}

#[derive(Debug)]
pub struct MediaError {
    info: String,
}

impl MediaError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(value: std::io::Error) -> Self {
        Self {
            info: format!("{value}"),
        }
    }
}

impl Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for MediaError {}

impl Into<potion::Error> for MediaError {
    fn into(self) -> potion::Error {
        HtmlError::InvalidRequest.new(&self.info)
    }
}

/// Plain 404 carrying `info`.
pub fn not_found(info: &str) -> potion::Error {
    Error {
        code: 404,
        info: Some(info.to_string()),
        redirect: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_keeps_first_message_per_field() {
        let mut err = ValidationError::new();
        err.add("amount", "too small");
        err.add("amount", "too large");
        err.add("name", "required");

        assert_eq!(err.get("amount"), Some("too small"));
        assert_eq!(err.to_string(), "amount: too small; name: required");
        assert!(err.into_result().is_err());
    }

    #[test]
    fn empty_validation_error_is_ok() {
        assert!(ValidationError::new().into_result().is_ok());
    }

    #[test]
    fn row_not_found_is_404() {
        let err = QueryError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), QueryErrorKind::NotFound);
    }

    #[test]
    fn pool_errors_are_server_errors() {
        let err = QueryError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), QueryErrorKind::Internal);
    }

    #[test]
    fn not_found_carries_info() {
        let err = not_found("No recipe");
        assert_eq!(err.code, 404);
        assert_eq!(err.info.as_deref(), Some("No recipe"));
    }
}
