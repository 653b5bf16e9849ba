use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use anyhow::Error as AnyhowError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;

/// Error returned by store, model and planner operations.
///
/// `code` is a stable `AREA/REASON` string (`VALIDATION/TITLE`,
/// `STORE/PERSIST`, `PLAN/HTTP`, ...); `context` carries the record or
/// collection the failure concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
    /// Underlying failure, e.g. the medium's I/O error behind `STORE/PERSIST`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<AppError>>,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Code for foreign errors that carry no code of their own.
    pub const UNKNOWN_CODE: &'static str = "APP/UNKNOWN";
    /// Code for a medium that could not make staged writes durable.
    pub const PERSIST_CODE: &'static str = "STORE/PERSIST";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError {
            code: code.into(),
            message: message.into(),
            context: HashMap::new(),
            cause: None,
        }
    }

    /// A failed `save()` on the medium while writing `collection`. The
    /// medium's error chain is kept as the cause.
    pub fn persist(collection: impl Into<String>, error: AnyhowError) -> Self {
        let collection = collection.into();
        AppError::new(
            Self::PERSIST_CODE,
            format!("Could not save {collection} to the data store"),
        )
        .with_context("operation", "persist")
        .with_context("collection", collection)
        .with_cause(error)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn cause(&self) -> Option<&AppError> {
        self.cause.as_deref()
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<AppError>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            let mut pairs: Vec<_> = self.context.iter().collect();
            pairs.sort();
            let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " ({})", rendered.join(", "))?;
        }
        Ok(())
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl From<AnyhowError> for AppError {
    fn from(error: AnyhowError) -> Self {
        fn convert(err: &(dyn StdError + 'static)) -> AppError {
            if let Some(app) = err.downcast_ref::<AppError>() {
                return app.clone();
            }
            let mut root = AppError::new(AppError::UNKNOWN_CODE, err.to_string());
            root.cause = err.source().map(|source| Box::new(convert(source)));
            root
        }

        convert(error.as_ref())
    }
}

/// Stored collections and exports go through serde_json; the code tells a
/// truncated value (`JSON/EOF`) from a malformed one (`JSON/SYNTAX`) or a
/// schema mismatch (`JSON/DATA`).
impl From<SerdeJsonError> for AppError {
    fn from(error: SerdeJsonError) -> Self {
        let code = if error.is_data() {
            "JSON/DATA"
        } else if error.is_syntax() {
            "JSON/SYNTAX"
        } else if error.is_eof() {
            "JSON/EOF"
        } else {
            "JSON/IO"
        };

        let mut app_error = AppError::new(code, error.to_string());
        if error.line() > 0 {
            app_error = app_error
                .with_context("line", error.line().to_string())
                .with_context("column", error.column().to_string());
        }
        app_error
    }
}
