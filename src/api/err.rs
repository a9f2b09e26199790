//! API error handling.
//!
//! We define our own error to use for all resolvers. It is turned into a
//! field error, so a failing field does not abort the rest of the request.
//! Besides the message, the error carries a coarse "kind" and an optional
//! "key" in the `extensions` of the GraphQL error, so that clients can react
//! to it without parsing the message.

use juniper::{FieldError, IntoFieldError, ScalarValue, graphql_value};


pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) msg: String,
    pub(crate) kind: ApiErrorKind,
    pub(crate) key: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    /// The object the request refers to does not exist.
    NotFound,

    /// The field is part of the schema, but has no behavior behind it.
    NotImplemented,
}

impl ApiErrorKind {
    fn kind_str(&self) -> &str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        }
    }

    fn message_prefix(&self) -> &str {
        match self {
            Self::NotFound => "Not found",
            Self::NotImplemented => "Not implemented",
        }
    }
}

impl<S: ScalarValue> IntoFieldError<S> for ApiError {
    fn into_field_error(self) -> FieldError<S> {
        let msg = format!("{}: {}", self.kind.message_prefix(), self.msg);
        let ext = if let Some(key) = self.key {
            graphql_value!({
                "kind": (self.kind.kind_str()),
                "key": key,
            })
        } else {
            graphql_value!({
                "kind": (self.kind.kind_str()),
            })
        };

        FieldError::new(msg, ext)
    }
}


// ===== Helper macros to easily create errors ==================================================

/// Creates an `ApiError` with a `format!` like syntax.
macro_rules! api_err {
    ($kind:ident, key = $key:literal, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::api::err::ApiError {
            msg: format!($fmt $(, $arg)*),
            kind: $crate::api::err::ApiErrorKind::$kind,
            key: Some($key.into()),
        }
    };
    ($kind:ident, $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::api::err::ApiError {
            msg: format!($fmt $(, $arg)*),
            kind: $crate::api::err::ApiErrorKind::$kind,
            key: None,
        }
    };
}

macro_rules! not_found {
    ($($t:tt)+) => { $crate::api::err::api_err!(NotFound, $($t)*) };
}

macro_rules! not_implemented {
    ($($t:tt)+) => { $crate::api::err::api_err!(NotImplemented, $($t)*) };
}

pub(crate) use api_err;
pub(crate) use not_found;
pub(crate) use not_implemented;
