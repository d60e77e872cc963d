//! HTTP status classification.
//!
//! [`classify`] is a pure, total mapping from a status code to an [`Outcome`].
//! Only the four codes OpenStack services use for success are accepted; every
//! other code is a named failure kind or [`StatusKind::UnexpectedStatus`].

use std::fmt;

/// Result of classifying a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(StatusKind),
}

impl Outcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Named failure kinds for non-success status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 405
    MethodNotAllowed,
    /// 409
    Conflict,
    /// 413 (nova calls this "over limit")
    PayloadTooLarge,
    /// 415
    UnsupportedMediaType,
    /// 422
    Unprocessable,
    /// 429
    TooManyRequests,
    /// 500 (instance fault / server error)
    ServerFault,
    /// 501
    NotImplemented,
    /// 503
    ServiceUnavailable,
    /// Any code outside the success set and the named kinds above.
    UnexpectedStatus(u16),
}

impl StatusKind {
    /// The status code this kind was classified from.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Conflict => 409,
            Self::PayloadTooLarge => 413,
            Self::UnsupportedMediaType => 415,
            Self::Unprocessable => 422,
            Self::TooManyRequests => 429,
            Self::ServerFault => 500,
            Self::NotImplemented => 501,
            Self::ServiceUnavailable => 503,
            Self::UnexpectedStatus(code) => code,
        }
    }

    /// Returns `true` for 401 and 403, the codes that call for re-authentication.
    #[must_use]
    pub fn is_auth_failure(self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden)
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::MethodNotAllowed => "method not allowed",
            Self::Conflict => "conflict",
            Self::PayloadTooLarge => "over limit",
            Self::UnsupportedMediaType => "bad media type",
            Self::Unprocessable => "unprocessable",
            Self::TooManyRequests => "too many requests",
            Self::ServerFault => "instance fault / server error",
            Self::NotImplemented => "not implemented",
            Self::ServiceUnavailable => "service unavailable",
            Self::UnexpectedStatus(_) => "unexpected response status",
        };
        write!(f, "{} {text}", self.code())
    }
}

/// Classify a status code.
#[must_use]
pub fn classify(code: u16) -> Outcome {
    let kind = match code {
        200 | 201 | 202 | 204 => return Outcome::Success,
        400 => StatusKind::BadRequest,
        401 => StatusKind::Unauthorized,
        403 => StatusKind::Forbidden,
        404 => StatusKind::NotFound,
        405 => StatusKind::MethodNotAllowed,
        409 => StatusKind::Conflict,
        413 => StatusKind::PayloadTooLarge,
        415 => StatusKind::UnsupportedMediaType,
        422 => StatusKind::Unprocessable,
        429 => StatusKind::TooManyRequests,
        500 => StatusKind::ServerFault,
        501 => StatusKind::NotImplemented,
        503 => StatusKind::ServiceUnavailable,
        other => StatusKind::UnexpectedStatus(other),
    };
    Outcome::Failure(kind)
}
