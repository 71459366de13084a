//! Wire envelopes for the RPC protocol: one JSON object per line.

use serde::{Deserialize, Serialize};

/// A single request envelope.
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<u64>,
    pub method: String,
    #[serde(default)]
    pub params: Option<TokenPairWire>,
}

/// Token pair as carried on the wire, in both params and results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPairWire {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidToken,
    SessionExpired,
    Internal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// A single response envelope; exactly one of `result`/`error` is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TokenPairWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    #[must_use]
    pub fn result(id: Option<u64>, pair: TokenPairWire) -> Self {
        Self {
            id,
            result: Some(pair),
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: Option<u64>, code: ErrorCode, message: &str) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.to_string(),
            }),
        }
    }
}
