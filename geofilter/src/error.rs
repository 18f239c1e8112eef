//! Error types for filter query dispatch.
//!
//! Every error is delivered to the caller (by callback or as the `Err` of an
//! awaited operation) and is terminal for that call. Errors are `Clone`
//! because a single failed computation is fanned out to every waiter queued
//! on its dedup key.

use crate::service::ServiceKind;
use thiserror::Error;

/// Errors that can occur while binding a service or running a filter operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// No service bound, or the bound layer metadata is incomplete.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// External evaluation requested for a kind that only evaluates in memory.
    #[error(
        "unsupported operation: {kind} does not support {} filtering",
        mode_label(.external)
    )]
    UnsupportedOperation { kind: ServiceKind, external: bool },

    /// Layer metadata names a kind the registry has no implementation for.
    #[error("unknown layer type: {0}")]
    UnknownKind(String),

    /// The registry handed back an implementation that cannot serve the request.
    #[error("connector contract violated: {0}")]
    ConnectorContract(String),

    /// Network collaborator failure, propagated unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The computation for a key died without producing a result.
    #[error("internal error: {0}")]
    Internal(String),
}

fn mode_label(external: &bool) -> &'static str {
    if *external {
        "external"
    } else {
        "internal"
    }
}

impl FilterError {
    /// The error returned when an operation runs before `bind_service` succeeded.
    pub fn no_service() -> Self {
        Self::Configuration("no service configured".to_string())
    }

    /// Returns true for the "no service configured" condition.
    pub fn is_no_service(&self) -> bool {
        matches!(self, Self::Configuration(msg) if msg == "no service configured")
    }
}

/// Errors raised by the network collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The request URL could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body did not decode as the expected payload.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
