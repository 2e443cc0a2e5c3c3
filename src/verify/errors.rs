// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::any::Any;

/// A signature link in the attestation certificate chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainLink {
    LeafToIntermediate,
    IntermediateToRoot,
}

impl std::fmt::Display for ChainLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainLink::LeafToIntermediate => write!(f, "leaf-to-intermediate"),
            ChainLink::IntermediateToRoot => write!(f, "intermediate-to-root"),
        }
    }
}

#[derive(thiserror::Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error(transparent)]
    Token(#[from] crate::token::Error),
    #[error("Policy violation: {0}")]
    PolicyViolation(String),
    #[error("Chain verification failure at {link}: {reason}")]
    ChainVerification { link: ChainLink, reason: String },
    #[error("Identity token signature invalid: {0}")]
    SignatureInvalid(String),
    #[error("Identity token header malformed: {0}")]
    HeaderMalformed(String),
    #[error("Payload mismatch on {field}: {reason}")]
    PayloadMismatch { field: String, reason: String },
    #[error("Response signature invalid: {0}")]
    ResponseSignatureInvalid(String),
    #[error("Attestation authority rejected the token: {0}")]
    AuthorityRejected(String),
    #[error("Attestation authority unreachable: {0}")]
    AuthorityUnreachable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable identifier of the error kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Token(crate::token::Error::Decode(_)) => "DecodeError",
            Error::Token(crate::token::Error::AsnDecode(_)) => "AsnDecodeError",
            Error::Token(crate::token::Error::Unsupported(_)) => "Unsupported",
            Error::PolicyViolation(_) => "PolicyViolation",
            Error::ChainVerification { .. } => "ChainVerificationFailure",
            Error::SignatureInvalid(_) => "SignatureInvalid",
            Error::HeaderMalformed(_) => "HeaderMalformed",
            Error::PayloadMismatch { .. } => "PayloadMismatch",
            Error::ResponseSignatureInvalid(_) => "ResponseSignatureInvalid",
            Error::AuthorityRejected(_) => "AuthorityRejected",
            Error::AuthorityUnreachable(_) => "AuthorityUnreachable",
            Error::Internal(_) => "Internal",
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Token(e) => write!(f, "{:?}", e),
            Error::PolicyViolation(e)
            | Error::SignatureInvalid(e)
            | Error::HeaderMalformed(e)
            | Error::ResponseSignatureInvalid(e)
            | Error::AuthorityRejected(e)
            | Error::AuthorityUnreachable(e)
            | Error::Internal(e) => write!(f, "{}", e),
            Error::ChainVerification { link, reason } => write!(f, "{}: {}", link, reason),
            Error::PayloadMismatch { field, reason } => write!(f, "{}: {}", field, reason),
        }
    }
}

/// Describe the payload of a caught panic
pub(crate) fn panic_message(p: Box<dyn Any + Send>) -> String {
    if let Some(s) = p.downcast_ref::<&str>() {
        format!("check panicked: {s}")
    } else if let Some(s) = p.downcast_ref::<String>() {
        format!("check panicked: {s}")
    } else {
        "check panicked".to_string()
    }
}
