// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::{panic_message, Error};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Google's SafetyNet attestation verification endpoint
pub const GOOGLE_VERIFY_ENDPOINT: &str =
    "https://www.googleapis.com/androidcheck/v1/attestations/verify";

/// A remote party that vouches for the identity token signature.
pub trait AttestationAuthority: Send + Sync {
    /// Ask the authority whether `token`, a compact identity token, carries
    /// a valid signature.  Implementations should give up after `timeout`
    /// and report [`Error::AuthorityUnreachable`]; the verifier stops
    /// waiting shortly after it regardless.
    fn corroborate(&self, token: &str, timeout: Duration) -> Result<(), Error>;
}

/// Grace period past the timeout before an authority is given up on
const DEADLINE_SLACK: Duration = Duration::from_millis(500);

/// Run `authority.corroborate` on a detached thread and wait for its answer
/// for no longer than `timeout` plus [`DEADLINE_SLACK`].  An authority that
/// overruns is reported as unreachable and its thread left to finish alone.
pub(crate) fn corroborate_within(
    authority: Arc<dyn AttestationAuthority>,
    token: &str,
    timeout: Duration,
) -> Result<(), Error> {
    let (tx, rx) = mpsc::channel();
    let token = token.to_string();

    thread::Builder::new()
        .name("authority".to_string())
        .spawn(move || {
            let r = panic::catch_unwind(AssertUnwindSafe(|| {
                authority.corroborate(&token, timeout)
            }));
            let _ = tx.send(r);
        })
        .map_err(|e| Error::Internal(format!("spawning authority call: {e}")))?;

    match rx.recv_timeout(timeout + DEADLINE_SLACK) {
        Ok(Ok(r)) => r,
        Ok(Err(p)) => Err(Error::Internal(panic_message(p))),
        Err(RecvTimeoutError::Timeout) => {
            log::warn!("attestation authority overran its {timeout:?} timeout");
            Err(Error::AuthorityUnreachable(format!(
                "no answer within {timeout:?}"
            )))
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::Internal(
            "authority call ended without an answer".to_string(),
        )),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    signed_attestation: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    #[serde(default)]
    is_valid_signature: Option<bool>,
}

/// [`AttestationAuthority`] backed by the Google attestation verification
/// web service.
#[derive(Debug, Clone)]
pub struct GoogleAuthority {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl GoogleAuthority {
    pub fn new(api_key: &str) -> Self {
        Self::with_endpoint(GOOGLE_VERIFY_ENDPOINT, api_key)
    }

    /// Use a different verification endpoint, e.g. a proxy or a test server
    pub fn with_endpoint(endpoint: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

impl AttestationAuthority for GoogleAuthority {
    fn corroborate(&self, token: &str, timeout: Duration) -> Result<(), Error> {
        log::debug!("corroborating identity token with {}", self.endpoint);

        let rsp = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&VerifyRequest {
                signed_attestation: token,
            })
            .timeout(timeout)
            .send()
            .map_err(|e| Error::AuthorityUnreachable(e.to_string()))?;

        let status = rsp.status();
        if status != StatusCode::OK {
            return Err(Error::AuthorityRejected(format!("HTTP status {status}")));
        }

        let body: VerifyResponse = rsp
            .json()
            .map_err(|e| Error::AuthorityRejected(format!("unexpected response body: {e}")))?;

        match body.is_valid_signature {
            Some(true) => Ok(()),
            Some(false) => Err(Error::AuthorityRejected(
                "isValidSignature is false".to_string(),
            )),
            None => Err(Error::AuthorityRejected(
                "isValidSignature is missing".to_string(),
            )),
        }
    }
}
