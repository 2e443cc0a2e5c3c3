// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use serde::Serialize;
use std::fmt;

/// The independent checks an Android proof is subjected to, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Check {
    KeyPolicy,
    CertChain,
    IdentityToken,
    Payload,
    ResponseSignature,
    Authority,
}

impl Check {
    pub const ALL: [Check; 6] = [
        Check::KeyPolicy,
        Check::CertChain,
        Check::IdentityToken,
        Check::Payload,
        Check::ResponseSignature,
        Check::Authority,
    ];
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Check::KeyPolicy => "key-policy",
            Check::CertChain => "cert-chain",
            Check::IdentityToken => "identity-token",
            Check::Payload => "payload",
            Check::ResponseSignature => "response-signature",
            Check::Authority => "authority",
        };

        write!(f, "{s}")
    }
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub check: Check,
    pub result: Result<(), Error>,
}

/// Per-check verdicts of one verification run.  The proof is accepted only
/// if every check passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    outcomes: Vec<Outcome>,
}

impl Report {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self { outcomes }
    }

    /// true iff there is at least one outcome and none of them failed
    pub fn passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn outcome(&self, check: Check) -> Option<&Result<(), Error>> {
        self.outcomes
            .iter()
            .find(|o| o.check == check)
            .map(|o| &o.result)
    }

    /// The failed checks with their errors, in report order
    pub fn failures(&self) -> impl Iterator<Item = (Check, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.check, e)))
    }

    /// Emit one warning per failed check and the overall verdict
    pub fn log(&self) {
        for (check, e) in self.failures() {
            log::warn!("{check} check failed: {e}");
        }

        if self.passed() {
            log::info!("android proof verified");
        } else {
            log::info!("android proof rejected");
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            result: self.passed(),
            proof_type: "android".to_string(),
            failures: self
                .failures()
                .map(|(check, e)| Failure {
                    check,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                })
                .collect(),
        }
    }
}

/// Serializable rendition of a [`Report`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub result: bool,
    #[serde(rename = "type")]
    pub proof_type: String,
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub check: Check,
    pub kind: String,
    pub message: String,
}
