// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Proof kind detection and the verifier seam shared by all proof families.

use crate::store::{CertificateChain, Settings};
use crate::token::{self, ANDROID_PROOF_TAG};
use crate::verify::{self, AttestationAuthority, Report};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const TLSNOTARY_MAGIC: &[u8; 27] = b"tlsnotary notarization file";

/// The proof families known to the dispatcher, told apart by a fixed
/// byte prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProofKind {
    #[serde(rename = "tlsn")]
    TlsNotary,
    #[serde(rename = "android")]
    Android,
}

impl ProofKind {
    const PREFIXES: [(ProofKind, &'static [u8]); 2] = [
        (ProofKind::TlsNotary, TLSNOTARY_MAGIC),
        (ProofKind::Android, ANDROID_PROOF_TAG),
    ];

    /// Identify the proof family from the leading bytes of `proof`
    pub fn sniff(proof: &[u8]) -> Option<ProofKind> {
        Self::PREFIXES
            .iter()
            .find(|(_, prefix)| proof.starts_with(prefix))
            .map(|(kind, _)| *kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProofKind::TlsNotary => "tlsn",
            ProofKind::Android => "android",
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A verifier for one proof family: raw proof bytes in, decoded output or
/// failure out.
pub trait ProofVerifier {
    type Output;

    fn kind(&self) -> ProofKind;

    fn verify(&self, proof: &[u8]) -> Result<Self::Output, verify::Error>;
}

/// [`ProofVerifier`] for Android hardware attestation proofs
pub struct AndroidVerifier<'a> {
    chain: &'a CertificateChain,
    settings: &'a Settings,
    authority: Arc<dyn AttestationAuthority>,
    timeout: Duration,
}

impl<'a> AndroidVerifier<'a> {
    pub fn new(
        chain: &'a CertificateChain,
        settings: &'a Settings,
        authority: Arc<dyn AttestationAuthority>,
        timeout: Duration,
    ) -> Self {
        Self {
            chain,
            settings,
            authority,
            timeout,
        }
    }
}

impl ProofVerifier for AndroidVerifier<'_> {
    type Output = Report;

    fn kind(&self) -> ProofKind {
        ProofKind::Android
    }

    fn verify(&self, proof: &[u8]) -> Result<Report, verify::Error> {
        match ProofKind::sniff(proof) {
            Some(ProofKind::Android) | None => {}
            Some(other) => {
                return Err(token::Error::Unsupported(format!(
                    "{other} proof handed to the android verifier"
                ))
                .into())
            }
        }

        verify::verify_attestation_with(
            proof,
            self.chain,
            self.settings,
            self.authority.clone(),
            self.timeout,
        )
    }
}
