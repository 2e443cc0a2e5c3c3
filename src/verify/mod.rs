// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The verify module holds the six independent checks an Android proof is
//! subjected to, the [`AttestationAuthority`] seam for the remote
//! corroboration call, and the [`Report`] that keeps every check's verdict.
//!
//! # Example
//!
//! ```no_run
//! use androidproof::store::{CertificateChain, Settings};
//! use androidproof::verify::verify_attestation;
//! use std::time::Duration;
//!
//! let proof = std::fs::read("proof.bin").expect("reading proof");
//! let bundle = std::fs::read("AndroidProof.chain").expect("reading chain");
//! let settings = std::fs::read_to_string("settings.json").expect("reading settings");
//!
//! let chain = CertificateChain::decode(&bundle).expect("decoding chain");
//! let settings = Settings::load_json(&settings).expect("loading settings");
//!
//! let report = verify_attestation(&proof, &chain, &settings, Duration::from_secs(10))
//!     .expect("decoding proof");
//!
//! for (check, e) in report.failures() {
//!     println!("{check}: {e}");
//! }
//! ```

pub(crate) use self::authority::corroborate_within;
pub(crate) use self::errors::panic_message;
pub use self::authority::{AttestationAuthority, GoogleAuthority, GOOGLE_VERIFY_ENDPOINT};
pub use self::errors::{ChainLink, Error};
pub use self::payload::{expected_nonce, PayloadPolicy, APK_PACKAGE_NAME};
pub use self::policy::KeyPolicy;
pub use self::report::{Check, Failure, Outcome, Report, Summary};

use crate::store::{CertificateChain, Settings};
use crate::token::Evidence;
use std::sync::Arc;
use std::time::Duration;

mod authority;
pub(crate) mod certchain;
mod errors;
pub(crate) mod identity;
mod payload;
mod policy;
mod report;
pub(crate) mod response;

/// Decode `proof` and verify it against `chain`, corroborating the identity
/// token with the Google attestation service.
///
/// Decoding failures of the envelope or of the leaf key description are
/// returned as errors; everything else is reported per check.
pub fn verify_attestation(
    proof: &[u8],
    chain: &CertificateChain,
    settings: &Settings,
    timeout: Duration,
) -> Result<Report, Error> {
    let authority = Arc::new(GoogleAuthority::new(&settings.google_api_key));

    verify_attestation_with(proof, chain, settings, authority, timeout)
}

/// Same as [`verify_attestation`] with a caller-supplied authority
pub fn verify_attestation_with(
    proof: &[u8],
    chain: &CertificateChain,
    settings: &Settings,
    authority: Arc<dyn AttestationAuthority>,
    timeout: Duration,
) -> Result<Report, Error> {
    let evidence = Evidence::decode(proof)?;

    log::info!("verifying android proof {}", evidence.record.request_id);

    evidence.verify(chain, settings, authority, timeout)
}
