// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The token module provides an [`Evidence`] object to encapsulate the
//! decoded contents of an Android proof and the logic used to verify it.
//!
//! # Example
//!
//! The following example assumes that `proof` contains an `S01`-tagged
//! Android proof, that `chain` has been loaded from the pinned certificate
//! bundle and that `settings` holds the expected APK digests.
//!
//! ```no_run
//! use androidproof::store::{CertificateChain, Settings};
//! use androidproof::token::{Evidence, KeyDescription};
//! use androidproof::verify::GoogleAuthority;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # let (proof, bundle, json): (Vec<u8>, Vec<u8>, String) = Default::default();
//! let chain = CertificateChain::decode(&bundle).expect("decoding chain");
//! let settings = Settings::load_json(&json).expect("loading settings");
//!
//! let e = Evidence::decode(&proof).expect("decoding Android proof");
//!
//! // the hardware key properties attested by the leaf certificate
//! let kd = KeyDescription::from_certificate(chain.leaf.der()).expect("decoding key description");
//! println!("attested with challenge {:?}", kd.attestation_challenge);
//!
//! // check key policy, certificate chain, identity token, payload claims,
//! // response signature, and ask the attestation service to corroborate
//! let authority = Arc::new(GoogleAuthority::new(&settings.google_api_key));
//! let report = e
//!     .verify(&chain, &settings, authority, Duration::from_secs(10))
//!     .expect("verifying Android proof");
//!
//! assert!(report.passed());
//! ```

pub use self::common::*;
pub use self::errors::Error;
pub use self::evidence::Evidence;
pub use self::keydesc::{
    AuthorizationList, KeyDescription, RootOfTrust, SecurityLevel, VerifiedBootState,
};
pub use self::record::AttestationRecord;

pub(crate) mod base64;
mod common;
mod errors;
mod evidence;
mod keydesc;
mod record;
pub mod x509;
