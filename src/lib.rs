// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Android hardware attestation proof decoding and verification.
//!
//! This crate provides an API to decode and verify proofs produced by an
//! Android device whose signing key lives in the Trusted Execution
//! Environment.  The key is attested by a certificate chain carrying the
//! Android [key attestation] extension, and the prover application is
//! vouched for by an identity token issued by the attestation service.
//!
//! The API allows:
//! * Sniffing the proof family from its leading bytes
//! * Decoding an `S01`-tagged, CBOR-encoded Android proof
//! * Decoding the key description of the attestation leaf certificate
//! * Running the six independent checks and getting a per-check [`verify::Report`]
//!
//! [key attestation]: https://source.android.com/docs/security/features/keystore/attestation

pub mod proof;
pub mod store;
pub mod token;
pub mod verify;

#[cfg(test)]
mod test_utils;
