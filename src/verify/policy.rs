// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::token::{KeyDescription, SecurityLevel};
use std::collections::BTreeSet;
use std::fmt::Debug;

// Keymaster tag values, see hardware/libhardware/include/hardware/keymaster_defs.h
const KM_PURPOSE_SIGN: i64 = 2;
const KM_ALGORITHM_EC: i64 = 3;
const KM_DIGEST_SHA_2_256: i64 = 4;
const KM_EC_CURVE_P_256: i64 = 1;
const KM_ORIGIN_GENERATED: i64 = 0;

/// The hardware key policy a device attestation key must satisfy: an EC
/// P-256 signing key with SHA-256 digests, generated inside the TEE, and
/// attested with the prover's challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPolicy {
    pub keymaster_version: i64,
    pub attestation_security_level: SecurityLevel,
    pub keymaster_security_level: SecurityLevel,
    pub attestation_challenge: Vec<u8>,
    pub purpose: BTreeSet<i64>,
    pub algorithm: i64,
    pub digest: BTreeSet<i64>,
    pub ec_curve: i64,
    pub origin: i64,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            keymaster_version: 1,
            attestation_security_level: SecurityLevel::Software,
            keymaster_security_level: SecurityLevel::TrustedEnvironment,
            attestation_challenge: b"Oraclize".to_vec(),
            purpose: BTreeSet::from([KM_PURPOSE_SIGN]),
            algorithm: KM_ALGORITHM_EC,
            digest: BTreeSet::from([KM_DIGEST_SHA_2_256]),
            ec_curve: KM_EC_CURVE_P_256,
            origin: KM_ORIGIN_GENERATED,
        }
    }
}

impl KeyPolicy {
    /// Check every policy condition against the decoded key description.
    /// A TEE-enforced property that is absent fails just like one with the
    /// wrong value, but the two are reported differently.
    pub fn check(&self, kd: &KeyDescription) -> Result<(), Error> {
        expect_eq(
            "keymasterVersion",
            &kd.keymaster_version,
            &self.keymaster_version,
        )?;
        expect_eq(
            "attestationSecurityLevel",
            &kd.attestation_security_level,
            &self.attestation_security_level,
        )?;
        expect_eq(
            "keymasterSecurityLevel",
            &kd.keymaster_security_level,
            &self.keymaster_security_level,
        )?;

        if kd.attestation_challenge != self.attestation_challenge {
            return Err(Error::PolicyViolation(format!(
                "attestationChallenge: expected {:?}, got {:?}",
                String::from_utf8_lossy(&self.attestation_challenge),
                String::from_utf8_lossy(&kd.attestation_challenge)
            )));
        }

        let tee = &kd.tee_enforced;

        expect_present_eq("teeEnforced.purpose", &tee.purpose, &self.purpose)?;
        expect_present_eq("teeEnforced.algorithm", &tee.algorithm, &self.algorithm)?;
        expect_present_eq("teeEnforced.digest", &tee.digest, &self.digest)?;
        expect_present_eq("teeEnforced.ecCurve", &tee.ec_curve, &self.ec_curve)?;
        expect_present_eq("teeEnforced.origin", &tee.origin, &self.origin)?;

        Ok(())
    }
}

fn expect_eq<T: PartialEq + Debug>(name: &str, actual: &T, expected: &T) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::PolicyViolation(format!(
            "{name}: expected {expected:?}, got {actual:?}"
        )));
    }

    Ok(())
}

fn expect_present_eq<T: PartialEq + Debug>(
    name: &str,
    actual: &Option<T>,
    expected: &T,
) -> Result<(), Error> {
    match actual {
        None => Err(Error::PolicyViolation(format!("{name}: absent"))),
        Some(v) => expect_eq(name, v, expected),
    }
}
