// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::store::Settings;
use crate::token::{base64, AttestationRecord};
use openssl::hash::{Hasher, MessageDigest};
use serde_json::Value;

/// Package name of the prover application
pub const APK_PACKAGE_NAME: &str = "it.oraclize.androidproof";

const NONCE: &str = "nonce";
const APK_PACKAGE_NAME_CLAIM: &str = "apkPackageName";
const APK_DIGEST_CLAIM: &str = "apkDigestSha256";
const APK_CERT_DIGEST_CLAIM: &str = "apkCertificateDigestSha256";
const BASIC_INTEGRITY_CLAIM: &str = "basicIntegrity";

/// The nonce the prover must have requested the identity token with:
/// base64(sha256(response || device signature || request id)).
pub fn expected_nonce(
    response: &str,
    device_signature: &[u8],
    request_id: &str,
) -> Result<String, Error> {
    let mut hasher =
        Hasher::new(MessageDigest::sha256()).map_err(|e| Error::Internal(format!("{e:?}")))?;

    for part in [
        response.as_bytes(),
        device_signature,
        request_id.as_bytes(),
    ] {
        hasher
            .update(part)
            .map_err(|e| Error::Internal(format!("{e:?}")))?;
    }

    let sum = hasher
        .finish()
        .map_err(|e| Error::Internal(format!("{e:?}")))?;

    Ok(base64::encode_std(&sum))
}

/// Expected values for the identity token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPolicy {
    pub package_name: String,
    pub apk_digest: String,
    pub apk_cert_digest: String,
}

impl PayloadPolicy {
    pub fn new(settings: &Settings) -> Self {
        Self {
            package_name: APK_PACKAGE_NAME.to_string(),
            apk_digest: settings.apk_digest.clone(),
            apk_cert_digest: settings.apk_cert_digest.clone(),
        }
    }

    /// Check the identity token claims against the record they were issued
    /// for.  Every claim is compared for equality with its expected value;
    /// the first mismatching claim is reported.
    pub fn check(&self, record: &AttestationRecord) -> Result<(), Error> {
        let payload: Value = serde_json::from_slice(&record.identity_token_payload)
            .map_err(|e| mismatch("payload", format!("not JSON: {e}")))?;

        if !payload.is_object() {
            return Err(mismatch("payload", "not a JSON object".to_string()));
        }

        let nonce = expected_nonce(
            &record.http_response,
            &record.device_signature,
            &record.request_id,
        )?;

        expect_str(&payload, NONCE, &nonce)?;
        expect_str(&payload, APK_PACKAGE_NAME_CLAIM, &self.package_name)?;
        expect_str(&payload, APK_DIGEST_CLAIM, &self.apk_digest)?;
        expect_cert_digest(&payload, &self.apk_cert_digest)?;

        match payload.get(BASIC_INTEGRITY_CLAIM) {
            Some(Value::Bool(true)) => {}
            Some(other) => {
                return Err(mismatch(
                    BASIC_INTEGRITY_CLAIM,
                    format!("expected true, got {other}"),
                ))
            }
            None => return Err(mismatch(BASIC_INTEGRITY_CLAIM, "absent".to_string())),
        }

        log::debug!("identity token claims match request {}", record.request_id);

        Ok(())
    }
}

fn mismatch(field: &str, reason: String) -> Error {
    Error::PayloadMismatch {
        field: field.to_string(),
        reason,
    }
}

fn expect_str(payload: &Value, field: &str, expected: &str) -> Result<(), Error> {
    match payload.get(field) {
        Some(Value::String(s)) if s == expected => Ok(()),
        Some(Value::String(s)) => Err(mismatch(
            field,
            format!("expected {expected:?}, got {s:?}"),
        )),
        Some(other) => Err(mismatch(field, format!("expected a string, got {other}"))),
        None => Err(mismatch(field, "absent".to_string())),
    }
}

// The attestation service reports the signing certificate digests as an
// array; a single-element array or a plain string is accepted.
fn expect_cert_digest(payload: &Value, expected: &str) -> Result<(), Error> {
    match payload.get(APK_CERT_DIGEST_CLAIM) {
        Some(Value::Array(digests)) => match digests.as_slice() {
            [Value::String(s)] if s == expected => Ok(()),
            _ => Err(mismatch(
                APK_CERT_DIGEST_CLAIM,
                format!("expected [{expected:?}], got {}", Value::Array(digests.clone())),
            )),
        },
        _ => expect_str(payload, APK_CERT_DIGEST_CLAIM, expected),
    }
}
