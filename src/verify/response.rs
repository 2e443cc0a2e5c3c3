// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;

/// Verify the device signature over the UTF-8 bytes of the notarised HTTP
/// response with the attestation leaf public key (SHA-256).
pub fn verify_response_signature(
    response: &str,
    device_signature: &[u8],
    leaf: &X509,
) -> Result<(), Error> {
    let fail = |reason: String| Error::ResponseSignatureInvalid(reason);

    let pkey = leaf
        .public_key()
        .map_err(|e| fail(format!("loading leaf public key: {e}")))?;

    let mut verifier = Verifier::new(MessageDigest::sha256(), &pkey)
        .map_err(|e| fail(format!("creating verifier: {e}")))?;

    verifier
        .update(response.as_bytes())
        .map_err(|e| fail(format!("hashing response: {e}")))?;

    match verifier.verify(device_signature) {
        Ok(true) => {
            log::debug!("response signature verified");
            Ok(())
        }
        Ok(false) => Err(fail(
            "signature does not match the attestation key".to_string(),
        )),
        Err(e) => Err(fail(format!("malformed signature: {e}"))),
    }
}
