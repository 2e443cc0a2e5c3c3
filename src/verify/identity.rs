// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use crate::token::base64;
use jsonwebtoken::{Algorithm, DecodingKey};
use openssl::pkey::Id;
use openssl::x509::X509;
use serde::Deserialize;

const IDENTITY_TOKEN_ALG: &str = "RS256";

#[derive(Debug, Deserialize)]
struct IdentityTokenHeader {
    alg: String,
    #[serde(default)]
    x5c: Vec<String>,
}

/// Extract the signer certificate, the first `x5c` entry, from a JSON
/// identity token header.  Entries are base64 DER as per RFC 7515; PEM text
/// is accepted too.
pub fn identity_certificate(header: &[u8]) -> Result<X509, Error> {
    let header: IdentityTokenHeader =
        serde_json::from_slice(header).map_err(|e| Error::HeaderMalformed(e.to_string()))?;

    if header.alg != IDENTITY_TOKEN_ALG {
        return Err(Error::HeaderMalformed(format!(
            "expecting alg {IDENTITY_TOKEN_ALG}, got {}",
            header.alg
        )));
    }

    let entry = header
        .x5c
        .first()
        .ok_or_else(|| Error::HeaderMalformed("missing x5c certificate chain".to_string()))?;

    let cert = if entry.trim_start().starts_with("-----BEGIN") {
        X509::from_pem(entry.as_bytes())
    } else {
        let der = base64::decode_std(entry)
            .map_err(|e| Error::HeaderMalformed(format!("x5c[0]: {e}")))?;
        X509::from_der(&der)
    };

    cert.map_err(|e| Error::HeaderMalformed(format!("x5c[0]: {e}")))
}

/// Verify the RS256 signature of a compact identity token against the public
/// key of the certificate embedded in its own header.
pub fn verify_identity_token(token: &str, header: &[u8]) -> Result<(), Error> {
    let cert = identity_certificate(header)?;

    let pkey = cert
        .public_key()
        .map_err(|e| Error::HeaderMalformed(format!("identity certificate key: {e}")))?;

    if pkey.id() != Id::RSA {
        return Err(Error::HeaderMalformed(
            "identity certificate key is not RSA".to_string(),
        ));
    }

    let pem = pkey
        .public_key_to_pem()
        .map_err(|e| Error::HeaderMalformed(format!("identity certificate key: {e}")))?;

    let key = DecodingKey::from_rsa_pem(&pem)
        .map_err(|e| Error::HeaderMalformed(format!("identity certificate key: {e}")))?;

    let (message, signature) = token
        .rsplit_once('.')
        .ok_or_else(|| Error::SignatureInvalid("not a compact token".to_string()))?;

    match jsonwebtoken::crypto::verify(signature, message.as_bytes(), &key, Algorithm::RS256) {
        Ok(true) => {
            log::debug!("identity token signature verified");
            Ok(())
        }
        Ok(false) => Err(Error::SignatureInvalid(
            "signature does not match the identity certificate".to_string(),
        )),
        Err(e) => Err(Error::SignatureInvalid(e.to_string())),
    }
}
