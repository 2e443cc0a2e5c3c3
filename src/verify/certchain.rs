// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::{ChainLink, Error};
use crate::store::CertificateChain;
use crate::token::x509::Certificate;
use asn1::ObjectIdentifier;
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;

const ECDSA_WITH_SHA256: ObjectIdentifier = asn1::oid!(1, 2, 840, 10045, 4, 3, 2);
const ECDSA_WITH_SHA384: ObjectIdentifier = asn1::oid!(1, 2, 840, 10045, 4, 3, 3);
const ECDSA_WITH_SHA512: ObjectIdentifier = asn1::oid!(1, 2, 840, 10045, 4, 3, 4);
const SHA256_WITH_RSA: ObjectIdentifier = asn1::oid!(1, 2, 840, 113549, 1, 1, 11);
const SHA384_WITH_RSA: ObjectIdentifier = asn1::oid!(1, 2, 840, 113549, 1, 1, 12);
const SHA512_WITH_RSA: ObjectIdentifier = asn1::oid!(1, 2, 840, 113549, 1, 1, 13);

/// Verify that the intermediate signs the leaf and the root signs the
/// intermediate.  Validity periods, revocation and name constraints are not
/// evaluated: the chain is a pinned, caller-provisioned bundle.
pub fn verify_chain(chain: &CertificateChain) -> Result<(), Error> {
    verify_link(
        chain.leaf.der(),
        chain.intermediate.pem(),
        ChainLink::LeafToIntermediate,
    )?;

    verify_link(
        chain.intermediate.der(),
        chain.root.pem(),
        ChainLink::IntermediateToRoot,
    )?;

    log::debug!("attestation certificate chain verified");

    Ok(())
}

fn digest_for(alg: &ObjectIdentifier) -> Option<MessageDigest> {
    [
        (ECDSA_WITH_SHA256, MessageDigest::sha256()),
        (SHA256_WITH_RSA, MessageDigest::sha256()),
        (ECDSA_WITH_SHA384, MessageDigest::sha384()),
        (SHA384_WITH_RSA, MessageDigest::sha384()),
        (ECDSA_WITH_SHA512, MessageDigest::sha512()),
        (SHA512_WITH_RSA, MessageDigest::sha512()),
    ]
    .into_iter()
    .find(|(oid, _)| oid == alg)
    .map(|(_, md)| md)
}

/// Check the signature over `subject_der`'s to-be-signed body with the
/// public key of the PEM-encoded issuer, using the algorithm the subject
/// declares.
fn verify_link(subject_der: &[u8], issuer_pem: &str, link: ChainLink) -> Result<(), Error> {
    let fail = |reason: String| Error::ChainVerification { link, reason };

    let cert = Certificate::parse(subject_der).map_err(|e| fail(e.to_string()))?;

    let alg = &cert.signature_algorithm.algorithm;
    let md = digest_for(alg).ok_or_else(|| fail(format!("unsupported signature algorithm {alg}")))?;

    let issuer_key = X509::from_pem(issuer_pem.as_bytes())
        .and_then(|issuer| issuer.public_key())
        .map_err(|e| fail(format!("loading issuer public key: {e}")))?;

    let mut verifier =
        Verifier::new(md, &issuer_key).map_err(|e| fail(format!("creating verifier: {e}")))?;

    verifier
        .update(cert.tbs_bytes())
        .map_err(|e| fail(format!("hashing tbsCertificate: {e}")))?;

    match verifier.verify(cert.signature_value.as_bytes()) {
        Ok(true) => Ok(()),
        Ok(false) => Err(fail("signature does not verify".to_string())),
        Err(e) => Err(fail(format!("signature does not verify: {e}"))),
    }
}
