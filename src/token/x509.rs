// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Minimal DER views over X.509 certificates.  Only the parts needed to
//! check a signature link (the raw to-be-signed body, the declared signature
//! algorithm and the signature value) and to locate an extension are decoded;
//! everything else is kept as an opaque TLV.

use super::errors::Error;
use asn1::{BitString, ObjectIdentifier, SequenceOf, Tlv};

/// See RFC 5280 §4.1.  The to-be-signed body is kept as a raw TLV so that
/// its exact DER encoding can be fed to a signature verifier.
#[derive(asn1::Asn1Read)]
pub struct Certificate<'a> {
    pub tbs_certificate: Tlv<'a>,
    pub signature_algorithm: AlgorithmIdentifier<'a>,
    pub signature_value: BitString<'a>,
}

#[derive(asn1::Asn1Read)]
pub struct AlgorithmIdentifier<'a> {
    pub algorithm: ObjectIdentifier,
    pub parameters: Option<Tlv<'a>>,
}

#[derive(asn1::Asn1Read)]
pub struct TbsCertificate<'a> {
    #[explicit(0)]
    pub version: Option<u64>,
    pub serial_number: asn1::BigInt<'a>,
    pub signature: AlgorithmIdentifier<'a>,
    pub issuer: Tlv<'a>,
    pub validity: Tlv<'a>,
    pub subject: Tlv<'a>,
    pub subject_public_key_info: Tlv<'a>,
    #[implicit(1)]
    pub issuer_unique_id: Option<BitString<'a>>,
    #[implicit(2)]
    pub subject_unique_id: Option<BitString<'a>>,
    #[explicit(3)]
    pub extensions: Option<SequenceOf<'a, Extension<'a>>>,
}

#[derive(asn1::Asn1Read)]
pub struct Extension<'a> {
    pub extn_id: ObjectIdentifier,
    #[default(false)]
    pub critical: bool,
    /// DER encoding of the extension value, unwrapped from its OCTET STRING
    pub extn_value: &'a [u8],
}

impl<'a> Certificate<'a> {
    pub fn parse(der: &'a [u8]) -> Result<Certificate<'a>, Error> {
        asn1::parse_single::<Certificate>(der)
            .map_err(|e| Error::AsnDecode(format!("certificate: {e:?}")))
    }

    /// The exact DER bytes covered by the issuer's signature
    pub fn tbs_bytes(&self) -> &'a [u8] {
        self.tbs_certificate.full_data()
    }

    pub fn tbs(&self) -> Result<TbsCertificate<'a>, Error> {
        asn1::parse_single::<TbsCertificate>(self.tbs_certificate.full_data())
            .map_err(|e| Error::AsnDecode(format!("tbsCertificate: {e:?}")))
    }

    /// Locate the value of the extension identified by `oid`
    pub fn extension(&self, oid: &ObjectIdentifier) -> Result<&'a [u8], Error> {
        let extension = self
            .tbs()?
            .extensions
            .ok_or_else(|| Error::AsnDecode("certificate has no extensions".to_string()))?
            .find(|e| e.extn_id == *oid)
            .ok_or_else(|| Error::AsnDecode(format!("extension {oid} not found")))?;

        Ok(extension.extn_value)
    }
}
