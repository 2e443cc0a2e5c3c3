// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::common::KEY_DESCRIPTION_OID;
use super::errors::Error;
use super::x509::Certificate;
use asn1::{Asn1Readable, Enumerated, Null, SequenceOf, SetOf, Tlv};
use std::collections::BTreeSet;

/// Wire form of the key description, see "Key and ID attestation" in the
/// Android keystore documentation.  The authorization lists are read entry
/// by entry, so their tags may arrive in any order.
#[derive(asn1::Asn1Read)]
struct KeyDescriptionAsn1<'a> {
    attestation_version: i64,
    attestation_security_level: Enumerated,
    keymaster_version: i64,
    keymaster_security_level: Enumerated,
    attestation_challenge: &'a [u8],
    unique_id: &'a [u8],
    software_enforced: SequenceOf<'a, Tlv<'a>>,
    tee_enforced: SequenceOf<'a, Tlv<'a>>,
}

#[derive(asn1::Asn1Read)]
struct RootOfTrustAsn1<'a> {
    verified_boot_key: &'a [u8],
    device_locked: bool,
    verified_boot_state: Enumerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    Software,
    TrustedEnvironment,
}

impl TryFrom<&Enumerated> for SecurityLevel {
    type Error = Error;

    fn try_from(v: &Enumerated) -> Result<Self, Error> {
        match v.value() {
            0 => Ok(SecurityLevel::Software),
            1 => Ok(SecurityLevel::TrustedEnvironment),
            x => Err(Error::AsnDecode(format!("unknown security level {x}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedBootState {
    Verified,
    SelfSigned,
    TrustedEnvironment,
    Failed,
}

impl TryFrom<&Enumerated> for VerifiedBootState {
    type Error = Error;

    fn try_from(v: &Enumerated) -> Result<Self, Error> {
        match v.value() {
            0 => Ok(VerifiedBootState::Verified),
            1 => Ok(VerifiedBootState::SelfSigned),
            2 => Ok(VerifiedBootState::TrustedEnvironment),
            3 => Ok(VerifiedBootState::Failed),
            x => Err(Error::AsnDecode(format!("unknown verified boot state {x}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootOfTrust {
    pub verified_boot_key: Vec<u8>,
    pub device_locked: bool,
    pub verified_boot_state: VerifiedBootState,
}

/// The set of key properties enforced by one security environment.  Every
/// field mirrors an optional tagged entry: `None` means the tag was absent,
/// which is never the same as a zero or empty value.  NULL-typed flags carry
/// no value, so their presence is the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationList {
    pub purpose: Option<BTreeSet<i64>>,            // [1]
    pub algorithm: Option<i64>,                    // [2]
    pub key_size: Option<i64>,                     // [3]
    pub digest: Option<BTreeSet<i64>>,             // [5]
    pub padding: Option<BTreeSet<i64>>,            // [6]
    pub ec_curve: Option<i64>,                     // [10]
    pub rsa_public_exponent: Option<i64>,          // [200]
    pub active_date_time: Option<i64>,             // [400]
    pub origination_expire_date_time: Option<i64>, // [401]
    pub usage_expire_date_time: Option<i64>,       // [402]
    pub no_auth_required: bool,                    // [503]
    pub user_auth_type: Option<i64>,               // [504]
    pub auth_timeout: Option<i64>,                 // [505]
    pub allow_while_on_body: bool,                 // [506]
    pub all_applications: bool,                    // [600]
    pub application_id: Option<Vec<u8>>,           // [601]
    pub creation_date_time: Option<i64>,           // [701]
    pub origin: Option<i64>,                       // [702]
    pub rollback_resistant: bool,                  // [703]
    pub root_of_trust: Option<RootOfTrust>,        // [704]
    pub os_version: Option<i64>,                   // [705]
    pub os_patch_level: Option<i64>,               // [706]
    pub attestation_challenge: Option<i64>,        // [708]
    pub attestation_application_id: Option<Vec<u8>>, // [709]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescription {
    pub attestation_version: i64,
    pub attestation_security_level: SecurityLevel,
    pub keymaster_version: i64,
    pub keymaster_security_level: SecurityLevel,
    pub attestation_challenge: Vec<u8>,
    pub unique_id: Vec<u8>,
    pub software_enforced: AuthorizationList,
    pub tee_enforced: AuthorizationList,
}

impl KeyDescription {
    /// Decode the DER-encoded key description extension value
    pub fn decode(der: &[u8]) -> Result<KeyDescription, Error> {
        let kd = asn1::parse_single::<KeyDescriptionAsn1>(der)
            .map_err(|e| Error::AsnDecode(format!("key description: {e:?}")))?;

        Ok(KeyDescription {
            attestation_version: kd.attestation_version,
            attestation_security_level: (&kd.attestation_security_level).try_into()?,
            keymaster_version: kd.keymaster_version,
            keymaster_security_level: (&kd.keymaster_security_level).try_into()?,
            attestation_challenge: kd.attestation_challenge.to_vec(),
            unique_id: kd.unique_id.to_vec(),
            software_enforced: AuthorizationList::decode(kd.software_enforced)?,
            tee_enforced: AuthorizationList::decode(kd.tee_enforced)?,
        })
    }

    /// Locate the key attestation extension in a DER certificate and decode it
    pub fn from_certificate(cert_der: &[u8]) -> Result<KeyDescription, Error> {
        let cert = Certificate::parse(cert_der)?;
        let value = cert.extension(&KEY_DESCRIPTION_OID)?;

        Self::decode(value)
    }
}

impl AuthorizationList {
    /// Decode the entries of one list.  Each tag may appear at most once;
    /// an unknown tag or a value of the wrong type fails the decode.
    fn decode<'a>(entries: SequenceOf<'a, Tlv<'a>>) -> Result<AuthorizationList, Error> {
        let mut al = AuthorizationList::default();
        let mut seen = BTreeSet::new();

        for entry in entries {
            let tag = explicit_tag(&entry)?;
            if !seen.insert(tag) {
                return Err(Error::AsnDecode(format!("duplicated tag [{tag}]")));
            }

            let v = entry.data();
            match tag {
                1 => al.purpose = Some(to_set(value(tag, v)?)),
                2 => al.algorithm = Some(value(tag, v)?),
                3 => al.key_size = Some(value(tag, v)?),
                5 => al.digest = Some(to_set(value(tag, v)?)),
                6 => al.padding = Some(to_set(value(tag, v)?)),
                10 => al.ec_curve = Some(value(tag, v)?),
                200 => al.rsa_public_exponent = Some(value(tag, v)?),
                400 => al.active_date_time = Some(value(tag, v)?),
                401 => al.origination_expire_date_time = Some(value(tag, v)?),
                402 => al.usage_expire_date_time = Some(value(tag, v)?),
                503 => al.no_auth_required = flag(tag, v)?,
                504 => al.user_auth_type = Some(value(tag, v)?),
                505 => al.auth_timeout = Some(value(tag, v)?),
                506 => al.allow_while_on_body = flag(tag, v)?,
                600 => al.all_applications = flag(tag, v)?,
                601 => al.application_id = Some(value::<&[u8]>(tag, v)?.to_vec()),
                701 => al.creation_date_time = Some(value(tag, v)?),
                702 => al.origin = Some(value(tag, v)?),
                703 => al.rollback_resistant = flag(tag, v)?,
                704 => al.root_of_trust = Some(RootOfTrust::from_asn1(value(tag, v)?)?),
                705 => al.os_version = Some(value(tag, v)?),
                706 => al.os_patch_level = Some(value(tag, v)?),
                708 => al.attestation_challenge = Some(value(tag, v)?),
                709 => al.attestation_application_id = Some(value::<&[u8]>(tag, v)?.to_vec()),
                unknown => return Err(Error::AsnDecode(format!("unknown tag [{unknown}]"))),
            }
        }

        Ok(al)
    }
}

impl RootOfTrust {
    fn from_asn1(rot: RootOfTrustAsn1) -> Result<RootOfTrust, Error> {
        Ok(RootOfTrust {
            verified_boot_key: rot.verified_boot_key.to_vec(),
            device_locked: rot.device_locked,
            verified_boot_state: (&rot.verified_boot_state).try_into()?,
        })
    }
}

// Number of a constructed context-specific tag, in low or high tag form.
fn explicit_tag(entry: &Tlv<'_>) -> Result<u32, Error> {
    let not_explicit =
        || Error::AsnDecode("authorization entry is not an explicit tag".to_string());

    let (first, rest) = entry.full_data().split_first().ok_or_else(not_explicit)?;
    if first & 0xe0 != 0xa0 {
        return Err(not_explicit());
    }
    if first & 0x1f != 0x1f {
        return Ok(u32::from(first & 0x1f));
    }

    let mut n: u32 = 0;
    for b in rest {
        if n > u32::MAX >> 7 {
            return Err(Error::AsnDecode("tag number overflow".to_string()));
        }
        n = (n << 7) | u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Ok(n);
        }
    }

    Err(not_explicit())
}

fn value<'a, T: Asn1Readable<'a>>(tag: u32, data: &'a [u8]) -> Result<T, Error> {
    asn1::parse_single::<T>(data).map_err(|e| Error::AsnDecode(format!("tag [{tag}]: {e:?}")))
}

// NULL-typed flags carry no value
fn flag(tag: u32, data: &[u8]) -> Result<bool, Error> {
    value::<Null>(tag, data).map(|_| true)
}

fn to_set(s: SetOf<'_, i64>) -> BTreeSet<i64> {
    s.collect()
}
