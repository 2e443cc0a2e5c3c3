// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic attestation material: an EC P-256 root/intermediate/leaf
//! chain whose leaf carries a key description, an RSA identity certificate,
//! a signed identity token and the proof envelope tying them together.

use crate::store::{CertificateChain, Settings};
use crate::token::{base64, AttestationRecord, KEY_DESCRIPTION_OID};
use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Extension, X509Name, X509NameBuilder, X509};
use serde_json::{json, Value};
use std::sync::OnceLock;

pub const RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"USD\":16712.42}";
pub const REQUEST_ID: &str = "8c1e2ab5-2f7d-4c3e-9a61-0b6f3d1c5e77";
pub const APK_DIGEST: &str = "9kq0SrvWJtRzd0Vx4FMFY2MbQrHI3KXXcwBQwjQH7ss=";
pub const APK_CERT_DIGEST: &str = "Fzfd6vbOUUoTu4EE5DtrH4Xuws7Ow3ApeeFxJ28XVtI=";

#[derive(asn1::Asn1Write)]
struct KeyDescriptionDer<'a> {
    attestation_version: i64,
    attestation_security_level: asn1::Enumerated,
    keymaster_version: i64,
    keymaster_security_level: asn1::Enumerated,
    attestation_challenge: &'a [u8],
    unique_id: &'a [u8],
    software_enforced: AuthorizationListDer<'a>,
    tee_enforced: AuthorizationListDer<'a>,
}

#[derive(asn1::Asn1Write)]
struct AuthorizationListDer<'a> {
    #[explicit(1)]
    purpose: Option<asn1::SetOfWriter<'a, i64>>,
    #[explicit(2)]
    algorithm: Option<i64>,
    #[explicit(3)]
    key_size: Option<i64>,
    #[explicit(5)]
    digest: Option<asn1::SetOfWriter<'a, i64>>,
    #[explicit(10)]
    ec_curve: Option<i64>,
    #[explicit(503)]
    no_auth_required: Option<asn1::Null>,
    #[explicit(702)]
    origin: Option<i64>,
    #[explicit(704)]
    root_of_trust: Option<RootOfTrustDer<'a>>,
    #[explicit(705)]
    os_version: Option<i64>,
    #[explicit(706)]
    os_patch_level: Option<i64>,
}

#[derive(asn1::Asn1Write)]
struct RootOfTrustDer<'a> {
    verified_boot_key: &'a [u8],
    device_locked: bool,
    verified_boot_state: asn1::Enumerated,
}

impl AuthorizationListDer<'_> {
    fn empty() -> Self {
        AuthorizationListDer {
            purpose: None,
            algorithm: None,
            key_size: None,
            digest: None,
            ec_curve: None,
            no_auth_required: None,
            origin: None,
            root_of_trust: None,
            os_version: None,
            os_patch_level: None,
        }
    }
}

const SIGN: [i64; 1] = [2];
const SHA_256: [i64; 1] = [4];
const VERIFIED_BOOT_KEY: [u8; 32] = [0xab; 32];

/// Key description of an EC P-256 signing key generated in the TEE, as a
/// genuine device reports it: software attestation of a TEE keymaster over
/// the "Oraclize" challenge.
pub fn attested_key_description() -> Vec<u8> {
    asn1::write_single(&KeyDescriptionDer {
        attestation_version: 1,
        attestation_security_level: asn1::Enumerated::new(0),
        keymaster_version: 1,
        keymaster_security_level: asn1::Enumerated::new(1),
        attestation_challenge: b"Oraclize",
        unique_id: b"",
        software_enforced: AuthorizationListDer::empty(),
        tee_enforced: AuthorizationListDer {
            purpose: Some(asn1::SetOfWriter::new(&SIGN[..])),
            algorithm: Some(3),
            key_size: Some(256),
            digest: Some(asn1::SetOfWriter::new(&SHA_256[..])),
            ec_curve: Some(1),
            no_auth_required: Some(()),
            origin: Some(0),
            root_of_trust: Some(RootOfTrustDer {
                verified_boot_key: &VERIFIED_BOOT_KEY,
                device_locked: true,
                verified_boot_state: asn1::Enumerated::new(0),
            }),
            os_version: Some(70000),
            os_patch_level: Some(201712),
        },
    })
    .unwrap()
}

/// DER assembled entry by entry, for key descriptions no genuine device
/// would emit: entries out of order, repeated, mistyped or unknown.
pub mod der {
    pub fn length(n: usize) -> Vec<u8> {
        match n {
            0..=0x7f => vec![n as u8],
            0x80..=0xff => vec![0x81, n as u8],
            _ => vec![0x82, (n >> 8) as u8, n as u8],
        }
    }

    pub fn tlv(tag: &[u8], value: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend(length(value.len()));
        out.extend_from_slice(value);
        out
    }

    pub fn integer(v: i64) -> Vec<u8> {
        asn1::write_single(&v).unwrap()
    }

    pub fn enumerated(v: u32) -> Vec<u8> {
        asn1::write_single(&asn1::Enumerated::new(v)).unwrap()
    }

    pub fn octet_string(v: &[u8]) -> Vec<u8> {
        asn1::write_single(&v).unwrap()
    }

    pub fn boolean(v: bool) -> Vec<u8> {
        asn1::write_single(&v).unwrap()
    }

    pub fn null() -> Vec<u8> {
        asn1::write_single(&()).unwrap()
    }

    pub fn sequence(items: &[Vec<u8>]) -> Vec<u8> {
        tlv(&[0x30], &items.concat())
    }

    /// SET OF INTEGER with its elements in DER (sorted) order
    pub fn set_of(values: &[i64]) -> Vec<u8> {
        let mut sorted = values.to_vec();
        sorted.sort();
        asn1::write_single(&asn1::SetOfWriter::<i64, &[i64]>::new(&sorted)).unwrap()
    }

    /// Constructed context-specific tag, high tag numbers in base 128
    pub fn context_tag(n: u32) -> Vec<u8> {
        if n < 31 {
            return vec![0xa0 | n as u8];
        }

        let mut digits = vec![(n & 0x7f) as u8];
        let mut rest = n >> 7;
        while rest > 0 {
            digits.push(0x80 | (rest & 0x7f) as u8);
            rest >>= 7;
        }
        digits.reverse();

        let mut out = vec![0xbf];
        out.extend(digits);
        out
    }

    pub fn explicit(n: u32, inner: &[u8]) -> Vec<u8> {
        tlv(&context_tag(n), inner)
    }

    /// An AuthorizationList under construction, encoded in insertion order.
    /// Each entry is the tagged DER of one field.
    #[derive(Debug, Clone, Default)]
    pub struct AuthList(Vec<(Option<u32>, Vec<u8>)>);

    impl AuthList {
        /// The tee-enforced list of [`super::attested_key_description`]
        pub fn hardware_signing_key() -> Self {
            let mut l = AuthList::default();
            l.insert(1, set_of(&[2]));
            l.insert(2, integer(3));
            l.insert(3, integer(256));
            l.insert(5, set_of(&[4]));
            l.insert(10, integer(1));
            l.insert(503, null());
            l.insert(702, integer(0));
            l.insert(
                704,
                sequence(&[
                    octet_string(&[0xab; 32]),
                    boolean(true),
                    enumerated(0),
                ]),
            );
            l.insert(705, integer(70000));
            l.insert(706, integer(201712));
            l
        }

        /// Set field `tag`, in place if present, appended otherwise
        pub fn insert(&mut self, tag: u32, value: Vec<u8>) {
            let entry = explicit(tag, &value);
            match self.0.iter_mut().find(|(t, _)| *t == Some(tag)) {
                Some(slot) => slot.1 = entry,
                None => self.0.push((Some(tag), entry)),
            }
        }

        /// Append field `tag` even if already present
        pub fn push(&mut self, tag: u32, value: Vec<u8>) {
            self.0.push((Some(tag), explicit(tag, &value)));
        }

        /// Append an entry that is not explicitly tagged
        pub fn push_raw(&mut self, entry: Vec<u8>) {
            self.0.push((None, entry));
        }

        pub fn remove(&mut self, tag: u32) {
            self.0.retain(|(t, _)| *t != Some(tag));
        }

        pub fn encode(&self) -> Vec<u8> {
            let fields: Vec<Vec<u8>> = self.0.iter().map(|(_, entry)| entry.clone()).collect();

            sequence(&fields)
        }
    }

    pub fn key_description_with_levels(
        attestation_security_level: u32,
        keymaster_security_level: u32,
        challenge: &[u8],
        software_enforced: &AuthList,
        tee_enforced: &AuthList,
    ) -> Vec<u8> {
        sequence(&[
            integer(1),
            enumerated(attestation_security_level),
            integer(1),
            enumerated(keymaster_security_level),
            octet_string(challenge),
            octet_string(&[]),
            software_enforced.encode(),
            tee_enforced.encode(),
        ])
    }

    /// Software attestation of a TEE keymaster
    pub fn key_description(
        challenge: &[u8],
        software_enforced: &AuthList,
        tee_enforced: &AuthList,
    ) -> Vec<u8> {
        key_description_with_levels(0, 1, challenge, software_enforced, tee_enforced)
    }
}

/// Independent rendition of the proof nonce, hashing the device signature
/// the way the prover does: through its hex encoding, decoded back to bytes.
pub fn nonce(response: &str, device_signature: &[u8], request_id: &str) -> String {
    let mut data = response.as_bytes().to_vec();
    data.extend(hex::decode(hex::encode(device_signature)).unwrap());
    data.extend_from_slice(request_id.as_bytes());

    base64::encode_std(&openssl::sha::sha256(&data))
}

pub struct Fixture {
    /// DER of leaf, intermediate and root
    pub chain_der: (Vec<u8>, Vec<u8>, Vec<u8>),
    pub leaf_key: PKey<Private>,
    pub identity_key: PKey<Private>,
    pub identity_cert: X509,
    /// Leaf with the genuine subject, signed by a key unknown to the chain
    pub rogue_leaf_der: Vec<u8>,
    pub rogue_leaf_key: PKey<Private>,
    /// Same subject and key as the genuine intermediate, signed by a key
    /// unknown to the root
    pub rogue_intermediate_der: Vec<u8>,
    pub rogue_identity_key: PKey<Private>,
    pub settings: Settings,
    device_signature: Vec<u8>,
}

static FIXTURE: OnceLock<Fixture> = OnceLock::new();

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn name(cn: &str) -> X509Name {
    let mut b = X509NameBuilder::new().unwrap();
    b.append_entry_by_text("CN", cn).unwrap();
    b.build()
}

fn issue(
    subject: &str,
    subject_key: &PKey<Private>,
    issuer: &str,
    issuer_key: &PKey<Private>,
    serial: u32,
    extensions: Vec<X509Extension>,
) -> X509 {
    let mut b = X509::builder().unwrap();
    b.set_version(2).unwrap();
    b.set_serial_number(&BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap())
        .unwrap();
    b.set_subject_name(&name(subject)).unwrap();
    b.set_issuer_name(&name(issuer)).unwrap();
    b.set_pubkey(subject_key).unwrap();
    b.set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    b.set_not_after(&Asn1Time::days_from_now(3650).unwrap())
        .unwrap();
    for ext in extensions {
        b.append_extension(ext).unwrap();
    }
    b.sign(issuer_key, MessageDigest::sha256()).unwrap();
    b.build()
}

fn ca() -> Vec<X509Extension> {
    vec![BasicConstraints::new().critical().ca().build().unwrap()]
}

fn key_description_extension() -> X509Extension {
    let kd = attested_key_description();

    X509Extension::new_from_der(
        &Asn1Object::from_str(&KEY_DESCRIPTION_OID.to_string()).unwrap(),
        false,
        &Asn1OctetString::new_from_bytes(&kd).unwrap(),
    )
    .unwrap()
}

const ROOT_CN: &str = "Test Attestation Root";
const INTERMEDIATE_CN: &str = "Test Attestation Intermediate";
const LEAF_CN: &str = "Android Keystore Key";

impl Fixture {
    pub fn get() -> &'static Fixture {
        FIXTURE.get_or_init(Fixture::new)
    }

    fn new() -> Fixture {
        let root_key = ec_key();
        let intermediate_key = ec_key();
        let leaf_key = ec_key();
        let stranger_key = ec_key();

        let root = issue(ROOT_CN, &root_key, ROOT_CN, &root_key, 1, ca());
        let intermediate = issue(
            INTERMEDIATE_CN,
            &intermediate_key,
            ROOT_CN,
            &root_key,
            2,
            ca(),
        );
        let leaf = issue(
            LEAF_CN,
            &leaf_key,
            INTERMEDIATE_CN,
            &intermediate_key,
            3,
            vec![key_description_extension()],
        );

        let rogue_leaf = issue(
            LEAF_CN,
            &stranger_key,
            INTERMEDIATE_CN,
            &stranger_key,
            4,
            vec![key_description_extension()],
        );
        let rogue_intermediate = issue(
            INTERMEDIATE_CN,
            &intermediate_key,
            ROOT_CN,
            &stranger_key,
            5,
            ca(),
        );

        let identity_key = rsa_key();
        let identity_cert = issue(
            "attest.android.com",
            &identity_key,
            "attest.android.com",
            &identity_key,
            6,
            vec![],
        );

        let device_signature = sign(&leaf_key, RESPONSE.as_bytes());

        Fixture {
            chain_der: (
                leaf.to_der().unwrap(),
                intermediate.to_der().unwrap(),
                root.to_der().unwrap(),
            ),
            leaf_key,
            identity_key,
            identity_cert,
            rogue_leaf_der: rogue_leaf.to_der().unwrap(),
            rogue_leaf_key: stranger_key,
            rogue_intermediate_der: rogue_intermediate.to_der().unwrap(),
            rogue_identity_key: rsa_key(),
            settings: Settings {
                google_api_key: "test-api-key".to_string(),
                apk_digest: APK_DIGEST.to_string(),
                apk_cert_digest: APK_CERT_DIGEST.to_string(),
            },
            device_signature,
        }
    }

    pub fn chain(&self) -> CertificateChain {
        let (leaf, intermediate, root) = &self.chain_der;
        CertificateChain::from_der(leaf, intermediate, root).unwrap()
    }

    /// DER ECDSA signature of [`RESPONSE`] by the attested leaf key
    pub fn device_signature(&self) -> Vec<u8> {
        self.device_signature.clone()
    }

    pub fn sign(&self, key: &PKey<Private>, data: &[u8]) -> Vec<u8> {
        sign(key, data)
    }

    pub fn identity_header(&self) -> Vec<u8> {
        let x5c = base64::encode_std(&self.identity_cert.to_der().unwrap());
        serde_json::to_vec(&json!({"alg": "RS256", "x5c": [x5c]})).unwrap()
    }

    pub fn sign_identity_with(
        &self,
        key: &PKey<Private>,
        header: &[u8],
        payload: &[u8],
    ) -> Vec<u8> {
        let message = format!(
            "{}.{}",
            base64::encode_url(header),
            base64::encode_url(payload)
        );
        sign(key, message.as_bytes())
    }

    /// Identity token claims as issued for a request with `nonce`
    pub fn payload(&self, nonce: &str) -> Value {
        json!({
            "nonce": nonce,
            "timestampMs": 1513163043530u64,
            "apkPackageName": "it.oraclize.androidproof",
            "apkDigestSha256": APK_DIGEST,
            "ctsProfileMatch": true,
            "apkCertificateDigestSha256": [APK_CERT_DIGEST],
            "basicIntegrity": true,
        })
    }

    pub fn valid_payload(&self) -> Value {
        self.payload(&nonce(RESPONSE, &self.device_signature, REQUEST_ID))
    }

    pub fn record_with(&self, device_signature: &[u8], payload: &Value) -> AttestationRecord {
        let header = self.identity_header();
        let payload = serde_json::to_vec(payload).unwrap();
        let signature = self.sign_identity_with(&self.identity_key, &header, &payload);

        AttestationRecord::from_parts(
            REQUEST_ID,
            RESPONSE,
            device_signature,
            &header,
            &payload,
            &signature,
        )
    }

    /// A record for which every check passes
    pub fn record(&self) -> AttestationRecord {
        self.record_with(&self.device_signature, &self.valid_payload())
    }

    /// The encoded envelope of [`Fixture::record`]
    pub fn proof(&self) -> Vec<u8> {
        self.record().encode().unwrap()
    }
}

fn sign(key: &PKey<Private>, data: &[u8]) -> Vec<u8> {
    let mut signer = Signer::new(MessageDigest::sha256(), key).unwrap();
    signer.update(data).unwrap();
    signer.sign_to_vec().unwrap()
}

#[cfg(test)]
mod tests {
    use super::der;
    use super::Fixture;
    use hex_literal::hex;

    #[test]
    fn assembled_list_matches_genuine_encoding() {
        assert_eq!(
            der::key_description(
                b"Oraclize",
                &der::AuthList::default(),
                &der::AuthList::hardware_signing_key()
            ),
            super::attested_key_description()
        );
    }

    #[test]
    fn der_high_tag_numbers() {
        assert_eq!(der::context_tag(10), hex!("aa"));
        assert_eq!(der::context_tag(200), hex!("bf8148"));
        assert_eq!(der::context_tag(704), hex!("bf8540"));
    }

    #[test]
    fn der_set_of_is_sorted() {
        assert_eq!(der::set_of(&[3, 2]), hex!("3106020102020103"));
    }

    #[test]
    fn leaf_key_signs_device_signature() {
        let f = Fixture::get();
        let leaf = f.chain().leaf.x509().public_key().unwrap();

        assert!(leaf.public_eq(&f.leaf_key));
    }
}
