// Copyright 2023-2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::keydesc::KeyDescription;
use super::record::AttestationRecord;
use crate::store::{CertificateChain, Settings};
use crate::verify::{
    self, certchain, corroborate_within, identity, panic_message, response,
    AttestationAuthority, Check, KeyPolicy, Outcome, PayloadPolicy, Report,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Collects all the components of an Android hardware attestation proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    /// Decoded envelope
    pub record: AttestationRecord,
    /// Compact serialization of the identity token
    identity_token: String,
}

impl Evidence {
    /// Decode an `S01`-tagged proof and instantiate an Evidence object.
    pub fn decode(proof: &[u8]) -> Result<Evidence, Error> {
        Ok(Self::from_record(AttestationRecord::decode(proof)?))
    }

    pub fn from_record(record: AttestationRecord) -> Self {
        let identity_token = record.compact_identity_token();

        Self {
            record,
            identity_token,
        }
    }

    /// The identity token as sent to the attestation authority
    pub fn identity_token(&self) -> &str {
        &self.identity_token
    }

    /// Run the six checks against the decoded proof and the supplied chain.
    ///
    /// The key description is decoded from the leaf certificate first; if
    /// that fails nothing else runs and the error is returned.  Otherwise
    /// every check runs to completion on its own thread and contributes its
    /// result to the returned [`Report`], whatever its siblings do.
    ///
    /// The authority is given `timeout` to answer.  One that takes longer
    /// than that plus a short grace period is reported as
    /// [`verify::Error::AuthorityUnreachable`], and the report is returned
    /// without waiting for it.
    pub fn verify(
        &self,
        chain: &CertificateChain,
        settings: &Settings,
        authority: Arc<dyn AttestationAuthority>,
        timeout: Duration,
    ) -> Result<Report, verify::Error> {
        let kd = KeyDescription::from_certificate(chain.leaf.der())?;

        if let Some(rot) = &kd.tee_enforced.root_of_trust {
            log::debug!(
                "device root of trust: boot key {}, locked {}, state {:?}",
                hex::encode(&rot.verified_boot_key),
                rot.device_locked,
                rot.verified_boot_state
            );
        }

        let key_policy = KeyPolicy::default();
        let payload_policy = PayloadPolicy::new(settings);
        let record = &self.record;
        let token = self.identity_token.as_str();

        let outcomes = thread::scope(|s| {
            let handles = [
                (Check::KeyPolicy, s.spawn(|| key_policy.check(&kd))),
                (Check::CertChain, s.spawn(|| certchain::verify_chain(chain))),
                (
                    Check::IdentityToken,
                    s.spawn(|| {
                        identity::verify_identity_token(token, &record.identity_token_header)
                    }),
                ),
                (Check::Payload, s.spawn(|| payload_policy.check(record))),
                (
                    Check::ResponseSignature,
                    s.spawn(|| {
                        response::verify_response_signature(
                            &record.http_response,
                            &record.device_signature,
                            chain.leaf.x509(),
                        )
                    }),
                ),
                (
                    Check::Authority,
                    s.spawn(move || corroborate_within(authority, token, timeout)),
                ),
            ];

            handles
                .into_iter()
                .map(|(check, handle)| Outcome {
                    check,
                    result: handle
                        .join()
                        .unwrap_or_else(|p| Err(verify::Error::Internal(panic_message(p)))),
                })
                .collect::<Vec<_>>()
        });

        let report = Report::new(outcomes);
        report.log();

        Ok(report)
    }
}
