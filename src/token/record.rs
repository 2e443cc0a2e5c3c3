// Copyright 2023 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::base64;
use super::common::*;
use super::errors::Error;
use bitmask::*;
use ciborium::de::from_reader;
use ciborium::ser::into_writer;
use ciborium::Value;

const REQUEST_ID_LABEL: &str = "requestID";
const HTTP_RESPONSE_LABEL: &str = "HTTPResponse";
const SIGNATURE_LABEL: &str = "signature";
const JWS_HEADER_LABEL: &str = "JWS_Header";
const JWS_PAYLOAD_LABEL: &str = "JWS_Payload";
const JWS_SIGNATURE_LABEL: &str = "JWS_Signature";

bitmask! {
    #[derive(Debug)]
    mask FieldsSet: u8 where flags Fields {
        RequestId    = 0x01,
        HttpResponse = 0x02,
        Signature    = 0x04,
        JwsHeader    = 0x08,
        JwsPayload   = 0x10,
        JwsSignature = 0x20,
    }
}

/// The decoded contents of an Android proof envelope: the notarised HTTP
/// response, the device signature over it, and the three parts of the
/// identity token issued by the attestation service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttestationRecord {
    pub request_id: String,                // "requestID", text
    pub http_response: String,             // "HTTPResponse", text
    pub device_signature: Vec<u8>,         // "signature", bytes (DER ECDSA)
    pub identity_token_header: Vec<u8>,    // "JWS_Header", bytes (JSON)
    pub identity_token_payload: Vec<u8>,   // "JWS_Payload", bytes (JSON)
    pub identity_token_signature: Vec<u8>, // "JWS_Signature", bytes
}

impl AttestationRecord {
    /// Build a record from its six parts, e.g. to produce an envelope with
    /// [AttestationRecord::encode()].
    pub fn from_parts(
        request_id: &str,
        http_response: &str,
        device_signature: &[u8],
        identity_token_header: &[u8],
        identity_token_payload: &[u8],
        identity_token_signature: &[u8],
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            http_response: http_response.to_string(),
            device_signature: device_signature.to_vec(),
            identity_token_header: identity_token_header.to_vec(),
            identity_token_payload: identity_token_payload.to_vec(),
            identity_token_signature: identity_token_signature.to_vec(),
        }
    }

    /// Decode a tagged, CBOR-encoded Android proof envelope
    pub fn decode(proof: &[u8]) -> Result<AttestationRecord, Error> {
        let body = proof
            .strip_prefix(ANDROID_PROOF_TAG.as_slice())
            .ok_or_else(|| Error::Decode("missing S01 type tag".to_string()))?;

        let v: Value = from_reader(body).map_err(|e| Error::Decode(e.to_string()))?;

        let mut d = RecordDecoder::new();

        if let Value::Map(contents) = v {
            d.parse(contents)?;
        } else {
            return Err(Error::Decode("expecting map type".to_string()));
        }

        d.validate()?;

        let r = d.record;

        log::debug!(
            "decoded android proof for request {} ({} byte response)",
            r.request_id,
            r.http_response.len()
        );

        Ok(r)
    }

    /// Encode the record as a canonical tagged envelope, with the six fields
    /// in a fixed order.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let contents = vec![
            (
                Value::Text(REQUEST_ID_LABEL.to_string()),
                Value::Text(self.request_id.clone()),
            ),
            (
                Value::Text(HTTP_RESPONSE_LABEL.to_string()),
                Value::Text(self.http_response.clone()),
            ),
            (
                Value::Text(SIGNATURE_LABEL.to_string()),
                Value::Bytes(self.device_signature.clone()),
            ),
            (
                Value::Text(JWS_HEADER_LABEL.to_string()),
                Value::Bytes(self.identity_token_header.clone()),
            ),
            (
                Value::Text(JWS_PAYLOAD_LABEL.to_string()),
                Value::Bytes(self.identity_token_payload.clone()),
            ),
            (
                Value::Text(JWS_SIGNATURE_LABEL.to_string()),
                Value::Bytes(self.identity_token_signature.clone()),
            ),
        ];

        let mut buf = ANDROID_PROOF_TAG.to_vec();
        into_writer(&Value::Map(contents), &mut buf).map_err(|e| Error::Decode(e.to_string()))?;

        Ok(buf)
    }

    /// Assemble the compact serialization of the identity token:
    /// base64url(header).base64url(payload).base64url(signature)
    pub fn compact_identity_token(&self) -> String {
        [
            base64::encode_url(&self.identity_token_header),
            base64::encode_url(&self.identity_token_payload),
            base64::encode_url(&self.identity_token_signature),
        ]
        .join(".")
    }
}

struct RecordDecoder {
    record: AttestationRecord,
    fields_set: FieldsSet,
}

impl RecordDecoder {
    fn new() -> Self {
        Self {
            record: Default::default(),
            fields_set: FieldsSet::none(),
        }
    }

    fn parse(&mut self, contents: Vec<(Value, Value)>) -> Result<(), Error> {
        for (k, v) in contents.iter() {
            if let Value::Text(label) = k {
                match label.as_str() {
                    REQUEST_ID_LABEL => self.set_request_id(v)?,
                    HTTP_RESPONSE_LABEL => self.set_http_response(v)?,
                    SIGNATURE_LABEL => self.set_signature(v)?,
                    JWS_HEADER_LABEL => self.set_jws_header(v)?,
                    JWS_PAYLOAD_LABEL => self.set_jws_payload(v)?,
                    JWS_SIGNATURE_LABEL => self.set_jws_signature(v)?,
                    unknown => {
                        log::debug!("ignoring unknown key {unknown} in android proof");
                        continue;
                    }
                }
            } else {
                return Err(Error::Decode("expecting text key".to_string()));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Error> {
        let mandatory_fields = [
            (Fields::RequestId, REQUEST_ID_LABEL),
            (Fields::HttpResponse, HTTP_RESPONSE_LABEL),
            (Fields::Signature, SIGNATURE_LABEL),
            (Fields::JwsHeader, JWS_HEADER_LABEL),
            (Fields::JwsPayload, JWS_PAYLOAD_LABEL),
            (Fields::JwsSignature, JWS_SIGNATURE_LABEL),
        ];

        for (f, n) in mandatory_fields.iter() {
            if !self.fields_set.contains(*f) {
                return Err(Error::Decode(format!("missing field {n}")));
            }
        }

        Ok(())
    }

    fn mark(&mut self, f: Fields, n: &str) -> Result<(), Error> {
        if self.fields_set.contains(f) {
            return Err(Error::Decode(format!("duplicated field {n}")));
        }

        self.fields_set.set(f);

        Ok(())
    }

    fn set_request_id(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Fields::RequestId, REQUEST_ID_LABEL)?;
        self.record.request_id = to_tstr(v, REQUEST_ID_LABEL)?;
        Ok(())
    }

    fn set_http_response(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Fields::HttpResponse, HTTP_RESPONSE_LABEL)?;
        self.record.http_response = to_tstr(v, HTTP_RESPONSE_LABEL)?;
        Ok(())
    }

    fn set_signature(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Fields::Signature, SIGNATURE_LABEL)?;
        self.record.device_signature = to_bstr(v, SIGNATURE_LABEL)?;
        Ok(())
    }

    fn set_jws_header(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Fields::JwsHeader, JWS_HEADER_LABEL)?;
        self.record.identity_token_header = to_bstr(v, JWS_HEADER_LABEL)?;
        Ok(())
    }

    fn set_jws_payload(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Fields::JwsPayload, JWS_PAYLOAD_LABEL)?;
        self.record.identity_token_payload = to_bstr(v, JWS_PAYLOAD_LABEL)?;
        Ok(())
    }

    fn set_jws_signature(&mut self, v: &Value) -> Result<(), Error> {
        self.mark(Fields::JwsSignature, JWS_SIGNATURE_LABEL)?;
        self.record.identity_token_signature = to_bstr(v, JWS_SIGNATURE_LABEL)?;
        Ok(())
    }
}
