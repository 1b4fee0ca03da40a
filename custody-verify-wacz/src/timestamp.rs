use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use cms::{cert::CertificateChoices, content_info::ContentInfo, signed_data::SignedData};
use der::{
    asn1::{AnyRef, GeneralizedTime, ObjectIdentifier, OctetStringRef},
    Decode, Encode, Sequence,
};
use sha2::{Digest, Sha256};
use x509_cert::Certificate;

use crate::anon_sig;

/// `id-messageDigest` (1.2.840.113549.1.9.4), the CMS signed-attribute
/// carrying the hash of the encapsulated content.
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// RFC 3161 `MessageImprint ::= SEQUENCE { hashAlgorithm AlgorithmIdentifier, hashedMessage OCTET STRING }`
#[derive(Sequence)]
struct MessageImprint<'a> {
    hash_algorithm: AlgorithmIdentifier<'a>,
    hashed_message: OctetStringRef<'a>,
}

#[derive(Sequence)]
struct AlgorithmIdentifier<'a> {
    algorithm: ObjectIdentifier,
    #[asn1(optional = "true")]
    parameters: Option<AnyRef<'a>>,
}

/// The fields of `TSTInfo` this system needs: the message imprint and the
/// generation time. `TSTInfo` has several further optional fields
/// (accuracy, ordering, nonce, tsa, extensions) this doesn't model.
#[derive(Sequence)]
struct TstInfoPrefix<'a> {
    version: u8,
    policy: ObjectIdentifier,
    message_imprint: MessageImprint<'a>,
    serial_number: der::asn1::IntRef<'a>,
    gen_time: GeneralizedTime,
}

const SHA256_OID: ObjectIdentifier = const_oid::db::rfc5912::ID_SHA_256;

/// A verified RFC 3161 timestamp token: the time it attests to, and the
/// hash it covers.
pub struct ParsedTimestamp {
    pub time: DateTime<Utc>,
    pub hashed_message: Vec<u8>,
    pub raw_token: Vec<u8>,
    pub certificates: Vec<Certificate>,
}

/// Parses a `TimeStampResp` (the response format an RFC 3161 DER-encoded
/// token is wrapped in) and extracts its `TSTInfo`.
///
/// Requires SHA-256 as the message-imprint hash algorithm.
pub fn parse_timestamp_token(token_bytes: &[u8]) -> Result<ParsedTimestamp> {
    // The WACZ spec stores the raw `TimeStampToken` (a CMS ContentInfo over
    // a SignedData whose encapsulated content is the DER-encoded TSTInfo),
    // not the full `TimeStampResp` wrapper, matching how Authsign emits it.
    let content_info = ContentInfo::from_der(token_bytes).map_err(|e| anyhow!("not a valid CMS ContentInfo: {e}"))?;

    let signed_data: SignedData = content_info
        .content
        .decode_as()
        .map_err(|e| anyhow!("CMS ContentInfo does not contain SignedData: {e}"))?;

    let encapsulated = signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| anyhow!("timestamp token has no encapsulated TSTInfo content"))?;

    let tst_info_der = encapsulated.value();
    let tst_info = TstInfoPrefix::from_der(tst_info_der).map_err(|e| anyhow!("failed to parse TSTInfo: {e}"))?;

    if tst_info.message_imprint.hash_algorithm.algorithm != SHA256_OID {
        bail!("unsupported hash algorithm or missing hashed message");
    }

    let hashed_message = tst_info.message_imprint.hashed_message.as_bytes().to_vec();
    if hashed_message.is_empty() {
        bail!("unsupported hash algorithm or missing hashed message");
    }

    let time: DateTime<Utc> = tst_info
        .gen_time
        .to_date_time()
        .try_into()
        .map_err(|_| anyhow!("invalid genTime in TSTInfo"))?;

    let certificates = signed_data
        .certificates
        .iter()
        .flat_map(|set| set.0.iter())
        .filter_map(|choice| match choice {
            CertificateChoices::Certificate(cert) => Some(cert.clone()),
            _ => None,
        })
        .collect();

    Ok(ParsedTimestamp {
        time,
        hashed_message,
        raw_token: token_bytes.to_vec(),
        certificates,
    })
}

/// Confirms the token's hashed message equals SHA-256 of the
/// base64-standard-encoded signature bytes, matching the
/// "hash the base64 text of the signature, not the raw signature bytes" quirk.
pub fn verify_hashed_message(parsed: &ParsedTimestamp, base64_encoded_signature: &str) -> Result<()> {
    let expected = Sha256::digest(base64_encoded_signature.as_bytes());
    if expected.as_slice() != parsed.hashed_message {
        bail!("timestamp token hash mismatch");
    }
    Ok(())
}

/// Verifies the CMS `SignerInfo` signature carried in the timestamp token
/// against the timestamp authority certificate's public key, per RFC 5652
/// §5.4 — the step `parse_timestamp_token` alone does not perform. Without
/// this, a forged `TSTInfo` whose embedded cert chain happens to have an
/// allow-listed root fingerprint would otherwise be accepted outright.
///
/// When the token carries signed attributes, the signature covers the DER
/// re-encoding of the attribute set under its native `SET OF` tag (not the
/// `IMPLICIT [0]` tag used in its structural position inside `SignerInfo`,
/// per RFC 5652 §5.4), and the `messageDigest` attribute must match the
/// SHA-256 digest of the encapsulated `TSTInfo`. Otherwise the signature
/// covers the encapsulated content directly.
pub fn verify_token_signature(raw_token: &[u8], tsa_cert: &Certificate) -> Result<()> {
    let content_info = ContentInfo::from_der(raw_token).map_err(|e| anyhow!("not a valid CMS ContentInfo: {e}"))?;
    let signed_data: SignedData = content_info
        .content
        .decode_as()
        .map_err(|e| anyhow!("CMS ContentInfo does not contain SignedData: {e}"))?;

    let signer_info = signed_data
        .signer_infos
        .0
        .iter()
        .next()
        .ok_or_else(|| anyhow!("timestamp token carries no signer info"))?;

    let econtent = signed_data
        .encap_content_info
        .econtent
        .as_ref()
        .ok_or_else(|| anyhow!("timestamp token has no encapsulated TSTInfo content"))?;
    let tst_info_der = econtent.value();

    let spki_der = tsa_cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| anyhow!("failed to encode timestamp cert SPKI: {e}"))?;

    let signature_bytes = signer_info.signature.as_bytes();

    let signed_bytes = match &signer_info.signed_attrs {
        Some(signed_attrs) => {
            let content_digest = Sha256::digest(tst_info_der);
            let message_digest_matches = signed_attrs.0.iter().any(|attr| {
                attr.oid == ID_MESSAGE_DIGEST
                    && attr
                        .values
                        .iter()
                        .any(|v| v.value() == content_digest.as_slice())
            });
            if !message_digest_matches {
                bail!("timestamp token signed attributes do not cover the encapsulated TSTInfo");
            }
            signed_attrs
                .0
                .to_der()
                .map_err(|e| anyhow!("failed to re-encode signed attributes: {e}"))?
        }
        None => tst_info_der.to_vec(),
    };

    let ok = anon_sig::verify_anonymous_signature(&signed_bytes, signature_bytes, &spki_der)
        .map_err(|e| anyhow!("failed to verify timestamp token signature: {e}"))?;
    if !ok {
        bail!("timestamp token signature verification failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_message_mismatch_is_rejected() {
        let parsed = ParsedTimestamp {
            time: Utc::now(),
            hashed_message: vec![0u8; 32],
            raw_token: vec![],
            certificates: vec![],
        };
        let err = verify_hashed_message(&parsed, "c29tZSBzaWduYXR1cmU=").unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
    }
}
