use anyhow::{anyhow, Result};
use der::{asn1::UintRef, Decode, Sequence};
use p256::{
    ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey},
    pkcs8::DecodePublicKey,
};
use sha2::{Digest, Sha256};

/// ASN.1 `SEQUENCE { r INTEGER, s INTEGER }`, the DER encoding X.509/PKIX
/// ECDSA signatures use.
#[derive(Sequence)]
struct DerSignature<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

/// Verifies an ECDSA-P256-over-SHA256 signature against a SubjectPublicKeyInfo
/// (SPKI) DER-encoded public key, accepting either the 64-byte raw `r‖s`
/// concatenation or an ASN.1 DER `SEQUENCE(r,s)`, distinguished by length.
pub fn verify_anonymous_signature(message: &[u8], signature_bytes: &[u8], spki_der: &[u8]) -> Result<bool> {
    let verifying_key = VerifyingKey::from_public_key_der(spki_der)
        .map_err(|e| anyhow!("not an ECDSA P-256 SubjectPublicKeyInfo: {e}"))?;

    // P-256's curve size is 32 bytes; raw concat form is 2*32 = 64 bytes total.
    let signature = if signature_bytes.len() == 64 {
        Signature::from_slice(signature_bytes)?
    } else {
        let parsed = DerSignature::from_der(signature_bytes)?;
        let mut raw = [0u8; 64];
        let r = parsed.r.as_bytes();
        let s = parsed.s.as_bytes();
        raw[32 - r.len()..32].copy_from_slice(r);
        raw[64 - s.len()..64].copy_from_slice(s);
        Signature::from_slice(&raw)?
    };

    let digest = Sha256::digest(message);

    Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use p256::{
        ecdsa::{signature::hazmat::PrehashSigner, SigningKey},
        pkcs8::EncodePublicKey,
    };
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn raw_concat_signature_verifies() {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let spki_der = verifying_key.to_public_key_der().unwrap();

        let message = b"hello\n";
        let digest = Sha256::digest(message);
        let signature: Signature = signing_key.sign_prehash(&digest).unwrap();

        let ok = verify_anonymous_signature(message, signature.to_bytes().as_slice(), spki_der.as_bytes()).unwrap();
        assert!(ok);
    }

    #[test]
    fn tampered_message_fails() {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let spki_der = verifying_key.to_public_key_der().unwrap();

        let digest = Sha256::digest(b"hello\n");
        let signature: Signature = signing_key.sign_prehash(&digest).unwrap();

        let ok = verify_anonymous_signature(b"goodbye\n", signature.to_bytes().as_slice(), spki_der.as_bytes()).unwrap();
        assert!(!ok);
    }
}
