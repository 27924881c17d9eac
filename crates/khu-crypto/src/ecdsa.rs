use khu_core::types::{PublicKeyBytes, SignatureBytes};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("message is not a valid 32-byte digest")]
    InvalidMessage,
}

/// Sign a pre-hashed 32-byte digest with a secp256k1 secret key.
pub fn sign(secret_key_bytes: &[u8], digest: &[u8; 32]) -> Result<SignatureBytes, SignatureError> {
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(secret_key_bytes).map_err(|_| SignatureError::InvalidSecretKey)?;
    let msg = Message::from_digest(*digest);
    let sig = secp.sign_ecdsa(&msg, &sk);
    Ok(SignatureBytes(sig.serialize_der().to_vec()))
}

/// Verify a DER-encoded secp256k1 ECDSA signature over a pre-hashed digest.
pub fn verify(
    public_key: &PublicKeyBytes,
    digest: &[u8; 32],
    signature: &SignatureBytes,
) -> Result<(), SignatureError> {
    let secp = Secp256k1::verification_only();
    let pk = PublicKey::from_slice(&public_key.0).map_err(|_| SignatureError::InvalidPublicKey)?;
    let sig = Signature::from_der(&signature.0).map_err(|_| SignatureError::InvalidSignature)?;
    let msg = Message::from_digest(*digest);
    secp.verify_ecdsa(&msg, &sig, &pk)
        .map_err(|_| SignatureError::InvalidSignature)
}

/// Stateless signer bound to one keypair, used by block producers, quorum
/// members, and wallet transaction builders alike.
pub struct KhuSigner {
    pub public_key: PublicKeyBytes,
    secret_key_bytes: zeroize::Zeroizing<Vec<u8>>,
}

impl KhuSigner {
    pub fn from_secret_key_bytes(sk_bytes: Vec<u8>, pk_bytes: Vec<u8>) -> Self {
        Self {
            public_key: PublicKeyBytes(pk_bytes),
            secret_key_bytes: zeroize::Zeroizing::new(sk_bytes),
        }
    }

    pub fn sign(&self, digest: &[u8; 32]) -> Result<SignatureBytes, SignatureError> {
        sign(&self.secret_key_bytes, digest)
    }

    pub fn verify(&self, digest: &[u8; 32], sig: &SignatureBytes) -> Result<(), SignatureError> {
        verify(&self.public_key, digest, sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut rand::thread_rng());
        let signer = KhuSigner::from_secret_key_bytes(
            sk.secret_bytes().to_vec(),
            pk.serialize().to_vec(),
        );
        let digest = crate::hash::sha256_hash(b"the treasury accrues daily");
        let sig = signer.sign(&digest).unwrap();
        assert!(signer.verify(&digest, &sig).is_ok());
    }

    #[test]
    fn tampered_digest_fails() {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut rand::thread_rng());
        let signer = KhuSigner::from_secret_key_bytes(
            sk.secret_bytes().to_vec(),
            pk.serialize().to_vec(),
        );
        let sig = signer.sign(&crate::hash::sha256_hash(b"original")).unwrap();
        assert!(signer
            .verify(&crate::hash::sha256_hash(b"tampered"), &sig)
            .is_err());
    }
}
