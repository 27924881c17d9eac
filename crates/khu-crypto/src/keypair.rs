use khu_core::types::PublicKeyBytes;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};

/// A secp256k1 keypair used for masternode operator signing, quorum member
/// signing, and wallet transaction signing alike. The secret scalar is
/// zeroized on drop.
#[derive(Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: PublicKeyBytes,
    secret_key: Vec<u8>,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut rand::thread_rng());
        Self {
            public_key: PublicKeyBytes(pk.serialize().to_vec()),
            secret_key: sk.secret_bytes().to_vec(),
        }
    }

    pub fn sign(&self, digest: &[u8; 32]) -> khu_core::types::SignatureBytes {
        crate::ecdsa::sign(&self.secret_key, digest).expect("sign with valid secret key is infallible")
    }

    pub fn secret_key_bytes(&self) -> &[u8] {
        &self.secret_key
    }

    pub fn from_raw(pk_bytes: Vec<u8>, sk_bytes: Vec<u8>) -> Self {
        Self {
            public_key: PublicKeyBytes(pk_bytes),
            secret_key: sk_bytes,
        }
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.secret_key.zeroize();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ public_key: {:?} }}", self.public_key)
    }
}
