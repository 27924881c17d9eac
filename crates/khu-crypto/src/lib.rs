pub mod ecdsa;
pub mod hash;
pub mod keypair;

pub use ecdsa::{verify, KhuSigner};
pub use hash::{blake3_hash, sha256_concat, sha256_hash};
pub use keypair::KeyPair;
