pub mod htlc;
pub mod opcodes;
pub mod p2pkh;

pub use htlc::{hash160, resolve_branch, HtlcScript, HtlcWitness};
pub use p2pkh::{decode_p2pkh, encode_p2pkh, verify_p2pkh_spend};
