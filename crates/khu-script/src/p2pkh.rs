use khu_core::error::KhuError;
use khu_core::types::{PublicKeyBytes, Script, SignatureBytes};

use crate::htlc::hash160;
use crate::opcodes::{push, read_push, OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};

/// `DUP HASH160 <pubkey_hash> EQUALVERIFY CHECKSIG`, the plain pay-to-pubkey-hash
/// locking script every non-HTLC output uses.
pub fn encode_p2pkh(pubkey_hash: &[u8; 20]) -> Script {
    let mut out = Vec::new();
    out.push(OP_DUP);
    out.push(OP_HASH160);
    out.extend(push(pubkey_hash));
    out.push(OP_EQUALVERIFY);
    out.push(OP_CHECKSIG);
    Script::new(out)
}

pub fn decode_p2pkh(script: &Script) -> Result<[u8; 20], KhuError> {
    let b = script.as_slice();
    let mut pos = 0usize;
    if b.get(pos) != Some(&OP_DUP) {
        return Err(KhuError::InvalidScript("not a P2PKH script".into()));
    }
    pos += 1;
    if b.get(pos) != Some(&OP_HASH160) {
        return Err(KhuError::InvalidScript("not a P2PKH script".into()));
    }
    pos += 1;
    let (hash_slice, next) =
        read_push(b, pos).ok_or_else(|| KhuError::InvalidScript("missing pubkey hash".into()))?;
    if hash_slice.len() != 20 {
        return Err(KhuError::InvalidScript("pubkey hash must be 20 bytes".into()));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(hash_slice);
    pos = next;
    if b.get(pos) != Some(&OP_EQUALVERIFY) || b.get(pos + 1) != Some(&OP_CHECKSIG) {
        return Err(KhuError::InvalidScript("not a P2PKH script".into()));
    }
    Ok(hash)
}

/// Verify `pubkey` unlocks `script_pubkey` and `signature` is valid over
/// `sighash` under that key. The actual ECDSA check is delegated to
/// `khu-crypto`; this layer only checks the scripting shape matches.
pub fn verify_p2pkh_spend(
    script_pubkey: &Script,
    pubkey: &PublicKeyBytes,
    sighash: &[u8; 32],
    signature: &SignatureBytes,
) -> Result<(), KhuError> {
    let expected_hash = decode_p2pkh(script_pubkey)?;
    if hash160(&pubkey.0) != expected_hash {
        return Err(KhuError::InvalidScript("pubkey does not match script".into()));
    }
    khu_crypto::ecdsa::verify(pubkey, sighash, signature)
        .map_err(|_| KhuError::InvalidSignature)
}
