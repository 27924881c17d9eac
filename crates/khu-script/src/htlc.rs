use khu_core::error::KhuError;
use khu_core::types::Script;
use sha2::{Digest, Sha256};

use crate::opcodes::{
    push, read_push, OP_CHECKSIG, OP_CLTV, OP_DROP, OP_DUP, OP_ELSE, OP_ENDIF, OP_EQUALVERIFY,
    OP_HASH160, OP_IF, OP_SHA256, OP_SIZE,
};

/// `HASH160(x)`. The corpus carries no RIPEMD160 crate, so this substitutes
/// the first 20 bytes of double-SHA256 for RIPEMD160(SHA256(x)); the
/// 20-byte pubkey-hash shape the rest of the script expects is unchanged.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let once: [u8; 32] = Sha256::digest(data).into();
    let twice: [u8; 32] = Sha256::digest(once).into();
    let mut out = [0u8; 20];
    out.copy_from_slice(&twice[..20]);
    out
}

/// The two-branch conditional script: either branch A (the hashlock holder,
/// revealing a 32-byte preimage) or branch B (the timelock holder, after
/// `timelock` has passed) may spend the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcScript {
    pub hashlock: [u8; 32],
    pub timelock: u32,
    pub dest_a: [u8; 20],
    pub dest_b: [u8; 20],
}

/// Encode `timelock` as a 5-byte CScriptNum: the 4 little-endian value bytes
/// followed by a zero sign byte, the CLTV convention for pushing a
/// non-negative locktime that may use the full 32 bits.
fn encode_timelock(timelock: u32) -> [u8; 5] {
    let mut out = [0u8; 5];
    out[..4].copy_from_slice(&timelock.to_le_bytes());
    out
}

fn decode_timelock(bytes: &[u8]) -> Result<u32, KhuError> {
    if bytes.len() != 5 {
        return Err(KhuError::InvalidScript("timelock literal must be 5 bytes".into()));
    }
    if bytes[4] != 0 {
        return Err(KhuError::InvalidScript("timelock sign byte must be zero".into()));
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    let timelock = u32::from_le_bytes(raw);
    if timelock == 0 {
        return Err(KhuError::InvalidScript("timelock must be positive".into()));
    }
    Ok(timelock)
}

impl HtlcScript {
    /// `IF SIZE 32 EQUALVERIFY SHA256 <hashlock> EQUALVERIFY DUP HASH160
    /// <destA> ELSE <timelock> CHECKLOCKTIMEVERIFY DROP DUP HASH160 <destB>
    /// ENDIF EQUALVERIFY CHECKSIG`
    pub fn encode(&self) -> Result<Script, KhuError> {
        if self.timelock == 0 {
            return Err(KhuError::InvalidScript("timelock must be positive".into()));
        }
        let mut out = Vec::new();
        out.push(OP_IF);
        out.push(OP_SIZE);
        out.extend(push(&[32]));
        out.push(OP_EQUALVERIFY);
        out.push(OP_SHA256);
        out.extend(push(&self.hashlock));
        out.push(OP_EQUALVERIFY);
        out.push(OP_DUP);
        out.push(OP_HASH160);
        out.extend(push(&self.dest_a));
        out.push(OP_ELSE);
        out.extend(push(&encode_timelock(self.timelock)));
        out.push(OP_CLTV);
        out.push(OP_DROP);
        out.push(OP_DUP);
        out.push(OP_HASH160);
        out.extend(push(&self.dest_b));
        out.push(OP_ENDIF);
        out.push(OP_EQUALVERIFY);
        out.push(OP_CHECKSIG);
        Ok(Script::new(out))
    }

    pub fn decode(script: &Script) -> Result<Self, KhuError> {
        let b = script.as_slice();
        let mut pos = 0usize;
        let expect = |byte: u8, pos: &mut usize, b: &[u8]| -> Result<(), KhuError> {
            if b.get(*pos) != Some(&byte) {
                return Err(KhuError::InvalidScript(format!(
                    "expected opcode {byte:#x} at offset {pos}"
                )));
            }
            *pos += 1;
            Ok(())
        };

        expect(OP_IF, &mut pos, b)?;
        expect(OP_SIZE, &mut pos, b)?;
        let (size_lit, next) = read_push(b, pos)
            .ok_or_else(|| KhuError::InvalidScript("missing SIZE literal".into()))?;
        if size_lit != [32] {
            return Err(KhuError::InvalidScript("hashlock size literal must be 32".into()));
        }
        pos = next;
        expect(OP_EQUALVERIFY, &mut pos, b)?;
        expect(OP_SHA256, &mut pos, b)?;
        let (hashlock_slice, next) =
            read_push(b, pos).ok_or_else(|| KhuError::InvalidScript("missing hashlock".into()))?;
        let mut hashlock = [0u8; 32];
        hashlock.copy_from_slice(hashlock_slice);
        pos = next;
        expect(OP_EQUALVERIFY, &mut pos, b)?;
        expect(OP_DUP, &mut pos, b)?;
        expect(OP_HASH160, &mut pos, b)?;
        let (dest_a_slice, next) =
            read_push(b, pos).ok_or_else(|| KhuError::InvalidScript("missing destA".into()))?;
        let mut dest_a = [0u8; 20];
        dest_a.copy_from_slice(dest_a_slice);
        pos = next;
        expect(OP_ELSE, &mut pos, b)?;
        let (timelock_slice, next) =
            read_push(b, pos).ok_or_else(|| KhuError::InvalidScript("missing timelock".into()))?;
        let timelock = decode_timelock(timelock_slice)?;
        pos = next;
        expect(OP_CLTV, &mut pos, b)?;
        expect(OP_DROP, &mut pos, b)?;
        expect(OP_DUP, &mut pos, b)?;
        expect(OP_HASH160, &mut pos, b)?;
        let (dest_b_slice, next) =
            read_push(b, pos).ok_or_else(|| KhuError::InvalidScript("missing destB".into()))?;
        let mut dest_b = [0u8; 20];
        dest_b.copy_from_slice(dest_b_slice);
        pos = next;
        expect(OP_ENDIF, &mut pos, b)?;
        expect(OP_EQUALVERIFY, &mut pos, b)?;
        expect(OP_CHECKSIG, &mut pos, b)?;

        if pos != b.len() {
            return Err(KhuError::InvalidScript("trailing bytes after CHECKSIG".into()));
        }

        Ok(Self { hashlock, timelock, dest_a, dest_b })
    }
}

/// A satisfying witness for [`HtlcScript`]: branch A supplies the preimage
/// and branch-A pubkey/signature; branch B supplies the branch-B
/// pubkey/signature and is only valid once `current_height`/`current_time`
/// passes the script's timelock.
#[derive(Clone, Debug)]
pub enum HtlcWitness {
    Preimage {
        preimage: [u8; 32],
        pubkey: Vec<u8>,
        signature: khu_core::types::SignatureBytes,
    },
    Timeout {
        pubkey: Vec<u8>,
        signature: khu_core::types::SignatureBytes,
    },
}

/// Evaluate a witness against a decoded HTLC script. Returns the pubkey hash
/// that must match the spending key once CHECKSIG succeeds at the call site
/// (signature verification itself happens in the consensus layer, which has
/// access to the signed transaction digest).
pub fn resolve_branch(
    htlc: &HtlcScript,
    witness: &HtlcWitness,
    current_height: u32,
) -> Result<([u8; 20], Vec<u8>, khu_core::types::SignatureBytes), KhuError> {
    match witness {
        HtlcWitness::Preimage { preimage, pubkey, signature } => {
            let digest: [u8; 32] = Sha256::digest(preimage).into();
            if digest != htlc.hashlock {
                return Err(KhuError::InvalidScript("preimage does not match hashlock".into()));
            }
            if hash160(pubkey) != htlc.dest_a {
                return Err(KhuError::InvalidScript("pubkey does not match destA".into()));
            }
            Ok((htlc.dest_a, pubkey.clone(), signature.clone()))
        }
        HtlcWitness::Timeout { pubkey, signature } => {
            if current_height < htlc.timelock {
                return Err(KhuError::InvalidScript(format!(
                    "timelock not yet reached: need height {}, at {}",
                    htlc.timelock, current_height
                )));
            }
            if hash160(pubkey) != htlc.dest_b {
                return Err(KhuError::InvalidScript("pubkey does not match destB".into()));
            }
            Ok((htlc.dest_b, pubkey.clone(), signature.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HtlcScript {
        HtlcScript {
            hashlock: [7u8; 32],
            timelock: 500_000,
            dest_a: [1u8; 20],
            dest_b: [2u8; 20],
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let htlc = sample();
        let decoded = HtlcScript::decode(&htlc.encode().unwrap()).unwrap();
        assert_eq!(htlc, decoded);
    }

    #[test]
    fn decode_rejects_truncated_script() {
        let htlc = sample();
        let mut bytes = htlc.encode().unwrap().0;
        bytes.truncate(bytes.len() - 3);
        assert!(HtlcScript::decode(&Script::new(bytes)).is_err());
    }

    #[test]
    fn timeout_branch_before_timelock_fails() {
        let htlc = sample();
        let witness = HtlcWitness::Timeout {
            pubkey: vec![9u8; 33],
            signature: khu_core::types::SignatureBytes(vec![]),
        };
        assert!(resolve_branch(&htlc, &witness, htlc.timelock - 1).is_err());
    }

    #[test]
    fn zero_timelock_rejected_on_encode_and_decode() {
        let mut htlc = sample();
        htlc.timelock = 0;
        assert!(htlc.encode().is_err());

        let mut bytes = sample().encode().unwrap().0;
        let else_pos = bytes.iter().position(|&b| b == OP_ELSE).unwrap();
        let timelock_start = else_pos + 1 + 2; // OP_ELSE, then the push marker+length bytes
        bytes[timelock_start..timelock_start + 4].copy_from_slice(&0u32.to_le_bytes());
        assert!(HtlcScript::decode(&Script::new(bytes)).is_err());
    }
}
