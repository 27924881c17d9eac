/// Opcodes for the small stack-based language `khu-script` evaluates. This
/// is not a general-purpose script VM; it recognizes exactly the shapes the
/// consensus layer needs (plain P2PKH spends and the two-branch HTLC below)
/// and rejects anything else during decode rather than trying to interpret
/// arbitrary programs.
pub const OP_PUSH: u8 = 0x01;
pub const OP_IF: u8 = 0x63;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_SIZE: u8 = 0x82;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_DUP: u8 = 0x76;
pub const OP_DROP: u8 = 0x75;
pub const OP_CLTV: u8 = 0xb1;
pub const OP_CHECKSIG: u8 = 0xac;

/// A length-prefixed push of 1-255 bytes. Longer pushes (there are none in
/// this language) are out of scope.
pub fn push(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    out.push(0x01);
    out.push(data.len() as u8);
    out.extend_from_slice(data);
    out
}

/// Reads a single pushdata item at `pos`, returning the slice and the
/// position just past it.
pub fn read_push(bytes: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    if bytes.get(pos)? != &0x01 {
        return None;
    }
    let len = *bytes.get(pos + 1)? as usize;
    let start = pos + 2;
    let end = start + len;
    let slice = bytes.get(start..end)?;
    Some((slice, end))
}
