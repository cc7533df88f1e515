//! Versioned length framing for update packets.
//!
//! Format (little-endian):
//! - u8 `FRAME_VERSION` (1)
//! - u32 LEN (bytes of payload)
//! - [u8; LEN] payload
//!
//! Framing lets a stream transport delimit packets without peeking into the
//! bit-packed payload. The payload itself is an [`crate::update::UpdatePacket`]
//! encoding.

const FRAME_VERSION: u8 = 1;
const MAX_FRAME_LEN: usize = 65_536; // 64 KiB cap; no legitimate tick exceeds this

/// Write a framed message into `out`, appending to any existing bytes.
///
/// # Panics
/// Panics if `payload` exceeds [`MAX_FRAME_LEN`]; the assembler never produces
/// a packet that large.
pub fn write_msg(out: &mut Vec<u8>, payload: &[u8]) {
    assert!(
        payload.len() <= MAX_FRAME_LEN,
        "frame payload {} exceeds cap {MAX_FRAME_LEN}",
        payload.len()
    );
    out.push(FRAME_VERSION);
    let len = payload.len() as u32;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
}

/// Read a single framed message from `inp`. Returns the payload slice on success.
///
/// The returned slice borrows from `inp` and is valid as long as `inp` is.
pub fn read_msg(inp: &[u8]) -> anyhow::Result<&[u8]> {
    use anyhow::bail;
    if inp.len() < 5 {
        bail!("short frame header");
    }
    let ver = inp[0];
    if ver != FRAME_VERSION {
        bail!("unsupported frame version: {ver}");
    }
    let mut lenb = [0u8; 4];
    lenb.copy_from_slice(&inp[1..5]);
    let len = u32::from_le_bytes(lenb) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame too large: {len} > {MAX_FRAME_LEN}");
    }
    if inp.len() < 5 + len {
        bail!("short frame payload");
    }
    Ok(&inp[5..5 + len])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    #[test]
    fn roundtrip_frame() {
        let payload = b"tick";
        let mut buf = Vec::new();
        write_msg(&mut buf, payload);
        let got = read_msg(&buf).expect("read");
        assert_eq!(got, payload);
    }
    #[test]
    fn rejects_wrong_version_and_oversize() {
        let mut buf = vec![2u8, 0, 0, 0, 0];
        assert!(read_msg(&buf).is_err());
        buf[0] = FRAME_VERSION;
        buf[1..5].copy_from_slice(&(u32::MAX).to_le_bytes());
        assert!(read_msg(&buf).is_err());
    }
    #[test]
    fn short_payload_is_an_error() {
        let mut buf = Vec::new();
        write_msg(&mut buf, &[1, 2, 3, 4]);
        assert!(read_msg(&buf[..buf.len() - 1]).is_err());
    }
}
