//! lanscout wire format — probe and reply datagrams.
//!
//! The protocol carries almost no structure. A probe is an opaque fixed byte
//! sequence, one per device kind, broadcast to `<prefix>.255:730`. A reply is
//! a two byte tag/length header followed by the device's ASCII name. The
//! header is not parsed beyond being stripped; the reply source address is
//! the device identity.

use serde::{Deserialize, Serialize};

/// Well-known UDP port devices listen on for probes.
pub const PROBE_PORT: u16 = 730;

/// Every probe datagram is exactly this long.
pub const PROBE_LEN: usize = 4;

/// Tag/length prefix at the start of every reply.
pub const REPLY_HEADER_LEN: usize = 2;

/// Receive buffer size. Replies are far smaller in practice.
pub const MAX_DATAGRAM: usize = 1024;

// ── Probes & signatures ───────────────────────────────────────────────────────

/// Probe soliciting replies from JTAG-attached units.
pub const JTAG_PROBE: [u8; PROBE_LEN] = [0x03, 0x02, 0x00, 0x00];

/// Probe soliciting replies from devkit units.
pub const DEVKIT_PROBE: [u8; PROBE_LEN] = [0x03, 0x01, 0x00, 0x00];

/// Full reply payload sent by a JTAG-attached unit.
pub const JTAG_SIGNATURE: &[u8] = &[0x03, 0x04, b'j', b't', b'a', b'g'];

/// Full reply payload sent by a devkit unit.
pub const DEVKIT_SIGNATURE: &[u8] = &[0x03, 0x06, b'd', b'e', b'v', b'k', b'i', b't'];

/// Protocol variant of a responding device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Reply did not match any known signature.
    #[default]
    Unknown,
    Jtag,
    Devkit,
}

impl DeviceKind {
    /// Variants that have a probe and a reply signature.
    pub const KNOWN: [DeviceKind; 2] = [DeviceKind::Jtag, DeviceKind::Devkit];

    /// The probe datagram for this variant. `None` for `Unknown`.
    pub fn probe(self) -> Option<&'static [u8; PROBE_LEN]> {
        match self {
            DeviceKind::Jtag => Some(&JTAG_PROBE),
            DeviceKind::Devkit => Some(&DEVKIT_PROBE),
            DeviceKind::Unknown => None,
        }
    }

    /// The reply signature for this variant. `None` for `Unknown`.
    pub fn signature(self) -> Option<&'static [u8]> {
        match self {
            DeviceKind::Jtag => Some(JTAG_SIGNATURE),
            DeviceKind::Devkit => Some(DEVKIT_SIGNATURE),
            DeviceKind::Unknown => None,
        }
    }

    /// Classify a reply by matching the whole payload against the known signatures.
    pub fn from_signature(payload: &[u8]) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|kind| kind.signature() == Some(payload))
            .unwrap_or(DeviceKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Unknown => "unknown",
            DeviceKind::Jtag => "jtag",
            DeviceKind::Devkit => "devkit",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Replies ───────────────────────────────────────────────────────────────────

/// A decoded reply datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// First header byte. Kept for logging only.
    pub tag: u8,
    /// Device display name, bytes 2.. of the payload.
    pub name: String,
    /// Variant inferred from the full payload.
    pub kind: DeviceKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    #[error("reply too short: {0} bytes")]
    TooShort(usize),
}

/// Decode a reply datagram.
///
/// The two header bytes are discarded, the rest is the device name read as
/// ASCII: bytes above 0x7f become `?` and trailing NULs and whitespace are
/// stripped. The name may be empty. Only a payload missing its header is
/// rejected, since the sender address alone identifies the device.
pub fn decode_reply(payload: &[u8]) -> Result<Reply, ReplyError> {
    if payload.len() < REPLY_HEADER_LEN {
        return Err(ReplyError::TooShort(payload.len()));
    }

    let name: String = payload[REPLY_HEADER_LEN..]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();
    let name = name
        .trim_end_matches(|c: char| c == '\0' || c.is_ascii_whitespace())
        .to_string();

    Ok(Reply {
        tag: payload[0],
        name,
        kind: DeviceKind::from_signature(payload),
    })
}
