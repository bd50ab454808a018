use bytes::{BufMut, Bytes, BytesMut};

use crate::core::{Error, ProbeIdentity, Result, ICMP_HEADER_SIZE};

/// ICMP type of an echo reply
pub const ICMP_ECHO_REPLY: u8 = 0;

/// ICMP type of an echo request
pub const ICMP_ECHO_REQUEST: u8 = 8;

/// Minimum IPv4 header length in bytes
const IPV4_MIN_HEADER_SIZE: usize = 20;

/// IPv4 protocol number of ICMP
const IPPROTO_ICMP: u8 = 1;

/// The two ICMP messages the prober speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EchoKind {
    /// Echo request (type 8)
    Request,
    /// Echo reply (type 0)
    Reply,
}

impl EchoKind {
    /// Returns the ICMP type byte
    pub fn icmp_type(self) -> u8 {
        match self {
            EchoKind::Request => ICMP_ECHO_REQUEST,
            EchoKind::Reply => ICMP_ECHO_REPLY,
        }
    }

    /// Maps an ICMP type byte to an echo kind
    pub fn from_icmp_type(icmp_type: u8) -> Option<Self> {
        match icmp_type {
            ICMP_ECHO_REQUEST => Some(EchoKind::Request),
            ICMP_ECHO_REPLY => Some(EchoKind::Reply),
            _ => None,
        }
    }
}

/// An ICMPv4 echo request or reply
///
/// ```text
///  0               1               2               3
/// +---------------+---------------+-------------------------------+
/// |     Type      |     Code      |           Checksum            |
/// +---------------+---------------+-------------------------------+
/// |          Identifier           |        Sequence Number        |
/// +-------------------------------+-------------------------------+
/// |                        Payload ...                            |
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoMessage {
    /// Request or reply
    pub kind: EchoKind,
    /// ICMP code, always 0 for echo messages we send
    pub code: u8,
    /// Echo identifier
    pub identifier: u16,
    /// Echo sequence number
    pub sequence: u16,
    /// Opaque payload
    pub payload: Bytes,
}

impl EchoMessage {
    /// Creates an echo request for the given probe
    pub fn request(identity: ProbeIdentity, payload: impl Into<Bytes>) -> Self {
        EchoMessage {
            kind: EchoKind::Request,
            code: 0,
            identifier: identity.identifier,
            sequence: identity.sequence,
            payload: payload.into(),
        }
    }

    /// Creates the echo reply a well-behaved host would answer with
    pub fn reply_to(request: &EchoMessage) -> Self {
        EchoMessage {
            kind: EchoKind::Reply,
            ..request.clone()
        }
    }

    /// Returns the (identifier, sequence) pair carried by this message
    pub fn identity(&self) -> ProbeIdentity {
        ProbeIdentity::new(self.identifier, self.sequence)
    }

    /// Returns the encoded length in bytes
    pub fn encoded_len(&self) -> usize {
        ICMP_HEADER_SIZE + self.payload.len()
    }

    /// Appends the wire form to `dst` with the checksum filled in
    pub fn encode(&self, dst: &mut BytesMut) {
        let start = dst.len();
        dst.reserve(self.encoded_len());

        dst.put_u8(self.kind.icmp_type());
        dst.put_u8(self.code);
        // Checksum is computed with this field zeroed
        dst.put_u16(0);
        dst.put_u16(self.identifier);
        dst.put_u16(self.sequence);
        dst.extend_from_slice(&self.payload);

        let sum = checksum(&dst[start..]);
        dst[start + 2..start + 4].copy_from_slice(&sum.to_be_bytes());
    }

    /// Encodes into a freshly allocated buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Parses an ICMP echo message (without any IP header)
    pub fn parse(src: &[u8]) -> Result<Self> {
        if src.len() < ICMP_HEADER_SIZE {
            return Err(Error::protocol(format!(
                "ICMP message too short: {} bytes",
                src.len()
            )));
        }

        if !verify_checksum(src) {
            return Err(Error::protocol("ICMP checksum mismatch"));
        }

        let kind = EchoKind::from_icmp_type(src[0]).ok_or_else(|| {
            Error::protocol(format!("Not an echo message: ICMP type {}", src[0]))
        })?;

        Ok(EchoMessage {
            kind,
            code: src[1],
            identifier: u16::from_be_bytes([src[4], src[5]]),
            sequence: u16::from_be_bytes([src[6], src[7]]),
            payload: Bytes::copy_from_slice(&src[ICMP_HEADER_SIZE..]),
        })
    }
}

/// Computes the Internet checksum (RFC 1071) of `data`
///
/// Ones'-complement sum of big-endian 16-bit words with carries folded back
/// in; an odd trailing byte is padded with zero.
pub fn checksum(data: &[u8]) -> u16 {
    !fold(sum_words(data))
}

/// Returns true when `data`, checksum field included, sums to all ones
pub fn verify_checksum(data: &[u8]) -> bool {
    fold(sum_words(data)) == 0xffff
}

fn sum_words(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u32 = chunks
        .by_ref()
        .map(|word| u16::from_be_bytes([word[0], word[1]]) as u32)
        .fold(0, u32::wrapping_add);

    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }

    sum
}

fn fold(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    sum as u16
}

/// Strips a leading IPv4 header, if present
///
/// Raw IPv4 sockets on Linux and the BSDs hand back the IP header in front of
/// the ICMP message. ICMP types 64..=79 are unassigned, so a first byte with
/// version nibble 4 is always an IP header.
pub fn strip_ipv4_header(datagram: &[u8]) -> Result<&[u8]> {
    let Some(&first) = datagram.first() else {
        return Err(Error::protocol("Empty datagram"));
    };

    if first >> 4 != 4 {
        return Ok(datagram);
    }

    let header_len = ((first & 0x0f) as usize) * 4;
    if header_len < IPV4_MIN_HEADER_SIZE || datagram.len() < header_len {
        return Err(Error::protocol(format!(
            "Malformed IPv4 header: length {} in {} byte datagram",
            header_len,
            datagram.len()
        )));
    }

    if datagram[9] != IPPROTO_ICMP {
        return Err(Error::protocol(format!(
            "Not an ICMP datagram: protocol {}",
            datagram[9]
        )));
    }

    Ok(&datagram[header_len..])
}
