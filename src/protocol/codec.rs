use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::core::Error;
use super::message::{strip_ipv4_header, EchoMessage};

/// Echo message codec for raw ICMP datagrams
///
/// Each call to `decode` consumes the whole buffer as one datagram; raw
/// sockets preserve message boundaries so there is nothing to reassemble.
#[derive(Debug, Clone, Default)]
pub struct IcmpCodec;

impl IcmpCodec {
    /// Creates a new ICMP codec
    pub fn new() -> Self {
        IcmpCodec
    }
}

impl Decoder for IcmpCodec {
    type Item = EchoMessage;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split();
        let icmp = strip_ipv4_header(&datagram)?;
        EchoMessage::parse(icmp).map(Some)
    }
}

impl Encoder<EchoMessage> for IcmpCodec {
    type Error = Error;

    fn encode(&mut self, item: EchoMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}
