//! ICMPv4 echo wire format
//!
//! This module defines the echo request/reply messages, the Internet
//! checksum, and a codec that turns raw socket datagrams into messages.

pub mod codec;
pub mod message;

pub use self::codec::IcmpCodec;
pub use self::message::{
    checksum, strip_ipv4_header, verify_checksum, EchoKind, EchoMessage, ICMP_ECHO_REPLY,
    ICMP_ECHO_REQUEST,
};
