//! Codec for encoding and decoding handshakes.
//!
//! This has to be a separate codec as the handshake has a different
//! structure than the rest of the messages. Moreover, handshakes may only
//! be sent once at the beginning of a connection, preceding all other
//! messages. Thus, after receiving and sending a handshake the codec
//! should be switched to [`CoreCodec`](super::CoreCodec), but care should be
//! taken not to discard the underlying receive and send buffers.

use bytes::{Buf, BytesMut};
use speedy::{BigEndian, Readable, Writable};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use super::PSTR;
use crate::{error::Error, metainfo::InfoHash, peer::PeerId};

/// Size of a serialized handshake.
pub const HANDSHAKE_LEN: usize = 1 + 19 + 8 + 20 + 20;

#[derive(Debug)]
pub struct HandshakeCodec;

impl Encoder<Handshake> for HandshakeCodec {
    type Error = Error;

    fn encode(
        &mut self,
        handshake: Handshake,
        buf: &mut BytesMut,
    ) -> Result<(), Error> {
        // we should only be sending the bittorrent protocol string
        debug_assert_eq!(handshake.pstr, PSTR);

        buf.extend_from_slice(&handshake.serialize()?);
        Ok(())
    }
}

impl Decoder for HandshakeCodec {
    type Item = Handshake;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Handshake>, Error> {
        if buf.is_empty() {
            return Ok(None);
        }

        // peek at the protocol length without consuming it, we are not sure
        // yet that the whole handshake is in the buffer.
        if buf[0] as usize != PSTR.len() {
            warn!("handshake with wrong pstr_len {}", buf[0]);
            return Err(Error::HandshakeInvalid);
        }

        if buf.len() < HANDSHAKE_LEN {
            return Ok(None);
        }

        // only consume the handshake itself, the peer may have sent
        // messages right after it and they must stay in the buffer.
        let handshake = Handshake::deserialize(&buf[..HANDSHAKE_LEN])?;
        buf.advance(HANDSHAKE_LEN);

        Ok(Some(handshake))
    }
}

/// pstrlen = 19
/// pstr = "BitTorrent protocol"
/// This is the very first message exchanged. If the peer's protocol string
/// (`BitTorrent protocol`) or the info hash differs from ours, the connection
/// is severed. The reserved field is 8 zero bytes, no extensions are
/// supported.
#[derive(Clone, Debug, PartialEq, Writable, Readable)]
pub struct Handshake {
    pub pstr_len: u8,
    pub pstr: [u8; 19],
    pub reserved: [u8; 8],
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
}

impl Handshake {
    pub fn new(info_hash: InfoHash, peer_id: PeerId) -> Self {
        Self {
            pstr_len: PSTR.len() as u8,
            pstr: PSTR,
            reserved: [0u8; 8],
            info_hash,
            peer_id,
        }
    }

    pub fn serialize(&self) -> Result<[u8; HANDSHAKE_LEN], Error> {
        let mut buf = [0u8; HANDSHAKE_LEN];
        let temp = self.write_to_vec_with_ctx(BigEndian {})?;
        buf.copy_from_slice(&temp[..]);
        Ok(buf)
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, Error> {
        Ok(Self::read_from_buffer_with_ctx(BigEndian {}, buf)?)
    }

    /// Check the handshake a remote peer sent in response to `self`.
    pub fn validate(&self, target: &Self) -> Result<(), Error> {
        if target.pstr_len != 19 || target.pstr != PSTR {
            warn!("handshake with wrong pstr, dropping connection");
            return Err(Error::HandshakeInvalid);
        }
        if self.info_hash != target.info_hash {
            warn!("info_hash from receiving handshake does not match ours");
            return Err(Error::InfoHashMismatch {
                expected: self.info_hash.clone(),
                actual: target.info_hash.clone(),
            });
        }
        Ok(())
    }
}
