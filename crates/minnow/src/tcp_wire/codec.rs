use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use super::{Bitfield, Block, BlockInfo};
use crate::error::Error;

/// Largest frame accepted from a peer. A piece message carries at most one
/// block, so anything bigger than this is garbage.
pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024;

/// Core messages exchanged after a successful handshake.
/// These are from the vanilla protocol, with no extensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Core {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have(u32),
    Bitfield(Bitfield),
    Request(BlockInfo),
    Piece(Block),
    Cancel(BlockInfo),
}

/// The IDs of the [`Core`] messages.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CoreId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
}

impl TryFrom<u8> for CoreId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use CoreId::*;
        Ok(match value {
            0 => Choke,
            1 => Unchoke,
            2 => Interested,
            3 => NotInterested,
            4 => Have,
            5 => Bitfield,
            6 => Request,
            7 => Piece,
            8 => Cancel,
            v => return Err(v),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CoreCodec;

impl Encoder<Core> for CoreCodec {
    type Error = Error;

    fn encode(&mut self, item: Core, buf: &mut BytesMut) -> Result<(), Error> {
        match item {
            Core::KeepAlive => {
                buf.put_u32(0);
            }
            Core::Choke => {
                buf.put_u32(1);
                buf.put_u8(CoreId::Choke as u8);
            }
            Core::Unchoke => {
                buf.put_u32(1);
                buf.put_u8(CoreId::Unchoke as u8);
            }
            Core::Interested => {
                buf.put_u32(1);
                buf.put_u8(CoreId::Interested as u8);
            }
            Core::NotInterested => {
                buf.put_u32(1);
                buf.put_u8(CoreId::NotInterested as u8);
            }
            // <len=0005><id=4><piece index>
            Core::Have(piece) => {
                buf.put_u32(1 + 4);
                buf.put_u8(CoreId::Have as u8);
                buf.put_u32(piece);
            }
            // <len=0001+X><id=5><bitfield>
            Core::Bitfield(bitfield) => {
                let v = bitfield.into_vec();
                buf.put_u32(1 + v.len() as u32);
                buf.put_u8(CoreId::Bitfield as u8);
                buf.extend_from_slice(&v);
            }
            // <len=0013><id=6><index><begin><length>
            Core::Request(info) => {
                buf.put_u32(1 + 4 + 4 + 4);
                buf.put_u8(CoreId::Request as u8);
                info.encode(buf);
            }
            // <len=0009+X><id=7><index><begin><block>
            Core::Piece(block) => {
                buf.put_u32(1 + 4 + 4 + block.block.len() as u32);
                buf.put_u8(CoreId::Piece as u8);
                block.encode(buf);
            }
            // <len=0013><id=8><index><begin><length>
            Core::Cancel(info) => {
                buf.put_u32(1 + 4 + 4 + 4);
                buf.put_u8(CoreId::Cancel as u8);
                info.encode(buf);
            }
        }
        Ok(())
    }
}

impl Decoder for CoreCodec {
    type Item = Core;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Core>, Error> {
        // the message length header must be present at the minimum, otherwise
        // we can't determine the message type
        if buf.len() < 4 {
            return Ok(None);
        }

        // peek at length prefix without consuming
        let size =
            u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        if size == 0 {
            buf.advance(4);
            return Ok(Some(Core::KeepAlive));
        }

        if size > MAX_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge(size));
        }

        // incomplete message, the frame may arrive split in many reads.
        // Don't advance the cursor, just wait for the rest.
        if buf.len() < 4 + size {
            buf.reserve(4 + size - buf.len());
            return Ok(None);
        }

        let mut frame = buf.split_to(4 + size);
        frame.advance(4);

        let msg_id = frame.get_u8();

        let Ok(msg_id) = CoreId::try_from(msg_id) else {
            // unknown message id, skip the frame and try the next one
            warn!("unknown message_id {msg_id:?}");
            return self.decode(buf);
        };

        // `frame` now holds only the payload
        let payload_len = size - 1;

        let msg = match msg_id {
            CoreId::Choke => Core::Choke,
            CoreId::Unchoke => Core::Unchoke,
            CoreId::Interested => Core::Interested,
            CoreId::NotInterested => Core::NotInterested,
            CoreId::Have => {
                if payload_len != 4 {
                    return Err(Error::MessageResponse);
                }
                Core::Have(frame.get_u32())
            }
            CoreId::Bitfield => Core::Bitfield(Bitfield::from_vec(frame.to_vec())),
            CoreId::Request | CoreId::Cancel => {
                if payload_len != 12 {
                    return Err(Error::MessageResponse);
                }
                let info = BlockInfo {
                    index: frame.get_u32(),
                    begin: frame.get_u32(),
                    len: frame.get_u32(),
                };
                if msg_id == CoreId::Request {
                    Core::Request(info)
                } else {
                    Core::Cancel(info)
                }
            }
            CoreId::Piece => {
                if payload_len < 8 {
                    return Err(Error::MessageResponse);
                }
                let index = frame.get_u32();
                let begin = frame.get_u32();
                Core::Piece(Block { index, begin, block: frame.to_vec() })
            }
        };

        Ok(Some(msg))
    }
}
