//! The "TCP Wire" protocol between peers in the network.
//!
//! A connection starts with a [`Handshake`], after which every message is
//! framed as `<length prefix><message ID><payload>`, see [`Core`].
mod codec;
mod handshake;

pub use codec::*;
pub use handshake::*;

use std::fmt;

use bitvec::{order::Msb0, vec::BitVec};
use bytes::{BufMut, BytesMut};

/// The default block_len that most clients support, some clients drop
/// the connection on blocks larger than this value.
///
/// The last block of a piece might be smaller.
pub const BLOCK_LEN: u32 = 16384;

/// Protocol String
/// String identifier of the string "BitTorrent protocol", in bytes.
pub const PSTR: [u8; 19] = *b"BitTorrent protocol";

/// Pieces that a peer has, byte 0 holds pieces 0-7 from the most
/// significant bit to the least significant bit.
pub type Bitfield = BitVec<u8, Msb0>;

/// A Block is a subset of a Piece,
/// pieces are subsets of the entire Torrent data.
///
/// Peers send us blocks in the "Piece" message of the peer wire protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// The index of the piece this block belongs to.
    pub index: u32,
    /// The zero-based byte offset into the piece.
    pub begin: u32,
    /// The block's data. 16 KiB most of the times,
    /// but the last block of a piece *might* be smaller.
    pub block: Vec<u8>,
}

impl Block {
    /// Encodes the block in the network binary protocol's format into the
    /// given buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.index);
        buf.put_u32(self.begin);
        buf.extend_from_slice(&self.block);
    }
}

/// The representation of a [`Block`].
///
/// When we ask a peer to give us a [`Block`], we send this struct,
/// using the "Request" message of the tcp wire protocol.
///
/// This is almost identical to the [`Block`] struct,
/// the only difference is that instead of having a `block`,
/// we have a `len` representing the len of the block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockInfo {
    /// The index of the piece of which this is a block.
    pub index: u32,
    /// The zero-based byte offset into the piece.
    pub begin: u32,
    /// The block's length in bytes. <= 16 KiB
    pub len: u32,
}

impl fmt::Debug for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}+{}", self.index, self.begin, self.len)
    }
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self { index: 0, begin: 0, len: BLOCK_LEN }
    }
}

impl From<&Block> for BlockInfo {
    fn from(val: &Block) -> Self {
        BlockInfo {
            index: val.index,
            begin: val.begin,
            len: val.block.len() as u32,
        }
    }
}

impl BlockInfo {
    pub fn new(index: u32, begin: u32, len: u32) -> Self {
        Self { index, begin, len }
    }

    /// Encodes the block info in the network binary protocol's format into
    /// the given buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.index);
        buf.put_u32(self.begin);
        buf.put_u32(self.len);
    }

    /// Split a piece of `piece_len` bytes into the blocks that must be
    /// requested to download it, in ascending offset order.
    ///
    /// Every block has [`BLOCK_LEN`] bytes, except the last one which has
    /// whatever is left.
    pub fn split_piece(index: u32, piece_len: u32) -> Vec<BlockInfo> {
        (0..piece_len)
            .step_by(BLOCK_LEN as usize)
            .map(|begin| BlockInfo {
                index,
                begin,
                len: BLOCK_LEN.min(piece_len - begin),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_piece_even() {
        let blocks = BlockInfo::split_piece(3, 32768);
        assert_eq!(
            blocks,
            vec![BlockInfo::new(3, 0, 16384), BlockInfo::new(3, 16384, 16384)]
        );
    }

    #[test]
    fn split_piece_with_remainder() {
        let blocks = BlockInfo::split_piece(0, 20000);
        assert_eq!(
            blocks,
            vec![BlockInfo::new(0, 0, 16384), BlockInfo::new(0, 16384, 3616)]
        );
    }

    #[test]
    fn split_piece_smaller_than_block() {
        assert_eq!(BlockInfo::split_piece(1, 10), vec![BlockInfo::new(1, 0, 10)]);
        assert!(BlockInfo::split_piece(1, 0).is_empty());
    }

    #[test]
    fn split_piece_sums_to_len() {
        for len in [1, 16383, 16384, 16385, 262144, 262143, 100_000] {
            let blocks = BlockInfo::split_piece(0, len);
            let sum: u32 = blocks.iter().map(|b| b.len).sum();
            assert_eq!(sum, len);
            assert!(blocks.iter().all(|b| b.len <= BLOCK_LEN && b.len > 0));
        }
    }
}
