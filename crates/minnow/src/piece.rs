//! State of a piece while its blocks are being downloaded.
use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    error::Error,
    tcp_wire::{Block, BlockInfo},
};

/// A piece being assembled from the blocks a peer sends.
///
/// Blocks are handed out by [`PieceDownload::next_request`] in ascending
/// offset order, and each block received must match one of the requests
/// still outstanding, by `(index, begin)` and length.
#[derive(Debug)]
pub struct PieceDownload {
    index: u32,
    hash: [u8; 20],
    blocks: Vec<BlockInfo>,
    /// Position in `blocks` of the next block to request.
    next: usize,
    /// Requested blocks without a response yet, keyed by `begin`.
    outstanding: BTreeMap<u32, BlockInfo>,
    downloaded: usize,
    buf: Vec<u8>,
}

impl PieceDownload {
    pub fn new(index: u32, len: u32, hash: [u8; 20]) -> Self {
        Self {
            index,
            hash,
            blocks: BlockInfo::split_piece(index, len),
            next: 0,
            outstanding: BTreeMap::new(),
            downloaded: 0,
            buf: vec![0u8; len as usize],
        }
    }

    /// Every block of the piece, in ascending offset order.
    pub fn block_infos(&self) -> &[BlockInfo] {
        &self.blocks
    }

    /// How many requests are waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.outstanding.len()
    }

    /// The next block to request, which is then marked as outstanding.
    pub fn next_request(&mut self) -> Option<BlockInfo> {
        let info = *self.blocks.get(self.next)?;
        self.next += 1;
        self.outstanding.insert(info.begin, info);
        Some(info)
    }

    /// Write a received block at its offset in the piece.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedBlock`] if the block does not match an
    /// outstanding request.
    pub fn add_block(&mut self, block: Block) -> Result<(), Error> {
        let actual = BlockInfo::from(&block);

        let requested = self
            .outstanding
            .get(&block.begin)
            .copied()
            .filter(|info| block.index == self.index && *info == actual);

        let Some(info) = requested else {
            let expected = self
                .outstanding
                .get(&block.begin)
                .or_else(|| self.outstanding.values().next())
                .copied();
            return Err(Error::UnexpectedBlock { expected, actual });
        };

        self.outstanding.remove(&info.begin);

        let begin = info.begin as usize;
        self.buf[begin..begin + block.block.len()].copy_from_slice(&block.block);
        self.downloaded += block.block.len();

        debug!(
            "piece {} got block {info:?}, {}/{} bytes",
            self.index,
            self.downloaded,
            self.buf.len()
        );

        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.next == self.blocks.len()
            && self.outstanding.is_empty()
            && self.downloaded == self.buf.len()
    }

    /// Check the SHA-1 of the assembled piece, returning its bytes.
    ///
    /// # Errors
    ///
    /// [`Error::PieceInvalid`] if the piece is incomplete or its hash does
    /// not match.
    pub fn verify(self) -> Result<Vec<u8>, Error> {
        if !self.is_complete() {
            return Err(Error::PieceInvalid { index: self.index });
        }

        let hash = sha1_smol::Sha1::from(&self.buf).digest().bytes();
        if hash != self.hash {
            return Err(Error::PieceInvalid { index: self.index });
        }

        Ok(self.buf)
    }
}
