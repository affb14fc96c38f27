//! Download pieces of a torrent from the first peer that accepts us.
use std::net::SocketAddr;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::Error,
    metainfo::TorrentInfo,
    peer::{Peer, PeerId},
    piece::PieceDownload,
};

/// Downloads and verifies the pieces of one torrent.
///
/// Peers are tried one at a time, in the order they are given, and all the
/// pieces requested are downloaded from the first peer that handshakes.
#[derive(Debug, Clone)]
pub struct Downloader {
    torrent: TorrentInfo,
    local_peer_id: PeerId,
    config: Config,
}

impl Downloader {
    pub fn new(torrent: TorrentInfo, local_peer_id: PeerId, config: Config) -> Self {
        Self { torrent, local_peer_id, config }
    }

    /// Handshake with the first reachable peer of `peers`.
    ///
    /// # Errors
    ///
    /// [`Error::NoReachablePeers`] if every peer failed.
    pub async fn connect_any<A>(&self, peers: &[A]) -> Result<Peer<TcpStream>, Error>
    where
        A: Into<SocketAddr> + Copy,
    {
        for addr in peers.iter().copied().map(Into::<SocketAddr>::into) {
            match Peer::connect(
                addr,
                self.torrent.info_hash.clone(),
                self.local_peer_id.clone(),
                &self.config,
            )
            .await
            {
                Ok(peer) => {
                    info!("connected to {addr}, peer id {}", peer.id);
                    return Ok(peer);
                }
                Err(e) => warn!("could not connect to {addr}: {e}"),
            }
        }

        Err(Error::NoReachablePeers(peers.len()))
    }

    /// Download the piece `index` from an unchoked `peer` and verify it.
    ///
    /// # Errors
    ///
    /// [`Error::PieceInvalid`] if the piece does not match its hash, which
    /// is not retried.
    pub async fn download_piece<S>(
        &self,
        peer: &mut Peer<S>,
        index: u32,
    ) -> Result<Vec<u8>, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let len = self.piece_len(index)?;
        let hash = *self.torrent.piece_hash(index)?;

        debug!("downloading piece {index} of {len} bytes from {}", peer.addr);

        let mut piece = PieceDownload::new(index, len, hash);
        peer.download_piece(&mut piece).await?;
        let buf = piece.verify()?;

        info!("downloaded piece {index}");

        Ok(buf)
    }

    /// Download the pieces `indices`, in the given order, over a single
    /// connection. The pieces are concatenated in the returned buffer.
    pub async fn download<A>(
        &self,
        peers: &[A],
        indices: &[u32],
    ) -> Result<Vec<u8>, Error>
    where
        A: Into<SocketAddr> + Copy,
    {
        // fail on a bad index before opening any connection
        for index in indices {
            self.piece_len(*index)?;
        }

        let peer = self.connect_any(peers).await?;
        self.download_from(peer, indices).await
    }

    /// Download the pieces `indices` from a handshaked `peer` and close the
    /// connection. A failure to close is only logged, the pieces are
    /// already verified.
    pub async fn download_from<S>(
        &self,
        mut peer: Peer<S>,
        indices: &[u32],
    ) -> Result<Vec<u8>, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        peer.negotiate().await?;

        let mut buf = Vec::new();
        for index in indices {
            let piece = self.download_piece(&mut peer, *index).await?;
            buf.extend_from_slice(&piece);
        }

        let addr = peer.addr;
        if let Err(e) = peer.close().await {
            warn!("could not close the connection with {addr}: {e}");
        }

        Ok(buf)
    }

    /// Download the entire file.
    pub async fn download_all<A>(&self, peers: &[A]) -> Result<Vec<u8>, Error>
    where
        A: Into<SocketAddr> + Copy,
    {
        let count = u32::try_from(self.torrent.piece_count())
            .map_err(|_| Error::InvalidField("pieces"))?;
        let indices: Vec<u32> = (0..count).collect();
        self.download(peers, &indices).await
    }

    fn piece_len(&self, index: u32) -> Result<u32, Error> {
        let len = self.torrent.piece_len(index)?;
        u32::try_from(len).map_err(|_| Error::InvalidField("piece length"))
    }
}
