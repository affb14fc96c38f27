//! A remote peer in the network that shares the same torrent.
mod types;

use std::{net::SocketAddr, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    time::timeout,
};
use tokio_util::codec::{Framed, FramedParts};
use tracing::{debug, warn};

pub use types::*;

use crate::{
    config::Config,
    error::Error,
    metainfo::InfoHash,
    piece::PieceDownload,
    tcp_wire::{Core, CoreCodec, Handshake, HandshakeCodec},
};

/// The lifecycle of a connection with a peer, it only moves forward.
#[derive(Clone, Default, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    /// The TCP connection was just established.
    #[default]
    Connected,

    /// We sent our handshake and are waiting for theirs.
    HandshakeSent,

    /// The peer answered with a valid handshake for our torrent.
    HandshakeVerified,

    /// Waiting for the peer to tell us which pieces it has.
    AwaitingBitfield,

    /// We told the peer we want its pieces and wait for it to unchoke us.
    Interested,

    /// The peer allows us to request blocks.
    Unchoked,

    /// Block requests are being exchanged.
    Transferring,

    Closed,
}

/// A peer that we have handshaked with.
///
/// The socket is owned by the peer and is released when the peer is
/// dropped, or gracefully with [`Peer::close`].
#[derive(Debug)]
pub struct Peer<S = TcpStream> {
    socket: Framed<S, CoreCodec>,
    pub addr: SocketAddr,
    /// The id the peer sent us in its handshake.
    pub id: PeerId,
    pub state: ConnectionState,
    read_timeout: Duration,
    max_in_flight: usize,
}

impl Peer<TcpStream> {
    /// Open a TCP connection to `addr` and handshake with it.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectTimeout`] if the connection is not accepted within
    /// the configured timeout, or any error of [`Peer::handshake`].
    pub async fn connect(
        addr: SocketAddr,
        info_hash: InfoHash,
        local_peer_id: PeerId,
        config: &Config,
    ) -> Result<Self, Error> {
        debug!("connecting to {addr}");

        let socket = timeout(config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectTimeout)??;

        Self::handshake(socket, addr, info_hash, local_peer_id, config).await
    }
}

impl<S> Peer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send our handshake over `socket` and validate the one the peer sends
    /// back.
    ///
    /// # Errors
    ///
    /// [`Error::HandshakeInvalid`] if the peer closes the socket or sends a
    /// malformed handshake, [`Error::InfoHashMismatch`] if it is serving
    /// another torrent.
    pub async fn handshake(
        socket: S,
        addr: SocketAddr,
        info_hash: InfoHash,
        local_peer_id: PeerId,
        config: &Config,
    ) -> Result<Self, Error> {
        let mut state = ConnectionState::Connected;
        let mut socket = Framed::new(socket, HandshakeCodec);

        let our_handshake = Handshake::new(info_hash, local_peer_id);

        debug!("{addr} sending handshake");
        socket.send(our_handshake.clone()).await?;
        transition(addr, &mut state, ConnectionState::HandshakeSent);

        let their_handshake = match timeout(config.read_timeout(), socket.next())
            .await
        {
            Ok(Some(Ok(their_handshake))) => their_handshake,
            Ok(Some(Err(e))) => {
                warn!("{addr} sent an invalid handshake: {e}");
                return Err(Error::HandshakeInvalid);
            }
            Ok(None) => {
                warn!("{addr} did not send a handshake");
                return Err(Error::HandshakeInvalid);
            }
            Err(_) => return Err(Error::MessageTimeout),
        };

        our_handshake.validate(&their_handshake)?;
        transition(addr, &mut state, ConnectionState::HandshakeVerified);

        // the peer may have sent messages right after its handshake, they
        // are still in the read buffer of the handshake codec.
        let old_parts = socket.into_parts();
        let mut new_parts = FramedParts::new(old_parts.io, CoreCodec);
        new_parts.read_buf = old_parts.read_buf;
        new_parts.write_buf = old_parts.write_buf;
        let socket = Framed::from_parts(new_parts);

        Ok(Self {
            socket,
            addr,
            id: their_handshake.peer_id,
            state,
            read_timeout: config.read_timeout(),
            max_in_flight: config.max_in_flight.max(1) as usize,
        })
    }

    fn set_state(&mut self, new: ConnectionState) {
        transition(self.addr, &mut self.state, new);
    }

    /// Wait for the next message from the peer.
    ///
    /// # Errors
    ///
    /// [`Error::MessageTimeout`] if nothing arrives within the read
    /// timeout, [`Error::PeerClosedSocket`] if the socket was closed.
    pub async fn recv(&mut self) -> Result<Core, Error> {
        match timeout(self.read_timeout, self.socket.next()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => Err(Error::PeerClosedSocket),
            Err(_) => {
                warn!("{} took too long to send a message", self.addr);
                Err(Error::MessageTimeout)
            }
        }
    }

    pub async fn send(&mut self, msg: Core) -> Result<(), Error> {
        self.socket.send(msg).await
    }

    /// Wait for the peer's bitfield, tell it we are interested and wait to
    /// be unchoked.
    ///
    /// Any other message received meanwhile is ignored.
    pub async fn negotiate(&mut self) -> Result<(), Error> {
        self.set_state(ConnectionState::AwaitingBitfield);

        loop {
            match self.recv().await? {
                Core::Bitfield(bitfield) => {
                    debug!(
                        "{} has {} pieces: {:?}",
                        self.addr,
                        bitfield.count_ones(),
                        bitfield.iter_ones().collect::<Vec<_>>()
                    );
                    break;
                }
                msg => {
                    debug!("{} ignoring {msg:?} before bitfield", self.addr)
                }
            }
        }

        self.send(Core::Interested).await?;
        self.set_state(ConnectionState::Interested);

        loop {
            match self.recv().await? {
                Core::Unchoke => break,
                msg => {
                    debug!("{} ignoring {msg:?} before unchoke", self.addr)
                }
            }
        }

        self.set_state(ConnectionState::Unchoked);

        Ok(())
    }

    /// Request every block of `piece` and write the responses into it.
    ///
    /// Up to `max_in_flight` requests are kept outstanding. The piece is
    /// not verified here.
    ///
    /// # Errors
    ///
    /// [`Error::PeerChoked`] if the peer chokes us before the piece is
    /// complete, [`Error::UnexpectedBlock`] if it sends a block that we did
    /// not request.
    pub async fn download_piece(
        &mut self,
        piece: &mut PieceDownload,
    ) -> Result<(), Error> {
        if self.state < ConnectionState::Transferring {
            self.set_state(ConnectionState::Transferring);
        }

        while !piece.is_complete() {
            let mut requested = false;

            while piece.in_flight() < self.max_in_flight {
                let Some(info) = piece.next_request() else { break };
                debug!("{} requesting {info:?}", self.addr);
                self.socket.feed(Core::Request(info)).await?;
                requested = true;
            }

            if requested {
                self.socket.flush().await?;
            }

            match self.recv().await? {
                Core::Piece(block) => piece.add_block(block)?,
                Core::Choke => {
                    warn!("{} choked us during a transfer", self.addr);
                    return Err(Error::PeerChoked);
                }
                msg => debug!("{} ignoring {msg:?}", self.addr),
            }
        }

        Ok(())
    }

    /// Flush any pending message and shut down the socket.
    pub async fn close(mut self) -> Result<(), Error> {
        self.set_state(ConnectionState::Closed);
        self.socket.close().await
    }
}

fn transition(addr: SocketAddr, state: &mut ConnectionState, new: ConnectionState) {
    debug!("{addr} {state:?} -> {new:?}");
    *state = new;
}
