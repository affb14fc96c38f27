use std::io;

use thiserror::Error;

use crate::{bencode, metainfo::InfoHash, tcp_wire::BlockInfo};

impl From<speedy::Error> for Error {
    fn from(_value: speedy::Error) -> Self {
        Self::HandshakeInvalid
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to decode the bencode buffer: {0}")]
    BencodeError(#[from] bencode::Error),

    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("The torrent must be a bencoded dictionary")]
    NotADictionary,

    #[error("Missing or invalid field `{0}`")]
    MissingField(&'static str),

    #[error("The field `{0}` has a value out of range")]
    InvalidField(&'static str),

    #[error(
        "The length of `pieces` must be a multiple of 20, but it has {0} \
         bytes"
    )]
    InvalidPiecesLength(usize),

    #[error(
        "The torrent has {actual} piece hashes, but its length requires \
         {expected}"
    )]
    PieceCountMismatch { expected: u64, actual: u64 },

    #[error("Piece {index} does not exist, the torrent has {count} pieces")]
    PieceIndexOutOfRange { index: u32, count: u64 },

    #[error("The tracker responded with a failure: {0}")]
    TrackerFailure(String),

    #[error("The tracker responded with the HTTP status {0}")]
    TrackerStatus(u16),

    #[error("The peer list returned by the announce request is not valid")]
    TrackerCompactPeerList,

    #[error("The handshake received is not valid")]
    HandshakeInvalid,

    #[error(
        "The peer is serving the torrent {actual}, but we asked for \
         {expected}"
    )]
    InfoHashMismatch { expected: InfoHash, actual: InfoHash },

    #[error("The peer id must be 40 hex characters or 20 bytes")]
    PeerIdInvalid,

    #[error("The response received from the peer is wrong")]
    MessageResponse,

    #[error("The peer sent a message of {0} bytes, larger than allowed")]
    MessageTooLarge(usize),

    #[error("The message took to long to arrive")]
    MessageTimeout,

    #[error("The peer took to long to accept the connection")]
    ConnectTimeout,

    #[error("The peer closed the socket")]
    PeerClosedSocket,

    #[error("The peer choked us in the middle of a transfer")]
    PeerChoked,

    #[error("Expected a block matching {expected:?}, but received {actual:?}")]
    UnexpectedBlock { expected: Option<BlockInfo>, actual: BlockInfo },

    #[error("The piece {index} downloaded does not have a valid hash")]
    PieceInvalid { index: u32 },

    #[error("Could not handshake with any of the {0} peers")]
    NoReachablePeers(usize),

    #[error("Error while trying to read the configuration file: {0}")]
    ConfigDeserializeError(#[from] toml::de::Error),

    #[error("Tried to load $HOME but could not find it")]
    HomeInvalid,
}
