//! A library for downloading files with the BitTorrent protocol V1.
//!
//! This is the library created for Minnow, a small BitTorrent client. It
//! only speaks the vanilla protocol: single-file torrents, HTTP trackers
//! and one peer connection at a time.
//!
//! The building blocks, from the bottom up:
//!
//! * [bencode], the serialization format of `.torrent` files and tracker
//!   responses.
//! * [metainfo], the metadata of a torrent and its info hash.
//! * [tracker], to find the peers of a torrent.
//! * [tcp_wire] and [peer], the messages exchanged with a peer and the
//!   state of a connection.
//! * [piece] and [download], to assemble and verify pieces.
//!
//! # Example
//!
//! ```no_run
//! use minnow::{
//!     config::Config, download::Downloader, metainfo::TorrentInfo,
//!     tracker::Tracker,
//! };
//!
//! # async fn run() -> Result<(), minnow::error::Error> {
//! let config = Config::default();
//! let peer_id = config.peer_id()?;
//!
//! let torrent = TorrentInfo::from_bytes(&std::fs::read("sample.torrent")?)?;
//! let peers = Tracker::new(peer_id.clone(), config.port)
//!     .announce(&torrent)
//!     .await?;
//!
//! let downloader = Downloader::new(torrent, peer_id, config);
//! let file = downloader.download_all(&peers).await?;
//! # Ok(())
//! # }
//! ```

pub mod bencode;
pub mod config;
pub mod download;
pub mod error;
pub mod metainfo;
pub mod peer;
pub mod piece;
pub mod tcp_wire;
pub mod tracker;
