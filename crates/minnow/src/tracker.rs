//! HTTP tracker, used to find the peers of a torrent.
use std::net::{Ipv4Addr, SocketAddrV4};

use reqwest::Client;
use tracing::{debug, info};

use crate::{
    bencode::{self, Value},
    error::Error,
    metainfo::TorrentInfo,
    peer::PeerId,
};

/// Size of each peer in a compact peer list, 4 bytes for the IPv4 and 2
/// for the port.
pub const COMPACT_PEER_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct Tracker {
    client: Client,
    pub peer_id: PeerId,
    /// The port we say we are listening on.
    pub port: u16,
}

impl Tracker {
    pub fn new(peer_id: PeerId, port: u16) -> Self {
        Self { client: Client::new(), peer_id, port }
    }

    /// The announce URL with its query. The info hash and peer id are
    /// percent-encoded byte by byte.
    pub fn announce_url(&self, torrent: &TorrentInfo) -> String {
        let separator = if torrent.announce.contains('?') { '&' } else { '?' };

        format!(
            "{}{separator}info_hash={}&peer_id={}&port={}&uploaded=0&\
             downloaded=0&left={}&compact=1",
            torrent.announce,
            urlencoding::encode_binary(&torrent.info_hash.0),
            urlencoding::encode_binary(self.peer_id.as_bytes()),
            self.port,
            torrent.length,
        )
    }

    /// Announce ourselves and return the peers of the torrent.
    ///
    /// # Errors
    ///
    /// [`Error::TrackerStatus`] if the tracker does not respond with a
    /// success status, [`Error::TrackerFailure`] if it responds with a
    /// failure reason.
    pub async fn announce(
        &self,
        torrent: &TorrentInfo,
    ) -> Result<Vec<SocketAddrV4>, Error> {
        let url = self.announce_url(torrent);
        debug!("announcing to {url}");

        let res = self.client.get(&url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::TrackerStatus(status.as_u16()));
        }

        let body = res.bytes().await?;
        let peers = Self::parse_response(&body)?;

        info!("tracker returned {} peers", peers.len());

        Ok(peers)
    }

    /// Parse the bencoded body of an announce response.
    pub fn parse_response(buf: &[u8]) -> Result<Vec<SocketAddrV4>, Error> {
        let value = bencode::decode_exact(buf)?;
        if value.as_dict().is_none() {
            return Err(Error::NotADictionary);
        }

        if let Some(reason) = value.get(b"failure reason").and_then(Value::as_bytes)
        {
            return Err(Error::TrackerFailure(
                String::from_utf8_lossy(reason).into_owned(),
            ));
        }

        if let Some(interval) = value.get(b"interval").and_then(Value::as_integer)
        {
            debug!("tracker interval is {interval}s");
        }

        let peers = value
            .get(b"peers")
            .and_then(Value::as_bytes)
            .ok_or(Error::MissingField("peers"))?;

        parse_compact_peer_list(peers)
    }
}

/// Split a compact peer list into the addresses of the peers.
///
/// # Errors
///
/// [`Error::TrackerCompactPeerList`] if the list length is not a multiple
/// of 6.
pub fn parse_compact_peer_list(buf: &[u8]) -> Result<Vec<SocketAddrV4>, Error> {
    if buf.len() % COMPACT_PEER_LEN != 0 {
        return Err(Error::TrackerCompactPeerList);
    }

    Ok(buf
        .chunks_exact(COMPACT_PEER_LEN)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddrV4::new(ip, port)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bencode::Dict, metainfo::InfoHash};

    fn torrent(announce: &str) -> TorrentInfo {
        let mut info = Dict::new();
        info.insert(b"length".to_vec(), Value::Integer(100));
        info.insert(b"piece length".to_vec(), Value::Integer(100));
        info.insert(b"pieces".to_vec(), Value::Bytes(vec![0u8; 20]));

        let mut root = Dict::new();
        root.insert(b"announce".to_vec(), Value::from(announce));
        root.insert(b"info".to_vec(), Value::Dict(info));

        let mut t = TorrentInfo::from_value(Value::Dict(root)).unwrap();
        t.info_hash = InfoHash([
            0xd6, b'a', b' ', 0x9f, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
            13, 14, 15,
        ]);
        t
    }

    #[test]
    fn compact_peer_list() {
        let buf = [127, 0, 0, 1, 0x1a, 0xe1, 10, 0, 0, 2, 0, 80];
        let peers = parse_compact_peer_list(&buf).unwrap();
        assert_eq!(
            peers,
            vec![
                "127.0.0.1:6881".parse::<SocketAddrV4>().unwrap(),
                "10.0.0.2:80".parse().unwrap(),
            ]
        );

        assert!(parse_compact_peer_list(&[]).unwrap().is_empty());
        assert!(matches!(
            parse_compact_peer_list(&buf[..7]),
            Err(Error::TrackerCompactPeerList)
        ));
    }

    #[test]
    fn response() {
        let body = b"d8:intervali60e5:peers6:\x7f\x00\x00\x01\x1a\xe1e";
        let peers = Tracker::parse_response(body).unwrap();
        assert_eq!(peers, vec!["127.0.0.1:6881".parse().unwrap()]);

        let body = b"d14:failure reason12:unregisterede";
        assert!(matches!(
            Tracker::parse_response(body),
            Err(Error::TrackerFailure(r)) if r == "unregistered"
        ));

        let body = b"d8:intervali60ee";
        assert!(matches!(
            Tracker::parse_response(body),
            Err(Error::MissingField("peers"))
        ));

        let body = b"d5:peers5:abcdee";
        assert!(matches!(
            Tracker::parse_response(body),
            Err(Error::TrackerCompactPeerList)
        ));
    }

    #[test]
    fn url() {
        let tracker = Tracker::new(
            "-MN0001-abcdefghijkl".parse().unwrap(),
            6881,
        );

        let url = tracker.announce_url(&torrent("http://t.example/announce"));
        assert_eq!(
            url,
            "http://t.example/announce?info_hash=%D6a%20%9F%00%01%02%03%04%05%\
             06%07%08%09%0A%0B%0C%0D%0E%0F&peer_id=-MN0001-abcdefghijkl&\
             port=6881&uploaded=0&downloaded=0&left=100&compact=1"
        );

        let url = tracker.announce_url(&torrent("http://t.example/a?key=1"));
        assert!(url.starts_with("http://t.example/a?key=1&info_hash="));
    }
}
