//! A MetaInfo, the content of a `.torrent` file.
//!
//! Only single-file torrents are supported, the `info` dictionary must have
//! a `length`.
use std::fmt;

use speedy::{Readable, Writable};

use crate::{
    bencode::{self, Value},
    error::Error,
};

/// SHA-1 of the bencoded `info` dictionary, it identifies the torrent in
/// the swarm.
#[derive(Clone, PartialEq, Eq, Hash, Default, Readable, Writable)]
pub struct InfoHash(pub [u8; 20]);

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl From<InfoHash> for [u8; 20] {
    fn from(value: InfoHash) -> Self {
        value.0
    }
}

impl InfoHash {
    /// Hash the canonical encoding of an `info` dictionary.
    pub fn from_info(info: &Value) -> Self {
        let buf = bencode::encode(info);
        Self(sha1_smol::Sha1::from(&buf).digest().bytes())
    }
}

/// Torrent metadata, built from a decoded `.torrent` file.
///
/// Immutable once built, the info hash is computed on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentInfo {
    /// URL of the HTTP tracker.
    pub announce: String,
    /// Suggested name of the file.
    pub name: Option<String>,
    /// Length in bytes of the entire file.
    pub length: u64,
    /// Number of bytes in each piece, the last one might be smaller.
    pub piece_length: u64,
    /// SHA-1 of each piece, in order.
    pub piece_hashes: Vec<[u8; 20]>,
    pub info_hash: InfoHash,
    /// The raw `info` dictionary.
    pub info: Value,
}

impl TorrentInfo {
    /// Parse the raw bytes of a `.torrent` file.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, Error> {
        let value = bencode::decode_exact(buf)?;
        Self::from_value(value)
    }

    /// Build from an already decoded `.torrent` dictionary.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Dict(mut dict) = value else {
            return Err(Error::NotADictionary);
        };

        let announce = dict
            .get(&b"announce"[..])
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("announce"))?
            .to_owned();

        let info = dict
            .remove(&b"info"[..])
            .filter(|v| v.as_dict().is_some())
            .ok_or(Error::MissingField("info"))?;

        let length = info
            .get(b"length")
            .and_then(Value::as_integer)
            .ok_or(Error::MissingField("length"))?;
        let length =
            u64::try_from(length).map_err(|_| Error::InvalidField("length"))?;

        let piece_length = info
            .get(b"piece length")
            .and_then(Value::as_integer)
            .ok_or(Error::MissingField("piece length"))?;
        let piece_length = u64::try_from(piece_length)
            .ok()
            .filter(|v| *v > 0)
            .ok_or(Error::InvalidField("piece length"))?;

        let pieces = info
            .get(b"pieces")
            .and_then(Value::as_bytes)
            .ok_or(Error::MissingField("pieces"))?;

        let piece_hashes = Self::split_piece_hashes(pieces)?;

        let expected = length.div_ceil(piece_length);
        if piece_hashes.len() as u64 != expected {
            return Err(Error::PieceCountMismatch {
                expected,
                actual: piece_hashes.len() as u64,
            });
        }

        let name = info.get(b"name").and_then(Value::as_str).map(String::from);
        let info_hash = InfoHash::from_info(&info);

        Ok(Self {
            announce,
            name,
            length,
            piece_length,
            piece_hashes,
            info_hash,
            info,
        })
    }

    /// Split the concatenated 20-byte SHA-1 hashes of `pieces`.
    pub fn split_piece_hashes(pieces: &[u8]) -> Result<Vec<[u8; 20]>, Error> {
        if pieces.len() % 20 != 0 {
            return Err(Error::InvalidPiecesLength(pieces.len()));
        }

        Ok(pieces
            .chunks_exact(20)
            .map(|c| {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(c);
                hash
            })
            .collect())
    }

    /// How many pieces the torrent has.
    pub fn piece_count(&self) -> u64 {
        self.length.div_ceil(self.piece_length)
    }

    /// Length in bytes of the piece `index`.
    ///
    /// All pieces have `piece_length` bytes except the last one, which has
    /// the remainder of the file. When the file length is a multiple of the
    /// piece length, the remainder is zero and the last piece is a full one.
    pub fn piece_len(&self, index: u32) -> Result<u64, Error> {
        let count = self.piece_count();
        let index64 = index as u64;

        if index64 >= count {
            return Err(Error::PieceIndexOutOfRange { index, count });
        }

        if index64 + 1 < count {
            return Ok(self.piece_length);
        }

        match self.length % self.piece_length {
            0 => Ok(self.piece_length),
            remainder => Ok(remainder),
        }
    }

    /// The expected SHA-1 of the piece `index`.
    pub fn piece_hash(&self, index: u32) -> Result<&[u8; 20], Error> {
        self.piece_hashes.get(index as usize).ok_or(
            Error::PieceIndexOutOfRange { index, count: self.piece_count() },
        )
    }
}

impl fmt::Display for TorrentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tracker URL: {}", self.announce)?;
        writeln!(f, "Length: {}", self.length)?;
        writeln!(f, "Info Hash: {}", self.info_hash)?;
        writeln!(f, "Piece Length: {}", self.piece_length)?;
        write!(f, "Piece Hashes:")?;
        for hash in &self.piece_hashes {
            write!(f, "\n{}", hex::encode(hash))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::Dict;

    fn torrent_bytes(length: i64, piece_length: i64, pieces: &[u8]) -> Vec<u8> {
        let mut info = Dict::new();
        info.insert(b"length".to_vec(), Value::Integer(length));
        info.insert(b"name".to_vec(), Value::from("sample.txt"));
        info.insert(b"piece length".to_vec(), Value::Integer(piece_length));
        info.insert(b"pieces".to_vec(), Value::Bytes(pieces.to_vec()));

        let mut root = Dict::new();
        root.insert(
            b"announce".to_vec(),
            Value::from("http://127.0.0.1:8080/announce"),
        );
        root.insert(b"info".to_vec(), Value::Dict(info));

        bencode::encode(&Value::Dict(root))
    }

    #[test]
    fn parse() {
        let mut pieces = vec![1u8; 20];
        pieces.extend([2u8; 20]);
        pieces.extend([3u8; 20]);

        let buf = torrent_bytes(92063, 32768, &pieces);
        let t = TorrentInfo::from_bytes(&buf).unwrap();

        assert_eq!(t.announce, "http://127.0.0.1:8080/announce");
        assert_eq!(t.name.as_deref(), Some("sample.txt"));
        assert_eq!(t.length, 92063);
        assert_eq!(t.piece_length, 32768);
        assert_eq!(t.piece_hashes, vec![[1u8; 20], [2u8; 20], [3u8; 20]]);
        assert_eq!(t.piece_count(), 3);

        // the info hash is the sha1 of the info span of the file, which is
        // canonical here.
        let start = buf.windows(6).position(|w| w == b"4:info").unwrap() + 6;
        let info_span = &buf[start..buf.len() - 1];
        let expected = sha1_smol::Sha1::from(info_span).digest().bytes();
        assert_eq!(t.info_hash, InfoHash(expected));
    }

    #[test]
    fn info_hash_ignores_key_order() {
        let sorted = bencode::decode_exact(
            b"d6:lengthi10e12:piece lengthi10e6:pieces20:aaaaaaaaaaaaaaaaaaaae",
        )
        .unwrap();
        let unsorted = bencode::decode_exact(
            b"d6:pieces20:aaaaaaaaaaaaaaaaaaaa12:piece lengthi10e6:lengthi10ee",
        )
        .unwrap();

        assert_eq!(bencode::encode(&sorted), bencode::encode(&unsorted));
        assert_eq!(InfoHash::from_info(&sorted), InfoHash::from_info(&unsorted));
    }

    #[test]
    fn missing_fields() {
        let err = TorrentInfo::from_bytes(b"i1e").unwrap_err();
        assert!(matches!(err, Error::NotADictionary));

        let err = TorrentInfo::from_bytes(b"d4:infodee").unwrap_err();
        assert!(matches!(err, Error::MissingField("announce")));

        let err = TorrentInfo::from_bytes(b"d8:announce3:urle").unwrap_err();
        assert!(matches!(err, Error::MissingField("info")));

        let err =
            TorrentInfo::from_bytes(b"d8:announce3:url4:infod6:lengthi1eee")
                .unwrap_err();
        assert!(matches!(err, Error::MissingField("piece length")));

        let err = TorrentInfo::from_bytes(
            b"d8:announce3:url4:infod6:lengthi1e12:piece lengthi1eee",
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingField("pieces")));
    }

    #[test]
    fn invalid_pieces() {
        let buf = torrent_bytes(10, 10, &[0u8; 21]);
        assert!(matches!(
            TorrentInfo::from_bytes(&buf),
            Err(Error::InvalidPiecesLength(21))
        ));

        let buf = torrent_bytes(30, 10, &[0u8; 40]);
        assert!(matches!(
            TorrentInfo::from_bytes(&buf),
            Err(Error::PieceCountMismatch { expected: 3, actual: 2 })
        ));

        let buf = torrent_bytes(30, 0, &[0u8; 40]);
        assert!(matches!(
            TorrentInfo::from_bytes(&buf),
            Err(Error::InvalidField("piece length"))
        ));
    }

    #[test]
    fn piece_lengths() {
        let t = TorrentInfo::from_bytes(&torrent_bytes(92063, 32768, &[0u8; 60]))
            .unwrap();
        assert_eq!(t.piece_len(0).unwrap(), 32768);
        assert_eq!(t.piece_len(1).unwrap(), 32768);
        assert_eq!(t.piece_len(2).unwrap(), 92063 - 2 * 32768);
        assert!(matches!(
            t.piece_len(3),
            Err(Error::PieceIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(t.piece_hash(3).is_err());
    }

    #[test]
    fn last_piece_falls_back_to_piece_length() {
        // the length is an exact multiple of the piece length
        let t = TorrentInfo::from_bytes(&torrent_bytes(65536, 32768, &[0u8; 40]))
            .unwrap();
        assert_eq!(t.piece_count(), 2);
        assert_eq!(t.piece_len(1).unwrap(), 32768);
    }

    #[test]
    fn piece_lengths_sum_to_length() {
        for (length, piece_length) in
            [(1, 1), (10, 3), (65536, 32768), (92063, 32768), (5, 16384)]
        {
            let count = (length as u64).div_ceil(piece_length as u64);
            let pieces = vec![0u8; count as usize * 20];
            let t = TorrentInfo::from_bytes(&torrent_bytes(
                length,
                piece_length,
                &pieces,
            ))
            .unwrap();

            let sum: u64 = (0..t.piece_count() as u32)
                .map(|i| t.piece_len(i).unwrap())
                .sum();
            assert_eq!(sum, length as u64);
        }
    }

    #[test]
    fn display() {
        let t = TorrentInfo::from_bytes(&torrent_bytes(10, 10, &[0xab; 20]))
            .unwrap();
        let s = t.to_string();
        assert!(s.starts_with("Tracker URL: http://127.0.0.1:8080/announce\n"));
        assert!(s.contains("Length: 10\n"));
        assert!(s.contains(&format!("Info Hash: {}\n", t.info_hash)));
        assert!(s.ends_with(&format!("Piece Hashes:\n{}", "ab".repeat(20))));
    }
}
