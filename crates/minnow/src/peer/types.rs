use std::{fmt::Display, str::FromStr};

use rand::{distributions::Alphanumeric, Rng};
use speedy::{Readable, Writable};

use crate::error::Error;

/// Prefix of the peer ids generated by this client, in the Azureus style:
/// two letters for the client and four digits for the version.
pub const PEER_ID_PREFIX: &[u8; 8] = b"-MN0001-";

#[derive(Clone, PartialEq, Eq, Hash, Default, Readable, Writable)]
pub struct PeerId([u8; 20]);

impl PeerId {
    /// Generate a random peer id for this run.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut buf = [0u8; 20];
        buf[..8].copy_from_slice(PEER_ID_PREFIX);
        for b in buf[8..].iter_mut() {
            *b = rng.sample(Alphanumeric);
        }
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.to_string();
        f.write_str(&s)
    }
}

impl From<PeerId> for [u8; 20] {
    fn from(value: PeerId) -> Self {
        value.0
    }
}

impl From<[u8; 20]> for PeerId {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl TryFrom<Vec<u8>> for PeerId {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let buf: [u8; 20] =
            value.try_into().map_err(|_| Error::PeerIdInvalid)?;
        Ok(PeerId(buf))
    }
}

/// A peer id is written either as 40 hex characters, or as the 20 raw
/// ASCII bytes.
impl FromStr for PeerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.len() {
            40 => {
                let buf = hex::decode(s).map_err(|_| Error::PeerIdInvalid)?;
                PeerId::try_from(buf)
            }
            20 => PeerId::try_from(s.as_bytes().to_vec()),
            _ => Err(Error::PeerIdInvalid),
        }
    }
}
