//! Configuration, read from a TOML file and overriden by CLI flags.
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::Error, peer::PeerId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Our peer id, 40 hex characters or 20 ASCII bytes. A random one is
    /// generated on each run when this is `None`.
    pub peer_id: Option<String>,

    /// The port announced to the tracker.
    pub port: u16,

    /// How many block requests may be outstanding with a peer.
    pub max_in_flight: u32,

    pub connect_timeout_secs: u64,

    /// Maximum time to wait for a single message from a peer.
    pub read_timeout_secs: u64,

    /// Also write the logs to a file in the config folder.
    pub log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            peer_id: None,
            port: 6881,
            max_in_flight: 5,
            connect_timeout_secs: 5,
            read_timeout_secs: 30,
            log: false,
        }
    }
}

impl Config {
    /// The folder where the configuration file and logs live.
    ///
    /// # Errors
    ///
    /// Fails if the user does not have a home folder.
    pub fn config_dir() -> Result<PathBuf, Error> {
        let dotfile =
            ProjectDirs::from("", "", "minnow").ok_or(Error::HomeInvalid)?;
        Ok(dotfile.config_dir().to_path_buf())
    }

    /// Load the configuration file at `path`, or at the default location
    /// inside [`Config::config_dir`] when `path` is `None`.
    ///
    /// A configuration file that does not exist yields the defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_dir()?.join("config.toml"),
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Self::from_toml(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file at {path:?}, using the defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str::<Config>(s)?)
    }

    /// The configured peer id, or a freshly generated one.
    pub fn peer_id(&self) -> Result<PeerId, Error> {
        match &self.peer_id {
            Some(id) => id.parse(),
            None => Ok(PeerId::generate()),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml("port = 7000\nmax_in_flight = 1\n")
            .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.max_in_flight, 1);
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.peer_id, None);
        assert!(!config.log);
    }

    #[test]
    fn invalid_file() {
        assert!(matches!(
            Config::from_toml("port = \"x\""),
            Err(Error::ConfigDeserializeError(_))
        ));
    }

    #[test]
    fn peer_id() {
        let config = Config {
            peer_id: Some("-MN0001-000000000000".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            config.peer_id().unwrap().as_bytes(),
            b"-MN0001-000000000000"
        );

        let config = Config { peer_id: Some("bad".into()), ..Default::default() };
        assert!(config.peer_id().is_err());
    }

    #[tokio::test]
    async fn missing_file_is_default() {
        let config =
            Config::load(Some(Path::new("/nonexistent/minnow/config.toml")))
                .await
                .unwrap();
        assert_eq!(config, Config::default());
    }
}
