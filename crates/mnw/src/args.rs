use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "mnw")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path of the configuration file, defaults to
    /// `<config dir>/minnow/config.toml`.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Our peer id, 40 hex characters or 20 ASCII bytes.
    #[clap(long, global = true)]
    pub peer_id: Option<String>,

    /// The port announced to the tracker.
    #[clap(long, global = true)]
    pub port: Option<u16>,

    /// How many block requests may be outstanding with a peer.
    #[clap(long, global = true)]
    pub max_in_flight: Option<u32>,

    /// Print debug logs.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a bencoded string and print it as JSON.
    Decode { value: String },

    /// Print the metadata of a torrent file.
    Info { torrent: PathBuf },

    /// Ask the tracker for the peers of a torrent.
    Peers { torrent: PathBuf },

    /// Handshake with a peer and print its peer id.
    Handshake { torrent: PathBuf, peer: SocketAddr },

    /// Download a single piece of a torrent.
    #[command(name = "download_piece")]
    DownloadPiece {
        #[clap(short)]
        output: PathBuf,
        torrent: PathBuf,
        index: u32,
    },

    /// Download the entire file of a torrent.
    Download {
        #[clap(short)]
        output: PathBuf,
        torrent: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_piece() {
        let args = Args::parse_from([
            "mnw",
            "--max-in-flight",
            "1",
            "download_piece",
            "-o",
            "/tmp/piece",
            "sample.torrent",
            "3",
        ]);

        assert_eq!(args.max_in_flight, Some(1));
        let Command::DownloadPiece { output, torrent, index } = args.command
        else {
            panic!("wrong command");
        };
        assert_eq!(output, PathBuf::from("/tmp/piece"));
        assert_eq!(torrent, PathBuf::from("sample.torrent"));
        assert_eq!(index, 3);
    }

    #[test]
    fn unknown_command() {
        assert!(Args::try_parse_from(["mnw", "seed", "x"]).is_err());
        assert!(Args::try_parse_from(["mnw", "handshake", "t", "nope"]).is_err());
    }
}
