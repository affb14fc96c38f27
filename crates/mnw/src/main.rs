use std::{io, path::Path, process::ExitCode};

use clap::Parser;
use minnow::{
    bencode,
    config::Config,
    download::Downloader,
    error::Error,
    metainfo::TorrentInfo,
    peer::Peer,
    tracker::Tracker,
};
use tracing::{debug, Level};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{Builder, Rotation},
};
use tracing_subscriber::FmtSubscriber;

use args::{Args, Command};

mod args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // the guard flushes the log file when dropped
    let _guard = match setup_logging(args.verbose, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    debug!("{config:?}");

    match run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Read the configuration file, CLI flags take precedence over it.
async fn load_config(args: &Args) -> Result<Config, Error> {
    let mut config = Config::load(args.config.as_deref()).await?;

    if let Some(peer_id) = &args.peer_id {
        config.peer_id = Some(peer_id.clone());
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_in_flight) = args.max_in_flight {
        config.max_in_flight = max_in_flight;
    }

    Ok(config)
}

fn setup_logging(
    verbose: bool,
    config: &Config,
) -> Result<Option<WorkerGuard>, Error> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    if config.log {
        let appender = Builder::new()
            .rotation(Rotation::NEVER)
            .filename_prefix("mnw.log")
            .build(Config::config_dir()?)
            .map_err(io::Error::other)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_writer(writer)
            .compact()
            .with_file(false)
            .without_time()
            .init();

        return Ok(Some(guard));
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .without_time()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(io::Error::other)?;

    Ok(None)
}

async fn read_torrent(path: &Path) -> Result<TorrentInfo, Error> {
    let buf = tokio::fs::read(path).await?;
    TorrentInfo::from_bytes(&buf)
}

async fn run(command: Command, config: Config) -> Result<(), Error> {
    let peer_id = config.peer_id()?;

    match command {
        Command::Decode { value } => {
            let (value, _) = bencode::decode(value.as_bytes())?;
            println!("{}", value.to_json());
        }
        Command::Info { torrent } => {
            let torrent = read_torrent(&torrent).await?;
            println!("{torrent}");
        }
        Command::Peers { torrent } => {
            let torrent = read_torrent(&torrent).await?;
            let peers =
                Tracker::new(peer_id, config.port).announce(&torrent).await?;
            for peer in peers {
                println!("{peer}");
            }
        }
        Command::Handshake { torrent, peer } => {
            let torrent = read_torrent(&torrent).await?;
            let peer =
                Peer::connect(peer, torrent.info_hash, peer_id, &config).await?;
            println!("Peer ID: {}", peer.id);
        }
        Command::DownloadPiece { output, torrent, index } => {
            let torrent = read_torrent(&torrent).await?;
            let peers = Tracker::new(peer_id.clone(), config.port)
                .announce(&torrent)
                .await?;

            let downloader = Downloader::new(torrent, peer_id, config);
            let piece = downloader.download(&peers, &[index]).await?;

            tokio::fs::write(&output, piece).await?;
            println!("Piece {index} downloaded to {}.", output.display());
        }
        Command::Download { output, torrent: path } => {
            let torrent = read_torrent(&path).await?;
            let peers = Tracker::new(peer_id.clone(), config.port)
                .announce(&torrent)
                .await?;

            let downloader = Downloader::new(torrent, peer_id, config);
            let file = downloader.download_all(&peers).await?;

            tokio::fs::write(&output, file).await?;
            println!(
                "Downloaded {} to {}.",
                path.display(),
                output.display()
            );
        }
    }

    Ok(())
}
