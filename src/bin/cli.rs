//! StashKV CLI Client
//!
//! Command-line interface for interacting with StashKV.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stashkv::config::DEFAULT_SNAPSHOT_BUCKET;
use stashkv::network::Client;
use stashkv::{Result, SnapshotManager};

/// StashKV CLI
#[derive(Parser, Debug)]
#[command(name = "stashkv-cli")]
#[command(about = "CLI for the StashKV object store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get an object and write its payload to stdout
    Get {
        /// The key to get
        key: String,
    },

    /// Store an object
    Put {
        /// The key to set
        key: String,

        /// The payload to store
        value: String,

        /// Content type stored with the payload
        #[arg(short = 't', long, default_value = "text/plain")]
        content_type: String,
    },

    /// Delete an object
    Del {
        /// The key to delete
        key: String,
    },

    /// List all keys
    Keys,

    /// Ping the server
    Ping,

    /// Verify a snapshot file offline and print its statistics
    Inspect {
        /// Snapshot file path
        file: String,

        /// Bucket inside the snapshot file
        #[arg(short, long, default_value = DEFAULT_SNAPSHOT_BUCKET)]
        bucket: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let server = args.server;
    let connect = || Client::connect(&server);

    match args.command {
        Commands::Inspect { file, bucket } => {
            let stats = SnapshotManager::new(file, bucket).inspect()?;
            println!("entries:       {}", stats.entries);
            println!("payload bytes: {}", stats.payload_bytes);
        }
        Commands::Get { key } => match connect()?.get(&key)? {
            Some(entry) => {
                eprintln!("content-type: {}", entry.content_type);
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&entry.payload)?;
                stdout.flush()?;
            }
            None => {
                eprintln!("(not found)");
                return Ok(ExitCode::FAILURE);
            }
        },
        Commands::Put {
            key,
            value,
            content_type,
        } => {
            connect()?.put(&key, value.into_bytes(), content_type)?;
            println!("OK");
        }
        Commands::Del { key } => {
            if connect()?.delete(&key)? {
                println!("OK");
            } else {
                eprintln!("(not found)");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Keys => {
            for key in connect()?.keys()? {
                println!("{}", key);
            }
        }
        Commands::Ping => {
            connect()?.ping()?;
            println!("PONG");
        }
    }

    Ok(ExitCode::SUCCESS)
}
