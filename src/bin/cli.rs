//! FlagKV CLI Client
//!
//! Command-line interface for storing typed values in a memcached-compatible
//! store and for running the cross-client compatibility matrix against it.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use flagkv::harness::{Harness, Scenario};
use flagkv::{
    BinaryTransport, ByteClient, Codec, Config, FlagKvError, MemcachedStore, Result, TypedClient,
    Value,
};
use tracing_subscriber::{fmt, EnvFilter};

/// FlagKV CLI
#[derive(Parser, Debug)]
#[command(name = "flagkv-cli")]
#[command(about = "CLI for flag-encoded values in a memcached-compatible store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:11211")]
    server: String,

    /// How BINARY values are laid out in the store
    #[arg(short, long, value_enum, default_value_t = BinaryTransport::Verbatim)]
    binary_transport: BinaryTransport,

    #[command(subcommand)]
    command: Commands,
}

/// Logical type of a value given on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ValueType {
    Raw,
    Json,
    Number,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get and decode a value by key
    Get {
        /// The key to get
        key: String,

        /// Write a binary value to this file instead of describing it
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Encode and store a value
    Set {
        /// The key to set
        key: String,

        /// The value to set (omit with --file)
        value: Option<String>,

        /// How to interpret the value
        #[arg(short = 't', long = "type", value_enum, default_value = "raw")]
        value_type: ValueType,

        /// Store this file's contents as a binary value
        #[arg(short, long, conflicts_with = "value")]
        file: Option<PathBuf>,
    },

    /// Run the producer × consumer compatibility matrix
    Compat {
        /// Use random values instead of the fixed reference values
        #[arg(short, long)]
        random: bool,

        /// Number of times to run the matrix
        #[arg(short = 'n', long, default_value = "1")]
        rounds: usize,

        /// Prefix for generated keys
        #[arg(long, default_value = "foo")]
        key_prefix: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let config = Config::builder()
        .server_addr(&args.server)
        .binary_transport(args.binary_transport)
        .build();

    match run(args.command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Execute one subcommand; `Ok(false)` means it ran but did not succeed
fn run(command: Commands, config: &Config) -> Result<bool> {
    let codec = Codec::new(config.binary_transport);

    match command {
        Commands::Get { key, out } => {
            let client = TypedClient::new(MemcachedStore::connect(config)?, codec);
            let value = client.get(&key)?;
            client.close()?;

            match (&value, out) {
                (Value::Binary(data), Some(path)) => {
                    fs::write(&path, data)?;
                    println!("wrote {} bytes to {}", data.len(), path.display());
                }
                _ => println!("{} {}", value.flag(), value),
            }
            Ok(true)
        }
        Commands::Set {
            key,
            value,
            value_type,
            file,
        } => {
            let value = match (file, value) {
                (Some(path), _) => Value::binary_from_path(path)?,
                (None, Some(text)) => parse_value(value_type, text)?,
                (None, None) => {
                    return Err(FlagKvError::InvalidValue(
                        "either a value or --file is required".to_string(),
                    ))
                }
            };

            let client = TypedClient::new(MemcachedStore::connect(config)?, codec);
            client.set(&key, &value)?;
            client.close()?;
            println!("STORED {} as {}", key, value.flag());
            Ok(true)
        }
        Commands::Compat {
            random,
            rounds,
            key_prefix,
            json,
        } => {
            // Two connections, one per role, as two independent clients would have
            let typed = TypedClient::new(MemcachedStore::connect(config)?, codec);
            let bytes = ByteClient::new(MemcachedStore::connect(config)?, codec);
            let harness = Harness::new(&typed, &bytes, key_prefix);

            let mut rng = rand::thread_rng();
            let mut cases = Vec::new();
            for _ in 0..rounds.max(1) {
                let scenarios = if random {
                    Scenario::random_matrix(&mut rng)
                } else {
                    Scenario::fixed_matrix()
                };
                cases.extend(harness.run(&scenarios).cases);
            }
            let report = flagkv::harness::CompatReport { cases };

            typed.close()?;
            bytes.close()?;

            if json {
                let text = serde_json::to_string_pretty(&report)
                    .map_err(|e| FlagKvError::InvalidValue(e.to_string()))?;
                println!("{}", text);
            } else {
                for case in &report.cases {
                    println!("{}", case);
                }
                println!("{}/{} cases passed", report.passed_count(), report.len());
            }
            Ok(report.all_passed())
        }
    }
}

/// Build a value from command-line text
fn parse_value(value_type: ValueType, text: String) -> Result<Value> {
    match value_type {
        ValueType::Raw => Ok(Value::Raw(text)),
        ValueType::Json => serde_json::from_str(&text)
            .map(Value::Json)
            .map_err(|e| FlagKvError::InvalidValue(format!("not JSON: {}", e))),
        ValueType::Number => {
            let n: f64 = text
                .trim()
                .parse()
                .map_err(|_| FlagKvError::InvalidValue(format!("not a number: {:?}", text)))?;
            Value::numeric(n)
        }
    }
}
