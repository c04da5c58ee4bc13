use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use pcbook_tonic_core::types::MAX_IMAGE_SIZE;
use std::path::PathBuf;

/// Runtime configuration for the `pcbook-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for local use.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pcbook-tonic-server",
    version,
    about = "A gRPC service for creating, searching, imaging and rating laptops"
)]
pub struct CliArgs {
    /// Largest image accepted by `UploadImage`, in bytes.
    ///
    /// The running total is checked after every chunk; the upload is aborted
    /// as soon as it passes this ceiling and nothing is persisted.
    ///
    /// Environment variable: `MAX_IMAGE_BYTES`
    #[arg(long, env = "MAX_IMAGE_BYTES", default_value_t = MAX_IMAGE_SIZE)]
    pub max_image_bytes: usize,

    /// Capacity of the response buffer between a call's worker and its gRPC
    /// stream.
    ///
    /// Lower values make a slow client push back on the search scan (and the
    /// rating loop) sooner.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Directory for uploaded images. Images are kept in memory when unset.
    ///
    /// Environment variable: `IMAGE_DIR`
    #[arg(long, env = "IMAGE_DIR")]
    pub image_dir: Option<PathBuf>,

    /// Seconds to wait for in-flight calls to drain on shutdown before they
    /// are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/pcbook.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub max_image_bytes: usize,
    pub stream_buffer_size: usize,
    pub image_dir: Option<PathBuf>,
    pub shutdown_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: MAX_IMAGE_SIZE,
            stream_buffer_size: 8,
            image_dir: None,
            shutdown_timeout: Duration::from_secs(3),
            server_addr: String::from("0.0.0.0:50051"),
            uds: false,
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.max_image_bytes == 0 {
            bail!("MAX_IMAGE_BYTES must be greater than 0");
        }

        if u32::try_from(args.max_image_bytes).is_err() {
            bail!(
                "MAX_IMAGE_BYTES ({}) does not fit the 32-bit size reported to clients",
                args.max_image_bytes
            );
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        Ok(Self {
            max_image_bytes: args.max_image_bytes,
            stream_buffer_size: args.stream_buffer_size,
            image_dir: args.image_dir,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let args = CliArgs::try_parse_from(
            core::iter::once("pcbook-tonic-server").chain(args.iter().copied()),
        )?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn defaults_match_reference_limits() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.max_image_bytes, 1_048_576);
        assert_eq!(config.stream_buffer_size, 8);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert!(config.image_dir.is_none());
        assert!(!config.uds);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--max-image-bytes",
            "2048",
            "--image-dir",
            "/tmp/img",
            "--server-addr",
            "127.0.0.1:9000",
        ])
        .unwrap();
        assert_eq!(config.max_image_bytes, 2048);
        assert_eq!(config.image_dir, Some(PathBuf::from("/tmp/img")));
        assert_eq!(config.server_addr, "127.0.0.1:9000");
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(parse(&["--max-image-bytes", "0"]).is_err());
        assert!(parse(&["--stream-buffer-size", "0"]).is_err());
    }
}
