use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use pickset_core::{BASE_MIN, DEFAULT_BASE_MAX};
use std::path::PathBuf;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 500;
pub const DEFAULT_PAGE_WINDOW_MS: u64 = 25;
pub const DEFAULT_ADD_WINDOW_MS: u64 = 50;
pub const DEFAULT_SAVE_WINDOW_MS: u64 = 200;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Largest accepted `BASE_MAX`. Available-page queries scan the base range,
/// so it has to stay scannable.
pub const MAX_BASE_MAX: u64 = u32::MAX as u64;

/// Runtime configuration for the `pickset-server` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a `.env`
/// file in the working directory is honoured). The three window settings
/// trade latency for batching: each is the longest a caller waits before its
/// batch is dispatched.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pickset-server",
    version,
    about = "An HTTP item picker with coalesced directory reads and writes"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from(DEFAULT_SERVER_ADDR))]
    pub server_addr: String,

    /// Largest id of the base range. The base range always starts at 1 and
    /// may not exceed `u32::MAX` ids.
    ///
    /// Environment variable: `BASE_MAX`
    #[arg(long, env = "BASE_MAX", default_value_t = DEFAULT_BASE_MAX)]
    pub base_max: u64,

    /// Page length used when a request does not specify `limit`.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Upper bound on any requested `limit`. Larger values are clamped.
    ///
    /// Environment variable: `MAX_PAGE_SIZE`
    #[arg(long, env = "MAX_PAGE_SIZE", default_value_t = DEFAULT_MAX_PAGE_SIZE)]
    pub max_page_size: usize,

    /// Coalescing window for page queries, in milliseconds.
    ///
    /// Environment variable: `PAGE_WINDOW_MS`
    #[arg(long, env = "PAGE_WINDOW_MS", default_value_t = DEFAULT_PAGE_WINDOW_MS)]
    pub page_window_ms: u64,

    /// Coalescing window for added ids, in milliseconds.
    ///
    /// Environment variable: `ADD_WINDOW_MS`
    #[arg(long, env = "ADD_WINDOW_MS", default_value_t = DEFAULT_ADD_WINDOW_MS)]
    pub add_window_ms: u64,

    /// Coalescing window for selection saves, in milliseconds.
    ///
    /// Environment variable: `SAVE_WINDOW_MS`
    #[arg(long, env = "SAVE_WINDOW_MS", default_value_t = DEFAULT_SAVE_WINDOW_MS)]
    pub save_window_ms: u64,

    /// Directory of static UI assets served for every non-API path.
    ///
    /// Environment variable: `STATIC_DIR`
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub base_max: u64,
    pub page_size: usize,
    pub max_page_size: usize,
    pub page_window: Duration,
    pub add_window: Duration,
    pub save_window: Duration,
    pub static_dir: Option<PathBuf>,
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_owned(),
            base_max: DEFAULT_BASE_MAX,
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            page_window: Duration::from_millis(DEFAULT_PAGE_WINDOW_MS),
            add_window: Duration::from_millis(DEFAULT_ADD_WINDOW_MS),
            save_window: Duration::from_millis(DEFAULT_SAVE_WINDOW_MS),
            static_dir: None,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.base_max < BASE_MIN {
            bail!("BASE_MAX must be at least {BASE_MIN}");
        }

        if args.base_max > MAX_BASE_MAX {
            bail!("BASE_MAX must be at most {MAX_BASE_MAX}");
        }

        if args.page_size == 0 {
            bail!("PAGE_SIZE must be greater than 0");
        }

        if args.max_page_size < args.page_size {
            bail!(
                "MAX_PAGE_SIZE ({}) must not be smaller than PAGE_SIZE ({})",
                args.max_page_size,
                args.page_size
            );
        }

        for (name, value) in [
            ("PAGE_WINDOW_MS", args.page_window_ms),
            ("ADD_WINDOW_MS", args.add_window_ms),
            ("SAVE_WINDOW_MS", args.save_window_ms),
        ] {
            if value == 0 {
                bail!("{name} must be greater than 0");
            }
        }

        if let Some(dir) = &args.static_dir {
            if !dir.is_dir() {
                bail!("STATIC_DIR ({}) is not a directory", dir.display());
            }
        }

        Ok(Self {
            server_addr: args.server_addr,
            base_max: args.base_max,
            page_size: args.page_size,
            max_page_size: args.max_page_size,
            page_window: Duration::from_millis(args.page_window_ms),
            add_window: Duration::from_millis(args.add_window_ms),
            save_window: Duration::from_millis(args.save_window_ms),
            static_dir: args.static_dir,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
