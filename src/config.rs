//! Configuration management for the media manager.
//!
//! This module provides the command line interface:
//! - Command-line arguments via clap
//! - Environment variables with `MEDIA_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` (default) - run the HTTP server
//! - `token` - print the request token for an actor
//! - `check` - verify directories and grants without starting the server
//!
//! # Environment Variables
//!
//! - `MEDIA_HOST` - Server bind address (default: 0.0.0.0)
//! - `MEDIA_PORT` - Server port (default: 3000)
//! - `MEDIA_BASE_DIR` - Media root directory (default: ./media)
//! - `MEDIA_STAGING_DIR` - Directory for staged uploads (default: system temp dir)
//! - `MEDIA_TOKEN_SECRET` - HMAC secret for request tokens (required)
//! - `MEDIA_GRANTS` - `;`-separated grants, e.g. `alice=create,delete;*=create`
//! - `MEDIA_UPLOAD_MAXSIZE` - Maximum upload size in MB, 0 = unlimited (default: 10)
//! - `MEDIA_SERVER_UPLOAD_MAX` - Per-part limit in MB, 0 = unlimited (default: 0)
//! - `MEDIA_POST_MAX` - Request body limit in MB, 0 = unlimited (default: 0)
//! - `MEDIA_MEMORY_LIMIT` - Memory limit in MB, -1 = unlimited (default: -1)
//! - `MEDIA_ALLOWED_EXTENSIONS` - Comma-separated allow-list of extensions
//! - `MEDIA_IGNORED_EXTENSIONS` - Extensions exempt from the content scan
//! - `MEDIA_PROTECTED_NAMES` - Names that can be neither overwritten nor deleted
//! - `MEDIA_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::controller::UploadLimits;
use crate::media::{ExtensionPolicy, GrantTable, DEFAULT_ALLOWED_EXTENSIONS, MEDIA_COMPONENT};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default media root.
pub const DEFAULT_BASE_DIR: &str = "./media";

/// Default maximum upload size in megabytes.
pub const DEFAULT_UPLOAD_MAXSIZE: u64 = 10;

/// Default redirect target.
pub const DEFAULT_REDIRECT_BASE: &str = "/media";

// =============================================================================
// CLI
// =============================================================================

/// Media Manager - upload and delete files in a media directory over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "media-manager")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options used when no subcommand is given
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run; `serve` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Print the request token for an actor
    Token(TokenConfig),

    /// Check directories and grants
    Check(CheckConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MEDIA_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MEDIA_PORT")]
    pub port: u16,

    /// Path redirects point at when no return URL is given.
    #[arg(long, default_value = DEFAULT_REDIRECT_BASE, env = "MEDIA_REDIRECT_BASE")]
    pub redirect_base: String,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Media root directory; every upload and delete stays inside it.
    #[arg(long, default_value = DEFAULT_BASE_DIR, env = "MEDIA_BASE_DIR")]
    pub base_dir: PathBuf,

    /// Directory for staged upload parts (defaults to the system temp dir).
    #[arg(long, env = "MEDIA_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Octal permission bits applied to stored files (e.g. 644).
    #[arg(long, env = "MEDIA_FILE_MODE", value_parser = parse_file_mode)]
    pub file_mode: Option<u32>,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 request tokens.
    #[arg(long, env = "MEDIA_TOKEN_SECRET")]
    pub token_secret: Option<String>,

    /// Grants of the form `actor=capability,...`.
    ///
    /// `create` and `delete` are short for `core.create` and `core.delete`;
    /// `core.admin` implies both. The actor `*` applies to everyone.
    #[arg(long = "grant", env = "MEDIA_GRANTS", value_delimiter = ';')]
    pub grants: Vec<String>,

    // =========================================================================
    // Upload Limits (megabytes)
    // =========================================================================
    /// Maximum upload size; 0 = unlimited.
    #[arg(long, default_value_t = DEFAULT_UPLOAD_MAXSIZE, env = "MEDIA_UPLOAD_MAXSIZE")]
    pub upload_maxsize: u64,

    /// Maximum size of a single uploaded part; 0 = unlimited.
    #[arg(long, default_value_t = 0, env = "MEDIA_SERVER_UPLOAD_MAX")]
    pub server_upload_max: u64,

    /// Maximum request body size; 0 = unlimited.
    #[arg(long, default_value_t = 0, env = "MEDIA_POST_MAX")]
    pub post_max: u64,

    /// Memory limit compared against the request size; -1 = unlimited.
    #[arg(long, default_value_t = -1, env = "MEDIA_MEMORY_LIMIT", allow_negative_numbers = true)]
    pub memory_limit: i64,

    // =========================================================================
    // Upload Policy
    // =========================================================================
    /// Allowed file extensions (comma-separated).
    #[arg(long, env = "MEDIA_ALLOWED_EXTENSIONS", value_delimiter = ',')]
    pub allowed_extensions: Option<Vec<String>>,

    /// Extensions exempt from the HTML content scan (comma-separated).
    #[arg(long, env = "MEDIA_IGNORED_EXTENSIONS", value_delimiter = ',')]
    pub ignored_extensions: Vec<String>,

    /// Skip scanning the start of uploaded files for HTML tags.
    #[arg(long, default_value_t = false, env = "MEDIA_NO_CONTENT_SCAN")]
    pub no_content_scan: bool,

    /// File names that can be neither overwritten nor deleted (comma-separated).
    #[arg(long, env = "MEDIA_PROTECTED_NAMES", value_delimiter = ',')]
    pub protected_names: Vec<String>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MEDIA_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.token_secret.as_deref() {
            None | Some("") => {
                return Err("A token secret is required. \
                     Set --token-secret or MEDIA_TOKEN_SECRET"
                    .to_string())
            }
            Some(_) => {}
        }

        if self.base_dir.as_os_str().is_empty() {
            return Err("base_dir must not be empty".to_string());
        }

        if !self.redirect_base.starts_with('/') || self.redirect_base.starts_with("//") {
            return Err("redirect_base must be a local path starting with '/'".to_string());
        }

        if self.memory_limit < -1 {
            return Err("memory_limit must be -1 (unlimited) or a size in MB".to_string());
        }

        if let Some(ref extensions) = self.allowed_extensions {
            if extensions.iter().all(|e| e.trim().is_empty()) {
                return Err("allowed_extensions must name at least one extension".to_string());
            }
        }

        self.grant_table().map(|_| ())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the token secret, or "" if unset (call validate() first).
    pub fn token_secret_or_empty(&self) -> &str {
        self.token_secret.as_deref().unwrap_or("")
    }

    /// Staging directory, falling back to the system temp dir.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn limits(&self) -> UploadLimits {
        UploadLimits::from_megabytes(
            self.upload_maxsize,
            self.server_upload_max,
            self.post_max,
            self.memory_limit,
        )
    }

    pub fn grant_table(&self) -> Result<GrantTable, String> {
        GrantTable::from_specs(MEDIA_COMPONENT, &self.grants)
    }

    pub fn extension_policy(&self) -> ExtensionPolicy {
        let policy = match self.allowed_extensions {
            Some(ref allowed) => ExtensionPolicy::new(allowed),
            None => ExtensionPolicy::new(DEFAULT_ALLOWED_EXTENSIONS.iter().copied()),
        };

        policy
            .with_ignored(&self.ignored_extensions)
            .with_max_size(self.limits().upload_maxsize)
            .with_content_scan(!self.no_content_scan)
    }
}

fn parse_file_mode(value: &str) -> Result<u32, String> {
    let mode = u32::from_str_radix(value.trim_start_matches("0o"), 8)
        .map_err(|_| format!("'{}' is not an octal file mode", value))?;
    if mode > 0o777 {
        return Err(format!("file mode {:o} is out of range", mode));
    }
    Ok(mode)
}

// =============================================================================
// Token
// =============================================================================

/// Output format for the `token` command.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenOutputFormat {
    /// The bare token
    #[default]
    Token,

    /// Ready-to-use request headers
    Headers,

    /// JSON object
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    /// Actor id the token is issued for.
    pub actor: String,

    /// Secret key for HMAC-SHA256 request tokens.
    #[arg(long, env = "MEDIA_TOKEN_SECRET")]
    pub secret: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = TokenOutputFormat::Token)]
    pub format: TokenOutputFormat,
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret must not be empty".to_string());
        }
        if self.actor.trim().is_empty() {
            return Err("Actor must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Check
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Media root directory.
    #[arg(long, default_value = DEFAULT_BASE_DIR, env = "MEDIA_BASE_DIR")]
    pub base_dir: PathBuf,

    /// Directory for staged upload parts.
    #[arg(long, env = "MEDIA_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Grants of the form `actor=capability,...`.
    #[arg(long = "grant", env = "MEDIA_GRANTS", value_delimiter = ';')]
    pub grants: Vec<String>,

    /// Show what this actor may do.
    #[arg(long)]
    pub actor: Option<String>,

    /// Count the files under the media root.
    #[arg(long, default_value_t = false)]
    pub count_files: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn grant_table(&self) -> Result<GrantTable, String> {
        GrantTable::from_specs(MEDIA_COMPONENT, &self.grants)
    }
}

// =============================================================================
// Tests
// =============================================================================
