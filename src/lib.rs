//! GoodFriend - Main Library
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **goodfriend_client**: API records, identity hashing, requests (re-exported from workspace)
//! - **hyperstream**: Resilient event stream client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use goodfriend::bin_common::{load_config_from_env, ConfigType};
//! use goodfriend::goodfriend_client::ClientConfig;
//! ```

// Re-export workspace libraries for convenience
pub use goodfriend_client;
pub use hyperstream;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{init_logging, BinaryRunner, RunConfig, ShutdownSignal};
}
