//! Declare an error type for tor-daemon-settings

use thiserror::Error;

/// An error returned while checking, resolving, or loading daemon settings.
///
/// [`TorDaemonSettings`](crate::TorDaemonSettings) itself never produces one
/// of these; they come from the code that consumes it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A port field held zero.
    #[error("{field} must be a port between 1 and 65535")]
    InvalidPort {
        /// The name of the offending setting.
        field: &'static str,
    },

    /// The SOCKS port and the control port are the same.
    #[error("socks_port and control_port are both set to {0}")]
    PortConflict(u16),

    /// An HTTPS proxy port was configured without a host to go with it.
    #[error("https_proxy_port is set, but https_proxy_host is not")]
    MissingProxyHost,

    /// A hashed control password could not be parsed.
    #[error("Malformed hashed control password: {0}")]
    MalformedHash(String),

    /// We had a plaintext control password, but could not hash it.
    ///
    /// We refuse to configure the daemon in this case, rather than leave
    /// its control port unauthenticated.
    #[error("Unable to hash control password: {0}")]
    HashFailed(String),

    /// A value cannot be written to a torrc at all, not even quoted.
    #[error("Value for {key} contains a NUL character")]
    UnrepresentableValue {
        /// The torrc option whose value was rejected.
        key: &'static str,
    },

    /// A path setting is not valid UTF-8, so tor could not be told about it.
    #[error("{field} is not valid UTF-8")]
    NonUtf8Path {
        /// The name of the offending setting.
        field: &'static str,
    },

    /// The HTTPS proxy user name contains a colon, which would be read as
    /// the start of the password.
    #[error("https_proxy_username must not contain ':'")]
    ColonInProxyUsername,

    /// A command-line style override was not of the form `KEY=VALUE`.
    #[error("Override {0:?} is not of the form KEY=VALUE")]
    BadOverride(String),

    /// Reading or deserializing configuration failed.
    #[error("Unable to load settings: {0}")]
    Load(#[from] config::ConfigError),
}
