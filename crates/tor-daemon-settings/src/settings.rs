//! The settings record handed to the code that launches a tor daemon.

use std::fmt;
use std::path::PathBuf;

use derive_builder::Builder;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// Port on which tor listens for SOCKS connections, unless told otherwise.
pub const DEFAULT_SOCKS_PORT: u16 = 19050;

/// Port on which tor listens for control connections, unless told otherwise.
pub const DEFAULT_CONTROL_PORT: u16 = 19051;

/// Settings for one locally launched tor daemon.
///
/// This is a plain value: every field is public and may be changed freely
/// until the settings are handed to whatever launches the daemon.  Nothing
/// here is checked when it is set; see [`crate::validate`] for that.  An
/// unset optional field means "not configured", which is distinct from a
/// field configured to an empty string or zero.
///
/// Use [`TorDaemonSettings::new`] (or [`Default`]) to get the default
/// ports and nothing else, or [`TorDaemonSettingsBuilder`] to build one up
/// in a single expression.
///
/// # Control passwords
///
/// `control_password` and `hashed_control_password` describe the same
/// secret.  If `hashed_control_password` is set, it is authoritative and
/// `control_password` is ignored when configuring the daemon.  Otherwise, a
/// set `control_password` is hashed before it is written to the daemon's
/// configuration.  [`crate::auth::ControlAuth`] encodes this rule.
///
/// # Secrets
///
/// The `Debug` output of this type never includes either control password
/// or the HTTPS proxy password; it only says whether they are set.
#[derive(Clone, Educe, Eq, PartialEq, Builder, Serialize, Deserialize)]
#[educe(Debug)]
#[serde(default)]
#[non_exhaustive]
pub struct TorDaemonSettings {
    /// Port on which tor listens for SOCKS connections.
    ///
    /// This is the port that a local HTTP proxy tunnels to.
    #[builder(default = "DEFAULT_SOCKS_PORT", setter(into))]
    pub socks_port: u16,

    /// Port on which tor listens for control and administrative commands.
    #[builder(default = "DEFAULT_CONTROL_PORT", setter(into))]
    pub control_port: u16,

    /// Which relays may be used as the last hop of a circuit.
    ///
    /// This is passed through to tor unchanged; it may hold fingerprints,
    /// nicknames, country codes like `{us}`, or address patterns.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_nodes: Option<String>,

    /// Whether `exit_nodes` is a hard requirement rather than a preference.
    ///
    /// If unset, tor's own default applies.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_nodes: Option<bool>,

    /// Plaintext control password.
    ///
    /// Hashed on the caller's behalf if `hashed_control_password` is unset.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[educe(Debug(method = "fmt_secret"))]
    pub control_password: Option<String>,

    /// Control password, already hashed with `tor --hash-password`.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[educe(Debug(method = "fmt_secret"))]
    pub hashed_control_password: Option<String>,

    /// Directory in which tor keeps its persistent state.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,

    /// Host name or address of an upstream HTTPS proxy to chain through.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_proxy_host: Option<String>,

    /// Port of the upstream HTTPS proxy.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_proxy_port: Option<u16>,

    /// User name for the upstream HTTPS proxy.
    ///
    /// Has no effect unless `https_proxy_host` is set.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_proxy_username: Option<String>,

    /// Password for the upstream HTTPS proxy.
    ///
    /// Has no effect unless `https_proxy_host` is set.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[educe(Debug(method = "fmt_secret"))]
    pub https_proxy_password: Option<String>,

    /// Run this tor executable instead of the one from the tools archive.
    ///
    /// The simplest use is to put `tor` on the `PATH` and set this to
    /// `"tor"`.  This replaces only the executable: the base configuration
    /// and the other support files are still extracted from the archive.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path_override: Option<PathBuf>,
}

impl TorDaemonSettings {
    /// Return a new `TorDaemonSettings` with the default ports set and
    /// nothing else configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a builder for `TorDaemonSettings`.
    pub fn builder() -> TorDaemonSettingsBuilder {
        TorDaemonSettingsBuilder::default()
    }
}

impl Default for TorDaemonSettings {
    fn default() -> Self {
        TorDaemonSettings {
            socks_port: DEFAULT_SOCKS_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            exit_nodes: None,
            strict_nodes: None,
            control_password: None,
            hashed_control_password: None,
            data_directory: None,
            https_proxy_host: None,
            https_proxy_port: None,
            https_proxy_username: None,
            https_proxy_password: None,
            executable_path_override: None,
        }
    }
}

/// Debug-format a secret without revealing it.
fn fmt_secret(secret: &Option<String>, f: &mut fmt::Formatter) -> fmt::Result {
    match secret {
        Some(_) => f.write_str("Some([scrubbed])"),
        None => f.write_str("None"),
    }
}
