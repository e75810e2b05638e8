//! Semantic checks that [`TorDaemonSettings`] leaves to its consumers.
//!
//! The settings record accepts any value for any field.  Before launching
//! a daemon, call [`validate`] to reject combinations that tor would refuse
//! or that could not be what the caller meant.

use tracing::{debug, warn};

use crate::{Error, Result, TorDaemonSettings};

/// Check `settings` for values that tor cannot use.
///
/// We reject a zero port, a SOCKS port equal to the control port, and an
/// HTTPS proxy port with no HTTPS proxy host.  HTTPS proxy credentials
/// without a host are allowed, since they are simply ignored, but we warn
/// about them.
///
/// This does not check whether the ports are free, or whether any path
/// exists.
pub fn validate(settings: &TorDaemonSettings) -> Result<()> {
    check_port("socks_port", settings.socks_port)?;
    check_port("control_port", settings.control_port)?;
    if let Some(port) = settings.https_proxy_port {
        check_port("https_proxy_port", port)?;
    }

    if settings.socks_port == settings.control_port {
        return Err(Error::PortConflict(settings.socks_port));
    }

    if settings.https_proxy_host.is_none() {
        if settings.https_proxy_port.is_some() {
            return Err(Error::MissingProxyHost);
        }
        if settings.https_proxy_username.is_some() || settings.https_proxy_password.is_some() {
            warn!("HTTPS proxy credentials are set, but https_proxy_host is not; ignoring them.");
        }
    }

    if settings.hashed_control_password.is_some() && settings.control_password.is_some() {
        debug!("Both control passwords are set; using hashed_control_password.");
    }

    Ok(())
}

/// Reject a port of zero.
fn check_port(field: &'static str, port: u16) -> Result<()> {
    if port == 0 {
        Err(Error::InvalidPort { field })
    } else {
        Ok(())
    }
}
