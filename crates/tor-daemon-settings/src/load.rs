//! Load [`TorDaemonSettings`] from TOML files and command-line overrides.
//!
//! Keys are the field names of [`TorDaemonSettings`] (`socks_port`,
//! `exit_nodes`, and so on).  Anything not mentioned keeps its default.

use std::path::Path;

use tracing::debug;

use crate::{Error, Result, TorDaemonSettings};

/// Load settings from `files`, then apply `overrides`.
///
/// Each file comes with a flag saying whether it is required: a missing
/// required file is an error, while a missing optional one is skipped.
/// Later files take precedence over earlier ones.
///
/// Each override has the form `KEY=VALUE` (for example
/// `socks_port=9150`), and takes precedence over every file.
///
/// The result is not checked; see [`crate::validate`].
pub fn load<I, P, O, S>(files: I, overrides: O) -> Result<TorDaemonSettings>
where
    I: IntoIterator<Item = (P, bool)>,
    P: AsRef<Path>,
    O: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = config::Config::builder();

    for (path, required) in files {
        let path = path.as_ref();
        debug!(
            "Reading tor settings from {} ({})",
            path.display(),
            if required { "required" } else { "optional" }
        );
        builder = builder.add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(required),
        );
    }

    for opt in overrides {
        let opt = opt.as_ref();
        let (key, value) = opt
            .split_once('=')
            .ok_or_else(|| Error::BadOverride(opt.to_owned()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::BadOverride(opt.to_owned()));
        }
        builder = builder.set_override(key, value.trim())?;
    }

    Ok(builder.build()?.try_deserialize()?)
}
