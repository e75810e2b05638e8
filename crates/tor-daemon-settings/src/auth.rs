//! Control-port authentication: which password wins, and how to hash one.
//!
//! [`TorDaemonSettings`] records a plaintext control password and a hashed
//! one side by side, and does not say which to use.  This module does:
//! a hashed password, when present, is always authoritative.  A plaintext
//! password is only used when no hashed password is set, and it must be
//! hashed (see [`PasswordHasher`]) before it can be written to the daemon's
//! configuration.
//!
//! The hash format is the one `tor --hash-password` prints: `16:` followed
//! by the hex encoding of an 8-byte salt, a one-byte iteration count
//! specifier, and a SHA-1 digest, computed with the salted, iterated
//! string-to-key scheme from RFC 2440.

use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

use crate::{Error, Result, TorDaemonSettings};

/// Prefix tor uses for a hashed control password.
const HASH_PREFIX: &str = "16:";

/// Length of the S2K salt, in bytes.
const SALT_LEN: usize = 8;

/// Length of a SHA-1 digest, in bytes.
const DIGEST_LEN: usize = 20;

/// The iteration count specifier tor uses: 65536 bytes of input are hashed.
const DEFAULT_COUNT_SPECIFIER: u8 = 0x60;

/// Bias applied to the exponent of an S2K count specifier.
const EXPBIAS: u32 = 6;

/// The control password to configure a daemon with, after applying the
/// precedence rule between the plaintext and hashed fields.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub enum ControlAuth<'a> {
    /// No control password is configured.
    Unset,
    /// Only a plaintext password is configured; it needs hashing.
    Plain(&'a str),
    /// A hashed password is configured; use it verbatim.
    Hashed(&'a str),
}

impl<'a> ControlAuth<'a> {
    /// Decide which control password `settings` calls for.
    ///
    /// If `hashed_control_password` is set, it wins, even when
    /// `control_password` is set too.
    pub fn from_settings(settings: &'a TorDaemonSettings) -> Self {
        match (
            settings.hashed_control_password.as_deref(),
            settings.control_password.as_deref(),
        ) {
            (Some(hashed), _) => ControlAuth::Hashed(hashed),
            (None, Some(plain)) => ControlAuth::Plain(plain),
            (None, None) => ControlAuth::Unset,
        }
    }

    /// Return the value to write as tor's `HashedControlPassword`, hashing
    /// a plaintext password with `hasher` if necessary.
    ///
    /// Returns `Ok(None)` if no control password is configured.  If the
    /// hasher fails, so do we: the caller must not go on to configure the
    /// daemon without the password it asked for.
    pub fn resolve(&self, hasher: &dyn PasswordHasher) -> Result<Option<String>> {
        match *self {
            ControlAuth::Unset => Ok(None),
            ControlAuth::Plain(secret) => hasher.hash_password(secret).map(Some),
            ControlAuth::Hashed(hashed) => Ok(Some(hashed.to_owned())),
        }
    }
}

/// Return the plaintext password a control-port client should present
/// when authenticating, if one is known.
///
/// This is `control_password` whether or not a hashed password is also
/// set: the daemon only ever sees the hash, but the client needs the
/// original secret.
pub fn control_secret(settings: &TorDaemonSettings) -> Option<&str> {
    settings.control_password.as_deref()
}

/// Something that can turn a plaintext control password into the form tor
/// expects in its `HashedControlPassword` option.
pub trait PasswordHasher {
    /// Hash `secret`.
    fn hash_password(&self, secret: &str) -> Result<String>;
}

/// Hash control passwords the way `tor --hash-password` does.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
pub struct S2kHasher {
    /// RFC 2440 count specifier to use for new hashes.
    count_specifier: u8,
}

impl Default for S2kHasher {
    fn default() -> Self {
        S2kHasher {
            count_specifier: DEFAULT_COUNT_SPECIFIER,
        }
    }
}

impl S2kHasher {
    /// Hash `secret` with a caller-chosen salt.
    ///
    /// Always gives the same answer for the same inputs; use
    /// [`PasswordHasher::hash_password`] to get a fresh random salt.
    pub fn hash_with_salt(&self, secret: &str, salt: [u8; SALT_LEN]) -> String {
        let digest = s2k_digest(secret.as_bytes(), &salt, self.count_specifier);
        let mut raw = Vec::with_capacity(SALT_LEN + 1 + DIGEST_LEN);
        raw.extend_from_slice(&salt);
        raw.push(self.count_specifier);
        raw.extend_from_slice(&digest);
        format!("{}{}", HASH_PREFIX, hex::encode_upper(raw))
    }

    /// Check whether `secret` is the password that `hashed` was made from.
    ///
    /// The count specifier stored in `hashed` is honored, so this works for
    /// hashes made with any specifier, not just ours.
    pub fn verify(hashed: &str, secret: &str) -> Result<bool> {
        let encoded = hashed
            .strip_prefix(HASH_PREFIX)
            .ok_or_else(|| Error::MalformedHash("missing \"16:\" prefix".into()))?;
        let raw = hex::decode(encoded).map_err(|e| Error::MalformedHash(e.to_string()))?;
        if raw.len() != SALT_LEN + 1 + DIGEST_LEN {
            return Err(Error::MalformedHash(format!(
                "expected {} bytes, found {}",
                SALT_LEN + 1 + DIGEST_LEN,
                raw.len()
            )));
        }
        let (salt, rest) = raw.split_at(SALT_LEN);
        let (count_specifier, expected) = rest.split_at(1);
        let digest = s2k_digest(secret.as_bytes(), salt, count_specifier[0]);
        Ok(digest[..].ct_eq(expected).into())
    }
}

impl PasswordHasher for S2kHasher {
    fn hash_password(&self, secret: &str) -> Result<String> {
        let mut salt = [0_u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| Error::HashFailed(e.to_string()))?;
        Ok(self.hash_with_salt(secret, salt))
    }
}

/// Compute the RFC 2440 iterated and salted S2K digest of `secret`.
fn s2k_digest(secret: &[u8], salt: &[u8], count_specifier: u8) -> [u8; DIGEST_LEN] {
    let mut count = (16_usize + usize::from(count_specifier & 15))
        << (u32::from(count_specifier >> 4) + EXPBIAS);

    let mut input = Vec::with_capacity(salt.len() + secret.len());
    input.extend_from_slice(salt);
    input.extend_from_slice(secret);

    let mut d = Sha1::new();
    while count > 0 {
        // `input` is never empty, since the salt is part of it.
        let n = count.min(input.len());
        d.update(&input[..n]);
        count -= n;
    }
    let mut out = [0_u8; DIGEST_LEN];
    out.copy_from_slice(&d.finalize());
    out
}
