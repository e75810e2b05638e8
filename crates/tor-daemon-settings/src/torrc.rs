//! Translate [`TorDaemonSettings`] into tor's own configuration syntax.
//!
//! tor reads a line-oriented file (a "torrc") in which each line is an
//! option name, whitespace, and a value; lines starting with `#` are
//! comments.  [`directives`] produces the lines our settings call for,
//! [`render`] writes them out as a fresh file, and [`merge`] folds them
//! into an existing file such as the base configuration shipped in the
//! tools archive.
//!
//! Values that tor would otherwise cut short, trim, or split across lines
//! are written as quoted strings with C-style escapes, which tor unescapes
//! before it looks at the option.

use std::collections::HashSet;
use std::fmt::{self, Display, Write as _};
use std::path::Path;

use tracing::debug;

use crate::auth::{ControlAuth, PasswordHasher};
use crate::{Error, Result, TorDaemonSettings};

/// A single torrc line: an option name and its value.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub struct Directive {
    /// The option name, spelled the way tor documents it.
    pub key: &'static str,
    /// The option's value, before any quoting.
    ///
    /// The `Display` implementation quotes it when tor would otherwise
    /// misread it.
    pub value: String,
}

impl Directive {
    /// Construct a new directive.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Directive {
            key,
            value: value.into(),
        }
    }
}

impl Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ", self.key)?;
        if needs_quoting(&self.value) {
            write_quoted(f, &self.value)
        } else {
            f.write_str(&self.value)
        }
    }
}

/// Return true if tor would not read `value` back unchanged when written
/// bare.
fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value
            .chars()
            .any(|c| matches!(c, '#' | '"' | '\\') || c.is_control())
}

/// Write `value` as a torrc quoted string.
fn write_quoted(f: &mut fmt::Formatter, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c if c.is_control() => {
                // tor's \x escape yields one byte, so spell out each byte
                // of the UTF-8 encoding.
                let mut buf = [0_u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    write!(f, "\\x{:02x}", b)?;
                }
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Compute the torrc directives that configure a daemon as `settings`
/// describes.
///
/// Options that are unset in `settings` produce no directive, leaving
/// tor's default (or the base configuration's value) in place.  The HTTPS
/// proxy directives are only produced when `https_proxy_host` is set.
///
/// We return an error, and no directives at all, if:
///   * a plaintext control password needs hashing and `hasher` fails;
///   * any value contains a NUL character, which tor cannot read even
///     when quoted;
///   * `data_directory` is not valid UTF-8;
///   * `https_proxy_username` contains a `:`, since tor splits the
///     authenticator at the first colon and would take part of the user
///     name as the password.  (A `:` in the password is fine.)
pub fn directives(
    settings: &TorDaemonSettings,
    hasher: &dyn PasswordHasher,
) -> Result<Vec<Directive>> {
    let mut out = vec![
        Directive::new("SocksPort", settings.socks_port.to_string()),
        Directive::new("ControlPort", settings.control_port.to_string()),
    ];

    if let Some(exit_nodes) = &settings.exit_nodes {
        out.push(Directive::new("ExitNodes", exit_nodes.as_str()));
    }
    if let Some(strict) = settings.strict_nodes {
        out.push(Directive::new("StrictNodes", if strict { "1" } else { "0" }));
    }
    if let Some(hashed) = ControlAuth::from_settings(settings).resolve(hasher)? {
        out.push(Directive::new("HashedControlPassword", hashed));
    }
    if let Some(dir) = &settings.data_directory {
        out.push(Directive::new("DataDirectory", path_str("data_directory", dir)?));
    }

    if let Some(host) = &settings.https_proxy_host {
        let host = bracket_ipv6(host);
        let proxy = match settings.https_proxy_port {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        out.push(Directive::new("HTTPSProxy", proxy));

        let user = settings.https_proxy_username.as_deref();
        let pass = settings.https_proxy_password.as_deref();
        if user.map_or(false, |u| u.contains(':')) {
            return Err(Error::ColonInProxyUsername);
        }
        if user.is_some() || pass.is_some() {
            out.push(Directive::new(
                "HTTPSProxyAuthenticator",
                format!("{}:{}", user.unwrap_or(""), pass.unwrap_or("")),
            ));
        }
    }

    if let Some(d) = out.iter().find(|d| d.value.contains('\0')) {
        return Err(Error::UnrepresentableValue { key: d.key });
    }

    debug!("Computed {} torrc directives.", out.len());
    Ok(out)
}

/// Return `path` as a string, or fail if it is not valid UTF-8.
fn path_str<'a>(field: &'static str, path: &'a Path) -> Result<&'a str> {
    path.to_str().ok_or(Error::NonUtf8Path { field })
}

/// Put brackets around a bare IPv6 address, so that a port can follow it.
fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_owned()
    }
}

/// Format `directives` as the contents of a torrc file.
pub fn render(directives: &[Directive]) -> String {
    directives.iter().map(|d| format!("{}\n", d)).collect()
}

/// Fold `directives` into the torrc text `existing`.
///
/// For each directive, the first line in `existing` that sets the same
/// option (tor option names are case-insensitive) is replaced, and any
/// later lines setting it are dropped.  Directives for options that
/// `existing` does not mention are appended at the end.  Comments, blank
/// lines, and unrelated options are kept as they were.
pub fn merge(existing: &str, directives: &[Directive]) -> String {
    let mut written: HashSet<usize> = HashSet::new();
    let mut out = String::with_capacity(existing.len());

    for line in existing.lines() {
        let found = line_key(line).and_then(|key| {
            directives
                .iter()
                .position(|d| d.key.eq_ignore_ascii_case(key))
        });
        match found {
            Some(idx) if written.contains(&idx) => {
                debug!("Dropping duplicate torrc line for {}", directives[idx].key);
            }
            Some(idx) => {
                written.insert(idx);
                out.push_str(&directives[idx].to_string());
                out.push('\n');
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    for (idx, d) in directives.iter().enumerate() {
        if !written.contains(&idx) {
            out.push_str(&d.to_string());
            out.push('\n');
        }
    }
    out
}

/// Return the option name set by a torrc line, if it sets one.
fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    line.split_whitespace().next()
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::auth::S2kHasher;
    use crate::Error;
    use test_case::test_case;

    /// A hasher that always fails.
    struct Broken;

    impl PasswordHasher for Broken {
        fn hash_password(&self, _secret: &str) -> Result<String> {
            Err(Error::HashFailed("unavailable".into()))
        }
    }

    fn lines(settings: &TorDaemonSettings) -> Vec<String> {
        directives(settings, &S2kHasher::default())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn defaults() {
        assert_eq!(
            lines(&TorDaemonSettings::new()),
            vec!["SocksPort 19050", "ControlPort 19051"]
        );
    }

    #[test]
    fn exit_nodes_strict() {
        let mut s = TorDaemonSettings::new();
        s.exit_nodes = Some("{us}".into());
        s.strict_nodes = Some(true);
        let l = lines(&s);
        assert_eq!(&l[2..], &["ExitNodes {us}", "StrictNodes 1"]);

        s.strict_nodes = Some(false);
        assert!(lines(&s).contains(&"StrictNodes 0".to_string()));
    }

    #[test]
    fn full_order() {
        let s = TorDaemonSettings::builder()
            .socks_port(9050_u16)
            .control_port(9051_u16)
            .exit_nodes("{ca}")
            .strict_nodes(false)
            .hashed_control_password("16:ABCD")
            .data_directory("/var/lib/tor")
            .https_proxy_host("proxy.example.com")
            .https_proxy_port(3128_u16)
            .https_proxy_username("alice")
            .https_proxy_password("s3cret")
            .build()
            .unwrap();
        assert_eq!(
            lines(&s),
            vec![
                "SocksPort 9050",
                "ControlPort 9051",
                "ExitNodes {ca}",
                "StrictNodes 0",
                "HashedControlPassword 16:ABCD",
                "DataDirectory /var/lib/tor",
                "HTTPSProxy proxy.example.com:3128",
                "HTTPSProxyAuthenticator alice:s3cret",
            ]
        );
    }

    #[test]
    fn plaintext_password_is_hashed() {
        let mut s = TorDaemonSettings::new();
        s.control_password = Some("hunter2".into());
        let d = directives(&s, &S2kHasher::default()).unwrap();
        let hashed = d
            .iter()
            .find(|d| d.key == "HashedControlPassword")
            .unwrap();
        assert!(S2kHasher::verify(&hashed.value, "hunter2").unwrap());
        assert!(!render(&d).contains("hunter2"));
    }

    #[test]
    fn hashed_password_wins() {
        let mut s = TorDaemonSettings::new();
        s.control_password = Some("hunter2".into());
        s.hashed_control_password = Some("16:FEED".into());
        let text = render(&directives(&s, &Broken).unwrap());
        assert!(text.contains("HashedControlPassword 16:FEED\n"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn hash_failure_aborts() {
        let mut s = TorDaemonSettings::new();
        s.control_password = Some("hunter2".into());
        assert!(matches!(
            directives(&s, &Broken),
            Err(Error::HashFailed(_))
        ));
    }

    #[test]
    fn proxy_variants() {
        let mut s = TorDaemonSettings::new();
        // Credentials without a host do nothing.
        s.https_proxy_username = Some("alice".into());
        s.https_proxy_password = Some("pw".into());
        assert_eq!(lines(&s).len(), 2);

        s.https_proxy_host = Some("10.1.1.1".into());
        let l = lines(&s);
        assert_eq!(&l[2..], &["HTTPSProxy 10.1.1.1", "HTTPSProxyAuthenticator alice:pw"]);

        s.https_proxy_password = None;
        assert_eq!(lines(&s)[3], "HTTPSProxyAuthenticator alice:");

        s.https_proxy_username = None;
        assert_eq!(
            lines(&s),
            vec!["SocksPort 19050", "ControlPort 19051", "HTTPSProxy 10.1.1.1"]
        );
    }

    #[test]
    fn render_lines() {
        let d = vec![
            Directive::new("SocksPort", "1"),
            Directive::new("ControlPort", "2"),
        ];
        assert_eq!(render(&d), "SocksPort 1\nControlPort 2\n");
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn merge_into_base() {
        let base = "\
# Base configuration
SocksPort 9050
  controlport 9051
Log notice stdout

SocksPort 9999
#ExitNodes {xx}
";
        let d = vec![
            Directive::new("SocksPort", "19050"),
            Directive::new("ControlPort", "19051"),
            Directive::new("ExitNodes", "{us}"),
        ];
        assert_eq!(
            merge(base, &d),
            "\
# Base configuration
SocksPort 19050
ControlPort 19051
Log notice stdout

#ExitNodes {xx}
ExitNodes {us}
"
        );
    }

    #[test]
    fn merge_empty() {
        let d = vec![Directive::new("SocksPort", "19050")];
        assert_eq!(merge("", &d), "SocksPort 19050\n");
        assert_eq!(merge("Log notice stdout\r\n", &[]), "Log notice stdout\n");
    }

    #[test_case("{us},{ca}", "ExitNodes {us},{ca}" ; "plain")]
    #[test_case("{us}#{ca}", "ExitNodes \"{us}#{ca}\"" ; "hash sign")]
    #[test_case(" {us} ", "ExitNodes \" {us} \"" ; "outer whitespace")]
    #[test_case("{us}\nControlPort 9999", "ExitNodes \"{us}\\nControlPort 9999\"" ; "newline")]
    #[test_case("a\"b\\c", "ExitNodes \"a\\\"b\\\\c\"" ; "quote and backslash")]
    #[test_case("a\tb\r", "ExitNodes \"a\\tb\\r\"" ; "tab and cr")]
    #[test_case("\u{7}", "ExitNodes \"\\x07\"" ; "bell")]
    #[test_case("\u{85}", "ExitNodes \"\\xc2\\x85\"" ; "c1 control")]
    #[test_case("", "ExitNodes \"\"" ; "empty")]
    fn value_quoting(value: &str, expected: &str) {
        let mut s = TorDaemonSettings::new();
        s.exit_nodes = Some(value.into());
        let l = lines(&s);
        assert_eq!(l.len(), 3);
        assert_eq!(l[2], expected);
        // The value is kept as given; only its rendering is quoted.
        let d = directives(&s, &S2kHasher::default()).unwrap();
        assert_eq!(d[2].value, value);
    }

    #[test]
    fn newline_in_password_stays_in_one_directive() {
        let mut s = TorDaemonSettings::new();
        s.https_proxy_host = Some("proxy".into());
        s.https_proxy_username = Some("alice".into());
        s.https_proxy_password = Some("pw\nControlPort 0.0.0.0:9999".into());
        let text = render(&directives(&s, &S2kHasher::default()).unwrap());
        assert_eq!(
            text,
            "SocksPort 19050\n\
             ControlPort 19051\n\
             HTTPSProxy proxy\n\
             HTTPSProxyAuthenticator \"alice:pw\\nControlPort 0.0.0.0:9999\"\n"
        );
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn hash_sign_in_data_directory() {
        let mut s = TorDaemonSettings::new();
        s.data_directory = Some("/tmp/my#dir".into());
        assert_eq!(lines(&s)[2], "DataDirectory \"/tmp/my#dir\"");

        // Merging writes the quoted form too.
        let d = directives(&s, &S2kHasher::default()).unwrap();
        let merged = merge("DataDirectory /old\n", &d);
        assert!(merged.starts_with("DataDirectory \"/tmp/my#dir\"\n"));
    }

    #[test]
    fn nul_is_rejected() {
        let mut s = TorDaemonSettings::new();
        s.exit_nodes = Some("{us}\0".into());
        assert!(matches!(
            directives(&s, &S2kHasher::default()),
            Err(Error::UnrepresentableValue { key: "ExitNodes" })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_data_directory() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut s = TorDaemonSettings::new();
        s.data_directory = Some(OsStr::from_bytes(b"/tmp/\xff").into());
        assert!(matches!(
            directives(&s, &S2kHasher::default()),
            Err(Error::NonUtf8Path {
                field: "data_directory"
            })
        ));
    }

    #[test_case("2001:db8::1", Some(3128), "HTTPSProxy [2001:db8::1]:3128" ; "ipv6 with port")]
    #[test_case("::1", None, "HTTPSProxy [::1]" ; "ipv6 without port")]
    #[test_case("[::1]", Some(8080), "HTTPSProxy [::1]:8080" ; "already bracketed")]
    #[test_case("192.0.2.7", Some(3128), "HTTPSProxy 192.0.2.7:3128" ; "ipv4")]
    #[test_case("proxy.example.com", None, "HTTPSProxy proxy.example.com" ; "hostname")]
    fn proxy_host_forms(host: &str, port: Option<u16>, expected: &str) {
        let mut s = TorDaemonSettings::new();
        s.https_proxy_host = Some(host.into());
        s.https_proxy_port = port;
        assert_eq!(lines(&s)[2], expected);
    }

    #[test_case(Some("al:ice"), Some("pw") ; "username with colon")]
    #[test_case(Some(":"), None ; "username is a colon")]
    fn colon_in_username_is_rejected(user: Option<&str>, pass: Option<&str>) {
        let mut s = TorDaemonSettings::new();
        s.https_proxy_host = Some("proxy".into());
        s.https_proxy_username = user.map(Into::into);
        s.https_proxy_password = pass.map(Into::into);
        assert!(matches!(
            directives(&s, &S2kHasher::default()),
            Err(Error::ColonInProxyUsername)
        ));
    }

    #[test]
    fn colon_in_password_is_fine() {
        let mut s = TorDaemonSettings::new();
        s.https_proxy_host = Some("proxy".into());
        s.https_proxy_username = Some("alice".into());
        s.https_proxy_password = Some("pa:ss".into());
        assert_eq!(lines(&s)[3], "HTTPSProxyAuthenticator alice:pa:ss");
    }
}
