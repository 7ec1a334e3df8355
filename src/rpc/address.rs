// ABOUTME: Remote service address parsing.
// ABOUTME: Accepts "unix:<path>", a bare absolute path, or "tcp:<host>:<port>".

use super::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::InvalidAddress(s.to_string());

        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(invalid());
            }
            return Ok(Address::Unix(PathBuf::from(path)));
        }

        if let Some(rest) = s.strip_prefix("tcp:") {
            let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            if host.is_empty() {
                return Err(invalid());
            }
            return Ok(Address::Tcp {
                host: host.to_string(),
                port,
            });
        }

        if s.starts_with('/') {
            return Ok(Address::Unix(PathBuf::from(s)));
        }

        Err(invalid())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Unix(path) => write!(f, "unix:{}", path.display()),
            Address::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
        }
    }
}
