use data_encoding::{Encoding, Specification};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::{iter, option, slice, vec};

use crate::utils::error::{Result, SamError};

pub const B32_EXT: &str = ".b32.i2p";

/// Lowercase RFC 4648 base32 without padding, as used in b32 addresses.
pub static BASE32_I2P: LazyLock<Encoding> = LazyLock::new(|| {
    let mut spec = Specification::new();
    spec.symbols.push_str("abcdefghijklmnopqrstuvwxyz234567");
    spec.padding = None;
    spec.encoding().expect("static base32 alphabet is valid")
});

/// Base64 with `-` and `~` in place of `+` and `/`.
pub static BASE64_I2P: LazyLock<Encoding> = LazyLock::new(|| {
    let mut spec = Specification::new();
    spec.symbols
        .push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-~");
    spec.padding = Some('=');
    spec.encoding().expect("static base64 alphabet is valid")
});

static B32_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z2-7]{52}\.b32\.i2p$").expect("static b32 pattern is valid")
});

/// An I2P address: a full destination, a `.b32.i2p` address or a hostname.
///
/// ```
/// use i2p_sam::net::I2pAddr;
///
/// let addr = I2pAddr::new("example.i2p");
/// assert_eq!(addr.as_str(), "example.i2p");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct I2pAddr {
    inner: String,
}

impl I2pAddr {
    pub fn new(dest: &str) -> I2pAddr {
        I2pAddr {
            inner: dest.to_string(),
        }
    }

    /// Derives the b32 address of a full base64 destination.
    pub fn from_b64(dest: &str) -> Result<I2pAddr> {
        let bin = BASE64_I2P.decode(dest.as_bytes()).map_err(|e| {
            tracing::debug!("base64 decoding error: {}", e);
            SamError::BadAddressEncoding(dest.to_string())
        })?;
        let digest = Sha256::digest(&bin);
        let mut b32 = BASE32_I2P.encode(&digest);
        b32.push_str(B32_EXT);
        Ok(I2pAddr { inner: b32 })
    }

    pub fn is_b32(&self) -> bool {
        B32_ADDR.is_match(&self.inner)
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn into_string(self) -> String {
        self.inner
    }
}

impl fmt::Display for I2pAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl FromStr for I2pAddr {
    type Err = SamError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() || s.chars().any(char::is_whitespace) {
            return Err(SamError::InvalidAddress(s.to_string()));
        }
        Ok(I2pAddr::new(s))
    }
}

/// An I2P address with a virtual port, the analogue of `SocketAddr`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct I2pSocketAddr {
    port: u16,
    dest: I2pAddr,
}

impl I2pSocketAddr {
    /// ```
    /// use i2p_sam::net::{I2pAddr, I2pSocketAddr};
    ///
    /// let socket = I2pSocketAddr::new(I2pAddr::new("example.i2p"), 8080);
    /// assert_eq!(socket.dest(), I2pAddr::new("example.i2p"));
    /// assert_eq!(socket.port(), 8080);
    /// ```
    pub fn new(dest: I2pAddr, port: u16) -> I2pSocketAddr {
        I2pSocketAddr { port, dest }
    }

    pub fn dest(&self) -> I2pAddr {
        self.dest.clone()
    }

    pub fn set_dest(&mut self, new_dest: I2pAddr) {
        self.dest = new_dest;
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, new_port: u16) {
        self.port = new_port;
    }
}

impl fmt::Display for I2pSocketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dest, self.port)
    }
}

/// Conversion into one or more I2P socket addresses. Nothing here talks to
/// the router; names are resolved later through the bridge.
pub trait ToI2pSocketAddrs {
    type Iter: Iterator<Item = I2pSocketAddr>;

    fn to_socket_addrs(&self) -> Result<Self::Iter>;
}

impl ToI2pSocketAddrs for I2pSocketAddr {
    type Iter = option::IntoIter<I2pSocketAddr>;

    fn to_socket_addrs(&self) -> Result<Self::Iter> {
        Ok(Some(self.clone()).into_iter())
    }
}

impl ToI2pSocketAddrs for (I2pAddr, u16) {
    type Iter = option::IntoIter<I2pSocketAddr>;

    fn to_socket_addrs(&self) -> Result<Self::Iter> {
        let (dest, port) = self.clone();
        I2pSocketAddr::new(dest, port).to_socket_addrs()
    }
}

impl ToI2pSocketAddrs for (&str, u16) {
    type Iter = vec::IntoIter<I2pSocketAddr>;

    fn to_socket_addrs(&self) -> Result<Self::Iter> {
        let (host, port) = *self;
        let dest: I2pAddr = host.parse()?;
        Ok(vec![I2pSocketAddr::new(dest, port)].into_iter())
    }
}

/// Accepts `host:port`, e.g. `example.i2p:80`.
impl ToI2pSocketAddrs for str {
    type Iter = vec::IntoIter<I2pSocketAddr>;

    fn to_socket_addrs(&self) -> Result<Self::Iter> {
        let (host, port) = self
            .rsplit_once(':')
            .ok_or_else(|| SamError::InvalidAddress(self.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| SamError::InvalidAddress(self.to_string()))?;
        (host, port).to_socket_addrs()
    }
}

impl ToI2pSocketAddrs for String {
    type Iter = vec::IntoIter<I2pSocketAddr>;

    fn to_socket_addrs(&self) -> Result<Self::Iter> {
        self.as_str().to_socket_addrs()
    }
}

impl<'a> ToI2pSocketAddrs for &'a [I2pSocketAddr] {
    type Iter = iter::Cloned<slice::Iter<'a, I2pSocketAddr>>;

    fn to_socket_addrs(&self) -> Result<Self::Iter> {
        Ok(self.iter().cloned())
    }
}

impl<T: ToI2pSocketAddrs + ?Sized> ToI2pSocketAddrs for &T {
    type Iter = T::Iter;

    fn to_socket_addrs(&self) -> Result<T::Iter> {
        (**self).to_socket_addrs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tsa<A: ToI2pSocketAddrs>(a: A) -> Result<Vec<I2pSocketAddr>> {
        Ok(a.to_socket_addrs()?.collect())
    }

    fn isa(host: &str, port: u16) -> I2pSocketAddr {
        I2pSocketAddr::new(I2pAddr::new(host), port)
    }

    #[test]
    fn test_to_socket_addrs_tuples() {
        let a = I2pAddr::new("example.i2p");
        assert_eq!(tsa((a.clone(), 12345)).unwrap(), vec![isa("example.i2p", 12345)]);
        assert_eq!(tsa(("example.i2p", 24352)).unwrap(), vec![isa("example.i2p", 24352)]);
    }

    #[test]
    fn test_to_socket_addrs_strings() {
        let expected = vec![isa("example.i2p", 24352)];
        assert_eq!(tsa("example.i2p:24352").unwrap(), expected);
        assert_eq!(tsa(format!("{}:{}", "example.i2p", 24352)).unwrap(), expected);
        assert_eq!(tsa(&format!("{}:{}", "example.i2p", 24352)).unwrap(), expected);

        assert!(matches!(tsa("example.i2p"), Err(SamError::InvalidAddress(_))));
        assert!(matches!(tsa("example.i2p:http"), Err(SamError::InvalidAddress(_))));
        assert!(matches!(tsa(":80"), Err(SamError::InvalidAddress(_))));
    }

    #[test]
    fn test_to_socket_addrs_slice() {
        let addrs = [isa("a.i2p", 1), isa("b.i2p", 2)];
        assert_eq!(tsa(&addrs[..]).unwrap(), addrs.to_vec());
    }

    #[test]
    fn test_setters_and_display() {
        let mut addr = isa("example12.i2p", 80);
        addr.set_dest(I2pAddr::new("example13.i2p"));
        addr.set_port(8080);
        assert_eq!(addr.dest(), I2pAddr::new("example13.i2p"));
        assert_eq!(addr.port(), 8080);
        assert_eq!(addr.to_string(), "example13.i2p:8080");
    }

    #[test]
    fn test_from_b64() {
        let dest = "AAAA".repeat(129);
        let addr = I2pAddr::from_b64(&dest).unwrap();
        assert!(addr.is_b32());
        assert_eq!(addr.as_str().len(), 52 + B32_EXT.len());
        assert_eq!(addr, I2pAddr::from_b64(&dest).unwrap());
        assert_ne!(addr, I2pAddr::from_b64(&"peer".repeat(129)).unwrap());
    }

    #[test]
    fn test_from_b64_rejects_standard_alphabet() {
        assert!(matches!(
            I2pAddr::from_b64("ab+/"),
            Err(SamError::BadAddressEncoding(_))
        ));
        assert!(matches!(
            I2pAddr::from_b64("abc"),
            Err(SamError::BadAddressEncoding(_))
        ));
    }

    #[test]
    fn test_is_b32() {
        assert!(!I2pAddr::new("example.i2p").is_b32());
        let b32 = format!("{}{}", "a".repeat(52), B32_EXT);
        assert!(I2pAddr::new(&b32).is_b32());
        let upper = format!("{}{}", "A".repeat(52), B32_EXT);
        assert!(!I2pAddr::new(&upper).is_b32());
    }
}
