use std::net::SocketAddr;

use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::net::{I2pAddr, I2pSocketAddr, ToI2pSocketAddrs};
use crate::protocol::{parse_peer_header, SamOptions};
use crate::sam::session::{SessionStyle, TRANSIENT};
use crate::sam::{SamConnection, Session, DEFAULT_API};
use crate::utils::error::{Result, SamError};
use crate::utils::random;

/// UDP port the bridge receives outgoing datagrams on.
pub const DEFAULT_UDP_PORT: u16 = 7655;

/// Version tag of the datagram send header.
const DATAGRAM_VERSION: &str = "3.0";

const MAX_DATAGRAM: usize = 65_536;

/// Repliable datagrams over a DATAGRAM style session.
///
/// The bridge forwards incoming datagrams to a local UDP socket, prefixed
/// with a `<destination> FROM_PORT=.. TO_PORT=..` line; outgoing datagrams go
/// to the bridge's UDP port with a `3.0 <nickname> <destination>` line.
#[derive(Debug)]
pub struct I2pDatagramSocket {
    session: Session,
    socket: UdpSocket,
    bridge_udp: SocketAddr,
    default_peer: Option<I2pSocketAddr>,
}

impl I2pDatagramSocket {
    pub async fn bind() -> Result<I2pDatagramSocket> {
        I2pDatagramSocket::bind_via(DEFAULT_API).await
    }

    pub async fn bind_via<A: ToSocketAddrs>(sam_addr: A) -> Result<I2pDatagramSocket> {
        I2pDatagramSocket::bind_with(sam_addr, TRANSIENT, &SamOptions::default(), DEFAULT_UDP_PORT)
            .await
    }

    /// Creates the session for `destination` and binds the local socket the
    /// bridge forwards to. `udp_port` is the bridge's datagram port.
    pub async fn bind_with<A: ToSocketAddrs>(
        sam_addr: A,
        destination: &str,
        options: &SamOptions,
        udp_port: u16,
    ) -> Result<I2pDatagramSocket> {
        let conn = SamConnection::connect(sam_addr).await?;
        I2pDatagramSocket::bind_with_connection(
            conn,
            destination,
            &random::nickname(),
            options,
            udp_port,
        )
        .await
    }

    /// Same as [`bind_with`](Self::bind_with) over a negotiated connection,
    /// under a chosen nickname.
    pub async fn bind_with_connection(
        conn: SamConnection,
        destination: &str,
        nickname: &str,
        options: &SamOptions,
        udp_port: u16,
    ) -> Result<I2pDatagramSocket> {
        let local_ip = conn.local_addr()?.ip();
        let socket = UdpSocket::bind(SocketAddr::new(local_ip, 0)).await?;
        let forward_to = socket.local_addr()?;

        let session = Session::establish(
            conn,
            destination,
            nickname,
            SessionStyle::Datagram,
            forward_args(forward_to),
            options,
        )
        .await?;

        Ok(I2pDatagramSocket {
            bridge_udp: SocketAddr::new(session.sam_api().ip(), udp_port),
            session,
            socket,
            default_peer: None,
        })
    }

    pub fn local_addr(&self) -> I2pSocketAddr {
        I2pSocketAddr::new(I2pAddr::new(self.session.local_dest()), 0)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Sends one datagram; `.i2p` names are resolved through the session
    /// first. Returns the payload length.
    pub async fn send_to<A: ToI2pSocketAddrs>(&self, buf: &[u8], addr: A) -> Result<usize> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or(SamError::UnresolvableAddress)?;
        self.send_addr(buf, &addr).await
    }

    async fn send_addr(&self, buf: &[u8], addr: &I2pSocketAddr) -> Result<usize> {
        let dest = addr.dest();
        let destination = if dest.as_str().ends_with(".i2p") {
            self.session.naming_lookup(dest.as_str()).await?
        } else {
            dest.into_string()
        };

        let mut packet = send_header(self.session.nickname(), &destination, addr.port()).into_bytes();
        packet.extend_from_slice(buf);
        self.socket.send_to(&packet, self.bridge_udp).await?;
        Ok(buf.len())
    }

    /// Receives one datagram; the payload is truncated to `buf`.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, I2pSocketAddr)> {
        let mut packet = vec![0u8; MAX_DATAGRAM];
        let (n, _) = self.socket.recv_from(&mut packet).await?;
        decode_datagram(&packet[..n], buf)
    }

    /// Like [`recv_from`](Self::recv_from) without removing the datagram.
    pub async fn peek_from(&self, buf: &mut [u8]) -> Result<(usize, I2pSocketAddr)> {
        let mut packet = vec![0u8; MAX_DATAGRAM];
        let (n, _) = self.socket.peek_from(&mut packet).await?;
        decode_datagram(&packet[..n], buf)
    }

    /// Sets the peer used by [`send`](Self::send).
    pub fn connect<A: ToI2pSocketAddrs>(&mut self, addr: A) -> Result<()> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or(SamError::UnresolvableAddress)?;
        self.default_peer = Some(addr);
        Ok(())
    }

    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        match &self.default_peer {
            Some(addr) => self.send_addr(buf, addr).await,
            None => Err(SamError::UnresolvableAddress),
        }
    }

    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        self.recv_from(buf).await.map(|(n, _)| n)
    }
}

fn forward_args(to: SocketAddr) -> String {
    format!("PORT={} HOST={}", to.port(), to.ip())
}

fn send_header(nickname: &str, destination: &str, to_port: u16) -> String {
    if to_port > 0 {
        format!(
            "{} {} {} TO_PORT={}\n",
            DATAGRAM_VERSION, nickname, destination, to_port
        )
    } else {
        format!("{} {} {}\n", DATAGRAM_VERSION, nickname, destination)
    }
}

fn decode_datagram(packet: &[u8], buf: &mut [u8]) -> Result<(usize, I2pSocketAddr)> {
    let split = packet
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| SamError::ParseError {
            line: String::from_utf8_lossy(&packet[..packet.len().min(64)]).into_owned(),
        })?;
    let line = String::from_utf8_lossy(&packet[..=split]);
    let header = parse_peer_header(&line)?;

    let payload = &packet[split + 1..];
    let n = payload.len().min(buf.len());
    buf[..n].copy_from_slice(&payload[..n]);

    Ok((
        n,
        I2pSocketAddr::new(I2pAddr::new(&header.destination), header.from_port),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_header() {
        assert_eq!(send_header("nick", "DEST", 0), "3.0 nick DEST\n");
        assert_eq!(send_header("nick", "DEST", 7), "3.0 nick DEST TO_PORT=7\n");
    }

    #[test]
    fn test_forward_args() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(forward_args(addr), "PORT=4000 HOST=127.0.0.1");
    }

    #[test]
    fn test_decode_datagram() {
        let mut buf = [0u8; 16];
        let (n, from) = decode_datagram(b"PEER FROM_PORT=9 TO_PORT=0\nhello", &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(from, I2pSocketAddr::new(I2pAddr::new("PEER"), 9));
    }

    #[test]
    fn test_decode_datagram_truncates() {
        let mut buf = [0u8; 3];
        let (n, _) = decode_datagram(b"PEER\nhello", &mut buf).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf, b"hel");
    }

    #[test]
    fn test_decode_datagram_without_header() {
        let mut buf = [0u8; 8];
        assert!(matches!(
            decode_datagram(b"no newline", &mut buf),
            Err(SamError::ParseError { .. })
        ));
    }
}
