//! Scripted in-process SAM bridge for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

/// Name the bridge never answers, to exercise reply timeouts.
pub const SILENT_NAME: &str = "silent.i2p";
/// Name the bridge answers after a PING.
pub const PING_NAME: &str = "ping.i2p";
pub const UNKNOWN_NAME: &str = "unknown.i2p";
/// Session id the bridge reports as taken.
pub const TAKEN_ID: &str = "taken";
/// Greeting the bridge sends right behind the peer header of an accept.
pub const GREETING: &[u8] = b"welcome\n";

pub fn local_dest() -> String {
    "self".repeat(129)
}

pub fn peer_dest() -> String {
    "peer".repeat(129)
}

pub fn unreachable_dest() -> String {
    "gone".repeat(129)
}

#[derive(Default)]
struct State {
    commands: Mutex<Vec<String>>,
    /// Datagram sessions by nickname, with the address they forward to.
    forwards: Mutex<HashMap<String, SocketAddr>>,
    failing_accepts: AtomicUsize,
}

pub struct MockBridge {
    pub addr: SocketAddr,
    pub udp_port: u16,
    state: Arc<State>,
}

impl MockBridge {
    pub async fn start() -> MockBridge {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let udp_port = udp.local_addr().unwrap().port();
        let state = Arc::new(State::default());

        let tcp_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, Arc::clone(&tcp_state)));
            }
        });
        tokio::spawn(handle_datagrams(udp, Arc::clone(&state)));

        MockBridge {
            addr,
            udp_port,
            state,
        }
    }

    /// The next `count` STREAM ACCEPTs fail with `I2P_ERROR`.
    pub fn fail_accepts(&self, count: usize) {
        self.state.failing_accepts.store(count, Ordering::SeqCst);
    }

    /// Every line received so far, without its line ending.
    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

fn arg<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split_whitespace()
        .find_map(|word| word.strip_prefix(key)?.strip_prefix('='))
}

async fn handle_connection(stream: TcpStream, state: Arc<State>) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end().to_string();
        state.commands.lock().unwrap().push(line.clone());

        let reply = if line.starts_with("HELLO VERSION") {
            "HELLO REPLY RESULT=OK VERSION=3.1\n".to_string()
        } else if line.starts_with("NAMING LOOKUP") {
            match arg(&line, "NAME").unwrap_or("") {
                "ME" => format!("NAMING REPLY RESULT=OK NAME=ME VALUE={}\n", local_dest()),
                UNKNOWN_NAME => format!("NAMING REPLY RESULT=KEY_NOT_FOUND NAME={}\n", UNKNOWN_NAME),
                SILENT_NAME => continue,
                PING_NAME => {
                    if write.write_all(b"PING 42\n").await.is_err() {
                        return;
                    }
                    let mut pong = String::new();
                    if reader.read_line(&mut pong).await.unwrap_or(0) == 0 {
                        return;
                    }
                    state
                        .commands
                        .lock()
                        .unwrap()
                        .push(pong.trim_end().to_string());
                    format!("NAMING REPLY RESULT=OK NAME={} VALUE={}\n", PING_NAME, peer_dest())
                }
                name if name.len() > 100 => {
                    format!("NAMING REPLY RESULT=OK NAME={} VALUE={}\n", name, name)
                }
                name => format!("NAMING REPLY RESULT=OK NAME={} VALUE={}\n", name, peer_dest()),
            }
        } else if line.starts_with("DEST GENERATE") {
            format!(
                "DEST REPLY PUB={} PRIV={}AAAA\n",
                peer_dest(),
                peer_dest()
            )
        } else if line.starts_with("SESSION CREATE") {
            let id = arg(&line, "ID").unwrap_or("").to_string();
            if id == TAKEN_ID {
                "SESSION STATUS RESULT=DUPLICATED_ID MESSAGE=\"ID already in use\"\n".to_string()
            } else {
                if arg(&line, "STYLE") == Some("DATAGRAM") {
                    let host = arg(&line, "HOST").unwrap_or("127.0.0.1");
                    let port = arg(&line, "PORT").unwrap_or("0");
                    let forward: SocketAddr = format!("{}:{}", host, port).parse().unwrap();
                    state.forwards.lock().unwrap().insert(id, forward);
                }
                format!("SESSION STATUS RESULT=OK DESTINATION={}AAAA\n", local_dest())
            }
        } else if line.starts_with("SESSION ADD") || line.starts_with("SESSION REMOVE") {
            "SESSION STATUS RESULT=OK\n".to_string()
        } else if line.starts_with("STREAM CONNECT") {
            if arg(&line, "DESTINATION") == Some(unreachable_dest().as_str()) {
                "STREAM STATUS RESULT=CANT_REACH_PEER MESSAGE=\"no route\"\n".to_string()
            } else {
                if write.write_all(b"STREAM STATUS RESULT=OK\n").await.is_err() {
                    return;
                }
                echo(reader, write).await;
                return;
            }
        } else if line.starts_with("STREAM ACCEPT") {
            let failing = state
                .failing_accepts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                "STREAM STATUS RESULT=I2P_ERROR MESSAGE=\"tunnel failure\"\n".to_string()
            } else {
                let mut accepted = format!(
                    "STREAM STATUS RESULT=OK\n{} FROM_PORT=1234 TO_PORT=0\n",
                    peer_dest()
                )
                .into_bytes();
                accepted.extend_from_slice(GREETING);
                if write.write_all(&accepted).await.is_err() {
                    return;
                }
                echo(reader, write).await;
                return;
            }
        } else {
            "SESSION STATUS RESULT=I2P_ERROR MESSAGE=\"unknown command\"\n".to_string()
        };

        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn echo(
    mut reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    mut write: tokio::net::tcp::OwnedWriteHalf,
) {
    let _ = tokio::io::copy(&mut reader, &mut write).await;
    let _ = write.shutdown().await;
}

/// Answers `3.0 <nick> <dest>[ TO_PORT=p]\n<payload>` by forwarding the
/// payload back to the sender's session, as if `dest` had replied from port
/// `p`.
async fn handle_datagrams(udp: UdpSocket, state: Arc<State>) {
    let mut buf = vec![0u8; 65_536];
    loop {
        let n = match udp.recv_from(&mut buf).await {
            Ok((n, _)) => n,
            Err(_) => return,
        };
        let packet = &buf[..n];
        let split = match packet.iter().position(|b| *b == b'\n') {
            Some(split) => split,
            None => continue,
        };
        let header = String::from_utf8_lossy(&packet[..split]).to_string();
        state.commands.lock().unwrap().push(header.clone());

        let words: Vec<&str> = header.split_whitespace().collect();
        if words.len() < 3 {
            continue;
        }
        let forward = match state.forwards.lock().unwrap().get(words[1]) {
            Some(forward) => *forward,
            None => continue,
        };
        let from_port = arg(&header, "TO_PORT").unwrap_or("0");

        let mut reply = format!("{} FROM_PORT={} TO_PORT=0\n", words[2], from_port).into_bytes();
        reply.extend_from_slice(&packet[split + 1..]);
        let _ = udp.send_to(&reply, forward).await;
    }
}
