use std::fmt;

use crate::protocol::options::SignatureType;
use crate::sam::session::SessionStyle;

/// A request line sent to the SAM bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Hello {
        min: String,
        max: String,
    },
    NamingLookup {
        name: String,
    },
    DestGenerate {
        signature_type: SignatureType,
    },
    SessionCreate {
        style: SessionStyle,
        id: String,
        destination: String,
        /// Style specific arguments such as `PORT=` / `HOST=` for datagrams.
        args: String,
        options: String,
    },
    SessionAdd {
        style: SessionStyle,
        id: String,
        args: String,
        options: String,
    },
    SessionRemove {
        id: String,
    },
    StreamConnect {
        id: String,
        destination: String,
        to_port: u16,
    },
    StreamAccept {
        id: String,
    },
}

impl Command {
    /// The line including its terminating newline.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    /// Short name for logs, keeps keys out of them.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Hello { .. } => "HELLO VERSION",
            Command::NamingLookup { .. } => "NAMING LOOKUP",
            Command::DestGenerate { .. } => "DEST GENERATE",
            Command::SessionCreate { .. } => "SESSION CREATE",
            Command::SessionAdd { .. } => "SESSION ADD",
            Command::SessionRemove { .. } => "SESSION REMOVE",
            Command::StreamConnect { .. } => "STREAM CONNECT",
            Command::StreamAccept { .. } => "STREAM ACCEPT",
        }
    }
}

fn write_tail(f: &mut fmt::Formatter<'_>, parts: &[&str]) -> fmt::Result {
    for part in parts.iter().filter(|p| !p.is_empty()) {
        write!(f, " {}", part)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Hello { min, max } => write!(f, "HELLO VERSION MIN={} MAX={}", min, max),
            Command::NamingLookup { name } => write!(f, "NAMING LOOKUP NAME={}", name),
            Command::DestGenerate { signature_type } => {
                write!(f, "DEST GENERATE SIGNATURE_TYPE={}", signature_type)
            }
            Command::SessionCreate {
                style,
                id,
                destination,
                args,
                options,
            } => {
                write!(
                    f,
                    "SESSION CREATE STYLE={} ID={} DESTINATION={}",
                    style, id, destination
                )?;
                write_tail(f, &[args, options])
            }
            Command::SessionAdd {
                style,
                id,
                args,
                options,
            } => {
                write!(f, "SESSION ADD STYLE={} ID={}", style, id)?;
                write_tail(f, &[args, options])
            }
            Command::SessionRemove { id } => write!(f, "SESSION REMOVE ID={}", id),
            Command::StreamConnect {
                id,
                destination,
                to_port,
            } => {
                write!(
                    f,
                    "STREAM CONNECT ID={} DESTINATION={} SILENT=false",
                    id, destination
                )?;
                if *to_port > 0 {
                    write!(f, " TO_PORT={}", to_port)?;
                }
                Ok(())
            }
            Command::StreamAccept { id } => write!(f, "STREAM ACCEPT ID={} SILENT=false", id),
        }
    }
}
