use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, space0, space1},
    combinator::{eof, opt},
    multi::separated_list0,
    sequence::{delimited, preceded, separated_pair, terminated, tuple},
    IResult,
};

use crate::utils::error::{Result, SamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Hello,
    SessionStatus,
    StreamStatus,
    NamingReply,
    DestReply,
}

impl ReplyKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ReplyKind::Hello => "HELLO REPLY ",
            ReplyKind::SessionStatus => "SESSION STATUS ",
            ReplyKind::StreamStatus => "STREAM STATUS ",
            ReplyKind::NamingReply => "NAMING REPLY ",
            ReplyKind::DestReply => "DEST REPLY ",
        }
    }
}

/// A parsed reply line, keys in the order the bridge sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    kind: ReplyKind,
    pairs: Vec<(String, String)>,
}

impl Reply {
    pub fn kind(&self) -> ReplyKind {
        self.kind
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| SamError::MissingField {
            field: key.to_string(),
        })
    }

    /// `RESULT`, which the bridge omits on some successful replies.
    pub fn result(&self) -> &str {
        self.get("RESULT").unwrap_or("OK")
    }

    pub fn message(&self) -> &str {
        self.get("MESSAGE").unwrap_or("")
    }

    /// Turns a non-OK `RESULT` into the matching error.
    pub fn check(self) -> Result<Reply> {
        match SamError::from_result_code(self.result(), self.message()) {
            None => Ok(self),
            Some(err) => Err(err),
        }
    }
}

/// The line that precedes data on an accepted stream or a forwarded
/// datagram: `<destination> [FROM_PORT=n] [TO_PORT=n]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerHeader {
    pub destination: String,
    pub from_port: u16,
    pub to_port: u16,
}

fn is_value_end(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\r' || c == '\n'
}

fn quoted_value(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"'))(input)
}

fn bare_value(input: &str) -> IResult<&str, &str> {
    take_till(is_value_end)(input)
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')(input)
}

fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(key, char('='), alt((quoted_value, bare_value)))(input)
}

fn key_values(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    separated_list0(space1, key_value)(input)
}

fn line_end(input: &str) -> IResult<&str, &str> {
    preceded(space0, alt((tag("\r\n"), tag("\n"), eof)))(input)
}

pub(crate) fn reply_pairs<'a>(
    prefix: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<(&'a str, &'a str)>> {
    terminated(preceded(tag(prefix), key_values), line_end)
}

fn owned(pairs: Vec<(&str, &str)>) -> Vec<(String, String)> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn parse_error(line: &str) -> SamError {
    SamError::ParseError {
        line: line.trim_end().to_string(),
    }
}

pub fn parse_reply(kind: ReplyKind, line: &str) -> Result<Reply> {
    match reply_pairs(kind.prefix())(line) {
        Ok((_, pairs)) => Ok(Reply {
            kind,
            pairs: owned(pairs),
        }),
        Err(_) => Err(parse_error(line)),
    }
}

fn port_value(line: &str, pairs: &[(&str, &str)], key: &str) -> Result<u16> {
    match pairs.iter().find(|(k, _)| *k == key) {
        Some((_, v)) => v.parse().map_err(|_| parse_error(line)),
        None => Ok(0),
    }
}

pub fn parse_peer_header(line: &str) -> Result<PeerHeader> {
    let parsed: IResult<&str, (&str, Option<Vec<(&str, &str)>>, &str)> = tuple((
        take_till(is_value_end),
        opt(preceded(space1, key_values)),
        line_end,
    ))(line);

    let (destination, pairs) = match parsed {
        Ok((_, (destination, pairs, _))) => (destination, pairs.unwrap_or_default()),
        Err(_) => return Err(parse_error(line)),
    };
    if destination.is_empty() {
        return Err(SamError::KeyNotFound(
            "no destination in peer header".to_string(),
        ));
    }

    Ok(PeerHeader {
        destination: destination.to_string(),
        from_port: port_value(line, &pairs, "FROM_PORT")?,
        to_port: port_value(line, &pairs, "TO_PORT")?,
    })
}
