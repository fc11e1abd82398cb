//! Protocol codec
//!
//! Encoding and decoding functions for the memcached text protocol.
//!
//! ## Wire Format
//!
//! ### Storage request
//! ```text
//! set <key> <flags> <exptime> <bytes> [noreply]\r\n
//! <data block of exactly <bytes> octets>\r\n
//! ```
//!
//! ### Retrieval request / reply
//! ```text
//! get <key> [<key> ...]\r\n
//!
//! VALUE <key> <flags> <bytes>\r\n
//! <data block>\r\n
//! ... (one block per hit)
//! END\r\n
//! ```
//!
//! Data blocks are delimited by length, not by content, so they may hold
//! any octet including NUL, CR and LF.

use std::io::{self, BufRead, Read, Write};

use bytes::Bytes;

use crate::error::{FlagKvError, Result};
use super::{Command, ItemValue, Response};

/// Longest command or reply line accepted (excluding data blocks)
pub const MAX_LINE_LENGTH: usize = 2048;

/// Longest key accepted
pub const MAX_KEY_LENGTH: usize = 250;

const CRLF: &[u8] = b"\r\n";

/// Upper bound on the buffer reserved up front for a data block
const READ_CHUNK_HINT: usize = 64 * 1024;

// =============================================================================
// Keys
// =============================================================================

/// Check that a key can travel on a command line
///
/// Keys are 1..=250 bytes with no whitespace or control characters.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(FlagKvError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(FlagKvError::InvalidKey(format!(
            "key is {} bytes (max {})",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(FlagKvError::InvalidKey(format!(
            "key {:?} contains whitespace or control characters",
            key
        )));
    }
    Ok(())
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    match command {
        Command::Get { keys } => format!("get {}\r\n", keys.join(" ")).into_bytes(),
        Command::Set {
            key,
            flags,
            exptime,
            data,
            noreply,
        } => {
            let header = format!(
                "set {} {} {} {}{}\r\n",
                key,
                flags,
                exptime,
                data.len(),
                if *noreply { " noreply" } else { "" }
            );

            let mut message = Vec::with_capacity(header.len() + data.len() + CRLF.len());
            message.extend_from_slice(header.as_bytes());
            message.extend_from_slice(data);
            message.extend_from_slice(CRLF);
            message
        }
        Command::Version => b"version\r\n".to_vec(),
        Command::Quit => b"quit\r\n".to_vec(),
        Command::Unknown { name } => format!("{}\r\n", name).into_bytes(),
    }
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8], max_value_size: usize) -> Result<Command> {
    let mut reader = bytes;
    read_command(&mut reader, max_value_size)
}

/// Parse the arguments of a `set` line and read its data block
fn decode_set<R: BufRead>(reader: &mut R, args: &[&str], max_value_size: usize) -> Result<Command> {
    if args.len() != 4 && args.len() != 5 {
        return Err(FlagKvError::Protocol(format!(
            "set: expected 4 or 5 arguments, got {}",
            args.len()
        )));
    }

    let len: usize = parse_arg("bytes", args[3])?;

    // The length is known from here on, so the data block can be skipped
    // and the stream stays in sync even when the request is rejected.
    let header = parse_set_header(args).and_then(|header| {
        validate_key(args[0])?;
        Ok(header)
    });
    let (flags, exptime, noreply) = match header {
        Ok(header) => header,
        Err(e) => {
            discard_data_block(reader, len)?;
            return Err(e);
        }
    };
    if len > max_value_size {
        discard_data_block(reader, len)?;
        return Err(FlagKvError::ValueTooLarge {
            size: len,
            max: max_value_size,
        });
    }

    let data = read_data_block(reader, len)?;

    Ok(Command::Set {
        key: args[0].to_string(),
        flags,
        exptime,
        data,
        noreply,
    })
}

/// Parse `<flags> <exptime>` and the optional `noreply` of a `set` line
fn parse_set_header(args: &[&str]) -> Result<(u32, i64, bool)> {
    let flags: u32 = parse_arg("flags", args[1])?;
    let exptime: i64 = parse_arg("exptime", args[2])?;

    let noreply = match args.get(4) {
        None => false,
        Some(&"noreply") => true,
        Some(other) => {
            return Err(FlagKvError::Protocol(format!(
                "set: unexpected argument {:?}",
                other
            )))
        }
    };
    Ok((flags, exptime, noreply))
}

fn parse_arg<T: std::str::FromStr>(name: &str, token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| FlagKvError::Protocol(format!("bad {} argument: {:?}", name, token)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    match response {
        Response::Values(items) => {
            let mut message = Vec::new();
            for item in items {
                let header = format!("VALUE {} {} {}\r\n", item.key, item.flags, item.data.len());
                message.extend_from_slice(header.as_bytes());
                message.extend_from_slice(&item.data);
                message.extend_from_slice(CRLF);
            }
            message.extend_from_slice(b"END\r\n");
            message
        }
        Response::Stored => b"STORED\r\n".to_vec(),
        Response::Version(version) => format!("VERSION {}\r\n", version).into_bytes(),
        Response::Error => b"ERROR\r\n".to_vec(),
        Response::ClientError(message) => format!("CLIENT_ERROR {}\r\n", message).into_bytes(),
        Response::ServerError(message) => format!("SERVER_ERROR {}\r\n", message).into_bytes(),
    }
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8], max_value_size: usize) -> Result<Response> {
    let mut reader = bytes;
    read_response(&mut reader, max_value_size)
}

/// Parse `VALUE <key> <flags> <bytes>`
fn parse_value_header(line: &str) -> Result<(String, u32, usize)> {
    let args: Vec<&str> = line.split_ascii_whitespace().skip(1).collect();
    if args.len() < 3 {
        return Err(FlagKvError::Protocol(format!(
            "malformed VALUE line: {:?}",
            line
        )));
    }

    // A fourth token (cas unique) is tolerated and ignored
    let flags = parse_arg("flags", args[1])?;
    let len = parse_arg("bytes", args[2])?;
    Ok((args[0].to_string(), flags, len))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs.
/// Unknown keywords come back as [`Command::Unknown`] rather than an error.
pub fn read_command<R: BufRead>(reader: &mut R, max_value_size: usize) -> Result<Command> {
    let line = read_line(reader)?;
    let mut tokens = line.split_ascii_whitespace();

    let name = match tokens.next() {
        Some(name) => name,
        None => return Err(FlagKvError::Protocol("empty command line".to_string())),
    };
    let args: Vec<&str> = tokens.collect();

    match name {
        "get" => {
            if args.is_empty() {
                return Err(FlagKvError::Protocol(
                    "get: at least one key required".to_string(),
                ));
            }
            for key in &args {
                validate_key(key)?;
            }
            Ok(Command::Get {
                keys: args.iter().map(|k| k.to_string()).collect(),
            })
        }
        "set" => decode_set(reader, &args, max_value_size),
        "version" => Ok(Command::Version),
        "quit" => Ok(Command::Quit),
        other => Ok(Command::Unknown {
            name: other.to_string(),
        }),
    }
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: BufRead>(reader: &mut R, max_value_size: usize) -> Result<Response> {
    let mut line = read_line(reader)?;

    if line == "END" || line.starts_with("VALUE ") {
        let mut items = Vec::new();
        let mut too_large = None;
        while line != "END" {
            let (key, flags, len) = parse_value_header(&line)?;
            if len > max_value_size {
                // Skip it but read on to END so the reply is consumed whole
                discard_data_block(reader, len)?;
                too_large.get_or_insert(len);
            } else {
                let data = read_data_block(reader, len)?;
                items.push(ItemValue { key, flags, data });
            }
            line = read_line(reader)?;
        }
        if let Some(size) = too_large {
            return Err(FlagKvError::ValueTooLarge {
                size,
                max: max_value_size,
            });
        }
        return Ok(Response::Values(items));
    }

    let (word, rest) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (line.as_str(), ""),
    };

    match word {
        "STORED" => Ok(Response::Stored),
        "ERROR" => Ok(Response::Error),
        "VERSION" => Ok(Response::Version(rest.to_string())),
        "CLIENT_ERROR" => Ok(Response::ClientError(rest.to_string())),
        "SERVER_ERROR" => Ok(Response::ServerError(rest.to_string())),
        _ => Err(FlagKvError::Protocol(format!(
            "unexpected response line: {:?}",
            line
        ))),
    }
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read one line, without its `\r\n` (or bare `\n`) terminator
///
/// EOF before any byte is reported as `UnexpectedEof` so callers can treat
/// it as a clean disconnect.
fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = Vec::with_capacity(64);
    let read = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed").into());
    }

    if line.last() != Some(&b'\n') {
        if line.len() > MAX_LINE_LENGTH {
            discard_line(reader)?;
            return Err(FlagKvError::Protocol("line too long".to_string()));
        }
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "partial line").into());
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    String::from_utf8(line)
        .map_err(|_| FlagKvError::Protocol("line is not valid UTF-8".to_string()))
}

/// Skip the rest of an over-long line
fn discard_line<R: BufRead>(reader: &mut R) -> Result<()> {
    loop {
        let (found, used) = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => (true, pos + 1),
                None => (false, buf.len()),
            }
        };
        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

/// Read a data block of `len` bytes plus its `\r\n` trailer
///
/// The buffer grows with the bytes actually received, not with the
/// length the peer declared.
fn read_data_block<R: Read>(reader: &mut R, len: usize) -> Result<Bytes> {
    let mut data = Vec::with_capacity(len.min(READ_CHUNK_HINT));
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() < len {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated data block").into());
    }

    let mut trailer = [0u8; 2];
    reader.read_exact(&mut trailer)?;
    if trailer != CRLF {
        return Err(FlagKvError::Protocol("bad data chunk".to_string()));
    }

    Ok(Bytes::from(data))
}

/// Skip a data block of `len` bytes plus its trailer
fn discard_data_block<R: Read>(reader: &mut R, len: usize) -> Result<()> {
    let expected = (len as u64)
        .checked_add(CRLF.len() as u64)
        .ok_or_else(|| FlagKvError::Protocol("bad data chunk".to_string()))?;
    let skipped = io::copy(&mut reader.by_ref().take(expected), &mut io::sink())?;
    if skipped < expected {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated data block").into());
    }
    Ok(())
}
