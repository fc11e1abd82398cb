//! Protocol Codec Tests
//!
//! Tests for memcached text protocol encoding/decoding.

use std::io::{BufReader, Cursor};

use bytes::Bytes;
use flagkv::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, validate_key, write_command, write_response, Command, CommandType, ItemValue,
    Response, MAX_LINE_LENGTH,
};
use flagkv::FlagKvError;

const MAX_VALUE: usize = 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_get_wire_format() {
    assert_eq!(encode_command(&Command::get("foo")), b"get foo\r\n");

    let multi = Command::Get {
        keys: vec!["a".to_string(), "b".to_string()],
    };
    assert_eq!(encode_command(&multi), b"get a b\r\n");
}

#[test]
fn test_encode_set_wire_format() {
    let cmd = Command::set("k", 2, Bytes::from_static(b"{}"));
    assert_eq!(encode_command(&cmd), b"set k 2 0 2\r\n{}\r\n");
}

#[test]
fn test_encode_decode_get() {
    let encoded = encode_command(&Command::get("hello"));
    let decoded = decode_command(&encoded, MAX_VALUE).unwrap();

    assert_eq!(decoded, Command::get("hello"));
    assert_eq!(decoded.command_type(), CommandType::Get);
}

#[test]
fn test_encode_decode_set() {
    let cmd = Command::Set {
        key: "mykey".to_string(),
        flags: 8,
        exptime: 300,
        data: Bytes::from_static(b"42.5"),
        noreply: true,
    };
    let decoded = decode_command(&encode_command(&cmd), MAX_VALUE).unwrap();

    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_set_binary_data() {
    // Data containing NUL, CR, LF and the terminator sequence itself
    let data: Vec<u8> = (0..=255u8).chain(*b"\r\nEND\r\n\0").collect();
    let cmd = Command::set("bin", 4, data.clone());

    let decoded = decode_command(&encode_command(&cmd), MAX_VALUE).unwrap();

    match decoded {
        Command::Set { data: decoded, flags, .. } => {
            assert_eq!(flags, 4);
            assert_eq!(&decoded[..], &data[..]);
        }
        other => panic!("Expected SET command, got {:?}", other),
    }
}

#[test]
fn test_encode_decode_set_empty_value() {
    let cmd = Command::set("empty", 0, Bytes::new());
    let decoded = decode_command(&encode_command(&cmd), MAX_VALUE).unwrap();
    assert_eq!(decoded, cmd);
}

#[test]
fn test_decode_version_and_quit() {
    assert_eq!(decode_command(b"version\r\n", MAX_VALUE).unwrap(), Command::Version);
    assert_eq!(decode_command(b"quit\r\n", MAX_VALUE).unwrap(), Command::Quit);
}

#[test]
fn test_decode_accepts_bare_newline() {
    assert_eq!(decode_command(b"get foo\n", MAX_VALUE).unwrap(), Command::get("foo"));
}

#[test]
fn test_decode_unknown_command() {
    let decoded = decode_command(b"flush_all\r\n", MAX_VALUE).unwrap();
    assert_eq!(
        decoded,
        Command::Unknown {
            name: "flush_all".to_string()
        }
    );
}

// =============================================================================
// Command Error Tests
// =============================================================================

#[test]
fn test_decode_empty_line_fails() {
    let result = decode_command(b"\r\n", MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Protocol(_))));
}

#[test]
fn test_decode_get_without_key_fails() {
    let result = decode_command(b"get\r\n", MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Protocol(_))));
}

#[test]
fn test_decode_set_bad_arguments_fail() {
    let lines: [&[u8]; 4] = [
        b"set k 0 0\r\n",
        b"set k x 0 1\r\nv\r\n",
        b"set k 0 0 -1\r\n",
        b"set k 0 0 1 maybe\r\nv\r\n",
    ];
    for line in lines {
        let result = decode_command(line, MAX_VALUE);
        assert!(
            matches!(result, Err(FlagKvError::Protocol(_))),
            "{:?} should be rejected",
            String::from_utf8_lossy(line)
        );
    }
}

#[test]
fn test_decode_set_bad_data_chunk() {
    let result = decode_command(b"set k 0 0 2\r\nabcd\r\n", MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Protocol(ref m)) if m == "bad data chunk"));
}

#[test]
fn test_decode_set_truncated_data() {
    let result = decode_command(b"set k 0 0 10\r\nabc", MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Io(_))));
}

#[test]
fn test_decode_incomplete_line() {
    let result = decode_command(b"get fo", MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Io(_))));
}

#[test]
fn test_oversized_value_is_skipped() {
    // The rejected block is drained so the next command parses cleanly
    let mut stream: &[u8] = b"set big 0 0 8\r\n12345678\r\nget next\r\n";

    let result = read_command(&mut stream, 4);
    assert!(matches!(result, Err(FlagKvError::ValueTooLarge { size: 8, max: 4 })));
    assert_eq!(read_command(&mut stream, 4).unwrap(), Command::get("next"));
}

#[test]
fn test_bad_set_header_skips_data_block() {
    let lines: [&[u8]; 3] = [
        b"set k x 0 3\r\nabc\r\nversion\r\n",
        b"set k 0 soon 3\r\nabc\r\nversion\r\n",
        b"set k 0 0 3 maybe\r\nabc\r\nversion\r\n",
    ];
    for line in lines {
        let mut stream = line;
        assert!(matches!(
            read_command(&mut stream, MAX_VALUE),
            Err(FlagKvError::Protocol(_))
        ));
        assert_eq!(read_command(&mut stream, MAX_VALUE).unwrap(), Command::Version);
    }
}

#[test]
fn test_huge_declared_length_is_rejected() {
    let line = format!("set k 0 0 {}\r\n", usize::MAX);
    let result = decode_command(line.as_bytes(), 1024);
    assert!(matches!(result, Err(FlagKvError::Protocol(ref m)) if m == "bad data chunk"));

    // No size limit: the declared length alone must not overflow or allocate
    let line = format!("set k 0 0 {}\r\nabc", usize::MAX);
    let result = decode_command(line.as_bytes(), usize::MAX);
    assert!(matches!(result, Err(FlagKvError::Io(_))));
}

#[test]
fn test_invalid_key_in_set_is_skipped() {
    let key = "k".repeat(251);
    let message = format!("set {} 0 0 3\r\nabc\r\nversion\r\n", key);
    let mut stream = message.as_bytes();

    assert!(matches!(
        read_command(&mut stream, MAX_VALUE),
        Err(FlagKvError::InvalidKey(_))
    ));
    assert_eq!(read_command(&mut stream, MAX_VALUE).unwrap(), Command::Version);
}

#[test]
fn test_line_too_long_is_skipped() {
    let mut message = format!("get {}\r\n", "k".repeat(MAX_LINE_LENGTH + 10)).into_bytes();
    message.extend_from_slice(b"quit\r\n");
    let mut stream = &message[..];

    assert!(matches!(
        read_command(&mut stream, MAX_VALUE),
        Err(FlagKvError::Protocol(ref m)) if m == "line too long"
    ));
    assert_eq!(read_command(&mut stream, MAX_VALUE).unwrap(), Command::Quit);
}

// =============================================================================
// Key Validation Tests
// =============================================================================

#[test]
fn test_validate_key() {
    assert!(validate_key("foo123").is_ok());
    assert!(validate_key(&"k".repeat(250)).is_ok());
    assert!(validate_key("").is_err());
    assert!(validate_key(&"k".repeat(251)).is_err());
    assert!(validate_key("a b").is_err());
    assert!(validate_key("a\u{7f}b").is_err());
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_response_wire_format() {
    assert_eq!(encode_response(&Response::Stored), b"STORED\r\n");
    assert_eq!(encode_response(&Response::miss()), b"END\r\n");
    assert_eq!(encode_response(&Response::Error), b"ERROR\r\n");
    assert_eq!(
        encode_response(&Response::client_error("bad data chunk")),
        b"CLIENT_ERROR bad data chunk\r\n"
    );

    let hit = Response::Values(vec![ItemValue {
        key: "k".to_string(),
        flags: 2,
        data: Bytes::from_static(b"[1]"),
    }]);
    assert_eq!(encode_response(&hit), b"VALUE k 2 3\r\n[1]\r\nEND\r\n");
}

#[test]
fn test_encode_decode_responses() {
    let responses = vec![
        Response::Stored,
        Response::miss(),
        Response::Version("0.1.0".to_string()),
        Response::Error,
        Response::client_error("line too long"),
        Response::server_error("object too large for cache"),
        Response::Values(vec![
            ItemValue {
                key: "a".to_string(),
                flags: 0,
                data: Bytes::from_static(b"hello world"),
            },
            ItemValue {
                key: "b".to_string(),
                flags: 4,
                data: Bytes::from_static(b"\x89PNG\r\n\x1a\n\x00\xff"),
            },
        ]),
    ];

    for response in responses {
        let decoded = decode_response(&encode_response(&response), MAX_VALUE).unwrap();
        assert_eq!(decoded, response);
    }
}

#[test]
fn test_decode_value_with_cas_token() {
    let decoded = decode_response(b"VALUE k 8 2 99\r\n42\r\nEND\r\n", MAX_VALUE).unwrap();
    assert_eq!(
        decoded,
        Response::Values(vec![ItemValue {
            key: "k".to_string(),
            flags: 8,
            data: Bytes::from_static(b"42"),
        }])
    );
}

#[test]
fn test_decode_unexpected_response_fails() {
    let result = decode_response(b"NOT_STORED\r\n", MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Protocol(_))));
}

#[test]
fn test_decode_oversized_value_response_fails() {
    let mut reply = b"VALUE k 0 100\r\n".to_vec();
    reply.extend_from_slice(&[b'x'; 100]);
    reply.extend_from_slice(b"\r\nEND\r\n");

    let result = decode_response(&reply, 10);
    assert!(matches!(result, Err(FlagKvError::ValueTooLarge { size: 100, max: 10 })));
}

#[test]
fn test_oversized_value_response_is_consumed_whole() {
    let mut stream = b"VALUE big 0 12\r\n0123456789ab\r\nVALUE small 8 2\r\n42\r\nEND\r\n".to_vec();
    stream.extend_from_slice(b"VALUE small 8 2\r\n42\r\nEND\r\n");
    let mut reader = &stream[..];

    assert!(matches!(
        read_response(&mut reader, 4),
        Err(FlagKvError::ValueTooLarge { size: 12, max: 4 })
    ));
    // The next reply starts where it should
    assert_eq!(
        read_response(&mut reader, 4).unwrap(),
        Response::Values(vec![ItemValue {
            key: "small".to_string(),
            flags: 8,
            data: Bytes::from_static(b"42"),
        }])
    );
    assert!(reader.is_empty());
}

#[test]
fn test_response_is_error() {
    assert!(Response::Error.is_error());
    assert!(Response::server_error("x").is_error());
    assert!(!Response::Stored.is_error());
    assert!(!Response::miss().is_error());
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_write_read_command_stream() {
    let commands = vec![
        Command::set("k1", 2, Bytes::from_static(b"{\"a\":1}")),
        Command::get("k1"),
        Command::Version,
        Command::Quit,
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut reader = BufReader::new(Cursor::new(buffer));
    for expected in commands {
        assert_eq!(read_command(&mut reader, MAX_VALUE).unwrap(), expected);
    }

    // Stream exhausted
    let result = read_command(&mut reader, MAX_VALUE);
    assert!(matches!(result, Err(FlagKvError::Io(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof));
}

#[test]
fn test_write_read_response_stream() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::Stored).unwrap();
    write_response(&mut buffer, &Response::miss()).unwrap();

    let mut reader = BufReader::new(Cursor::new(buffer));
    assert_eq!(read_response(&mut reader, MAX_VALUE).unwrap(), Response::Stored);
    assert_eq!(read_response(&mut reader, MAX_VALUE).unwrap(), Response::miss());
}
