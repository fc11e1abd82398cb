//! Protocol Module
//!
//! The memcached text protocol subset spoken between store clients and the
//! server.
//!
//! ## Commands
//! - `get <key>+`                                   - Reply: VALUE blocks + END
//! - `set <key> <flags> <exptime> <bytes> [noreply]` - Reply: STORED
//! - `version`                                      - Reply: VERSION <v>
//! - `quit`                                         - Server closes the connection
//!
//! ## Error Replies
//! - `ERROR`               - unknown command
//! - `CLIENT_ERROR <msg>`  - malformed request
//! - `SERVER_ERROR <msg>`  - request understood but refused
//!
//! `exptime` is parsed and carried but never enforced.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{ItemValue, Response};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, validate_key, write_command, write_response, MAX_KEY_LENGTH, MAX_LINE_LENGTH,
};
