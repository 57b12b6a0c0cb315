//! Purpose: Read response bodies into memory under a byte cap.
//! Exports: `read_capped`.
//! Role: Keeps oversized or endless bodies from exhausting memory.
//! Invariants: At most `limit + 1` bytes are ever pulled from the reader.
//! Invariants: I/O failures map to `Transport`; overflow maps to `TooLarge`.

use std::io::Read;

use super::error::{Error, ErrorKind};

pub fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message("failed to read response body")
                .with_source(err)
        })?;
    if out.len() as u64 > limit {
        return Err(Error::new(ErrorKind::TooLarge)
            .with_message(format!("response body exceeds {limit} bytes"))
            .with_hint("Raise the body limit (`--max-bytes`) for documents this large."));
    }
    Ok(out)
}
