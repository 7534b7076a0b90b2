//! Support code for the `randquik` binary: argument value parsing, error
//! reporting and the stderr status display. Kept in the library so it's
//! testable; none of it is needed for keystream generation itself.

use core::fmt;

use std::format;
use std::io;
use std::string::{String, ToString};
use std::time::Instant;
use std::{eprint, eprintln};

use crate::{Rounds, IV_LEN, KEY_LEN};

/// IV used by the tool: counter zero, nonce `RandQuik`.
pub const DEFAULT_IV: [u8; IV_LEN] = *b"\0\0\0\0\0\0\0\0RandQuik";

/// Everything that can go wrong before or during a run. The keystream core
/// itself has no failure modes; these all come from the tool's edges.
#[derive(Debug)]
pub enum Error {
    /// `-s` held something other than up to 64 hex digits.
    SeedFormat(String),
    /// The OS entropy source was unavailable.
    SeedEntropy,
    /// The `-o` destination could not be opened.
    OpenOutput(String, io::Error),
    /// A write failed mid-run; whatever was already written stays.
    WriteIo(io::Error),
    /// Refusing to splat random bytes onto a terminal.
    RefuseTty,
    /// Unknown flag, missing argument, or an out-of-range value.
    BadOption(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SeedFormat(at) => write!(f, "unable to read seed at `{at}`"),
            Error::SeedEntropy => f.write_str(
                "failed to seed from the system entropy source; use -s HEX for manual seeding",
            ),
            Error::OpenOutput(path, err) => write!(f, "failed to open {path} for writing: {err}"),
            Error::WriteIo(err) => write!(f, "write failed: {err}"),
            Error::RefuseTty => f.write_str(
                "won't print random bytes on a console; pipe to another program or use -o FILE",
            ),
            Error::BadOption(reason) => f.write_str(reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenOutput(_, err) | Error::WriteIo(err) => Some(err),
            _ => None,
        }
    }
}

/// Parses a hex seed. Anything shorter than 64 digits is zero-padded on the
/// right, so `-s ff` means `ff000...0`; digits must come in whole bytes.
pub fn parse_hex_seed(s: &str) -> Result<[u8; KEY_LEN], Error> {
    let digits = s.as_bytes();
    if digits.len() % 2 != 0 || digits.len() > 2 * KEY_LEN {
        return Err(Error::SeedFormat(s.to_string()));
    }
    let mut key = [0; KEY_LEN];
    for (i, pair) in digits.chunks_exact(2).enumerate() {
        let hi = (pair[0] as char).to_digit(16);
        let lo = (pair[1] as char).to_digit(16);
        match (hi, lo) {
            (Some(hi), Some(lo)) => key[i] = (hi << 4 | lo) as u8,
            // `get` instead of indexing: the offending byte may be part of
            // a multi-byte character.
            _ => return Err(Error::SeedFormat(s.get(2 * i..).unwrap_or(s).to_string())),
        }
    }
    Ok(key)
}

/// Parses a byte count with an optional unit: k/m/g/t are decimal SI
/// multiples, ki/mi/gi/ti binary IEC ones, either with an optional trailing
/// `b`, all case-insensitive.
pub fn parse_size(s: &str) -> Result<u64, Error> {
    let bad = || Error::BadOption(format!("expected a byte count, not `{s}`"));
    let digits_end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, suffix) = s.split_at(digits_end);
    let count: u64 = digits.parse().map_err(|_| bad())?;
    let unit: u64 = match suffix.to_ascii_lowercase().as_str() {
        "" => 1,
        "k" | "kb" => 1000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        "ti" | "tib" => 1 << 40,
        _ => return Err(bad()),
    };
    count.checked_mul(unit).ok_or_else(bad)
}

/// Prints the reproduction command line for a seed we picked ourselves.
pub fn echo_seed(key: &[u8; KEY_LEN], rounds: Rounds) {
    use core::fmt::Write;

    let mut hex = String::with_capacity(2 * KEY_LEN);
    for byte in key {
        let _ = write!(hex, "{byte:02x}");
    }
    eprintln!("Random seed generated. This sequence may be repeated by:");
    if rounds == Rounds::R20 {
        eprintln!("randquik -s {hex}\n");
    } else {
        eprintln!("randquik -r {} -s {hex}\n", rounds.count());
    }
}

/// One `\r`-rewritten status line: bytes so far and the current rate.
pub fn print_status(bytes: u64, max_bytes: u64, start: Instant) {
    let secs = start.elapsed().as_secs_f64().max(1e-9);
    let speed = bytes as f64 / secs;
    let (unit, scale) = if speed > 0.5e9 { ("GB", 1e-9) } else { ("MB", 1e-6) };
    let total = if max_bytes != 0 {
        format!(" of {:.0}", scale * max_bytes as f64)
    } else {
        String::new()
    };
    eprint!(
        "\r{:5.0}{} {} written, {:.2} {}/s.\x1b[K",
        scale * bytes as f64,
        total,
        unit,
        scale * speed,
        unit
    );
}

pub fn print_summary(bytes: u64) {
    eprintln!("\nRandQuik wrote {bytes} bytes!\n");
}
