use std::fmt;
use std::io::BufRead;
use crate::error::SimError;
use crate::hex::{HEX_LOOKUP, INVALID_HEX_DIGIT};

/// The operation of a trace record
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessKind {
    Load,
    Store,
}

impl AccessKind {
    /// Maps the first character of a trace line to an access kind
    ///
    /// # Arguments
    ///
    /// * `kind`: The kind byte, `L` or `S`
    /// * `line`: The 1-based trace line, for error reporting
    ///
    /// returns: Result<AccessKind, SimError>
    pub fn from_trace_byte(kind: u8, line: u64) -> Result<Self, SimError> {
        match kind {
            b'L' => Ok(AccessKind::Load),
            b'S' => Ok(AccessKind::Store),
            other => Err(SimError::MalformedAccessKind {
                line,
                kind: char::from(other),
            }),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            AccessKind::Load => 'L',
            AccessKind::Store => 'S',
        }
    }
}

/// One parsed trace entry
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AccessRecord {
    pub kind: AccessKind,
    pub address: u64,
    /// Bytes transferred by the access. Carried for reporting only, the cache works in whole blocks
    pub size: u64,
}

/// Formats the record the way it appears in a trace, e.g. `S 7ff0005b8,8`
impl fmt::Display for AccessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.kind.as_char(), self.address, self.size)
    }
}

/// Reads access records one line at a time from a trace
///
/// Each line is `<kind> <hex-address>,<decimal-size>`, optionally indented. Blank lines are
/// skipped. The reader never reads ahead of the record it yields, so a simulation driven by it
/// processes each record before the next line is touched
pub struct TraceReader<R> {
    reader: R,
    buffer: Vec<u8>,
    line: u64,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64),
            line: 0,
        }
    }

    /// The 1-based number of the last line read
    pub fn line_number(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<AccessRecord, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    match parse_record(&self.buffer, self.line) {
                        Ok(Some(record)) => return Some(Ok(record)),
                        Ok(None) => continue,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Parses a single trace line, returning `None` for blank lines
///
/// The kind is checked first, so a line with an unknown kind reports `MalformedAccessKind` even if
/// the rest of it is also broken
///
/// # Arguments
///
/// * `buf`: The raw line, with or without its line ending
/// * `line`: The 1-based line number, for error reporting
///
/// returns: Result<Option<AccessRecord>, SimError>
pub fn parse_record(buf: &[u8], line: u64) -> Result<Option<AccessRecord>, SimError> {
    let buf = buf.trim_ascii();
    let Some((&kind, rest)) = buf.split_first() else {
        return Ok(None);
    };
    let kind = AccessKind::from_trace_byte(kind, line)?;
    let malformed = |reason: &str| SimError::MalformedRecord {
        line,
        reason: reason.to_string(),
    };

    let operands = rest.trim_ascii_start();
    if operands.len() == rest.len() {
        return Err(malformed("expected whitespace after the access kind"));
    }
    let comma = operands
        .iter()
        .position(|b| *b == b',')
        .ok_or_else(|| malformed("expected ',' between address and size"))?;
    let (address, size) = (&operands[..comma], &operands[comma + 1..]);
    let address = address
        .strip_prefix(b"0x")
        .or_else(|| address.strip_prefix(b"0X"))
        .unwrap_or(address);
    let address = parse_address(address).ok_or_else(|| malformed("address is not a 64-bit hexadecimal value"))?;
    let size = parse_size(size).ok_or_else(|| malformed("size is not a decimal value"))?;
    Ok(Some(AccessRecord { kind, address, size }))
}

/// Parses a hexadecimal address, without prefix, of up to 64 bits
///
/// Digits are decoded through a lookup table generated by the build script, which avoids the
/// branching of a character match for every digit
///
/// # Arguments
///
/// * `buf`: The hex digits
///
/// returns: Option<u64>, `None` if the input is empty, contains a non-hex byte, or overflows
///
/// # Examples
///
/// ```
/// use csim_core::trace::parse_address;
/// assert_eq!(parse_address(b"7ff000a"), Some(0x7ff000a));
/// assert_eq!(parse_address(b"12g4"), None);
/// ```
pub fn parse_address(buf: &[u8]) -> Option<u64> {
    if buf.is_empty() {
        return None;
    }
    let mut res: u64 = 0;
    for &b in buf {
        let digit = HEX_LOOKUP[b as usize];
        if digit == INVALID_HEX_DIGIT || res > u64::MAX >> 4 {
            return None;
        }
        res = (res << 4) | digit as u64;
    }
    Some(res)
}

/// Parses a decimal transfer size
///
/// # Examples
///
/// ```
/// use csim_core::trace::parse_size;
/// assert_eq!(parse_size(b"16"), Some(16));
/// assert_eq!(parse_size(b""), None);
/// ```
pub fn parse_size(buf: &[u8]) -> Option<u64> {
    if buf.is_empty() {
        return None;
    }
    let mut res: u64 = 0;
    for &b in buf {
        if !b.is_ascii_digit() {
            return None;
        }
        res = res.checked_mul(10)?.checked_add((b - b'0') as u64)?;
    }
    Some(res)
}
