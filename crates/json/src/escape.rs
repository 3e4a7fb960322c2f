//! String escaping for JSON and JSON5 output.

use crate::options::JsonFlags;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Appends `bytes` to `out` as a double-quoted string.
///
/// `\` and `"` are always escaped, newline, carriage return, tab,
/// backspace and form feed use their short escapes, other bytes below
/// 0x20 become `\u00XX`. Bytes from 0x80 up are copied verbatim. A single
/// quote is escaped (`\u0027`) only when JSON5 is disabled.
pub fn write_escaped(out: &mut Vec<u8>, bytes: &[u8], flags: JsonFlags) {
    let json5 = flags.json5();
    out.reserve(bytes.len() + 2);
    out.push(b'"');
    let mut run = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let short = match b {
            b'"' => b'"',
            b'\\' => b'\\',
            b'\n' => b'n',
            b'\r' => b'r',
            b'\t' => b't',
            0x08 => b'b',
            0x0C => b'f',
            b'\'' if !json5 => 0,
            0x00..=0x1F => 0,
            _ => continue,
        };
        out.extend_from_slice(&bytes[run..i]);
        run = i + 1;
        if short != 0 {
            out.extend_from_slice(&[b'\\', short]);
        } else {
            out.extend_from_slice(b"\\u00");
            out.push(HEX[(b >> 4) as usize]);
            out.push(HEX[(b & 0xF) as usize]);
        }
    }
    out.extend_from_slice(&bytes[run..]);
    out.push(b'"');
}

/// Escapes `bytes` into a new double-quoted string.
#[must_use]
pub fn escape_json_string(bytes: &[u8], flags: JsonFlags) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    write_escaped(&mut out, bytes, flags);
    out
}

/// `true` if `name` can be written as a bare JSON5 key.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.bytes();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' || first == b'$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'$')
}

/// Appends `bytes` as a quoted lowercase hex string.
pub fn write_hex(out: &mut Vec<u8>, bytes: &[u8]) {
    out.reserve(bytes.len() * 2 + 2);
    out.push(b'"');
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize]);
        out.push(HEX[(b & 0xF) as usize]);
    }
    out.push(b'"');
}
