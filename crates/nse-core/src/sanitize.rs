//! Output Sanitizer (C7, `spec.md` §4.7).
//!
//! Escapes every byte of a task's result string that is not tab/LF/CR or
//! printable ASCII, so the result is always safe to embed as XML text
//! content or print to a terminal.

/// Replace every byte not in `{0x09, 0x0A, 0x0D} ∪ [0x20, 0x7E]` with the
/// six-character uppercase-hex escape `\xHH`.
///
/// Operates on raw bytes (not `char`s) so multi-byte UTF-8 sequences are
/// escaped byte-by-byte, exactly as the invariant in `spec.md` §8
/// describes ("all other input bytes appear only as `\xHH`").
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &b in input.as_bytes() {
        if is_safe(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02X}"));
        }
    }
    out
}

fn is_safe(b: u8) -> bool {
    matches!(b, 0x09 | 0x0A | 0x0D) || (0x20..=0x7E).contains(&b)
}
