//! Request path canonical form.
//!
//! Classification matches paths byte for byte, so a path must have exactly
//! one spelling. A path is canonical when it:
//! - starts with `/` and has no empty segments (`//`)
//! - has no `.` or `..` segments
//! - carries no matrix parameters (`;`) or backslashes
//! - percent-encodes only what needs encoding: no escaped unreserved
//!   characters, `/`, or `\`
//!
//! Non-canonical paths are rejected rather than rewritten, so the path the
//! gateway classified is the path the application receives.

/// Why a path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDefect {
    NotAbsolute,
    EmptySegment,
    DotSegment,
    MatrixParameter,
    Backslash,
    BadEscape,
    NeedlessEscape,
}

pub fn check_canonical(path: &str) -> Result<(), PathDefect> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(PathDefect::NotAbsolute);
    };

    let mut segments = rest.split('/').peekable();
    while let Some(segment) = segments.next() {
        // A single trailing slash is an empty last segment and is allowed.
        if segment.is_empty() && segments.peek().is_some() {
            return Err(PathDefect::EmptySegment);
        }
        if segment == "." || segment == ".." {
            return Err(PathDefect::DotSegment);
        }
        check_segment(segment)?;
    }
    Ok(())
}

pub fn is_canonical(path: &str) -> bool {
    check_canonical(path).is_ok()
}

fn check_segment(segment: &str) -> Result<(), PathDefect> {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b';' => return Err(PathDefect::MatrixParameter),
            b'\\' => return Err(PathDefect::Backslash),
            b'%' => {
                let decoded = bytes
                    .get(i + 1..i + 3)
                    .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or(PathDefect::BadEscape)?;
                if is_unreserved(decoded) || decoded == b'/' || decoded == b'\\' {
                    return Err(PathDefect::NeedlessEscape);
                }
                i += 3;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}
