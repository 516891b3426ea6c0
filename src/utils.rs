use std::fmt::Display;

pub trait LogError<T> {
    /// Log the error as a warning and carry on without the value.
    fn log_err(self, ctx: &str) -> Option<T>;
}

impl<T, E> LogError<T> for Result<T, E> where E: Display {
    fn log_err(self, ctx: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("{}: {}", ctx, e);
                None
            }
        }
    }
}

/// Cut `s` to at most `max` bytes, backing off to the previous char boundary
/// so a multi-byte sequence is never split.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
