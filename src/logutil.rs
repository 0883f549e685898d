//! Logging helpers for the spawn core.
//!
//! Display names come from clients and may carry control characters; they are escaped
//! before they reach a log line. Search traces are gated by the `debug_logs` config toggle.

/// Maximum characters of a display name kept in a log line.
const MAX_NAME_PREVIEW: usize = 64;

/// Escape a display name for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///   Other control characters become `\xNN`; long names are cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_NAME_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_NAME_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Emit a spawn search trace line.
///
/// With the first argument `true` (the `debug_logs` toggle) the line is logged at `info`
/// so operators see it without raising the global level; otherwise it goes to `debug`.
macro_rules! spawn_trace {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            log::info!(target: "spawnkeeper::trace", "[spawn] {}", format_args!($($arg)+));
        } else {
            log::debug!(target: "spawnkeeper::trace", "[spawn] {}", format_args!($($arg)+));
        }
    };
}

pub(crate) use spawn_trace;
