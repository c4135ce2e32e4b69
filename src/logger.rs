//! Terminal logging with colored module prefixes and a progress bar.
//!
//! Everything is written to stderr; stdout is reserved for the rendered
//! document when no output file is configured.
//!
//! # Example
//!
//! ```ignore
//! log!("input"; "read {} documents", count);
//!
//! let progress = ProgressBar::new("input", files.len());
//! files.par_iter().for_each(|_| progress.inc());
//! progress.finish();
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{IsTerminal, Write, stderr},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Whether a progress bar currently owns the last terminal line
static BAR_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Suppresses everything except `error` lines
static QUIET: AtomicBool = AtomicBool::new(false);

// ============================================================================
// Layout Constants
// ============================================================================
//
// Progress bar format: "[module] [████░░░░] 42/100"
//                       ^------^ ^-------^ ^----^
//                       prefix   bar       count

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;
/// Bar wrapper: " []" (space + brackets around progress bar)
const BAR_WRAPPER_LEN: usize = 3;
/// Space before count: "...] 42/100" <- this space
const SPACE_BEFORE_COUNT: usize = 1;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;

#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a message with a colored module prefix.
///
/// Long single-line messages are truncated to the terminal width.
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    if is_quiet() && module_lower != "error" {
        return;
    }
    let prefix = colorize_prefix(module, &module_lower);

    let mut out = stderr().lock();
    let bar_active = BAR_ACTIVE.load(Ordering::SeqCst);
    if bar_active {
        execute!(out, Clear(ClearType::CurrentLine)).ok();
        write!(out, "\r").ok();
    }

    if message.contains('\n') || !out.is_terminal() {
        writeln!(out, "{prefix} {message}").ok();
    } else {
        let width = get_terminal_width() as usize;
        let max_msg_len = width.saturating_sub(calc_prefix_len(module.len()));
        writeln!(out, "{prefix} {}", truncate_str(message, max_msg_len)).ok();
    }
    out.flush().ok();
}

#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "schema" | "directive" => prefix.bright_blue().bold(),
        "output" => prefix.bright_green().bold(),
        "warn" => prefix.bright_magenta().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within `max_len` bytes, on a char boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Progress Bar
// ============================================================================

/// Single-line progress bar, updated in place from any thread.
///
/// Disabled (every call is a no-op) when stderr is not a terminal, in quiet
/// mode, or when there is at most one item.
pub struct ProgressBar {
    prefix: ColoredString,
    prefix_len: usize,
    total: usize,
    current: AtomicUsize,
    enabled: bool,
    lock: Mutex<()>,
}

impl ProgressBar {
    pub fn new(module: &'static str, total: usize) -> Self {
        let enabled = total > 1 && !is_quiet() && stderr().is_terminal();
        if enabled {
            BAR_ACTIVE.store(true, Ordering::SeqCst);
        }
        Self {
            prefix: colorize_prefix(module, &module.to_ascii_lowercase()),
            prefix_len: calc_prefix_len(module.len()),
            total,
            current: AtomicUsize::new(0),
            enabled,
            lock: Mutex::new(()),
        }
    }

    pub fn inc(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            self.display(current);
        }
    }

    fn display(&self, current: usize) {
        let _guard = self.lock.lock().ok();

        let progress_text = format!("{}/{}", current, self.total);
        let overhead = self.prefix_len + BAR_WRAPPER_LEN + SPACE_BEFORE_COUNT + progress_text.len();
        let available = (get_terminal_width() as usize).saturating_sub(overhead);
        let bar_width = available.clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH);
        let (filled, empty) = bar_split(current, self.total, bar_width);
        let progress_bar: String = "█".repeat(filled) + &"░".repeat(empty);

        let mut out = stderr().lock();
        execute!(out, Clear(ClearType::CurrentLine)).ok();
        write!(out, "\r{} [{}] {}", self.prefix, progress_bar, progress_text).ok();
        out.flush().ok();
    }

    /// Clear the bar line.
    pub fn finish(&self) {
        if !self.enabled || !BAR_ACTIVE.swap(false, Ordering::SeqCst) {
            return;
        }
        let _guard = self.lock.lock().ok();
        let mut out = stderr().lock();
        execute!(out, Clear(ClearType::CurrentLine), cursor::MoveToColumn(0)).ok();
        out.flush().ok();
    }
}

impl Drop for ProgressBar {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Filled and empty cell counts for `current` of `total`.
const fn bar_split(current: usize, total: usize, width: usize) -> (usize, usize) {
    let filled = if total > 0 {
        let filled = current * width / total;
        if filled > width { width } else { filled }
    } else {
        0
    };
    (filled, width - filled)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_prefix_len() {
        // "input" -> "[input] " = 5 + 2 + 1 = 8
        assert_eq!(calc_prefix_len(5), 8);
        assert_eq!(calc_prefix_len(0), 3);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 5), "hello");
        // "€" is 3 bytes; byte 4 falls inside the second char
        assert_eq!(truncate_str("€€", 4), "€");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn test_bar_split() {
        assert_eq!(bar_split(0, 10, 20), (0, 20));
        assert_eq!(bar_split(5, 10, 20), (10, 10));
        assert_eq!(bar_split(10, 10, 20), (20, 0));
        // over-counting never overflows the bar
        assert_eq!(bar_split(12, 10, 20), (20, 0));
        assert_eq!(bar_split(3, 0, 20), (0, 20));
    }

    #[test]
    fn test_single_item_bar_is_disabled() {
        let bar = ProgressBar::new("input", 1);
        assert!(!bar.enabled);
        bar.inc();
        assert_eq!(bar.current.load(Ordering::Relaxed), 1);
    }
}
