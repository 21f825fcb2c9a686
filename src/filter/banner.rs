//! Stateful banner/MOTD filter for a live shell byte stream.
//!
//! Remote hosts front-load a login with banner text (MOTD, last-login,
//! system stats) before the first usable prompt. The filter suppresses
//! everything until a prompt-like line is seen, then becomes a pass-through
//! for the rest of the session.
//!
//! Chunks do not align with line boundaries, so the trailing incomplete
//! line is carried over between calls. Without the carry, a prompt split
//! across two chunks would never match.

use memchr::{memchr, memrchr};

use super::prompt::{PromptMatcher, ShellPromptMatcher};

/// How many bytes of incomplete line to retain between chunks. A stream
/// that never sends a newline cannot grow the carry past this.
const DEFAULT_MAX_CARRY: usize = 4096;

/// Suppresses login banner output until the first prompt-like line.
///
/// Once cleared, the filter never reverts: every later chunk is returned
/// unchanged for the lifetime of the session.
pub struct BannerFilter {
    matcher: Box<dyn PromptMatcher>,
    cleared: bool,
    carry: String,
    max_carry: usize,
}

impl BannerFilter {
    /// Create a filter with the default shell prompt heuristics.
    pub fn new() -> Self {
        Self::with_matcher(Box::new(ShellPromptMatcher::new()))
    }

    /// Create a filter with a custom prompt matcher.
    pub fn with_matcher(matcher: Box<dyn PromptMatcher>) -> Self {
        Self {
            matcher,
            cleared: false,
            carry: String::new(),
            max_carry: DEFAULT_MAX_CARRY,
        }
    }

    /// Whether the banner has ended and output is passing through.
    pub fn cleared(&self) -> bool {
        self.cleared
    }

    /// Process one raw chunk, returning what should become user-visible now.
    ///
    /// Returns the empty string while still inside the banner. On the chunk
    /// where a prompt line is first seen, returns that line and everything
    /// after it; banner lines before the match are discarded.
    pub fn process(&mut self, chunk: &str) -> String {
        if self.cleared {
            return chunk.to_string();
        }

        self.carry.push_str(chunk);

        if let Some(start) = self.find_prompt_start() {
            self.cleared = true;
            let visible = self.carry.split_off(start);
            self.carry = String::new();
            return visible;
        }

        // No prompt yet. Completed lines are banner text; only the trailing
        // partial line can still turn into a prompt, so keep just that.
        let tail = memrchr(b'\n', self.carry.as_bytes()).map_or(0, |i| i + 1);
        self.carry.drain(..tail);
        self.trim_carry();

        String::new()
    }

    /// Byte offset of the first prompt-like line in the carry, scanning
    /// every line including the trailing partial one: prompts normally
    /// arrive without a newline.
    fn find_prompt_start(&self) -> Option<usize> {
        let bytes = self.carry.as_bytes();
        let mut start = 0;
        loop {
            let end = memchr(b'\n', &bytes[start..]).map(|i| start + i);
            let line = match end {
                Some(e) => &self.carry[start..e],
                None => &self.carry[start..],
            };

            if self.line_is_prompt(line) {
                return Some(start);
            }

            match end {
                Some(e) => start = e + 1,
                None => return None,
            }
        }
    }

    /// Match a single line, ignoring `\r` and ANSI escape sequences.
    fn line_is_prompt(&self, line: &str) -> bool {
        let stripped = strip_ansi_escapes::strip(line.as_bytes());
        let plain = String::from_utf8_lossy(&stripped);
        self.matcher.is_prompt(plain.trim_end_matches('\r'))
    }

    /// Keep only the last `max_carry` bytes of the carry, on a char boundary.
    fn trim_carry(&mut self) {
        if self.carry.len() <= self.max_carry {
            return;
        }
        let mut cut = self.carry.len() - self.max_carry;
        while !self.carry.is_char_boundary(cut) {
            cut += 1;
        }
        self.carry.drain(..cut);
    }
}

impl Default for BannerFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNER: &str = "Welcome to Ubuntu 22.04.3 LTS\n\
                          Last login: Mon Aug 24 10:01:22 2026\n";

    #[test]
    fn test_banner_suppressed_until_prompt() {
        let mut filter = BannerFilter::new();
        assert_eq!(filter.process(BANNER), "");
        assert!(!filter.cleared());

        let out = filter.process("alice@web01:~$ ");
        assert_eq!(out, "alice@web01:~$ ");
        assert!(filter.cleared());
    }

    #[test]
    fn test_match_line_and_remainder_emitted() {
        let mut filter = BannerFilter::new();
        let out = filter.process("Last login: yesterday\nalice@web01:~$ ls\nfile1\n");
        assert_eq!(out, "alice@web01:~$ ls\nfile1\n");
    }

    #[test]
    fn test_pass_through_after_cleared() {
        let mut filter = BannerFilter::new();
        filter.process("alice@web01:~$ ");
        assert!(filter.cleared());

        // Even banner-looking text passes through untouched now.
        assert_eq!(filter.process("Welcome to nothing\n"), "Welcome to nothing\n");
        assert!(filter.cleared());
    }

    #[test]
    fn test_prompt_split_across_chunks() {
        let mut filter = BannerFilter::new();
        assert_eq!(filter.process(BANNER), "");
        assert_eq!(filter.process("alice@we"), "");
        let out = filter.process("b01:~$ ");
        assert_eq!(out, "alice@web01:~$ ");
        assert!(filter.cleared());
    }

    #[test]
    fn test_chunking_invariance() {
        let stream = "MOTD line one\nMOTD line two\nuser@host:~$ \nls\nfile1\n";

        let mut whole = BannerFilter::new();
        let expected = whole.process(stream);

        for split in 1..stream.len() {
            let mut filter = BannerFilter::new();
            let mut emitted = String::new();
            emitted.push_str(&filter.process(&stream[..split]));
            emitted.push_str(&filter.process(&stream[split..]));
            assert_eq!(emitted, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn test_no_prompt_suppresses_everything() {
        let mut filter = BannerFilter::new();
        assert_eq!(filter.process("just text\n"), "");
        assert_eq!(filter.process("more text\nand more\n"), "");
        assert!(!filter.cleared());
    }

    #[test]
    fn test_ansi_wrapped_prompt_detected() {
        let mut filter = BannerFilter::new();
        let out = filter.process("\x1b[01;32malice@web01\x1b[00m:\x1b[01;34m~\x1b[00m$ ");
        assert!(filter.cleared());
        // Raw bytes are emitted, escapes included.
        assert!(out.contains("\x1b[01;32m"));
    }

    #[test]
    fn test_carry_is_bounded() {
        let mut filter = BannerFilter::new();
        // A newline-free stream of text with no prompt sigils.
        for _ in 0..100 {
            assert_eq!(filter.process(&"banner text without end ".repeat(10)), "");
        }
        assert!(filter.carry.len() <= DEFAULT_MAX_CARRY);
        assert!(!filter.cleared());
    }
}
