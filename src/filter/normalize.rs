//! Output cleanup for one-shot command results.
//!
//! Exec output from hosts with chatty profiles can repeat the command
//! echo, the MOTD, or whole lines verbatim. `clean` reduces raw output to
//! the lines worth printing, in first-seen order.

use indexmap::IndexSet;

/// Substrings that identify banner/MOTD lines in exec output. Matched by
/// containment, not equality, so distro-specific suffixes don't matter.
const BANNER_PHRASES: &[&str] = &[
    "Welcome to",
    "Documentation:",
    "Management:",
    "Support:",
    "System information",
    "System load:",
    "Usage of /",
    "Memory usage:",
    "Swap usage:",
    "Processes:",
    "Users logged in:",
    "IPv4 address",
    "Strictly confined",
    "Expanded Security",
    "updates can be applied",
    "apt list --upgradable",
    "ESM Apps",
    "New release",
    "do-release-upgrade",
    "Last login:",
];

/// Reduce raw one-shot output to the lines that should be printed.
///
/// Drops lines that are empty after trimming, echo the command, or contain
/// a known banner phrase; collapses exact (post-trim) repeats, keeping the
/// first occurrence. Relative order of retained lines is preserved.
pub fn clean(raw_output: &str, command: &str) -> Vec<String> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut result = Vec::new();

    for line in raw_output.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || is_command_echo(trimmed, command)
            || is_banner_line(trimmed)
            || !seen.insert(trimmed.to_string())
        {
            continue;
        }
        result.push(line.to_string());
    }

    result
}

/// Whether a trimmed line echoes the command back, either verbatim or
/// prefixed by a shell prompt (`user@host:~$ ls`).
fn is_command_echo(trimmed: &str, command: &str) -> bool {
    if trimmed == command {
        return true;
    }
    trimmed
        .strip_suffix(command)
        .map(str::trim_end)
        .is_some_and(|prefix| prefix.ends_with('$') || prefix.ends_with('#'))
}

/// Whether a trimmed line contains any known banner/MOTD phrase.
fn is_banner_line(trimmed: &str) -> bool {
    BANNER_PHRASES.iter().any(|phrase| trimmed.contains(phrase))
}
