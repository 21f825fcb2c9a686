//! Command classification: one-shot exec vs. interactive shell.
//!
//! Full-screen programs (editors, pagers, monitors) need a PTY and a live
//! input relay; everything else runs cleaner on a one-shot exec channel.
//! Classification is a static lookup against a fixed program table - no
//! remote inspection, and misclassification is an accepted limitation.

/// Execution mode chosen for a command string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Run on a dedicated exec channel that returns output and an exit
    /// status, then closes.
    OneShot,
    /// Run inside a persistent pseudo-terminal shell with an input relay.
    Interactive,
}

/// Programs that need a full terminal. Multi-word entries (`tail -f`)
/// match as a prefix at a command position.
const INTERACTIVE_PROGRAMS: &[&str] = &[
    "top", "htop", "nano", "vi", "vim", "emacs", "less", "more", "tail -f", "watch", "mc",
    "lynx", "tmux", "screen", "man",
];

/// Classify a command string.
///
/// A command is interactive when a known program name appears at a command
/// position: the start of the command, the start of a pipeline or list
/// segment (`|`, `;`, `&&`, `||`), or as the final token. Mentions in
/// argument position (`echo top secret`) do not count.
pub fn classify(command: &str) -> ExecMode {
    let command = command.trim();

    for segment in split_segments(command) {
        if INTERACTIVE_PROGRAMS.iter().any(|p| starts_with_program(segment, p)) {
            return ExecMode::Interactive;
        }
    }

    if let Some(last) = command.split_whitespace().next_back() {
        if INTERACTIVE_PROGRAMS.contains(&last) {
            return ExecMode::Interactive;
        }
    }

    ExecMode::OneShot
}

/// Split a command line on shell pipeline/list operators.
fn split_segments(command: &str) -> impl Iterator<Item = &str> {
    command
        .split(['|', ';'])
        .flat_map(|s| s.split("&&"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Whether a segment invokes `program` (exact, or followed by arguments).
fn starts_with_program(segment: &str, program: &str) -> bool {
    segment == program
        || segment
            .strip_prefix(program)
            .is_some_and(|rest| rest.starts_with(' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_program_is_interactive() {
        assert_eq!(classify("top"), ExecMode::Interactive);
        assert_eq!(classify("htop"), ExecMode::Interactive);
        assert_eq!(classify("man"), ExecMode::Interactive);
    }

    #[test]
    fn test_program_with_arguments_is_interactive() {
        assert_eq!(classify("watch ls"), ExecMode::Interactive);
        assert_eq!(classify("vim /etc/hosts"), ExecMode::Interactive);
        assert_eq!(classify("tail -f /var/log/syslog"), ExecMode::Interactive);
    }

    #[test]
    fn test_argument_mention_is_one_shot() {
        // "top" appears only as an argument, not at a command position.
        assert_eq!(classify("echo top secret"), ExecMode::OneShot);
        assert_eq!(classify("cat manual.txt"), ExecMode::OneShot);
    }

    #[test]
    fn test_pipeline_segment_is_interactive() {
        assert_eq!(classify("ls -la | less"), ExecMode::Interactive);
        assert_eq!(classify("dmesg | grep usb | more"), ExecMode::Interactive);
        assert_eq!(classify("cd /tmp && vi notes"), ExecMode::Interactive);
    }

    #[test]
    fn test_trailing_token_is_interactive() {
        assert_eq!(classify("sudo htop"), ExecMode::Interactive);
    }

    #[test]
    fn test_prefix_requires_token_boundary() {
        // "topsecret" is not "top".
        assert_eq!(classify("topsecret --run"), ExecMode::OneShot);
        assert_eq!(classify("manage.py runserver"), ExecMode::OneShot);
    }

    #[test]
    fn test_plain_commands_are_one_shot() {
        assert_eq!(classify("pwd"), ExecMode::OneShot);
        assert_eq!(classify("ls -la"), ExecMode::OneShot);
        assert_eq!(classify("uname -a"), ExecMode::OneShot);
        assert_eq!(classify("tail -n 20 /var/log/syslog"), ExecMode::OneShot);
    }
}
