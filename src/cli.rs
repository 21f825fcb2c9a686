//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// SSH Portal - execute commands on remote servers via SSH
#[derive(Parser, Debug)]
#[command(name = "sshportal")]
#[command(version)]
#[command(about = "Execute commands, transfer files, and open interactive shells over SSH")]
#[command(after_help = "EXAMPLES:
    # Execute a command on the remote server
    sshportal \"pwd\"

    # Execute without welcome messages and system info
    sshportal --quiet \"ls -la\"

    # Transfer a file to the remote server
    sshportal --transfer file.txt /remote/path/file.txt

    # Create a configuration template
    sshportal --create-config

    # Full interactive shell (no command argument)
    sshportal --host 192.168.1.100 -u admin -p secret")]
pub struct Cli {
    /// Command to execute on the remote server; omit for interactive mode
    pub command: Option<String>,

    /// SSH host address (e.g., 192.168.1.100 or server.example.com)
    #[arg(long, help_heading = "Connection Options")]
    pub host: Option<String>,

    /// SSH username
    #[arg(short, long, help_heading = "Connection Options")]
    pub user: Option<String>,

    /// SSH password
    #[arg(short, long, help_heading = "Connection Options")]
    pub password: Option<String>,

    /// SSH port number
    #[arg(long, help_heading = "Connection Options")]
    pub port: Option<u16>,

    /// Configuration file path (stores connection settings)
    #[arg(short, long, default_value = ".ssh-portal", help_heading = "Configuration")]
    pub config: PathBuf,

    /// Create a configuration template file and exit
    #[arg(long, help_heading = "Configuration")]
    pub create_config: bool,

    /// Transfer a file to the remote server
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["LOCAL", "REMOTE"],
        help_heading = "File Operations"
    )]
    pub transfer: Option<Vec<String>>,

    /// Log raw session output to a file
    #[arg(short, long, value_name = "FILE", help_heading = "Output Options")]
    pub log: Option<PathBuf>,

    /// Report each step in detail
    #[arg(short, long, help_heading = "Output Options")]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, help_heading = "Output Options")]
    pub quiet: bool,
}

/// Strip the alternative `|@|command|@|` delimiter, kept for callers that
/// cannot pass quotes through their own shell layer.
pub fn strip_command_delimiter(command: &str) -> &str {
    command
        .strip_prefix("|@|")
        .and_then(|s| s.strip_suffix("|@|"))
        .unwrap_or(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_delimiter_stripped() {
        assert_eq!(strip_command_delimiter("|@|ls -l|@|"), "ls -l");
        assert_eq!(strip_command_delimiter("ls -l"), "ls -l");
        // Unbalanced delimiters are left alone.
        assert_eq!(strip_command_delimiter("|@|ls -l"), "|@|ls -l");
    }

    #[test]
    fn test_transfer_takes_two_values() {
        let cli = Cli::parse_from(["sshportal", "--transfer", "a.txt", "/remote/a.txt"]);
        let transfer = cli.transfer.unwrap();
        assert_eq!(transfer, vec!["a.txt", "/remote/a.txt"]);
    }

    #[test]
    fn test_positional_command() {
        let cli = Cli::parse_from(["sshportal", "--host", "h", "ls -la"]);
        assert_eq!(cli.command.as_deref(), Some("ls -la"));
        assert_eq!(cli.host.as_deref(), Some("h"));
    }
}
