use clap::{Parser, Subcommand};

/// One line typed at the shell prompt
#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true,
    disable_version_flag = true
)]
struct Line {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Create an account and log in
    Register { login: String, password: String },
    /// Log in to an existing account
    Login { login: String, password: String },
    /// Encrypt and store text under an id
    AddData {
        id: String,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Fetch and decrypt the secret stored under an id
    GetData { id: String },
    /// Remove the secret stored under an id
    DeleteData { id: String },
    /// Forget the token and key held by this shell
    Logout,
    /// Show the command list
    Help,
    /// Leave the shell
    Exit,
}

pub const USAGE: &str = "\
commands:
  register <login> <password>   create an account and log in
  login <login> <password>      log in to an existing account
  add-data <id> <text...>       encrypt and store text under <id>
  get-data <id>                 fetch and decrypt <id>
  delete-data <id>              remove <id>
  logout                        forget the session
  help                          show this list
  exit                          leave the shell";

/// Parse a prompt line, `None` for a blank one
pub fn parse(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|line| Some(line.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse("login alice s3cret").unwrap(),
            Some(ShellCommand::Login {
                login: "alice".into(),
                password: "s3cret".into()
            })
        );
        assert_eq!(
            parse("  get-data   42 ").unwrap(),
            Some(ShellCommand::GetData { id: "42".into() })
        );
        assert_eq!(parse("exit").unwrap(), Some(ShellCommand::Exit));
        assert_eq!(parse("help").unwrap(), Some(ShellCommand::Help));
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_add_data_keeps_every_word() {
        let command = parse("add-data 42 my  card pin -1234").unwrap();
        let Some(ShellCommand::AddData { id, text }) = command else {
            panic!("expected add-data, got {:?}", command);
        };
        assert_eq!(id, "42");
        assert_eq!(text.join(" "), "my card pin -1234");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse("add-data 42").is_err());
        assert!(parse("login alice").is_err());
        assert!(parse("frobnicate").is_err());
    }
}
