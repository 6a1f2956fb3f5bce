//! Terminal command parsing.

use thiserror::Error;

use crate::core::errors::{AuthError, StoreError};

/// One line of user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain text: send it to the active conversation.
    Send(String),
    /// `/new`
    New,
    /// `/list`
    List,
    /// `/switch <n>`
    Switch(usize),
    /// `/rename <n> <title>`
    Rename {
        /// 1-based position in the listing.
        index: usize,
        /// New title.
        title: String,
    },
    /// `/delete <n>`
    Delete(usize),
    /// `/login <provider>`
    Login(String),
    /// `/logout`
    Logout,
    /// `/whoami`
    WhoAmI,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
}

/// Errors surfaced to the terminal user.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Unrecognised `/command`.
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    /// Required argument missing.
    #[error("/{command} needs {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
    },

    /// Index is not a positive integer.
    #[error("not a conversation number: {0}")]
    InvalidIndex(String),

    /// Index past the end of the listing.
    #[error("no conversation #{index} ({len} listed)")]
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Listing length.
        len: usize,
    },

    /// Store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identity backend rejected the operation.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    ///
    /// # Errors
    /// Returns an error for unknown commands or malformed arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };

        let (name, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, args)| (name, args.trim()));

        let command = match name.to_ascii_lowercase().as_str() {
            "new" => Self::New,
            "list" | "ls" => Self::List,
            "switch" => Self::Switch(parse_index("switch", args)?),
            "rename" => {
                let (index, title) = args
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::MissingArgument {
                        command: "rename",
                        argument: "a number and a title",
                    })?;
                Self::Rename {
                    index: parse_index("rename", index)?,
                    title: title.trim().to_string(),
                }
            }
            "delete" | "rm" => Self::Delete(parse_index("delete", args)?),
            "login" => {
                if args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "login",
                        argument: "a provider (google or facebook)",
                    });
                }
                Self::Login(args.to_string())
            }
            "logout" => Self::Logout,
            "whoami" => Self::WhoAmI,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_index(command: &'static str, raw: &str) -> Result<usize, CommandError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CommandError::MissingArgument {
            command,
            argument: "a conversation number",
        });
    }
    match raw.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(CommandError::InvalidIndex(raw.to_string())),
    }
}
