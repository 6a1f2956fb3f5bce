//! Interactive read-eval-print loop over async stdin/stdout.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::conversations::ConversationStore;
use crate::core::ids::ConversationId;
use crate::session::ChatSession;

use super::command::{Command, CommandError};
use super::render::{self, ASSISTANT_LABEL, HELP};

const PROMPT: &str = "> ";

/// What the loop does after a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Print the text and read the next line.
    Continue(String),
    /// Leave the loop.
    Quit,
}

/// Run the client on the process's stdin and stdout.
///
/// # Errors
/// Returns an error if the terminal cannot be read or written.
pub async fn run_terminal(session: &ChatSession) -> io::Result<()> {
    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    run_loop(session, stdin, &mut stdout).await
}

/// Drive `session` from `input` until `/quit` or end of input.
///
/// # Errors
/// Returns an error if reading `input` or writing `output` fails.
pub async fn run_loop<R, W>(session: &ChatSession, input: R, output: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = format!(
        "{ASSISTANT_LABEL} ready. {}Type /help for commands.\n",
        render::render_profile(session.user().await.as_ref())
    );
    output.write_all(greeting.as_bytes()).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let text = match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => match execute(session, command).await {
                Ok(Flow::Continue(text)) => text,
                Ok(Flow::Quit) => break,
                Err(e) => format!("error: {e}\n"),
            },
            Err(e) => format!("error: {e}\n"),
        };
        output.write_all(text.as_bytes()).await?;
    }

    output.write_all(b"Bye.\n").await?;
    output.flush().await
}

/// Run one command against the session.
///
/// # Errors
/// Returns an error if an index is out of range or the backend refuses.
pub async fn execute(session: &ChatSession, command: Command) -> Result<Flow, CommandError> {
    debug!(?command, "executing command");
    let text = match command {
        Command::Send(text) => match session.send_message(&text).await {
            Some(exchange) => format!("{ASSISTANT_LABEL}: {}\n", exchange.reply.text()),
            None => String::new(),
        },
        Command::New => {
            session.start_conversation().await;
            "Started a new conversation.\n".to_string()
        }
        Command::List => session.view(render::render_listing).await,
        Command::Switch(index) => {
            let id = resolve_index(session, index).await?;
            session.select_conversation(id).await;
            session
                .view(|store| render::render_history(store.active_messages()))
                .await
        }
        Command::Rename { index, title } => {
            let id = resolve_index(session, index).await?;
            if session.rename_conversation(id, &title).await? {
                format!("Renamed conversation #{index}.\n")
            } else {
                "Title unchanged.\n".to_string()
            }
        }
        Command::Delete(index) => {
            let id = resolve_index(session, index).await?;
            session.delete_conversation(id).await?;
            format!("Deleted conversation #{index}.\n")
        }
        Command::Login(provider) => {
            let profile = session.login(&provider).await?;
            let count = session.view(ConversationStore::len).await;
            format!(
                "Welcome, {}. {count} saved conversation(s).\n",
                profile.display_name()
            )
        }
        Command::Logout => {
            session.logout().await;
            "Signed out.\n".to_string()
        }
        Command::WhoAmI => render::render_profile(session.user().await.as_ref()),
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Flow::Quit),
    };
    Ok(Flow::Continue(text))
}

/// Map a 1-based listing position to a conversation id.
async fn resolve_index(session: &ChatSession, index: usize) -> Result<ConversationId, CommandError> {
    session
        .view(|store| {
            let listed = store.conversations_by_recency();
            index
                .checked_sub(1)
                .and_then(|position| listed.get(position))
                .map(|conversation| conversation.id)
                .ok_or(CommandError::OutOfRange {
                    index,
                    len: listed.len(),
                })
        })
        .await
}
