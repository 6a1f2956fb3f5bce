//! Binary entrypoint for the Galaxy terminal chat client.

use std::process::ExitCode;

use galaxy_chat::start_galaxy_chat;

/// Resume the stored session, if any, and start the interactive loop.
fn main() -> ExitCode {
    start_galaxy_chat::run()
}
