//! Convert command.

use std::path::Path;

use tracing::{error, info};
use xcheck_runtime::codec::save_session;

use super::load_input;
use crate::cli::{EXIT_INPUT_ERROR, EXIT_SUCCESS};
use crate::terminal;

/// Handle the `convert` command.
pub fn cmd_convert(input: &Path, output: &Path, compress: bool) -> i32 {
    let session = match load_input(input) {
        Ok(session) => session,
        Err(code) => return code,
    };
    info!(input = %input.display(), events = session.len(), compress, "converting");

    match save_session(output, &session, compress) {
        Ok(()) => {
            terminal::success(&format!("wrote {} events", session.len()));
            terminal::path_output(output);
            EXIT_SUCCESS
        }
        Err(err) => {
            error!(output = %output.display(), error = %err, "conversion failed");
            terminal::error(&format!("{}: {err}", output.display()));
            EXIT_INPUT_ERROR
        }
    }
}
