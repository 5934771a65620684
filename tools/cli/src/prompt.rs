//! Terminal prompting.

use std::io::{self, BufRead, Write};

use envsecrets_common::{Error, Result};
use envsecrets_vault::Prompter;

/// Prompts on the controlling terminal.
///
/// Secrets are read without echo. Questions are written to stderr so stdout
/// carries only command output.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn passphrase(&self, message: &str) -> Result<String> {
        read_secret(message)
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        let answer = read_line(&format!("{} [y/N]", message))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

/// Read a secret without echo.
pub fn read_secret(message: &str) -> Result<String> {
    rpassword::prompt_password(format!("{} ", message)).map_err(map_prompt_error)
}

/// Read one visible line from stdin, trimmed.
pub fn read_line(message: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{} ", message)?;
    stderr.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(Error::Cancelled("input closed".to_string()));
    }
    Ok(line.trim().to_string())
}

fn map_prompt_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof => {
            Error::Cancelled("prompt aborted".to_string())
        }
        _ => Error::Io(e),
    }
}
