use std::io::{self, BufRead, Write};

use crate::usecases::guided_login::LoginTerminal;

/// Blocking stdin/stdout terminal used before the live session starts.
pub struct StdTerminal;

impl LoginTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{line}")
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;
        drop(stdout);

        read_trimmed_line(&mut io::stdin().lock())
    }

    /// Reads without echo. Surrounding spaces are part of the password.
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        rpassword::prompt_password(prompt)
            .map(Some)
            .or_else(|error| match error.kind() {
                io::ErrorKind::UnexpectedEof => Ok(None),
                _ => Err(error),
            })
    }
}

/// `None` on EOF.
fn read_trimmed_line(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    match reader.read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line.trim().to_owned())),
    }
}
