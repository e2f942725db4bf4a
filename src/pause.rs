use anyhow::Result;
use crossterm::event::{Event, KeyEventKind, poll, read};
use crossterm::terminal;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

/// When to hold the console open after a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PausePolicy {
    Always,
    Never,
    OnFailure,
}

impl PausePolicy {
    pub fn should_pause(self, succeeded: bool) -> bool {
        match self {
            PausePolicy::Always => true,
            PausePolicy::Never => false,
            PausePolicy::OnFailure => !succeeded,
        }
    }
}

/// Prints `prompt` and blocks until a single key is pressed.
///
/// Without a terminal on stdin (piped or redirected), waits for a line instead.
pub fn wait_for_keypress(prompt: &str) -> Result<()> {
    print!("{}", prompt);
    io::stdout().flush()?;

    if !io::stdin().is_terminal() {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        println!();
        return Ok(());
    }

    terminal::enable_raw_mode()?;
    let result = read_single_key();
    terminal::disable_raw_mode()?;
    println!();

    result
}

fn read_single_key() -> Result<()> {
    // Drop keys typed while the build was running
    while poll(Duration::from_millis(0))? {
        let _ = read();
    }

    loop {
        if let Event::Key(key) = read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}
