//! Line-oriented terminal front-end

use std::io::{IsTerminal, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::shell::{ChatError, ChatShell};
use crate::INPUT_PLACEHOLDER;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn is_exit(line: &str) -> bool {
    matches!(line.to_ascii_lowercase().as_str(), "exit" | "quit" | ":q")
}

/// Read questions from `input` until EOF or `exit`, re-rendering the
/// transcript after every answer
pub async fn run<R, W>(
    shell: &mut ChatShell,
    input: R,
    out: &mut W,
    clear_screen: bool,
) -> Result<(), ChatError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        if clear_screen {
            write!(out, "{}", CLEAR_SCREEN)?;
        }
        shell.render(out)?;
        write!(out, "\n({})\n> ", INPUT_PLACEHOLDER)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if is_exit(text) {
            debug!("Leaving chat");
            break;
        }

        shell.submit(text).await;
    }

    writeln!(out)?;
    Ok(())
}

/// Run against the process stdin and stdout
pub async fn run_stdio(shell: &mut ChatShell) -> Result<(), ChatError> {
    let mut stdout = std::io::stdout();
    let clear_screen = stdout.is_terminal();
    let stdin = BufReader::new(tokio::io::stdin());
    run(shell, stdin, &mut stdout, clear_screen).await
}
