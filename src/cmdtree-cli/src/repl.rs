//! Line-oriented interactive shell.
//!
//! Lines starting with `?` print completions for the rest of the line; `exit`
//! or `quit` leave; anything else is invoked.

use std::io::{BufRead, Write};
use std::sync::Arc;

use cmdtree_engine::{DispatchError, Dispatcher, InvocationOutcome, Sender};
use tracing::debug;

const PROMPT: &str = "> ";

/// Reads commands from `input` until EOF or `exit`.
pub fn run(
    dispatcher: &Dispatcher,
    sender: &Arc<dyn Sender>,
    input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<()> {
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        match line.trim() {
            "exit" | "quit" => break,
            "" => {}
            _ => {
                if let Some(partial) = line.strip_prefix('?') {
                    complete(dispatcher, sender.as_ref(), partial, &mut output)?;
                } else {
                    execute(dispatcher, sender, &line, &mut output)?;
                }
            }
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

fn complete(
    dispatcher: &Dispatcher,
    sender: &dyn Sender,
    partial: &str,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    match dispatcher.suggest(sender, partial) {
        Ok(suggestions) if suggestions.is_empty() => writeln!(output, "(no suggestions)")?,
        Ok(suggestions) => writeln!(output, "{}", suggestions.join("  "))?,
        Err(err) => writeln!(output, "error: {err}")?,
    }
    Ok(())
}

fn execute(
    dispatcher: &Dispatcher,
    sender: &Arc<dyn Sender>,
    line: &str,
    output: &mut impl Write,
) -> anyhow::Result<()> {
    match dispatcher.invoke(sender, line) {
        Ok(InvocationOutcome::Completed(Some(value))) => writeln!(output, "{value}")?,
        Ok(InvocationOutcome::Completed(None)) => {}
        Ok(InvocationOutcome::Handled(kind)) => debug!(kind = kind.as_str(), "error handled"),
        Err(DispatchError::Config(err)) => return Err(err.into()),
        Err(err) => writeln!(output, "error: {err}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use cmdtree_engine::{BasicSender, EngineConfig, ValueType};

    use super::*;
    use crate::demo;

    fn session(script: &str) -> String {
        let dispatcher = demo::dispatcher(EngineConfig::default()).unwrap();
        let sender: Arc<dyn Sender> = Arc::new(BasicSender::new("tester", ValueType::new("user")));
        let mut output = Vec::new();
        run(&dispatcher, &sender, Cursor::new(script), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_invoke_and_complete() {
        let transcript = session("/math add 40 2\n?/math a\n/nope\n");
        let lines: Vec<&str> = transcript.lines().collect();
        assert_eq!(lines[0], "> 42");
        assert_eq!(lines[1], "> add");
        assert_eq!(lines[2], "> error: unknown command 'nope'");
    }

    #[test]
    fn test_exit_stops_reading() {
        let transcript = session("exit\n/math add 1 1\n");
        assert!(!transcript.contains('2'));
    }

    #[test]
    fn test_empty_completion() {
        let transcript = session("?/math add 1 \n");
        assert!(transcript.contains("(no suggestions)"));
    }
}
