use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use fuzzwatch_core::Projection;
use thiserror::Error;
use watch_logging::watch_debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Page(u32),
    Next,
    Prev,
    Refresh,
    Show(Projection),
    Hide(Projection),
    Issue(String),
    Delete(String),
    Connect,
    Disconnect,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("`{0}` is not a page number")]
    BadPage(String),
    #[error("unknown projection `{0}`; expected stats, issues or jobs")]
    BadProjection(String),
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let arg = words.next();

    let command = match head.to_ascii_lowercase().as_str() {
        "page" => {
            let arg = required(arg, "page", "a page number")?;
            let page = arg
                .parse()
                .map_err(|_| CommandError::BadPage(arg.to_string()))?;
            ConsoleCommand::Page(page)
        }
        "next" | "n" => ConsoleCommand::Next,
        "prev" | "p" => ConsoleCommand::Prev,
        "refresh" | "r" => ConsoleCommand::Refresh,
        "show" => ConsoleCommand::Show(projection(required(arg, "show", "a projection")?)?),
        "hide" => ConsoleCommand::Hide(projection(required(arg, "hide", "a projection")?)?),
        "issue" => ConsoleCommand::Issue(required(arg, "issue", "an issue id")?.to_string()),
        "delete" => ConsoleCommand::Delete(required(arg, "delete", "an issue id")?.to_string()),
        "connect" => ConsoleCommand::Connect,
        "disconnect" => ConsoleCommand::Disconnect,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        _ => return Err(CommandError::Unknown(head.to_string())),
    };
    Ok(command)
}

fn required<'a>(
    arg: Option<&'a str>,
    command: &'static str,
    expected: &'static str,
) -> Result<&'a str, CommandError> {
    arg.ok_or(CommandError::MissingArgument { command, expected })
}

fn projection(word: &str) -> Result<Projection, CommandError> {
    match word.to_ascii_lowercase().as_str() {
        "stats" => Ok(Projection::Stats),
        "issues" => Ok(Projection::Issues),
        "jobs" => Ok(Projection::Jobs),
        _ => Err(CommandError::BadProjection(word.to_string())),
    }
}

/// Reads stdin lines on a helper thread. The channel closes at end of input.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    watch_debug!("Stopped reading stdin: {}", err);
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_navigation() {
        assert_eq!(parse_command("page 3"), Ok(ConsoleCommand::Page(3)));
        assert_eq!(parse_command("  next "), Ok(ConsoleCommand::Next));
        assert_eq!(parse_command("PREV"), Ok(ConsoleCommand::Prev));
        assert_eq!(parse_command("refresh"), Ok(ConsoleCommand::Refresh));
    }

    #[test]
    fn parses_projections() {
        assert_eq!(
            parse_command("hide stats"),
            Ok(ConsoleCommand::Hide(Projection::Stats))
        );
        assert_eq!(
            parse_command("show Issues"),
            Ok(ConsoleCommand::Show(Projection::Issues))
        );
        assert_eq!(
            parse_command("show logs"),
            Err(CommandError::BadProjection("logs".into()))
        );
    }

    #[test]
    fn issue_ids_keep_their_case() {
        assert_eq!(
            parse_command("issue 5f1aBC"),
            Ok(ConsoleCommand::Issue("5f1aBC".into()))
        );
        assert_eq!(
            parse_command("delete 5f1aBC"),
            Ok(ConsoleCommand::Delete("5f1aBC".into()))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("launch"),
            Err(CommandError::Unknown("launch".into()))
        );
        assert_eq!(
            parse_command("page"),
            Err(CommandError::MissingArgument {
                command: "page",
                expected: "a page number"
            })
        );
        assert_eq!(
            parse_command("page -1"),
            Err(CommandError::BadPage("-1".into()))
        );
    }
}
