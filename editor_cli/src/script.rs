//! Edit scripts: one editing step per line.
//!
//! ```text
//! type Hello world    insert text at the caret
//! enter               split the paragraph
//! backspace 3         delete backwards, optionally repeated
//! delete              delete forwards
//! undo / redo
//! link https://x.dev  link the text at the caret
//! unlink
//! tick 10             advance the editor clock
//! accept              take the autocomplete suggestion
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{anyhow, bail, Context, Result};
use quire_core::{
    Editor, DELETE_CHARACTER, INSERT_PARAGRAPH, INSERT_TEXT, REDO, SELECT_SUGGESTION, TOGGLE_LINK,
    UNDO,
};
use std::thread;
use std::time::Duration;

/// Pause between ticks so background lookups can finish.
const TICK_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Type(String),
    Enter,
    Backspace(usize),
    Delete,
    Undo,
    Redo,
    Link(Option<String>),
    Tick(usize),
    Accept,
}

fn count(arg: &str) -> Result<usize> {
    if arg.is_empty() {
        return Ok(1);
    }
    arg.parse()
        .with_context(|| format!("expected a count, got `{}`", arg))
}

/// Parses one script line. Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Step>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
    let step = match word {
        // Text keeps its inner and trailing spaces.
        "type" => Step::Type(rest.to_string()),
        "enter" => Step::Enter,
        "backspace" => Step::Backspace(count(rest.trim())?),
        "delete" => Step::Delete,
        "undo" => Step::Undo,
        "redo" => Step::Redo,
        "link" => {
            let url = rest.trim();
            if url.is_empty() {
                bail!("`link` needs a URL");
            }
            Step::Link(Some(url.to_string()))
        }
        "unlink" => Step::Link(None),
        "tick" => Step::Tick(count(rest.trim())?),
        "accept" => Step::Accept,
        other => return Err(anyhow!("unknown step `{}`", other)),
    };
    Ok(Some(step))
}

/// Parses a whole script, reporting the first bad line by number.
pub fn parse(source: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, line) in source.lines().enumerate() {
        if let Some(step) = parse_line(line).with_context(|| format!("line {}", index + 1))? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Applies one step. Returns false if no extension handled it.
pub fn apply(editor: &Editor, step: &Step) -> bool {
    log::debug!("step {:?}", step);
    match step {
        Step::Type(text) => editor.dispatch_command(&INSERT_TEXT, text.clone()),
        Step::Enter => editor.dispatch_command(&INSERT_PARAGRAPH, ()),
        Step::Backspace(n) => {
            (0..*n).fold(true, |ok, _| editor.dispatch_command(&DELETE_CHARACTER, true) && ok)
        }
        Step::Delete => editor.dispatch_command(&DELETE_CHARACTER, false),
        Step::Undo => editor.dispatch_command(&UNDO, ()),
        Step::Redo => editor.dispatch_command(&REDO, ()),
        Step::Link(url) => editor.dispatch_command(&TOGGLE_LINK, url.clone()),
        Step::Tick(n) => {
            for _ in 0..*n {
                thread::sleep(TICK_INTERVAL);
                editor.tick();
            }
            true
        }
        Step::Accept => editor.dispatch_command(&SELECT_SUGGESTION, ()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let script = "\
# greeting
type Hello  world
enter

backspace
backspace 3
link https://quire.dev
unlink
tick 4
accept
";
        assert_eq!(
            parse(script).unwrap(),
            vec![
                Step::Type("Hello  world".into()),
                Step::Enter,
                Step::Backspace(1),
                Step::Backspace(3),
                Step::Link(Some("https://quire.dev".into())),
                Step::Link(None),
                Step::Tick(4),
                Step::Accept,
            ]
        );
    }

    #[test]
    fn test_type_keeps_trailing_space() {
        assert_eq!(
            parse_line("type www.x.dev ").unwrap(),
            Some(Step::Type("www.x.dev ".into()))
        );
    }

    #[test]
    fn test_bad_lines_are_reported() {
        let err = parse("undo\njump 3\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2");
        assert!(format!("{:#}", err).contains("unknown step `jump`"));
        assert!(parse_line("backspace many").is_err());
        assert!(parse_line("link").is_err());
    }
}
