//! Line-editing support: slash-command and mode-name completion.

use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use ragchat_core::session::QueryMode;

use crate::command::COMMANDS;

#[derive(Clone, Default)]
pub struct CliHelper;

impl CliHelper {
    /// Start offset of the word being completed and its candidates.
    ///
    /// A bare `/...` word completes to commands; the argument of `/mode`
    /// completes to mode names.
    fn candidates(&self, line: &str) -> (usize, Vec<&'static str>) {
        match line.split_once(' ') {
            None if line.starts_with('/') => (
                0,
                COMMANDS
                    .iter()
                    .copied()
                    .filter(|cmd| cmd.starts_with(line))
                    .collect(),
            ),
            Some(("/mode", arg)) if !arg.contains(' ') => (
                line.len() - arg.len(),
                QueryMode::ALL
                    .iter()
                    .map(QueryMode::as_str)
                    .filter(|mode| mode.starts_with(arg))
                    .collect(),
            ),
            _ => (line.len(), Vec::new()),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = self.candidates(&line[..pos]);
        let pairs = words
            .into_iter()
            .map(|word| Pair {
                display: word.to_string(),
                replacement: word.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        match line.split_once(' ') {
            Some((command, rest)) => Owned(format!("{} {}", command.bright_cyan(), rest.green())),
            None => Owned(line.bright_cyan().to_string()),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, words) = self.candidates(line);
        let typed = &line[start..];
        words
            .into_iter()
            .find(|word| word.len() > typed.len())
            .map(|word| word[typed.len()..].to_string())
    }
}

impl Validator for CliHelper {}
