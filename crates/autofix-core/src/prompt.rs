//! Interactive selection and confirmation.
//!
//! Workflows never read the terminal directly; they ask a [`Prompter`]. The
//! terminal implementation uses rustyline, tests use [`ScriptedPrompter`].

use std::collections::VecDeque;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::{OpsError, Result};

/// Source of operator answers.
pub trait Prompter {
    /// Show `prompt` and read one line. `Ok(None)` means the operator
    /// interrupted (Ctrl-C) or closed the input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Prompter backed by the controlling terminal.
#[derive(Default)]
pub struct TerminalPrompter {
    editor: Option<DefaultEditor>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.editor.is_none() {
            let editor = DefaultEditor::new()
                .map_err(|e| OpsError::Io(std::io::Error::other(e.to_string())))?;
            self.editor = Some(editor);
        }
        let Some(editor) = self.editor.as_mut() else {
            return Ok(None);
        };
        match editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(OpsError::Io(e)),
            Err(e) => Err(OpsError::Io(std::io::Error::other(e.to_string()))),
        }
    }
}

/// Prompter that replays a fixed list of answers. `None` entries simulate an
/// interrupt; running out of answers behaves like closed input.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Option<String>>,
    prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(|a| Some(a.into())).collect(),
            prompts: Vec::new(),
        }
    }

    /// Queue an interrupt after the already scripted answers.
    pub fn then_interrupt(mut self) -> Self {
        self.answers.push_back(None);
        self
    }

    /// Prompts shown so far, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().flatten())
    }
}

/// Ask for a 1-based choice among `count` listed items and return its
/// 0-based index. Non-numeric, out-of-range or interrupted input aborts.
pub fn choose_index(prompter: &mut dyn Prompter, prompt: &str, count: usize) -> Result<usize> {
    let Some(line) = prompter.read_line(prompt)? else {
        return Err(OpsError::Selection("Cancelled".to_string()));
    };
    let choice: usize = line
        .trim()
        .parse()
        .map_err(|_| OpsError::Selection(format!("'{}' is not a number", line.trim())))?;
    if (1..=count).contains(&choice) {
        Ok(choice - 1)
    } else {
        Err(OpsError::Selection(format!(
            "{choice} is outside 1-{count}"
        )))
    }
}

/// Ask a yes/no question. Only a case-insensitive `Y` confirms; an interrupt
/// counts as a refusal.
pub fn confirm(prompter: &mut dyn Prompter, prompt: &str) -> Result<bool> {
    Ok(prompter
        .read_line(prompt)?
        .map(|answer| answer.trim().eq_ignore_ascii_case("y"))
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_index_accepts_in_range_numbers() {
        let mut prompter = ScriptedPrompter::new([" 2 "]);
        assert_eq!(choose_index(&mut prompter, "Select: ", 3).unwrap(), 1);
        assert_eq!(prompter.prompts(), ["Select: "]);
    }

    #[test]
    fn choose_index_rejects_bad_input() {
        let mut prompter = ScriptedPrompter::new(["0", "4", "two"]);
        for _ in 0..3 {
            assert!(matches!(
                choose_index(&mut prompter, "Select: ", 3),
                Err(OpsError::Selection(_))
            ));
        }
    }

    #[test]
    fn choose_index_interrupt_aborts() {
        let mut prompter = ScriptedPrompter::default().then_interrupt();
        assert!(matches!(
            choose_index(&mut prompter, "Select: ", 3),
            Err(OpsError::Selection(_))
        ));
    }

    #[test]
    fn confirm_requires_y() {
        let mut prompter = ScriptedPrompter::new(["y", " Y ", "yes", "n", ""]);
        assert!(confirm(&mut prompter, "?").unwrap());
        assert!(confirm(&mut prompter, "?").unwrap());
        assert!(!confirm(&mut prompter, "?").unwrap());
        assert!(!confirm(&mut prompter, "?").unwrap());
        assert!(!confirm(&mut prompter, "?").unwrap());
        // exhausted script behaves like closed input
        assert!(!confirm(&mut prompter, "?").unwrap());
    }
}
