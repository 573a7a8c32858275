//! Structured input requests.
//!
//! Every request yields either a value or `None` for cancellation; callers
//! never see a half-typed answer.

use std::collections::VecDeque;

use inquire::{Confirm, CustomType, InquireError, Select, Text};

#[derive(Debug, thiserror::Error)]
#[error("input unavailable: {0}")]
pub struct InputError(String);

pub trait InputSource {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<Option<String>, InputError>;

    fn number(&mut self, message: &str, default: Option<f32>) -> Result<Option<f32>, InputError>;

    /// Pick one of `options`; returns its index.
    fn choose(&mut self, message: &str, options: &[String]) -> Result<Option<usize>, InputError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<Option<bool>, InputError>;
}

fn answered<T>(result: Result<T, InquireError>) -> Result<Option<T>, InputError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(InputError(e.to_string())),
    }
}

/// Interactive prompts on the terminal.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl InputSource for TerminalInput {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<Option<String>, InputError> {
        let mut prompt = Text::new(message);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        answered(prompt.prompt())
    }

    fn number(&mut self, message: &str, default: Option<f32>) -> Result<Option<f32>, InputError> {
        let mut prompt = CustomType::<f32>::new(message)
            .with_error_message("Please enter a number");
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        answered(prompt.prompt())
    }

    fn choose(&mut self, message: &str, options: &[String]) -> Result<Option<usize>, InputError> {
        let choice = answered(Select::new(message, options.to_vec()).raw_prompt())?;
        Ok(choice.map(|c| c.index))
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<Option<bool>, InputError> {
        answered(Confirm::new(message).with_default(default).prompt())
    }
}

/// Pre-recorded answers, consumed in order. `None` entries and an exhausted
/// script both read as cancellation.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: VecDeque<Option<String>>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(|a| a.map(Into::into)).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self) -> Option<String> {
        self.answers.pop_front().flatten()
    }
}

impl InputSource for ScriptedInput {
    fn text(&mut self, _message: &str, default: Option<&str>) -> Result<Option<String>, InputError> {
        Ok(self.next().map(|a| {
            if a.is_empty() {
                default.unwrap_or_default().to_string()
            } else {
                a
            }
        }))
    }

    fn number(&mut self, message: &str, default: Option<f32>) -> Result<Option<f32>, InputError> {
        let Some(answer) = self.next() else {
            return Ok(None);
        };
        if answer.is_empty() {
            return Ok(default);
        }
        answer
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| InputError(format!("{message}: '{answer}' is not a number")))
    }

    fn choose(&mut self, message: &str, options: &[String]) -> Result<Option<usize>, InputError> {
        let Some(answer) = self.next() else {
            return Ok(None);
        };
        options
            .iter()
            .position(|o| *o == answer)
            .map(Some)
            .ok_or_else(|| InputError(format!("{message}: '{answer}' is not an option")))
    }

    fn confirm(&mut self, _message: &str, default: bool) -> Result<Option<bool>, InputError> {
        Ok(self.next().map(|a| match a.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        }))
    }
}
