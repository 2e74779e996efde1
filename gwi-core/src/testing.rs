//! Test doubles for the process, prompt and reporting seams
//!
//! Enabled for downstream crates through the `testing` feature.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::process::{ProcessCommand, ProcessInvoker, ProcessOutput, StdoutMode};
use crate::reporter::{Prompter, Reporter};
use crate::select::SelectOption;
use crate::{Error, Result};

type Responder = Box<dyn Fn(&ProcessCommand) -> Result<ProcessOutput> + Send + Sync>;

struct Rule {
    program: String,
    pattern: Vec<String>,
    remaining: Option<usize>,
    respond: Responder,
}

impl Rule {
    fn matches(&self, command: &ProcessCommand) -> bool {
        if self.program != command.program || self.remaining == Some(0) {
            return false;
        }
        if self.pattern.len() > command.args.len() {
            return false;
        }
        self.pattern
            .iter()
            .zip(&command.args)
            .all(|(want, got)| want == "*" || want == got)
    }
}

/// Scripted [`ProcessInvoker`]
///
/// Rules match on the program and a prefix of the arguments (`"*"` matches any
/// single argument). The most recently registered matching rule wins, so a
/// test can set broad defaults first and override specific calls later.
/// Unmatched commands exit 1 with an explanatory stderr.
#[derive(Default)]
pub struct FakeInvoker {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<ProcessCommand>>,
    available: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for FakeInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeInvoker").finish_non_exhaustive()
    }
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, program: &str, args: &[&str], remaining: Option<usize>, respond: Responder) {
        let rule = Rule {
            program: program.to_string(),
            pattern: args.iter().map(|a| a.to_string()).collect(),
            remaining,
            respond,
        };
        self.rules.lock().unwrap().push(rule);
        self.available.lock().unwrap().insert(program.to_string());
    }

    /// Always answer matching commands with `output`
    pub fn on(&self, program: &str, args: &[&str], output: ProcessOutput) -> &Self {
        self.push(program, args, None, Box::new(move |_| Ok(output.clone())));
        self
    }

    /// Answer the next matching command only
    pub fn once(&self, program: &str, args: &[&str], output: ProcessOutput) -> &Self {
        self.push(program, args, Some(1), Box::new(move |_| Ok(output.clone())));
        self
    }

    /// Compute the answer from the command
    pub fn on_with<F>(&self, program: &str, args: &[&str], respond: F) -> &Self
    where
        F: Fn(&ProcessCommand) -> Result<ProcessOutput> + Send + Sync + 'static,
    {
        self.push(program, args, None, Box::new(respond));
        self
    }

    /// Make `program` discoverable without registering a rule
    pub fn with_program(&self, program: &str) -> &Self {
        self.available.lock().unwrap().insert(program.to_string());
        self
    }

    /// Make `program` undiscoverable and fail every call to it
    pub fn without_program(&self, program: &str) -> &Self {
        self.available.lock().unwrap().remove(program);
        let name = program.to_string();
        let rule = Rule {
            program: program.to_string(),
            pattern: Vec::new(),
            remaining: None,
            respond: Box::new(move |_| Err(Error::CommandNotFound(name.clone()))),
        };
        self.rules.lock().unwrap().push(rule);
        self
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<ProcessCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands whose program and argument prefix match
    pub fn calls_matching(&self, program: &str, args: &[&str]) -> Vec<ProcessCommand> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.program == program
                    && c.args.len() >= args.len()
                    && args.iter().zip(&c.args).all(|(w, g)| *w == "*" || w == g)
            })
            .collect()
    }

    pub fn called(&self, program: &str, args: &[&str]) -> bool {
        !self.calls_matching(program, args).is_empty()
    }

    /// Position of the first matching call in the call log
    pub fn position(&self, program: &str, args: &[&str]) -> Option<usize> {
        self.calls().iter().position(|c| {
            c.program == program
                && c.args.len() >= args.len()
                && args.iter().zip(&c.args).all(|(w, g)| *w == "*" || w == g)
        })
    }
}

#[async_trait]
impl ProcessInvoker for FakeInvoker {
    async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(command.clone());

        let mut rules = self.rules.lock().unwrap();
        let Some(rule) = rules.iter_mut().rev().find(|r| r.matches(command)) else {
            return Ok(ProcessOutput::failed(
                1,
                format!("unexpected command: {}", command.display()),
            ));
        };
        if let Some(ref mut remaining) = rule.remaining {
            *remaining -= 1;
        }
        (rule.respond)(command)
    }

    fn is_available(&self, program: &str) -> bool {
        self.available.lock().unwrap().contains(program)
    }
}

/// [`Prompter`] answering from queues
///
/// An exhausted selection queue behaves like a dismissed selector; an
/// exhausted confirmation queue declines.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    selections: Mutex<VecDeque<String>>,
    confirms: Mutex<VecDeque<bool>>,
    headers: Mutex<Vec<(String, Vec<SelectOption>)>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_value(self, value: impl Into<String>) -> Self {
        self.selections.lock().unwrap().push_back(value.into());
        self
    }

    pub fn confirm_with(self, answer: bool) -> Self {
        self.confirms.lock().unwrap().push_back(answer);
        self
    }

    /// Selection requests seen so far, with the options offered
    pub fn selections_offered(&self) -> Vec<(String, Vec<SelectOption>)> {
        self.headers.lock().unwrap().clone()
    }

    /// Confirmation prompts seen so far
    pub fn confirmations_asked(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn select(&self, header: &str, options: &[SelectOption]) -> Result<String> {
        self.headers
            .lock()
            .unwrap()
            .push((header.to_string(), options.to_vec()));
        if options.is_empty() {
            return Err(Error::NoOptions);
        }
        let value = self
            .selections
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::NoSelection)?;
        match options.iter().find(|o| o.value == value) {
            Some(option) if !option.disabled => Ok(value),
            _ => Err(Error::InvalidSelection),
        }
    }

    async fn confirm(&self, prompt: &str) -> Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// One line captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reported {
    Info(String),
    Success(String),
    Warn(String),
    Detail(String),
}

/// [`Reporter`] that records every line
///
/// Reuse of an existing worktree follows the interactive policy unless built
/// with [`RecordingReporter::machine`].
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<Reported>>,
    machine: bool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine() -> Self {
        Self {
            machine: true,
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<Reported> {
        self.lines.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|l| match l {
                Reported::Warn(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Whether any line contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| match l {
            Reported::Info(m) | Reported::Success(m) | Reported::Warn(m) | Reported::Detail(m) => {
                m.contains(needle)
            }
        })
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(Reported::Info(message.to_string()));
    }

    fn success(&self, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(Reported::Success(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().unwrap().push(Reported::Warn(message.to_string()));
    }

    fn detail(&self, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push(Reported::Detail(message.to_string()));
    }

    fn reuse_existing(&self, issue: u64, path: &Path) -> Result<()> {
        if self.machine {
            Ok(())
        } else {
            Err(Error::WorktreeExists {
                issue,
                path: path.to_path_buf(),
            })
        }
    }

    fn child_stdout(&self) -> StdoutMode {
        if self.machine {
            StdoutMode::ToStderr
        } else {
            StdoutMode::Inherit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_rule_wins_and_once_expires() {
        let fake = FakeInvoker::new();
        fake.on("git", &["status"], ProcessOutput::ok("default"))
            .once("git", &["status", "--porcelain"], ProcessOutput::ok("first"));

        let cmd = ProcessCommand::new("git").args(["status", "--porcelain"]);
        assert_eq!(fake.run(&cmd).await.unwrap().stdout, "first");
        assert_eq!(fake.run(&cmd).await.unwrap().stdout, "default");
        assert_eq!(fake.calls_matching("git", &["status"]).len(), 2);
    }

    #[tokio::test]
    async fn test_unmatched_fails_and_wildcards() {
        let fake = FakeInvoker::new();
        fake.on("gh", &["issue", "view", "*", "--json"], ProcessOutput::ok("{}"));

        let hit = ProcessCommand::new("gh").args(["issue", "view", "9", "--json", "x"]);
        assert!(fake.run(&hit).await.unwrap().success());

        let miss = ProcessCommand::new("gh").args(["pr", "view"]);
        let out = fake.run(&miss).await.unwrap();
        assert!(!out.success());
        assert!(out.stderr.contains("unexpected command"));
        assert!(fake.is_available("gh"));
        assert!(!fake.is_available("fzf"));
    }

    #[tokio::test]
    async fn test_without_program() {
        let fake = FakeInvoker::new();
        fake.with_program("gh").without_program("gh");
        assert!(!fake.is_available("gh"));
        let err = fake.run(&ProcessCommand::new("gh")).await.unwrap_err();
        assert!(matches!(err, Error::CommandNotFound(_)));
    }
}
