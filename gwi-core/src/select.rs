//! Choose one of N labelled options
//!
//! Uses fzf when it is installed and falls back to a numbered prompt on
//! stderr/stdin otherwise. Disabled options are shown but can't be chosen.

use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::process::{ProcessCommand, ProcessInvoker, StderrMode, StdoutMode, TimeoutPolicy};
use crate::{Error, Result};

const DIM: &str = "\x1b[2m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// One entry in a selection list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    /// Returned to the caller when chosen
    pub value: String,
    /// Shown but not selectable
    pub disabled: bool,
    /// Short annotation shown after the label, e.g. "already exists"
    pub hint: Option<String>,
    /// Rendered in a different color (e.g. issues already in progress)
    pub highlighted: bool,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn highlighted(mut self, highlighted: bool) -> Self {
        self.highlighted = highlighted;
        self
    }

    /// Label plus hint, without color
    fn plain_line(&self) -> String {
        match self.hint {
            Some(ref hint) => format!("{} ({})", self.label, hint),
            None => self.label.clone(),
        }
    }

    /// Line as fed to fzf
    fn fzf_line(&self) -> String {
        let label = if self.highlighted && !self.disabled {
            format!("{YELLOW}{}{RESET}", self.label)
        } else {
            self.label.clone()
        };
        let line = match self.hint {
            Some(ref hint) if self.highlighted && !self.disabled => {
                format!("{label} {CYAN}({hint}){RESET}")
            }
            Some(ref hint) => format!("{label} {YELLOW}({hint}){RESET}"),
            None => label,
        };
        if self.disabled {
            format!("{DIM}{line}{RESET}")
        } else {
            line
        }
    }
}

/// Selection backed by fzf or the numbered fallback
#[derive(Clone)]
pub struct SelectionService {
    invoker: Arc<dyn ProcessInvoker>,
    fzf: String,
}

impl std::fmt::Debug for SelectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionService")
            .field("fzf", &self.fzf)
            .finish_non_exhaustive()
    }
}

impl SelectionService {
    pub fn new(invoker: Arc<dyn ProcessInvoker>, fzf: impl Into<String>) -> Self {
        Self {
            invoker,
            fzf: fzf.into(),
        }
    }

    /// Present `options` under `header` and return the chosen value
    pub async fn select(&self, header: &str, options: &[SelectOption]) -> Result<String> {
        if options.is_empty() {
            return Err(Error::NoOptions);
        }

        if self.invoker.is_available(&self.fzf) {
            return self.select_with_fzf(header, options).await;
        }

        let header = header.to_string();
        let options = options.to_vec();
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut stderr = std::io::stderr();
            select_numbered(&header, &options, &mut input, &mut stderr)
        })
        .await
        .map_err(|e| Error::Other(format!("selection prompt failed: {}", e)))?
    }

    async fn select_with_fzf(&self, header: &str, options: &[SelectOption]) -> Result<String> {
        let enabled = options.iter().filter(|o| !o.disabled);
        let disabled = options.iter().filter(|o| o.disabled);
        let input: String = enabled
            .chain(disabled)
            .map(|o| o.fzf_line() + "\n")
            .collect();

        let command = ProcessCommand::new(&self.fzf)
            .args(["--height=~50%", "--reverse", "--ansi"])
            .arg(format!("--header={}", header))
            .stdin_data(input)
            .stdout(StdoutMode::Capture)
            .stderr(StderrMode::Inherit)
            .timeout(TimeoutPolicy::Unbounded);

        let output = self.invoker.run(&command).await?;
        if !output.success() {
            return Err(Error::NoSelection);
        }

        let selected = output.stdout_trimmed();
        if selected.is_empty() {
            return Err(Error::NoSelection);
        }
        resolve_fzf_choice(selected, options)
    }
}

/// Map a line printed by fzf back to an option value
fn resolve_fzf_choice(selected: &str, options: &[SelectOption]) -> Result<String> {
    let clean = strip_ansi(selected);
    let chosen = options
        .iter()
        .find(|o| clean == o.plain_line())
        .or_else(|| options.iter().find(|o| clean == o.label));

    match chosen {
        Some(option) if !option.disabled => Ok(option.value.clone()),
        _ => Err(Error::InvalidSelection),
    }
}

/// Remove `ESC [ ... m` color sequences
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Numbered-list prompt
///
/// Only enabled options receive numbers; disabled ones are listed dimmed
/// without a number. Empty input is "no selection made", anything that is not
/// one of the printed numbers is "invalid selection".
pub fn select_numbered<R: BufRead, W: Write>(
    header: &str,
    options: &[SelectOption],
    input: &mut R,
    out: &mut W,
) -> Result<String> {
    if options.is_empty() {
        return Err(Error::NoOptions);
    }

    writeln!(out)?;
    writeln!(out, "{}:", header)?;
    writeln!(out)?;

    let mut numbered: Vec<&SelectOption> = Vec::new();
    for option in options {
        let hint = option
            .hint
            .as_ref()
            .map(|h| format!(" ({})", h))
            .unwrap_or_default();
        if option.disabled {
            writeln!(out, "     {DIM}{}{}{RESET}", option.label, hint)?;
        } else {
            numbered.push(option);
            if option.highlighted {
                writeln!(out, "  {}) {YELLOW}{}{}{RESET}", numbered.len(), option.label, hint)?;
            } else {
                writeln!(out, "  {}) {}{}", numbered.len(), option.label, hint)?;
            }
        }
    }

    if numbered.is_empty() {
        return Err(Error::NoOptions);
    }

    writeln!(out)?;
    write!(out, "Select [1-{}]: ", numbered.len())?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        return Err(Error::NoSelection);
    }

    let choice: usize = answer.parse().map_err(|_| Error::InvalidSelection)?;
    choice
        .checked_sub(1)
        .and_then(|i| numbered.get(i))
        .map(|o| o.value.clone())
        .ok_or(Error::InvalidSelection)
}
