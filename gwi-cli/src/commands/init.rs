//! Shell integration
//!
//! The wrapper function runs navigation commands in machine mode and changes
//! into the printed path. Commands that may remove the current worktree run
//! interactively; their relocation arrives as a marker line on stdout.

use clap::{Args, ValueEnum};

/// Shells the integration script supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    #[default]
    Zsh,
}

/// Print shell integration code
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Target shell; the same function works for bash and zsh
    #[arg(value_enum, default_value_t = Shell::Zsh)]
    pub shell: Shell,
}

const SCRIPT: &str = r#"# gwi - Git Worktree Issue shell integration
# Add to your shell config: eval "$(gwi init __SHELL__)"
__gwi_activate() {
  if [[ "${GWI_AUTO_ACTIVATE:-__AUTO__}" == "1" ]]; then
    command gwi activate 2>/dev/null
  fi
}

gwi() {
  case "$1" in
    cd|main|list|ls|start|create)
      local target
      target="$(command gwi --machine "$@")" || return $?
      if [[ -n "$target" && -d "$target" ]]; then
        cd "$target" && __gwi_activate
      fi
      ;;
    rm|remove|merge|pr)
      local output rc line target=""
      output="$(command gwi "$@")"
      rc=$?
      while IFS= read -r line; do
        case "$line" in
          __GWI_CD_TO__:*) target="${line#__GWI_CD_TO__:}" ;;
          *) [[ -n "$line" ]] && printf '%s\n' "$line" ;;
        esac
      done <<< "$output"
      if [[ -n "$target" && -d "$target" ]]; then
        cd "$target"
      fi
      return $rc
      ;;
    *)
      command gwi "$@"
      ;;
  esac
}
"#;

impl InitArgs {
    /// The wrapper function, auto-activating by default when configured to
    pub fn script(&self, auto_activate: bool) -> String {
        let shell = match self.shell {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
        };
        SCRIPT
            .replace("__SHELL__", shell)
            .replace("__AUTO__", if auto_activate { "1" } else { "0" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_wires_both_encodings() {
        let script = InitArgs { shell: Shell::Bash }.script(false);
        assert!(script.contains("command gwi --machine \"$@\""));
        assert!(script.contains("__GWI_CD_TO__:*)"));
        assert!(script.contains("eval \"$(gwi init bash)\""));
        assert!(script.contains("${GWI_AUTO_ACTIVATE:-0}"));
    }

    #[test]
    fn test_auto_activate_default() {
        let script = InitArgs { shell: Shell::Zsh }.script(true);
        assert!(script.contains("${GWI_AUTO_ACTIVATE:-1}"));
        assert!(!script.contains("__AUTO__"));
    }
}
