//! Shell completions command

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::CompletionsArgs;
use crate::error::{BundlerError, Result};

/// Generate shell completions
pub fn run(args: CompletionsArgs) -> Result<()> {
    let shell = parse_shell(&args.shell)?;

    let mut cmd = <crate::cli::Cli as CommandFactory>::command();
    clap_complete::generate(shell, &mut cmd, "standalone", &mut std::io::stdout().lock());

    Ok(())
}

/// Shell by name, case-insensitive; `pwsh` is accepted for PowerShell
fn parse_shell(name: &str) -> Result<Shell> {
    match name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "elvish" => Ok(Shell::Elvish),
        "fish" => Ok(Shell::Fish),
        "powershell" | "pwsh" => Ok(Shell::PowerShell),
        "zsh" => Ok(Shell::Zsh),
        _ => Err(BundlerError::UnsupportedShell {
            shell: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_shells() {
        for (name, expected) in [
            ("bash", Shell::Bash),
            ("BASH", Shell::Bash),
            ("elvish", Shell::Elvish),
            ("fish", Shell::Fish),
            ("powershell", Shell::PowerShell),
            ("pwsh", Shell::PowerShell),
            ("Zsh", Shell::Zsh),
        ] {
            assert_eq!(parse_shell(name).ok(), Some(expected), "shell {name}");
        }
    }

    #[test]
    fn test_parse_unknown_shell() {
        assert!(matches!(
            parse_shell("tcsh"),
            Err(BundlerError::UnsupportedShell { shell }) if shell == "tcsh"
        ));
    }

    #[test]
    fn test_completions_run() {
        let args = CompletionsArgs {
            shell: "fish".to_string(),
        };
        assert!(run(args).is_ok());
    }
}
