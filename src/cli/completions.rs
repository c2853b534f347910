use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    standalone completions --shell bash > ~/.bash_completion.d/standalone\n\n\
                  Generate zsh completions:\n    standalone completions --shell zsh > ~/.zfunc/_standalone\n\n\
                  Generate fish completions:\n    standalone completions --shell fish > ~/.config/fish/completions/standalone.fish")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    #[arg(long, short = 's')]
    pub shell: String,
}
