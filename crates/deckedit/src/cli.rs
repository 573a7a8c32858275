use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckedit")]
#[command(author, version, about)]
#[command(long_about = "A slide presentation editor with undo history and live collaboration.\n\n\
    Decks are stored as JSON. Slides start from templates and can be filled\n\
    with text generated by an AI provider.\n\n\
    Examples:\n  \
    deckedit deck.json                        Open the editor window\n  \
    deckedit deck.json --server ws://host:8080 --session team\n  \
    deckedit new deck.json                    Create a deck with a title slide\n  \
    deckedit shell deck.json                  Edit from the terminal\n  \
    deckedit render deck.json -o slides       Export every slide as PNG")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Deck file to open in the editor window
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub collab: CollabArgs,

    /// Open on a specific slide (1-indexed)
    #[arg(long, global = false)]
    pub slide: Option<usize>,

    /// Increase output verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Options for joining a shared editing session.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct CollabArgs {
    /// Collaboration server URL (ws:// or wss://); overrides the config
    #[arg(long)]
    pub server: Option<String>,

    /// Session to join; a new one is created when omitted
    #[arg(long)]
    pub session: Option<String>,

    /// Edit offline even if a server is configured
    #[arg(long, conflicts_with_all = ["server", "session"])]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new deck
    New {
        /// Deck file to create
        file: PathBuf,

        /// Template for the first slide
        #[arg(short, long)]
        template: Option<String>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Edit a deck interactively in the terminal
    Shell {
        /// Deck file to edit (created if missing)
        file: PathBuf,

        #[command(flatten)]
        collab: CollabArgs,
    },

    /// Render slides as PNG images
    Render {
        /// Deck file to render
        file: PathBuf,

        /// Output directory for PNG files
        #[arg(short, long, default_value = "export")]
        output_dir: PathBuf,

        /// Image width in pixels (defaults to the configured canvas width)
        #[arg(long)]
        width: Option<u32>,

        /// Image height in pixels (defaults to the configured canvas height)
        #[arg(long)]
        height: Option<u32>,
    },

    /// Generate slide text with the configured AI provider
    Generate {
        /// Deck file to update
        file: PathBuf,

        /// What the slide should contain
        #[arg(short, long)]
        prompt: String,

        /// Slide to add the text to (1-indexed, defaults to the first)
        #[arg(long)]
        slide: Option<usize>,

        /// Start a new slide from this template and put the text there
        #[arg(long, conflicts_with = "slide")]
        new_slide: Option<String>,

        /// Context passed to the provider instead of the slide's text
        #[arg(long)]
        context: Option<String>,
    },

    /// List available slide templates
    Templates,

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.template, ai.provider, collaboration.server)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self, runtime: &tokio::runtime::Runtime) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::New {
                file,
                template,
                force,
            }) => crate::commands::new::run(&file, template.as_deref(), force),
            Some(Commands::Shell { file, collab }) => {
                crate::commands::shell::run(&file, &collab, runtime)
            }
            Some(Commands::Render {
                file,
                output_dir,
                width,
                height,
            }) => {
                if !file.exists() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                crate::commands::render::run(&file, &output_dir, width, height, runtime)
            }
            Some(Commands::Generate {
                file,
                prompt,
                slide,
                new_slide,
                context,
            }) => {
                if !file.exists() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                let target = match new_slide {
                    Some(template) => crate::commands::generate::Target::NewSlide(template),
                    None => crate::commands::generate::Target::Slide(
                        slide.unwrap_or(1).saturating_sub(1),
                    ),
                };
                crate::commands::generate::run(&file, &prompt, target, context.as_deref(), runtime)
            }
            Some(Commands::Templates) => crate::commands::templates::run(),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("deckedit {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => {
                if let Some(file) = self.file {
                    crate::app::run(file, &self.collab, self.slide)
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}
