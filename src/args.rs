//! This module defines the command line arguments the server accepts.

use std::path::PathBuf;
use termcolor::ColorChoice;


#[derive(Debug, clap::Parser)]
#[clap(about = "In-memory GraphQL API for books and their authors.")]
pub(crate) struct Args {
    /// Whether to use colors and other ANSI codes in output. Possible values:
    /// 'always', 'auto' and 'never'. Applies to stdout, stderr and the log file.
    #[clap(long, global = true, default_value = "auto", value_parser = parse_color_choice)]
    pub(crate) color: ColorChoice,

    #[clap(subcommand)]
    pub(crate) cmd: Command,
}

#[derive(Debug, clap::Subcommand)]
pub(crate) enum Command {
    /// Starts the HTTP server serving the GraphQL API.
    Serve {
        #[clap(flatten)]
        shared: Shared,
    },

    /// Checks the configuration and the environment for problems.
    ///
    /// Exits with 0 if everything is Ok, and with 1 otherwise.
    Check {
        #[clap(flatten)]
        shared: Shared,
    },

    /// Outputs a template for the configuration file (which includes
    /// descriptions or all options).
    WriteConfig {
        /// Target file. If not specified, the template is written to stdout.
        target: Option<PathBuf>,
    },

    /// Exports the API as GraphQL schema.
    ExportApiSchema {
        #[clap(flatten)]
        args: crate::cmd::export_api_schema::Args,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct Shared {
    /// Path to the configuration file. If this is not specified, the path in
    /// `BOOKSHELF_CONFIG_PATH` is used, then `config.toml` and
    /// `/etc/bookshelf/config.toml` are tried. Without any file, the defaults
    /// are used.
    #[clap(short, long)]
    pub(crate) config: Option<PathBuf>,
}

impl Args {
    pub(crate) fn stdout_color(&self) -> ColorChoice {
        resolve_auto(self.color, std::io::IsTerminal::is_terminal(&std::io::stdout()))
    }

    pub(crate) fn stderr_color(&self) -> ColorChoice {
        resolve_auto(self.color, std::io::IsTerminal::is_terminal(&std::io::stderr()))
    }
}

fn resolve_auto(choice: ColorChoice, is_terminal: bool) -> ColorChoice {
    match choice {
        ColorChoice::Auto if !is_terminal => ColorChoice::Never,
        other => other,
    }
}

fn parse_color_choice(s: &str) -> Result<ColorChoice, String> {
    match s {
        "always" => Ok(ColorChoice::Always),
        "auto" => Ok(ColorChoice::Auto),
        "never" => Ok(ColorChoice::Never),
        other => Err(format!("invalid color choice '{other}' (expected 'always', 'auto' or 'never')")),
    }
}
