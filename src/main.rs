//! The bookshelf GraphQL server.

use clap::{FromArgMatches, CommandFactory};
use std::{env, sync::Arc};

use crate::{
    args::{Args, Command},
    config::Config,
    prelude::*,
    store::Store,
};

mod api;
mod args;
mod cmd;
mod config;
mod events;
mod http;
mod logger;
mod prelude;
mod store;
mod version;


#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;


#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Also goes to the log file, if any.
        error!("{e:?}");
        print_error(&e);
        std::process::exit(1);
    }
}

/// Prints the error and its causes, one per line, to stderr.
fn print_error(e: &anyhow::Error) {
    eprintln!();
    bunt::eprintln!("{$red+bold}error:{/$} {[yellow+intense]}", e);
    for (depth, cause) in e.chain().skip(1).enumerate() {
        bunt::eprintln!("{}{$dimmed}caused by:{/$} {}", "  ".repeat(depth + 1), cause);
    }
}

/// Main entry point.
async fn run() -> Result<()> {
    // Backtraces are disabled by default, but panics are rare and the
    // backtrace is almost always what you want then.
    if env::var("RUST_BACKTRACE") == Err(env::VarError::NotPresent) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    // The version is assembled at runtime, so we can't use the derive
    // attribute for it.
    let args = Args::from_arg_matches(
        &Args::command()
            .version(version::full())
            .get_matches(),
    )?;

    bunt::set_stdout_color_choice(args.stdout_color());
    bunt::set_stderr_color_choice(args.stderr_color());


    match &args.cmd {
        Command::Serve { shared } => {
            let config = load_config_and_init_logger(shared, &args, "serve")?;
            start_server(config).await?;
        }
        Command::Check { shared } => cmd::check::run(shared, &args).await?,
        Command::WriteConfig { target } => config::write_template(target.as_ref())?,
        Command::ExportApiSchema { args } => cmd::export_api_schema::run(args)?,
    }

    Ok(())
}

async fn start_server(config: Config) -> Result<()> {
    info!("Starting bookshelf {} ...", version::identifier());
    trace!("Configuration: {:#?}", config);

    let store = Arc::new(Store::from_config(&config.store));
    debug!(
        books = store.books().len(),
        authors = store.authors().len(),
        "Initialized in-memory store",
    );

    let root_node = api::root_node();
    http::serve(config, root_node, store).await
        .context("failed to start HTTP server")?;

    Ok(())
}


fn load_config_and_init_logger(shared: &args::Shared, args: &Args, cmd: &str) -> Result<Config> {
    let (config, path) = match &shared.config {
        Some(path) => {
            let config = Config::load_from(path)
                .context(format!("failed to load config from '{}'", path.display()))?;
            (config, Some(path.clone()))
        }
        None => Config::from_env_or_default_locations()?,
    };

    // We can only do this after reading the config.
    logger::init(&config.log, args, cmd)?;
    match path {
        Some(path) => info!("Loaded config from '{}'", path.display()),
        None => info!("No config file found, using default configuration"),
    }

    Ok(config)
}
