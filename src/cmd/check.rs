//! A subcommand making sure the configuration and environment are usable,
//! without actually starting the server.

use std::net::SocketAddr;

use crate::{
    args::{self, Args},
    load_config_and_init_logger,
    config::Config,
    prelude::*,
    api,
    store::Store,
};


pub(crate) async fn run(shared: &args::Shared, args: &Args) -> Result<()> {
    let config = load_config_and_init_logger(shared, args, "check")
        .context("failed to load config: cannot proceed with `check` command")?;

    info!("Starting to verify various things...");
    let log_file = check_log_file(&config);
    let bind = check_bind(&config).await;
    let store = check_store(&config);
    let schema = check_schema();
    info!("Done verifying various things");


    // Print summary after all log output
    let mut any_errors = false;
    println!();
    bunt::println!("{$bold+blue+intense}Summary{/$}");
    println!();
    print_outcome(&mut any_errors, "Load configuration", &Ok(()));
    print_outcome(&mut any_errors, "Log file writable", &log_file);
    print_outcome(&mut any_errors, "Bind HTTP address", &bind);
    print_outcome(&mut any_errors, "Set up store", &store);
    print_outcome(&mut any_errors, "Build GraphQL schema", &schema);

    println!();
    if any_errors {
        bunt::println!("{$red+intense}➡  Errors have occured!{/$}");
        std::process::exit(1);
    } else {
        bunt::println!("{$green+intense}⮕  Everything OK{/$}");
        Ok(())
    }
}

fn print_outcome<T>(any_errors: &mut bool, label: &str, result: &Result<T>) {
    match result {
        Ok(_) => {
            bunt::println!(" ▸ {[bold+intense]}  {$green+bold}✔ ok{/$}", label);
        }
        Err(e) => {
            *any_errors = true;
            bunt::println!(" ▸ {[bold+intense]}  {$red+bold}✘ error{/$}", label);
            bunt::println!("      {$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
            if e.chain().len() > 1 {
                println!();
                bunt::println!("      {$red+italic}Caused by:{/$}");
            }

            for (i, cause) in e.chain().skip(1).enumerate() {
                print!("       {: >1$}", "", i * 2);
                println!("‣ {cause}");
            }
            println!();
        }
    }
}

fn check_log_file(config: &Config) -> Result<()> {
    let Some(path) = &config.log.file else {
        return Ok(());
    };

    // The logger already opened the file for the `check` command, but the
    // server substitutes a different `${cmd}`.
    let path = path.to_str()
        .ok_or_else(|| anyhow!("log file path is not valid UTF-8"))?
        .replace("${cmd}", "serve");
    std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .with_context(|| format!("failed to open/create log file '{path}'"))?;

    Ok(())
}

async fn check_bind(config: &Config) -> Result<()> {
    let addr = SocketAddr::new(config.http.address, config.http.port);
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("failed to bind to {addr} (port already in use?)"))?;
    drop(listener);
    Ok(())
}

fn check_store(config: &Config) -> Result<()> {
    let store = Store::from_config(&config.store);
    debug!(
        books = store.books().len(),
        authors = store.authors().len(),
        "Created store",
    );
    Ok(())
}

fn check_schema() -> Result<()> {
    let sdl = api::root_node().as_sdl();
    for root in ["type Query", "type Mutation", "type Subscription"] {
        if !sdl.contains(root) {
            bail!("schema is missing '{root}'");
        }
    }
    debug!("GraphQL schema has {} lines", sdl.lines().count());
    Ok(())
}
