use std::{fs, io::{self, Write}, path::PathBuf};

use crate::{api, prelude::*};


#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Target file. If not specified, the schema is written to stdout.
    target: Option<PathBuf>,
}

pub(crate) fn run(args: &Args) -> Result<()> {
    let schema = api::root_node().as_sdl();
    match &args.target {
        Some(path) => fs::write(path, schema)
            .with_context(|| format!("failed to write schema to '{}'", path.display()))?,
        None => io::stdout().write_all(schema.as_bytes())?,
    }

    Ok(())
}
