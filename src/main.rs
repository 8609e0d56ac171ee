use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::SystemTime;

use fsprep::{
    read, write, FileDescriptor, FileStream, GlobOptions, ReadOptions, Timestamp, WriteOptions,
};

mod cli_bin;

use cli_bin::args::{Cli, Commands, GlobArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Read(args) => {
            let files = open(&args.glob)?;
            print_all(files).await?;
        }
        Commands::Plan(args) => {
            let files = open(&args.glob)?;
            let mut options = WriteOptions::default().with_overwrite(!args.no_overwrite);
            if let Some(cwd) = args.out_cwd {
                options = options.with_cwd(cwd);
            }
            if let Some(mode) = args.mode {
                options = options.with_mode(mode);
            }
            let writer = write(args.out, options).context("invalid output folder")?;
            print_all(writer.pipe(files)).await?;
        }
    }

    Ok(())
}

fn open(args: &GlobArgs) -> Result<FileStream> {
    let mut glob = GlobOptions::default()
        .with_dot(args.dot)
        .with_allow_empty(args.allow_empty);
    if let Some(cwd) = &args.cwd {
        glob = glob.with_cwd(cwd);
    }
    if let Some(base) = &args.base {
        glob = glob.with_base(base);
    }

    let mut options = ReadOptions::default()
        .with_glob(glob)
        .with_resolve_symlinks(!args.no_resolve_symlinks)
        .with_high_water_mark(args.high_water_mark);
    if let Some(since) = &args.since {
        options = options.with_since(parse_since(since));
    }

    read(args.globs.clone(), options).context("invalid glob arguments")
}

fn parse_since(value: &str) -> Timestamp {
    match value.parse::<i64>() {
        Ok(millis) => Timestamp::Millis(millis),
        Err(_) => Timestamp::Text(value.to_string()),
    }
}

async fn print_all(mut files: FileStream) -> Result<()> {
    while let Some(file) = files.next().await {
        let file = file.context("pipeline failed")?;
        println!("{}", serde_json::to_string(&describe(&file))?);
    }
    Ok(())
}

fn describe(file: &FileDescriptor) -> Value {
    let stat = file.stat.as_ref().map(|stat| {
        json!({
            "kind": stat.kind,
            "mode": stat.mode.map(|mode| format!("{mode:o}")),
            "size": stat.size,
            "mtime": stat.mtime.map(rfc3339),
        })
    });
    json!({
        "path": file.path,
        "base": file.base,
        "cwd": file.cwd,
        "relative": file.relative().ok(),
        "flag": file.flag.map(|flag| flag.as_str()),
        "stat": stat,
    })
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
