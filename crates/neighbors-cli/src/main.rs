// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use neighbors_app::{NeighborTable, PageState, Persistence};
use neighbors_http::{Client, HttpPersistence};
use runtime::DemoPersistence;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `neighbors --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    logging::init(&config)?;
    tracing::info!(
        config = %options.config_path.display(),
        demo = options.demo,
        "starting"
    );

    let (mut table, mut persistence) = if options.demo {
        let table = NeighborTable::from_rows(&neighbors_testkit::demo_listing())
            .context("build demo listing")?;
        let persistence: Box<dyn Persistence> = Box::new(DemoPersistence::default());
        (table, persistence)
    } else {
        let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
        let table = runtime::fetch_table(&client)?;
        let persistence: Box<dyn Persistence> = Box::new(HttpPersistence::new(client));
        (table, persistence)
    };

    if options.check_only {
        println!("ok: {} neighbors", table.len());
        return Ok(());
    }

    let mut page = PageState {
        show_ignored: config.show_ignored(),
        ..PageState::default()
    };
    neighbors_tui::run_app(&mut page, &mut table, persistence.as_mut())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("neighbors: review unrecognized CDP/LLDP neighbors");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch against seeded rows and an in-process backend");
    println!("  --check                  Validate config and fetch the listing, then exit");
    println!("  --help                   Show this help");
}
