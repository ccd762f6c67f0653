mod cli;

use anyhow::{Context, Result};
use distance_report::histogram::print_histogram;
use distance_report::{compute_histogram, generate_report, ReportConfig};
use env_logger::Env;
use log::LevelFilter;
use std::io::Write;
use std::path::{Path, PathBuf};

fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(LevelFilter::Error);
    } else if verbose > 0 {
        builder.filter_level(match verbose {
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
    }

    builder
        .format(|buf, record| {
            writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args())
        })
        .init();
}

// Built-in defaults, then the config file, then command line flags.
fn resolve_config(matches: &clap::ArgMatches) -> Result<ReportConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ReportConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config file {}", path))?,
        None => ReportConfig::default(),
    };

    if let Some(input) = matches.get_one::<String>("input") {
        config.input.path = PathBuf::from(input);
    }
    if let Some(column) = matches.get_one::<String>("column") {
        config.input.column = column.clone();
    }
    if let Some(rows) = matches.get_one::<usize>("rows") {
        config.input.row_limit = *rows;
    }
    if let Some(bins) = matches.get_one::<usize>("bins") {
        config.histogram.bins = *bins;
    }
    if matches.get_flag("strict") {
        config.input.strict_row_limit = true;
    }

    if let Some(("render", sub_matches)) = matches.subcommand() {
        if let Some(dir) = sub_matches.get_one::<String>("output-dir") {
            config.output.dir = PathBuf::from(dir);
        }
        if sub_matches.get_flag("no-annotate") {
            config.annotations.enabled = false;
        }
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    init_logging(matches.get_count("verbose"), matches.get_flag("quiet"));

    // Printed before any config file is read
    if let Some(("default-config", _)) = matches.subcommand() {
        print!("{}", ReportConfig::default().to_toml_string()?);
        return Ok(());
    }

    let config = resolve_config(&matches)?;

    match matches.subcommand() {
        Some(("render", _)) => {
            let written = generate_report(&config).with_context(|| {
                format!("Failed to generate report from {}", config.input.path.display())
            })?;
            for file in written {
                println!("{}  {}", file.sha256, file.path.display());
            }
        }
        Some(("bins", _)) => {
            let report = compute_histogram(&config).with_context(|| {
                format!("Failed to compute histogram from {}", config.input.path.display())
            })?;
            let mut out = std::io::stdout().lock();
            print_histogram(&mut out, &report.histogram, 40)?;
        }
        _ => {}
    };

    Ok(())
}
