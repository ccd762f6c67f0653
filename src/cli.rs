use clap::{value_parser, Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("distreport")
        .version("0.1.0")
        .about("Histogram reports of a per-record distance column")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .global(true),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input table (.csv, .tsv, optionally .gz)")
                .global(true),
        )
        .arg(
            Arg::new("column")
                .long("column")
                .help("Name of the column to plot")
                .global(true),
        )
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(value_parser!(usize))
                .help("Number of leading rows to use")
                .global(true),
        )
        .arg(
            Arg::new("bins")
                .long("bins")
                .value_parser(value_parser!(usize))
                .help("Number of histogram bins")
                .global(true),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Fail if the table has fewer rows than requested")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More logging (-v debug, -vv trace)")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Only log errors")
                .global(true),
        )
        .subcommand(
            Command::new("render")
                .about("Write the vector, raster and annotated raster histograms.")
                .arg(
                    Arg::new("output-dir")
                        .short('o')
                        .long("output-dir")
                        .value_name("DIR")
                        .help("Output directory"),
                )
                .arg(
                    Arg::new("no-annotate")
                        .long("no-annotate")
                        .action(ArgAction::SetTrue)
                        .help("Skip the variant with per-bar counts"),
                ),
        )
        .subcommand(Command::new("bins").about("Print the histogram bins to stdout."))
        .subcommand(
            Command::new("default-config").about("Print the built-in configuration as TOML."),
        )
}
