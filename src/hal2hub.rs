extern crate clap;
use clap::*;
use simple_logger::SimpleLogger;

mod cmd_hal2hub;

fn main() -> anyhow::Result<()> {
    let app = Command::new("hal2hub")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`hal2hub` - Assembly hubs from HAL alignments")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .num_args(1)
                .value_parser(["DEBUG", "INFO", "WARN"])
                .default_value("INFO")
                .help("Log level"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Same as --log DEBUG"),
        )
        .subcommand(cmd_hal2hub::build::make_subcommand())
        .subcommand(cmd_hal2hub::genomes::make_subcommand())
        .subcommand(cmd_hal2hub::tree::make_subcommand())
        .after_help(
            r###"Subcommands:

* build   - Write a UCSC assembly hub for every genome of a HAL file
* genomes - Genomes of a HAL file with their sequence counts and sizes
* tree    - The phylogeny of a HAL file (or a newick file)

External tools from the HAL and UCSC Kent packages are called as needed:
halStats, hal2fasta, faToTwoBit, bedToBigBed, wigToBigWig, ...

"###,
        );

    let matches = app.get_matches();

    let log_level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        match matches.get_one::<String>("log").map(|s| s.as_str()) {
            Some("DEBUG") => log::LevelFilter::Debug,
            Some("WARN") => log::LevelFilter::Warn,
            _ => log::LevelFilter::Info,
        }
    };
    SimpleLogger::new().with_level(log_level).init()?;
    // cmd_lib logs its command lines only when asked to
    cmd_lib::set_debug(log_level == log::LevelFilter::Debug);

    match matches.subcommand() {
        Some(("build", sub_matches)) => cmd_hal2hub::build::execute(sub_matches),
        Some(("genomes", sub_matches)) => cmd_hal2hub::genomes::execute(sub_matches),
        Some(("tree", sub_matches)) => cmd_hal2hub::tree::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
