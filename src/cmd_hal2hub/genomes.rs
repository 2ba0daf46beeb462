use clap::*;
use hal2hub::libs::hal;
use hal2hub::libs::tools;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("genomes")
        .about("Lists the genomes of a HAL file")
        .after_help(
            r###"
Output format (TSV):
    genome  sequences  length

Genomes with 0 sequences (usually ancestors of a partial alignment) are
listed with zero counts; `build` makes no browser for them.

Examples:
1. hal2hub genomes aln.hal
2. hal2hub genomes aln.hal -o genomes.tsv

"###,
        )
        .arg(
            Arg::new("hal")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input HAL file"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let hal = args.get_one::<String>("hal").unwrap();
    let mut writer = hal2hub::writer(args.get_one::<String>("outfile").unwrap())?;

    tools::require(&["halStats"])?;

    for genome in hal::genomes(hal)? {
        let seqs = hal::sequence_stats(hal, &genome)?;
        let length: u64 = seqs.values().sum();
        writer.write_fmt(format_args!("{}\t{}\t{}\n", genome, seqs.len(), length))?;
    }
    writer.flush()?;

    Ok(())
}
