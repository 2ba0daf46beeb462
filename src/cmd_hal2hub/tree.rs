use clap::*;
use hal2hub::libs::hal;
use hal2hub::libs::phylo::Tree;
use hal2hub::libs::tools;
use std::io::{Read, Write};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("tree")
        .about("Prints the phylogeny of a HAL file")
        .after_help(
            r###"
<infile> is a HAL file (*.hal) or a newick file.

Output format:
    <newick>
    binary  true|false
    leaves  <leaf names, left to right, comma separated>

Snake tracks follow the leaf order; the parent and children of a genome are
its neighbors, shown by default.

Examples:
1. hal2hub tree aln.hal
2. hal2hub tree species.nwk

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("HAL or newick file"),
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
    let infile = args.get_one::<String>("infile").unwrap();
    let mut writer = hal2hub::writer(args.get_one::<String>("outfile").unwrap())?;

    let newick = if infile.ends_with(".hal") {
        tools::require(&["halStats"])?;
        hal::tree(infile)?
    } else {
        let mut text = String::new();
        hal2hub::reader(infile)?.read_to_string(&mut text)?;
        text.trim().to_string()
    };
    if newick.is_empty() {
        anyhow::bail!("No tree in {}", infile);
    }

    let tree = Tree::from_newick(&newick)?;
    writer.write_fmt(format_args!("{}\n", tree.to_newick()))?;
    writer.write_fmt(format_args!("binary\t{}\n", tree.is_binary()))?;
    writer.write_fmt(format_args!("leaves\t{}\n", tree.get_leaf_names().join(",")))?;
    writer.flush()?;

    Ok(())
}
