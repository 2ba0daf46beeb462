use clap::*;
use hal2hub::libs::hub::{HubOptions, ProperNames};
use hal2hub::libs::pipeline;
use hal2hub::libs::tools;
use std::path::Path;

fn flag(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .action(ArgAction::SetTrue)
        .help(help)
}

fn value(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).num_args(1).help(help)
}

fn list(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .num_args(1)
        .value_delimiter(',')
        .action(ArgAction::Append)
        .help(help)
}

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("build")
        .about("Builds an assembly hub from a HAL alignment")
        .after_help(
            r###"
Every genome with sequences gets a browser: a 2bit file, chrom.sizes and a
trackDb.txt whose composite track shows the other genomes as snakes.

Annotation directories hold one subdirectory per source genome:
    genes/human/*.bed
    genes/chimp/*.bed
Each source is lifted over onto every genome of the hub. `--bbDirs` and
`--bwDirs` take directories already laid out as <src>/<tgt>.bb (or .bw).

Output layout:
    <outdir>/hub.txt, genomes.txt, groups.txt, haltree.nw
    <outdir>/<genome>/{<genome>.2bit,chrom.sizes,trackDb.txt,description.html}
    <outdir>/liftoverbeds/<annotation>/<src>/<tgt>.bb
    <outdir>/liftoverwigs/<annotation>/<src>/<tgt>.bw
    <outdir>/conservation/<genome>/<genome>_phyloP.bw

Lists (--genomes, --bedDirs, ...) are comma separated or given repeatedly.

Examples:
1. A bare hub:
   hal2hub build aln.hal hub/

2. With GC percent, lifted gene models and 8 threads:
   hal2hub build aln.hal hub/ --gcContent --bedDirs genes --maxThreads 8

3. Levels of detail for a large alignment:
   hal2hub build aln.hal hub/ --lod --lodMaxBlock 1000

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
            Arg::new("outdir")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Output directory of the hub"),
        )
        // hub
        .arg(flag("cpHalFileToOut", "Copy the HAL file into the hub instead of linking it"))
        .arg(flag("noUcscNames", "Keep `genome.chr` sequence names as they are"))
        .arg(value("hub", "Hub name. [default: the HAL file's stem]"))
        .arg(value("shortLabel", "Short label of the hub. [default: the hub name]"))
        .arg(value("longLabel", "Long label of the hub. [default: the hub name]"))
        .arg(value("email", "Contact email").default_value("NoEmail"))
        .arg(value("url", "Public URL of the hub, used in documentation links"))
        .arg(list("genomes", "Only these genomes get browsers"))
        .arg(value("tree", "Newick file used instead of the HAL phylogeny"))
        .arg(value("properName", "Display names, a `genome<TAB>name` file"))
        .arg(value("twobitDir", "Directory of <genome>.2bit files to link"))
        // annotations
        .arg(list("bedDirs", "Bed annotations, shown in the composite track"))
        .arg(list("bbDirs", "Precomputed bigBed annotations, composite"))
        .arg(list("bedDirs2", "Bed annotations, shown as standalone tracks"))
        .arg(list("bbDirs2", "Precomputed bigBed annotations, standalone"))
        .arg(list("wigDirs", "Wiggle annotations"))
        .arg(list("bwDirs", "Precomputed bigWig annotations"))
        .arg(flag("noBedLiftover", "Bed annotations stay on their own genome"))
        .arg(flag("noWigLiftover", "Wiggle annotations stay on their own genome"))
        .arg(flag("tabBed", "Bed fields are tab separated and may contain spaces"))
        .arg(value("rmskDir", "RepeatMasker bigBeds, <dir>/<genome>/<class>.bb"))
        .arg(flag("gcContent", "Add GC percent tracks"))
        .arg(flag("alignability", "Add alignability tracks"))
        // conservation
        .arg(value("conservation", "Bed regions to train the neutral model on"))
        .arg(value("conservationGenomeName", "Genome of the --conservation regions"))
        .arg(value("conservationTree", "A trained neutral model; training is skipped"))
        .arg(value("conservationDir", "Precomputed conservation tracks"))
        // clades
        .arg(flag("cladeExclusive", "Add tracks of regions exclusive to each clade"))
        .arg(
            value("maxOut", "Most genomes outside the clade a region may align to")
                .value_parser(value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            value("minIn", "Fewest other clade genomes a region must align to")
                .value_parser(value_parser!(u32))
                .default_value("1"),
        )
        // levels of detail
        .arg(flag("lod", "Compute levels of detail with halLodInterpolate.py"))
        .arg(value("lodTxtFile", "Precomputed lod.txt"))
        .arg(value("lodDir", "Directory of the HAL files listed in --lodTxtFile"))
        .arg(
            value("lodMaxBlock", "Most blocks per display window")
                .value_parser(value_parser!(usize))
                .default_value("500"),
        )
        .arg(
            value("lodScale", "Scale factor between levels")
                .value_parser(value_parser!(f64))
                .default_value("3.0"),
        )
        .arg(
            value("lodMinSeqFrac", "Minimum sequence length kept, as a fraction of the step")
                .value_parser(value_parser!(f64))
                .default_value("0.5"),
        )
        .arg(
            value("snpWidth", "Snps are drawn in windows smaller than this")
                .value_parser(value_parser!(u64)),
        )
        // execution
        .arg(
            value("maxThreads", "Number of threads")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            value("retryCount", "Retries of a failed job")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
}

fn strings(args: &ArgMatches, name: &str) -> Vec<String> {
    args.get_many::<String>(name)
        .map(|vals| vals.filter(|s| !s.is_empty()).cloned().collect())
        .unwrap_or_default()
}

fn string(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

fn check_dirs(dirs: &[String]) -> anyhow::Result<()> {
    for dir in dirs {
        if !Path::new(dir).is_dir() {
            anyhow::bail!("Directory {} does not exist", dir);
        }
    }
    Ok(())
}

fn check_file(file: &Option<String>) -> anyhow::Result<()> {
    if let Some(file) = file {
        if !Path::new(file).is_file() {
            anyhow::bail!("File {} does not exist", file);
        }
    }
    Ok(())
}

/// Options from the command line, checked.
pub fn hub_options(args: &ArgMatches) -> anyhow::Result<HubOptions> {
    let hal = args.get_one::<String>("hal").unwrap();

    let hub = match string(args, "hub") {
        Some(hub) => hub,
        None => Path::new(hal)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("Bad HAL path {}", hal))?,
    };
    let mut opts = HubOptions::new(&hub);

    if let Some(label) = string(args, "shortLabel") {
        opts.short_label = label;
    }
    if let Some(label) = string(args, "longLabel") {
        opts.long_label = label;
    }
    opts.email = args.get_one::<String>("email").unwrap().to_string();
    opts.url = string(args, "url");
    opts.cp_hal = args.get_flag("cpHalFileToOut");
    opts.ucsc_names = !args.get_flag("noUcscNames");

    opts.genomes = strings(args, "genomes");
    opts.tree = string(args, "tree");
    check_file(&opts.tree)?;
    if let Some(file) = string(args, "properName") {
        opts.proper_names = ProperNames::from_file(&file)?;
    }
    opts.twobit_dir = string(args, "twobitDir");

    opts.bed_dirs = strings(args, "bedDirs");
    opts.bb_dirs = strings(args, "bbDirs");
    opts.bed_dirs2 = strings(args, "bedDirs2");
    opts.bb_dirs2 = strings(args, "bbDirs2");
    opts.wig_dirs = strings(args, "wigDirs");
    opts.bw_dirs = strings(args, "bwDirs");
    opts.no_bed_liftover = args.get_flag("noBedLiftover");
    opts.no_wig_liftover = args.get_flag("noWigLiftover");
    opts.tab_bed = args.get_flag("tabBed");
    opts.rmsk_dir = string(args, "rmskDir");
    opts.gc_content = args.get_flag("gcContent");
    opts.alignability = args.get_flag("alignability");

    for dirs in [
        &opts.bed_dirs,
        &opts.bb_dirs,
        &opts.bed_dirs2,
        &opts.bb_dirs2,
        &opts.wig_dirs,
        &opts.bw_dirs,
    ] {
        check_dirs(dirs)?;
    }
    if let Some(dir) = &opts.twobit_dir {
        check_dirs(&[dir.to_string()])?;
    }
    if let Some(dir) = &opts.rmsk_dir {
        check_dirs(&[dir.to_string()])?;
    }

    opts.conservation = string(args, "conservation");
    opts.conservation_genome = string(args, "conservationGenomeName");
    opts.conservation_tree = string(args, "conservationTree");
    opts.conservation_dir = string(args, "conservationDir");
    check_file(&opts.conservation)?;
    check_file(&opts.conservation_tree)?;
    if let Some(dir) = &opts.conservation_dir {
        check_dirs(&[dir.to_string()])?;
    } else if opts.conservation.is_some()
        && opts.conservation_tree.is_none()
        && opts.conservation_genome.is_none()
    {
        anyhow::bail!("--conservation requires --conservationGenomeName");
    }

    opts.clade_exclusive = args.get_flag("cladeExclusive");
    opts.max_out = *args.get_one::<u32>("maxOut").unwrap();
    opts.min_in = *args.get_one::<u32>("minIn").unwrap();

    opts.lod = args.get_flag("lod");
    opts.lod_txt_file = string(args, "lodTxtFile");
    opts.lod_dir = string(args, "lodDir");
    check_file(&opts.lod_txt_file)?;
    if let Some(dir) = &opts.lod_dir {
        check_dirs(&[dir.to_string()])?;
    }
    opts.lod_max_block = *args.get_one::<usize>("lodMaxBlock").unwrap();
    opts.lod_scale = *args.get_one::<f64>("lodScale").unwrap();
    opts.lod_min_seq_frac = *args.get_one::<f64>("lodMinSeqFrac").unwrap();
    opts.snp_width = args.get_one::<u64>("snpWidth").copied();

    opts.threads = *args.get_one::<usize>("maxThreads").unwrap();
    opts.retry_count = *args.get_one::<usize>("retryCount").unwrap();

    Ok(opts)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let hal = args.get_one::<String>("hal").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();

    if !Path::new(hal).is_file() {
        anyhow::bail!("HAL file {} does not exist", hal);
    }
    let outdir = Path::new(outdir);
    if outdir.exists() && !outdir.is_dir() {
        anyhow::bail!("{} exists and is not a directory", outdir.display());
    }
    std::fs::create_dir_all(outdir)?;

    let opts = hub_options(args)?;
    tools::require(&opts.required_tools())?;

    //----------------------------
    // Operating
    //----------------------------
    log::info!("==> Building hub {} in {}", opts.hub, outdir.display());
    pipeline::build_hub(hal, outdir, opts)?;

    Ok(())
}
