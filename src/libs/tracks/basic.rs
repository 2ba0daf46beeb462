//! Per-genome sequence files: `<genome>.2bit` and `chrom.sizes`.

use anyhow::Context;
use cmd_lib::*;
use std::path::Path;

/// `genome.chr1` => `chr1`; names without a `.` are kept.
///
/// ```
/// use hal2hub::libs::tracks::basic::ucsc_name;
///
/// assert_eq!(ucsc_name("human.chr1"), "chr1");
/// assert_eq!(ucsc_name("chr1"), "chr1");
/// ```
pub fn ucsc_name(name: &str) -> &str {
    let mut parts = name.split('.');
    match (parts.next(), parts.next()) {
        (Some(_), Some(second)) => second,
        _ => name,
    }
}

/// Rewrites FASTA headers with `ucsc_name`, dropping any description.
pub fn rename_fasta_headers(infile: &str, outfile: &str) -> anyhow::Result<()> {
    let reader = crate::reader(infile)?;
    let mut fa_in = noodles_fasta::io::Reader::new(reader);

    let writer = crate::writer(outfile)?;
    let mut fa_out = noodles_fasta::io::writer::Builder::default()
        .set_line_base_count(usize::MAX)
        .build_from_writer(writer);

    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        let definition =
            noodles_fasta::record::Definition::new(ucsc_name(&name).to_string(), None);
        let renamed = noodles_fasta::Record::new(definition, record.sequence().clone());
        fa_out.write_record(&renamed)?;
    }

    Ok(())
}

/// Extracts the genome from the HAL file and packs it into `<genomedir>/<genome>.2bit`.
pub fn make_twobit(hal: &str, genome: &str, genomedir: &Path, ucsc_names: bool) -> anyhow::Result<()> {
    let fa = genomedir.join(format!("{}.fa", genome)).display().to_string();
    let twobit = genomedir.join(format!("{}.2bit", genome)).display().to_string();

    run_cmd!(hal2fasta --outFaPath $fa $hal $genome)
        .with_context(|| format!("hal2fasta {} {}", hal, genome))?;

    let packed = if ucsc_names {
        let renamed = format!("{}2", fa);
        rename_fasta_headers(&fa, &renamed)?;
        std::fs::remove_file(&fa)?;
        renamed
    } else {
        fa
    };

    run_cmd!(faToTwoBit $packed $twobit).with_context(|| format!("faToTwoBit {}", packed))?;
    std::fs::remove_file(&packed)?;

    Ok(())
}

/// Uses `<twobit_dir>/<genome>.2bit` instead of extracting the sequence.
pub fn link_twobit(genome: &str, twobit_dir: &str, genomedir: &Path) -> anyhow::Result<()> {
    let name = format!("{}.2bit", genome);
    let source = Path::new(twobit_dir).join(&name);
    if !source.exists() {
        anyhow::bail!("2bit file {} does not exist", source.display());
    }
    crate::symlink_abs(&source, &genomedir.join(&name))
}
