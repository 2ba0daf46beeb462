//! Queries against a HAL file through `halStats`.

use anyhow::Context;
use cmd_lib::*;
use indexmap::IndexMap;
use std::io::Write;
use std::path::Path;

/// sequence name => length, in the order halStats reports them
pub type SeqLens = IndexMap<String, u64>;

/// genome name => sequence table
pub type Genome2Seqs = IndexMap<String, SeqLens>;

/// All genomes of the alignment, in HAL order.
pub fn genomes(hal: &str) -> anyhow::Result<Vec<String>> {
    let out = run_fun!(halStats --genomes $hal)
        .with_context(|| format!("halStats --genomes {}", hal))?;
    Ok(parse_genomes(&out))
}

/// ```
/// let genomes = hal2hub::libs::hal::parse_genomes("Anc0 human chimp\n");
/// assert_eq!(genomes, vec!["Anc0", "human", "chimp"]);
/// ```
pub fn parse_genomes(text: &str) -> Vec<String> {
    text.lines()
        .next()
        .map(|line| line.split_whitespace().map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

/// Sequence lengths of one genome.
pub fn sequence_stats(hal: &str, genome: &str) -> anyhow::Result<SeqLens> {
    let out = run_fun!(halStats --sequenceStats $genome $hal)
        .with_context(|| format!("halStats --sequenceStats {} {}", genome, hal))?;
    parse_sequence_stats(&out)
}

/// Parses `halStats --sequenceStats` output.
///
/// The header line and blank lines are skipped. Sequence names lose any
/// `genome.` prefix: only the part after the last `.` is kept.
pub fn parse_sequence_stats(text: &str) -> anyhow::Result<SeqLens> {
    let mut seqs = SeqLens::new();

    for line in text.lines() {
        if line.len() < 2 || line.contains("SequenceName") {
            continue;
        }
        let fields: Vec<&str> = line.trim().split(", ").collect();
        if fields.len() < 2 {
            anyhow::bail!("Malformed sequence stats line: {}", line);
        }
        let name = fields[0].rsplit('.').next().unwrap_or(fields[0]);
        let len: u64 = fields[1]
            .trim()
            .parse()
            .with_context(|| format!("Bad length in sequence stats line: {}", line))?;
        seqs.insert(name.to_string(), len);
    }

    Ok(seqs)
}

/// Sequence tables of `genomes`. Genomes without sequences get no browser.
pub fn genome_sequences(hal: &str, genomes: &[String]) -> anyhow::Result<Genome2Seqs> {
    let mut genome2seqs = Genome2Seqs::new();
    for genome in genomes {
        let seqs = sequence_stats(hal, genome)?;
        if seqs.is_empty() {
            log::warn!(
                "genome {} contains 0 sequence - no browser was made.",
                genome
            );
        } else {
            genome2seqs.insert(genome.to_string(), seqs);
        }
    }
    Ok(genome2seqs)
}

pub fn chrom_sizes_from_hal(hal: &str, genome: &str, outfile: &Path) -> anyhow::Result<()> {
    let outfile = outfile.display().to_string();
    run_cmd!(halStats --chromSizes $genome $hal > $outfile)
        .with_context(|| format!("halStats --chromSizes {} {}", genome, hal))?;
    Ok(())
}

/// `name\tlength` for every non-empty sequence
pub fn write_chrom_sizes(seqs: &SeqLens, outfile: &Path) -> anyhow::Result<()> {
    let mut writer = crate::writer(&outfile.display().to_string())?;
    for (name, len) in seqs.iter().filter(|(_, len)| **len > 0) {
        writer.write_fmt(format_args!("{}\t{}\n", name, len))?;
    }
    writer.flush()?;
    Ok(())
}

/// The phylogeny stored in the HAL file, as newick text.
pub fn tree(hal: &str) -> anyhow::Result<String> {
    let out = run_fun!(halStats --tree $hal).with_context(|| format!("halStats --tree {}", hal))?;
    Ok(out.trim().to_string())
}

/// Longest sequence; the first one listed wins a tie.
///
/// ```
/// use hal2hub::libs::hal::{longest_seq, SeqLens};
///
/// let mut seqs = SeqLens::new();
/// seqs.insert("chr2".to_string(), 500);
/// seqs.insert("chr1".to_string(), 900);
/// seqs.insert("chrX".to_string(), 900);
/// assert_eq!(longest_seq(&seqs), Some(("chr1", 900)));
/// ```
pub fn longest_seq(seqs: &SeqLens) -> Option<(&str, u64)> {
    let mut best: Option<(&str, u64)> = None;
    for (name, &len) in seqs {
        match best {
            Some((_, l)) if l >= len => {}
            _ => best = Some((name.as_str(), len)),
        }
    }
    best
}
