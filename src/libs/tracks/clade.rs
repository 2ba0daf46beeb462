//! Regions present in every genome of a clade and absent outside it.
//!
//! For each member genome, `halAlignmentDepth` counts how many other members
//! (and how many outsiders) align to each base. Bases with at least `min_in`
//! members and at most `max_out` outsiders end up in
//! `<outdir>/liftoverbeds/CladeExclusive/<clade>/<genome>.bb`.

use crate::libs::jobs::{Job, JobContext};
use crate::libs::pipeline::Hub;
use crate::libs::tools;
use crate::libs::tracks::annotation::CLADE_EXCLUSIVE;
use crate::libs::tracks::basic::ucsc_name;
use intspan::IntSpan;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::NamedTempFile;

lazy_static! {
    static ref RE_WIG_FIELD: Regex = Regex::new(r"(\w+)=(\S+)").unwrap();
}

/// Sequence name => covered 1-based positions
pub type Coverage = BTreeMap<String, IntSpan>;

/// One job per clade of the tree with at least two hub genomes and at least
/// one hub genome outside it.
pub fn clade_jobs(hub: &Arc<Hub>) -> Vec<CladeExclusive> {
    let tree = match &hub.tree {
        Some(tree) => tree,
        None => return Vec::new(),
    };
    let root_name = tree
        .get_root()
        .and_then(|r| tree.get_node(r))
        .and_then(|n| n.name.clone());
    let leaves: Vec<String> = hub
        .leaves
        .iter()
        .filter(|g| hub.seqs.contains_key(*g))
        .cloned()
        .collect();

    let mut jobs = vec![];
    for (clade, under) in tree.clades() {
        if Some(&clade) == root_name.as_ref() {
            continue;
        }
        let members: Vec<String> = leaves.iter().filter(|g| under.contains(g)).cloned().collect();
        let outside: Vec<String> = leaves.iter().filter(|g| !under.contains(g)).cloned().collect();
        if members.len() < 2 || outside.is_empty() {
            continue;
        }
        jobs.push(CladeExclusive {
            hub: hub.clone(),
            clade,
            members,
            outside,
        });
    }
    jobs
}

pub struct CladeExclusive {
    pub hub: Arc<Hub>,
    pub clade: String,
    pub members: Vec<String>,
    pub outside: Vec<String>,
}

impl Job for CladeExclusive {
    fn name(&self) -> String {
        format!("CladeExclusive[{}]", self.clade)
    }

    fn run(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let dir = self
            .hub
            .outdir
            .join("liftoverbeds")
            .join(CLADE_EXCLUSIVE)
            .join(&self.clade);
        std::fs::create_dir_all(&dir)?;

        for genome in &self.members {
            let inside: Vec<String> = self
                .members
                .iter()
                .filter(|g| *g != genome)
                .cloned()
                .collect();
            ctx.add_child(CladeGenome {
                hub: self.hub.clone(),
                dir: dir.clone(),
                genome: genome.clone(),
                inside,
                outside: self.outside.clone(),
            });
        }
        Ok(())
    }
}

struct CladeGenome {
    hub: Arc<Hub>,
    dir: PathBuf,
    genome: String,
    inside: Vec<String>,
    outside: Vec<String>,
}

impl CladeGenome {
    // Removed when the returned handle is dropped
    fn depth(&self, targets: &[String], suffix: &str) -> anyhow::Result<NamedTempFile> {
        let wig = tempfile::Builder::new()
            .prefix(&format!("{}.{}.", self.genome, suffix))
            .suffix(".wig")
            .tempfile_in(&self.dir)?;
        let args = vec![
            self.hub.hal.clone(),
            self.genome.clone(),
            "--targetGenomes".to_string(),
            targets.join(","),
            "--noAncestors".to_string(),
        ];
        tools::run_to_file("halAlignmentDepth", &args, wig.path())?;
        Ok(wig)
    }
}

impl Job for CladeGenome {
    fn name(&self) -> String {
        format!("CladeGenome[{}]", self.genome)
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let opts = &self.hub.opts;
        let min_in = opts.min_in as f64;
        let max_out = opts.max_out as f64;

        let in_wig = self.depth(&self.inside, "in")?;
        let out_wig = self.depth(&self.outside, "out")?;

        let in_ok = wig_spans(std::io::BufReader::new(in_wig.reopen()?), |v| v >= min_in)?;
        let out_bad = wig_spans(std::io::BufReader::new(out_wig.reopen()?), |v| v > max_out)?;
        drop(in_wig);
        drop(out_wig);

        let exclusive = exclusive_regions(&in_ok, &out_bad);
        if exclusive.is_empty() {
            log::info!("No regions of {} exclusive to its clade", self.genome);
            return Ok(());
        }

        let bed = self.dir.join(format!("{}.bed", self.genome));
        let mut writer = crate::writer(&bed.display().to_string())?;
        let mut lines: Vec<(String, i32, i32)> = vec![];
        for (chrom, set) in &exclusive {
            let chrom = if opts.ucsc_names {
                ucsc_name(chrom).to_string()
            } else {
                chrom.to_string()
            };
            for (lower, upper) in set.spans() {
                lines.push((chrom.clone(), lower - 1, upper));
            }
        }
        lines.sort();
        for (chrom, start, end) in &lines {
            writeln!(writer, "{}\t{}\t{}", chrom, start, end)?;
        }
        writer.flush()?;
        drop(writer);

        let bb = self.dir.join(format!("{}.bb", self.genome));
        tools::run(
            "bedToBigBed",
            &[
                "-type=bed3".to_string(),
                bed.display().to_string(),
                self.hub.chrom_sizes(&self.genome).display().to_string(),
                bb.display().to_string(),
            ],
        )?;
        std::fs::remove_file(&bed)?;

        Ok(())
    }
}

/// Positions in `inside` not covered by `outside`; empty sequences are dropped.
pub fn exclusive_regions(inside: &Coverage, outside: &Coverage) -> Coverage {
    let mut regions = Coverage::new();
    for (chrom, set) in inside {
        let set = match outside.get(chrom) {
            Some(out) => set.diff(out),
            None => {
                let mut all = IntSpan::new();
                all.merge(set);
                all
            }
        };
        if !set.is_empty() {
            regions.insert(chrom.clone(), set);
        }
    }
    regions
}

enum Step {
    Fixed {
        chrom: String,
        pos: i32,
        step: i32,
        span: i32,
    },
    Variable {
        chrom: String,
        span: i32,
    },
    None,
}

fn header_value(line: &str, key: &str) -> Option<String> {
    RE_WIG_FIELD
        .captures_iter(line)
        .find(|caps| &caps[1] == key)
        .map(|caps| caps[2].to_string())
}

fn header_int(line: &str, key: &str, default: Option<i32>) -> anyhow::Result<i32> {
    match header_value(line, key) {
        Some(v) => Ok(v.parse()?),
        None => default.ok_or_else(|| anyhow::anyhow!("wiggle header lacks {}=", key)),
    }
}

/// Positions of a wiggle (fixedStep, variableStep or bedGraph lines) whose
/// value passes `keep`.
///
/// ```
/// use hal2hub::libs::tracks::clade::wig_spans;
///
/// let wig = "fixedStep chrom=chr1 start=1 step=1\n0\n2\n2\n0\n1\n";
/// let cov = wig_spans(wig.as_bytes(), |v| v >= 1.0).unwrap();
/// assert_eq!(cov["chr1"].to_string(), "2-3,5");
/// ```
pub fn wig_spans<R: BufRead>(reader: R, keep: impl Fn(f64) -> bool) -> anyhow::Result<Coverage> {
    let mut coverage = Coverage::new();
    let mut step = Step::None;
    // Adjacent positions are merged before reaching the IntSpan
    let mut run: Option<(String, i32, i32)> = None;

    let mut push = |coverage: &mut Coverage, chrom: &str, lower: i32, upper: i32| {
        if let Some((c, _, end)) = run.as_mut() {
            if c.as_str() == chrom && lower <= *end + 1 {
                *end = (*end).max(upper);
                return;
            }
        }
        if let Some((c, start, end)) = run.take() {
            coverage.entry(c).or_insert_with(IntSpan::new).add_pair(start, end);
        }
        run = Some((chrom.to_string(), lower, upper));
    };

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[0] {
            "fixedStep" => {
                step = Step::Fixed {
                    chrom: header_value(line, "chrom")
                        .ok_or_else(|| anyhow::anyhow!("fixedStep without chrom: {}", line))?,
                    pos: header_int(line, "start", None)?,
                    step: header_int(line, "step", Some(1))?,
                    span: header_int(line, "span", Some(1))?,
                };
                continue;
            }
            "variableStep" => {
                step = Step::Variable {
                    chrom: header_value(line, "chrom")
                        .ok_or_else(|| anyhow::anyhow!("variableStep without chrom: {}", line))?,
                    span: header_int(line, "span", Some(1))?,
                };
                continue;
            }
            _ => {}
        }

        match (&mut step, fields.len()) {
            (_, 4) => {
                // bedGraph, 0-based half open
                let start: i32 = fields[1].parse()?;
                let end: i32 = fields[2].parse()?;
                if end > start && keep(fields[3].parse()?) {
                    push(&mut coverage, fields[0], start + 1, end);
                }
            }
            (Step::Fixed { chrom, pos, step, span }, 1) => {
                if keep(fields[0].parse()?) {
                    push(&mut coverage, chrom, *pos, *pos + *span - 1);
                }
                *pos += *step;
            }
            (Step::Variable { chrom, span }, 2) => {
                let pos: i32 = fields[0].parse()?;
                if keep(fields[1].parse()?) {
                    push(&mut coverage, chrom, pos, pos + *span - 1);
                }
            }
            _ => anyhow::bail!("Unexpected wiggle line: {}", line),
        }
    }

    if let Some((c, start, end)) = run.take() {
        coverage.entry(c).or_insert_with(IntSpan::new).add_pair(start, end);
    }
    Ok(coverage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::hal::{Genome2Seqs, SeqLens};
    use crate::libs::hub::HubOptions;
    use crate::libs::phylo::Tree;

    #[test]
    fn test_clade_jobs() {
        let tree =
            Tree::from_newick("(((human,chimp)Anc2,(gorilla)Anc3)Anc1,orang)Anc0;").unwrap();
        // orang has no sequences, so nothing lies outside Anc1
        let mut seqs = Genome2Seqs::new();
        for genome in ["human", "chimp", "gorilla"] {
            let mut lens = SeqLens::new();
            lens.insert("chr1".to_string(), 100);
            seqs.insert(genome.to_string(), lens);
        }
        let mut opts = HubOptions::new("apes");
        opts.clade_exclusive = true;
        let hub = Arc::new(Hub {
            hal: "aln.hal".to_string(),
            outdir: PathBuf::from("out"),
            opts,
            leaves: tree.get_leaf_names(),
            tree: Some(tree),
            genomes: seqs.keys().cloned().collect(),
            seqs,
        });

        let jobs = clade_jobs(&hub);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].clade, "Anc2");
        assert_eq!(jobs[0].members, vec!["human", "chimp"]);
        assert_eq!(jobs[0].outside, vec!["gorilla"]);
        assert_eq!(jobs[0].name(), "CladeExclusive[Anc2]");
    }

    #[test]
    fn test_wig_spans_fixed_step() {
        let wig = "track type=wiggle_0\nfixedStep chrom=chr1 start=11 step=10 span=5\n1\n0\n3\nfixedStep chrom=chr2 start=1 step=1\n1\n1\n";
        let cov = wig_spans(wig.as_bytes(), |v| v > 0.0).unwrap();

        assert_eq!(cov.len(), 2);
        assert_eq!(cov["chr1"].to_string(), "11-15,31-35");
        assert_eq!(cov["chr2"].to_string(), "1-2");
    }

    #[test]
    fn test_wig_spans_variable_step() {
        let wig = "variableStep chrom=chrX span=2\n5 1\n7 1\n20 0\n30 2\n";
        let cov = wig_spans(wig.as_bytes(), |v| v >= 1.0).unwrap();
        assert_eq!(cov["chrX"].to_string(), "5-8,30-31");
    }

    #[test]
    fn test_wig_spans_bedgraph() {
        let wig = "chr1\t0\t10\t1\nchr1\t10\t20\t0\nchr1\t20\t25\t4\n";
        let cov = wig_spans(wig.as_bytes(), |v| v >= 1.0).unwrap();
        assert_eq!(cov["chr1"].to_string(), "1-10,21-25");
    }

    #[test]
    fn test_wig_spans_bad_line() {
        let wig = "fixedStep chrom=chr1 start=1 step=1\n1 2 3\n";
        assert!(wig_spans(wig.as_bytes(), |_| true).is_err());
    }

    #[test]
    fn test_exclusive_regions() {
        let inside = wig_spans(
            "fixedStep chrom=chr1 start=1 step=1\n1\n1\n1\n1\n1\nfixedStep chrom=chr2 start=1 step=1\n1\n".as_bytes(),
            |v| v >= 1.0,
        )
        .unwrap();
        let outside = wig_spans(
            "fixedStep chrom=chr1 start=2 step=1\n1\n1\nfixedStep chrom=chr2 start=1 step=1\n1\n".as_bytes(),
            |v| v > 0.0,
        )
        .unwrap();

        let exclusive = exclusive_regions(&inside, &outside);
        assert_eq!(exclusive.len(), 1);
        assert_eq!(exclusive["chr1"].to_string(), "1,4-5");
    }
}
