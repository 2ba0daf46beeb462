//! Annotation tracks lifted across the alignment.
//!
//! An input directory holds one subdirectory per source genome:
//! `<input>/<src>/*.bed` (or `*.wig`). Every source is lifted onto every hub
//! genome and stored as `<outdir>/liftoverbeds/<input>/<src>/<tgt>.bb`
//! (`liftoverwigs` and `.bw` for wiggles).

use crate::libs::hub::HubOptions;
use crate::libs::jobs::{Job, JobContext};
use crate::libs::pipeline::Hub;
use crate::libs::tools;
use crate::libs::tracks::basic::ucsc_name;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CLADE_EXCLUSIVE: &str = "CladeExclusive";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Composite bigBed subtracks
    Bed,
    /// Standalone bigBed tracks
    Bed2,
    Wig,
}

impl AnnotationKind {
    pub fn input_ext(self) -> &'static str {
        match self {
            AnnotationKind::Bed | AnnotationKind::Bed2 => "bed",
            AnnotationKind::Wig => "wig",
        }
    }

    pub fn track_ext(self) -> &'static str {
        match self {
            AnnotationKind::Bed | AnnotationKind::Bed2 => "bb",
            AnnotationKind::Wig => "bw",
        }
    }

    pub fn root(self, outdir: &Path) -> PathBuf {
        match self {
            AnnotationKind::Bed | AnnotationKind::Bed2 => outdir.join("liftoverbeds"),
            AnnotationKind::Wig => outdir.join("liftoverwigs"),
        }
    }

    /// Raw inputs that need lifting and conversion
    pub fn inputs(self, opts: &HubOptions) -> &[String] {
        match self {
            AnnotationKind::Bed => &opts.bed_dirs,
            AnnotationKind::Bed2 => &opts.bed_dirs2,
            AnnotationKind::Wig => &opts.wig_dirs,
        }
    }

    /// Directories already laid out as `<src>/<tgt>.bb` (or `.bw`)
    pub fn precomputed(self, opts: &HubOptions) -> &[String] {
        match self {
            AnnotationKind::Bed => &opts.bb_dirs,
            AnnotationKind::Bed2 => &opts.bb_dirs2,
            AnnotationKind::Wig => &opts.bw_dirs,
        }
    }

    fn no_liftover(self, opts: &HubOptions) -> bool {
        match self {
            AnnotationKind::Bed | AnnotationKind::Bed2 => opts.no_bed_liftover,
            AnnotationKind::Wig => opts.no_wig_liftover,
        }
    }

    /// Hub directories of this kind, raw inputs first
    pub fn track_dirs(self, opts: &HubOptions, outdir: &Path) -> Vec<PathBuf> {
        let root = self.root(outdir);
        self.inputs(opts)
            .iter()
            .chain(self.precomputed(opts).iter())
            .map(|d| root.join(crate::dir_basename(d)))
            .collect()
    }
}

/// Every annotation directory a trackDb file may reference.
#[derive(Debug, Clone, Default)]
pub struct AnnotationDirs {
    pub bigbed: Vec<PathBuf>,
    pub bigbed2: Vec<PathBuf>,
    pub bigwig: Vec<PathBuf>,
}

impl AnnotationDirs {
    pub fn new(opts: &HubOptions, outdir: &Path, with_clades: bool) -> Self {
        let mut bigbed = AnnotationKind::Bed.track_dirs(opts, outdir);
        if with_clades {
            bigbed.push(AnnotationKind::Bed.root(outdir).join(CLADE_EXCLUSIVE));
        }
        Self {
            bigbed,
            bigbed2: AnnotationKind::Bed2.track_dirs(opts, outdir),
            bigwig: AnnotationKind::Wig.track_dirs(opts, outdir),
        }
    }
}

/// Creates the output directories and links precomputed ones in.
pub fn prepare(opts: &HubOptions, outdir: &Path, kind: AnnotationKind) -> anyhow::Result<()> {
    let root = kind.root(outdir);
    for dir in kind.inputs(opts) {
        std::fs::create_dir_all(root.join(crate::dir_basename(dir)))?;
    }
    for dir in kind.precomputed(opts) {
        std::fs::create_dir_all(&root)?;
        crate::symlink_abs(Path::new(dir), &root.join(crate::dir_basename(dir)))?;
    }
    Ok(())
}

fn input_files(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|e| e == ext).unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Fans out one `Liftover` per (source genome, target genome).
pub struct AnnotationTrack {
    pub hub: Arc<Hub>,
    pub kind: AnnotationKind,
    pub input_dir: String,
}

impl Job for AnnotationTrack {
    fn name(&self) -> String {
        format!("AnnotationTrack[{}]", crate::dir_basename(&self.input_dir))
    }

    fn run(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let annotation = crate::dir_basename(&self.input_dir);

        for entry in std::fs::read_dir(&self.input_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let src = crate::dir_basename(&path.display().to_string());
            if !self.hub.seqs.contains_key(&src) {
                log::warn!("{}: genome {} is not in the hub, skipped", annotation, src);
                continue;
            }
            let files = input_files(&path, self.kind.input_ext())?;
            if files.is_empty() {
                continue;
            }

            for tgt in &self.hub.genomes {
                ctx.add_child(Liftover {
                    hub: self.hub.clone(),
                    kind: self.kind,
                    annotation: annotation.clone(),
                    src: src.clone(),
                    tgt: tgt.to_string(),
                    files: files.clone(),
                });
            }
        }
        Ok(())
    }
}

pub struct Liftover {
    pub hub: Arc<Hub>,
    pub kind: AnnotationKind,
    pub annotation: String,
    pub src: String,
    pub tgt: String,
    pub files: Vec<PathBuf>,
}

impl Liftover {
    fn lifted(&self, outdir: &Path) -> anyhow::Result<Option<PathBuf>> {
        let opts = &self.hub.opts;
        let merged = outdir.join(format!("{}.{}.tmp", self.tgt, self.kind.input_ext()));
        let mut writer = crate::writer(&merged.display().to_string())?;

        if self.src == self.tgt {
            for file in &self.files {
                let mut reader = crate::reader(&file.display().to_string())?;
                std::io::copy(&mut reader, &mut writer)?;
            }
            writer.flush()?;
            return Ok(Some(merged));
        }

        if self.kind.no_liftover(opts) {
            drop(writer);
            std::fs::remove_file(&merged)?;
            return Ok(None);
        }

        let part = outdir.join(format!("{}.{}.part", self.tgt, self.kind.input_ext()));
        for file in &self.files {
            let mut args: Vec<String> = vec![];
            let program = match self.kind {
                AnnotationKind::Bed | AnnotationKind::Bed2 => {
                    if opts.tab_bed {
                        args.push("--tab".to_string());
                    }
                    "halLiftover"
                }
                AnnotationKind::Wig => "halWiggleLiftover",
            };
            args.extend([
                self.hub.hal.clone(),
                self.src.clone(),
                file.display().to_string(),
                self.tgt.clone(),
                part.display().to_string(),
            ]);
            tools::run(program, &args)?;

            let reader = crate::reader(&part.display().to_string())?;
            for line in reader.lines() {
                let line = line?;
                let line = if opts.ucsc_names {
                    rename_chrom(&line, self.kind)
                } else {
                    line
                };
                writeln!(writer, "{}", line)?;
            }
        }
        writer.flush()?;
        if part.exists() {
            std::fs::remove_file(&part)?;
        }

        Ok(Some(merged))
    }
}

impl Job for Liftover {
    fn name(&self) -> String {
        format!(
            "Liftover[{}:{}->{}]",
            self.annotation, self.src, self.tgt
        )
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let outdir = self
            .kind
            .root(&self.hub.outdir)
            .join(&self.annotation)
            .join(&self.src);
        std::fs::create_dir_all(&outdir)?;

        let merged = match self.lifted(&outdir)? {
            Some(merged) => merged,
            None => return Ok(()),
        };
        let sizes = self.hub.chrom_sizes(&self.tgt);
        let out = outdir.join(format!("{}.{}", self.tgt, self.kind.track_ext()));

        match self.kind {
            AnnotationKind::Bed | AnnotationKind::Bed2 => {
                let chroms = read_chroms(&sizes)?;
                let sorted = outdir.join(format!("{}.sorted.bed", self.tgt));
                let tab = self.hub.opts.tab_bed;
                let (count, columns) = sort_bed(&merged, &sorted, tab, &chroms)?;

                if count > 0 {
                    let mut args = vec![format!("-type=bed{}", columns)];
                    if tab {
                        args.push("-tab".to_string());
                    }
                    args.extend([
                        sorted.display().to_string(),
                        sizes.display().to_string(),
                        out.display().to_string(),
                    ]);
                    tools::run("bedToBigBed", &args)?;
                } else {
                    log::info!("{}: nothing lifted from {} to {}", self.annotation, self.src, self.tgt);
                }
                std::fs::remove_file(&sorted)?;
            }
            AnnotationKind::Wig => {
                if std::fs::metadata(&merged)?.len() > 0 {
                    tools::run(
                        "wigToBigWig",
                        &[
                            merged.display().to_string(),
                            sizes.display().to_string(),
                            out.display().to_string(),
                        ],
                    )?;
                }
            }
        }
        std::fs::remove_file(&merged)?;

        Ok(())
    }
}

/// Rewrites the sequence name of a lifted BED record or wiggle header.
///
/// ```
/// use hal2hub::libs::tracks::annotation::{rename_chrom, AnnotationKind};
///
/// assert_eq!(rename_chrom("human.chr1\t10\t20\tgeneA", AnnotationKind::Bed), "chr1\t10\t20\tgeneA");
/// assert_eq!(
///     rename_chrom("fixedStep chrom=human.chr2 start=1 step=1", AnnotationKind::Wig),
///     "fixedStep chrom=chr2 start=1 step=1"
/// );
/// ```
pub fn rename_chrom(line: &str, kind: AnnotationKind) -> String {
    match kind {
        AnnotationKind::Bed | AnnotationKind::Bed2 => match line.split_once('\t') {
            Some((chrom, rest)) => format!("{}\t{}", ucsc_name(chrom), rest),
            None => line.to_string(),
        },
        AnnotationKind::Wig => {
            if !(line.starts_with("fixedStep") || line.starts_with("variableStep")) {
                return line.to_string();
            }
            line.split_whitespace()
                .map(|field| match field.strip_prefix("chrom=") {
                    Some(chrom) => format!("chrom={}", ucsc_name(chrom)),
                    None => field.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Sequence names of a chrom.sizes file
pub fn read_chroms(sizes: &Path) -> anyhow::Result<HashSet<String>> {
    let mut chroms = HashSet::new();
    for line in crate::reader(&sizes.display().to_string())?.lines() {
        let line = line?;
        if let Some(chrom) = line.split_whitespace().next() {
            chroms.insert(chrom.to_string());
        }
    }
    Ok(chroms)
}

/// Sorts BED records by sequence name then start, the order bedToBigBed wants.
///
/// Header lines and records on sequences missing from `chroms` are dropped.
/// Every record is cut to the fewest columns any kept record has (at most
/// 12), so mixed inputs still convert. Returns the number of records written
/// and that column count.
pub fn sort_bed(
    infile: &Path,
    outfile: &Path,
    tabbed: bool,
    chroms: &HashSet<String>,
) -> anyhow::Result<(usize, usize)> {
    let mut records: Vec<(String, u64, Vec<String>)> = vec![];

    for line in crate::reader(&infile.display().to_string())?.lines() {
        let line = line?;
        if line.trim().is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<String> = if tabbed {
            line.split('\t').map(|s| s.to_string()).collect()
        } else {
            line.split_whitespace().map(|s| s.to_string()).collect()
        };
        if fields.len() < 3 {
            anyhow::bail!("BED record with fewer than 3 columns: {}", line);
        }
        if !chroms.contains(&fields[0]) {
            continue;
        }
        let start: u64 = fields[1]
            .parse()
            .map_err(|_| anyhow::anyhow!("Bad BED start: {}", line))?;

        records.push((fields[0].clone(), start, fields));
    }

    let columns = records
        .iter()
        .map(|(_, _, fields)| fields.len())
        .min()
        .unwrap_or(0)
        .min(12);

    records.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut writer = crate::writer(&outfile.display().to_string())?;
    for (_, _, fields) in &records {
        writeln!(writer, "{}", fields[..columns].join("\t"))?;
    }
    writer.flush()?;

    Ok((records.len(), columns))
}
