//! The hub building job tree.
//!
//! ```text
//! Setup
//!  ├─ GetBasicFiles (per genome)
//!  └─ MakeTracks            (follow-on)
//!      ├─ GcPercent / Alignability (per genome)
//!      ├─ Conservation
//!      ├─ AnnotationTrack (per input directory)
//!      ├─ CladeExclusive (per clade)
//!      └─ WriteGenomesFile  (follow-on)
//!          └─ WriteTrackDbFile (per genome)
//! ```

use crate::libs::hal::{self, Genome2Seqs, SeqLens};
use crate::libs::hub::{docs, files, trackdb, HubOptions};
use crate::libs::jobs::{Job, JobContext, Stack};
use crate::libs::phylo::Tree;
use crate::libs::tracks::alignability::Alignability;
use crate::libs::tracks::annotation::{self, AnnotationDirs, AnnotationKind, AnnotationTrack};
use crate::libs::tracks::basic;
use crate::libs::tracks::clade;
use crate::libs::tracks::conservation::{self, Conservation};
use crate::libs::tracks::gc::GcPercent;
use crate::libs::tracks::lod;
use std::io::{BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything the track jobs share, fixed once the genomes are known.
#[derive(Debug)]
pub struct Hub {
    pub hal: String,
    pub outdir: PathBuf,
    pub opts: HubOptions,
    pub tree: Option<Tree>,
    /// Leaf genomes, left to right
    pub leaves: Vec<String>,
    /// Hub genomes in HAL order
    pub genomes: Vec<String>,
    pub seqs: Genome2Seqs,
}

impl Hub {
    pub fn genome_dir(&self, genome: &str) -> PathBuf {
        self.outdir.join(genome)
    }

    pub fn twobit(&self, genome: &str) -> PathBuf {
        self.genome_dir(genome).join(format!("{}.2bit", genome))
    }

    pub fn chrom_sizes(&self, genome: &str) -> PathBuf {
        self.genome_dir(genome).join("chrom.sizes")
    }

    pub fn conservation_dir(&self) -> PathBuf {
        self.outdir.join("conservation")
    }

    /// Genomes shown as snakes and organisms: the tree's leaves when the
    /// genome set was not given explicitly, otherwise every hub genome.
    pub fn display_genomes(&self) -> Vec<String> {
        if self.opts.genomes.is_empty() && !self.leaves.is_empty() {
            self.leaves
                .iter()
                .filter(|g| self.seqs.contains_key(*g))
                .cloned()
                .collect()
        } else {
            self.genomes.clone()
        }
    }

    fn with_clades(&self) -> bool {
        self.tree.is_some() && self.opts.clade_exclusive
    }
}

/// Builds the hub and fails when any job failed.
pub fn build_hub(hal: &str, outdir: &Path, opts: HubOptions) -> anyhow::Result<()> {
    let threads = opts.threads;
    let retry_count = opts.retry_count;

    let failed = Stack::new(Setup {
        hal: hal.to_string(),
        outdir: outdir.to_path_buf(),
        opts,
    })
    .threads(threads)
    .retry_count(retry_count)
    .run()?;

    if failed > 0 {
        anyhow::bail!("The job tree contains {} failed jobs", failed);
    }
    log::info!("Hub written to {}", outdir.display());
    Ok(())
}

/// Hub wide files, the tree and the genome list.
pub struct Setup {
    pub hal: String,
    pub outdir: PathBuf,
    pub opts: HubOptions,
}

impl Setup {
    fn tree(&self) -> anyhow::Result<Option<Tree>> {
        let newick = match &self.opts.tree {
            Some(file) => {
                let mut text = String::new();
                crate::reader(file)?.read_to_string(&mut text)?;
                text.trim().to_string()
            }
            None => hal::tree(&self.hal)?,
        };
        if newick.is_empty() {
            return Ok(None);
        }

        let mut writer = crate::writer(&self.outdir.join("haltree.nw").display().to_string())?;
        writeln!(writer, "{}", newick)?;
        writer.flush()?;

        Ok(Some(Tree::from_newick(&newick)?))
    }

    fn select_genomes(&self) -> anyhow::Result<Vec<String>> {
        let all = hal::genomes(&self.hal)?;
        if self.opts.genomes.is_empty() {
            return Ok(all);
        }
        for genome in &self.opts.genomes {
            if !all.contains(genome) {
                log::warn!("genome {} is not in {}, skipped", genome, self.hal);
            }
        }
        Ok(all
            .into_iter()
            .filter(|g| self.opts.genomes.contains(g))
            .collect())
    }
}

impl Job for Setup {
    fn name(&self) -> String {
        "Setup".to_string()
    }

    fn run(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let opts = &self.opts;
        std::fs::create_dir_all(&self.outdir)?;

        files::write_hub_file(&self.outdir, opts)?;
        files::write_group_file(
            &self.outdir,
            &opts.long_label,
            &opts.annotation_names(),
            opts.rmsk_dir.is_some(),
        )?;

        let tree = self.tree()?;
        let leaves = tree.as_ref().map(|t| t.get_leaf_names()).unwrap_or_default();

        let selected = self.select_genomes()?;
        if let (Some(tree), false) = (&tree, opts.genomes.is_empty()) {
            tree.check_names(&selected)?;
        }
        let seqs = hal::genome_sequences(&self.hal, &selected)?;
        let genomes: Vec<String> = seqs.keys().cloned().collect();
        if genomes.is_empty() {
            anyhow::bail!("No genome of {} has sequences", self.hal);
        }
        log::info!("{} genomes in the hub: {}", genomes.len(), genomes.join(" "));

        let hub = Arc::new(Hub {
            hal: self.hal.clone(),
            outdir: self.outdir.clone(),
            opts: self.opts.clone(),
            tree,
            leaves,
            genomes,
            seqs,
        });

        for genome in &hub.genomes {
            ctx.add_child(GetBasicFiles {
                hub: hub.clone(),
                genome: genome.clone(),
            });
        }
        ctx.set_follow_on(MakeTracks { hub });

        Ok(())
    }
}

/// `<genome>/<genome>.2bit` and `<genome>/chrom.sizes`
pub struct GetBasicFiles {
    pub hub: Arc<Hub>,
    pub genome: String,
}

impl Job for GetBasicFiles {
    fn name(&self) -> String {
        format!("GetBasicFiles[{}]", self.genome)
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let hub = &self.hub;
        let genomedir = hub.genome_dir(&self.genome);
        std::fs::create_dir_all(&genomedir)?;

        match &hub.opts.twobit_dir {
            Some(dir) => basic::link_twobit(&self.genome, dir, &genomedir)?,
            None => basic::make_twobit(&hub.hal, &self.genome, &genomedir, hub.opts.ucsc_names)?,
        }

        let sizes = hub.chrom_sizes(&self.genome);
        hal::chrom_sizes_from_hal(&hub.hal, &self.genome, &sizes)?;
        if hub.opts.ucsc_names {
            rename_chrom_sizes(&sizes)?;
        }

        Ok(())
    }
}

// Browser names in a chrom.sizes; empty sequences are dropped
fn rename_chrom_sizes(sizes: &Path) -> anyhow::Result<()> {
    let mut seqs = SeqLens::new();
    for line in crate::reader(&sizes.display().to_string())?.lines() {
        let line = line?;
        let mut fields = line.split_whitespace();
        if let (Some(name), Some(len)) = (fields.next(), fields.next()) {
            let len: u64 = len
                .parse()
                .map_err(|_| anyhow::anyhow!("Bad chrom.sizes line: {}", line))?;
            seqs.insert(basic::ucsc_name(name).to_string(), len);
        }
    }
    hal::write_chrom_sizes(&seqs, sizes)
}

/// Fans out every optional track.
pub struct MakeTracks {
    pub hub: Arc<Hub>,
}

impl Job for MakeTracks {
    fn name(&self) -> String {
        "MakeTracks".to_string()
    }

    fn run(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let hub = &self.hub;
        let opts = &hub.opts;

        for genome in &hub.genomes {
            if opts.gc_content {
                ctx.add_child(GcPercent {
                    hub: hub.clone(),
                    genome: genome.clone(),
                });
            }
            if opts.alignability {
                ctx.add_child(Alignability {
                    hub: hub.clone(),
                    genome: genome.clone(),
                });
            }
        }

        if let Some(dir) = &opts.conservation_dir {
            conservation::link_conservation_dir(dir, &hub.conservation_dir())?;
        } else if opts.conservation.is_some() {
            ctx.add_child(Conservation { hub: hub.clone() });
        }

        for kind in [AnnotationKind::Bed, AnnotationKind::Bed2, AnnotationKind::Wig] {
            annotation::prepare(opts, &hub.outdir, kind)?;
            for dir in kind.inputs(opts) {
                ctx.add_child(AnnotationTrack {
                    hub: hub.clone(),
                    kind,
                    input_dir: dir.clone(),
                });
            }
        }

        if hub.with_clades() {
            for job in clade::clade_jobs(hub) {
                ctx.add_child(job);
            }
        }

        ctx.set_follow_on(WriteGenomesFile { hub: hub.clone() });
        Ok(())
    }
}

/// The HAL file, levels of detail, documentation and `genomes.txt`.
pub struct WriteGenomesFile {
    pub hub: Arc<Hub>,
}

impl WriteGenomesFile {
    // The alignment as `<outdir>/<basename>`, copied or linked
    fn local_hal(&self) -> anyhow::Result<PathBuf> {
        let hub = &self.hub;
        let name = Path::new(&hub.hal)
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Bad HAL path {}", hub.hal))?;
        let local = hub.outdir.join(name);

        let source = intspan::absolute_path(&hub.hal)?;
        if intspan::absolute_path(&local)? == source {
            return Ok(local);
        }
        if hub.opts.cp_hal {
            if local.exists() || local.is_symlink() {
                std::fs::remove_file(&local)?;
            }
            std::fs::copy(&source, &local)?;
        } else {
            crate::symlink_abs(&source, &local)?;
        }
        Ok(local)
    }
}

impl Job for WriteGenomesFile {
    fn name(&self) -> String {
        "WriteGenomesFile".to_string()
    }

    fn run(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let hub = &self.hub;
        let opts = &hub.opts;

        let local_hal = self.local_hal()?;
        let lod_txt = lod::prepare_lod(hub, &local_hal)?;

        let mut snp_width = opts.snp_width;
        if let Some(lod_txt) = &lod_txt {
            if let Some(width) = lod::snp_width(&lod::read_levels(lod_txt)?) {
                snp_width = Some(width);
            }
        }

        let hal_url = match &lod_txt {
            Some(path) => format!("../{}", crate::dir_basename(&path.display().to_string())),
            None => format!("../{}", crate::dir_basename(&hub.hal)),
        };

        docs::write_doc_files(&hub.outdir.join("documentation"), opts)?;

        let mut writer = crate::writer(&hub.outdir.join("genomes.txt").display().to_string())?;
        files::write_genomes(&mut writer, &hub.genomes, &hub.seqs, &opts.proper_names)?;
        writer.flush()?;

        for genome in &hub.genomes {
            files::write_description_file(genome, &hub.genome_dir(genome), &opts.proper_names)?;
            ctx.add_child(WriteTrackDbFile {
                hub: hub.clone(),
                genome: genome.clone(),
                hal_url: hal_url.clone(),
                snp_width,
            });
        }
        Ok(())
    }
}

/// `<genome>/trackDb.txt`
pub struct WriteTrackDbFile {
    pub hub: Arc<Hub>,
    pub genome: String,
    pub hal_url: String,
    pub snp_width: Option<u64>,
}

impl WriteTrackDbFile {
    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> anyhow::Result<()> {
        let hub = &self.hub;
        let opts = &hub.opts;
        let cur = self.genome.as_str();
        let genomedir = hub.genome_dir(cur);
        let genomes = hub.display_genomes();
        let dirs = AnnotationDirs::new(opts, &hub.outdir, hub.with_clades());

        if opts.gc_content {
            trackdb::gc_percent(w, cur)?;
        }
        if opts.alignability {
            trackdb::alignability(w, cur, hub.genomes.len())?;
        }
        if opts.has_conservation() {
            trackdb::conservation(w, cur, &hub.conservation_dir())?;
        }
        if let Some(rmsk_dir) = &opts.rmsk_dir {
            trackdb::rmsk(w, &Path::new(rmsk_dir).join(cur), &genomedir)?;
        }

        for dir in &dirs.bigbed2 {
            trackdb::bigbeds(w, dir, &hub.outdir, &genomes, cur, &opts.proper_names, false)?;
        }

        trackdb::composite_start(w, opts, &dirs.bigbed, &dirs.bigwig, &genomes)?;
        for dir in &dirs.bigbed {
            if trackdb::has_files(cur, dir, "bb") {
                let annotation = crate::dir_basename(&dir.display().to_string());
                trackdb::composite_subtrack(w, &annotation, &annotation, "dense")?;
                trackdb::bigbeds(w, dir, &hub.outdir, &genomes, cur, &opts.proper_names, true)?;
            }
        }
        for dir in &dirs.bigwig {
            if trackdb::has_files(cur, dir, "bw") {
                let annotation = crate::dir_basename(&dir.display().to_string());
                trackdb::composite_subtrack(w, &annotation, &annotation, "dense")?;
                trackdb::bigwigs(w, dir, &hub.outdir, &genomes, cur, &opts.proper_names)?;
            }
        }

        trackdb::composite_subtrack(w, "Alignments", "Snake", "full")?;
        let neighbors = hub
            .tree
            .as_ref()
            .map(|t| t.shown_neighbors(cur, &genomes))
            .unwrap_or_default();
        trackdb::snakes(
            w,
            &self.hal_url,
            &genomes,
            &neighbors,
            cur,
            &opts.proper_names,
            self.snp_width,
        )?;

        Ok(())
    }
}

impl Job for WriteTrackDbFile {
    fn name(&self) -> String {
        format!("WriteTrackDbFile[{}]", self.genome)
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let path = self.hub.genome_dir(&self.genome).join("trackDb.txt");
        let mut writer = crate::writer(&path.display().to_string())?;
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
