//! Hub configuration and the text files a genome browser reads.

pub mod docs;
pub mod files;
pub mod trackdb;

use std::collections::HashMap;
use std::io::BufRead;

/// Settings of one `hal2hub build` run.
#[derive(Debug, Clone)]
pub struct HubOptions {
    pub hub: String,
    pub short_label: String,
    pub long_label: String,
    pub email: String,
    pub url: Option<String>,

    /// Copy the HAL file into the hub instead of linking it
    pub cp_hal: bool,
    /// Sequence headers look like `genome.chr`; keep only `chr`
    pub ucsc_names: bool,

    /// Restrict the hub to these genomes (HAL order is kept)
    pub genomes: Vec<String>,
    /// Newick text; extracted from the HAL file when not given
    pub tree: Option<String>,
    pub proper_names: ProperNames,

    pub twobit_dir: Option<String>,

    pub bed_dirs: Vec<String>,
    pub bb_dirs: Vec<String>,
    pub bed_dirs2: Vec<String>,
    pub bb_dirs2: Vec<String>,
    pub wig_dirs: Vec<String>,
    pub bw_dirs: Vec<String>,
    pub no_bed_liftover: bool,
    pub no_wig_liftover: bool,
    pub tab_bed: bool,

    pub rmsk_dir: Option<String>,
    pub gc_content: bool,
    pub alignability: bool,

    /// Regions (bed) used to train the neutral model
    pub conservation: Option<String>,
    pub conservation_genome: Option<String>,
    /// A trained neutral model; skips training
    pub conservation_tree: Option<String>,
    /// Precomputed conservation tracks
    pub conservation_dir: Option<String>,

    pub clade_exclusive: bool,
    pub max_out: u32,
    pub min_in: u32,

    pub lod: bool,
    pub lod_txt_file: Option<String>,
    pub lod_dir: Option<String>,
    pub lod_max_block: usize,
    pub lod_scale: f64,
    pub lod_min_seq_frac: f64,

    pub snp_width: Option<u64>,

    pub threads: usize,
    pub retry_count: usize,
}

impl HubOptions {
    /// Defaults for a hub named `hub`; every optional track off.
    pub fn new(hub: &str) -> Self {
        Self {
            hub: hub.to_string(),
            short_label: hub.to_string(),
            long_label: hub.to_string(),
            email: "NoEmail".to_string(),
            url: None,
            cp_hal: false,
            ucsc_names: true,
            genomes: vec![],
            tree: None,
            proper_names: ProperNames::default(),
            twobit_dir: None,
            bed_dirs: vec![],
            bb_dirs: vec![],
            bed_dirs2: vec![],
            bb_dirs2: vec![],
            wig_dirs: vec![],
            bw_dirs: vec![],
            no_bed_liftover: false,
            no_wig_liftover: false,
            tab_bed: false,
            rmsk_dir: None,
            gc_content: false,
            alignability: false,
            conservation: None,
            conservation_genome: None,
            conservation_tree: None,
            conservation_dir: None,
            clade_exclusive: false,
            max_out: 0,
            min_in: 1,
            lod: false,
            lod_txt_file: None,
            lod_dir: None,
            lod_max_block: 500,
            lod_scale: 3.0,
            lod_min_seq_frac: 0.5,
            snp_width: None,
            threads: 1,
            retry_count: 0,
        }
    }

    /// Basenames of every annotation input, in the order groups are listed
    pub fn annotation_names(&self) -> Vec<String> {
        [
            &self.bed_dirs,
            &self.bb_dirs,
            &self.bed_dirs2,
            &self.bb_dirs2,
            &self.wig_dirs,
            &self.bw_dirs,
        ]
        .iter()
        .flat_map(|dirs| dirs.iter())
        .map(|d| crate::dir_basename(d))
        .collect()
    }

    /// Conservation tracks are wanted, computed or precomputed
    pub fn has_conservation(&self) -> bool {
        self.conservation.is_some() || self.conservation_dir.is_some()
    }

    /// External binaries this configuration will call.
    pub fn required_tools(&self) -> Vec<&'static str> {
        let mut tools = vec!["halStats"];
        if self.twobit_dir.is_none() {
            tools.push("hal2fasta");
            tools.push("faToTwoBit");
        }
        if self.gc_content {
            tools.push("hgGcPercent");
        }
        if self.alignability {
            tools.push("halAlignability");
        }
        if self.gc_content || self.alignability || !self.wig_dirs.is_empty() {
            tools.push("wigToBigWig");
        }
        if !self.bed_dirs.is_empty() || !self.bed_dirs2.is_empty() || self.clade_exclusive {
            tools.push("bedToBigBed");
        }
        if (!self.bed_dirs.is_empty() || !self.bed_dirs2.is_empty()) && !self.no_bed_liftover {
            tools.push("halLiftover");
        }
        if !self.wig_dirs.is_empty() && !self.no_wig_liftover {
            tools.push("halWiggleLiftover");
        }
        if self.clade_exclusive {
            tools.push("halAlignmentDepth");
        }
        if self.conservation.is_some() && self.conservation_dir.is_none() {
            if self.conservation_tree.is_none() {
                tools.push("halPhyloPTrain.py");
            }
            tools.push("halTreePhyloP.py");
        }
        if self.lod && self.lod_txt_file.is_none() {
            tools.push("halLodInterpolate.py");
        }
        tools
    }
}

/// Display names of genomes, read from a `genome<TAB>name` table.
#[derive(Debug, Clone, Default)]
pub struct ProperNames {
    names: HashMap<String, String>,
}

impl ProperNames {
    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        let mut names = HashMap::new();
        for line in crate::reader(infile)?.lines() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (genome, name) = line
                .split_once('\t')
                .ok_or_else(|| anyhow::anyhow!("Expected genome<TAB>name: {}", line))?;
            names.insert(genome.trim().to_string(), name.trim().to_string());
        }
        Ok(Self { names })
    }

    /// Falls back to the genome name itself
    pub fn get<'a>(&'a self, genome: &'a str) -> &'a str {
        self.names.get(genome).map(|s| s.as_str()).unwrap_or(genome)
    }

    /// Genomes ordered by display name
    pub fn sort_genomes(&self, genomes: &[String]) -> Vec<String> {
        let mut sorted = genomes.to_vec();
        sorted.sort_by(|a, b| self.get(a).cmp(self.get(b)));
        sorted
    }
}

/// UCSC track names allow only letters, digits and `_`.
///
/// ```
/// assert_eq!(hal2hub::libs::hub::track_name("ref-genes.v2"), "ref_genes_v2");
/// ```
pub fn track_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
