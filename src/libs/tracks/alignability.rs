use crate::libs::jobs::{Job, JobContext};
use crate::libs::pipeline::Hub;
use anyhow::Context;
use cmd_lib::*;
use std::sync::Arc;

/// `<genomedir>/<genome>.alignability.bw`: number of genomes aligned to each base.
pub struct Alignability {
    pub hub: Arc<Hub>,
    pub genome: String,
}

impl Job for Alignability {
    fn name(&self) -> String {
        format!("Alignability[{}]", self.genome)
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let genome = &self.genome;
        let hal = &self.hub.hal;
        let genomedir = self.hub.genome_dir(genome);
        let sizes = self.hub.chrom_sizes(genome).display().to_string();
        let wig = genomedir
            .join(format!("{}.alignability.wig", genome))
            .display()
            .to_string();
        let bw = genomedir
            .join(format!("{}.alignability.bw", genome))
            .display()
            .to_string();

        run_cmd!(halAlignability $hal $genome > $wig)
            .with_context(|| format!("halAlignability {} {}", hal, genome))?;
        run_cmd!(wigToBigWig $wig $sizes $bw).with_context(|| format!("wigToBigWig {}", wig))?;
        std::fs::remove_file(&wig)?;

        Ok(())
    }
}
