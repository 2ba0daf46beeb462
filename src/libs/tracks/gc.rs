use crate::libs::jobs::{Job, JobContext};
use crate::libs::pipeline::Hub;
use crate::libs::tools;
use anyhow::Context;
use cmd_lib::*;
use std::sync::Arc;

/// `<genomedir>/<genome>.gc.bw`: GC percent in 5-base windows.
pub struct GcPercent {
    pub hub: Arc<Hub>,
    pub genome: String,
}

impl Job for GcPercent {
    fn name(&self) -> String {
        format!("GcPercent[{}]", self.genome)
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let genome = &self.genome;
        let genomedir = self.hub.genome_dir(genome);
        let twobit = self.hub.twobit(genome).display().to_string();
        let sizes = self.hub.chrom_sizes(genome).display().to_string();
        let wig = genomedir.join(format!("{}.gc.wigVarStep.gz", genome));
        let bw = genomedir.join(format!("{}.gc.bw", genome)).display().to_string();

        let args: Vec<String> = vec![
            "-wigOut".to_string(),
            "-doGaps".to_string(),
            "-file=stdout".to_string(),
            "-win=5".to_string(),
            "-verbose=0".to_string(),
            genome.to_string(),
            twobit,
        ];
        tools::run_to_gz("hgGcPercent", &args, &wig)?;

        let wig = wig.display().to_string();
        run_cmd!(wigToBigWig $wig $sizes $bw).with_context(|| format!("wigToBigWig {}", wig))?;
        std::fs::remove_file(&wig)?;

        Ok(())
    }
}
