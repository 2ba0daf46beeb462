//! PhyloP conservation tracks, `<outdir>/conservation/<genome>/<genome>_phyloP.bw`.

use crate::libs::jobs::{Job, JobContext};
use crate::libs::pipeline::Hub;
use crate::libs::tools;
use std::path::Path;
use std::sync::Arc;

pub struct Conservation {
    pub hub: Arc<Hub>,
}

impl Job for Conservation {
    fn name(&self) -> String {
        "Conservation".to_string()
    }

    fn run(&self, _ctx: &mut JobContext) -> anyhow::Result<()> {
        let opts = &self.hub.opts;
        let dir = self.hub.conservation_dir();
        std::fs::create_dir_all(&dir)?;
        let threads = opts.threads.to_string();

        let model = match &opts.conservation_tree {
            Some(model) => model.to_string(),
            None => {
                let model = dir.join("neutralModel.mod").display().to_string();
                let regions = opts
                    .conservation
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("--conservation regions are required to train a model"))?;
                let ref_genome = opts.conservation_genome.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("--conservationGenomeName is required to train a model")
                })?;

                tools::run(
                    "halPhyloPTrain.py",
                    &[
                        self.hub.hal.clone(),
                        ref_genome.to_string(),
                        regions.to_string(),
                        model.clone(),
                        "--numProc".to_string(),
                        threads.clone(),
                    ],
                )?;
                model
            }
        };

        tools::run(
            "halTreePhyloP.py",
            &[
                self.hub.hal.clone(),
                model,
                dir.display().to_string(),
                "--bigWig".to_string(),
                "--numProc".to_string(),
                threads,
            ],
        )?;

        Ok(())
    }
}

/// Points `<outdir>/conservation` at precomputed tracks. Linking a directory
/// onto itself is a no-op.
pub fn link_conservation_dir(precomputed: &str, target: &Path) -> anyhow::Result<()> {
    let precomputed = intspan::absolute_path(precomputed)?;
    if target.exists() && intspan::absolute_path(target)? == precomputed {
        return Ok(());
    }
    crate::symlink_abs(&precomputed, target)
}
