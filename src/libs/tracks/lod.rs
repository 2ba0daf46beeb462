//! Levels of detail: coarser HAL files the browser switches to when zoomed out.
//!
//! `lod.txt` lists `<min base count> <hal path>` per level, level 0 being the
//! original alignment.

use crate::libs::pipeline::Hub;
use crate::libs::tools;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// `(level, path)` pairs of a lod.txt
pub fn parse_levels<R: BufRead>(reader: R) -> anyhow::Result<Vec<(u64, String)>> {
    let mut levels = vec![];
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || fields[0].starts_with('#') {
            continue;
        }
        if fields.len() != 2 {
            anyhow::bail!("Expected `<level> <path>` in lod file: {}", line);
        }
        let level: u64 = fields[0]
            .parse()
            .map_err(|_| anyhow::anyhow!("Bad level in lod file: {}", line))?;
        levels.push((level, fields[1].to_string()));
    }
    Ok(levels)
}

/// Smallest non-zero level, below which the original alignment is shown.
///
/// ```
/// use hal2hub::libs::tracks::lod::lowest_level;
///
/// let levels = vec![(0, "a.hal".to_string()), (2000, "b.hal".to_string()), (500, "c.hal".to_string())];
/// assert_eq!(lowest_level(&levels), Some(500));
/// assert_eq!(lowest_level(&levels[..1]), None);
/// ```
pub fn lowest_level(levels: &[(u64, String)]) -> Option<u64> {
    levels.iter().map(|(l, _)| *l).filter(|l| *l > 0).min()
}

/// Snps are drawn below this many bases: one less than the lowest level.
pub fn snp_width(levels: &[(u64, String)]) -> Option<u64> {
    lowest_level(levels).map(|l| l - 1)
}

/// Rewrites absolute paths under `outdir` as paths relative to it.
pub fn relative_levels(levels: &[(u64, String)], outdir: &Path) -> Vec<(u64, String)> {
    levels
        .iter()
        .map(|(level, path)| {
            let rel = Path::new(path)
                .strip_prefix(outdir)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| path.to_string());
            (*level, rel)
        })
        .collect()
}

pub fn write_levels(levels: &[(u64, String)], outfile: &Path) -> anyhow::Result<()> {
    let mut writer = crate::writer(&outfile.display().to_string())?;
    for (level, path) in levels {
        writeln!(writer, "{} {}", level, path)?;
    }
    writer.flush()?;
    Ok(())
}

/// Puts a lod.txt into the hub, linked from `--lodTxtFile`/`--lodDir` or
/// computed with `halLodInterpolate.py` from `local_hal`.
///
/// Returns the path of the hub's lod.txt, or `None` without levels of detail.
pub fn prepare_lod(hub: &Hub, local_hal: &Path) -> anyhow::Result<Option<PathBuf>> {
    let opts = &hub.opts;
    let outdir = &hub.outdir;

    if let Some(lod_txt) = &opts.lod_txt_file {
        let target = outdir.join(crate::dir_basename(lod_txt));
        let source = intspan::absolute_path(lod_txt)?;
        if intspan::absolute_path(&target)? != source {
            crate::symlink_abs(&source, &target)?;
        }
        if let Some(lod_dir) = &opts.lod_dir {
            let target = outdir.join(crate::dir_basename(lod_dir));
            let source = intspan::absolute_path(lod_dir)?;
            if intspan::absolute_path(&target)? != source {
                crate::symlink_abs(&source, &target)?;
            }
        }
        return Ok(Some(target));
    }

    if !opts.lod {
        return Ok(None);
    }

    let outdir = intspan::absolute_path(outdir)?;
    let lod_txt = outdir.join("lod.txt");
    let lod_dir = outdir.join("lod");
    tools::run(
        "halLodInterpolate.py",
        &[
            local_hal.display().to_string(),
            lod_txt.display().to_string(),
            "--outHalDir".to_string(),
            lod_dir.display().to_string(),
            "--maxBlock".to_string(),
            opts.lod_max_block.to_string(),
            "--scale".to_string(),
            opts.lod_scale.to_string(),
            "--minSeqFrac".to_string(),
            opts.lod_min_seq_frac.to_string(),
            "--numProc".to_string(),
            opts.threads.to_string(),
        ],
    )?;

    let levels = parse_levels(crate::reader(&lod_txt.display().to_string())?)?;
    write_levels(&relative_levels(&levels, &outdir), &lod_txt)?;

    Ok(Some(lod_txt))
}

/// Levels of an existing lod.txt
pub fn read_levels(lod_txt: &Path) -> anyhow::Result<Vec<(u64, String)>> {
    parse_levels(crate::reader(&lod_txt.display().to_string())?)
}
