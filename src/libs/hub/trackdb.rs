//! Stanzas of a genome's `trackDb.txt`.
//!
//! Track files are referenced relative to the genome directory, so every
//! `bigDataUrl` below starts with the genome's own files or `../`.

use super::{track_name, HubOptions, ProperNames};
use std::io::{Read, Write};
use std::path::Path;

const BIGBED_MAGIC: u32 = 0x8789_F2EB;

pub fn gc_percent<W: Write + ?Sized>(w: &mut W, genome: &str) -> anyhow::Result<()> {
    writeln!(w, "track gcPercent")?;
    writeln!(w, "longLabel GC Percent in 5-Base Windows")?;
    writeln!(w, "shortLabel GC Percent")?;
    writeln!(w, "type bigWig 0 100")?;
    writeln!(w, "group map")?;
    writeln!(w, "visibility dense")?;
    writeln!(w, "windowingFunction Mean")?;
    writeln!(w, "bigDataUrl {}.gc.bw", genome)?;
    writeln!(w, "priority 2")?;
    writeln!(w, "autoScale Off")?;
    writeln!(w, "maxHeightPixels 128:36:16")?;
    writeln!(w, "graphTypeDefault Bar")?;
    writeln!(w, "gridDefault OFF")?;
    writeln!(w, "color 0,0,0")?;
    writeln!(w, "altColor 128,128,128")?;
    writeln!(w, "viewLimits 30:70")?;
    writeln!(w, "html ../documentation/gcPercent")?;
    writeln!(w)?;
    Ok(())
}

/// `n_genomes` bounds the number of genomes a base can align to
pub fn alignability<W: Write + ?Sized>(
    w: &mut W,
    genome: &str,
    n_genomes: usize,
) -> anyhow::Result<()> {
    writeln!(w, "track alignability")?;
    writeln!(w, "longLabel Alignability")?;
    writeln!(w, "shortLabel Alignability")?;
    writeln!(w, "type bigWig 0 {}", n_genomes)?;
    writeln!(w, "group map")?;
    writeln!(w, "visibility dense")?;
    writeln!(w, "windowingFunction Mean")?;
    writeln!(w, "bigDataUrl {}.alignability.bw", genome)?;
    writeln!(w, "priority 2")?;
    writeln!(w, "autoScale Off")?;
    writeln!(w, "maxHeightPixels 128:36:16")?;
    writeln!(w, "graphTypeDefault Bar")?;
    writeln!(w, "gridDefault OFF")?;
    writeln!(w, "color 0,0,0")?;
    writeln!(w, "altColor 128,128,128")?;
    writeln!(w, "viewLimits 0:{}", n_genomes)?;
    writeln!(w, "html ../documentation/alignability")?;
    writeln!(w)?;
    Ok(())
}

/// Path of a genome's phyloP bigWig inside the conservation directory
pub fn phylop_file(conservation_dir: &Path, genome: &str) -> std::path::PathBuf {
    conservation_dir
        .join(genome)
        .join(format!("{}_phyloP.bw", genome))
}

/// Written only when the genome has a phyloP track.
pub fn conservation<W: Write + ?Sized>(
    w: &mut W,
    genome: &str,
    conservation_dir: &Path,
) -> anyhow::Result<()> {
    if !phylop_file(conservation_dir, genome).exists() {
        log::debug!("No conservation track for {}", genome);
        return Ok(());
    }

    writeln!(w, "track conservation")?;
    writeln!(w, "longLabel PhyloP Conservation")?;
    writeln!(w, "shortLabel Conservation")?;
    writeln!(w, "type bigWig -20 10")?;
    writeln!(w, "group map")?;
    writeln!(w, "visibility full")?;
    writeln!(w, "windowingFunction Mean")?;
    writeln!(
        w,
        "bigDataUrl ../conservation/{}/{}_phyloP.bw",
        genome, genome
    )?;
    writeln!(w, "priority 2")?;
    writeln!(w, "autoScale Off")?;
    writeln!(w, "maxHeightPixels 128:36:16")?;
    writeln!(w, "graphTypeDefault Bar")?;
    writeln!(w, "gridDefault OFF")?;
    writeln!(w, "color 10,10,70")?;
    writeln!(w, "altColor 70,10,10")?;
    writeln!(w, "viewLimits -2:2")?;
    writeln!(w, "yLineOnOff On")?;
    writeln!(w, "yLineMark 0")?;
    writeln!(w, "html ../documentation/conservation")?;
    writeln!(w)?;
    Ok(())
}

/// Composite RepeatMasker track, one subtrack per `.bb` in `rmsk_genome_dir`.
/// The bigBeds are linked into `<genomedir>/rmsk/`.
pub fn rmsk<W: Write + ?Sized>(
    w: &mut W,
    rmsk_genome_dir: &Path,
    genomedir: &Path,
) -> anyhow::Result<()> {
    if !rmsk_genome_dir.is_dir() {
        log::debug!("No RepeatMasker tracks in {}", rmsk_genome_dir.display());
        return Ok(());
    }

    let mut files: Vec<String> = std::fs::read_dir(rmsk_genome_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|f| f.ends_with(".bb"))
        .collect();
    if files.is_empty() {
        return Ok(());
    }
    files.sort();

    let linkdir = genomedir.join("rmsk");
    std::fs::create_dir_all(&linkdir)?;

    writeln!(w, "track repeatMasker")?;
    writeln!(w, "compositeTrack on")?;
    writeln!(w, "shortLabel RepeatMasker")?;
    writeln!(w, "longLabel Repeating Elements by RepeatMasker")?;
    writeln!(w, "group varRep")?;
    writeln!(w, "priority 1")?;
    writeln!(w, "visibility dense")?;
    writeln!(w, "type bed 3 .")?;
    writeln!(w, "noInherit on")?;
    writeln!(w, "html ../documentation/rmsk")?;
    writeln!(w)?;

    for (i, file) in files.iter().enumerate() {
        crate::symlink_abs(&rmsk_genome_dir.join(file), &linkdir.join(file))?;
        let class = file.trim_end_matches(".bb");

        writeln!(w, "\ttrack repeatMasker{}", track_name(class))?;
        writeln!(w, "\tparent repeatMasker")?;
        writeln!(w, "\tshortLabel {}", class)?;
        writeln!(w, "\tlongLabel {} Repeating Elements by RepeatMasker", class)?;
        writeln!(w, "\tpriority {}", i + 1)?;
        writeln!(w, "\tspectrum on")?;
        writeln!(w, "\tmaxWindowToDraw 10000000")?;
        writeln!(w, "\tcolorByStrand 50,50,150 150,50,50")?;
        writeln!(w, "\ttype {}", bigbed_type(&rmsk_genome_dir.join(file)))?;
        writeln!(w, "\tbigDataUrl rmsk/{}", file)?;
        writeln!(w)?;
    }
    Ok(())
}

/// Some source subdirectory of `dir` holds a `<genome>.<ext>` file.
pub fn has_files(genome: &str, dir: &Path, ext: &str) -> bool {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return false,
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| e.path().join(format!("{}.{}", genome, ext)).exists())
}

/// Source subdirectories of an annotation directory: listed genomes first,
/// in the given order, then any other subdirectory by name.
pub fn source_dirs(dir: &Path, genomes: &[String]) -> Vec<String> {
    let mut subdirs: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => return Vec::new(),
    };
    subdirs.sort_by_key(|d| {
        (
            genomes.iter().position(|g| g == d).unwrap_or(usize::MAX),
            d.clone(),
        )
    });
    subdirs
}

/// `type` line for a bigBed file, read from its header.
///
/// Falls back to `bigBed 3 +` for anything that is not a readable bigBed.
pub fn bigbed_type(path: &Path) -> String {
    let mut header = [0u8; 36];
    let ok = std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .is_ok();

    let u16_at = |i: usize| u16::from_le_bytes([header[i], header[i + 1]]);
    if !ok || u32::from_le_bytes([header[0], header[1], header[2], header[3]]) != BIGBED_MAGIC {
        return "bigBed 3 +".to_string();
    }

    let field_count = u16_at(32);
    let defined = u16_at(34);
    if field_count > defined {
        format!("bigBed {} +", defined)
    } else {
        format!("bigBed {}", defined)
    }
}

fn url_from_genome(outdir: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(outdir).unwrap_or(file);
    format!("../{}", rel.display())
}

/// bigBed tracks of one annotation directory lifted onto `cur`.
///
/// Composite subtracks are indented and tagged for the hub's composite track;
/// otherwise each source becomes a standalone track in the annotation's group.
#[allow(clippy::too_many_arguments)]
pub fn bigbeds<W: Write + ?Sized>(
    w: &mut W,
    dir: &Path,
    outdir: &Path,
    genomes: &[String],
    cur: &str,
    names: &ProperNames,
    composite: bool,
) -> anyhow::Result<()> {
    let annotation = crate::dir_basename(&dir.display().to_string());
    let prefix = if composite { "\t\t" } else { "" };

    for src in source_dirs(dir, genomes) {
        let file = dir.join(&src).join(format!("{}.bb", cur));
        if !file.exists() {
            continue;
        }

        writeln!(w, "{}track {}{}", prefix, track_name(&annotation), track_name(&src))?;
        writeln!(w, "{}longLabel {} {}", prefix, names.get(&src), annotation)?;
        writeln!(w, "{}shortLabel {} {}", prefix, names.get(&src), annotation)?;
        writeln!(w, "{}bigDataUrl {}", prefix, url_from_genome(outdir, &file))?;
        writeln!(w, "{}type {}", prefix, bigbed_type(&file))?;
        if composite {
            writeln!(
                w,
                "{}subGroups view={} orgs={}",
                prefix,
                track_name(&annotation),
                track_name(&src)
            )?;
            writeln!(w, "{}parent hubCentral{}", prefix, track_name(&annotation))?;
        } else {
            writeln!(w, "{}group {}", prefix, track_name(&annotation))?;
            writeln!(w, "{}visibility dense", prefix)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// bigWig subtracks of one annotation directory lifted onto `cur`.
pub fn bigwigs<W: Write + ?Sized>(
    w: &mut W,
    dir: &Path,
    outdir: &Path,
    genomes: &[String],
    cur: &str,
    names: &ProperNames,
) -> anyhow::Result<()> {
    let annotation = crate::dir_basename(&dir.display().to_string());

    for src in source_dirs(dir, genomes) {
        let file = dir.join(&src).join(format!("{}.bw", cur));
        if !file.exists() {
            continue;
        }

        writeln!(w, "\t\ttrack {}{}", track_name(&annotation), track_name(&src))?;
        writeln!(w, "\t\tlongLabel {} {}", names.get(&src), annotation)?;
        writeln!(w, "\t\tshortLabel {} {}", names.get(&src), annotation)?;
        writeln!(w, "\t\tbigDataUrl {}", url_from_genome(outdir, &file))?;
        writeln!(w, "\t\ttype bigWig")?;
        writeln!(w, "\t\tautoScale On")?;
        writeln!(w, "\t\tmaxHeightPixels 128:36:16")?;
        writeln!(
            w,
            "\t\tsubGroups view={} orgs={}",
            track_name(&annotation),
            track_name(&src)
        )?;
        writeln!(w, "\t\tparent hubCentral{}", track_name(&annotation))?;
        writeln!(w)?;
    }
    Ok(())
}

/// Header of the `hubCentral` composite track holding annotations and snakes.
pub fn composite_start<W: Write + ?Sized>(
    w: &mut W,
    opts: &HubOptions,
    bigbed_dirs: &[std::path::PathBuf],
    bigwig_dirs: &[std::path::PathBuf],
    genomes: &[String],
) -> anyhow::Result<()> {
    let mut views = vec!["Snake=Alignments".to_string()];
    for dir in bigbed_dirs.iter().chain(bigwig_dirs.iter()) {
        let annotation = crate::dir_basename(&dir.display().to_string());
        views.push(format!("{}={}", track_name(&annotation), track_name(&annotation)));
    }

    let orgs: Vec<String> = genomes
        .iter()
        .map(|g| {
            format!(
                "{}={}",
                track_name(g),
                opts.proper_names.get(g).replace(' ', "_")
            )
        })
        .collect();

    let doc_prefix = match &opts.url {
        Some(url) => format!("{}/documentation", url.trim_end_matches('/')),
        None => "../documentation".to_string(),
    };

    writeln!(w, "track hubCentral")?;
    writeln!(w, "compositeTrack on")?;
    writeln!(w, "shortLabel {}", opts.short_label)?;
    writeln!(w, "longLabel {}", opts.long_label)?;
    writeln!(w, "group comphub")?;
    writeln!(w, "subGroup1 view Track_Type {}", views.join(" "))?;
    writeln!(w, "subGroup2 orgs Organisms {}", orgs.join(" "))?;
    writeln!(w, "dragAndDrop subTracks")?;
    writeln!(w, "dimensions dimensionX=view dimensionY=orgs")?;
    writeln!(w, "noInherit on")?;
    writeln!(w, "priority 0")?;
    writeln!(w, "centerLabelsDense on")?;
    writeln!(w, "visibility full")?;
    writeln!(w, "html {}/hubCentral", doc_prefix)?;
    writeln!(w, "type bigBed 3")?;
    writeln!(w)?;
    Ok(())
}

/// A view of the composite track; `name` also names its track.
pub fn composite_subtrack<W: Write + ?Sized>(
    w: &mut W,
    name: &str,
    view: &str,
    visibility: &str,
) -> anyhow::Result<()> {
    writeln!(w, "\ttrack hubCentral{}", track_name(name))?;
    writeln!(w, "\tshortLabel {}", name)?;
    writeln!(w, "\tview {}", track_name(view))?;
    writeln!(w, "\tvisibility {}", visibility)?;
    writeln!(w, "\tsubTrack hubCentral")?;
    writeln!(w)?;
    Ok(())
}

/// One halSnake track per genome other than `cur`; `neighbors` are shown.
pub fn snakes<W: Write + ?Sized>(
    w: &mut W,
    hal_url: &str,
    genomes: &[String],
    neighbors: &[String],
    cur: &str,
    names: &ProperNames,
    snp_width: Option<u64>,
) -> anyhow::Result<()> {
    for (i, genome) in genomes.iter().enumerate() {
        if genome == cur {
            continue;
        }
        let name = names.get(genome);

        writeln!(w, "\t\ttrack snake{}", track_name(genome))?;
        writeln!(w, "\t\tlongLabel {}", name)?;
        writeln!(w, "\t\tshortLabel {}", name)?;
        writeln!(w, "\t\totherSpecies {}", genome)?;
        if neighbors.contains(genome) {
            writeln!(w, "\t\tvisibility full")?;
            writeln!(w, "\t\tparent hubCentralAlignments on")?;
        } else {
            writeln!(w, "\t\tvisibility hide")?;
            writeln!(w, "\t\tparent hubCentralAlignments off")?;
        }
        writeln!(w, "\t\tpriority {}", i + 2)?;
        writeln!(w, "\t\tbigDataUrl {}", hal_url)?;
        writeln!(w, "\t\ttype halSnake")?;
        writeln!(w, "\t\tgroup snake")?;
        writeln!(w, "\t\tsubGroups view=Snake orgs={}", track_name(genome))?;
        if let Some(width) = snp_width {
            writeln!(w, "\t\tshowSnpWidth {}", width)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_gc_and_alignability() {
        let mut out: Vec<u8> = vec![];
        gc_percent(&mut out, "human").unwrap();
        alignability(&mut out, "human", 4).unwrap();
        let text = to_string(out);

        assert!(text.starts_with("track gcPercent\n"));
        assert!(text.contains("bigDataUrl human.gc.bw\n"));
        assert!(text.contains("type bigWig 0 4\n"));
        assert!(text.contains("viewLimits 0:4\n"));
        assert!(text.ends_with("html ../documentation/alignability\n\n"));
    }

    #[test]
    fn test_snakes() {
        let genomes: Vec<String> = ["human", "chimp", "gorilla"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let neighbors = vec!["chimp".to_string()];

        let mut out: Vec<u8> = vec![];
        snakes(
            &mut out,
            "../aln.hal",
            &genomes,
            &neighbors,
            "human",
            &ProperNames::default(),
            Some(9),
        )
        .unwrap();
        let text = to_string(out);
        let stanzas: Vec<&str> = text.trim_end().split("\n\n").collect();

        assert_eq!(stanzas.len(), 2);
        assert!(stanzas[0].contains("\t\ttrack snakechimp\n"));
        assert!(stanzas[0].contains("\t\tvisibility full\n\t\tparent hubCentralAlignments on\n"));
        assert!(stanzas[0].contains("\t\tpriority 3\n"));
        assert!(stanzas[1].contains("\t\tvisibility hide\n"));
        assert!(stanzas[1].contains("\t\tpriority 4\n"));
        assert!(stanzas[1].ends_with("\t\tshowSnpWidth 9"));
    }

    #[test]
    fn test_composite_start() {
        let mut opts = HubOptions::new("apes");
        opts.url = Some("http://example.org/hub/".to_string());

        let mut out: Vec<u8> = vec![];
        composite_start(
            &mut out,
            &opts,
            &[std::path::PathBuf::from("out/liftoverbeds/genes")],
            &[],
            &["human".to_string(), "Anc-1".to_string()],
        )
        .unwrap();
        let text = to_string(out);

        assert!(text.contains("subGroup1 view Track_Type Snake=Alignments genes=genes\n"));
        assert!(text.contains("subGroup2 orgs Organisms human=human Anc_1=Anc-1\n"));
        assert!(text.contains("html http://example.org/hub/documentation/hubCentral\n"));
    }

    #[test]
    fn test_bigbeds_and_has_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let outdir = tmp.path();
        let dir = outdir.join("liftoverbeds").join("genes");
        for src in ["chimp", "human"] {
            std::fs::create_dir_all(dir.join(src)).unwrap();
            std::fs::write(dir.join(src).join("human.bb"), b"not a bigbed").unwrap();
        }

        assert!(has_files("human", &dir, "bb"));
        assert!(!has_files("chimp", &dir, "bb"));

        let genomes = vec!["human".to_string(), "chimp".to_string()];
        assert_eq!(source_dirs(&dir, &genomes), vec!["human", "chimp"]);

        let mut out: Vec<u8> = vec![];
        bigbeds(&mut out, &dir, outdir, &genomes, "human", &ProperNames::default(), true).unwrap();
        let text = to_string(out);

        assert!(text.starts_with("\t\ttrack geneshuman\n"));
        assert!(text.contains("\t\tbigDataUrl ../liftoverbeds/genes/chimp/human.bb\n"));
        assert!(text.contains("\t\ttype bigBed 3 +\n"));
        assert!(text.contains("\t\tparent hubCentralgenes\n"));
    }

    #[test]
    fn test_bigbed_type() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("x.bb");

        let mut header = vec![0u8; 64];
        header[0..4].copy_from_slice(&BIGBED_MAGIC.to_le_bytes());
        header[32..34].copy_from_slice(&8u16.to_le_bytes());
        header[34..36].copy_from_slice(&6u16.to_le_bytes());
        std::fs::write(&path, &header).unwrap();
        assert_eq!(bigbed_type(&path), "bigBed 6 +");

        header[32..34].copy_from_slice(&6u16.to_le_bytes());
        std::fs::write(&path, &header).unwrap();
        assert_eq!(bigbed_type(&path), "bigBed 6");
    }
}
