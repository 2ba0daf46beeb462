use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

// Shell stand-ins for the HAL and UCSC tools, enough for a small alignment of
// human and chimp under an empty ancestor.
const STUBS: &[(&str, &str)] = &[
    (
        "halStats",
        r#"case "$1" in
  --genomes) echo "Anc0 human chimp" ;;
  --tree) echo "(human:0.1,chimp:0.2)Anc0;" ;;
  --sequenceStats)
    echo "SequenceName, Length, NumTopSegments, NumBottomSegments"
    if [ "$2" != "Anc0" ]; then
      echo "$2.chr1, 5000, 10, 0"
      echo "$2.chr2, 300, 2, 0"
    fi ;;
  --chromSizes) printf "%s.chr1\t5000\n%s.chr2\t300\n" "$2" "$2" ;;
esac"#,
    ),
    (
        "hal2fasta",
        r#"printf ">%s.chr1\nACGTACGT\n>%s.chr2\nTTTT\n" "$4" "$4" > "$2""#,
    ),
    ("faToTwoBit", r#"cp "$1" "$2""#),
    ("hgGcPercent", r#"printf "variableStep chrom=chr1\n1 40\n""#),
    ("wigToBigWig", r#"cp "$1" "$3""#),
    ("halLiftover", r#"sed "s/^chr/$4.chr/" "$3" > "$5""#),
    ("bedToBigBed", r#"cp "$2" "$4""#),
    (
        "halWiggleLiftover",
        r#"sed "s/chrom=/chrom=$4./" "$3" > "$5""#,
    ),
];

fn stub_bin(dir: &Path) -> anyhow::Result<PathBuf> {
    let bin = dir.join("bin");
    fs::create_dir_all(&bin)?;
    for (name, body) in STUBS {
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(bin)
}

fn path_with(bin: &Path) -> String {
    format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default())
}

fn fake_hal(dir: &Path) -> anyhow::Result<PathBuf> {
    let hal = dir.join("aln.hal");
    fs::write(&hal, "not really a hal file")?;
    Ok(hal)
}

#[test]
fn command_build_help() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("hal2hub")?;
    let output = cmd.arg("build").arg("--help").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("Builds an assembly hub from a HAL alignment"));
    assert!(stdout.contains("--cladeExclusive"));
    Ok(())
}

#[test]
fn command_build_basic() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--email")
        .arg("me@example.org")
        .assert()
        .success()
        .stderr(predicate::str::contains("genome Anc0 contains 0 sequence"));

    let hub = fs::read_to_string(outdir.join("hub.txt"))?;
    assert!(hub.starts_with("hub aln\nshortLabel aln\nlongLabel aln\n"));
    assert!(hub.contains("email me@example.org\n"));

    let genomes = fs::read_to_string(outdir.join("genomes.txt"))?;
    assert!(genomes.contains("genome chimp\n"));
    assert!(genomes.contains("genome human\n"));
    assert!(!genomes.contains("Anc0"));
    assert!(genomes.contains("defaultPos chr1:1-1000\n"));
    // ordered by name
    assert!(genomes.find("genome chimp").unwrap() < genomes.find("genome human").unwrap());

    assert_eq!(
        fs::read_to_string(outdir.join("human/chrom.sizes"))?,
        "chr1\t5000\nchr2\t300\n"
    );
    assert_eq!(
        fs::read_to_string(outdir.join("human/human.2bit"))?,
        ">chr1\nACGTACGT\n>chr2\nTTTT\n"
    );
    assert!(outdir.join("haltree.nw").exists());
    assert!(outdir.join("aln.hal").exists());
    assert!(outdir.join("groups.txt").exists());
    assert!(outdir.join("documentation/hub.html").exists());
    assert!(outdir.join("chimp/description.html").exists());

    let trackdb = fs::read_to_string(outdir.join("human/trackDb.txt"))?;
    assert!(trackdb.contains("track hubCentral\n"));
    assert!(trackdb.contains("\t\ttrack snakechimp\n"));
    assert!(trackdb.contains("\t\tbigDataUrl ../aln.hal\n"));
    assert!(!trackdb.contains("snakehuman"));
    assert!(!trackdb.contains("gcPercent"));
    // the only other leaf is a sibling, shown
    assert!(trackdb.contains("\t\tvisibility full\n\t\tparent hubCentralAlignments on\n"));
    assert!(!trackdb.contains("visibility hide"));

    Ok(())
}

#[test]
fn command_build_no_ucsc_names() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--noUcscNames")
        .arg("--hub")
        .arg("apes")
        .arg("--genomes")
        .arg("chimp")
        .assert()
        .success();

    assert!(fs::read_to_string(outdir.join("hub.txt"))?.starts_with("hub apes\n"));
    assert_eq!(
        fs::read_to_string(outdir.join("chimp/chrom.sizes"))?,
        "chimp.chr1\t5000\nchimp.chr2\t300\n"
    );
    assert!(!outdir.join("human").exists());

    Ok(())
}

#[test]
fn command_build_gc_content() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--gcContent")
        .arg("--maxThreads")
        .arg("2")
        .assert()
        .success();

    assert!(outdir.join("human/human.gc.bw").exists());
    assert!(outdir.join("chimp/chimp.gc.bw").exists());
    assert!(!outdir.join("human/human.gc.wigVarStep.gz").exists());
    assert!(outdir.join("documentation/gcPercent.html").exists());

    let trackdb = fs::read_to_string(outdir.join("chimp/trackDb.txt"))?;
    assert!(trackdb.starts_with("track gcPercent\n"));
    assert!(trackdb.contains("bigDataUrl chimp.gc.bw\n"));

    Ok(())
}

#[test]
fn command_build_bed_liftover() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let genes = tempdir.path().join("genes");
    fs::create_dir_all(genes.join("human"))?;
    fs::write(
        genes.join("human/genes.bed"),
        "chr2\t5\t9\tgeneB\nchr1\t10\t20\tgeneA\n",
    )?;

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--bedDirs")
        .arg(&genes)
        .assert()
        .success();

    let lifted = outdir.join("liftoverbeds/genes/human");
    // sorted, and lifted names renamed back to browser names
    assert_eq!(
        fs::read_to_string(lifted.join("chimp.bb"))?,
        "chr1\t10\t20\tgeneA\nchr2\t5\t9\tgeneB\n"
    );
    assert_eq!(
        fs::read_to_string(lifted.join("human.bb"))?,
        "chr1\t10\t20\tgeneA\nchr2\t5\t9\tgeneB\n"
    );

    let groups = fs::read_to_string(outdir.join("groups.txt"))?;
    assert!(groups.contains("name genes\nlabel genes\n"));

    let trackdb = fs::read_to_string(outdir.join("chimp/trackDb.txt"))?;
    assert!(trackdb.contains("\ttrack hubCentralgenes\n"));
    assert!(trackdb.contains("../liftoverbeds/genes/human/chimp.bb"));

    Ok(())
}

#[test]
fn command_build_no_bed_liftover() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let genes = tempdir.path().join("genes");
    fs::create_dir_all(genes.join("human"))?;
    fs::write(genes.join("human/genes.bed"), "chr1\t10\t20\tgeneA\n")?;

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--bedDirs")
        .arg(&genes)
        .arg("--noBedLiftover")
        .assert()
        .success();

    let lifted = outdir.join("liftoverbeds/genes/human");
    assert!(lifted.join("human.bb").exists());
    assert!(!lifted.join("chimp.bb").exists());

    let trackdb = fs::read_to_string(outdir.join("chimp/trackDb.txt"))?;
    assert!(!trackdb.contains("hubCentralgenes"));

    Ok(())
}

#[test]
fn command_build_wig_liftover() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let cov = tempdir.path().join("cov");
    fs::create_dir_all(cov.join("human"))?;
    fs::write(
        cov.join("human/cov.wig"),
        "fixedStep chrom=chr1 start=1 step=1\n1\n2\n",
    )?;

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--wigDirs")
        .arg(&cov)
        .assert()
        .success();

    let lifted = outdir.join("liftoverwigs/cov/human");
    assert_eq!(
        fs::read_to_string(lifted.join("chimp.bw"))?,
        "fixedStep chrom=chr1 start=1 step=1\n1\n2\n"
    );
    assert!(lifted.join("human.bw").exists());

    let trackdb = fs::read_to_string(outdir.join("chimp/trackDb.txt"))?;
    assert!(trackdb.contains("\ttrack hubCentralcov\n\tshortLabel cov\n\tview cov\n\tvisibility dense\n"));
    assert!(trackdb.contains("\t\tbigDataUrl ../liftoverwigs/cov/human/chimp.bw\n"));

    Ok(())
}

#[test]
fn command_build_lod_precomputed() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let levels = tempdir.path().join("levels");
    fs::create_dir_all(levels.join("lod"))?;
    fs::write(levels.join("lod/aln_250.hal"), "")?;
    fs::write(levels.join("lod.txt"), "0 aln.hal\n250 lod/aln_250.hal\n")?;

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--lodTxtFile")
        .arg(levels.join("lod.txt"))
        .arg("--lodDir")
        .arg(levels.join("lod"))
        .arg("--snpWidth")
        .arg("5000")
        .assert()
        .success();

    assert!(outdir.join("lod.txt").exists());
    assert!(outdir.join("lod/aln_250.hal").exists());

    // the levels decide the snp width
    let trackdb = fs::read_to_string(outdir.join("human/trackDb.txt"))?;
    assert!(trackdb.contains("\t\tbigDataUrl ../lod.txt\n"));
    assert!(trackdb.contains("\t\tshowSnpWidth 249\n"));
    assert!(!trackdb.contains("showSnpWidth 5000"));

    Ok(())
}

#[test]
fn command_build_relinks_hal() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let other = tempdir.path().join("other");
    fs::create_dir_all(&other)?;
    let other_hal = fake_hal(&other)?;

    for input in [&other_hal, &hal] {
        let mut cmd = Command::cargo_bin("hal2hub")?;
        cmd.env("PATH", path_with(&bin))
            .arg("build")
            .arg(input)
            .arg(&outdir)
            .assert()
            .success();
    }

    assert_eq!(fs::read_link(outdir.join("aln.hal"))?, hal);

    Ok(())
}

#[test]
fn command_build_missing_tool() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    fs::remove_file(bin.join("faToTwoBit"))?;
    let hal = fake_hal(tempdir.path())?;

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", &bin)
        .arg("build")
        .arg(&hal)
        .arg(tempdir.path().join("hub"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("faToTwoBit not found in PATH"));

    Ok(())
}

#[test]
fn command_build_bad_options() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;
    let bin = stub_bin(tempdir.path())?;
    let hal = fake_hal(tempdir.path())?;
    let outdir = tempdir.path().join("hub");

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(tempdir.path().join("missing.hal"))
        .arg(&outdir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--bedDirs")
        .arg(tempdir.path().join("no-such-dir"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    let regions = tempdir.path().join("regions.bed");
    fs::write(&regions, "chr1\t0\t100\n")?;
    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--conservation")
        .arg(&regions)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--conservationGenomeName"));

    // a listed genome missing from the tree
    let nwk = tempdir.path().join("other.nwk");
    fs::write(&nwk, "(human,gorilla)Anc0;\n")?;
    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&outdir)
        .arg("--tree")
        .arg(&nwk)
        .arg("--genomes")
        .arg("human,chimp")
        .assert()
        .failure()
        .stderr(predicate::str::contains("genome chimp is not in the tree"));

    // outdir is a file
    let mut cmd = Command::cargo_bin("hal2hub")?;
    cmd.env("PATH", path_with(&bin))
        .arg("build")
        .arg(&hal)
        .arg(&regions)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));

    Ok(())
}
