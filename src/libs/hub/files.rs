use super::{HubOptions, ProperNames};
use crate::libs::hal::{longest_seq, Genome2Seqs};
use std::io::Write;
use std::path::Path;

pub fn write_hub_file(outdir: &Path, opts: &HubOptions) -> anyhow::Result<()> {
    let mut writer = crate::writer(&outdir.join("hub.txt").display().to_string())?;
    write_hub(&mut writer, opts)?;
    writer.flush()?;
    Ok(())
}

pub fn write_hub<W: Write + ?Sized>(w: &mut W, opts: &HubOptions) -> anyhow::Result<()> {
    writeln!(w, "hub {}", opts.hub)?;
    writeln!(w, "shortLabel {}", opts.short_label)?;
    writeln!(w, "longLabel {}", opts.long_label)?;
    writeln!(w, "genomesFile genomes.txt")?;
    writeln!(w, "email {}", opts.email)?;
    writeln!(w, "descriptionUrl documentation/hub.html")?;
    Ok(())
}

pub fn write_group_file(
    outdir: &Path,
    hub_label: &str,
    annotations: &[String],
    repeats: bool,
) -> anyhow::Result<()> {
    let mut writer = crate::writer(&outdir.join("groups.txt").display().to_string())?;
    write_groups(&mut writer, hub_label, annotations, repeats)?;
    writer.flush()?;
    Ok(())
}

/// Fixed groups first, then one group per annotation input.
pub fn write_groups<W: Write + ?Sized>(
    w: &mut W,
    hub_label: &str,
    annotations: &[String],
    repeats: bool,
) -> anyhow::Result<()> {
    let mut groups: Vec<(String, String, bool)> = vec![
        ("user".to_string(), "Custom".to_string(), true),
        ("map".to_string(), "Mapping".to_string(), false),
        ("comphub".to_string(), hub_label.to_string(), false),
        ("snake".to_string(), "Alignment Snakes".to_string(), false),
    ];
    if repeats {
        groups.push(("varRep".to_string(), "Variation and Repeats".to_string(), false));
    }
    for annotation in annotations {
        groups.push((super::track_name(annotation), annotation.to_string(), true));
    }

    for (i, (name, label, closed)) in groups.iter().enumerate() {
        writeln!(w, "name {}", name)?;
        writeln!(w, "label {}", label)?;
        writeln!(w, "priority {}", i + 1)?;
        writeln!(w, "defaultIsClosed {}", if *closed { 1 } else { 0 })?;
        writeln!(w)?;
    }
    Ok(())
}

pub fn write_description_file(
    genome: &str,
    genomedir: &Path,
    names: &ProperNames,
) -> anyhow::Result<()> {
    let mut writer = crate::writer(&genomedir.join("description.html").display().to_string())?;
    writeln!(writer, "<h2>{}</h2>", names.get(genome))?;
    writeln!(
        writer,
        "<p>Genome <em>{}</em> of this assembly hub. Sequences and tracks are derived from the HAL alignment.</p>",
        genome
    )?;
    writer.flush()?;
    Ok(())
}

/// One stanza per genome, in display-name order.
pub fn write_genomes<W: Write + ?Sized>(
    w: &mut W,
    genomes: &[String],
    genome2seqs: &Genome2Seqs,
    names: &ProperNames,
) -> anyhow::Result<()> {
    for genome in names.sort_genomes(genomes) {
        let seqs = genome2seqs
            .get(&genome)
            .ok_or_else(|| anyhow::anyhow!("No sequences known for genome {}", genome))?;
        let (seq, len) = longest_seq(seqs)
            .ok_or_else(|| anyhow::anyhow!("Genome {} has no sequences", genome))?;

        writeln!(w, "genome {}", genome)?;
        writeln!(w, "twoBitPath {}/{}.2bit", genome, genome)?;
        writeln!(w, "trackDb {}/trackDb.txt", genome)?;
        writeln!(w, "groups groups.txt")?;
        writeln!(w, "htmlPath {}/description.html", genome)?;
        writeln!(w, "description {}", names.get(&genome))?;
        writeln!(w, "organism {}", names.get(&genome))?;
        writeln!(w, "orderKey 4800")?;
        writeln!(w, "scientificName {}", genome)?;
        writeln!(w, "defaultPos {}:1-{}", seq, len.min(1000))?;
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::hal::SeqLens;

    #[test]
    fn test_write_hub() {
        let mut opts = HubOptions::new("primates");
        opts.long_label = "Great apes".to_string();
        opts.email = "me@example.org".to_string();

        let mut out: Vec<u8> = vec![];
        write_hub(&mut out, &opts).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "hub primates\nshortLabel primates\nlongLabel Great apes\ngenomesFile genomes.txt\nemail me@example.org\ndescriptionUrl documentation/hub.html\n"
        );
    }

    #[test]
    fn test_write_groups() {
        let mut out: Vec<u8> = vec![];
        write_groups(&mut out, "Great apes", &["ref-genes".to_string()], false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let stanzas: Vec<&str> = text.trim_end().split("\n\n").collect();

        assert_eq!(stanzas.len(), 5);
        assert_eq!(
            stanzas[2],
            "name comphub\nlabel Great apes\npriority 3\ndefaultIsClosed 0"
        );
        assert_eq!(
            stanzas[4],
            "name ref_genes\nlabel ref-genes\npriority 5\ndefaultIsClosed 1"
        );
    }

    #[test]
    fn test_write_genomes() {
        let mut genome2seqs = Genome2Seqs::new();
        let mut human = SeqLens::new();
        human.insert("chr1".to_string(), 5000);
        human.insert("chr2".to_string(), 8000);
        let mut chimp = SeqLens::new();
        chimp.insert("chr1".to_string(), 700);
        genome2seqs.insert("human".to_string(), human);
        genome2seqs.insert("chimp".to_string(), chimp);

        let genomes = vec!["human".to_string(), "chimp".to_string()];
        let mut out: Vec<u8> = vec![];
        write_genomes(&mut out, &genomes, &genome2seqs, &ProperNames::default()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("genome chimp\ntwoBitPath chimp/chimp.2bit\n"));
        assert!(text.contains("defaultPos chr1:1-700\n"));
        assert!(text.contains("scientificName human\ndefaultPos chr2:1-1000\n\n"));
    }
}
