use super::HubOptions;
use std::io::Write;
use std::path::Path;

const HUB_HTML: &str = r###"<h2>Description</h2>
<p>This assembly hub was generated from a HAL multiple genome alignment.
Each genome of the alignment is browsable as a reference, with the other
genomes displayed as snake tracks.</p>
"###;

const HUB_CENTRAL_HTML: &str = r###"<h2>Description</h2>
<p>The composite track groups the alignment snakes with the annotation tracks
lifted over from every genome. Rows are organisms, columns are track types.</p>
<h2>Display Conventions</h2>
<p>Snake tracks show the other genome as a series of colored blocks. Lines
between blocks mark adjacencies; red tick marks denote substitutions at high
zoom. Annotation subtracks show features lifted onto the current genome.</p>
"###;

const GC_PERCENT_HTML: &str = r###"<h2>Description</h2>
<p>The GC percent track shows the percentage of G (guanine) and C (cytosine)
bases in 5-base windows. High GC content is typical of gene-rich areas.</p>
<h2>Methods</h2>
<p>Computed with <em>hgGcPercent</em> over the genome's 2bit sequence and
converted with <em>wigToBigWig</em>.</p>
"###;

const ALIGNABILITY_HTML: &str = r###"<h2>Description</h2>
<p>Number of genomes, including ancestors, aligned to each base.</p>
<h2>Methods</h2>
<p>Computed with <em>halAlignability</em>.</p>
"###;

const CONSERVATION_HTML: &str = r###"<h2>Description</h2>
<p>PhyloP scores from the alignment. Positive scores denote conservation,
negative scores faster-than-neutral evolution.</p>
<h2>Methods</h2>
<p>A neutral model is trained with <em>halPhyloPTrain.py</em> and scores are
computed along the tree with <em>halTreePhyloP.py</em>.</p>
"###;

const RMSK_HTML: &str = r###"<h2>Description</h2>
<p>Interspersed repeats and low complexity sequence annotated by
RepeatMasker, one subtrack per repeat class.</p>
"###;

/// Html pages referenced by `html` lines of the trackDb files.
pub fn write_doc_files(docdir: &Path, opts: &HubOptions) -> anyhow::Result<()> {
    std::fs::create_dir_all(docdir)?;

    let mut pages = vec![("hub", HUB_HTML), ("hubCentral", HUB_CENTRAL_HTML)];
    if opts.gc_content {
        pages.push(("gcPercent", GC_PERCENT_HTML));
    }
    if opts.alignability {
        pages.push(("alignability", ALIGNABILITY_HTML));
    }
    if opts.has_conservation() {
        pages.push(("conservation", CONSERVATION_HTML));
    }
    if opts.rmsk_dir.is_some() {
        pages.push(("rmsk", RMSK_HTML));
    }

    for (name, html) in pages {
        let path = docdir.join(format!("{}.html", name));
        let mut writer = crate::writer(&path.display().to_string())?;
        writer.write_all(html.as_bytes())?;
        writer.flush()?;
    }
    Ok(())
}
