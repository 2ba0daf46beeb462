use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// ```
/// use std::io::BufRead;
/// let reader = hal2hub::reader("tests/hal2hub/names.tsv").unwrap();
/// assert_eq!(reader.lines().collect::<Vec<_>>().len(), 3);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = Path::new(input);
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .map_err(|e| anyhow::anyhow!("could not create {}: {}", output, e))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Creates a symlink at `link` pointing to the absolute form of `target`.
///
/// A link already pointing there is kept. Any other link or file at `link` is
/// replaced; a directory there is an error.
pub fn symlink_abs(target: &Path, link: &Path) -> anyhow::Result<()> {
    let target = intspan::absolute_path(target)?;
    if let Ok(meta) = link.symlink_metadata() {
        if meta.file_type().is_symlink() {
            if std::fs::read_link(link)? == target {
                return Ok(());
            }
        } else if meta.is_dir() {
            anyhow::bail!("{} exists and is not a link", link.display());
        }
        log::debug!("replace {}", link.display());
        std::fs::remove_file(link)?;
    }
    std::os::unix::fs::symlink(&target, link).map_err(|e| {
        anyhow::anyhow!(
            "could not link {} -> {}: {}",
            link.display(),
            target.display(),
            e
        )
    })?;
    Ok(())
}

/// Basename of a path with any trailing slashes ignored.
///
/// ```
/// assert_eq!(hal2hub::dir_basename("data/genes/"), "genes");
/// assert_eq!(hal2hub::dir_basename("/a/b/aln.hal"), "aln.hal");
/// ```
pub fn dir_basename(path: &str) -> String {
    Path::new(path.trim_end_matches('/'))
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symlink_abs_relinks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = tmp.path().join("old.hal");
        let new = tmp.path().join("new.hal");
        std::fs::write(&old, "old").unwrap();
        std::fs::write(&new, "new").unwrap();

        let link = tmp.path().join("hub.hal");
        symlink_abs(&old, &link).unwrap();
        symlink_abs(&old, &link).unwrap();
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "old");

        // a stale link from an earlier build
        symlink_abs(&new, &link).unwrap();
        assert_eq!(std::fs::read_link(&link).unwrap(), new);
        assert_eq!(std::fs::read_to_string(&link).unwrap(), "new");

        // a plain file is replaced too
        let copied = tmp.path().join("copied.hal");
        std::fs::write(&copied, "copy").unwrap();
        symlink_abs(&new, &copied).unwrap();
        assert_eq!(std::fs::read_to_string(&copied).unwrap(), "new");

        let dir = tmp.path().join("dir");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(symlink_abs(&new, &dir).is_err());
    }
}
