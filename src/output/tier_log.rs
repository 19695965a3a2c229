// Per-tier host logs — one append-only file per tier.
//
// Files are named `<tier>_v<version>.log` so logs written by different
// releases (and therefore different models) never mix.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub struct TierLog {
    dir: PathBuf,
    files: HashMap<String, BufWriter<File>>,
}

impl TierLog {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            files: HashMap::new(),
        })
    }

    pub fn path_for(&self, tier: &str) -> PathBuf {
        self.dir
            .join(format!("{tier}_v{}.log", env!("CARGO_PKG_VERSION")))
    }

    /// Append `host` to the tier's file, opening it on first use.
    pub fn append(&mut self, tier: &str, host: &str) -> Result<()> {
        if !self.files.contains_key(tier) {
            let path = self.path_for(tier);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open tier log {}", path.display()))?;
            self.files.insert(tier.to_string(), BufWriter::new(file));
        }
        if let Some(writer) = self.files.get_mut(tier) {
            writeln!(writer, "{host}")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for writer in self.files.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_writes_one_host_per_line() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = TierLog::new(tmp.path()).unwrap();
        log.append("high", "a.tk").unwrap();
        log.append("high", "b.tk").unwrap();
        log.append("low", "c.com").unwrap();
        log.flush().unwrap();

        let high = fs::read_to_string(log.path_for("high")).unwrap();
        assert_eq!(high, "a.tk\nb.tk\n");
        assert!(log
            .path_for("low")
            .to_string_lossy()
            .ends_with(&format!("low_v{}.log", env!("CARGO_PKG_VERSION"))));
    }
}
