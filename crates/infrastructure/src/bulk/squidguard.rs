use crate::redirector::framer::decode_line;
use squid_tagger_domain::DomainError;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SITE_HEADER;

/// One converted row. `site` is empty for `expressions` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquidGuardEntry {
    pub site: String,
    pub tags: BTreeSet<String>,
    pub regexp: Option<String>,
}

#[derive(Clone, Copy)]
enum ListKind {
    Domains,
    Urls,
    Expressions,
}

impl ListKind {
    fn from_file_name(name: &str) -> Option<Self> {
        match name {
            "domains" => Some(Self::Domains),
            "urls" => Some(Self::Urls),
            "expressions" => Some(Self::Expressions),
            _ => None,
        }
    }
}

/// Convert a SquidGuard database directory. The tag of every list is its
/// directory path relative to `root`; entries repeated under several tags
/// are merged.
pub fn convert_directory(root: &Path) -> Result<Vec<SquidGuardEntry>, DomainError> {
    let mut merged: BTreeMap<(String, Option<String>), BTreeSet<String>> = BTreeMap::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }

            let Some(kind) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(ListKind::from_file_name)
            else {
                continue;
            };

            let tag = relative_tag(root, &dir);
            if tag.is_empty() {
                warn!(file = %path.display(), "List outside any category directory; skipping");
                continue;
            }

            let contents = fs::read(&path)?;
            let mut entries = 0usize;
            for raw in contents.split(|&b| b == b'\n') {
                let line = decode_line(raw);
                let Some((site, regexp)) = convert_line(kind, line.trim()) else {
                    continue;
                };
                merged.entry((site, regexp)).or_default().insert(tag.clone());
                entries += 1;
            }
            debug!(file = %path.display(), tag, entries, "SquidGuard list converted");
        }
    }

    Ok(merged
        .into_iter()
        .map(|((site, regexp), tags)| SquidGuardEntry { site, tags, regexp })
        .collect())
}

fn relative_tag(root: &Path, dir: &Path) -> String {
    dir.strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn convert_line(kind: ListKind, line: &str) -> Option<(String, Option<String>)> {
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    Some(match kind {
        ListKind::Domains => (line.to_string(), None),
        ListKind::Urls => {
            let (site, path) = line.split_once('/').unwrap_or((line, ""));
            (site.to_string(), Some(format!("^/{}", fancy_regex::escape(path))))
        }
        ListKind::Expressions => (String::new(), Some(line.to_string())),
    })
}

pub fn write_csv<W: Write>(output: W, entries: &[SquidGuardEntry]) -> Result<(), DomainError> {
    let mut writer = csv::Writer::from_writer(output);
    let csv_error = |e: csv::Error| DomainError::CsvError(e.to_string());
    writer.write_record(SITE_HEADER).map_err(csv_error)?;

    for entry in entries {
        let tags = entry.tags.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        let tags = format!("{{{tags}}}");
        writer
            .write_record([
                entry.site.as_str(),
                tags.as_str(),
                entry.regexp.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }

    writer.flush()?;
    Ok(())
}
