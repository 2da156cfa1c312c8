use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::objects::ObjectStore;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

static CHAPTER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:chapter|ch|episode|ep)[\s\-_]*").expect("chapter label regex is valid")
});
static CHAPTER_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("chapter number regex is valid"));

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("stage archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("read archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub chapters: BTreeMap<String, Vec<String>>,
    /// Archive entries that could not be read or uploaded.
    pub skipped: Vec<String>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.chapters.values().map(Vec::len).sum()
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// One top-level directory of the archive and the image entries under it,
/// already in natural order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterGroup {
    pub directory: String,
    pub key: String,
    pub entries: Vec<String>,
}

pub struct IngestionPipeline {
    objects: Arc<dyn ObjectStore>,
}

impl IngestionPipeline {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Splits an archive into chapters and uploads every page.
    ///
    /// Per-page failures are recorded in `skipped` and do not abort the
    /// chapter; a chapter with no uploaded pages is left out. The archive is
    /// staged in a temp file that is removed on every return path.
    pub async fn ingest(&self, archive: Vec<u8>, slug: &str) -> Result<IngestReport, IngestError> {
        let (staged, groups) = tokio::task::spawn_blocking(move || stage_archive(&archive)).await??;
        tracing::info!(slug, groups = groups.len(), "ingesting archive");

        let mut report = IngestReport::default();
        for group in groups {
            let path = staged.path().to_path_buf();
            let entries = group.entries.clone();
            let pages = tokio::task::spawn_blocking(move || read_entries(path, &entries)).await??;

            let mut references = Vec::with_capacity(pages.len());
            for (entry, bytes) in pages {
                let bytes = match bytes {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::warn!(entry = %entry, ?err, "failed to read archive entry; skipping");
                        report.skipped.push(entry);
                        continue;
                    }
                };
                let filename = entry.rsplit('/').next().unwrap_or(&entry).to_owned();
                let caption = format!("Page for {slug} Chapter {}", group.key);
                match self.objects.upload(bytes, &filename, &caption).await {
                    Ok(reference) => references.push(reference),
                    Err(err) => {
                        tracing::warn!(entry = %entry, ?err, "failed to upload page; skipping");
                        report.skipped.push(entry);
                    }
                }
            }

            if references.is_empty() {
                tracing::warn!(directory = %group.directory, "no pages uploaded; dropping chapter");
                continue;
            }
            tracing::info!(chapter = %group.key, pages = references.len(), "chapter ingested");
            if report.chapters.insert(group.key.clone(), references).is_some() {
                tracing::warn!(chapter = %group.key, directory = %group.directory, "duplicate chapter key in archive; later directory wins");
            }
        }

        Ok(report)
    }
}

fn stage_archive(archive: &[u8]) -> Result<(tempfile::NamedTempFile, Vec<ChapterGroup>), IngestError> {
    let mut staged = tempfile::Builder::new()
        .prefix("shelfbot-")
        .suffix(".zip")
        .tempfile()?;
    staged.write_all(archive)?;
    staged.flush()?;

    let zip = zip::ZipArchive::new(staged.reopen()?)?;
    let groups = group_entries(zip.file_names());
    Ok((staged, groups))
}

fn read_entries(
    path: PathBuf,
    entries: &[String],
) -> Result<Vec<(String, Result<Vec<u8>, zip::result::ZipError>)>, IngestError> {
    let mut zip = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    let mut pages = Vec::with_capacity(entries.len());
    for entry in entries {
        let bytes = zip.by_name(entry).and_then(|mut file| {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            Ok(buf)
        });
        pages.push((entry.clone(), bytes));
    }
    Ok(pages)
}

/// Groups entry names by top-level directory. Files at the archive root,
/// directory entries, hidden files, `__MACOSX` metadata and non-images are
/// ignored.
pub fn group_entries<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ChapterGroup> {
    let mut by_directory: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        if name.ends_with('/') {
            continue;
        }
        let Some((directory, _)) = name.split_once('/') else {
            continue;
        };
        if directory.is_empty() || directory == "__MACOSX" {
            continue;
        }
        let filename = name.rsplit('/').next().unwrap_or(name);
        if filename.starts_with('.') || !is_image(filename) {
            tracing::debug!(entry = name, "skipping non-page archive entry");
            continue;
        }
        by_directory
            .entry(directory.to_owned())
            .or_default()
            .push(name.to_owned());
    }

    let mut groups = by_directory
        .into_iter()
        .map(|(directory, mut entries)| {
            entries.sort_by(|a, b| natural_cmp(a, b));
            ChapterGroup {
                key: chapter_key(&directory),
                directory,
                entries,
            }
        })
        .collect::<Vec<_>>();
    groups.sort_by(|a, b| natural_cmp(&a.directory, &b.directory));
    groups
}

pub fn is_image(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Chapter key for a directory name: drop a leading "chapter"/"ch"/
/// "episode"/"ep" label, then take the first integer or decimal. Falls back
/// to the directory name unchanged.
pub fn chapter_key(directory: &str) -> String {
    let lowered = directory.to_lowercase();
    let stripped = CHAPTER_LABEL.replace(&lowered, "");
    match CHAPTER_NUMBER.find(&stripped) {
        Some(number) => number.as_str().to_owned(),
        None => directory.to_owned(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn runs(s: &str) -> Vec<Run<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;
    for (idx, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(current) if current != digit => {
                out.push(run(&s[start..idx], current));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(current) = in_digits {
        out.push(run(&s[start..], current));
    }
    out
}

fn run(text: &str, digits: bool) -> Run<'_> {
    if digits {
        Run::Digits(text)
    } else {
        Run::Text(text)
    }
}

fn compare_runs(a: Run<'_>, b: Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Digits(x), Run::Digits(y)) => {
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        }
        (Run::Text(x), Run::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Run::Digits(_), Run::Text(_)) => Ordering::Less,
        (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
    }
}

/// Natural ordering: digit runs compare numerically, text runs
/// case-insensitively, so `page2` sorts before `page10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = runs(a);
    let right = runs(b);
    for (x, y) in left.iter().zip(right.iter()) {
        let ord = compare_runs(*x, *y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}
