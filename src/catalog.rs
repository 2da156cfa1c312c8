use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Schema tag written into every persisted envelope.
pub const SCHEMA_VERSION: &str = "3.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "cover_file_id")]
    pub cover_reference: Option<String>,
    #[serde(default)]
    pub chapters: BTreeMap<String, Vec<String>>,
}

impl Work {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        cover_reference: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            cover_reference,
            chapters: BTreeMap::new(),
        }
    }

    /// Chapter keys in display order (numeric when parseable, then lexicographic).
    pub fn chapter_keys(&self) -> Vec<String> {
        let mut keys = self.chapters.keys().cloned().collect::<Vec<_>>();
        sort_chapter_keys(&mut keys);
        keys
    }

    pub fn page_count(&self) -> usize {
        self.chapters.values().map(Vec::len).sum()
    }
}

/// The slug -> Work mapping. This is the root aggregate that gets persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    works: BTreeMap<String, Work>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slug: &str) -> Option<&Work> {
        self.works.get(slug)
    }

    pub fn get_mut(&mut self, slug: &str) -> Option<&mut Work> {
        self.works.get_mut(slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.works.contains_key(slug)
    }

    pub fn insert(&mut self, slug: impl Into<String>, work: Work) -> Option<Work> {
        self.works.insert(slug.into(), work)
    }

    pub fn remove(&mut self, slug: &str) -> Option<Work> {
        self.works.remove(slug)
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Work)> {
        self.works.iter()
    }

    pub fn total_chapters(&self) -> usize {
        self.works.values().map(|work| work.chapters.len()).sum()
    }

    pub fn total_pages(&self) -> usize {
        self.works.values().map(Work::page_count).sum()
    }

    /// Whether some work uses `reference` as its cover or as a page.
    pub fn references(&self, reference: &str) -> bool {
        self.works.values().any(|work| {
            work.cover_reference.as_deref() == Some(reference)
                || work
                    .chapters
                    .values()
                    .any(|pages| pages.iter().any(|page| page == reference))
        })
    }

    /// Works sorted by title. Ties keep slug order, so the result is stable.
    pub fn sorted_by_title(&self) -> Vec<(&String, &Work)> {
        let mut works = self.works.iter().collect::<Vec<_>>();
        works.sort_by(|(_, a), (_, b)| a.title.cmp(&b.title));
        works
    }

    /// Case-insensitive exact title lookup.
    pub fn find_by_title(&self, title: &str) -> Option<&str> {
        let wanted = title.trim().to_lowercase();
        self.works
            .iter()
            .find(|(_, work)| work.title.to_lowercase() == wanted)
            .map(|(slug, _)| slug.as_str())
    }
}

/// Derives the slug for a title.
///
/// Lowercases, drops anything that is not a word character, whitespace or
/// hyphen, collapses whitespace/hyphen runs into one hyphen and trims hyphens
/// at both ends. Different titles can map to the same slug; callers do not
/// guard against that.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }
    slug
}

fn numeric_chapter_key(key: &str) -> Option<f64> {
    key.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Display ordering for chapter keys: numeric keys first in numeric order,
/// everything else afterwards in lexicographic order.
pub fn compare_chapter_keys(a: &str, b: &str) -> Ordering {
    match (numeric_chapter_key(a), numeric_chapter_key(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn sort_chapter_keys(keys: &mut [String]) {
    keys.sort_by(|a, b| compare_chapter_keys(a, b));
}

/// Persisted form of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub version: String,
    pub last_updated: f64,
    pub total_comics: usize,
    pub total_chapters: usize,
    pub data: Catalog,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: &'a str,
    last_updated: f64,
    total_comics: usize,
    total_chapters: usize,
    data: &'a Catalog,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("catalog document is empty")]
    Empty,
    #[error("catalog document is not a JSON object")]
    NotAnObject,
    #[error("parse catalog document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes the catalog inside its metadata envelope (pretty-printed JSON).
pub fn encode(catalog: &Catalog, last_updated: f64) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&EnvelopeRef {
        version: SCHEMA_VERSION,
        last_updated,
        total_comics: catalog.len(),
        total_chapters: catalog.total_chapters(),
        data: catalog,
    })
}

/// Parses a persisted document. Accepts the enveloped form as well as the
/// legacy form, which is the bare slug -> Work mapping.
pub fn decode(text: &str) -> Result<Catalog, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Object(mut object) = value else {
        return Err(ParseError::NotAnObject);
    };
    match object.remove("data") {
        Some(data) => Ok(serde_json::from_value(data)?),
        None => Ok(serde_json::from_value(serde_json::Value::Object(object))?),
    }
}

/// Size of a serialized document as the document sink counts it.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let mut demo = Work::new("Demo", "A demo work", Some("cover-1".to_owned()));
        demo.chapters
            .insert("1".to_owned(), vec!["p1".to_owned(), "p2".to_owned()]);
        demo.chapters.insert("2.5".to_owned(), vec!["p3".to_owned()]);
        catalog.insert("demo", demo);
        catalog.insert("empty", Work::new("Empty", "", None));
        catalog
    }

    #[test]
    fn references_match_covers_and_pages() {
        let catalog = sample_catalog();
        assert!(catalog.references("cover-1"));
        assert!(catalog.references("p3"));
        assert!(!catalog.references("p4"));
        assert!(!catalog.references(""));
    }

    #[test]
    fn slugify_matches_expected_shapes() {
        assert_eq!(slugify("My Amazing Comic"), "my-amazing-comic");
        assert_eq!(slugify("  Hello -- World!  "), "hello-world");
        assert_eq!(slugify("Naruto: Part II"), "naruto-part-ii");
        assert_eq!(slugify("snake_case title"), "snake_case-title");
        assert_eq!(slugify("-leading and trailing-"), "leading-and-trailing");
        assert_eq!(slugify("a!b"), "ab");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slugify_is_deterministic_and_may_collide() {
        assert_eq!(slugify("One Piece"), slugify("One Piece"));
        assert_eq!(slugify("One Piece"), slugify("one-piece!"));
    }

    #[test]
    fn chapter_keys_sort_numeric_first() {
        let mut keys = vec![
            "10".to_owned(),
            "2".to_owned(),
            "1.5".to_owned(),
            "x".to_owned(),
        ];
        sort_chapter_keys(&mut keys);
        assert_eq!(keys, vec!["1.5", "2", "10", "x"]);
    }

    #[test]
    fn chapter_keys_do_not_treat_nan_as_numeric() {
        let mut keys = vec!["nan".to_owned(), "3".to_owned(), "extra".to_owned()];
        sort_chapter_keys(&mut keys);
        assert_eq!(keys, vec!["3", "extra", "nan"]);
    }

    #[test]
    fn encode_then_decode_preserves_catalog() -> anyhow::Result<()> {
        let catalog = sample_catalog();
        let text = encode(&catalog, 12.5)?;
        assert_eq!(decode(&text)?, catalog);

        let empty = Catalog::new();
        assert_eq!(decode(&encode(&empty, 0.0)?)?, empty);
        Ok(())
    }

    #[test]
    fn envelope_carries_metadata_fields() -> anyhow::Result<()> {
        let text = encode(&sample_catalog(), 42.0)?;
        let envelope: Envelope = serde_json::from_str(&text)?;
        assert_eq!(envelope.version, SCHEMA_VERSION);
        assert_eq!(envelope.last_updated, 42.0);
        assert_eq!(envelope.total_comics, 2);
        assert_eq!(envelope.total_chapters, 2);
        Ok(())
    }

    #[test]
    fn decode_accepts_legacy_mapping() -> anyhow::Result<()> {
        let legacy = r#"{
            "old-work": {
                "title": "Old Work",
                "description": "from before envelopes",
                "cover_file_id": "AgAD",
                "chapters": {"1": ["a", "b"]}
            }
        }"#;
        let catalog = decode(legacy)?;
        let work = catalog.get("old-work").expect("legacy work");
        assert_eq!(work.cover_reference.as_deref(), Some("AgAD"));
        assert_eq!(work.chapters["1"], vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode(""), Err(ParseError::Empty)));
        assert!(matches!(decode("[1, 2]"), Err(ParseError::NotAnObject)));
        assert!(matches!(decode("{not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn find_by_title_ignores_case() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_by_title("dEmO"), Some("demo"));
        assert_eq!(catalog.find_by_title("missing"), None);
    }

    #[test]
    fn sorted_by_title_orders_by_title_not_slug() {
        let mut catalog = Catalog::new();
        catalog.insert("a-slug", Work::new("Zeta", "", None));
        catalog.insert("z-slug", Work::new("Alpha", "", None));
        let titles = catalog
            .sorted_by_title()
            .into_iter()
            .map(|(_, work)| work.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Alpha", "Zeta"]);
    }
}
