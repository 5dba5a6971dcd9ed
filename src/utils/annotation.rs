//! Structured view of the multi-number phone field.
//!
//! The store keeps a flat string such as `"41991526358 ✅, 4133334444"`. The
//! worker only ever manipulates the parsed [`PhoneField`] and serializes it
//! back at the store boundary, so entry order and count survive every update
//! and no entry ends up with more than one marker.

use crate::core::models::{Verdict, FOUND_MARKER, NOT_FOUND_MARKER};
use crate::utils::phone::digits_only;

const ENTRY_SEPARATOR: char = ',';
const JOINED_SEPARATOR: &str = ", ";

/// One comma-separated entry of the phone field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneEntry {
    /// Entry text with any marker glyph removed and whitespace trimmed.
    pub text: String,
    pub verdict: Option<Verdict>,
}

impl PhoneEntry {
    /// Parses a single raw entry, lifting a trailing (or stray) marker into
    /// `verdict`. If both glyphs are present the last one wins.
    pub fn parse(raw: &str) -> Self {
        let verdict = last_marker(raw);
        let text = strip_markers(raw);
        Self { text, verdict }
    }

    /// Replaces this entry with the outcome of a fresh check.
    ///
    /// The text becomes the entry's cleaned digits; entries without digits
    /// keep their text. Indeterminate outcomes leave the entry bare.
    pub fn resolve(&self, verdict: Verdict) -> Self {
        let digits = digits_only(&self.text);
        let text = if digits.is_empty() {
            self.text.clone()
        } else {
            digits
        };
        Self {
            text,
            verdict: verdict.is_resolved().then_some(verdict),
        }
    }

    /// Serialized form: the text plus at most one space-separated marker.
    pub fn render(&self) -> String {
        match self.verdict.and_then(Verdict::marker) {
            Some(marker) if self.text.is_empty() => marker.to_string(),
            Some(marker) => format!("{} {}", self.text, marker),
            None => self.text.clone(),
        }
    }
}

/// Ordered list of entries making up a lead's phone field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneField {
    entries: Vec<PhoneEntry>,
}

impl PhoneField {
    /// Splits the raw store value on commas, keeping every entry (including
    /// blank ones) so the structure round-trips.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        let entries = raw.split(ENTRY_SEPARATOR).map(PhoneEntry::parse).collect();
        Self { entries }
    }

    pub fn from_entries(entries: Vec<PhoneEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PhoneEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat string written back to the store.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(PhoneEntry::render)
            .collect::<Vec<_>>()
            .join(JOINED_SEPARATOR)
    }
}

impl std::fmt::Display for PhoneField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// True when the text carries either verdict glyph anywhere.
pub fn contains_marker(text: &str) -> bool {
    text.contains(FOUND_MARKER) || text.contains(NOT_FOUND_MARKER)
}

fn strip_markers(raw: &str) -> String {
    raw.replace(FOUND_MARKER, "")
        .replace(NOT_FOUND_MARKER, "")
        .trim()
        .to_string()
}

fn last_marker(raw: &str) -> Option<Verdict> {
    [FOUND_MARKER, NOT_FOUND_MARKER]
        .into_iter()
        .filter_map(|marker| raw.rfind(marker).map(|pos| (pos, marker)))
        .max_by_key(|(pos, _)| *pos)
        .and_then(|(_, marker)| Verdict::from_marker(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_count(s: &str) -> usize {
        s.matches(FOUND_MARKER).count() + s.matches(NOT_FOUND_MARKER).count()
    }

    #[test]
    fn test_parse_keeps_order_and_markers() {
        let field = PhoneField::parse("41991526358 ✅, 4133334444,5511987654321 ❌");
        assert_eq!(field.len(), 3);
        assert_eq!(field.entries()[0].text, "41991526358");
        assert_eq!(field.entries()[0].verdict, Some(Verdict::Found));
        assert_eq!(field.entries()[1].text, "4133334444");
        assert_eq!(field.entries()[1].verdict, None);
        assert_eq!(field.entries()[2].verdict, Some(Verdict::NotFound));
    }

    #[test]
    fn test_parse_empty_field() {
        assert!(PhoneField::parse("").is_empty());
        assert!(PhoneField::parse("   ").is_empty());
        assert_eq!(PhoneField::parse("").render(), "");
    }

    #[test]
    fn test_resolve_replaces_stale_marker() {
        let entry = PhoneEntry::parse("(41) 99152-6358 ❌");
        let resolved = entry.resolve(Verdict::Found);
        assert_eq!(resolved.render(), "41991526358 ✅");
        assert_eq!(marker_count(&resolved.render()), 1);

        let doubly_marked = PhoneEntry::parse("41991526358 ✅ ❌");
        assert_eq!(doubly_marked.verdict, Some(Verdict::NotFound));
        let resolved = doubly_marked.resolve(Verdict::NotFound);
        assert_eq!(resolved.render(), "41991526358 ❌");
    }

    #[test]
    fn test_resolve_indeterminate_leaves_entry_bare() {
        let entry = PhoneEntry::parse("+55 41 99152-6358 ✅");
        let resolved = entry.resolve(Verdict::Indeterminate);
        assert_eq!(resolved.verdict, None);
        assert_eq!(resolved.render(), "5541991526358");
    }

    #[test]
    fn test_resolve_without_digits_keeps_text() {
        let entry = PhoneEntry::parse("sem numero");
        assert_eq!(entry.resolve(Verdict::Indeterminate).render(), "sem numero");
    }

    #[test]
    fn test_render_then_parse_preserves_structure() {
        let texts = ["41991526358", "", "fixo", "5511987654322", "4133334444"];
        let verdicts = [
            Some(Verdict::Found),
            None,
            None,
            Some(Verdict::NotFound),
            None,
        ];
        let field = PhoneField::from_entries(
            texts
                .iter()
                .zip(verdicts.iter())
                .map(|(t, v)| PhoneEntry {
                    text: t.to_string(),
                    verdict: *v,
                })
                .collect(),
        );

        let rendered = field.render();
        let reparsed = PhoneField::parse(&rendered);
        assert_eq!(reparsed.len(), texts.len());
        for ((entry, text), verdict) in reparsed.entries().iter().zip(texts).zip(verdicts) {
            assert_eq!(entry.text, text);
            assert_eq!(entry.verdict, verdict);
            assert!(marker_count(&entry.render()) <= 1);
        }
    }

    #[test]
    fn test_last_glyph_wins() {
        assert_eq!(PhoneEntry::parse("4133334444 ✅ ❌").verdict, Some(Verdict::NotFound));
        assert_eq!(PhoneEntry::parse("❌ 4133334444 ✅").verdict, Some(Verdict::Found));
        assert_eq!(PhoneEntry::parse("4133334444").verdict, None);
        assert_eq!(PhoneEntry::parse("4133334444 ✅ ❌").text, "4133334444");
    }

    #[test]
    fn test_contains_marker() {
        assert!(contains_marker("41991526358 ✅"));
        assert!(contains_marker("x ❌, y"));
        assert!(!contains_marker("41991526358, 4133334444"));
    }
}
