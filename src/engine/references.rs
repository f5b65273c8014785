use std::sync::LazyLock;

use regex::Regex;

/// What a markdown reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Image,
    /// A linked markdown section.
    Section,
    /// The BibTeX database named in a `bib` code span.
    Bibliography,
}

/// A local file the entry document depends on, as written in the markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub target: String,
}

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?)\[[^\]]*\]\(\s*<?([^)\s>]+\.md)(?:#[^)\s>]*)?>?\s*\)").unwrap());
static BIB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`\s*bib[ \t]*\r?\n\s*([^`\r\n]+?)\s*`").unwrap());

/// Collect local references in document order, deduplicated.
///
/// Remote targets (anything with a URL scheme) and pure anchors are skipped.
pub fn scan_references(markdown: &str) -> Vec<Reference> {
    let mut found: Vec<(usize, Reference)> = Vec::new();
    let mut push = |at: usize, kind: ReferenceKind, target: &str| {
        if target.contains("://") || target.starts_with('#') || target.starts_with("data:") {
            return;
        }
        found.push((
            at,
            Reference {
                kind,
                target: target.to_string(),
            },
        ));
    };

    for caps in IMAGE.captures_iter(markdown) {
        let m = &caps[1];
        push(caps.get(1).map_or(0, |g| g.start()), ReferenceKind::Image, m);
    }
    for caps in LINK.captures_iter(markdown) {
        // `![..](x.md)` is an image, already handled above.
        if !caps[1].is_empty() {
            continue;
        }
        let m = &caps[2];
        push(caps.get(2).map_or(0, |g| g.start()), ReferenceKind::Section, m);
    }
    for caps in BIB.captures_iter(markdown) {
        let m = &caps[1];
        push(caps.get(1).map_or(0, |g| g.start()), ReferenceKind::Bibliography, m);
    }

    found.sort_by_key(|(at, _)| *at);
    let mut out: Vec<Reference> = Vec::with_capacity(found.len());
    for (_, reference) in found {
        if !out.contains(&reference) {
            out.push(reference);
        }
    }
    out
}
