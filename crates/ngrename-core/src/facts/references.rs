//! Reference index: structural references, searchable text regions and file links.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{
    FileId, FileKind, LiteralRole, Reference, ReferenceId, ReferenceKind, RegionKind, Symbol,
    SymbolId,
};
use crate::patch::Span;
use crate::text::find_word_occurrences;

/// A comment or string literal body that textual search scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRegion {
    /// Span of the region body (without comment markers or quotes).
    pub span: Span,
    pub kind: RegionKind,
    /// The region body.
    pub text: String,
    /// Symbol a metadata literal belongs to.
    pub owner: Option<SymbolId>,
}

/// A path literal that points at another workspace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    /// Span of the literal body.
    pub span: Span,
    /// The literal as written, e.g. `./app.component`.
    pub specifier: String,
    /// Workspace-relative path the specifier resolves to (extension not inferred).
    pub target: String,
    pub role: LiteralRole,
}

/// Usage sites of symbols, plus the raw material for textual search.
///
/// Structural references are rebuilt wholesale by the facts store whenever
/// bindings change. Textual references are computed on demand from the
/// regions so they always reflect a symbol's current name.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    structural: BTreeMap<ReferenceId, Reference>,
    by_symbol: HashMap<SymbolId, Vec<ReferenceId>>,
    by_file: HashMap<FileId, Vec<ReferenceId>>,
    regions: BTreeMap<FileId, (FileKind, Vec<TextRegion>)>,
    links: BTreeMap<FileId, Vec<FileLink>>,
    next_ref_id: u32,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        ReferenceIndex::default()
    }

    // ------------------------------------------------------------------------
    // Structural
    // ------------------------------------------------------------------------

    /// Record a structural reference.
    pub fn add_structural(&mut self, reference: Reference) -> ReferenceId {
        let id = ReferenceId::new(self.next_ref_id);
        self.next_ref_id += 1;
        self.by_symbol
            .entry(reference.symbol_id)
            .or_default()
            .push(id);
        self.by_file.entry(reference.file_id).or_default().push(id);
        self.structural.insert(id, reference);
        id
    }

    /// Drop every structural reference.
    pub fn clear_structural(&mut self) {
        self.structural.clear();
        self.by_symbol.clear();
        self.by_file.clear();
    }

    /// Structural references to a symbol, in insertion order.
    pub fn structural_of(&self, symbol_id: SymbolId) -> Vec<&Reference> {
        self.by_symbol
            .get(&symbol_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.structural.get(id))
            .collect()
    }

    /// Structural references located in a file.
    pub fn structural_in_file(&self, file_id: FileId) -> Vec<&Reference> {
        self.by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.structural.get(id))
            .collect()
    }

    /// The structural reference whose span covers `offset` (end inclusive).
    pub fn structural_at(&self, file_id: FileId, offset: u64) -> Option<&Reference> {
        self.structural_in_file(file_id)
            .into_iter()
            .filter(|r| r.span.touches(offset))
            .min_by_key(|r| r.span.len())
    }

    // ------------------------------------------------------------------------
    // Regions and links
    // ------------------------------------------------------------------------

    /// Replace a file's text regions.
    pub fn set_regions(&mut self, file_id: FileId, file_kind: FileKind, regions: Vec<TextRegion>) {
        self.regions.insert(file_id, (file_kind, regions));
    }

    /// Replace a file's links.
    pub fn set_links(&mut self, file_id: FileId, links: Vec<FileLink>) {
        self.links.insert(file_id, links);
    }

    /// Forget a file's regions and links.
    pub fn remove_file(&mut self, file_id: FileId) {
        self.regions.remove(&file_id);
        self.links.remove(&file_id);
    }

    /// Every link, grouped by the file containing it.
    pub fn links(&self) -> impl Iterator<Item = (FileId, &FileLink)> {
        self.links
            .iter()
            .flat_map(|(file_id, links)| links.iter().map(move |link| (*file_id, link)))
    }

    /// Mutable access to every link, for retargeting after file moves.
    pub fn links_mut(&mut self) -> impl Iterator<Item = &mut FileLink> {
        self.links.values_mut().flatten()
    }

    // ------------------------------------------------------------------------
    // Textual
    // ------------------------------------------------------------------------

    /// Word-boundary occurrences of the symbol's current name in comments and literals.
    ///
    /// `files` limits the search; `None` searches every file. Path literals
    /// are never scanned. Metadata literals count as metadata only for their
    /// owner and as plain literals for every other symbol. Occurrences
    /// already covered by a structural reference in the same file are skipped.
    pub fn textual_of(&self, symbol: &Symbol, files: Option<&HashSet<FileId>>) -> Vec<Reference> {
        let mut found = Vec::new();

        for (file_id, (file_kind, regions)) in &self.regions {
            if files.is_some_and(|files| !files.contains(file_id)) {
                continue;
            }
            let structural = self.structural_in_file(*file_id);

            for region in regions {
                let kind = match region.kind {
                    RegionKind::Literal { role } if role.is_path() => continue,
                    RegionKind::Literal {
                        role: LiteralRole::Metadata,
                    } if region.owner != Some(symbol.symbol_id) => RegionKind::Literal {
                        role: LiteralRole::Plain,
                    },
                    kind => kind,
                };

                for offset in find_word_occurrences(&region.text, &symbol.name) {
                    let span = Span::at(region.span.start as usize + offset, symbol.name.len());
                    if structural.iter().any(|r| r.span.overlaps(&span)) {
                        continue;
                    }
                    found.push(Reference {
                        symbol_id: symbol.symbol_id,
                        file_id: *file_id,
                        span,
                        kind: ReferenceKind::Textual,
                        file_kind: *file_kind,
                        declaration: false,
                        region: Some(kind),
                        whole_region: offset == 0 && symbol.name.len() == region.text.len(),
                    });
                }
            }
        }

        found
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str) -> Symbol {
        Symbol {
            symbol_id: SymbolId(1),
            kind: crate::facts::SymbolKind::Pipe,
            name: name.to_string(),
            decl_file_id: FileId(0),
            decl_span: Span::new(0, name.len() as u64),
            file_kind: FileKind::Logic,
            scope_id: None,
            container: None,
            template_path: None,
        }
    }

    fn region(start: u64, text: &str, kind: RegionKind) -> TextRegion {
        TextRegion {
            span: Span::at(start as usize, text.len()),
            kind,
            text: text.to_string(),
            owner: None,
        }
    }

    const METADATA: RegionKind = RegionKind::Literal {
        role: LiteralRole::Metadata,
    };

    #[test]
    fn textual_scan_finds_comment_and_literal_words() {
        let mut index = ReferenceIndex::new();
        index.set_regions(
            FileId(2),
            FileKind::Template,
            vec![
                region(10, " uses foo here ", RegionKind::Comment),
                region(
                    40,
                    "foo",
                    RegionKind::Literal {
                        role: LiteralRole::Plain,
                    },
                ),
                region(60, "foobar", RegionKind::Comment),
            ],
        );

        let refs = index.textual_of(&symbol("foo"), None);
        let spans: Vec<Span> = refs.iter().map(|r| r.span).collect();
        assert_eq!(spans, vec![Span::new(16, 19), Span::new(40, 43)]);
        assert!(!refs[0].whole_region);
        assert!(refs[1].whole_region);
        assert!(refs.iter().all(|r| r.kind == ReferenceKind::Textual));
    }

    #[test]
    fn path_literals_are_not_scanned() {
        let mut index = ReferenceIndex::new();
        index.set_regions(
            FileId(2),
            FileKind::Logic,
            vec![region(
                5,
                "./foo.pipe",
                RegionKind::Literal {
                    role: LiteralRole::ModuleSpecifier,
                },
            )],
        );
        assert!(index.textual_of(&symbol("foo"), None).is_empty());
    }

    #[test]
    fn structural_sites_are_not_reported_as_text() {
        let mut index = ReferenceIndex::new();
        index.set_regions(
            FileId(0),
            FileKind::Logic,
            vec![region(
                0,
                "foo",
                RegionKind::Literal {
                    role: LiteralRole::Metadata,
                },
            )],
        );
        index.add_structural(
            Reference::structural(SymbolId(1), FileId(0), Span::new(0, 3), FileKind::Logic)
                .as_declaration(),
        );
        assert!(index.textual_of(&symbol("foo"), None).is_empty());
        assert_eq!(index.structural_of(SymbolId(1)).len(), 1);
    }

    #[test]
    fn metadata_is_plain_for_other_symbols() {
        let mut index = ReferenceIndex::new();
        let mut owned = region(10, "app-foo", METADATA);
        owned.owner = Some(SymbolId(1));
        let mut foreign = region(30, "app-foo", METADATA);
        foreign.owner = Some(SymbolId(7));
        index.set_regions(FileId(0), FileKind::Logic, vec![owned, foreign]);

        let refs = index.textual_of(&symbol("foo"), None);
        let kinds: Vec<Option<RegionKind>> = refs.iter().map(|r| r.region).collect();
        assert_eq!(
            kinds,
            vec![
                Some(METADATA),
                Some(RegionKind::Literal {
                    role: LiteralRole::Plain
                }),
            ]
        );
    }

    #[test]
    fn search_is_limited_to_the_given_files() {
        let mut index = ReferenceIndex::new();
        index.set_regions(FileId(0), FileKind::Logic, vec![region(0, "foo", RegionKind::Comment)]);
        index.set_regions(FileId(1), FileKind::Logic, vec![region(0, "foo", RegionKind::Comment)]);

        let only: HashSet<FileId> = [FileId(1)].into_iter().collect();
        let refs = index.textual_of(&symbol("foo"), Some(&only));
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].file_id, FileId(1));
        assert_eq!(index.textual_of(&symbol("foo"), None).len(), 2);
    }

    #[test]
    fn structural_at_prefers_the_tightest_span() {
        let mut index = ReferenceIndex::new();
        index.add_structural(Reference::structural(
            SymbolId(1),
            FileId(0),
            Span::new(0, 10),
            FileKind::Logic,
        ));
        index.add_structural(Reference::structural(
            SymbolId(2),
            FileId(0),
            Span::new(2, 5),
            FileKind::Logic,
        ));
        assert_eq!(
            index.structural_at(FileId(0), 3).map(|r| r.symbol_id),
            Some(SymbolId(2))
        );
        index.clear_structural();
        assert!(index.structural_at(FileId(0), 3).is_none());
    }
}
