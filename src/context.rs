//! Context assembly: deduplicate and trim retrieved passages into a
//! token-bounded, citation-indexed context block

use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ContextConfig;
use crate::types::passage::RetrievedPassage;
use crate::types::response::Citation;

/// One passage included in the context block
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// Citation index, 1..N, dense, assigned in inclusion order
    pub citation_index: usize,
    /// The included passage
    pub passage: RetrievedPassage,
    /// Rendered text as presented to the generation engine
    pub rendered: String,
}

/// An ordered, token-bounded context block built fresh per request
#[derive(Debug, Clone, Default)]
pub struct ContextBlock {
    entries: Vec<ContextEntry>,
    token_count: usize,
}

impl ContextBlock {
    /// Included entries, in citation-index order
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    /// Number of included passages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no passage was included (a valid, none-confidence state)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Estimated token count of the rendered block
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Render the whole block for inclusion in the generation prompt
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.rendered.as_str())
            .collect::<Vec<_>>()
            .join("\n---\n")
    }

    /// Derive the citation list for every included passage
    pub fn citations(&self, preview_chars: usize) -> Vec<Citation> {
        self.entries
            .iter()
            .map(|e| Citation::from_passage(e.citation_index, &e.passage, preview_chars))
            .collect()
    }
}

/// Assembles retrieved passages into a context block under a token budget
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    token_budget: usize,
    citation_overhead_tokens: usize,
}

impl ContextAssembler {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            token_budget: config.token_budget,
            citation_overhead_tokens: config.citation_overhead_tokens,
        }
    }

    /// Build a context block from passages pre-ordered by descending relevance
    ///
    /// The assembler never re-sorts. Duplicate chunk_ids keep only their
    /// first occurrence. Passages are included whole, greedily in input
    /// order, until the next passage would exceed the budget; everything
    /// after that point is dropped. Passage text is never truncated.
    pub fn assemble(&self, passages: &[RetrievedPassage]) -> ContextBlock {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut entries = Vec::new();
        let mut token_count = 0usize;

        for passage in passages {
            if !seen.insert(passage.chunk_id) {
                tracing::debug!(chunk_id = %passage.chunk_id, "skipping duplicate chunk");
                continue;
            }

            let cost = estimate_tokens(&passage.content) + self.citation_overhead_tokens;
            if token_count + cost > self.token_budget {
                tracing::debug!(
                    included = entries.len(),
                    token_count,
                    "token budget reached, dropping remaining passages"
                );
                break;
            }

            let citation_index = entries.len() + 1;
            let rendered = render_passage(citation_index, passage);
            token_count += cost;
            entries.push(ContextEntry {
                citation_index,
                passage: passage.clone(),
                rendered,
            });
        }

        ContextBlock {
            entries,
            token_count,
        }
    }
}

/// Render one passage with a self-describing citation header
fn render_passage(citation_index: usize, passage: &RetrievedPassage) -> String {
    let page = match passage.page_number {
        Some(p) => format!("Page {}", p),
        None => "Page N/A".to_string(),
    };
    format!(
        "[Source {}: {}, {}, Relevance: {:.2}]\n{}",
        citation_index, passage.document_title, page, passage.relevance_score, passage.content
    )
}

/// Deterministic token estimate for budget accounting
///
/// Word count scaled by 4/3, rounded up. Intentionally over-approximates
/// typical sub-word tokenizers so the budget stays a hard ceiling.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.unicode_words().count();
    (words * 4).div_ceil(3)
}
