// merge.rs — Non-destructive section merges.
//
// Merging is an in-memory step: it replaces exactly one section and copies
// everything else unchanged. It never touches `savedAt`; only the store
// advances that when a document is persisted.

use serde_json::Value;

use crate::document::DraftDocument;
use crate::error::DraftError;
use crate::registry::SectionId;

/// Return a copy of `base` with `id` set to `value`.
pub fn merge(base: &DraftDocument, id: SectionId, value: Value) -> DraftDocument {
    let mut next = base.clone();
    next.put(id, value);
    tracing::debug!(section = %id, "merged draft section");
    next
}

/// Like [`merge`], resolving the section from its wire token first.
pub fn merge_by_name(
    base: &DraftDocument,
    token: &str,
    value: Value,
) -> Result<DraftDocument, DraftError> {
    let id: SectionId = token.parse()?;
    Ok(merge(base, id, value))
}

/// Apply several merges in order. The last update for a section wins.
pub fn merge_many<I>(base: &DraftDocument, updates: I) -> DraftDocument
where
    I: IntoIterator<Item = (SectionId, Value)>,
{
    let mut next = base.clone();
    for (id, value) in updates {
        next.put(id, value);
    }
    next
}

/// Like [`merge_many`] with wire tokens.
///
/// Every token is resolved before anything is applied, so an unknown token
/// fails the whole batch.
pub fn merge_many_by_name<I, S>(
    base: &DraftDocument,
    updates: I,
) -> Result<DraftDocument, DraftError>
where
    I: IntoIterator<Item = (S, Value)>,
    S: AsRef<str>,
{
    let resolved = updates
        .into_iter()
        .map(|(token, value)| token.as_ref().parse::<SectionId>().map(|id| (id, value)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_many(base, resolved))
}
