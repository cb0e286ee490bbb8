use log::debug;

use crate::VectorDocument;

/// Combine documents into one, in order.
///
/// The first document is extended with every later document's top-level
/// elements as-is. Identifier collisions across inputs are neither detected
/// nor resolved; callers needing well-formed output must keep id spaces
/// disjoint. Returns `None` for an empty input; a single document is returned
/// unchanged.
pub fn merge<I>(documents: I) -> Option<VectorDocument>
where
    I: IntoIterator<Item = VectorDocument>,
{
    let mut documents = documents.into_iter();
    let mut merged = documents.next()?;
    for doc in documents {
        debug!(
            "Merging {} nodes and {} ways",
            doc.node_count(),
            doc.way_count()
        );
        merged.append(doc);
    }
    Some(merged)
}
