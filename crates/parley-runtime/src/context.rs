//! Prompt context assembly from retrieved documents.

use parley_core::RetrievedDocument;

/// Render retrieved documents into the context block handed to the
/// generation prompt.
///
/// Each document becomes a numbered entry:
///
/// ```text
/// [1] Refund policy
/// Refunds are issued within 5 business days...
/// Source: help/refunds
/// ```
///
/// Entries are joined by blank lines, in ranking order.
#[must_use]
pub fn build_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[{}] {}\n{}\nSource: {}",
                i + 1,
                doc.title,
                doc.snippet,
                doc.source
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, snippet: &str, source: &str) -> RetrievedDocument {
        RetrievedDocument {
            id: title.to_string(),
            title: title.to_string(),
            source: source.to_string(),
            snippet: snippet.to_string(),
            score: 0.9,
        }
    }

    #[test]
    fn numbers_and_joins_documents() {
        let docs = vec![
            doc("Refund policy", "Refunds take 5 days.", "help/refunds"),
            doc("Shipping", "Ships in 2 days.", "help/shipping"),
        ];
        let context = build_context(&docs);
        assert_eq!(
            context,
            "[1] Refund policy\nRefunds take 5 days.\nSource: help/refunds\n\n\
             [2] Shipping\nShips in 2 days.\nSource: help/shipping"
        );
    }

    #[test]
    fn empty_list_is_empty_string() {
        assert_eq!(build_context(&[]), "");
    }
}
