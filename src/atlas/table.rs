use super::graph::{DocumentNode, KnowledgeGraph, NodeContent};

const CELL_SEPARATORS: [char; 3] = ['\t', '|', ','];

/// Reads the tabular fallback: one row per line, first cell the title and
/// second cell the category badge. Edges always come from the cluster clique
/// fallback because rows carry no links.
pub(super) fn parse_table(raw: &str) -> KnowledgeGraph {
    let mut documents = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let separator = CELL_SEPARATORS
            .into_iter()
            .find(|separator| line.contains(*separator));
        let mut cells = match separator {
            Some(separator) => line.split(separator).map(str::trim).collect::<Vec<_>>(),
            None => vec![line],
        };
        cells.retain(|cell| !cell.is_empty());

        let Some(title) = cells.first().copied() else {
            continue;
        };
        if title.eq_ignore_ascii_case("title") || title.eq_ignore_ascii_case("titulo") {
            continue;
        }

        let category = cells.get(1).map(|cell| cell.to_lowercase());
        let id = format!("row-{}", documents.len() + 1);
        let mut node = DocumentNode::new(id, title, category);
        node.content = NodeContent::Inline(format!("{title}\nCategory: {}", node.cluster));
        documents.push(node);
    }

    KnowledgeGraph::build(documents, None)
}
