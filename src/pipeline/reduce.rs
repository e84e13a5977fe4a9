//! Block graph reduction: flat OCR blocks → ordered rows of cell text.
//!
//! ## Algorithm
//!
//! 1. Index every block by id.
//! 2. Collect `TABLE` blocks in encounter order.
//! 3. Follow each table's `CHILD` links; keep the targets typed `CELL`.
//! 4. For each cell, follow its `CHILD` links to `WORD` blocks and join their
//!    text with single spaces, in link order, then trim.
//! 5. Group cell texts by row index. Within a row, cells keep encounter
//!    order; column indices are not used for sorting.
//! 6. Emit each table's rows in ascending row index, tables in encounter order.
//!
//! Every link that is followed must resolve. A dangling id aborts with
//! [`Pdf2JsonError::DanglingReference`]: skipping it would silently shift
//! the remaining cells one column to the left.

use crate::blocks::{BlockType, OcrNode, Row};
use crate::error::Pdf2JsonError;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Reduce a flat block list to text rows.
///
/// With `strict_tables = true` a result without any `TABLE` block is an
/// error ([`Pdf2JsonError::NoTableFound`]); otherwise it yields no rows.
pub fn reduce_blocks(nodes: &[OcrNode], strict_tables: bool) -> Result<Vec<Row>, Pdf2JsonError> {
    let index = index_blocks(nodes)?;

    let tables: Vec<&OcrNode> = nodes
        .iter()
        .filter(|n| n.block_type == BlockType::Table)
        .collect();

    if tables.is_empty() {
        if strict_tables {
            return Err(Pdf2JsonError::NoTableFound {
                blocks: nodes.len(),
            });
        }
        debug!("No TABLE block in {} blocks; lenient policy, 0 rows", nodes.len());
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for (n, table) in tables.iter().enumerate() {
        let table_rows = reduce_table(table, &index)?;
        debug!("Table {} ('{}'): {} rows", n + 1, table.id, table_rows.len());
        rows.extend(table_rows);
    }
    Ok(rows)
}

fn index_blocks(nodes: &[OcrNode]) -> Result<HashMap<&str, &OcrNode>, Pdf2JsonError> {
    let mut index = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if index.insert(node.id.as_str(), node).is_some() {
            return Err(Pdf2JsonError::DuplicateBlockId {
                id: node.id.clone(),
            });
        }
    }
    Ok(index)
}

fn resolve<'a>(
    index: &HashMap<&str, &'a OcrNode>,
    from: &OcrNode,
    to: &str,
) -> Result<&'a OcrNode, Pdf2JsonError> {
    index
        .get(to)
        .copied()
        .ok_or_else(|| Pdf2JsonError::DanglingReference {
            from: from.id.clone(),
            to: to.to_string(),
        })
}

fn reduce_table(
    table: &OcrNode,
    index: &HashMap<&str, &OcrNode>,
) -> Result<Vec<Row>, Pdf2JsonError> {
    let mut by_row: BTreeMap<u32, Row> = BTreeMap::new();

    for child_id in table.child_ids() {
        let cell = resolve(index, table, child_id)?;
        if cell.block_type != BlockType::Cell {
            continue;
        }
        let row = cell.row_index.ok_or_else(|| Pdf2JsonError::MalformedCell {
            id: cell.id.clone(),
        })?;
        let text = cell_text(cell, index)?;
        by_row.entry(row).or_default().push(text);
    }

    Ok(by_row.into_values().collect())
}

fn cell_text(cell: &OcrNode, index: &HashMap<&str, &OcrNode>) -> Result<String, Pdf2JsonError> {
    let mut words: Vec<&str> = Vec::new();
    for word_id in cell.child_ids() {
        let word = resolve(index, cell, word_id)?;
        if word.block_type == BlockType::Word {
            words.push(word.text.as_deref().unwrap_or(""));
        }
    }
    Ok(words.join(" ").trim().to_string())
}
