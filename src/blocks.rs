//! OCR block graph types.
//!
//! Textract returns a document as a flat list of blocks. Structure lives in
//! the relationships between them: a `TABLE` block has `CHILD` links to its
//! `CELL` blocks, and each `CELL` has `CHILD` links to the `WORD` blocks it
//! contains. [`crate::pipeline::reduce`] walks those links to rebuild rows.
//!
//! The serde layout mirrors Textract's wire format (`Id`, `BlockType`,
//! `Relationships[].Type`, `Relationships[].Ids`, `RowIndex`, …), so the JSON
//! printed by `aws textract analyze-document` can be loaded directly with
//! [`parse_blocks_json`] and replayed without calling the service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A row of cell texts, in CELL encounter order.
pub type Row = Vec<String>;

/// The kind of a block. Only the three kinds the reducer cares about get
/// their own variant; everything else (`PAGE`, `LINE`, `SELECTION_ELEMENT`,
/// `MERGED_CELL`, …) is kept verbatim in [`BlockType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Table,
    Cell,
    Word,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Table => "TABLE",
            BlockType::Cell => "CELL",
            BlockType::Word => "WORD",
            BlockType::Other(s) => s,
        }
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        match s {
            "TABLE" => BlockType::Table,
            "CELL" => BlockType::Cell,
            "WORD" => BlockType::Word,
            other => BlockType::Other(other.to_string()),
        }
    }
}

impl From<String> for BlockType {
    fn from(s: String) -> Self {
        BlockType::from(s.as_str())
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a relationship. The reducer only follows `CHILD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationshipKind {
    Child,
    Other(String),
}

impl From<&str> for RelationshipKind {
    fn from(s: &str) -> Self {
        match s {
            "CHILD" => RelationshipKind::Child,
            other => RelationshipKind::Other(other.to_string()),
        }
    }
}

impl From<String> for RelationshipKind {
    fn from(s: String) -> Self {
        RelationshipKind::from(s.as_str())
    }
}

impl From<RelationshipKind> for String {
    fn from(k: RelationshipKind) -> Self {
        match k {
            RelationshipKind::Child => "CHILD".to_string(),
            RelationshipKind::Other(s) => s,
        }
    }
}

/// A typed, ordered list of pointers from one block to others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: RelationshipKind,
    #[serde(rename = "Ids", default)]
    pub ids: Vec<String>,
}

impl Relationship {
    pub fn child<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: RelationshipKind::Child,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single element of the document-analysis result graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OcrNode {
    pub id: String,
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    /// Text payload; set on `WORD` (and `LINE`) blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// 1-based row index; set on `CELL` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,
    /// 1-based column index; carried for diagnostics, never used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,
}

impl OcrNode {
    pub fn new(id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            id: id.into(),
            block_type,
            relationships: Vec::new(),
            text: None,
            row_index: None,
            column_index: None,
        }
    }

    pub fn table<I, S>(id: impl Into<String>, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::new(id, BlockType::Table);
        node.relationships.push(Relationship::child(cells));
        node
    }

    pub fn cell<I, S>(id: impl Into<String>, row: u32, column: u32, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::new(id, BlockType::Cell);
        node.row_index = Some(row);
        node.column_index = Some(column);
        let rel = Relationship::child(words);
        if !rel.ids.is_empty() {
            node.relationships.push(rel);
        }
        node
    }

    pub fn word(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(id, BlockType::Word);
        node.text = Some(text.into());
        node
    }

    /// Ids reachable through this block's `CHILD` relationships, in order.
    ///
    /// Textract usually emits a single `CHILD` relationship per block, but
    /// nothing forbids several; they are walked in list order.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Child)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }
}

/// Top-level shape of an `AnalyzeDocument` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnalyzeDocumentJson {
    #[serde(default)]
    blocks: Vec<OcrNode>,
}

/// Parse captured OCR output.
///
/// Accepts either a full `AnalyzeDocument` response (`{"Blocks": [...]}`) or
/// a bare array of blocks.
pub fn parse_blocks_json(json: &str) -> Result<Vec<OcrNode>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.is_array() {
        serde_json::from_value(value)
    } else {
        let doc: AnalyzeDocumentJson = serde_json::from_value(value)?;
        Ok(doc.blocks)
    }
}
