//! OCR collaborator: document bytes → flat block graph.
//!
//! [`DocumentAnalyzer`] is the seam between the pipeline and the OCR
//! service. The production implementation, [`TextractAnalyzer`], sends the
//! whole document to Textract's synchronous `AnalyzeDocument` API with the
//! `TABLES` feature enabled and converts every returned block into an
//! [`OcrNode`]. It makes exactly one request and never retries.
//!
//! Synchronous `AnalyzeDocument` accepts single-page PDFs and PNG, JPEG or
//! TIFF images up to 10 MB. Larger documents are rejected by the service and
//! surface as [`Pdf2JsonError::OcrFailed`].

use crate::blocks::{BlockType, OcrNode, Relationship, RelationshipKind};
use crate::config::ExtractionConfig;
use crate::error::Pdf2JsonError;
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_textract::config::Credentials;
use aws_sdk_textract::error::{DisplayErrorContext, SdkError};
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{Block, Document, FeatureType};
use std::time::Duration;
use tracing::{debug, info};

/// Runs document analysis and returns the raw block graph.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, document: &[u8]) -> Result<Vec<OcrNode>, Pdf2JsonError>;
}

/// Textract-backed analyzer.
#[derive(Debug, Clone)]
pub struct TextractAnalyzer {
    client: aws_sdk_textract::Client,
    timeout_secs: u64,
}

impl TextractAnalyzer {
    /// Build a Textract client from the extraction config.
    ///
    /// `region` and `credentials` override the AWS default provider chains
    /// when set. The operation timeout is always explicit.
    pub async fn from_config(config: &ExtractionConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);
        if let Some(ref region) = config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(ref creds) = config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                creds.session_token.clone(),
                None,
                "pdf2json-static",
            ));
        }
        let sdk_config = loader.load().await;
        debug!("Textract client region: {:?}", sdk_config.region());

        Self {
            client: aws_sdk_textract::Client::new(&sdk_config),
            timeout_secs: config.ocr_timeout_secs,
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for TextractAnalyzer {
    async fn analyze(&self, document: &[u8]) -> Result<Vec<OcrNode>, Pdf2JsonError> {
        info!("Sending {} bytes to Textract AnalyzeDocument (TABLES)", document.len());

        let response = self
            .client
            .analyze_document()
            .document(Document::builder().bytes(Blob::new(document.to_vec())).build())
            .feature_types(FeatureType::Tables)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::TimeoutError(_) => Pdf2JsonError::OcrTimeout {
                    secs: self.timeout_secs,
                },
                other => Pdf2JsonError::OcrFailed {
                    detail: DisplayErrorContext(&other).to_string(),
                },
            })?;

        let nodes = response
            .blocks()
            .iter()
            .map(node_from_block)
            .collect::<Result<Vec<_>, _>>()?;
        info!("Textract returned {} blocks", nodes.len());
        Ok(nodes)
    }
}

/// Convert one SDK block into an [`OcrNode`].
fn node_from_block(block: &Block) -> Result<OcrNode, Pdf2JsonError> {
    let id = block.id().ok_or_else(|| Pdf2JsonError::OcrFailed {
        detail: "Textract returned a block without an Id".into(),
    })?;
    let block_type = block
        .block_type()
        .map(|t| BlockType::from(t.as_str()))
        .unwrap_or_else(|| BlockType::Other(String::new()));

    let mut node = OcrNode::new(id, block_type);
    node.text = block.text().map(str::to_string);
    node.row_index = block.row_index().and_then(|i| u32::try_from(i).ok());
    node.column_index = block.column_index().and_then(|i| u32::try_from(i).ok());
    node.relationships = block
        .relationships()
        .iter()
        .map(|rel| Relationship {
            kind: rel
                .r#type()
                .map(|t| RelationshipKind::from(t.as_str()))
                .unwrap_or_else(|| RelationshipKind::Other(String::new())),
            ids: rel.ids().to_vec(),
        })
        .collect();
    Ok(node)
}

/// Replays a fixed block list instead of calling a service.
///
/// Used by the CLI's `--blocks` mode to re-run the pipeline on a captured
/// `AnalyzeDocument` response, and by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBlocks {
    nodes: Vec<OcrNode>,
}

impl StaticBlocks {
    pub fn new(nodes: Vec<OcrNode>) -> Self {
        Self { nodes }
    }
}

#[async_trait]
impl DocumentAnalyzer for StaticBlocks {
    async fn analyze(&self, _document: &[u8]) -> Result<Vec<OcrNode>, Pdf2JsonError> {
        Ok(self.nodes.clone())
    }
}
