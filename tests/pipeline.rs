//! Integration tests for the extraction pipeline.
//!
//! OCR and the LLM are replaced by in-process stubs, so these run offline.
//! One live test at the bottom is gated behind `E2E_ENABLED` and needs AWS
//! credentials, an LLM API key and `test_cases/sample_menu.pdf`.
//!
//! Run the live test with:
//!   E2E_ENABLED=1 cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use edgequake_pdf2json::{
    extract, extract_from_bytes, extract_rows, extract_to_file, write_document,
    DocumentAnalyzer, ExtractionConfig, ExtractionProgressCallback, Generation, OcrNode,
    Pdf2JsonError, StaticBlocks, TextGenerator,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Analyzer that counts calls and replays a fixed block list.
struct CountingAnalyzer {
    calls: AtomicUsize,
    nodes: Vec<OcrNode>,
}

impl CountingAnalyzer {
    fn new(nodes: Vec<OcrNode>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            nodes,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentAnalyzer for CountingAnalyzer {
    async fn analyze(&self, _document: &[u8]) -> Result<Vec<OcrNode>, Pdf2JsonError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nodes.clone())
    }
}

/// Generator that records prompts and answers with a canned reply.
struct ScriptedModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn user_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate(&self, _system: &str, user: &str) -> Result<Generation, Pdf2JsonError> {
        self.prompts.lock().unwrap().push(user.to_string());
        Ok(Generation {
            content: self.reply.clone(),
            input_tokens: 120,
            output_tokens: 40,
        })
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl EventLog {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
    fn push(&self, e: String) {
        self.0.lock().unwrap().push(e);
    }
}

impl ExtractionProgressCallback for EventLog {
    fn on_extraction_start(&self, _input_bytes: usize) {
        self.push("start".into());
    }
    fn on_ocr_start(&self) {
        self.push("ocr".into());
    }
    fn on_ocr_complete(&self, rows: usize) {
        self.push(format!("ocr_done:{rows}"));
    }
    fn on_mapping_start(&self, rows: usize) {
        self.push(format!("map:{rows}"));
    }
    fn on_mapping_complete(&self, items: usize, degraded: bool) {
        self.push(format!("map_done:{items}:{degraded}"));
    }
    fn on_error(&self, _error: &str) {
        self.push("error".into());
    }
    fn on_extraction_complete(&self, _total_duration_ms: u64) {
        self.push("complete".into());
    }
}

const PDF_BYTES: &[u8] = b"%PDF-1.4\n% stub document\n";

const COFFEE_REPLY: &str = r#"{"vendor":"Cafe","items":[{"name":"Coffee","price":3.5,"currency":"USD","confidence":0.9}],"flags":[]}"#;

/// A single table with one row: `Coffee | 3.50`.
fn coffee_blocks() -> Vec<OcrNode> {
    vec![
        OcrNode::table("t1", ["c1", "c2"]),
        OcrNode::cell("c1", 1, 1, ["w1"]),
        OcrNode::cell("c2", 1, 2, ["w2"]),
        OcrNode::word("w1", "Coffee"),
        OcrNode::word("w2", "3.50"),
    ]
}

fn config_with(
    analyzer: Arc<dyn DocumentAnalyzer>,
    model: Arc<dyn TextGenerator>,
) -> ExtractionConfig {
    ExtractionConfig::builder()
        .analyzer(analyzer)
        .generator(model)
        .build()
        .unwrap()
}

fn pdf_file() -> tempfile::NamedTempFile {
    let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    tmp.write_all(PDF_BYTES).unwrap();
    tmp
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn coffee_menu_end_to_end() {
    let analyzer = CountingAnalyzer::new(coffee_blocks());
    let model = ScriptedModel::new(COFFEE_REPLY);
    let config = config_with(analyzer.clone(), model.clone());

    let pdf = pdf_file();
    let output = extract(pdf.path().to_str().unwrap(), &config).await.unwrap();

    assert_eq!(analyzer.calls(), 1);
    assert_eq!(output.rows, vec![vec!["Coffee".to_string(), "3.50".to_string()]]);
    assert!(!output.is_degraded());
    assert_eq!(output.document.vendor, "Cafe");
    assert_eq!(output.document.items.len(), 1);
    assert_eq!(output.document.items[0].price, 3.5);
    assert_eq!(output.stats.items, 1);
    assert_eq!(output.stats.input_tokens, 120);
    assert_eq!(output.stats.output_tokens, 40);

    let prompts = model.user_prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0], "Table rows:\n[\"Coffee\",\"3.50\"]");
}

#[tokio::test]
async fn rows_follow_row_index_across_tables() {
    let nodes = vec![
        OcrNode::table("t1", ["c3", "c1"]),
        OcrNode::cell("c3", 2, 1, ["w3"]),
        OcrNode::cell("c1", 1, 1, ["w1"]),
        OcrNode::word("w1", "Tea"),
        OcrNode::word("w3", "Juice"),
        OcrNode::table("t2", ["c9"]),
        OcrNode::cell("c9", 1, 1, ["w9"]),
        OcrNode::word("w9", "Water"),
    ];
    let model = ScriptedModel::new(COFFEE_REPLY);
    let config = config_with(Arc::new(StaticBlocks::new(nodes)), model.clone());

    let output = extract_from_bytes(PDF_BYTES, &config).await.unwrap();
    let firsts: Vec<&str> = output.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(firsts, ["Tea", "Juice", "Water"]);
}

#[tokio::test]
async fn repaired_output_is_reported_in_stats() {
    let reply = format!("Sure! Here is the JSON:\n{COFFEE_REPLY}\nLet me know.");
    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new(&reply),
    );

    let output = extract_from_bytes(PDF_BYTES, &config).await.unwrap();
    assert!(output.stats.repaired);
    assert!(!output.is_degraded());
    assert_eq!(output.document.items[0].name, "Coffee");
}

// ── Table policy ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_table_is_fatal_by_default() {
    let model = ScriptedModel::new(COFFEE_REPLY);
    let config = config_with(
        Arc::new(StaticBlocks::new(vec![OcrNode::word("w1", "stray")])),
        model.clone(),
    );

    let err = extract_from_bytes(PDF_BYTES, &config).await.unwrap_err();
    assert!(matches!(err, Pdf2JsonError::NoTableFound { .. }));
    assert!(model.user_prompts().is_empty(), "model must not be called");
}

#[tokio::test]
async fn lenient_tables_continue_with_zero_rows() {
    let model = ScriptedModel::new(r#"{"vendor":"","items":[],"flags":[]}"#);
    let config = ExtractionConfig::builder()
        .analyzer(Arc::new(StaticBlocks::new(Vec::new())))
        .generator(model.clone())
        .strict_tables(false)
        .build()
        .unwrap();

    let output = extract_from_bytes(PDF_BYTES, &config).await.unwrap();
    assert!(output.rows.is_empty());
    assert!(output.document.items.is_empty());
    assert_eq!(model.user_prompts(), vec!["Table rows:\n".to_string()]);
}

#[tokio::test]
async fn dangling_reference_is_fatal() {
    let nodes = vec![OcrNode::table("t1", ["missing"])];
    let config = config_with(
        Arc::new(StaticBlocks::new(nodes)),
        ScriptedModel::new(COFFEE_REPLY),
    );

    let err = extract_from_bytes(PDF_BYTES, &config).await.unwrap_err();
    match err {
        Pdf2JsonError::DanglingReference { from, to } => {
            assert_eq!(from, "t1");
            assert_eq!(to, "missing");
        }
        other => panic!("expected DanglingReference, got {other:?}"),
    }
}

// ── Validation and degradation ───────────────────────────────────────────────

#[tokio::test]
async fn schema_violation_degrades_to_fallback() {
    let reply = r#"{"vendor":"Cafe","items":[{"name":"Coffee","price":"3.50","currency":"USD","confidence":0.9}]}"#;
    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new(reply),
    );

    let output = extract_from_bytes(PDF_BYTES, &config).await.unwrap();
    assert!(output.is_degraded());
    assert_eq!(output.document.vendor, "Cafe");
    assert!(output.document.items.is_empty());
    assert_eq!(output.document.flags.len(), 1);
    assert_eq!(output.document.flags[0]["reason"], "validation_error");

    let diagnostic = output.validation_error.unwrap();
    assert!(diagnostic
        .violations
        .iter()
        .any(|v| v.path == "$.items[0].price"));
}

#[tokio::test]
async fn confidence_out_of_range_degrades() {
    let reply = r#"{"vendor":"Cafe","items":[{"name":"Coffee","price":3.5,"currency":"USD","confidence":1.5}]}"#;
    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new(reply),
    );

    let output = extract_from_bytes(PDF_BYTES, &config).await.unwrap();
    assert!(output.is_degraded());
    assert!(output.document.items.is_empty());
}

#[tokio::test]
async fn unparseable_model_output_is_fatal() {
    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new("I could not find any prices in this table."),
    );

    let err = extract_from_bytes(PDF_BYTES, &config).await.unwrap_err();
    assert!(matches!(err, Pdf2JsonError::MalformedModelOutput { .. }));
}

// ── Input handling ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_never_reaches_ocr() {
    let analyzer = CountingAnalyzer::new(coffee_blocks());
    let config = config_with(analyzer.clone(), ScriptedModel::new(COFFEE_REPLY));

    let err = extract("/no/such/dir/sample_menu.pdf", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2JsonError::MissingInputFile { .. }));
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn non_pdf_input_is_rejected_before_ocr() {
    let analyzer = CountingAnalyzer::new(coffee_blocks());
    let config = config_with(analyzer.clone(), ScriptedModel::new(COFFEE_REPLY));

    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"GIF89a").unwrap();

    let err = extract(tmp.path().to_str().unwrap(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, Pdf2JsonError::NotAPdf { .. }));
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn rows_only_needs_no_model() {
    let config = ExtractionConfig::builder()
        .analyzer(Arc::new(StaticBlocks::new(coffee_blocks())))
        .build()
        .unwrap();

    let pdf = pdf_file();
    let rows = extract_rows(pdf.path().to_str().unwrap(), &config)
        .await
        .unwrap();
    assert_eq!(rows, vec![vec!["Coffee".to_string(), "3.50".to_string()]]);
}

// ── Output file ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn extract_to_file_writes_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("output.json");
    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new(COFFEE_REPLY),
    );

    let pdf = pdf_file();
    extract_to_file(pdf.path().to_str().unwrap(), &out, &config)
        .await
        .unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.ends_with('\n'));
    assert!(written.contains("\n  \"vendor\": \"Cafe\""));
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["items"][0]["name"], "Coffee");
    assert_eq!(value["flags"], serde_json::json!([]));
    assert!(!out.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn degraded_document_is_still_written() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output.json");
    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new(r#"{"vendor":"Cafe","items":"none"}"#),
    );

    let pdf = pdf_file();
    let output = extract_to_file(pdf.path().to_str().unwrap(), &out, &config)
        .await
        .unwrap();
    assert!(output.is_degraded());

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(value["items"], serde_json::json!([]));
    assert_eq!(value["flags"][0]["reason"], "validation_error");
}

#[tokio::test]
async fn fatal_error_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output.json");
    let config = config_with(
        Arc::new(StaticBlocks::new(Vec::new())),
        ScriptedModel::new(COFFEE_REPLY),
    );

    let pdf = pdf_file();
    let result = extract_to_file(pdf.path().to_str().unwrap(), &out, &config).await;
    assert!(matches!(result, Err(Pdf2JsonError::NoTableFound { .. })));
    assert!(!out.exists());
}

#[tokio::test]
async fn failed_rename_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory at the target path makes the final rename fail.
    let out = dir.path().join("output.json");
    std::fs::create_dir(&out).unwrap();
    std::fs::write(out.join("keep"), b"x").unwrap();

    let config = config_with(
        Arc::new(StaticBlocks::new(coffee_blocks())),
        ScriptedModel::new(COFFEE_REPLY),
    );
    let output = extract_from_bytes(PDF_BYTES, &config).await.unwrap();

    let err = write_document(&output, &out).await.unwrap_err();
    assert!(matches!(err, Pdf2JsonError::OutputWriteFailed { .. }));
    assert!(!dir.path().join("output.json.tmp").exists());
    assert!(out.join("keep").exists());
}

// ── Progress events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_events_arrive_in_stage_order() {
    let log = Arc::new(EventLog::default());
    let config = ExtractionConfig::builder()
        .analyzer(Arc::new(StaticBlocks::new(coffee_blocks())))
        .generator(ScriptedModel::new(COFFEE_REPLY))
        .progress_callback(log.clone())
        .build()
        .unwrap();

    extract_from_bytes(PDF_BYTES, &config).await.unwrap();
    assert_eq!(
        log.events(),
        ["start", "ocr", "ocr_done:1", "map:1", "map_done:1:false", "complete"]
    );
}

#[tokio::test]
async fn progress_reports_fatal_errors() {
    let log = Arc::new(EventLog::default());
    let config = ExtractionConfig::builder()
        .analyzer(Arc::new(StaticBlocks::new(Vec::new())))
        .generator(ScriptedModel::new(COFFEE_REPLY))
        .progress_callback(log.clone())
        .build()
        .unwrap();

    assert!(extract_from_bytes(PDF_BYTES, &config).await.is_err());
    assert_eq!(log.events(), ["start", "ocr", "error"]);
}

// ── Live test ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_sample_menu() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run live tests");
        return;
    }
    let pdf = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/sample_menu.pdf");
    if !pdf.exists() {
        println!("SKIP — test file not found: {}", pdf.display());
        return;
    }

    let output = extract(pdf.to_str().unwrap(), &ExtractionConfig::default())
        .await
        .unwrap();
    println!("{}", serde_json::to_string_pretty(&output.document).unwrap());
    assert!(!output.rows.is_empty());
    for item in &output.document.items {
        assert!((0.0..=1.0).contains(&item.confidence));
    }
}
