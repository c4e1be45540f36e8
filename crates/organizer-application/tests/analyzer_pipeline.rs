//! End-to-end pass through `pipeline::run`, from a raw file read to a
//! queued embedding: the path nothing inside the crate's own unit tests
//! exercises, since `AnalyzerDeps`'s collaborators are all traits wired
//! together only at the process composition root in practice.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use organizer_application::analyzer::deps::AnalyzerDeps;
use organizer_application::analyzer::dedup::CallDeduplicator;
use organizer_application::analyzer::pipeline::{self, AnalyzeRequest};
use organizer_application::gate::{EmbeddingPolicy, EmbeddingScope, EmbeddingTiming, GateSettings};
use organizer_domain::ports::{
    Cache, CallOptions, Clock, ContentExtractor, EmbedResult, EmbeddingSink, ExtractOptions,
    ExtractedText, ExtractionMethod, FileAccess, FileStat, HealthStatus, ModelResponse, ModelRuntime,
};
use organizer_domain::value_objects::{FileKind, FileRef, ItemId, QueueItem, Stage};
use organizer_domain::Result;

struct FakeModelRuntime;

#[async_trait]
impl ModelRuntime for FakeModelRuntime {
    async fn analyze_text(&self, _prompt: &str, _opts: &CallOptions) -> Result<ModelResponse> {
        Ok(ModelResponse {
            text: r#"{"category":"Finance","suggestedName":"march_invoice","keywords":["invoice"],"confidence":88,"contentType":"text_document","summary":"March invoice","purpose":"billing","project":"","entity":"Acme","documentType":"invoice","keyEntities":["Acme"],"hasText":true,"date":"2026-03-01"}"#.to_string(),
            model: "fake-text-model".to_string(),
        })
    }

    async fn analyze_image(&self, prompt: &str, _image_bytes: &[u8], opts: &CallOptions) -> Result<ModelResponse> {
        self.analyze_text(prompt, opts).await
    }

    async fn embed_text(&self, _text: &str, _opts: &CallOptions) -> Result<EmbedResult> {
        Ok(EmbedResult { vector: vec![0.1, 0.2, 0.3], model: "fake-embed-model".to_string() })
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["fake-text-model".to_string()])
    }

    fn supports_vision(&self) -> bool {
        false
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        Ok(HealthStatus { healthy: true, status: "healthy".to_string(), vision_model_name: None, available_models: vec![] })
    }
}

struct FakeContentExtractor;

#[async_trait]
impl ContentExtractor for FakeContentExtractor {
    async fn extract_text(&self, _path: &str, _opts: &ExtractOptions) -> Result<ExtractedText> {
        Ok(ExtractedText { text: String::new(), method: ExtractionMethod::None, truncated: false })
    }

    async fn extract_exif_date(&self, _bytes: &[u8]) -> Result<Option<String>> {
        Ok(None)
    }

    async fn preprocess_image(&self, bytes: &[u8], _ext: &str) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

struct FakeFileAccess;

#[async_trait]
impl FileAccess for FakeFileAccess {
    async fn stat(&self, _path: &str) -> Result<FileStat> {
        Ok(FileStat { size: 128, mtime_ms: 0 })
    }

    async fn read_bytes(&self, _path: &str) -> Result<Vec<u8>> {
        Ok(b"Invoice for March services rendered.".to_vec())
    }
}

struct FakeCache;

#[async_trait]
impl Cache for FakeCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn invalidate(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn invalidate_matching(&self, _substring: &str) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
}

#[derive(Clone, Copy)]
struct FakeClock;

impl Clock for FakeClock {
    fn now_ms(&self) -> i64 {
        0
    }

    fn now_iso(&self) -> String {
        "2026-03-01T00:00:00Z".to_string()
    }
}

#[derive(Default, Clone)]
struct FakeEmbeddingSink {
    enqueued: Arc<Mutex<Vec<(Stage, QueueItem)>>>,
}

#[async_trait]
impl EmbeddingSink for FakeEmbeddingSink {
    async fn enqueue(&self, stage: Stage, item: QueueItem) -> Result<()> {
        self.enqueued.lock().unwrap().push((stage, item));
        Ok(())
    }
}

fn deps(sink: FakeEmbeddingSink, gate_settings: GateSettings) -> AnalyzerDeps {
    AnalyzerDeps {
        model_runtime: Arc::new(FakeModelRuntime),
        content_extractor: Arc::new(FakeContentExtractor),
        file_access: Arc::new(FakeFileAccess),
        analysis_cache: Arc::new(FakeCache),
        folder_matcher: None,
        dedup: Arc::new(CallDeduplicator::new()),
        embedding_sink: Arc::new(sink),
        gate_settings,
        clock: Arc::new(FakeClock),
    }
}

#[tokio::test]
async fn full_pipeline_run_enqueues_an_embedding_when_the_gate_allows_it() {
    let sink = FakeEmbeddingSink::default();
    let deps = deps(sink.clone(), GateSettings::default());
    let file = FileRef::new("/inbox/march_invoice.txt", 128, 0, FileKind::Doc);
    let request = AnalyzeRequest { file: file.clone(), smart_folders: vec![], bypass_cache: true };

    let outcome = pipeline::run(&deps, &request, FileKind::Doc).await;

    assert_eq!(outcome.result.category, "Finance");
    assert!(!outcome.result.is_fallback);

    let enqueued = sink.enqueued.lock().unwrap();
    assert_eq!(enqueued.len(), 1);
    let (stage, item) = &enqueued[0];
    assert_eq!(*stage, Stage::Analysis);
    assert_eq!(item.id, ItemId::File(file.id).to_wire());
    assert_eq!(item.vector.as_deref(), Some([0.1, 0.2, 0.3].as_slice()));
    assert_eq!(item.meta.category, "Finance");
    assert_eq!(item.meta.path, "/inbox/march_invoice.txt");
}

#[tokio::test]
async fn full_pipeline_run_skips_the_queue_when_embedding_policy_is_skip() {
    let sink = FakeEmbeddingSink::default();
    let settings = GateSettings { policy: EmbeddingPolicy::Skip, ..GateSettings::default() };
    let deps = deps(sink.clone(), settings);
    let file = FileRef::new("/inbox/march_invoice.txt", 128, 0, FileKind::Doc);
    let request = AnalyzeRequest { file, smart_folders: vec![], bypass_cache: true };

    pipeline::run(&deps, &request, FileKind::Doc).await;

    assert!(sink.enqueued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn full_pipeline_run_skips_the_queue_when_timing_is_manual() {
    let sink = FakeEmbeddingSink::default();
    let settings = GateSettings { timing: EmbeddingTiming::Manual, ..GateSettings::default() };
    let deps = deps(sink.clone(), settings);
    let file = FileRef::new("/inbox/march_invoice.txt", 128, 0, FileKind::Doc);
    let request = AnalyzeRequest { file, smart_folders: vec![], bypass_cache: true };

    pipeline::run(&deps, &request, FileKind::Doc).await;

    assert!(sink.enqueued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn full_pipeline_run_skips_the_queue_when_scope_excludes_unmatched_files() {
    let sink = FakeEmbeddingSink::default();
    let settings = GateSettings { scope: EmbeddingScope::SmartFoldersOnly, ..GateSettings::default() };
    let deps = deps(sink.clone(), settings);
    let file = FileRef::new("/inbox/march_invoice.txt", 128, 0, FileKind::Doc);
    let request = AnalyzeRequest { file, smart_folders: vec![], bypass_cache: true };

    pipeline::run(&deps, &request, FileKind::Doc).await;

    assert!(sink.enqueued.lock().unwrap().is_empty());
}
