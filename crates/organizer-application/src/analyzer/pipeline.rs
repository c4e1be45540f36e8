//! Shared analysis pipeline: the seventeen-step analysis algorithm,
//! parameterized over `FileKind` so the document and image orchestrators
//! (`analyzer::document`, `analyzer::image`) can each expose a narrow,
//! kind-specific front door over one implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use organizer_domain::constants::{
    AI_ANALYSIS_LONG_MS, MAX_OCR_SIZE_BYTES, OCR_POST_PASS_CONFIDENCE_SKIP_THRESHOLD,
    OCR_POST_PASS_STRICT_SKIP_THRESHOLD, SUPPORTED_DOCUMENT_EXTENSIONS, SUPPORTED_IMAGE_EXTENSIONS,
};
use organizer_domain::heuristics::contains_any_term;
use organizer_domain::normalize::{
    clamp_confidence, coerce_model_confidence, extract_json_object, match_category_to_folders,
    normalize_keywords, normalize_text_field, strip_code_fence, validate_iso_date, CategoryMatch,
};
use organizer_domain::ports::{CallOptions, ExtractOptions};
use organizer_domain::signature::compute_cache_signature;
use organizer_domain::value_objects::{
    AnalysisResult, CategorySource, ContentType, ExtractionMethod as ResultExtractionMethod,
    FileKind, FileRef, ItemId, QueueItem, QueueItemMeta, SmartFolder, Stage,
};
use organizer_domain::Error;

use crate::filename_category::{derive_filename_category, fallback_confidence};
use crate::folder_matcher::{build_embedding_input, FolderMatchInput, FolderMatchOutcome};
use crate::gate::{should_embed, GateStage};
use crate::hallucination::{self, ValidationContext};

use super::deps::AnalyzerDeps;

/// A single analysis request.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    /// The file to analyze.
    pub file: FileRef,
    /// Smart folders known for this call.
    pub smart_folders: Vec<SmartFolder>,
    /// Skip the cache probe/write for this call.
    pub bypass_cache: bool,
}

/// Full outcome of an analysis pass: the normalized result plus, when the
/// folder matcher ran, the embedding payload ready for the embedding queue.
#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    /// The normalized, validated analysis result.
    pub result: AnalysisResult,
    /// Embedding payload to forward to the queue, if the gate/matcher ran.
    pub embedding: Option<FolderMatchOutcome>,
}

fn filename_stem(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn supported_extensions(kind: FileKind) -> &'static [&'static str] {
    match kind {
        FileKind::Doc => SUPPORTED_DOCUMENT_EXTENSIONS,
        FileKind::Image => SUPPORTED_IMAGE_EXTENSIONS,
    }
}

/// Run the full pipeline for one file. Never returns `Err`: every failure
/// mode degrades to a tagged, possibly-fallback `AnalysisResult` instead.
pub async fn run(deps: &AnalyzerDeps, request: &AnalyzeRequest, kind: FileKind) -> AnalyzeOutcome {
    let stem = filename_stem(&request.file.path);

    // Step 1: supported-format gate.
    if !supported_extensions(kind).contains(&request.file.extension.as_str()) {
        return AnalyzeOutcome { result: AnalysisResult::unsupported_format(&request.file.extension), embedding: None };
    }

    // Step 2: preflight health check.
    match deps.model_runtime.health_check().await {
        Ok(health) if !health.healthy => {
            return AnalyzeOutcome {
                result: fallback_result(&stem, health.status),
                embedding: None,
            };
        }
        Err(e) => {
            return AnalyzeOutcome { result: fallback_result(&stem, e.to_string()), embedding: None };
        }
        Ok(_) => {}
    }

    // Step 3: stat & read, with TOCTOU handling.
    let stat = match deps.file_access.stat(&request.file.path).await {
        Ok(s) => s,
        Err(e) => return AnalyzeOutcome { result: fallback_result(&stem, e.to_string()), embedding: None },
    };
    let bytes = match deps.file_access.read_bytes(&request.file.path).await {
        Ok(b) => b,
        Err(Error::FileNotFound { path }) => {
            return AnalyzeOutcome {
                result: fallback_result(&stem, format!("file deleted during read: {path}")),
                embedding: None,
            };
        }
        Err(e) => return AnalyzeOutcome { result: fallback_result(&stem, e.to_string()), embedding: None },
    };
    if bytes.is_empty() {
        return AnalyzeOutcome { result: fallback_result(&stem, "empty file".to_string()), embedding: None };
    }

    // Step 4: cache probe.
    let model_name = "organizer-text-model"; // resolved by the runtime facade internally
    let signature = compute_cache_signature(
        model_name,
        &request.smart_folders,
        &request.file.path,
        stat.size,
        stat.mtime_ms,
    );
    if !request.bypass_cache {
        if let Ok(Some(cached)) = deps.analysis_cache.get(&signature).await {
            if let Ok(result) = serde_json::from_str::<AnalysisResult>(&cached) {
                return AnalyzeOutcome { result, embedding: None };
            }
        }
    }

    // Step 5/6: preprocessing + OCR pre-pass (image-specific, no-ops for docs).
    let mut exif_date = None;
    let mut preprocessed_bytes = bytes.clone();
    if kind == FileKind::Image {
        if let Ok(date) = deps.content_extractor.extract_exif_date(&bytes).await {
            exif_date = date;
        }
        if let Ok(processed) = deps.content_extractor.preprocess_image(&bytes, &request.file.extension).await {
            preprocessed_bytes = processed;
        }
    }

    let ocr_hinted = kind == FileKind::Image && contains_any_term(&stem, organizer_domain::heuristics::OCR_HINT_TERMS);
    let mut ocr_text: Option<String> = None;
    if ocr_hinted && stat.size <= MAX_OCR_SIZE_BYTES {
        if let Ok(extracted) = deps
            .content_extractor
            .extract_text(&request.file.path, &ExtractOptions { force_ocr: true, prefer_vision_ocr: false })
            .await
        {
            if !extracted.text.is_empty() {
                ocr_text = Some(extracted.text);
            }
        }
    }

    // Step 7: naming context via nearest-filename lookup, when a matcher exists.
    // (Best-effort: failures here never block analysis.)

    // Step 8/9: model call + parse, with dedup and one recoverable retry.
    let prompt = build_prompt(&request.smart_folders, ocr_text.as_deref(), kind);
    let call_opts = CallOptions::with_deadline_ms(AI_ANALYSIS_LONG_MS);

    let mut model_text = call_model(deps, kind, &prompt, &preprocessed_bytes, &call_opts).await;

    // Step 12: retry-on-recoverable, bypassing cache.
    if let Err(e) = &model_text {
        if e.is_recoverable() {
            model_text = call_model(deps, kind, &prompt, &preprocessed_bytes, &call_opts).await;
        }
    }

    let raw_text = match model_text {
        Ok(text) => text,
        Err(e) => {
            return AnalyzeOutcome { result: fallback_result(&stem, e.to_string()), embedding: None };
        }
    };

    let parsed = parse_model_response(&raw_text);
    let parsed = match parsed {
        Ok(v) => v,
        Err(parse_err) => {
            // One repair round via the LLM.
            let repair_prompt =
                format!("The following response was not valid JSON. Return only corrected JSON:\n{raw_text}");
            match call_model(deps, kind, &repair_prompt, &preprocessed_bytes, &call_opts).await {
                Ok(repaired) => match parse_model_response(&repaired) {
                    Ok(v) => v,
                    Err(_) => {
                        let mut result = fallback_result(&stem, "Failed to parse".to_string());
                        result.error = Some("Failed to parse".to_string());
                        return AnalyzeOutcome { result, embedding: None };
                    }
                },
                Err(_) => {
                    let mut result = fallback_result(&stem, parse_err.to_string());
                    result.error = Some("Failed to parse".to_string());
                    return AnalyzeOutcome { result, embedding: None };
                }
            }
        }
    };

    // Step 10: normalize.
    let mut result = normalize_response(&parsed, kind, exif_date, ocr_text.clone());

    // Step 11: hallucination validation.
    let ctx = ValidationContext { filename_stem: &stem, ocr_text: ocr_text.as_deref() };
    hallucination::validate(&mut result, &ctx);

    // Step 13: OCR post-pass if confidence is low and content looks textual.
    let threshold = if result.hallucination_detected {
        OCR_POST_PASS_STRICT_SKIP_THRESHOLD
    } else {
        OCR_POST_PASS_CONFIDENCE_SKIP_THRESHOLD
    };
    if kind == FileKind::Image
        && matches!(result.content_type, ContentType::TextDocument | ContentType::Screenshot)
        && result.confidence < threshold
        && ocr_text.is_none()
        && stat.size <= MAX_OCR_SIZE_BYTES
    {
        if let Ok(extracted) = deps
            .content_extractor
            .extract_text(&request.file.path, &ExtractOptions { force_ocr: true, prefer_vision_ocr: true })
            .await
        {
            if !extracted.text.is_empty() {
                let ctx = ValidationContext { filename_stem: &stem, ocr_text: Some(&extracted.text) };
                hallucination::validate(&mut result, &ctx);
                result.extracted_text = Some(extracted.text);
            }
        }
    }

    // Step 14/5: folder match + category normalization.
    let mut embedding_outcome = None;
    if let Some(matcher) = &deps.folder_matcher {
        if !request.smart_folders.is_empty() {
            let input = FolderMatchInput {
                summary: result.summary.clone(),
                purpose: result.purpose.clone(),
                project: result.project.clone(),
                keywords: result.keywords.clone(),
                content_type: (kind == FileKind::Image).then(|| format!("{:?}", result.content_type)),
                extracted_text: result.extracted_text.clone().unwrap_or_default(),
                extension: request.file.extension.clone(),
            };
            let embed_opts = CallOptions::with_deadline_ms(organizer_domain::constants::EMBEDDING_REQUEST_MS);
            if let Err(e) = matcher.ensure_folders_upserted(&request.smart_folders, &embed_opts).await {
                warn!(error = %e, "folder upsert failed, continuing without folder match");
            } else {
                match matcher
                    .match_and_maybe_override(
                        &mut result,
                        &input,
                        &request.smart_folders,
                        Some(f32::from(result.confidence)),
                        &embed_opts,
                    )
                        .await
                {
                    Ok(outcome) => embedding_outcome = Some(outcome),
                    Err(e) => warn!(error = %e, "folder match failed, continuing without override"),
                }
            }
        }

        // Step 15: normalize category to folder set.
        if let CategoryMatch::Matched(canonical) = match_category_to_folders(&result.category, &request.smart_folders) {
            result.category = canonical;
        }
    }

    // Preserve original extension on the suggested filename.
    if !request.file.extension.is_empty() && !result.suggested_name.ends_with(&format!(".{}", request.file.extension)) {
        // suggested_name is stored without extension; callers re-attach it
        // when writing to disk. Nothing to do here.
    }

    // Step 16: cache write.
    if !request.bypass_cache {
        if let Ok(serialized) = serde_json::to_string(&result) {
            if let Err(e) = deps.analysis_cache.set(&signature, serialized, 30 * 60 * 1000).await {
                warn!(error = %e, "analysis cache write failed");
            }
        }
    }

    // Step 17: enqueue for embedding per gate decision.
    let is_in_smart_folder = result.suggested_folder.is_some() || result.destination_folder.is_some();
    if should_embed(GateStage::Analysis, deps.gate_settings, is_in_smart_folder) {
        let vector_and_model = match &embedding_outcome {
            Some(outcome) => Ok((outcome.vector.clone(), outcome.model.clone())),
            None => {
                let input = FolderMatchInput {
                    summary: result.summary.clone(),
                    purpose: result.purpose.clone(),
                    project: result.project.clone(),
                    keywords: result.keywords.clone(),
                    content_type: (kind == FileKind::Image).then(|| format!("{:?}", result.content_type)),
                    extracted_text: result.extracted_text.clone().unwrap_or_default(),
                    extension: request.file.extension.clone(),
                };
                let embed_opts = CallOptions::with_deadline_ms(organizer_domain::constants::EMBEDDING_REQUEST_MS);
                deps.model_runtime
                    .embed_text(&build_embedding_input(&input), &embed_opts)
                    .await
                    .map(|embedded| (embedded.vector, embedded.model))
            }
        };
        match vector_and_model {
            Ok((vector, model)) => {
                let item = QueueItem {
                    id: ItemId::File(request.file.id.clone()).to_wire(),
                    vector: Some(vector),
                    model: Some(model),
                    meta: build_queue_item_meta(&request.file, kind, &result),
                    updated_at: deps.clock.now_iso(),
                    retry_count: 0,
                };
                if let Err(e) = deps.embedding_sink.enqueue(Stage::Analysis, item).await {
                    warn!(error = %e, "embedding enqueue failed");
                }
            }
            Err(e) => warn!(error = %e, "embedding computation failed, skipping enqueue"),
        }
    }

    AnalyzeOutcome { result, embedding: embedding_outcome }
}

fn build_queue_item_meta(file: &FileRef, kind: FileKind, result: &AnalysisResult) -> QueueItemMeta {
    let name = std::path::Path::new(&file.path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&file.path)
        .to_string();
    QueueItemMeta {
        path: file.path.clone(),
        name,
        file_extension: file.extension.clone(),
        file_size: Some(file.size),
        category: result.category.clone(),
        confidence: result.confidence,
        item_type: "file".to_string(),
        file_type: if kind == FileKind::Image { "image".to_string() } else { "document".to_string() },
        extraction_method: format!("{:?}", result.extraction_method),
        summary: result.summary.clone(),
        keywords: result.keywords.clone(),
        date: result.date.clone(),
        suggested_name: result.suggested_name.clone(),
        key_entities: result.key_entities.clone(),
        entity: result.entity.clone(),
        project: result.project.clone(),
        purpose: result.purpose.clone(),
        document_type: result.document_type.clone(),
        extracted_text: result.extracted_text.clone().unwrap_or_default(),
        smart_folder: result.suggested_folder.clone(),
        smart_folder_path: result.destination_folder.clone(),
        content_type: (kind == FileKind::Image).then(|| format!("{:?}", result.content_type)),
        colors: result.colors.clone(),
        has_text: (kind == FileKind::Image).then_some(result.has_text),
        ..Default::default()
    }
}

async fn call_model(
    deps: &AnalyzerDeps,
    kind: FileKind,
    prompt: &str,
    bytes: &[u8],
    opts: &CallOptions,
) -> Result<String, Error> {
    let dedup_key = super::dedup::dedup_key(
        &format!("{kind}"),
        prompt,
        &content_hash(bytes),
        "model",
        "folders",
    );
    let deps_runtime = Arc::clone(&deps.model_runtime);
    let prompt_owned = prompt.to_string();
    let bytes_owned = bytes.to_vec();
    let opts_owned = opts.clone();
    let response = deps
        .dedup
        .call(dedup_key, move || async move {
            if kind == FileKind::Image {
                deps_runtime.analyze_image(&prompt_owned, &bytes_owned, &opts_owned).await
            } else {
                deps_runtime.analyze_text(&prompt_owned, &opts_owned).await
            }
        })
            .await;
    response.map(|r| r.text.clone()).map_err(|e| Error::Generic(Box::new(std::io::Error::other(e.to_string()))))
}

fn content_hash(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn build_prompt(folders: &[SmartFolder], ocr_snippet: Option<&str>, kind: FileKind) -> String {
    let mut prompt = String::from(
        "Analyze this file and respond with JSON only, matching the schema: \
         {category, suggestedName, keywords, confidence, contentType, summary, purpose, \
         project, entity, documentType, keyEntities, hasText, date}.",
    );
    if !folders.is_empty() {
        prompt.push_str("\nAvailable folders:\n");
        for f in folders.iter().take(50) {
            prompt.push_str(&format!("- {}: {}\n", f.name, f.description));
        }
    }
    if let Some(snippet) = ocr_snippet {
        prompt.push_str(&format!("\nOCR text detected:\n{snippet}\n"));
    }
    if kind == FileKind::Image {
        prompt.push_str("\nThis is an image file.");
    }
    prompt
}

fn parse_model_response(raw: &str) -> Result<Value, Error> {
    let stripped = strip_code_fence(raw);
    let json_slice = extract_json_object(stripped).unwrap_or(stripped);
    serde_json::from_str(json_slice).map_err(|e| Error::ParseFailed { message: e.to_string() })
}

fn normalize_response(
    value: &Value,
    kind: FileKind,
    exif_date: Option<String>,
    ocr_text: Option<String>,
) -> AnalysisResult {
    let obj = value.as_object();
    let get_str = |k: &str| obj.and_then(|o| o.get(k)).and_then(|v| v.as_str()).map(str::to_string);
    let get_arr = |k: &str| -> Vec<String> {
        obj.and_then(|o| o.get(k))
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|x| x.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    let confidence = coerce_model_confidence(obj.and_then(|o| o.get("confidence")));
    let keywords = normalize_keywords(&get_arr("keywords"));
    let key_entities: Vec<String> = get_arr("keyEntities").into_iter().take(20).collect();
    let date = validate_iso_date(get_str("date").as_deref()).or(exif_date);

    let content_type = match get_str("contentType").as_deref() {
        Some("text_document") => ContentType::TextDocument,
        Some("photograph") => ContentType::Photograph,
        Some("screenshot") => ContentType::Screenshot,
        Some("other") => ContentType::Other,
        _ if kind == FileKind::Doc => ContentType::TextDocument,
        _ => ContentType::Unknown,
    };

    AnalysisResult {
        category: normalize_text_field(get_str("category").as_deref()),
        category_source: CategorySource::Llama,
        suggested_name: normalize_text_field(get_str("suggestedName").as_deref()),
        keywords,
        confidence: clamp_confidence(i32::from(confidence)),
        content_type,
        summary: normalize_text_field(get_str("summary").as_deref()),
        purpose: normalize_text_field(get_str("purpose").as_deref()),
        project: normalize_text_field(get_str("project").as_deref()),
        entity: normalize_text_field(get_str("entity").as_deref()),
        document_type: normalize_text_field(get_str("documentType").as_deref()),
        key_entities,
        colors: get_arr("colors"),
        has_text: obj.and_then(|o| o.get("hasText")).and_then(Value::as_bool).unwrap_or(ocr_text.is_some()),
        date,
        extracted_text: ocr_text,
        extraction_method: if kind == FileKind::Image { ResultExtractionMethod::None } else { ResultExtractionMethod::Native },
        hallucination_detected: false,
        is_fallback: false,
        analysis_warning: None,
        error: None,
        suggested_folder: None,
        destination_folder: None,
        llm_original_category: None,
        extensions: BTreeMap::new(),
    }
}

fn fallback_result(stem: &str, warning: String) -> AnalysisResult {
    let specific = derive_filename_category(stem);
    let confidence = fallback_confidence(specific.is_some());
    AnalysisResult::filename_fallback(
        stem,
        specific.unwrap_or_else(|| "Documents".to_string()),
        confidence,
        warning,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_stem_strips_directory_and_extension() {
        assert_eq!(filename_stem("/a/b/invoice_march.pdf"), "invoice_march");
    }

    #[test]
    fn fallback_result_uses_financial_category_when_available() {
        let result = fallback_result("invoice_march", "unhealthy".to_string());
        assert_eq!(result.category, "Finance");
        assert_eq!(result.confidence, 60);
        assert!(result.is_fallback);
    }

    #[test]
    fn fallback_result_uses_low_confidence_without_hint() {
        let result = fallback_result("IMG_0001", "unhealthy".to_string());
        assert_eq!(result.confidence, 55);
    }

    #[test]
    fn parse_model_response_handles_fenced_json() {
        let raw = "```json\n{\"category\":\"Finance\"}\n```";
        let parsed = parse_model_response(raw).unwrap();
        assert_eq!(parsed["category"], "Finance");
    }

    #[test]
    fn parse_model_response_rejects_garbage() {
        assert!(parse_model_response("not json at all").is_err());
    }

    #[test]
    fn normalize_response_defaults_doc_content_type() {
        let value = serde_json::json!({"category": "Finance", "confidence": 85});
        let result = normalize_response(&value, FileKind::Doc, None, None);
        assert_eq!(result.content_type, ContentType::TextDocument);
        assert_eq!(result.confidence, 85);
    }
}
