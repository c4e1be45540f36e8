//! Semantic folder matcher: computes a folder assignment by vector
//! similarity and decides whether to override the model's own category.

use std::collections::BTreeMap;
use std::sync::Arc;

use organizer_domain::constants::{
    FOLDER_MATCH_CONFIDENCE, FOLDER_MATCH_TOP_K, FOLDER_UPSERT_DEDUP_TTL_MS,
    MAX_FOLDER_MATCH_TEXT_SNIPPET_CHARS,
};
use organizer_domain::normalize::is_generic_category;
use organizer_domain::ports::{CallOptions, Cache, ModelRuntime, ScoredRecord, VectorRecord, VectorStore};
use organizer_domain::value_objects::{smart_folder_set_fingerprint, CategorySource, SmartFolder};
use organizer_domain::{Error, Result};

/// Static semantic-enrichment dictionary for uncommon file extensions.
/// Common, already-distinctive extensions are
/// deliberately absent: enriching `pdf`/`jpg`/`mp3`/`js` et al. would add
/// noise rather than signal and risks false folder matches.
const SEMANTIC_EXTENSION_TERMS: &[(&str, &str)] = &[
    ("stl", "3d, print, model, mesh"),
    ("obj", "3d, model, mesh, geometry"),
    ("gcode", "3d print, cnc, toolpath"),
    ("psd", "photoshop, layered image, design"),
    ("ai", "illustrator, vector art, design"),
    ("sketch", "ui design, wireframe, mockup"),
    ("fig", "figma, ui design, prototype"),
    ("eps", "vector graphic, print design"),
    ("dwg", "cad, architectural drawing, blueprint"),
    ("ifc", "bim, building model, construction"),
    ("gpx", "gps track, route, hiking"),
    ("kml", "map overlay, geospatial"),
    ("srt", "subtitle, captions, video transcript"),
    ("torrent", "download metadata, peer-to-peer"),
];

/// Common extensions excluded from enrichment even though they could
/// technically match the table above by coincidence.
const COMMON_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "mp3", "mp4", "js", "ts", "doc", "docx", "xls", "xlsx",
    "ppt", "pptx", "txt", "csv", "json", "html", "zip", "mov", "wav",
];

/// Look up semantic enrichment terms for an extension, honoring the
/// common-extension exclusion.
#[must_use]
pub fn semantic_extension_terms(extension: &str) -> Option<&'static str> {
    let ext = extension.trim_start_matches('.').to_lowercase();
    if COMMON_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    SEMANTIC_EXTENSION_TERMS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, terms)| *terms)
}

/// Fields fed into the folder-matcher embedding input.
#[derive(Debug, Clone, Default)]
pub struct FolderMatchInput {
    /// File's summary from the model response.
    pub summary: String,
    /// Inferred purpose.
    pub purpose: String,
    /// Inferred project.
    pub project: String,
    /// Keyword set.
    pub keywords: Vec<String>,
    /// Content type tag, images only.
    pub content_type: Option<String>,
    /// Extracted text, truncated to the snippet cap by the caller or here.
    pub extracted_text: String,
    /// File extension, used for semantic enrichment lookup.
    pub extension: String,
}

/// Build the text fed to `embed_text` for folder matching: concatenated analysis fields plus a capped text snippet,
/// enriched for uncommon extensions only.
#[must_use]
pub fn build_embedding_input(input: &FolderMatchInput) -> String {
    let mut parts = vec![input.summary.clone(), input.purpose.clone(), input.project.clone()];
    if !input.keywords.is_empty() {
        parts.push(input.keywords.join(", "));
    }
    if let Some(ct) = &input.content_type {
        parts.push(ct.clone());
    }
    let snippet: String = input.extracted_text.chars().take(MAX_FOLDER_MATCH_TEXT_SNIPPET_CHARS).collect();
    if !snippet.is_empty() {
        parts.push(snippet);
    }
    if let Some(terms) = semantic_extension_terms(&input.extension) {
        parts.push(terms.to_string());
    }
    parts.into_iter().filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" | ")
}

/// Outcome of a folder-match pass: the embedding produced (for the
/// caller to forward to the embedding queue) and the top scoring folder,
/// if any.
#[derive(Debug, Clone)]
pub struct FolderMatchOutcome {
    /// The embedding vector computed from `build_embedding_input`.
    pub vector: Vec<f32>,
    /// Name of the embedding model that produced `vector`.
    pub model: String,
    /// Highest-scoring folder match, if the query returned any results.
    pub top: Option<ScoredRecord>,
    /// Whether `result.category` was overridden by this pass.
    pub overrode_category: bool,
}

/// Computes folder assignment via vector similarity against the `folders`
/// collection, de-duplicating repeated upserts for an unchanged smart
/// folder set.
pub struct SemanticFolderMatcher {
    vector_store: Arc<dyn VectorStore>,
    model_runtime: Arc<dyn ModelRuntime>,
    upsert_dedup_cache: Arc<dyn Cache>,
}

impl SemanticFolderMatcher {
    /// Build a matcher over the given collaborators.
    #[must_use]
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        model_runtime: Arc<dyn ModelRuntime>,
        upsert_dedup_cache: Arc<dyn Cache>,
    ) -> Self {
        Self { vector_store, model_runtime, upsert_dedup_cache }
    }

    /// Upsert folder embeddings unless the fingerprint was already upserted
    /// within the dedup window.
    pub async fn ensure_folders_upserted(
        &self,
        folders: &[SmartFolder],
        embed_opts: &CallOptions,
    ) -> Result<()> {
        if folders.is_empty() {
            return Ok(());
        }
        let fingerprint = smart_folder_set_fingerprint(folders);
        if self.upsert_dedup_cache.get(&fingerprint).await?.is_some() {
            return Ok(());
        }
        let mut records = Vec::with_capacity(folders.len());
        for folder in folders {
            let embedded = self
                .model_runtime
                .embed_text(&format!("{}: {}", folder.name, folder.description), embed_opts)
                .await?;
            let mut metadata = BTreeMap::new();
            metadata.insert("name".to_string(), serde_json::Value::String(folder.name.clone()));
            metadata.insert("path".to_string(), serde_json::Value::String(folder.path.clone()));
            records.push(VectorRecord {
                id: format!("folder:{}", folder.id),
                vector: embedded.vector,
                metadata,
            });
        }
        self.vector_store.batch_upsert_folders(records).await?;
        self.upsert_dedup_cache
            .set(&fingerprint, "1".to_string(), FOLDER_UPSERT_DEDUP_TTL_MS)
            .await?;
        Ok(())
    }

    /// Run the full match protocol: embed the input, query the `folders`
    /// collection, and decide whether to override `result`'s category.
    pub async fn match_and_maybe_override(
        &self,
        result: &mut organizer_domain::value_objects::AnalysisResult,
        input: &FolderMatchInput,
        folders: &[SmartFolder],
        raw_llm_confidence: Option<f32>,
        embed_opts: &CallOptions,
    ) -> Result<FolderMatchOutcome> {
        let text = build_embedding_input(input);
        let embedded = self.model_runtime.embed_text(&text, embed_opts).await?;
        if embedded.vector.is_empty() || embedded.vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument {
                message: "folder-match embedding was empty or non-finite".to_string(),
            });
        }

        let matches =
            self.vector_store.query_folders_by_vector(&embedded.vector, FOLDER_MATCH_TOP_K).await?;
        let top = matches.into_iter().max_by(|a, b| a.score.total_cmp(&b.score));

        let category_matches_a_folder =
            folders.iter().any(|f| f.name.eq_ignore_ascii_case(&result.category));
        let llm_conf = if is_generic_category(&result.category) || !category_matches_a_folder {
            0.0
        } else {
            raw_llm_confidence
                .map(|c| if c > 1.0 { c / 100.0 } else { c })
                .unwrap_or(0.7)
        };

        let mut overrode = false;
        if let Some(top_match) = &top {
            if top_match.score >= FOLDER_MATCH_CONFIDENCE && top_match.score > llm_conf {
                let folder_name = top_match
                    .metadata
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&top_match.id)
                    .to_string();
                let folder_path =
                    top_match.metadata.get("path").and_then(|v| v.as_str()).map(str::to_string);
                result.llm_original_category = Some(result.category.clone());
                result.category = folder_name.clone();
                result.category_source = CategorySource::EmbeddingOverride;
                result.suggested_folder = Some(folder_name);
                result.destination_folder = folder_path;
                overrode = true;
            } else if top_match.score >= FOLDER_MATCH_CONFIDENCE {
                result.category_source = CategorySource::LlmPreserved;
            }
        }

        Ok(FolderMatchOutcome {
            vector: embedded.vector,
            model: embedded.model,
            top,
            overrode_category: overrode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncommon_extension_gets_enrichment() {
        assert_eq!(semantic_extension_terms("stl"), Some("3d, print, model, mesh"));
        assert_eq!(semantic_extension_terms(".STL"), Some("3d, print, model, mesh"));
    }

    #[test]
    fn common_extensions_are_excluded() {
        assert_eq!(semantic_extension_terms("pdf"), None);
        assert_eq!(semantic_extension_terms("jpg"), None);
    }

    #[test]
    fn embedding_input_concatenates_fields_and_enrichment() {
        let input = FolderMatchInput {
            summary: "A 3D printable vase".to_string(),
            purpose: "decoration".to_string(),
            project: String::new(),
            keywords: vec!["vase".to_string()],
            content_type: None,
            extracted_text: String::new(),
            extension: "stl".to_string(),
        };
        let text = build_embedding_input(&input);
        assert!(text.contains("3D printable vase"));
        assert!(text.contains("3d, print, model, mesh"));
    }

    #[test]
    fn embedding_input_skips_empty_fields() {
        let input = FolderMatchInput::default();
        assert_eq!(build_embedding_input(&input), "");
    }
}
