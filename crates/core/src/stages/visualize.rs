//! Finds visualization opportunities in the summary and generates one
//! visualization per opportunity, each anchored to a summary paragraph.

use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{error, info, warn};

use crate::{
    config::PipelineConfig,
    extract::{extract_json_object, is_truthy},
    services::{LanguageModel, ProgressSink, Prompt, report_progress},
    stages::Stage,
    state::PipelineState,
    text::{char_len, split_paragraphs, take_chars},
    types::{InsertionPosition, VisualizationCandidate, VisualizationKind},
};

const CONTEXT_PROMPT: &str = r#"You are an assistant that analyzes summaries to identify visualization opportunities.
Return JSON with fields such as visualization_opportunities, key_concepts, and content_structure.
Each entry of visualization_opportunities has: content, location_hint (beginning, middle or end), visualization_type (chart, network, flow or table), purpose and user_benefit.
Ensure the response is a single valid JSON object."#;

const GENERATION_PROMPT: &str = r#"You generate a single visualization for a video summary report.
Return one valid JSON object with the fields: type (chart, network, flow or table), title, insight and data.
- chart: data = {"config": <Chart.js configuration>}
- network: data = {"data": {"nodes": [...], "edges": [...]}, "options": {...}}
- flow: data = {"data": {"nodes": [...], "edges": [...]}}
- table: data = {"headers": [...], "rows": [[...], ...]}
Only use facts present in the provided context."#;

/// Top-level keys gathered into the payload when the model omits a `data` object.
const PAYLOAD_KEYS: &[&str] = &["config", "data", "options", "headers", "rows", "styling"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LocationHint {
    Beginning,
    Middle,
    End,
    Other,
}

impl LocationHint {
    /// A missing hint means middle; `null` or any other value earns no bonus.
    fn parse(hint: Option<&Value>) -> Self {
        let Some(hint) = hint else {
            return LocationHint::Middle;
        };
        match hint.as_str().map(|h| h.trim().to_lowercase()).as_deref() {
            Some("beginning") => LocationHint::Beginning,
            Some("middle") => LocationHint::Middle,
            Some("end") => LocationHint::End,
            _ => LocationHint::Other,
        }
    }

    fn matches(&self, index: usize, total: usize) -> bool {
        let third = total / 3;
        match self {
            LocationHint::Beginning => index < third,
            LocationHint::Middle => third <= index && index < 2 * total / 3,
            LocationHint::End => index >= 2 * total / 3,
            LocationHint::Other => false,
        }
    }
}

/// One opportunity proposed by the context analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Opportunity {
    pub content: String,
    location_hint: LocationHint,
    pub purpose: String,
    pub user_benefit: String,
    raw: Value,
}

impl Opportunity {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(Self {
            content: text("content"),
            location_hint: LocationHint::parse(object.get("location_hint")),
            purpose: text("purpose"),
            user_benefit: text("user_benefit"),
            raw: value.clone(),
        })
    }
}

/// Pick the summary paragraph an opportunity belongs after.
///
/// Each paragraph scores one point per opportunity keyword (first five words of
/// its content) it contains, plus two when it falls in the hinted third. Ties
/// keep the earliest paragraph; with no positive score the position is 0.
pub fn find_best_position(summary: &str, opportunity: &Opportunity) -> InsertionPosition {
    let paragraphs = split_paragraphs(summary);
    let total = paragraphs.len();
    let content = opportunity.content.to_lowercase();
    let keywords: Vec<&str> = content.split_whitespace().take(5).collect();

    let mut best = InsertionPosition::default();
    for (index, paragraph) in paragraphs.iter().enumerate() {
        let lower = paragraph.to_lowercase();
        let mut score = keywords.iter().filter(|kw| lower.contains(*kw)).count();
        if opportunity.location_hint.matches(index, total) {
            score += 2;
        }
        if score > best.relevance_score {
            best = InsertionPosition {
                after_paragraph: index,
                relevance_score: score,
            };
        }
    }
    best
}

/// Normalize the generated object into the payload the renderer expects.
fn standardize_payload(kind: VisualizationKind, generated: &Value) -> Value {
    let graph = matches!(kind, VisualizationKind::Network | VisualizationKind::Flow);
    if let Some(Value::Object(data)) = generated.get("data") {
        // Graph payloads keep nodes and edges under their own `data` key.
        if !graph || data.contains_key("data") {
            return Value::Object(data.clone());
        }
    }

    let mut payload = Map::new();
    for key in PAYLOAD_KEYS {
        if let Some(value) = generated.get(*key) {
            payload.insert((*key).to_string(), value.clone());
        }
    }

    let has_nodes = payload
        .get("data")
        .and_then(|data| data.get("nodes"))
        .is_some();
    if graph && !has_nodes {
        let source = generated.get("data").unwrap_or(generated);
        if let Some(nodes) = source.get("nodes") {
            let edges = source.get("edges").cloned().unwrap_or_else(|| json!([]));
            payload.insert("data".to_string(), json!({ "nodes": nodes, "edges": edges }));
        }
    }

    Value::Object(payload)
}

pub struct VisualizeStage {
    model: Arc<dyn LanguageModel>,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl VisualizeStage {
    pub const NAME: &'static str = "visualize";

    pub fn new(
        model: Arc<dyn LanguageModel>,
        progress: Arc<dyn ProgressSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            model,
            progress,
            config,
        }
    }

    async fn analyze_context(&self, summary: &str) -> anyhow::Result<Value> {
        let reply = self
            .model
            .generate(&Prompt::new(CONTEXT_PROMPT, summary))
            .await?;
        let context = extract_json_object(&reply).context("Could not parse context analysis")?;
        if let Some(reason) = context.get("error") {
            bail!("context analysis reported an error: {}", reason);
        }
        if !is_truthy(Some(&context)) {
            bail!("context analysis returned an empty object");
        }
        Ok(context)
    }

    async fn generate_visualization(
        &self,
        context: &Value,
        opportunity: &Opportunity,
    ) -> anyhow::Result<Value> {
        let user = format!(
            "Context:\n{}\n\nOpportunity:\n{}",
            serde_json::to_string_pretty(context)?,
            serde_json::to_string_pretty(&opportunity.raw)?
        );
        let reply = self
            .model
            .generate(&Prompt::new(GENERATION_PROMPT, user))
            .await?;
        let generated = extract_json_object(&reply).context("Could not parse visualization")?;
        if let Some(reason) = generated.get("error") {
            bail!("visualization reported an error: {}", reason);
        }
        Ok(generated)
    }

    fn candidate(
        &self,
        summary: &str,
        opportunity: &Opportunity,
        generated: &Value,
    ) -> anyhow::Result<VisualizationCandidate> {
        let raw_kind = generated
            .get("type")
            .and_then(Value::as_str)
            .or_else(|| opportunity.raw.get("visualization_type").and_then(Value::as_str))
            .unwrap_or_default();
        let Some(kind) = VisualizationKind::parse(raw_kind) else {
            bail!("unknown visualization type {:?}", raw_kind);
        };

        let title = match generated.get("title").and_then(Value::as_str) {
            Some(title) => title,
            None if !opportunity.content.is_empty() => &opportunity.content,
            None => "Untitled",
        };

        Ok(VisualizationCandidate {
            title: take_chars(title, self.config.visualization_title_chars).to_string(),
            kind,
            payload: standardize_payload(kind, generated),
            insight: generated
                .get("insight")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            purpose: opportunity.purpose.clone(),
            user_benefit: opportunity.user_benefit.clone(),
            position: find_best_position(summary, opportunity),
        })
    }

    async fn visualize(&self, summary: &str) -> anyhow::Result<Vec<VisualizationCandidate>> {
        let context = self.analyze_context(summary).await?;
        let opportunities: Vec<Opportunity> = context
            .get("visualization_opportunities")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Opportunity::from_value).collect())
            .unwrap_or_default();
        info!(count = opportunities.len(), "Visualization opportunities found");

        let mut candidates = Vec::new();
        for (i, opportunity) in opportunities.iter().enumerate() {
            let result = self
                .generate_visualization(&context, opportunity)
                .await
                .and_then(|generated| self.candidate(summary, opportunity, &generated));
            match result {
                Ok(candidate) => {
                    info!(
                        index = i + 1,
                        kind = candidate.kind.as_str(),
                        after_paragraph = candidate.position.after_paragraph,
                        "Visualization generated"
                    );
                    candidates.push(candidate);
                }
                Err(e) => warn!(index = i + 1, "Visualization skipped: {:#}", e),
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl Stage for VisualizeStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
        report_progress(
            self.progress.as_ref(),
            state.job_id(),
            60,
            "Generating visual sections...",
        )
        .await;

        let summary = state.summary();
        if char_len(summary) < self.config.min_visualization_summary_chars {
            warn!(length = char_len(summary), "Summary too short, skipping visualization");
            return Ok(state.with_visualizations(Vec::new()));
        }

        let candidates = match self.visualize(summary).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("Visualization generation failed: {:#}", e);
                Vec::new()
            }
        };
        info!(count = candidates.len(), "Visual sections generated");
        Ok(state.with_visualizations(candidates))
    }
}
