use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationKind {
    Chart,
    Network,
    Flow,
    Table,
}

impl VisualizationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualizationKind::Chart => "chart",
            VisualizationKind::Network => "network",
            VisualizationKind::Flow => "flow",
            VisualizationKind::Table => "table",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "chart" => Some(VisualizationKind::Chart),
            "network" => Some(VisualizationKind::Network),
            "flow" | "flowchart" => Some(VisualizationKind::Flow),
            "table" => Some(VisualizationKind::Table),
            _ => None,
        }
    }
}

/// Paragraph of the summary after which a visualization is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionPosition {
    pub after_paragraph: usize,
    pub relevance_score: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualizationCandidate {
    pub title: String,
    pub kind: VisualizationKind,
    pub payload: Value,
    pub insight: String,
    pub purpose: String,
    pub user_benefit: String,
    pub position: InsertionPosition,
}

fn default_level() -> u8 {
    2
}

/// Strings from model output: `null` is empty, numbers and booleans are rendered.
fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Heading depth given as a number or a numeric string, saturated to `1..=255`.
fn loose_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let level = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(level.map_or(default_level(), |l| l.clamp(1, u8::MAX as u64) as u8))
}

/// A keyword list, a single keyword, or nothing.
fn loose_keywords<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextSection {
    #[serde(default, deserialize_with = "loose_string")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub title: String,
    #[serde(default = "default_level", deserialize_with = "loose_level")]
    pub level: u8,
    #[serde(default, deserialize_with = "loose_string")]
    pub content: String,
    #[serde(default, deserialize_with = "loose_keywords")]
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualSection {
    pub id: String,
    pub title: String,
    pub visualization_type: Option<VisualizationKind>,
    pub data: Option<Value>,
    #[serde(default)]
    pub insight: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub user_benefit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportSection {
    Text(TextSection),
    Visualization(VisualSection),
}

impl ReportSection {
    pub fn id(&self) -> &str {
        match self {
            ReportSection::Text(s) => &s.id,
            ReportSection::Visualization(s) => &s.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ReportSection::Text(s) => &s.title,
            ReportSection::Visualization(s) => &s.title,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ReportSection::Text(_))
    }
}

/// A section as assembled, before finalization has normalized it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionEntry {
    Section(ReportSection),
    /// Model output that did not match the section shape.
    Malformed(Value),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_sections: usize,
    pub text_sections: usize,
    pub visual_sections: usize,
    pub generated_at: String,
    pub user_id: String,
    pub job_id: String,
    #[serde(default)]
    pub error: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub title: String,
    pub summary_brief: String,
    pub sections: Vec<SectionEntry>,
    pub metadata: ReportMetadata,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_sections: usize,
    pub text_sections: usize,
    pub visualizations: usize,
}

impl Statistics {
    pub fn from_sections(sections: &[ReportSection]) -> Self {
        let text_sections = sections.iter().filter(|s| s.is_text()).count();
        Self {
            total_sections: sections.len(),
            text_sections,
            visualizations: sections.len() - text_sections,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub source_url: String,
    pub transcript_length: usize,
    pub summary_length: usize,
    pub user_id: String,
    pub job_id: String,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
    pub success: bool,
    pub title: String,
    pub summary: String,
    pub sections: Vec<ReportSection>,
    pub statistics: Statistics,
    pub process_info: ProcessInfo,
}

impl FinalOutput {
    /// Terminal output for a run that could not complete.
    pub fn failure(source_url: &str, job_id: &str, user_id: &str, error: &str) -> Self {
        Self {
            success: false,
            title: "Report Generation Failed".to_string(),
            summary: format!("Workflow execution error: {}", error),
            sections: Vec::new(),
            statistics: Statistics::default(),
            process_info: ProcessInfo {
                source_url: source_url.to_string(),
                user_id: user_id.to_string(),
                job_id: job_id.to_string(),
                error: Some(error.to_string()),
                ..ProcessInfo::default()
            },
        }
    }
}
