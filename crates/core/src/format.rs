use crate::types::{FinalOutput, ReportSection};

pub fn format_report_readable(report: &FinalOutput) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", report.title));
    output.push_str(&format!(
        "**Sections:** {} | **Text:** {} | **Visualizations:** {}\n\n",
        report.statistics.total_sections,
        report.statistics.text_sections,
        report.statistics.visualizations
    ));

    output.push_str("## Summary\n\n");
    output.push_str(&report.summary);
    output.push_str("\n\n");

    for section in &report.sections {
        match section {
            ReportSection::Text(text) => {
                // Level 1 sections sit right under the report title.
                let depth = usize::from(text.level.clamp(1, 4)) + 1;
                output.push_str(&format!("{} {}\n\n", "#".repeat(depth), text.title));
                output.push_str(&format!("{}\n\n", text.content.trim()));
                if !text.keywords.is_empty() {
                    output.push_str(&format!("_Keywords: {}_\n\n", text.keywords.join(", ")));
                }
            }
            ReportSection::Visualization(visual) => {
                let kind = visual
                    .visualization_type
                    .map(|kind| kind.as_str())
                    .unwrap_or("unknown");
                output.push_str(&format!("### [{}] {}\n\n", kind, visual.title));
                if !visual.insight.is_empty() {
                    output.push_str(&format!("• {}\n", visual.insight));
                }
                if let Some(error) = &visual.error {
                    output.push_str(&format!("⚠ {}\n", error));
                }
                output.push('\n');
            }
        }
    }

    if let Some(error) = &report.process_info.error {
        output.push_str(&format!("**Error:** {}\n", error));
    }

    output
}
