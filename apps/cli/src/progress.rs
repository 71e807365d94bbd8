use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use vidreport_core::{ProgressError, services::ProgressSink};

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

struct Step {
    spinner: ProgressBar,
    message: String,
    started: Instant,
}

/// Renders each pipeline milestone as a spinner that turns into a check mark.
#[derive(Default)]
pub struct SpinnerProgress {
    current: Mutex<Option<Step>>,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressSink for SpinnerProgress {
    async fn report(&self, _job_id: &str, percent: i32, message: &str) -> Result<(), ProgressError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| ProgressError::Unavailable {
                reason: "spinner state poisoned".to_string(),
            })?;

        if let Some(step) = current.take() {
            let label = step.message.trim_end_matches("...");
            if percent < 0 {
                step.spinner.finish_with_message(format!(
                    "{} {}",
                    style("✗").red().bold(),
                    style(label).red()
                ));
            } else {
                step.spinner.finish_with_message(format!(
                    "{} {} {}",
                    style("✓").green().bold(),
                    label,
                    style(format!("[{}]", format_duration(step.started.elapsed()))).dim()
                ));
            }
        }

        match percent {
            p if p < 0 => println!("{} {}", style("Error:").red().bold(), message),
            p if p >= 100 => println!("{} {}", style("✓").green().bold(), message),
            _ => {
                *current = Some(Step {
                    spinner: create_spinner(message),
                    message: message.to_string(),
                    started: Instant::now(),
                })
            }
        }
        Ok(())
    }
}

/// Forwards every update to each sink; the first failure is returned after all were tried.
pub struct FanOut(pub Vec<Arc<dyn ProgressSink>>);

#[async_trait]
impl ProgressSink for FanOut {
    async fn report(&self, job_id: &str, percent: i32, message: &str) -> Result<(), ProgressError> {
        let mut first_error = None;
        for sink in &self.0 {
            if let Err(e) = sink.report(job_id, percent, message).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
