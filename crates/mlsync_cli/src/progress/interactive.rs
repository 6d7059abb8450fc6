use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mlsync::entity::resource_kind::ResourceKind;
use mlsync::sync::{RunStatus, SyncProgress};

/// Counters shown on one resource's spinner.
struct ResourceState {
    bar: ProgressBar,
    fetched: usize,
    delivered: usize,
    failed: u64,
}

#[derive(Default)]
struct ProgressState {
    resources: HashMap<ResourceKind, ResourceState>,
    /// Single bar for catalog batches.
    dataset_bar: Option<ProgressBar>,
}

/// Interactive progress reporter using indicatif.
///
/// One spinner per resource, plus a bar for catalog batches. Throttle waits
/// are shown on the resource currently running.
pub(crate) struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::ResourceStarted { resource, since } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{:12}", resource.as_str()));
                bar.enable_steady_tick(Duration::from_millis(100));
                bar.set_message(match since {
                    Some(ts) => format!("Fetching changes since {}...", ts.format("%Y-%m-%d %H:%M")),
                    None => "Fetching all visible records...".to_string(),
                });
                state.resources.insert(
                    resource,
                    ResourceState {
                        bar,
                        fetched: 0,
                        delivered: 0,
                        failed: 0,
                    },
                );
            }

            SyncProgress::ResourceSkipped { resource, reason } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{:12}", resource.as_str()));
                bar.finish_with_message(format!("- skipped: {}", reason));
            }

            SyncProgress::PageFetched {
                resource,
                page,
                fetched,
                delivered,
                ..
            } => {
                if let Some(rs) = state.resources.get_mut(&resource) {
                    rs.fetched += fetched;
                    rs.delivered += delivered;
                    rs.bar.set_message(format!(
                        "Page {} ({} fetched, {} kept, {} failed)",
                        page, rs.fetched, rs.delivered, rs.failed
                    ));
                }
            }

            SyncProgress::RecordFailed { resource, .. } => {
                if let Some(rs) = state.resources.get_mut(&resource) {
                    rs.failed += 1;
                }
            }

            SyncProgress::Throttled {
                kind,
                wait_secs,
                attempt,
            } => {
                let message = format!(
                    "Throttled ({}), waiting {}s before attempt {}...",
                    kind,
                    wait_secs,
                    attempt + 1
                );
                match state.resources.values().find(|rs| !rs.bar.is_finished()) {
                    Some(rs) => rs.bar.set_message(message),
                    None => {
                        let _ = self.multi.println(message);
                    }
                }
            }

            SyncProgress::EmergencyStop { message, .. } => {
                let _ = self.multi.println(format!("! Emergency stop: {}", message));
            }

            SyncProgress::ResourceFinished {
                resource,
                status,
                created,
                updated,
                deleted,
                failed,
                ..
            } => {
                if let Some(rs) = state.resources.get(&resource) {
                    let mark = match status {
                        RunStatus::Success => "✓",
                        RunStatus::Paused | RunStatus::RateLimitExceeded => "‖",
                        RunStatus::Error => "✗",
                    };
                    rs.bar.finish_with_message(format!(
                        "{} {}: {} created, {} updated, {} deleted, {} failed",
                        mark, status, created, updated, deleted, failed
                    ));
                }
            }

            SyncProgress::DatasetBatch { batch, total, size } => {
                if state.dataset_bar.is_none() {
                    let pb = self.multi.add(ProgressBar::new(total as u64));
                    pb.set_style(Self::bar_style());
                    pb.set_prefix(format!("{:12}", "Datasets"));
                    state.dataset_bar = Some(pb);
                }
                if let Some(ref pb) = state.dataset_bar {
                    pb.set_position(batch as u64);
                    pb.set_message(format!("batch of {}", size));
                }
            }

            SyncProgress::RunFinished { status, .. } => {
                if let Some(ref pb) = state.dataset_bar {
                    pb.finish_with_message(format!("{}", status));
                }
            }

            SyncProgress::Warning { message } => {
                let _ = self.multi.println(format!("⚠ {}", message));
            }

            _ => {}
        }
    }

    /// Finish any bar still running.
    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for rs in state.resources.values() {
            if !rs.bar.is_finished() {
                rs.bar.finish();
            }
        }
        if let Some(ref pb) = state.dataset_bar
            && !pb.is_finished()
        {
            pb.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}
