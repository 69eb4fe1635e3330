//! Case view controller: loads markers, builds the path, keeps selection in
//! step, and follows analysis jobs to completion.

use std::sync::Arc;

use anyhow::Context;
use casetrack_core::{
    JobProgress, JobResults, Marker, MarkerRecord, MarkerStats, ResolvedPoint, SelectionSync,
    VisualState,
};
use casetrack_geo::{PathBuilder, PathError, PathRender, PathSlot};
use casetrack_monitor::{JobCallbacks, JobMonitor, MonitorError};
use casetrack_sync::CaseClient;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::display;

pub enum WatchOutcome {
    Completed(JobResults),
    Failed(MonitorError),
    Cancelled,
}

enum JobEvent {
    Progress(JobProgress),
    Complete(JobResults),
    Error(MonitorError),
}

pub struct CaseView {
    client: Arc<CaseClient>,
    case_id: String,
    paths: PathBuilder,
    slot: PathSlot,
    selection: SelectionSync,
    markers: Vec<Marker>,
}

impl CaseView {
    pub fn new(client: Arc<CaseClient>, case_id: impl Into<String>, paths: PathBuilder) -> Self {
        Self {
            client,
            case_id: case_id.into(),
            paths,
            slot: PathSlot::new(),
            selection: SelectionSync::new(),
            markers: Vec::new(),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn stats(&self) -> MarkerStats {
        MarkerStats::from_markers(&self.markers)
    }

    /// Fetch the case's markers. Resets the selection.
    pub async fn reload(&mut self) -> anyhow::Result<Vec<VisualState>> {
        let records = self
            .client
            .list_markers(&self.case_id)
            .await
            .with_context(|| format!("loading markers for case {}", self.case_id))?;
        self.markers = records.into_iter().map(MarkerRecord::into_marker).collect();
        Ok(self.selection.reload(&self.markers))
    }

    /// Toggle selection of `marker_id` and re-render.
    pub fn select(&mut self, marker_id: &str) -> Vec<VisualState> {
        if !self.markers.iter().any(|m| m.id == marker_id) {
            warn!(marker = marker_id, case = %self.case_id, "no such marker to select");
        }
        self.selection.select(marker_id);
        self.selection.render(&self.markers)
    }

    /// Build the path for the loaded markers, reporting each point as it resolves.
    ///
    /// Returns `None` if a newer build superseded this one.
    pub async fn build_path<F>(&mut self, on_point: F) -> Option<&PathRender>
    where
        F: FnMut(&ResolvedPoint),
    {
        match self.paths.build_with(self.markers.clone(), on_point).await {
            Ok(render) => {
                self.slot.offer(render);
                self.slot.current()
            }
            Err(PathError::Superseded { run, current }) => {
                info!(run, current, "path build superseded");
                None
            }
        }
    }

    /// Follow `job_id` until it ends or Ctrl-C is pressed.
    pub async fn watch(&self, monitor: &JobMonitor, job_id: &str) -> WatchOutcome {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress_tx = tx.clone();
        let complete_tx = tx.clone();
        let callbacks = JobCallbacks::new()
            .on_progress(move |p| {
                let _ = progress_tx.send(JobEvent::Progress(p.clone()));
            })
            .on_complete(move |r| {
                let _ = complete_tx.send(JobEvent::Complete(r));
            })
            .on_error(move |e| {
                let _ = tx.send(JobEvent::Error(e));
            });

        let handle = monitor.start(&self.case_id, job_id, callbacks);
        let mut outcome = WatchOutcome::Cancelled;
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(JobEvent::Progress(p)) => display::print_progress(&p),
                    Some(JobEvent::Complete(r)) => outcome = WatchOutcome::Completed(r),
                    Some(JobEvent::Error(e)) => outcome = WatchOutcome::Failed(e),
                    // Every callback dropped: the monitor has finished.
                    None => break,
                },
                Ok(()) = &mut interrupt => {
                    warn!(job = job_id, "interrupted, cancelling job monitor");
                    handle.cancel();
                    break;
                }
            }
        }
        eprintln!();

        let state = handle.wait().await;
        info!(case = %self.case_id, job = job_id, state = state.as_str(), "job monitor finished");
        outcome
    }
}
