/*
 * ============================================================================
 * CAPTURE CONTROLLER MODULE
 * ============================================================================
 *
 * PURPOSE: Owns the capture session lifecycle from start to terminal state
 *
 * FUNCTIONALITY:
 * - Select a capture target in preference order and acquire its stream
 * - Drive the fixed 100ms progress tick; elapsed time is tick count, never
 *   frame timestamps
 * - Collect encoder chunks in arrival order, assemble and deliver the
 *   export, write the metadata sidecar
 * - Restore the showcase UI state on every terminal path
 * - Enforce at most one active session per gate (process-wide by default)
 *
 * LIFECYCLE: Idle -> Requesting -> Recording -> Finalizing -> Completed or
 * Failed. Requesting can fail straight to Failed. Teardown during
 * Requesting cancels; teardown during Recording finalizes what was
 * captured so far.
 *
 * ============================================================================
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::time::{interval_at, Instant};
use uuid::Uuid;

use crate::capture::encoder::{EncodeSettings, EncodeStats, EncoderRun, VideoEncoder};
use crate::capture::progress::ProgressReporter;
use crate::capture::source::{
    select_index, CaptureStream, CaptureTarget, TargetKind, TargetPreference, TrackHandle,
};
use crate::capture::storage::{sanitize_file_name, ExportStore};
use crate::capture::types::{
    Chunk, ExportArtifact, ExportMetadata, ExportRequest, PriorUiState, SessionCells,
    SessionOutcome, SessionStats, SessionStatus,
};
use crate::config::BridgeConfig;
use crate::error::{CaptureError, UserNotice};
use crate::showcase::turntable::SharedTurntable;

// The sole driver of elapsed time and progress
pub const PROGRESS_TICK: Duration = Duration::from_millis(100);

// =============================================================================
// Session Gate
// =============================================================================

static GLOBAL_SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

// Admission control for sessions. The global gate spans every controller in
// the process; isolated gates exist for embedded hosts and tests.
#[derive(Debug, Clone)]
pub struct CaptureGate {
    cell: GateCell,
}

#[derive(Debug, Clone)]
enum GateCell {
    Global,
    Local(Arc<AtomicBool>),
}

impl CaptureGate {
    pub fn global() -> Self {
        CaptureGate {
            cell: GateCell::Global,
        }
    }

    pub fn isolated() -> Self {
        CaptureGate {
            cell: GateCell::Local(Arc::new(AtomicBool::new(false))),
        }
    }

    fn flag(&self) -> &AtomicBool {
        match &self.cell {
            GateCell::Global => &GLOBAL_SESSION_ACTIVE,
            GateCell::Local(flag) => flag,
        }
    }

    pub fn is_active(&self) -> bool {
        self.flag().load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Option<GateGuard> {
        if self
            .flag()
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(GateGuard { gate: self.clone() })
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct GateGuard {
    gate: CaptureGate,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.flag().store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Start Outcome and Session Handle
// =============================================================================

#[derive(Debug)]
pub enum StartOutcome {
    Started(SessionHandle),
    // Another session holds the gate; the request is ignored, not queued
    AlreadyRecording,
    // No mounted capture target
    NoTarget,
}

impl StartOutcome {
    pub fn notice(&self) -> Option<UserNotice> {
        match self {
            StartOutcome::NoTarget => Some(UserNotice::nothing_to_record()),
            _ => None,
        }
    }

    pub fn session(self) -> Option<SessionHandle> {
        match self {
            StartOutcome::Started(handle) => Some(handle),
            _ => None,
        }
    }
}

// Host-side handle to a running session. Dropping it detaches the session;
// the capture still runs to its terminal state on its own.
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    cells: Arc<SessionCells>,
    teardown_tx: watch::Sender<bool>,
    outcome: oneshot::Receiver<SessionOutcome>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.cells.status()
    }

    pub fn progress(&self) -> ProgressReporter {
        ProgressReporter::new(Arc::clone(&self.cells))
    }

    // Cancel from the host side (view unmounted, app closing). Idempotent.
    // During Requesting this abandons the session; during Recording it
    // finalizes whatever was captured so far.
    pub fn teardown(&self) {
        let _ = self.teardown_tx.send(true);
    }

    pub async fn finished(self) -> SessionOutcome {
        match self.outcome.await {
            Ok(outcome) => outcome,
            // The session task never reports unless it was aborted outright
            Err(_) => SessionOutcome {
                session: self.id,
                status: SessionStatus::Failed,
                notice: UserNotice::export_failed(),
                artifact: None,
                error: Some(CaptureError::assembly("session task aborted")),
                stats: SessionStats {
                    elapsed_ms: self.cells.elapsed_ms(),
                    chunk_count: self.cells.chunk_count(),
                    payload_bytes: 0,
                },
            },
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

pub struct CaptureController {
    targets: Arc<Mutex<Vec<Arc<dyn CaptureTarget>>>>,
    preference: TargetPreference,
    encoder: Arc<dyn VideoEncoder>,
    store: ExportStore,
    turntable: SharedTurntable,
    settings: EncodeSettings,
    default_duration: Duration,
    default_file_name: String,
    gate: CaptureGate,
}

impl CaptureController {
    pub fn new(
        config: &BridgeConfig,
        turntable: SharedTurntable,
        encoder: Arc<dyn VideoEncoder>,
    ) -> Self {
        CaptureController {
            targets: Arc::new(Mutex::new(Vec::new())),
            preference: TargetPreference::default(),
            encoder,
            store: ExportStore::new(config.export_root()),
            turntable,
            settings: config.encode_settings(),
            default_duration: config.export_duration(),
            default_file_name: config.file_name.clone(),
            gate: CaptureGate::global(),
        }
    }

    pub fn with_gate(mut self, gate: CaptureGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_preference(mut self, preference: TargetPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn add_target(&mut self, target: Arc<dyn CaptureTarget>) {
        self.targets.lock().unwrap().push(target);
    }

    pub fn session_active(&self) -> bool {
        self.gate.is_active()
    }

    pub fn store(&self) -> &ExportStore {
        &self.store
    }

    // Start one export session. Must be called on a tokio runtime; the
    // session itself runs as a spawned task.
    pub fn start(&self, request: ExportRequest) -> StartOutcome {
        {
            let targets = self.targets.lock().unwrap();
            if select_index(&self.preference, &targets).is_none() {
                log::warn!("export requested with no mounted capture target");
                return StartOutcome::NoTarget;
            }
        }

        let Some(gate) = self.gate.try_acquire() else {
            log::info!("export requested while a session is active, ignoring");
            return StartOutcome::AlreadyRecording;
        };

        let duration = request.duration.unwrap_or(self.default_duration);
        let file_name = sanitize_file_name(
            request
                .file_name
                .as_deref()
                .unwrap_or(self.default_file_name.as_str()),
        );
        let id = Uuid::new_v4();
        let cells = Arc::new(SessionCells::new(duration));
        cells.set_status(SessionStatus::Requesting);

        // The encoder bounds its own runtime by the requested duration
        let mut settings = self.settings.clone();
        settings.duration = duration;

        // Snapshot what the user had, then pose the showcase for capture
        let prior = PriorUiState::capture(&self.turntable);
        pose_for_capture(&self.turntable);

        log::info!(
            "capture session {} started ({} ms, \"{}\")",
            id,
            duration.as_millis(),
            file_name
        );

        let (teardown_tx, teardown_rx) = watch::channel(false);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let task = SessionTask {
            id,
            cells: Arc::clone(&cells),
            targets: Arc::clone(&self.targets),
            preference: self.preference.clone(),
            encoder: Arc::clone(&self.encoder),
            store: self.store.clone(),
            settings,
            turntable: Arc::clone(&self.turntable),
            file_name,
            prior,
            started_at: Utc::now(),
            _gate: gate,
        };
        tokio::spawn(task.run(teardown_rx, outcome_tx));

        StartOutcome::Started(SessionHandle {
            id,
            cells,
            teardown_tx,
            outcome: outcome_rx,
        })
    }
}

// Reset to the canonical start pose so every export films the same
// revolution
fn pose_for_capture(turntable: &SharedTurntable) {
    let mut guard = turntable.lock().unwrap();
    guard.set_rotation(0.0);
    guard.set_playing(true);
    guard.set_auto_rotate(true);
}

// Resolves once teardown is requested; pends forever if the handle is gone
// so a detached session just runs out its clock.
async fn wait_teardown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Session Task
// =============================================================================

// What the session leaves behind, before the outcome is built
enum Delivery {
    // Artifact plus payload size
    Done(ExportArtifact, u64),
    Error(CaptureError),
    // Torn down before recording began
    Cancelled,
}

struct SessionTask {
    id: Uuid,
    cells: Arc<SessionCells>,
    targets: Arc<Mutex<Vec<Arc<dyn CaptureTarget>>>>,
    preference: TargetPreference,
    encoder: Arc<dyn VideoEncoder>,
    store: ExportStore,
    settings: EncodeSettings,
    turntable: SharedTurntable,
    file_name: String,
    prior: PriorUiState,
    started_at: DateTime<Utc>,
    _gate: GateGuard,
}

impl SessionTask {
    async fn run(
        self,
        mut teardown: watch::Receiver<bool>,
        outcome_tx: oneshot::Sender<SessionOutcome>,
    ) {
        let outcome = self.drive(&mut teardown).await;
        let id = self.id;
        // Release the gate before publishing the outcome so a caller that
        // awaits it can start the next session immediately
        drop(self);
        log::info!("session {} finished: {:?}", id, outcome.status);
        let _ = outcome_tx.send(outcome);
    }

    async fn drive(&self, teardown: &mut watch::Receiver<bool>) -> SessionOutcome {
        // Acquisition can block on user mediation, so it runs off the
        // runtime; teardown while it waits abandons the session and a
        // reaper releases the stream whenever it finally shows up.
        let targets = Arc::clone(&self.targets);
        let preference = self.preference.clone();
        let mut open_join = tokio::task::spawn_blocking(
            move || -> Result<(CaptureStream, TargetKind), CaptureError> {
                // Lock only long enough to pick; open() can block on user
                // mediation and must not hold the target list hostage
                let target = {
                    let guard = targets.lock().unwrap();
                    let Some(idx) = select_index(&preference, &guard) else {
                        log::warn!("capture target vanished before acquisition");
                        return Err(CaptureError::PermissionDenied);
                    };
                    Arc::clone(&guard[idx])
                };
                let kind = target.kind();
                let stream = target.open()?;
                Ok((stream, kind))
            },
        );

        let (stream, kind) = tokio::select! {
            res = &mut open_join => match res {
                Ok(Ok(acquired)) => acquired,
                Ok(Err(e)) => return self.finish(Delivery::Error(e), None, 0),
                Err(join_err) => {
                    return self.finish(
                        Delivery::Error(CaptureError::assembly(format!(
                            "capture target task failed: {}",
                            join_err
                        ))),
                        None,
                        0,
                    );
                }
            },
            _ = wait_teardown(teardown) => {
                log::info!("session {} torn down while requesting", self.id);
                tokio::spawn(async move {
                    if let Ok(Ok((stream, _))) = open_join.await {
                        log::info!("releasing stream acquired after teardown");
                        stream.tracks.stop_all();
                    }
                });
                return self.finish(Delivery::Cancelled, None, 0);
            }
        };

        let (width, height) = stream.frames.dimensions();
        let tracks = stream.tracks.clone();
        log::info!(
            "session {}: stream acquired from {} ({}x{})",
            self.id,
            kind.as_str(),
            width,
            height
        );

        let run = match self.encoder.begin(stream.frames, &self.settings) {
            Ok(run) => run,
            Err(e) => return self.finish(Delivery::Error(e), Some(&tracks), 0),
        };
        self.cells.set_status(SessionStatus::Recording);

        let (encode_result, chunks, elapsed_ms) = self.record_loop(run, teardown).await;

        let delivery = match encode_result {
            Ok(stats) => self.assemble(stats, chunks, elapsed_ms, kind),
            Err(e) => Delivery::Error(e),
        };
        self.finish(delivery, Some(&tracks), elapsed_ms)
    }

    // The recording select loop: progress ticks, chunk arrivals, teardown,
    // and encoder completion. Returns once the encoder reports.
    async fn record_loop(
        &self,
        run: EncoderRun,
        teardown: &mut watch::Receiver<bool>,
    ) -> (Result<EncodeStats, CaptureError>, Vec<Chunk>, u64) {
        let EncoderRun {
            mut chunks,
            stop,
            mut done,
        } = run;
        let duration_ms = self.cells.duration_ms();
        let mut collected: Vec<Chunk> = Vec::new();
        let mut elapsed_ms: u64 = 0;
        let mut timer_live = true;
        let mut chunks_open = true;
        let mut teardown_seen = false;
        let mut ticker = interval_at(Instant::now() + PROGRESS_TICK, PROGRESS_TICK);

        let encode_result = loop {
            tokio::select! {
                _ = ticker.tick(), if timer_live => {
                    elapsed_ms += PROGRESS_TICK.as_millis() as u64;
                    self.cells.set_elapsed_ms(elapsed_ms);
                    if elapsed_ms >= duration_ms {
                        log::info!(
                            "session {}: duration reached at {} ms, stopping encoder",
                            self.id,
                            elapsed_ms
                        );
                        self.cells.set_status(SessionStatus::Finalizing);
                        stop.request();
                        // The tick stops driving elapsed time from here on,
                        // whatever the encoder does next
                        timer_live = false;
                    }
                }
                maybe = chunks.recv(), if chunks_open => {
                    match maybe {
                        Some(chunk) => {
                            collected.push(chunk);
                            self.cells.record_chunk();
                        }
                        None => chunks_open = false,
                    }
                }
                _ = wait_teardown(teardown), if !teardown_seen => {
                    teardown_seen = true;
                    log::info!(
                        "session {}: teardown requested at {} ms, stopping encoder",
                        self.id,
                        elapsed_ms
                    );
                    self.cells.set_status(SessionStatus::Finalizing);
                    stop.request();
                    timer_live = false;
                }
                res = &mut done => {
                    break match res {
                        Ok(result) => result,
                        Err(_) => Err(CaptureError::assembly("encoder ended without reporting")),
                    };
                }
            }
        };

        // Every chunk the encoder flushed is queued by the time done fires;
        // drain the remainder in arrival order, exactly once
        while let Ok(chunk) = chunks.try_recv() {
            collected.push(chunk);
            self.cells.record_chunk();
        }
        if self.cells.status() == SessionStatus::Recording {
            // The encoder stopped on its own (feed ended or it crashed)
            self.cells.set_status(SessionStatus::Finalizing);
        }

        (encode_result, collected, elapsed_ms)
    }

    // Concatenate chunks in arrival order and deliver video plus sidecar.
    fn assemble(
        &self,
        stats: EncodeStats,
        chunks: Vec<Chunk>,
        elapsed_ms: u64,
        source: TargetKind,
    ) -> Delivery {
        if chunks.is_empty() {
            return Delivery::Error(CaptureError::EmptyCapture);
        }

        let total: usize = chunks.iter().map(|c| c.data.len()).sum();
        let mut payload = Vec::with_capacity(total);
        for chunk in &chunks {
            payload.extend_from_slice(&chunk.data);
        }
        log::info!(
            "session {}: assembling {} chunks into {} bytes",
            self.id,
            chunks.len(),
            total
        );

        let paths = match self.store.reserve(&self.file_name) {
            Ok(paths) => paths,
            Err(e) => return Delivery::Error(e),
        };
        if let Err(e) = self.store.write_video(&paths, &payload) {
            return Delivery::Error(e);
        }

        let metadata = ExportMetadata {
            id: self.id.to_string(),
            file_name: format!("{}.mp4", paths.stem),
            format: "mp4".to_string(),
            codec: "h264".to_string(),
            framerate: self.settings.fps,
            width: self.settings.output_width,
            height: self.settings.output_height(),
            source: source.as_str().to_string(),
            start_time: self.started_at.to_rfc3339(),
            end_time: Utc::now().to_rfc3339(),
            duration_seconds: elapsed_ms as f64 / 1000.0,
            frame_count: stats.frames_fed,
            chunk_count: chunks.len() as u64,
            total_bytes: total as u64,
        };
        if let Err(e) = self.store.write_sidecar(&paths, &metadata) {
            return Delivery::Error(e);
        }

        Delivery::Done(
            ExportArtifact {
                video_path: paths.video,
                sidecar_path: paths.sidecar,
                metadata,
            },
            total as u64,
        )
    }

    // Single exit point: release tracks, hand the showcase back, report.
    fn finish(
        &self,
        delivery: Delivery,
        tracks: Option<&TrackHandle>,
        elapsed_ms: u64,
    ) -> SessionOutcome {
        if let Some(tracks) = tracks {
            tracks.stop_all();
        }
        // Restored on every terminal path, success or not
        self.prior.restore(&self.turntable);

        let (status, notice, artifact, error, payload_bytes) = match delivery {
            Delivery::Done(artifact, bytes) => {
                log::info!(
                    "session {}: export complete -> {:?}",
                    self.id,
                    artifact.video_path
                );
                (
                    SessionStatus::Completed,
                    UserNotice::export_succeeded(),
                    Some(artifact),
                    None,
                    bytes,
                )
            }
            Delivery::Error(e) => {
                log::error!("session {} failed: {}", self.id, e);
                (
                    SessionStatus::Failed,
                    UserNotice::export_failed(),
                    None,
                    Some(e),
                    0,
                )
            }
            Delivery::Cancelled => {
                log::info!("session {}: cancelled before recording began", self.id);
                (
                    SessionStatus::Failed,
                    UserNotice::export_failed(),
                    None,
                    None,
                    0,
                )
            }
        };
        self.cells.set_status(status);

        SessionOutcome {
            session: self.id,
            status,
            notice,
            artifact,
            error,
            stats: SessionStats {
                elapsed_ms,
                chunk_count: self.cells.chunk_count(),
                payload_bytes,
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
