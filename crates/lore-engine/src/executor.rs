//! Sync plan execution
//!
//! Runs a [`SyncPlan`] against the two stores, strictly one job at a time
//! in plan order. Job ordering is itself a correctness mechanism: local
//! records must exist with a cross-reference id before later jobs can link
//! against them, which is why there is no parallelism here.
//!
//! Failure isolation is per job: a failed or skipped job is logged,
//! counted, and execution moves on. The shared progress counter advances
//! exactly once per job regardless of outcome, so it always reaches
//! `total`. There is no cancellation mid-plan and no retry inside the
//! engine; callers re-run the failed jobs if they want retry. Callers must
//! also treat any link-graph snapshot as stale once execution finishes and
//! rebuild it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lore_model::{EntityKind, GenericEntity};
use lore_stores::{
    LocalStore, NewRecord, RemoteCharacter, RemoteItem, RemoteLink, RemoteLocation, RemoteService,
    list_all,
};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::fingerprint::fingerprint;
use crate::plan::SyncPlan;

/// Shared progress counter state, emitted after every completed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

/// Receiver for progress updates during execution.
pub trait ProgressSink: Send {
    fn progress(&mut self, progress: Progress);
}

impl<F: FnMut(Progress) + Send> ProgressSink for F {
    fn progress(&mut self, progress: Progress) {
        self(progress)
    }
}

/// One job that failed during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    /// Human-readable description of the job (kind and name)
    pub label: String,
    pub error: String,
}

/// Outcome summary of one plan execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    /// Jobs whose source document was gone or whose work was already done
    pub skipped: usize,
    pub failed: Vec<FailedJob>,
}

/// Executes sync plans against the local store and the remote service.
pub struct PlanExecutor {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteService>,
    config: EngineConfig,
    running: AtomicBool,
}

/// Clears the re-entrancy flag when execution unwinds for any reason.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Bookkeeping shared by every phase of one execution.
struct RunState<'a> {
    progress: Progress,
    sink: &'a mut dyn ProgressSink,
    report: ExecutionReport,
    /// remote id -> local id, seeded from record metadata
    local_by_remote: HashMap<String, String>,
    /// local id -> remote id, extended as exports mint new remote ids
    remote_by_local: HashMap<String, String>,
}

impl RunState<'_> {
    fn advance(&mut self) {
        self.progress.processed += 1;
        self.report.processed = self.progress.processed;
        self.sink.progress(self.progress);
    }

    fn succeed(&mut self) {
        self.report.succeeded += 1;
        self.advance();
    }

    fn skip(&mut self, label: &str, reason: &str) {
        tracing::warn!(job = %label, "Skipping: {}", reason);
        self.report.skipped += 1;
        self.advance();
    }

    fn fail(&mut self, label: &str, error: impl std::fmt::Display) {
        tracing::warn!(job = %label, "Job failed: {}", error);
        self.report.failed.push(FailedJob {
            label: label.to_string(),
            error: error.to_string(),
        });
        self.advance();
    }

    fn record_pair(&mut self, local_id: &str, remote_id: &str) {
        self.local_by_remote
            .insert(remote_id.to_string(), local_id.to_string());
        self.remote_by_local
            .insert(local_id.to_string(), remote_id.to_string());
    }
}

impl PlanExecutor {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            local,
            remote,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Execute a plan, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlanAlreadyRunning`] if another execution is in
    /// flight on this executor, or a store error if the initial local scan
    /// fails. Per-job failures never abort execution; they are collected in
    /// the report.
    pub async fn execute(
        &self,
        plan: SyncPlan,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExecutionReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::PlanAlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let total = plan.total_jobs();
        tracing::info!(total, campaign = %self.config.campaign_id, "Executing sync plan");

        let mut state = RunState {
            progress: Progress {
                processed: 0,
                total,
            },
            sink,
            report: ExecutionReport {
                total,
                ..Default::default()
            },
            local_by_remote: HashMap::new(),
            remote_by_local: HashMap::new(),
        };

        // Seed the id maps from already-synced records so re-runs recognize
        // prior work instead of duplicating it.
        for record in list_all(self.local.as_ref()).await? {
            if let Some(remote_id) = &record.metadata.remote_id {
                state.record_pair(&record.id, remote_id);
            }
        }

        self.run_create_local(&plan, &mut state).await;
        self.run_import_refs(&plan, &mut state).await;
        self.run_recaps(&plan, &mut state).await;
        self.run_exports(&plan, &mut state).await;
        self.run_links(&plan, &mut state).await;
        self.run_remote_links(&plan, &mut state).await;

        tracing::info!(
            succeeded = state.report.succeeded,
            skipped = state.report.skipped,
            failed = state.report.failed.len(),
            "Sync plan finished"
        );
        Ok(state.report)
    }

    /// Phase 1: full local records for opted-in remote-only entities.
    async fn run_create_local(&self, plan: &SyncPlan, state: &mut RunState<'_>) {
        for job in &plan.create_local {
            let label = format!("create-local {} '{}'", job.kind, job.name);
            if state.local_by_remote.contains_key(&job.remote_id) {
                state.skip(&label, "already created on a prior run");
                continue;
            }

            let data = NewRecord {
                name: job.name.clone(),
                subtype: job.subtype.clone(),
                folder: None,
                description: Some(job.description.clone()),
                image: job.image.clone(),
            };
            match self.create_with_cross_reference(job.kind, data, &job.remote_id).await {
                Ok(local_id) => {
                    state.record_pair(&local_id, &job.remote_id);
                    state.succeed();
                }
                Err(e) => state.fail(&label, e),
            }
        }
    }

    /// Phase 2: remaining remote-only content as lightweight reference
    /// records.
    async fn run_import_refs(&self, plan: &SyncPlan, state: &mut RunState<'_>) {
        for job in &plan.import_refs {
            let label = format!("import {} '{}'", job.kind, job.name);
            if state.local_by_remote.contains_key(&job.remote_id) {
                state.skip(&label, "already imported on a prior run");
                continue;
            }

            let data = NewRecord {
                name: job.name.clone(),
                subtype: None,
                folder: Some(self.config.reference_folder.clone()),
                description: Some(job.description.clone()),
                image: None,
            };
            match self
                .create_with_cross_reference(EntityKind::Journal, data, &job.remote_id)
                .await
            {
                Ok(local_id) => {
                    state.record_pair(&local_id, &job.remote_id);
                    state.succeed();
                }
                Err(e) => state.fail(&label, e),
            }
        }
    }

    /// Phase 3: session recaps, created or updated in date order.
    async fn run_recaps(&self, plan: &SyncPlan, state: &mut RunState<'_>) {
        for job in &plan.recaps {
            let label = format!("recap '{}'", job.title);
            let data = NewRecord {
                name: job.title.clone(),
                subtype: None,
                folder: Some(self.config.recap_folder.clone()),
                description: Some(job.summary.clone()),
                image: None,
            };

            let existing = state.local_by_remote.get(&job.session_id).cloned();
            let result: Result<()> = match existing {
                Some(local_id) => self
                    .local
                    .update_record(&local_id, data)
                    .await
                    .map_err(Error::from),
                None => self
                    .create_with_cross_reference(EntityKind::Journal, data, &job.session_id)
                    .await
                    .map(|local_id| {
                        state.record_pair(&local_id, &job.session_id);
                    }),
            };
            match result {
                Ok(()) => state.succeed(),
                Err(e) => state.fail(&label, e),
            }
        }
    }

    /// Phase 4a: create remote records for local-only entities.
    async fn run_exports(&self, plan: &SyncPlan, state: &mut RunState<'_>) {
        for job in &plan.exports {
            let label = format!("export {} '{}'", job.kind, job.name);
            let record = match self.local.get(&job.local_id).await {
                Ok(record) => record,
                Err(e) if e.is_not_found() => {
                    state.skip(&label, "source document no longer exists");
                    continue;
                }
                Err(e) => {
                    state.fail(&label, e);
                    continue;
                }
            };

            let entity = match Extractor::new().normalize(&record) {
                Ok(entity) => entity,
                Err(e) => {
                    state.fail(&label, e);
                    continue;
                }
            };

            match self.create_remote(&entity).await {
                Ok(remote_id) => {
                    if let Err(e) = self.write_back(&job.local_id, &remote_id, &entity).await {
                        state.fail(&label, e);
                        continue;
                    }
                    state.record_pair(&job.local_id, &remote_id);
                    state.succeed();
                }
                Err(e) => state.fail(&label, e),
            }
        }
    }

    /// Phase 4b: cross-reference writes for matched pairs.
    async fn run_links(&self, plan: &SyncPlan, state: &mut RunState<'_>) {
        for job in &plan.links {
            let label = format!("link {} {}", job.kind, job.local_id);
            let record = match self.local.get(&job.local_id).await {
                Ok(record) => record,
                Err(e) if e.is_not_found() => {
                    state.skip(&label, "source document no longer exists");
                    continue;
                }
                Err(e) => {
                    state.fail(&label, e);
                    continue;
                }
            };

            let result = async {
                self.local
                    .set_cross_reference(&job.local_id, &job.remote_id, &self.config.campaign_id)
                    .await?;
                if let Ok(entity) = Extractor::new().normalize(&record) {
                    self.local
                        .set_fingerprint(&job.local_id, &fingerprint(&entity))
                        .await?;
                }
                Ok::<_, Error>(())
            }
            .await;

            match result {
                Ok(()) => {
                    state.record_pair(&job.local_id, &job.remote_id);
                    state.succeed();
                }
                Err(e) => state.fail(&label, e),
            }
        }
    }

    /// Phase 4c: mirror relationship edges onto the remote link resource.
    ///
    /// Runs last so exports have minted their remote ids. Edges whose
    /// endpoints have no remote id yet are skipped, as are edges the
    /// service already knows about.
    async fn run_remote_links(&self, plan: &SyncPlan, state: &mut RunState<'_>) {
        if plan.remote_links.is_empty() {
            return;
        }

        let existing: HashSet<(String, String)> = match self
            .remote
            .list_links(&self.config.campaign_id)
            .await
        {
            Ok(links) => links
                .into_iter()
                .map(|link| (link.from_id, link.to_id))
                .collect(),
            Err(e) => {
                // Without the existing list every edge job would risk a
                // duplicate; fail them all individually instead of guessing.
                for job in &plan.remote_links {
                    let label = format!("remote-link {} -> {}", job.from_local_id, job.to_local_id);
                    state.fail(&label, &e);
                }
                return;
            }
        };

        for job in &plan.remote_links {
            let label = format!("remote-link {} -> {}", job.from_local_id, job.to_local_id);
            let (Some(from_id), Some(to_id)) = (
                state.remote_by_local.get(&job.from_local_id).cloned(),
                state.remote_by_local.get(&job.to_local_id).cloned(),
            ) else {
                state.skip(&label, "endpoint has no remote counterpart");
                continue;
            };

            if existing.contains(&(from_id.clone(), to_id.clone())) {
                state.skip(&label, "link already exists on the service");
                continue;
            }

            let payload = RemoteLink {
                id: String::new(),
                from_id,
                to_id,
                link_type: job.link_type.clone(),
            };
            match self
                .remote
                .create_link(&self.config.campaign_id, payload)
                .await
            {
                Ok(_) => state.succeed(),
                Err(e) => state.fail(&label, e),
            }
        }
    }

    /// Create a local record and immediately stamp its remote identity.
    async fn create_with_cross_reference(
        &self,
        kind: EntityKind,
        data: NewRecord,
        remote_id: &str,
    ) -> Result<String> {
        let local_id = self.local.create(kind, data).await?;
        self.local
            .set_cross_reference(&local_id, remote_id, &self.config.campaign_id)
            .await?;
        Ok(local_id)
    }

    /// Create the remote counterpart for a normalized local entity.
    async fn create_remote(&self, entity: &GenericEntity) -> Result<String> {
        let campaign = self.config.campaign_id.as_str();
        let id = match entity.kind {
            EntityKind::Character => {
                self.remote
                    .create_character(
                        campaign,
                        RemoteCharacter {
                            id: String::new(),
                            name: entity.name.clone(),
                            character_type: remote_character_type(entity.subtype.as_deref()),
                            description: entity.body.clone(),
                            image_url: entity.images.first().cloned(),
                        },
                    )
                    .await?
            }
            EntityKind::Item => {
                self.remote
                    .create_item(
                        campaign,
                        RemoteItem {
                            id: String::new(),
                            name: entity.name.clone(),
                            description: entity.body.clone(),
                            image_url: entity.images.first().cloned(),
                        },
                    )
                    .await?
            }
            EntityKind::Location => {
                self.remote
                    .create_location(
                        campaign,
                        RemoteLocation {
                            id: String::new(),
                            name: entity.name.clone(),
                            description: entity.body.clone(),
                            parent_id: None,
                            image_url: entity.images.first().cloned(),
                        },
                    )
                    .await?
            }
            other => {
                return Err(Error::InvalidConfig {
                    message: format!("{other} records are not exported"),
                });
            }
        };
        Ok(id)
    }

    /// Stamp a freshly exported record with its remote id and fingerprint.
    async fn write_back(
        &self,
        local_id: &str,
        remote_id: &str,
        entity: &GenericEntity,
    ) -> Result<()> {
        self.local
            .set_cross_reference(local_id, remote_id, &self.config.campaign_id)
            .await?;
        self.local
            .set_fingerprint(local_id, &fingerprint(entity))
            .await?;
        Ok(())
    }
}

/// Map local subtype vocabulary to the remote PC/NPC classification.
fn remote_character_type(subtype: Option<&str>) -> Option<String> {
    match subtype?.to_lowercase().as_str() {
        "player" | "pc" | "character" => Some("PC".to_string()),
        "npc" => Some("NPC".to_string()),
        _ => None,
    }
}
