//! The queue runtime: two bounded worker pools over tokio channels.
//!
//! Group-creation jobs run under a small concurrency cap. That is
//! deliberate admission control against the VK API's per-account rate
//! sensitivity, not a local resource limit. Post-scheduling jobs are
//! single low-risk calls and get a larger pool. A failed execution
//! attempt is retried with exponential backoff up to a fixed cap; local
//! precondition failures (missing/undecryptable credential) fail
//! immediately.
//!
//! The runtime is an explicitly constructed object whose lifecycle
//! (start, shutdown, drain) belongs to the process entry point; nothing
//! here is process-global.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broadcast::{JobProgressBroadcaster, JobProgressTracker, JobStore, StoredJob};
use crate::config::QueueSettings;
use crate::db::{token_repo, Database};
use crate::error::QueueError;
use crate::profile::Profile;
use crate::provision::{
    BroadcastProgress, GroupResult, Progress, ProvisionContext, ProvisionError, Provisioner,
};
use crate::secrets::TokenEncryptor;
use crate::vk::wall::WallPostRequest;
use crate::vk::{Transport, VkApi, VkApiConfig, VkClient};

use super::job::{GroupCreationJobData, JobState, PostSchedulingJobData, QueueKind};

/// A queued group-creation job.
pub struct QueuedGroupJob {
    pub id: String,
    pub data: GroupCreationJobData,
}

/// A queued post-scheduling job.
pub struct QueuedPostJob {
    pub id: String,
    pub data: PostSchedulingJobData,
}

/// Cloneable enqueue handle for the post-scheduling queue. The workflow
/// uses it to schedule deferred posts mid-job.
#[derive(Clone)]
pub struct PostQueueHandle {
    tx: mpsc::Sender<QueuedPostJob>,
    store: Arc<JobStore>,
}

impl PostQueueHandle {
    pub fn new(tx: mpsc::Sender<QueuedPostJob>, store: Arc<JobStore>) -> Self {
        Self { tx, store }
    }

    /// Durably registers the batch and hands it to the post workers.
    /// Batches carrying a future publish time start out `delayed`.
    pub async fn enqueue(&self, data: PostSchedulingJobData) -> Result<String, QueueError> {
        let id = uuid::Uuid::new_v4().to_string();
        let state = if data.has_delayed_posts() {
            JobState::Delayed
        } else {
            JobState::Waiting
        };
        self.store.insert(StoredJob::new(
            &id,
            QueueKind::PostScheduling,
            &data.student_id,
            state,
        ));

        self.tx
            .send(QueuedPostJob {
                id: id.clone(),
                data,
            })
            .await
            .map_err(|_| QueueError::ChannelClosed)?;

        Ok(id)
    }
}

/// Dependencies shared by all workers. Deliberately free of channel
/// senders so dropping the runtime's senders lets the pools drain.
struct WorkerDeps {
    db: Database,
    store: Arc<JobStore>,
    broadcaster: JobProgressBroadcaster,
    encryptor: Arc<TokenEncryptor>,
    vk_config: VkApiConfig,
    transport: Arc<dyn Transport>,
    settings: QueueSettings,
}

pub struct QueueRuntime {
    group_tx: mpsc::Sender<QueuedGroupJob>,
    posts: PostQueueHandle,
    store: Arc<JobStore>,
    broadcaster: JobProgressBroadcaster,
    db: Database,
    encryptor: Arc<TokenEncryptor>,
    shutdown: Arc<AtomicBool>,
    group_workers: Vec<JoinHandle<()>>,
    post_workers: Vec<JoinHandle<()>>,
}

impl QueueRuntime {
    /// Starts both worker pools.
    ///
    /// # Panics
    /// Panics if any concurrency setting or the channel capacity is 0.
    pub fn start(
        settings: QueueSettings,
        db: Database,
        encryptor: TokenEncryptor,
        vk_config: VkApiConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        assert!(settings.group_concurrency > 0, "group_concurrency must be > 0");
        assert!(settings.post_concurrency > 0, "post_concurrency must be > 0");
        assert!(settings.capacity > 0, "capacity must be > 0");

        let store = Arc::new(JobStore::new(Some(db.clone())));
        let broadcaster = JobProgressBroadcaster::default();
        let encryptor = Arc::new(encryptor);

        let (group_tx, group_rx) = mpsc::channel::<QueuedGroupJob>(settings.capacity);
        let (post_tx, post_rx) = mpsc::channel::<QueuedPostJob>(settings.capacity);
        let posts = PostQueueHandle::new(post_tx, Arc::clone(&store));

        let deps = Arc::new(WorkerDeps {
            db: db.clone(),
            store: Arc::clone(&store),
            broadcaster: broadcaster.clone(),
            encryptor: Arc::clone(&encryptor),
            vk_config,
            transport,
            settings: settings.clone(),
        });

        let group_workers = spawn_group_workers(
            settings.group_concurrency,
            group_rx,
            Arc::clone(&deps),
            posts.clone(),
        );
        let post_workers = spawn_post_workers(settings.post_concurrency, post_rx, deps);

        info!(
            "Queue runtime started: {} group workers, {} post workers",
            settings.group_concurrency, settings.post_concurrency
        );

        Self {
            group_tx,
            posts,
            store,
            broadcaster,
            db,
            encryptor,
            shutdown: Arc::new(AtomicBool::new(false)),
            group_workers,
            post_workers,
        }
    }

    /// Starts the runtime with the production HTTP transport derived from
    /// the VK settings.
    pub fn start_with_http(
        settings: QueueSettings,
        db: Database,
        encryptor: TokenEncryptor,
        vk_settings: &crate::config::VkSettings,
    ) -> Result<Self, crate::vk::VkError> {
        let transport = crate::vk::HttpTransport::new(vk_settings.timeout).map_err(|e| {
            crate::vk::VkError::Transport {
                attempts: 0,
                source: e,
            }
        })?;
        Ok(Self::start(
            settings,
            db,
            encryptor,
            vk_settings.into(),
            Arc::new(transport),
        ))
    }

    /// Accepts a provisioning request: encrypts and stores the short-lived
    /// token, registers the job as waiting and hands it to the group pool.
    pub async fn enqueue_group_creation(
        &self,
        student_id: &str,
        profile: Profile,
        access_token: SecretString,
    ) -> Result<String, QueueError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(QueueError::ShuttingDown);
        }
        profile.validate()?;

        use secrecy::ExposeSecret;
        let now = Utc::now().to_rfc3339();
        token_repo::upsert(
            &self.db,
            &token_repo::TokenRow {
                student_id: student_id.to_string(),
                access_token: self.encryptor.encrypt(access_token.expose_secret())?,
                vk_user_id: None,
                created_at: now.clone(),
                updated_at: now,
            },
        )?;

        let id = uuid::Uuid::new_v4().to_string();
        self.store.insert(StoredJob::new(
            &id,
            QueueKind::GroupCreation,
            student_id,
            JobState::Waiting,
        ));

        self.group_tx
            .send(QueuedGroupJob {
                id: id.clone(),
                data: GroupCreationJobData {
                    student_id: student_id.to_string(),
                    profile,
                },
            })
            .await
            .map_err(|_| QueueError::ChannelClosed)?;

        info!("Enqueued group creation job {} for student {}", id, student_id);
        Ok(id)
    }

    /// Enqueues a post batch on the lower-priority queue.
    pub async fn enqueue_post_scheduling(
        &self,
        data: PostSchedulingJobData,
    ) -> Result<String, QueueError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(QueueError::ShuttingDown);
        }
        self.posts.enqueue(data).await
    }

    /// Read-only status lookup: the latest persisted snapshot, whether or
    /// not the job is still running.
    pub fn get_status(&self, job_id: &str) -> Option<StoredJob> {
        self.store.get(job_id)
    }

    /// Subscribes to the live progress event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::broadcast::JobProgressEvent>
    {
        self.broadcaster.subscribe()
    }

    /// Stops accepting new jobs. Already queued jobs still run; call
    /// [`drain`](Self::drain) to wait for them.
    pub fn shutdown(&self) {
        info!("Queue runtime shutting down, rejecting new jobs");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Closes the queues and waits for in-flight workers to finish.
    /// Group workers drain first: they may still enqueue deferred-post
    /// batches, which the post pool then drains.
    pub async fn drain(self) {
        let QueueRuntime {
            group_tx,
            posts,
            group_workers,
            post_workers,
            shutdown,
            ..
        } = self;
        shutdown.store(true, Ordering::Relaxed);

        drop(group_tx);
        for (i, worker) in group_workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Group worker {} panicked: {}", i, e);
            }
        }

        drop(posts);
        for (i, worker) in post_workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Post worker {} panicked: {}", i, e);
            }
        }

        info!("All queue workers have stopped");
    }
}

fn spawn_group_workers(
    count: usize,
    rx: mpsc::Receiver<QueuedGroupJob>,
    deps: Arc<WorkerDeps>,
    posts: PostQueueHandle,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    (0..count)
        .map(|worker_id| {
            let rx = Arc::clone(&rx);
            let deps = Arc::clone(&deps);
            let posts = posts.clone();
            tokio::spawn(async move {
                debug!("Group worker {} started", worker_id);
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    process_group_job(job, &deps, &posts).await;
                }
                debug!("Group worker {} stopped", worker_id);
            })
        })
        .collect()
}

fn spawn_post_workers(
    count: usize,
    rx: mpsc::Receiver<QueuedPostJob>,
    deps: Arc<WorkerDeps>,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(tokio::sync::Mutex::new(rx));
    (0..count)
        .map(|worker_id| {
            let rx = Arc::clone(&rx);
            let deps = Arc::clone(&deps);
            tokio::spawn(async move {
                debug!("Post worker {} started", worker_id);
                loop {
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    process_post_job(job, &deps).await;
                }
                debug!("Post worker {} stopped", worker_id);
            })
        })
        .collect()
}

/// Runs one group-creation job to a terminal state, retrying whole
/// executions with exponential backoff. Each retry resumes from the last
/// persisted snapshot, so completed steps (most importantly the
/// non-idempotent group create) are not re-issued.
async fn process_group_job(job: QueuedGroupJob, deps: &WorkerDeps, posts: &PostQueueHandle) {
    info!(
        "Starting group creation job {} for student {}",
        job.id, job.data.student_id
    );
    let tracker = deps.broadcaster.start_job(
        &job.id,
        QueueKind::GroupCreation,
        &job.data.student_id,
        Arc::clone(&deps.store),
    );

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        deps.store.mark_active(&job.id, attempt);

        match run_group_attempt(&job, deps, posts).await {
            Ok(result) => {
                info!(
                    "Group creation job {} completed: {}",
                    job.id, result.url
                );
                break;
            }
            Err((e, progress)) => {
                if !e.is_fatal() && attempt < deps.settings.job_attempts {
                    let delay = deps.settings.job_backoff * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "Group creation job {} attempt {} failed: {}; retrying in {:?}",
                        job.id, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                error!(
                    "Group creation job {} failed terminally after {} attempts: {}",
                    job.id, attempt, e
                );
                tracker.failed(&progress, &e.to_string());
                break;
            }
        }
    }
}

async fn run_group_attempt(
    job: &QueuedGroupJob,
    deps: &WorkerDeps,
    posts: &PostQueueHandle,
) -> Result<GroupResult, (ProvisionError, Progress)> {
    // Resume from whatever the previous attempt reached.
    let (progress, group_id) = deps
        .store
        .get(&job.id)
        .map(|stored| (stored.progress, stored.group_id))
        .unwrap_or_default();
    let mut ctx = ProvisionContext::resume(
        job.data.student_id.clone(),
        job.data.profile.clone(),
        progress,
        group_id,
    );

    let token = match load_token(&job.data.student_id, deps) {
        Ok(token) => token,
        Err(e) => return Err((e, ctx.progress.clone())),
    };

    let client = VkClient::new(token, deps.vk_config.clone(), Arc::clone(&deps.transport));
    let provisioner = Provisioner::new(VkApi::new(client), deps.db.clone(), posts.clone());
    let reporter = BroadcastProgress::new(deps.broadcaster.start_job(
        &job.id,
        QueueKind::GroupCreation,
        &job.data.student_id,
        Arc::clone(&deps.store),
    ));

    match provisioner.run(&mut ctx, &reporter).await {
        Ok(result) => Ok(result),
        Err(e) => Err((e, ctx.progress.clone())),
    }
}

/// Runs one post-scheduling job: a sequence of `wall.post` calls, deferred
/// posts carrying a future `publish_date` so VK time-shifts them itself.
async fn process_post_job(job: QueuedPostJob, deps: &WorkerDeps) {
    info!(
        "Starting post scheduling job {} for group {} ({} posts)",
        job.id,
        job.data.group_id,
        job.data.posts.len()
    );
    let tracker = deps.broadcaster.start_job(
        &job.id,
        QueueKind::PostScheduling,
        &job.data.student_id,
        Arc::clone(&deps.store),
    );

    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        deps.store.mark_active(&job.id, attempt);

        match run_post_attempt(&job, deps, &tracker).await {
            Ok(progress) => {
                tracker.batch_completed(&progress, Some(job.data.group_id));
                info!("Post scheduling job {} completed", job.id);
                break;
            }
            Err((e, progress)) => {
                if !e.is_fatal() && attempt < deps.settings.job_attempts {
                    let delay = deps.settings.job_backoff * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "Post scheduling job {} attempt {} failed: {}; retrying in {:?}",
                        job.id, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                error!(
                    "Post scheduling job {} failed terminally after {} attempts: {}",
                    job.id, attempt, e
                );
                tracker.failed(&progress, &e.to_string());
                break;
            }
        }
    }
}

async fn run_post_attempt(
    job: &QueuedPostJob,
    deps: &WorkerDeps,
    tracker: &JobProgressTracker,
) -> Result<Progress, (ProvisionError, Progress)> {
    let mut progress = deps
        .store
        .get(&job.id)
        .map(|stored| stored.progress)
        .unwrap_or_default();
    progress.total_posts = job.data.posts.len() as u32;
    progress.step = Some("scheduling_posts".to_string());

    let token = match load_token(&job.data.student_id, deps) {
        Ok(token) => token,
        Err(e) => return Err((e, progress)),
    };
    let client = VkClient::new(token, deps.vk_config.clone(), Arc::clone(&deps.transport));
    let api = VkApi::new(client);

    // Resume mid-batch on retry.
    let already_published = progress.posts_published as usize;
    let now = Utc::now().timestamp();
    for post in job.data.posts.iter().skip(already_published) {
        let publish_date = post
            .delay_days
            .map(|days| now + i64::from(days) * 24 * 60 * 60);

        if let Err(e) = api
            .post_to_wall(&WallPostRequest {
                owner_id: -job.data.group_id,
                message: post.content.clone(),
                from_group: true,
                publish_date,
            })
            .await
        {
            return Err((
                ProvisionError::Vk {
                    step: "scheduling_posts",
                    source: e,
                },
                progress,
            ));
        }

        progress.posts_published += 1;
        tracker.snapshot(&progress, Some(job.data.group_id));
    }

    Ok(progress)
}

fn load_token(student_id: &str, deps: &WorkerDeps) -> Result<SecretString, ProvisionError> {
    let row = token_repo::find(&deps.db, student_id)?
        .ok_or_else(|| ProvisionError::MissingCredential {
            student_id: student_id.to_string(),
        })?;
    Ok(deps.encryptor.decrypt(&row.access_token)?)
}
