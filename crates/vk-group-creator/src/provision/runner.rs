//! Driver for the fixed provisioning sequence.
//!
//! Steps run strictly in [`STEP_SEQUENCE`] order; later steps depend on
//! remote resources created by earlier ones (the group id, the enabled
//! marketplace). There is no rollback: a failed job leaves the partially
//! configured community behind and the progress snapshot records exactly
//! how far it got.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content::{
    generate_avatar, generate_cover, generate_description, generate_market_items, generate_posts,
    CURRENCY_RUB,
};
use crate::db::{group_repo, Database};
use crate::queue::job::{DeferredPost, PostSchedulingJobData};
use crate::queue::runtime::PostQueueHandle;
use crate::vk::groups::{GroupCreateRequest, GroupEditRequest};
use crate::vk::market::MarketItemRequest;
use crate::vk::wall::WallPostRequest;
use crate::vk::VkApi;

use super::context::ProvisionContext;
use super::error::ProvisionError;
use super::progress::{ProgressEvent, ProgressReporter};

/// How many immediate posts are published synchronously; the rest of the
/// plan goes through the post-scheduling queue.
pub const IMMEDIATE_POST_QUOTA: usize = 2;

const REVIEWS_TOPIC_TITLE: &str = "Отзывы";
const REVIEWS_TOPIC_PROMPT: &str =
    "Оставляйте свои отзывы о качестве массажа и сервиса. Ваше мнение очень важно для нас!";

/// Final result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    pub group_id: i64,
    pub screen_name: String,
    pub url: String,
}

impl GroupResult {
    pub fn for_group(group_id: i64) -> Self {
        Self {
            group_id,
            screen_name: format!("club{}", group_id),
            url: format!("https://vk.com/club{}", group_id),
        }
    }
}

/// The ordered steps of the workflow. Postcondition flags make completed
/// steps skippable when a retried job resumes from a persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CreateGroup,
    ConfigureGroup,
    UploadAvatar,
    UploadCover,
    PublishPosts,
    ScheduleDeferredPosts,
    CreateReviewsTopic,
    EnableMarket,
    AddServices,
    AddAddress,
    EnableAutoResponder,
}

/// Execution order. Encoded as data so the driver loop, resume logic and
/// tests all share one source of truth.
pub const STEP_SEQUENCE: &[ProvisionStep] = &[
    ProvisionStep::CreateGroup,
    ProvisionStep::ConfigureGroup,
    ProvisionStep::UploadAvatar,
    ProvisionStep::UploadCover,
    ProvisionStep::PublishPosts,
    ProvisionStep::ScheduleDeferredPosts,
    ProvisionStep::CreateReviewsTopic,
    ProvisionStep::EnableMarket,
    ProvisionStep::AddServices,
    ProvisionStep::AddAddress,
    ProvisionStep::EnableAutoResponder,
];

impl ProvisionStep {
    /// Label shown while the step runs.
    pub fn start_label(&self) -> &'static str {
        match self {
            ProvisionStep::CreateGroup => "creating_group",
            ProvisionStep::ConfigureGroup => "configuring_group",
            ProvisionStep::UploadAvatar => "uploading_avatar",
            ProvisionStep::UploadCover => "uploading_cover",
            ProvisionStep::PublishPosts => "publishing_posts",
            ProvisionStep::ScheduleDeferredPosts => "scheduling_posts",
            ProvisionStep::CreateReviewsTopic => "creating_reviews_topic",
            ProvisionStep::EnableMarket => "setting_up_market",
            ProvisionStep::AddServices => "adding_services",
            ProvisionStep::AddAddress => "adding_address",
            ProvisionStep::EnableAutoResponder => "setting_up_auto_responder",
        }
    }

    /// Label shown once the step's postcondition holds.
    pub fn done_label(&self) -> &'static str {
        match self {
            ProvisionStep::CreateGroup => "group_created",
            ProvisionStep::ConfigureGroup => "group_configured",
            ProvisionStep::UploadAvatar => "avatar_uploaded",
            ProvisionStep::UploadCover => "cover_uploaded",
            ProvisionStep::PublishPosts => "posts_published",
            ProvisionStep::ScheduleDeferredPosts => "posts_scheduled",
            ProvisionStep::CreateReviewsTopic => "reviews_topic_created",
            ProvisionStep::EnableMarket => "market_enabled",
            ProvisionStep::AddServices => "services_added",
            ProvisionStep::AddAddress => "address_added",
            ProvisionStep::EnableAutoResponder => "auto_responder_enabled",
        }
    }

    /// True when the persisted snapshot already satisfies this step's
    /// postcondition, so a resumed execution skips the remote call.
    ///
    /// `ConfigureGroup` and `PublishPosts` always re-run: the former is
    /// idempotent at the provider, the latter resumes mid-list via the
    /// `posts_published` counter and rebuilds the deferred batch.
    pub fn is_complete(&self, ctx: &ProvisionContext) -> bool {
        let progress = &ctx.progress;
        match self {
            ProvisionStep::CreateGroup => progress.group_created,
            ProvisionStep::ConfigureGroup => false,
            ProvisionStep::UploadAvatar => progress.avatar_uploaded,
            ProvisionStep::UploadCover => progress.cover_uploaded,
            ProvisionStep::PublishPosts => false,
            ProvisionStep::ScheduleDeferredPosts => false,
            ProvisionStep::CreateReviewsTopic => progress.reviews_topic_created,
            ProvisionStep::EnableMarket => progress.market_enabled,
            ProvisionStep::AddServices => {
                progress.total_services > 0 && progress.services_added >= progress.total_services
            }
            ProvisionStep::AddAddress => progress.address_added,
            ProvisionStep::EnableAutoResponder => progress.auto_responder_enabled,
        }
    }

    /// True when the step applies to this job at all.
    fn applies(&self, ctx: &ProvisionContext) -> bool {
        match self {
            ProvisionStep::AddAddress => ctx.profile.address.is_some(),
            ProvisionStep::ScheduleDeferredPosts => !ctx.deferred.is_empty(),
            _ => true,
        }
    }
}

/// Runs one profile through the full sequence against a [`VkApi`] bound to
/// the student's access token.
pub struct Provisioner {
    api: VkApi,
    db: Database,
    posts: PostQueueHandle,
}

impl Provisioner {
    pub fn new(api: VkApi, db: Database, posts: PostQueueHandle) -> Self {
        Self { api, db, posts }
    }

    /// Drives the context through every pending step. On success, persists
    /// the durable group record and reports the completed snapshot; on
    /// failure, returns the error with the partial progress left in `ctx`
    /// for the caller's retry policy.
    pub async fn run(
        &self,
        ctx: &mut ProvisionContext,
        progress: &dyn ProgressReporter,
    ) -> Result<GroupResult, ProvisionError> {
        for step in STEP_SEQUENCE {
            if step.is_complete(ctx) {
                info!(
                    student_id = %ctx.student_id,
                    step = step.done_label(),
                    "step already satisfied, skipping"
                );
                continue;
            }
            if !step.applies(ctx) {
                continue;
            }

            info!(student_id = %ctx.student_id, step = step.start_label(), "provisioning step");
            ctx.progress.step = Some(step.start_label().to_string());
            progress.report(ProgressEvent::Snapshot {
                progress: ctx.progress.clone(),
                group_id: ctx.group_id,
            });

            if let Err(e) = self.run_step(*step, ctx, progress).await {
                warn!(
                    student_id = %ctx.student_id,
                    step = step.start_label(),
                    error = %e,
                    "provisioning step failed"
                );
                return Err(e);
            }

            ctx.progress.step = Some(step.done_label().to_string());
            progress.report(ProgressEvent::Snapshot {
                progress: ctx.progress.clone(),
                group_id: ctx.group_id,
            });
        }

        let group_id = ctx.group_id.ok_or(ProvisionError::MissingGroupId)?;
        let result = GroupResult::for_group(group_id);

        ctx.progress.step = Some("completed".to_string());
        self.persist_group_record(ctx, &result)?;

        progress.report(ProgressEvent::Completed {
            progress: ctx.progress.clone(),
            result: result.clone(),
        });

        info!(student_id = %ctx.student_id, group_id, "provisioning completed");
        Ok(result)
    }

    async fn run_step(
        &self,
        step: ProvisionStep,
        ctx: &mut ProvisionContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), ProvisionError> {
        match step {
            ProvisionStep::CreateGroup => self.step_create_group(ctx).await,
            ProvisionStep::ConfigureGroup => self.step_configure_group(ctx).await,
            ProvisionStep::UploadAvatar => self.step_upload_avatar(ctx).await,
            ProvisionStep::UploadCover => self.step_upload_cover(ctx).await,
            ProvisionStep::PublishPosts => self.step_publish_posts(ctx, progress).await,
            ProvisionStep::ScheduleDeferredPosts => self.step_schedule_deferred(ctx).await,
            ProvisionStep::CreateReviewsTopic => self.step_create_reviews_topic(ctx).await,
            ProvisionStep::EnableMarket => self.step_enable_market(ctx).await,
            ProvisionStep::AddServices => self.step_add_services(ctx, progress).await,
            ProvisionStep::AddAddress => self.step_add_address(ctx),
            ProvisionStep::EnableAutoResponder => self.step_enable_auto_responder(ctx).await,
        }
    }

    async fn step_create_group(&self, ctx: &mut ProvisionContext) -> Result<(), ProvisionError> {
        let description = generate_description(&ctx.profile);

        let created = self
            .api
            .create_group(&GroupCreateRequest {
                title: description.title,
                group_type: "page".to_string(),
                subtype: "company".to_string(),
                public_category: description.public_category,
                public_subcategory: description.public_subcategory,
            })
            .await
            .map_err(|e| ProvisionError::Vk {
                step: "creating_group",
                source: e,
            })?;

        ctx.group_id = Some(created.id);
        ctx.progress.group_created = true;
        Ok(())
    }

    async fn step_configure_group(&self, ctx: &mut ProvisionContext) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;
        let description = generate_description(&ctx.profile);

        self.api
            .edit_group(&GroupEditRequest {
                group_id,
                description: Some(description.description),
                website: Some(format!("https://vk.com/club{}", group_id)),
                wall: Some(1),
                topics: Some(1),
                photos: Some(1),
                market: Some(1),
                messages: Some(1),
            })
            .await
            .map_err(|e| ProvisionError::Vk {
                step: "configuring_group",
                source: e,
            })
    }

    async fn step_upload_avatar(&self, ctx: &mut ProvisionContext) -> Result<(), ProvisionError> {
        let bytes = generate_avatar(&ctx.profile)?;

        let step = "uploading_avatar";
        let server = self
            .api
            .owner_photo_upload_server()
            .await
            .map_err(|e| ProvisionError::Vk { step, source: e })?;
        let ticket = self
            .api
            .client()
            .upload_file(&server.upload_url, bytes, "photo")
            .await
            .map_err(|e| ProvisionError::Vk { step, source: e })?;
        self.api
            .save_owner_photo(&ticket)
            .await
            .map_err(|e| ProvisionError::Vk { step, source: e })?;

        ctx.progress.avatar_uploaded = true;
        Ok(())
    }

    async fn step_upload_cover(&self, ctx: &mut ProvisionContext) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;
        let bytes = generate_cover(&ctx.profile)?;

        let step = "uploading_cover";
        let server = self
            .api
            .owner_cover_upload_server(group_id)
            .await
            .map_err(|e| ProvisionError::Vk { step, source: e })?;
        let ticket = self
            .api
            .client()
            .upload_file(&server.upload_url, bytes, "photo")
            .await
            .map_err(|e| ProvisionError::Vk { step, source: e })?;
        self.api
            .save_owner_cover_photo(&ticket)
            .await
            .map_err(|e| ProvisionError::Vk { step, source: e })?;

        ctx.progress.cover_uploaded = true;
        Ok(())
    }

    async fn step_publish_posts(
        &self,
        ctx: &mut ProvisionContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;
        let posts = generate_posts(&ctx.profile);
        ctx.progress.total_posts = posts.len() as u32;

        // Resume mid-list: the counter records how many immediate posts
        // already went out in a previous attempt.
        let already_published = ctx.progress.posts_published as usize;
        let immediate = posts
            .iter()
            .filter(|p| p.publish_immediately)
            .take(IMMEDIATE_POST_QUOTA)
            .skip(already_published);

        for post in immediate {
            self.api
                .post_to_wall(&WallPostRequest {
                    owner_id: -group_id,
                    message: post.content.clone(),
                    from_group: true,
                    publish_date: None,
                })
                .await
                .map_err(|e| ProvisionError::Vk {
                    step: "publishing_posts",
                    source: e,
                })?;

            ctx.progress.posts_published += 1;
            progress.report(ProgressEvent::Snapshot {
                progress: ctx.progress.clone(),
                group_id: ctx.group_id,
            });
        }

        ctx.deferred = posts
            .iter()
            .filter(|p| !p.publish_immediately)
            .map(|p| DeferredPost {
                content: p.content.clone(),
                delay_days: p.delay_days,
            })
            .collect();

        Ok(())
    }

    async fn step_schedule_deferred(
        &self,
        ctx: &mut ProvisionContext,
    ) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;
        let batch = PostSchedulingJobData {
            group_id,
            student_id: ctx.student_id.clone(),
            posts: std::mem::take(&mut ctx.deferred),
        };

        let job_id = self.posts.enqueue(batch).await?;
        info!(student_id = %ctx.student_id, job_id = %job_id, "deferred posts scheduled");
        Ok(())
    }

    async fn step_create_reviews_topic(
        &self,
        ctx: &mut ProvisionContext,
    ) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;

        self.api
            .add_topic(group_id, REVIEWS_TOPIC_TITLE, REVIEWS_TOPIC_PROMPT, true)
            .await
            .map_err(|e| ProvisionError::Vk {
                step: "creating_reviews_topic",
                source: e,
            })?;

        ctx.progress.reviews_topic_created = true;
        Ok(())
    }

    async fn step_enable_market(&self, ctx: &mut ProvisionContext) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;

        self.api
            .toggle_market(group_id, true, CURRENCY_RUB)
            .await
            .map_err(|e| ProvisionError::Vk {
                step: "setting_up_market",
                source: e,
            })?;

        ctx.progress.market_enabled = true;
        Ok(())
    }

    async fn step_add_services(
        &self,
        ctx: &mut ProvisionContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;
        let items = generate_market_items(&ctx.profile);
        ctx.progress.total_services = items.len() as u32;

        let already_added = ctx.progress.services_added as usize;
        for item in items.into_iter().skip(already_added) {
            self.api
                .add_market_item(&MarketItemRequest {
                    owner_id: -group_id,
                    name: item.title,
                    description: item.description,
                    category_id: item.category_id,
                    price: item.price,
                    currency_id: CURRENCY_RUB,
                })
                .await
                .map_err(|e| ProvisionError::Vk {
                    step: "adding_services",
                    source: e,
                })?;

            ctx.progress.services_added += 1;
            progress.report(ProgressEvent::Snapshot {
                progress: ctx.progress.clone(),
                group_id: ctx.group_id,
            });
        }

        Ok(())
    }

    fn step_add_address(&self, ctx: &mut ProvisionContext) -> Result<(), ProvisionError> {
        // TODO: geocode the address and call groups.addAddress once a
        // geocoding provider is chosen. Until then the address only appears
        // in the description text; the flag records it was handled.
        ctx.progress.address_added = true;
        Ok(())
    }

    async fn step_enable_auto_responder(
        &self,
        ctx: &mut ProvisionContext,
    ) -> Result<(), ProvisionError> {
        let group_id = require_group_id(ctx)?;

        self.api
            .set_long_poll_settings(group_id, true, true)
            .await
            .map_err(|e| ProvisionError::Vk {
                step: "setting_up_auto_responder",
                source: e,
            })?;

        ctx.progress.auto_responder_enabled = true;
        Ok(())
    }

    fn persist_group_record(
        &self,
        ctx: &ProvisionContext,
        result: &GroupResult,
    ) -> Result<(), ProvisionError> {
        let now = Utc::now().to_rfc3339();
        group_repo::upsert(
            &self.db,
            &group_repo::GroupRow {
                student_id: ctx.student_id.clone(),
                vk_group_id: result.group_id,
                screen_name: result.screen_name.clone(),
                url: result.url.clone(),
                status: "completed".to_string(),
                progress: serde_json::to_string(&ctx.progress)
                    .unwrap_or_else(|_| "{}".to_string()),
                created_at: now.clone(),
                updated_at: now,
            },
        )?;
        Ok(())
    }
}

fn require_group_id(ctx: &ProvisionContext) -> Result<i64, ProvisionError> {
    ctx.group_id.ok_or(ProvisionError::MissingGroupId)
}
