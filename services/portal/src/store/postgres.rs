//! Postgres-backed implementation of the portal stores.
//!
//! # Data model
//! Authoritative tables (`identities`, `profiles`, `user_roles`,
//! `subreddits`, `posts`, `poll_options`, `votes`, `comments`) hold current
//! state; the append-only `post_changes` table carries an ordered change
//! stream with a monotonically increasing `seq` assigned by Postgres.
//! Mutations update the authoritative row and append the change event in the
//! same transaction, so watchers never observe one without the other.
//!
//! # Vote linearization
//! The partial unique index on `(post_id, user_id)` is the authoritative
//! one-vote-per-voter constraint. The toggle runs in a transaction whose
//! write path is `DELETE` (re-cast) or `INSERT ... ON CONFLICT ... DO
//! UPDATE` (new or flipped vote), so concurrent casts from the same voter
//! degrade to last-upsert-wins rather than duplicate rows.
//!
//! # Operational notes
//! - Embedded migrations run at startup; if they fail, startup fails rather
//!   than serving against an incompatible schema.
//! - Pool acquire timeouts are configured so requests fail fast instead of
//!   hanging on an unavailable database; those failures surface as
//!   [`StoreError::Unavailable`].
//! - The optional retention task bounds `post_changes` to the most recent
//!   `N` rows; clients that fall behind the window re-bootstrap via
//!   `post_snapshot()`.
//! - Change broadcast is per-process. Cross-instance deployments poll the
//!   changes endpoint instead of sharing the broadcast channel.
use super::{
    ChangeSet, CommunityStore, IdentityRecord, IdentityStore, Snapshot, StoreConfig, StoreError,
    StoreResult,
};
use crate::config::PostgresConfig;
use crate::model::{
    Channel, Comment, NewComment, NewPost, PollOption, Post, PostChange, PostChangeOp, Profile,
    ProfileUpdate, Role, RosterEntry, VoteType,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

const POST_EVENT_CAPACITY: usize = 256;
const RETENTION_TICK: Duration = Duration::from_secs(60);

/// Durable portal store backed by Postgres via `sqlx`.
pub struct PostgresStore {
    pool: PgPool,
    config: StoreConfig,
    post_events: broadcast::Sender<PostChange>,
}

// DB-facing row structs are kept separate from the domain types so schema
// details (column names, string enums) stay localized to this module.

#[derive(Debug, Clone, FromRow)]
struct DbIdentity {
    id: Uuid,
    email: String,
    salt: String,
    digest: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbProfile {
    id: Uuid,
    email: String,
    full_name: String,
    room_number: Option<String>,
    phone: Option<String>,
    batch: Option<String>,
    branch: Option<String>,
    avatar_url: Option<String>,
    emergency_contact: Option<String>,
    emergency_phone: Option<String>,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbRosterRow {
    id: Uuid,
    email: String,
    full_name: String,
    room_number: Option<String>,
    phone: Option<String>,
    batch: Option<String>,
    branch: Option<String>,
    avatar_url: Option<String>,
    emergency_contact: Option<String>,
    emergency_phone: Option<String>,
    is_approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    role: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct DbChannel {
    id: Uuid,
    name: String,
    description: Option<String>,
    icon_url: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbPost {
    id: Uuid,
    seq: i64,
    title: String,
    content: Option<String>,
    image_url: Option<String>,
    flair: Option<String>,
    is_pinned: bool,
    is_poll: bool,
    subreddit_id: Uuid,
    author_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbPollOption {
    id: Uuid,
    post_id: Uuid,
    option_text: String,
    votes: i64,
}

#[derive(Debug, Clone, FromRow)]
struct PostChangeRow {
    seq: i64,
    op: String,
    post_id: Uuid,
    payload: Option<Value>,
}

impl PostgresStore {
    /// Connect, run migrations, and start retention maintenance when
    /// configured.
    pub async fn connect(pg: &PostgresConfig, config: StoreConfig) -> StoreResult<Self> {
        // Fail fast on an unavailable database rather than hanging: the
        // acquire timeout bounds how long a request waits for a pooled
        // connection. The URL may carry credentials, so it is never logged.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;

        if let Some(retention) = config.change_retention_max_rows {
            spawn_retention_task(pool.clone(), retention);
        }

        let (post_events, _) = broadcast::channel(POST_EVENT_CAPACITY);
        Ok(Self {
            pool,
            config,
            post_events,
        })
    }

    fn limit(&self) -> i64 {
        self.config.changes_limit as i64
    }

    /// Append a change row inside the caller's transaction and return the
    /// assembled change payload for post-commit broadcast.
    async fn append_post_change(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        op: PostChangeOp,
        post_id: Uuid,
        post: Option<&Post>,
    ) -> StoreResult<PostChange> {
        let seq = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO post_changes (op, post_id, payload) VALUES ($1, $2, $3) RETURNING seq"#,
        )
        .bind(op_label(op))
        .bind(post_id)
        .bind(post.and_then(|post| serde_json::to_value(post).ok()))
        .fetch_one(&mut **tx)
        .await?;
        Ok(PostChange {
            seq: seq as u64,
            op,
            post_id,
            post: post.cloned(),
        })
    }

    /// Broadcast a committed change to in-process subscribers.
    fn publish(&self, change: PostChange) {
        metrics::counter!("portal_post_changes_total", "op" => op_label(change.op)).increment(1);
        let _ = self.post_events.send(change);
    }
}

/// Bound the change table to the most recent `max_rows` entries. Best-effort:
/// transient failures are retried on the next tick.
fn spawn_retention_task(pool: PgPool, max_rows: i64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RETENTION_TICK);
        loop {
            ticker.tick().await;
            // The inner SELECT computes the cutoff seq; COALESCE makes the
            // delete a no-op for an empty table.
            let _ = sqlx::query(
                "DELETE FROM post_changes \
                 WHERE seq < (SELECT COALESCE(MAX(seq) - $1 + 1, 0) FROM post_changes)",
            )
            .bind(max_rows)
            .execute(&pool)
            .await;
        }
    });
}

fn op_label(op: PostChangeOp) -> &'static str {
    match op {
        PostChangeOp::Created => "created",
        PostChangeOp::Updated => "updated",
        PostChangeOp::Deleted => "deleted",
    }
}

fn parse_op(raw: &str) -> StoreResult<PostChangeOp> {
    match raw {
        "created" => Ok(PostChangeOp::Created),
        "updated" => Ok(PostChangeOp::Updated),
        "deleted" => Ok(PostChangeOp::Deleted),
        other => Err(StoreError::Unexpected(anyhow!("unknown change op: {other}"))),
    }
}

fn parse_role(raw: &str) -> StoreResult<Role> {
    Role::parse(raw).ok_or_else(|| StoreError::Unexpected(anyhow!("unknown role: {raw}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn profile_from_db(row: DbProfile) -> Profile {
    Profile {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        room_number: row.room_number,
        phone: row.phone,
        batch: row.batch,
        branch: row.branch,
        avatar_url: row.avatar_url,
        emergency_contact: row.emergency_contact,
        emergency_phone: row.emergency_phone,
        is_approved: row.is_approved,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn post_from_db(row: DbPost) -> Post {
    Post {
        id: row.id,
        seq: row.seq as u64,
        title: row.title,
        content: row.content,
        image_url: row.image_url,
        flair: row.flair,
        is_pinned: row.is_pinned,
        is_poll: row.is_poll,
        subreddit_id: row.subreddit_id,
        author_id: row.author_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn change_from_row(row: PostChangeRow) -> StoreResult<PostChange> {
    Ok(PostChange {
        seq: row.seq as u64,
        op: parse_op(&row.op)?,
        post_id: row.post_id,
        post: row
            .payload
            .and_then(|payload| serde_json::from_value(payload).ok()),
    })
}

const PROFILE_COLUMNS: &str = "id, email, full_name, room_number, phone, batch, branch, \
     avatar_url, emergency_contact, emergency_phone, is_approved, created_at, updated_at";

const POST_COLUMNS: &str = "id, seq, title, content, image_url, flair, is_pinned, is_poll, \
     subreddit_id, author_id, created_at, updated_at";

#[async_trait]
impl IdentityStore for PostgresStore {
    async fn create_identity(&self, record: IdentityRecord) -> StoreResult<Uuid> {
        let insert = sqlx::query(
            r#"INSERT INTO identities (id, email, salt, digest) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(record.user_id)
        .bind(record.email.to_ascii_lowercase())
        .bind(&record.salt)
        .bind(&record.digest)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("email already registered".into()));
            }
            return Err(err.into());
        }
        Ok(record.user_id)
    }

    async fn find_identity(&self, email: &str) -> StoreResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, DbIdentity>(
            r#"SELECT id, email, salt, digest FROM identities WHERE email = $1"#,
        )
        .bind(email.to_ascii_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| IdentityRecord {
            user_id: row.id,
            email: row.email,
            salt: row.salt,
            digest: row.digest,
        }))
    }
}

#[async_trait]
impl CommunityStore for PostgresStore {
    async fn create_profile(&self, profile: Profile) -> StoreResult<Profile> {
        let insert = sqlx::query(
            r#"INSERT INTO profiles
               (id, email, full_name, room_number, phone, batch, branch, avatar_url,
                emergency_contact, emergency_phone, is_approved, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.room_number)
        .bind(&profile.phone)
        .bind(&profile.batch)
        .bind(&profile.branch)
        .bind(&profile.avatar_url)
        .bind(&profile.emergency_contact)
        .bind(&profile.emergency_phone)
        .bind(profile.is_approved)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("profile exists".into()));
            }
            return Err(err.into());
        }
        Ok(profile)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, DbProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(profile_from_db))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        // COALESCE keeps unspecified fields; a provided field always wins.
        let row = sqlx::query_as::<_, DbProfile>(&format!(
            "UPDATE profiles SET
                full_name = COALESCE($2, full_name),
                room_number = COALESCE($3, room_number),
                phone = COALESCE($4, phone),
                batch = COALESCE($5, batch),
                branch = COALESCE($6, branch),
                avatar_url = COALESCE($7, avatar_url),
                emergency_contact = COALESCE($8, emergency_contact),
                emergency_phone = COALESCE($9, emergency_phone),
                updated_at = now()
             WHERE id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&update.full_name)
        .bind(&update.room_number)
        .bind(&update.phone)
        .bind(&update.batch)
        .bind(&update.branch)
        .bind(&update.avatar_url)
        .bind(&update.emergency_contact)
        .bind(&update.emergency_phone)
        .fetch_optional(&self.pool)
        .await?;
        row.map(profile_from_db)
            .ok_or_else(|| StoreError::NotFound("profile".into()))
    }

    async fn set_approval(&self, user_id: Uuid, approved: bool) -> StoreResult<Profile> {
        let row = sqlx::query_as::<_, DbProfile>(&format!(
            "UPDATE profiles SET is_approved = $2, updated_at = now()
             WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await?;
        row.map(profile_from_db)
            .ok_or_else(|| StoreError::NotFound("profile".into()))
    }

    async fn get_role(&self, user_id: Uuid) -> StoreResult<Role> {
        let role = sqlx::query_scalar::<_, String>(
            r#"SELECT role FROM user_roles WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        match role {
            Some(raw) => parse_role(&raw),
            None => Ok(Role::Member),
        }
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO user_roles (user_id, role) VALUES ($1, $2)
               ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role"#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_roster(&self) -> StoreResult<Vec<RosterEntry>> {
        let rows = sqlx::query_as::<_, DbRosterRow>(
            r#"SELECT p.id, p.email, p.full_name, p.room_number, p.phone, p.batch, p.branch,
                      p.avatar_url, p.emergency_contact, p.emergency_phone, p.is_approved,
                      p.created_at, p.updated_at, r.role
               FROM profiles p
               LEFT JOIN user_roles r ON r.user_id = p.id
               ORDER BY p.full_name, p.id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let role = match row.role.as_deref() {
                    Some(raw) => parse_role(raw)?,
                    None => Role::Member,
                };
                Ok(RosterEntry {
                    profile: profile_from_db(DbProfile {
                        id: row.id,
                        email: row.email,
                        full_name: row.full_name,
                        room_number: row.room_number,
                        phone: row.phone,
                        batch: row.batch,
                        branch: row.branch,
                        avatar_url: row.avatar_url,
                        emergency_contact: row.emergency_contact,
                        emergency_phone: row.emergency_phone,
                        is_approved: row.is_approved,
                        created_at: row.created_at,
                        updated_at: row.updated_at,
                    }),
                    role,
                })
            })
            .collect()
    }

    async fn list_channels(&self) -> StoreResult<Vec<Channel>> {
        let rows = sqlx::query_as::<_, DbChannel>(
            r#"SELECT id, name, description, icon_url, created_by, created_at
               FROM subreddits ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| Channel {
                id: row.id,
                name: row.name,
                description: row.description,
                icon_url: row.icon_url,
                created_by: row.created_by,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn create_channel(&self, channel: Channel) -> StoreResult<Channel> {
        let insert = sqlx::query(
            r#"INSERT INTO subreddits (id, name, description, icon_url, created_by, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(&channel.description)
        .bind(&channel.icon_url)
        .bind(channel.created_by)
        .bind(channel.created_at)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict(format!(
                    "channel '{}' already exists",
                    channel.name
                )));
            }
            return Err(err.into());
        }
        Ok(channel)
    }

    async fn get_channel(&self, channel_id: Uuid) -> StoreResult<Channel> {
        let row = sqlx::query_as::<_, DbChannel>(
            r#"SELECT id, name, description, icon_url, created_by, created_at
               FROM subreddits WHERE id = $1"#,
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| Channel {
            id: row.id,
            name: row.name,
            description: row.description,
            icon_url: row.icon_url,
            created_by: row.created_by,
            created_at: row.created_at,
        })
        .ok_or_else(|| StoreError::NotFound("channel".into()))
    }

    async fn create_post(&self, new_post: NewPost) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;

        let channel_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM subreddits WHERE id = $1)")
                .bind(new_post.subreddit_id)
                .fetch_one(&mut *tx)
                .await?;
        if !channel_exists {
            return Err(StoreError::NotFound("channel".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let is_poll = !new_post.poll_options.is_empty();
        let seq = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO posts
               (id, title, content, image_url, flair, is_pinned, is_poll, subreddit_id,
                author_id, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7, $8, $9, $9)
               RETURNING seq"#,
        )
        .bind(id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(&new_post.image_url)
        .bind(&new_post.flair)
        .bind(is_poll)
        .bind(new_post.subreddit_id)
        .bind(new_post.author_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for (ordinal, option_text) in new_post.poll_options.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO poll_options (id, post_id, ordinal, option_text, votes)
                   VALUES ($1, $2, $3, $4, 0)"#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(ordinal as i32)
            .bind(option_text)
            .execute(&mut *tx)
            .await?;
        }

        let post = Post {
            id,
            seq: seq as u64,
            title: new_post.title,
            content: new_post.content,
            image_url: new_post.image_url,
            flair: new_post.flair,
            is_pinned: false,
            is_poll,
            subreddit_id: new_post.subreddit_id,
            author_id: new_post.author_id,
            created_at: now,
            updated_at: now,
        };
        let change =
            Self::append_post_change(&mut tx, PostChangeOp::Created, post.id, Some(&post)).await?;
        tx.commit().await?;
        self.publish(change);
        Ok(post)
    }

    async fn list_posts(&self, channel: Option<Uuid>) -> StoreResult<Vec<Post>> {
        let rows = match channel {
            Some(channel_id) => {
                sqlx::query_as::<_, DbPost>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE subreddit_id = $1
                     ORDER BY is_pinned DESC, created_at DESC, seq ASC"
                ))
                .bind(channel_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DbPost>(&format!(
                    "SELECT {POST_COLUMNS} FROM posts
                     ORDER BY is_pinned DESC, created_at DESC, seq ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(post_from_db).collect())
    }

    async fn set_post_pinned(&self, post_id: Uuid, pinned: bool) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, DbPost>(&format!(
            "UPDATE posts SET is_pinned = $2, updated_at = now()
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(post_id)
        .bind(pinned)
        .fetch_optional(&mut *tx)
        .await?;
        let post = row
            .map(post_from_db)
            .ok_or_else(|| StoreError::NotFound("post".into()))?;
        let change =
            Self::append_post_change(&mut tx, PostChangeOp::Updated, post.id, Some(&post)).await?;
        tx.commit().await?;
        self.publish(change);
        Ok(post)
    }

    async fn poll_options(&self, post_id: Uuid) -> StoreResult<Vec<PollOption>> {
        let rows = sqlx::query_as::<_, DbPollOption>(
            r#"SELECT id, post_id, option_text, votes FROM poll_options
               WHERE post_id = $1 ORDER BY ordinal"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| PollOption {
                id: row.id,
                post_id: row.post_id,
                option_text: row.option_text,
                votes: row.votes,
            })
            .collect())
    }

    async fn post_snapshot(&self) -> StoreResult<Snapshot<Post>> {
        // One transaction so items and the checkpoint agree.
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, DbPost>(&format!(
            "SELECT {POST_COLUMNS} FROM posts
             ORDER BY is_pinned DESC, created_at DESC, seq ASC"
        ))
        .fetch_all(&mut *tx)
        .await?;
        let next_seq =
            sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(seq) + 1, 0) FROM post_changes")
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(Snapshot {
            items: rows.into_iter().map(post_from_db).collect(),
            next_seq: next_seq as u64,
        })
    }

    async fn post_changes(&self, since: u64) -> StoreResult<ChangeSet<PostChange>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, PostChangeRow>(
            r#"SELECT seq, op, post_id, payload FROM post_changes
               WHERE seq >= $1 ORDER BY seq ASC LIMIT $2"#,
        )
        .bind(since as i64)
        .bind(self.limit())
        .fetch_all(&mut *tx)
        .await?;
        let next_seq =
            sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(seq) + 1, 0) FROM post_changes")
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(ChangeSet {
            items: rows
                .into_iter()
                .map(change_from_row)
                .collect::<StoreResult<Vec<_>>>()?,
            next_seq: next_seq as u64,
        })
    }

    fn subscribe_post_changes(&self) -> broadcast::Receiver<PostChange> {
        self.post_events.subscribe()
    }

    async fn cast_post_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        vote: VoteType,
    ) -> StoreResult<i16> {
        let mut tx = self.pool.begin().await?;

        let post_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await?;
        if !post_exists {
            return Err(StoreError::NotFound("post".into()));
        }

        let existing = sqlx::query_scalar::<_, i16>(
            r#"SELECT vote_type FROM votes WHERE post_id = $1 AND user_id = $2"#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = if existing == Some(vote.value()) {
            // Re-cast of the current direction removes the vote.
            sqlx::query(r#"DELETE FROM votes WHERE post_id = $1 AND user_id = $2"#)
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            0
        } else {
            // Insert or replace in one statement; the partial unique index
            // makes concurrent casts from the same voter last-upsert-wins.
            sqlx::query(
                r#"INSERT INTO votes (id, post_id, user_id, vote_type) VALUES ($1, $2, $3, $4)
                   ON CONFLICT (post_id, user_id) WHERE post_id IS NOT NULL
                   DO UPDATE SET vote_type = EXCLUDED.vote_type"#,
            )
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(user_id)
            .bind(vote.value())
            .execute(&mut *tx)
            .await?;
            vote.value()
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn post_vote_tally(&self, post_id: Uuid) -> StoreResult<i64> {
        let tally = sqlx::query_scalar::<_, i64>(
            r#"SELECT COALESCE(SUM(vote_type), 0)::BIGINT FROM votes WHERE post_id = $1"#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(tally)
    }

    async fn user_post_vote(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<i16> {
        let vote = sqlx::query_scalar::<_, i16>(
            r#"SELECT vote_type FROM votes WHERE post_id = $1 AND user_id = $2"#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote.unwrap_or(0))
    }

    async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let post_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                .bind(new_comment.post_id)
                .fetch_one(&mut *tx)
                .await?;
        if !post_exists {
            return Err(StoreError::NotFound("post".into()));
        }

        if let Some(parent_id) = new_comment.parent_id {
            let parent_post = sqlx::query_scalar::<_, Uuid>(
                r#"SELECT post_id FROM comments WHERE id = $1"#,
            )
            .bind(parent_id)
            .fetch_optional(&mut *tx)
            .await?;
            if parent_post != Some(new_comment.post_id) {
                return Err(StoreError::NotFound("parent comment".into()));
            }
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new_comment.post_id,
            parent_id: new_comment.parent_id,
            author_id: new_comment.author_id,
            content: new_comment.content,
            created_at: Utc::now(),
        };
        sqlx::query(
            r#"INSERT INTO comments (id, post_id, parent_id, author_id, content, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn comment_count(&self, post_id: Uuid) -> StoreResult<u64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
