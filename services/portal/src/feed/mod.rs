//! Feed aggregation pipeline.
//!
//! # Purpose
//! Produces the render-ready feed for a viewer: posts in feed order, each
//! enriched with author display fields, channel name, vote tally, comment
//! count, the viewer's own vote, and poll options.
//!
//! # Failure policy
//! Enrichment is per-post independent and order-preserving. A failed lookup
//! degrades that post's fields to defaults (placeholder author, zero counts)
//! and never aborts the remaining posts. Only the initial post listing can
//! fail the whole call.
use crate::model::{FeedItem, Post};
use crate::store::{CommunityStore, PortalStore};
use uuid::Uuid;

pub mod watcher;

pub use watcher::{FeedUpdate, FeedWatcher};

/// Display name substituted when the author profile cannot be resolved.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Build the enriched feed for `viewer`, optionally filtered to one channel.
pub async fn build_feed(
    store: &dyn PortalStore,
    viewer: Uuid,
    channel: Option<Uuid>,
) -> crate::store::StoreResult<Vec<FeedItem>> {
    let posts = store.list_posts(channel).await?;
    let mut items = Vec::with_capacity(posts.len());
    for post in posts {
        items.push(enrich(store, viewer, post).await);
    }
    Ok(items)
}

async fn enrich(store: &dyn PortalStore, viewer: Uuid, post: Post) -> FeedItem {
    let (author_name, author_avatar_url) = match store.get_profile(post.author_id).await {
        Ok(Some(profile)) => (profile.full_name, profile.avatar_url),
        Ok(None) => (UNKNOWN_AUTHOR.to_string(), None),
        Err(err) => {
            tracing::warn!(post_id = %post.id, error = %err, "author enrichment failed");
            (UNKNOWN_AUTHOR.to_string(), None)
        }
    };

    let channel_name = match store.get_channel(post.subreddit_id).await {
        Ok(channel) => channel.name,
        Err(err) => {
            tracing::warn!(post_id = %post.id, error = %err, "channel enrichment failed");
            String::new()
        }
    };

    let vote_count = store.post_vote_tally(post.id).await.unwrap_or_else(|err| {
        tracing::warn!(post_id = %post.id, error = %err, "tally enrichment failed");
        0
    });
    let comment_count = store.comment_count(post.id).await.unwrap_or_else(|err| {
        tracing::warn!(post_id = %post.id, error = %err, "comment count enrichment failed");
        0
    });
    let user_vote = store
        .user_post_vote(post.id, viewer)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(post_id = %post.id, error = %err, "viewer vote enrichment failed");
            0
        });
    let poll_options = if post.is_poll {
        store.poll_options(post.id).await.unwrap_or_else(|err| {
            tracing::warn!(post_id = %post.id, error = %err, "poll enrichment failed");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    FeedItem {
        post,
        author_name,
        author_avatar_url,
        channel_name,
        vote_count,
        comment_count,
        user_vote,
        poll_options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Channel, Comment, NewComment, NewPost, PollOption, PostChange, Profile, ProfileUpdate,
        Role, RosterEntry, VoteType,
    };
    use crate::store::memory::InMemoryStore;
    use crate::store::{
        ChangeSet, CommunityStore, IdentityRecord, IdentityStore, Snapshot, StoreConfig,
        StoreError, StoreResult,
    };
    use async_trait::async_trait;
    use tokio::sync::broadcast;

    fn store() -> InMemoryStore {
        InMemoryStore::new(StoreConfig {
            changes_limit: 16,
            change_retention_max_rows: None,
        })
    }

    async fn approved_profile(store: &InMemoryStore, name: &str) -> Profile {
        let mut profile = Profile::new(
            Uuid::new_v4(),
            format!("{}@h.example", name.to_lowercase()),
            name.into(),
        );
        profile.is_approved = true;
        store.create_profile(profile.clone()).await.expect("profile");
        profile
    }

    /// Delegates to the inner store but fails every profile lookup, to
    /// exercise the degradation path.
    struct NoProfileStore(InMemoryStore);

    #[async_trait]
    impl IdentityStore for NoProfileStore {
        async fn create_identity(&self, record: IdentityRecord) -> StoreResult<Uuid> {
            self.0.create_identity(record).await
        }

        async fn find_identity(&self, email: &str) -> StoreResult<Option<IdentityRecord>> {
            self.0.find_identity(email).await
        }
    }

    #[async_trait]
    impl CommunityStore for NoProfileStore {
        async fn create_profile(&self, profile: Profile) -> StoreResult<Profile> {
            self.0.create_profile(profile).await
        }

        async fn get_profile(&self, _user_id: Uuid) -> StoreResult<Option<Profile>> {
            Err(StoreError::Unavailable("profiles offline".into()))
        }

        async fn update_profile(
            &self,
            user_id: Uuid,
            update: ProfileUpdate,
        ) -> StoreResult<Profile> {
            self.0.update_profile(user_id, update).await
        }

        async fn set_approval(&self, user_id: Uuid, approved: bool) -> StoreResult<Profile> {
            self.0.set_approval(user_id, approved).await
        }

        async fn get_role(&self, user_id: Uuid) -> StoreResult<Role> {
            self.0.get_role(user_id).await
        }

        async fn set_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
            self.0.set_role(user_id, role).await
        }

        async fn list_roster(&self) -> StoreResult<Vec<RosterEntry>> {
            self.0.list_roster().await
        }

        async fn list_channels(&self) -> StoreResult<Vec<Channel>> {
            self.0.list_channels().await
        }

        async fn create_channel(&self, channel: Channel) -> StoreResult<Channel> {
            self.0.create_channel(channel).await
        }

        async fn get_channel(&self, channel_id: Uuid) -> StoreResult<Channel> {
            self.0.get_channel(channel_id).await
        }

        async fn create_post(&self, new_post: NewPost) -> StoreResult<Post> {
            self.0.create_post(new_post).await
        }

        async fn list_posts(&self, channel: Option<Uuid>) -> StoreResult<Vec<Post>> {
            self.0.list_posts(channel).await
        }

        async fn set_post_pinned(&self, post_id: Uuid, pinned: bool) -> StoreResult<Post> {
            self.0.set_post_pinned(post_id, pinned).await
        }

        async fn poll_options(&self, post_id: Uuid) -> StoreResult<Vec<PollOption>> {
            self.0.poll_options(post_id).await
        }

        async fn post_snapshot(&self) -> StoreResult<Snapshot<Post>> {
            self.0.post_snapshot().await
        }

        async fn post_changes(&self, since: u64) -> StoreResult<ChangeSet<PostChange>> {
            self.0.post_changes(since).await
        }

        fn subscribe_post_changes(&self) -> broadcast::Receiver<PostChange> {
            self.0.subscribe_post_changes()
        }

        async fn cast_post_vote(
            &self,
            post_id: Uuid,
            user_id: Uuid,
            vote: VoteType,
        ) -> StoreResult<i16> {
            self.0.cast_post_vote(post_id, user_id, vote).await
        }

        async fn post_vote_tally(&self, post_id: Uuid) -> StoreResult<i64> {
            self.0.post_vote_tally(post_id).await
        }

        async fn user_post_vote(&self, post_id: Uuid, user_id: Uuid) -> StoreResult<i16> {
            self.0.user_post_vote(post_id, user_id).await
        }

        async fn create_comment(&self, new_comment: NewComment) -> StoreResult<Comment> {
            self.0.create_comment(new_comment).await
        }

        async fn comment_count(&self, post_id: Uuid) -> StoreResult<u64> {
            self.0.comment_count(post_id).await
        }

        async fn health_check(&self) -> StoreResult<()> {
            self.0.health_check().await
        }

        fn is_durable(&self) -> bool {
            false
        }

        fn backend_name(&self) -> &'static str {
            "no-profile"
        }
    }

    #[tokio::test]
    async fn feed_shows_per_viewer_votes() {
        let store = store();
        let author = approved_profile(&store, "Asha").await;
        let voter = approved_profile(&store, "Binod").await;
        let channel = store
            .create_channel(Channel::new("general".into(), None, author.id))
            .await
            .expect("channel");
        let post = store
            .create_post(NewPost {
                title: "Welcome".into(),
                content: Some("hello".into()),
                image_url: None,
                flair: None,
                subreddit_id: channel.id,
                author_id: author.id,
                poll_options: Vec::new(),
            })
            .await
            .expect("post");
        store
            .cast_post_vote(post.id, voter.id, VoteType::Up)
            .await
            .expect("vote");

        let feed_for_author = build_feed(&store, author.id, None).await.expect("feed");
        assert_eq!(feed_for_author.len(), 1);
        let item = &feed_for_author[0];
        assert_eq!(item.vote_count, 1);
        assert_eq!(item.user_vote, 0);
        assert_eq!(item.author_name, "Asha");
        assert_eq!(item.channel_name, "general");

        let feed_for_voter = build_feed(&store, voter.id, None).await.expect("feed");
        assert_eq!(feed_for_voter[0].user_vote, 1);
    }

    #[tokio::test]
    async fn channel_filter_scopes_the_feed() {
        let store = store();
        let author = approved_profile(&store, "Asha").await;
        let general = store
            .create_channel(Channel::new("general".into(), None, author.id))
            .await
            .expect("channel");
        let events = store
            .create_channel(Channel::new("events".into(), None, author.id))
            .await
            .expect("channel");
        for (title, channel) in [("in general", &general), ("in events", &events)] {
            store
                .create_post(NewPost {
                    title: title.into(),
                    content: None,
                    image_url: None,
                    flair: None,
                    subreddit_id: channel.id,
                    author_id: author.id,
                    poll_options: Vec::new(),
                })
                .await
                .expect("post");
        }

        let filtered = build_feed(&store, author.id, Some(events.id))
            .await
            .expect("feed");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].post.title, "in events");

        let unfiltered = build_feed(&store, author.id, None).await.expect("feed");
        assert_eq!(unfiltered.len(), 2);
    }

    #[tokio::test]
    async fn profile_failure_degrades_single_items_only() {
        let inner = store();
        let author = approved_profile(&inner, "Asha").await;
        let channel = inner
            .create_channel(Channel::new("general".into(), None, author.id))
            .await
            .expect("channel");
        inner
            .create_post(NewPost {
                title: "first".into(),
                content: None,
                image_url: None,
                flair: None,
                subreddit_id: channel.id,
                author_id: author.id,
                poll_options: Vec::new(),
            })
            .await
            .expect("post");
        let second = inner
            .create_post(NewPost {
                title: "second".into(),
                content: None,
                image_url: None,
                flair: None,
                subreddit_id: channel.id,
                author_id: author.id,
                poll_options: Vec::new(),
            })
            .await
            .expect("post");
        inner
            .cast_post_vote(second.id, author.id, VoteType::Up)
            .await
            .expect("vote");

        let failing = NoProfileStore(inner);
        let feed = build_feed(&failing, author.id, None).await.expect("feed");

        // Both items survive with placeholder authors; other enrichment and
        // ordering are untouched.
        assert_eq!(feed.len(), 2);
        assert!(feed
            .iter()
            .all(|item| item.author_name == UNKNOWN_AUTHOR));
        assert_eq!(feed[0].post.title, "second");
        assert_eq!(feed[0].vote_count, 1);
        assert_eq!(feed[1].vote_count, 0);
    }
}
