// Listing assembly: content rows joined with their reaction tallies
use serde::Serialize;

use crate::content::{ContentStore, Feed};
use crate::db::models::{CommentRecord, PostId, PostRecord, UserId};
use crate::reactions::{Aggregates, VoteState};
use crate::repository::{RepoResult, RepositoryError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostRecord,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
    pub vote: VoteState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub like_count: i64,
    pub dislike_count: i64,
    pub vote: VoteState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

async fn post_view(
    aggregates: &dyn Aggregates,
    post: PostRecord,
    viewer: Option<UserId>,
) -> RepoResult<PostView> {
    let tally = aggregates.post_tally(post.id, viewer).await?;
    Ok(PostView {
        post,
        like_count: tally.like_count,
        dislike_count: tally.dislike_count,
        comment_count: tally.comment_count,
        vote: tally.vote,
    })
}

/// Build the views for a feed as seen by `viewer`.
pub async fn assemble_feed(
    content: &dyn ContentStore,
    aggregates: &dyn Aggregates,
    feed: &Feed,
    viewer: Option<UserId>,
) -> RepoResult<Vec<PostView>> {
    let posts = content.list_posts(feed).await?;

    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let view = match feed {
            // Every post in a liked feed carries the viewer's upvote.
            Feed::Liked(_) => {
                let mut view = post_view(aggregates, post, None).await?;
                view.vote = VoteState::Upvoted;
                view
            }
            _ => post_view(aggregates, post, viewer).await?,
        };
        views.push(view);
    }

    Ok(views)
}

/// A post with its comments, all aggregated for the same viewer.
pub async fn post_page(
    content: &dyn ContentStore,
    aggregates: &dyn Aggregates,
    post_id: PostId,
    viewer: Option<UserId>,
) -> RepoResult<PostPage> {
    let post = content
        .post(post_id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("post {}", post_id)))?;
    let post = post_view(aggregates, post, viewer).await?;

    let mut comments = Vec::new();
    for comment in content.comments_for_post(post_id).await? {
        let tally = aggregates.comment_tally(comment.id, viewer).await?;
        comments.push(CommentView {
            comment,
            like_count: tally.like_count,
            dislike_count: tally.dislike_count,
            vote: tally.vote,
        });
    }

    Ok(PostPage { post, comments })
}
