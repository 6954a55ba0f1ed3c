//! Post repository (read-only view of host content).

use std::sync::Arc;

use crate::entities::{Post, post};
use content_poll_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Statuses whose content is scanned for poll blocks.
pub const SCANNED_STATUSES: [&str; 3] = ["publish", "draft", "future"];

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Posts in one of `statuses` whose raw content contains `marker`.
    pub async fn find_containing(
        &self,
        marker: &str,
        statuses: &[&str],
    ) -> AppResult<Vec<post::Model>> {
        Post::find()
            .filter(post::Column::Status.is_in(statuses.iter().copied()))
            .filter(post::Column::Content.contains(marker))
            .order_by_asc(post::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_post(id: i64, status: &str) -> post::Model {
        post::Model {
            id,
            title: format!("Post {id}"),
            content: r#"<!-- wp:content-poll/vote-block {"pollId":"poll-1234"} /-->"#.to_string(),
            status: status.to_string(),
            post_type: "post".to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let post = create_test_post(42, "publish");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post.clone()]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let found = repo.find_by_id(42).await.unwrap();
        assert_eq!(found, Some(post));
    }

    #[tokio::test]
    async fn test_find_containing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![
                    create_test_post(1, "publish"),
                    create_test_post(2, "draft"),
                ]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let posts = repo
            .find_containing("<!-- wp:content-poll/vote-block", &SCANNED_STATUSES)
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].status, "draft");
    }
}
