mod comment_repository;
mod follower_repository;
mod like_repository;
mod post_repository;
mod user_repository;

pub use comment_repository::CommentRepository;
pub use follower_repository::FollowerRepository;
pub use like_repository::LikeRepository;
pub use post_repository::PostRepository;
pub use user_repository::UserRepository;

use super::error::StoreError;

/// Convert a failed write, logging rejections raised by declared constraints.
pub(crate) fn write_error(action: &str, err: rusqlite::Error) -> StoreError {
    let err = StoreError::from(err);
    if err.is_integrity_violation() {
        tracing::warn!("Rejected {}: {}", action, err);
    }
    err
}
