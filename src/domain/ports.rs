use crate::domain::model::{OutboundAction, UserId, UserSession};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn rename(&self, from: &str, to: &str)
        -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn signatures_dir(&self) -> &str;
    fn records_dir(&self) -> &str;
    fn web_app_url(&self) -> &str;
}

/// Per-user intake progress. Entries are created by `/start` and removed on
/// completion or cancellation.
pub trait SessionStore: Send + Sync {
    fn get(&self, user_id: &UserId) -> Option<UserSession>;
    fn put(&self, session: UserSession);
    fn remove(&self, user_id: &UserId) -> Option<UserSession>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Delivers outbound actions to the chat transport.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, action: OutboundAction) -> Result<()>;
}
