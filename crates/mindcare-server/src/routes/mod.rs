pub mod appointments;
pub mod chat;
pub mod counsellors;
pub mod events;
pub mod institutions;
pub mod screenings;
pub mod sessions;
pub mod users;

use crate::error::AppError;

/// Run a store call on the blocking pool. redb transactions do file I/O and
/// must stay off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> mindcare_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(value)
}
