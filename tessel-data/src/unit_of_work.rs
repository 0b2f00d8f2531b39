use crate::error::DataError;
use std::future::Future;

/// Commits the changes staged through repositories as one transaction.
pub trait UnitOfWork: Send {
    /// User recorded as the author of subsequent saves. Blank names are ignored.
    fn set_user_name(&mut self, name: &str);

    /// Persist every staged change atomically and return the number of affected rows.
    fn save(&mut self) -> impl Future<Output = Result<u64, DataError>> + Send;
}
