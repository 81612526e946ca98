//! Commit-or-rollback completion for units of work

use crate::application::errors::ApplicationError;
use crate::domain::unit_of_work::IUnitOfWork;

/// Commit when `outcome` succeeded, roll back otherwise.
///
/// The unit of work is consumed on both paths. A rollback failure is logged
/// and the original error is returned.
pub(crate) async fn finish<T>(
    uow: Box<dyn IUnitOfWork>,
    outcome: Result<T, ApplicationError>,
) -> Result<T, ApplicationError> {
    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                tracing::warn!(error = %rollback_error, "Unit of work rollback failed");
            }
            Err(error)
        }
    }
}
