//! # KarmaStore
//!
//! Non-negative reputation per user, and the threshold guard that gates
//! privileged actions.

use std::sync::Arc;

use domains::{AppError, KarmaDecrement, KarmaRepository, Result, UserId};
use tracing::{debug, info};

pub struct KarmaStore {
    repo: Arc<dyn KarmaRepository>,
}

impl KarmaStore {
    pub fn new(repo: Arc<dyn KarmaRepository>) -> Self {
        Self { repo }
    }

    /// Adds `n` points, creating the record on first use. Returns the new total.
    pub async fn increase(&self, user: UserId, n: u64) -> Result<u64> {
        let total = self.repo.add(user, n).await?;
        debug!(%user, n, total, "karma increased");
        Ok(total)
    }

    /// Removes `n` points. Fails `NotAllowed` if the user has no record or
    /// fewer than `n` points; the counter never goes negative.
    pub async fn decrease(&self, user: UserId, n: u64) -> Result<u64> {
        match self.repo.subtract(user, n).await? {
            KarmaDecrement::Applied(total) => {
                debug!(%user, n, total, "karma decreased");
                Ok(total)
            }
            KarmaDecrement::Missing => Err(AppError::not_allowed(
                "user cannot have negative karma",
            )),
            KarmaDecrement::Insufficient(current) => Err(AppError::not_allowed(format!(
                "user cannot have negative karma (has {current}, needs {n})"
            ))),
        }
    }

    /// Current points, 0 for unknown users.
    pub async fn get(&self, user: UserId) -> Result<u64> {
        Ok(self.repo.points(user).await?.unwrap_or(0))
    }

    /// Precondition guard for privileged actions.
    pub async fn require_at_least(&self, user: UserId, threshold: u64) -> Result<()> {
        let points = self.get(user).await?;
        if points < threshold {
            info!(%user, points, threshold, "karma gate refused");
            return Err(AppError::not_allowed(format!(
                "user does not meet the required karma threshold of {threshold}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{ErrorKind, MockKarmaRepository};

    #[tokio::test]
    async fn unknown_user_has_zero_karma() {
        let mut repo = MockKarmaRepository::new();
        repo.expect_points().returning(|_| Ok(None));
        let karma = KarmaStore::new(Arc::new(repo));
        assert_eq!(karma.get(UserId::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn decrease_without_record_is_not_allowed() {
        let mut repo = MockKarmaRepository::new();
        repo.expect_subtract()
            .returning(|_, _| Ok(KarmaDecrement::Missing));
        let karma = KarmaStore::new(Arc::new(repo));

        let err = karma.decrease(UserId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAllowed);
    }

    #[tokio::test]
    async fn decrease_below_zero_is_not_allowed() {
        let mut repo = MockKarmaRepository::new();
        repo.expect_subtract()
            .returning(|_, _| Ok(KarmaDecrement::Insufficient(2)));
        let karma = KarmaStore::new(Arc::new(repo));

        let err = karma.decrease(UserId::new(), 3).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAllowed);
    }

    #[tokio::test]
    async fn threshold_is_inclusive() {
        let mut repo = MockKarmaRepository::new();
        repo.expect_points().returning(|_| Ok(Some(5)));
        let karma = KarmaStore::new(Arc::new(repo));
        let user = UserId::new();

        assert!(karma.require_at_least(user, 5).await.is_ok());
        assert_eq!(
            karma.require_at_least(user, 6).await.unwrap_err().kind(),
            ErrorKind::NotAllowed
        );
    }
}
