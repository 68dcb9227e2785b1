use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::core::error::{not_found_as, ServiceError};
use crate::models::domain::{
    Account, AccountDetails, CandidateQuery, DislikeAccount, LikeAccount, MatchAction,
    MatchResult, Page, Ranking,
};
use crate::services::repository::{Repositories, TransactionProvider, UnitOfWork};

/// Candidate feed and like/dislike state machine
///
/// # Action transitions (per ordered pair actor -> target)
/// - Like: drop a dislike from actor, reject a repeated like, insert the like,
///   then report `Match` when the target already likes the actor.
/// - Dislike: drop a like from actor, reject a repeated dislike, insert the dislike.
///
/// A match is never stored; it is the presence of likes in both directions.
#[derive(Clone)]
pub struct MatchEngine {
    store: Arc<dyn TransactionProvider>,
    dislike_expiry: Duration,
    ranking: Ranking,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn TransactionProvider>, dislike_expiry: Duration, ranking: Ranking) -> Self {
        Self {
            store,
            dislike_expiry,
            ranking,
        }
    }

    /// Find opposite-role candidates the requester has not acted on yet
    ///
    /// Sweeps the requester's expired dislikes first, so previously disliked
    /// accounts come back once the expiry elapsed. Every returned candidate is
    /// recorded as seen.
    pub async fn matchable_accounts(
        &self,
        account_id: i64,
        limit: i64,
    ) -> Result<Page<AccountDetails>, ServiceError> {
        let mut session = self.store.session().await?;

        let requester = session
            .accounts()
            .get_by_id(account_id)
            .await
            .map_err(not_found_as("account"))?;

        let before = Utc::now() - self.dislike_expiry;
        let swept = session
            .relations()
            .delete_expired_dislikes(account_id, before)
            .await?;
        tracing::debug!("Swept {} expired dislikes of account {}", swept, account_id);

        let query = CandidateQuery {
            requester_id: account_id,
            target_role: requester.role.opposite(),
            limit,
            ranking: self.ranking,
        };

        let candidates = session.accounts().matchable(&query).await?;
        let total = session.accounts().count_matchable(&query).await?;

        tracing::info!(
            "Found {} of {} candidates for account {}",
            candidates.len(),
            total,
            account_id
        );

        let mut data = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let details = with_links(session.as_mut(), candidate).await;

            if let Err(e) = session
                .relations()
                .mark_seen(account_id, details.account.id)
                .await
            {
                tracing::warn!(
                    "Failed to mark account {} as seen by {}: {}",
                    details.account.id,
                    account_id,
                    e
                );
            }

            data.push(details);
        }

        Ok(Page {
            offset: 0,
            limit,
            total,
            data,
        })
    }

    /// Accounts that liked `account_id`, newest first
    pub async fn account_likers(
        &self,
        account_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Page<Account>, ServiceError> {
        let mut session = self.store.session().await?;

        let data = session.accounts().likers(account_id, offset, limit).await?;
        let total = session.accounts().count_likers(account_id).await?;

        Ok(Page {
            offset,
            limit,
            total,
            data,
        })
    }

    /// Apply a like or dislike from `actor_id` to `target_id`
    pub async fn match_action(
        &self,
        actor_id: i64,
        target_id: i64,
        action: MatchAction,
    ) -> Result<MatchResult, ServiceError> {
        if let MatchAction::Unknown(value) = &action {
            tracing::error!("Unhandled match action {:?} from account {}", value, actor_id);
            return Err(ServiceError::UnhandledAction(value.clone()));
        }

        if actor_id == target_id {
            tracing::error!("Account {} tried to act on itself", actor_id);
            return Err(ServiceError::Validation(
                "an account cannot act on itself".to_string(),
            ));
        }

        let mut uow = self.store.begin().await?;

        uow.accounts()
            .get_by_id(target_id)
            .await
            .map_err(not_found_as("target account"))?;

        let result = match action {
            MatchAction::Like => like(uow.as_mut(), actor_id, target_id).await,
            MatchAction::Dislike => dislike(uow.as_mut(), actor_id, target_id).await,
            MatchAction::Unknown(value) => Err(ServiceError::UnhandledAction(value)),
        };

        let result = match result {
            Ok(result) => {
                uow.commit().await?;
                result
            }
            Err(e) => {
                tracing::error!(
                    "Match action {} -> {} failed: {}",
                    actor_id,
                    target_id,
                    e
                );
                return Err(e);
            }
        };

        tracing::info!("Match action {} -> {}: {:?}", actor_id, target_id, result);
        Ok(result)
    }
}

async fn like(
    uow: &mut dyn UnitOfWork,
    actor_id: i64,
    target_id: i64,
) -> Result<MatchResult, ServiceError> {
    let edge = LikeAccount {
        liker_id: actor_id,
        liked_id: target_id,
    };

    uow.relations()
        .delete_dislike(DislikeAccount {
            disliker_id: actor_id,
            disliked_id: target_id,
        })
        .await?;

    if uow.relations().exists_like(edge).await? {
        return Err(ServiceError::Duplicate(format!(
            "account {actor_id} already liked {target_id}"
        )));
    }

    uow.relations().like(edge).await?;

    if uow.relations().exists_like(edge.reversed()).await? {
        Ok(MatchResult::Match)
    } else {
        Ok(MatchResult::Like)
    }
}

async fn dislike(
    uow: &mut dyn UnitOfWork,
    actor_id: i64,
    target_id: i64,
) -> Result<MatchResult, ServiceError> {
    let edge = DislikeAccount {
        disliker_id: actor_id,
        disliked_id: target_id,
    };

    uow.relations()
        .delete_like(LikeAccount {
            liker_id: actor_id,
            liked_id: target_id,
        })
        .await?;

    if uow.relations().exists_dislike(edge).await? {
        return Err(ServiceError::Duplicate(format!(
            "account {actor_id} already disliked {target_id}"
        )));
    }

    uow.relations().dislike(edge).await?;
    Ok(MatchResult::Dislike)
}

/// Attach tags and categories to a candidate. Lookup failures leave the list empty.
async fn with_links(repos: &mut dyn Repositories, account: Account) -> AccountDetails {
    let tags = match repos.tags().get_by_account_id(account.id).await {
        Ok(tags) => tags,
        Err(e) => {
            tracing::error!("Failed to load tags of account {}: {}", account.id, e);
            Vec::new()
        }
    };

    let categories = match repos.categories().get_by_account_id(account.id).await {
        Ok(categories) => categories,
        Err(e) => {
            tracing::error!("Failed to load categories of account {}: {}", account.id, e);
            Vec::new()
        }
    };

    AccountDetails {
        account,
        tags,
        categories,
    }
}
