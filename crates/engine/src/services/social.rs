//! Friend requests, friendships, and blocks.

use tracing::info;

use kudos_core::{FriendRequestStatus, UserId};

use crate::db::{RepositoryError, SocialRepository};
use crate::engine::EngineInner;
use crate::error::{EngineError, Result};
use crate::models::{FriendRequest, Friendship};
use crate::services::UserService;

/// How a sent friend request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request is now pending on the recipient.
    Sent,
    /// The recipient had a pending request the other way; both were
    /// resolved into a friendship immediately.
    MutualAccepted,
}

/// Social graph service.
pub struct SocialService<'a> {
    inner: &'a EngineInner,
}

impl<'a> SocialService<'a> {
    pub(crate) const fn new(inner: &'a EngineInner) -> Self {
        Self { inner }
    }

    fn repo(&self) -> SocialRepository<'_> {
        SocialRepository::new(&self.inner.pool)
    }

    /// Send a friend request from one user to another.
    ///
    /// A pending request in the opposite direction is treated as mutual
    /// interest and accepted on the spot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SelfReference`], [`EngineError::Blocked`],
    /// [`EngineError::AlreadyFriends`], [`EngineError::RequestPending`],
    /// or [`EngineError::UserNotFound`].
    pub async fn send_request(&self, from: &UserId, to: &UserId) -> Result<RequestOutcome> {
        if from == to {
            return Err(EngineError::SelfReference { user: from.clone() });
        }
        self.require_users(from, to).await?;

        let repo = self.repo();
        if repo.either_blocked(from, to).await? {
            return Err(EngineError::Blocked {
                a: from.clone(),
                b: to.clone(),
            });
        }
        if repo.are_friends(from, to).await? {
            return Err(EngineError::AlreadyFriends {
                a: from.clone(),
                b: to.clone(),
            });
        }

        // Mutual interest: the other side already asked.
        if repo.request_status(to, from).await? == Some(FriendRequestStatus::Pending) {
            repo.accept_request(to, from).await?;
            info!(%from, %to, "mutual friend request accepted");
            return Ok(RequestOutcome::MutualAccepted);
        }

        match repo.request_status(from, to).await? {
            Some(FriendRequestStatus::Pending) => {
                return Err(EngineError::RequestPending {
                    a: from.clone(),
                    b: to.clone(),
                });
            }
            // A settled row from an earlier rejection or removed
            // friendship is reopened rather than re-inserted.
            Some(_) => repo.reopen_request(from, to).await?,
            None => {
                repo.create_request(from, to).await.map_err(|e| match e {
                    RepositoryError::Conflict(_) => EngineError::RequestPending {
                        a: from.clone(),
                        b: to.clone(),
                    },
                    other => other.into(),
                })?;
            }
        }

        info!(%from, %to, "friend request sent");
        Ok(RequestOutcome::Sent)
    }

    /// Accept a pending request addressed to `to`.
    ///
    /// Materializes both directions of the friendship edge atomically.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoPendingRequest`] if nothing is pending
    /// for the pair.
    pub async fn accept_request(&self, from: &UserId, to: &UserId) -> Result<()> {
        match self.repo().accept_request(from, to).await {
            Ok(()) => {
                info!(%from, %to, "friend request accepted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(EngineError::NoPendingRequest {
                from: from.clone(),
                to: to.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Reject a pending request addressed to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoPendingRequest`] if nothing is pending
    /// for the pair.
    pub async fn reject_request(&self, from: &UserId, to: &UserId) -> Result<()> {
        match self.repo().reject_request(from, to).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(EngineError::NoPendingRequest {
                from: from.clone(),
                to: to.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Pending requests addressed to a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn pending_requests(&self, user: &UserId) -> Result<Vec<FriendRequest>> {
        Ok(self.repo().pending_requests_to(user).await?)
    }

    /// A user's friendship edges, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn friends(&self, user: &UserId) -> Result<Vec<Friendship>> {
        Ok(self.repo().friends(user).await?)
    }

    /// Users this user has blocked, oldest block first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn blocked_users(&self, user: &UserId) -> Result<Vec<UserId>> {
        Ok(self.repo().blocked(user).await?)
    }

    /// Whether a friendship edge exists between the pair.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool> {
        Ok(self.repo().are_friends(a, b).await?)
    }

    /// Remove a friendship from either side; both edges go together.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFriends`] if no edge exists.
    pub async fn remove_friend(&self, user: &UserId, friend: &UserId) -> Result<()> {
        match self.repo().remove_friend(user, friend).await {
            Ok(()) => {
                info!(%user, %friend, "friendship removed");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(EngineError::NotFriends {
                a: user.clone(),
                b: friend.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Block a user, severing any friendship and pending requests.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SelfReference`] if the target is the actor.
    pub async fn block(&self, user: &UserId, target: &UserId) -> Result<()> {
        if user == target {
            return Err(EngineError::SelfReference { user: user.clone() });
        }
        self.repo().block(user, target).await?;
        info!(%user, %target, "user blocked");
        Ok(())
    }

    /// Lift a block.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotBlocked`] if no block exists.
    pub async fn unblock(&self, user: &UserId, target: &UserId) -> Result<()> {
        match self.repo().unblock(user, target).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(EngineError::NotBlocked {
                user: user.clone(),
                target: target.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn require_users(&self, a: &UserId, b: &UserId) -> Result<()> {
        let users = UserService::new(self.inner);
        users.get(a.as_str()).await?;
        users.get(b.as_str()).await?;
        Ok(())
    }
}
