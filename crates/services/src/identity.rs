//! Current-user feed handed over by the authentication collaborator.
//!
//! `None` means signed out: lesson pages keep working on the session cache
//! alone and skip every remote call.

use fsl_core::model::UserId;
use tokio::sync::watch;

/// Publishing half, owned by whatever resolves authentication.
#[derive(Debug)]
pub struct IdentityPublisher {
    tx: watch::Sender<Option<UserId>>,
}

/// Subscribing half, cloned into each page.
#[derive(Debug, Clone)]
pub struct IdentityFeed {
    rx: watch::Receiver<Option<UserId>>,
}

/// Create a feed starting at `initial`.
#[must_use]
pub fn identity_channel(initial: Option<UserId>) -> (IdentityPublisher, IdentityFeed) {
    let (tx, rx) = watch::channel(initial);
    (IdentityPublisher { tx }, IdentityFeed { rx })
}

impl IdentityPublisher {
    /// Announce a sign-in (`Some`) or sign-out (`None`). Publishing the same
    /// value again does not wake subscribers.
    pub fn publish(&self, user: Option<UserId>) {
        self.tx.send_if_modified(|current| {
            if *current == user {
                return false;
            }
            *current = user;
            true
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> IdentityFeed {
        IdentityFeed {
            rx: self.tx.subscribe(),
        }
    }
}

impl IdentityFeed {
    #[must_use]
    pub fn current(&self) -> Option<UserId> {
        self.rx.borrow().clone()
    }

    /// Wait for the next identity change. `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Option<UserId>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Resolve as soon as someone is signed in (immediately if already so).
    /// `None` if the publisher goes away first.
    pub async fn wait_for_user(&mut self) -> Option<UserId> {
        let user = self.rx.wait_for(Option::is_some).await.ok()?;
        user.clone()
    }
}
