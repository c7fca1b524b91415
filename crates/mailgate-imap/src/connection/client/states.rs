//! Type-state markers for IMAP client connection states.

use crate::types::{Mailbox, MailboxStatus};

/// Marker type for the not-authenticated state.
///
/// In this state, only LOGIN is valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state, mailbox operations (SELECT, LIST, CREATE, etc.) are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Authenticated {}
    impl Sealed for super::Selected {}
}

/// States in which mailbox-level commands (LIST, CREATE, DELETE, quota) are valid.
pub trait MailboxAccess: sealed::Sealed {}

impl MailboxAccess for Authenticated {}
impl MailboxAccess for Selected {}

/// State for a selected mailbox.
///
/// Carries the mailbox name and the status snapshot taken at SELECT time.
#[derive(Debug, Clone)]
pub struct Selected {
    pub(crate) mailbox: Mailbox,
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Returns the selected mailbox.
    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Returns the mailbox status snapshot from SELECT.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }
}
