//! Local component manager configuration

/// Capacity of every mailbox unless configured otherwise
pub const DEFAULT_MAILBOX_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalManagerConfig {
    /// Capacity of the mailboxes of components created by the manager
    pub mailbox_size: usize,
}

impl Default for LocalManagerConfig {
    fn default() -> Self {
        Self {
            mailbox_size: DEFAULT_MAILBOX_SIZE,
        }
    }
}
