//! Lifecycle command — the operation applied to a resolved domain.

use std::fmt;

/// One of the lifecycle operations the control surface exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleCommand {
    /// Ask the guest to power off gracefully.
    Shutdown,
    /// Hard reset, as if the reset button were pressed.
    Reset,
    /// Ask the guest to reboot.
    Reboot,
}

impl LifecycleCommand {
    /// Every command, in route order.
    pub const ALL: [Self; 3] = [Self::Shutdown, Self::Reset, Self::Reboot];

    /// Lowercase name used in routes and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Reset => "reset",
            Self::Reboot => "reboot",
        }
    }

    /// Confirmation reported once the management endpoint accepted the call.
    #[must_use]
    pub fn confirmation(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown complete",
            Self::Reset => "reset complete",
            Self::Reboot => "reboot complete",
        }
    }
}

impl fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
