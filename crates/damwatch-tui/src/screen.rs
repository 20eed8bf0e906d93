//! Screen identifier enum.

use std::fmt;

/// Identifies each primary TUI screen, navigable by number keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Dashboard, // 1
    History, // 2
    /// Sign-in form — not in the tab bar, shown whenever no session exists.
    Login,
}

impl ScreenId {
    /// All screens in tab-bar order.
    pub const ALL: [ScreenId; 2] = [Self::Dashboard, Self::History];

    /// Numeric key for this screen. Login has no number key.
    pub fn number(self) -> u8 {
        match self {
            Self::Dashboard => 1,
            Self::History => 2,
            Self::Login => 0,
        }
    }

    /// Screen from a numeric key. Returns None for out-of-range.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Dashboard),
            2 => Some(Self::History),
            _ => None,
        }
    }

    /// Next screen in tab order (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous screen in tab order (wraps around).
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Short label for the tab bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::History => "History",
            Self::Login => "Sign In",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
