// Element runtime state.

use dms_api::messages::ElementStateChange;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Runtime state of an element.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum ElementState {
    #[default]
    Undefined,
    Active,
    Hidden,
    Paused,
    Stopped,
    Deleted,
    Error,
    Restart,
    Masked,
}

impl ElementState {
    /// Map the raw state code carried in element records.
    ///
    /// Known codes: 1=active, 2=hidden, 3=paused, 4=stopped, 6=deleted,
    /// 10=error, 11=restart, 12=masked. Anything else is `Undefined`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Active,
            2 => Self::Hidden,
            3 => Self::Paused,
            4 => Self::Stopped,
            6 => Self::Deleted,
            10 => Self::Error,
            11 => Self::Restart,
            12 => Self::Masked,
            _ => Self::Undefined,
        }
    }

    /// Raw code for this state.
    pub fn code(self) -> i32 {
        match self {
            Self::Undefined => 0,
            Self::Active => 1,
            Self::Hidden => 2,
            Self::Paused => 3,
            Self::Stopped => 4,
            Self::Deleted => 6,
            Self::Error => 10,
            Self::Restart => 11,
            Self::Masked => 12,
        }
    }

    /// State an element settles in after a successful state change.
    pub(crate) fn after(change: ElementStateChange) -> Self {
        match change {
            ElementStateChange::Start
            | ElementStateChange::Restart
            | ElementStateChange::Unhide
            | ElementStateChange::Unmask => Self::Active,
            ElementStateChange::Stop => Self::Stopped,
            ElementStateChange::Pause => Self::Paused,
            ElementStateChange::Delete => Self::Deleted,
            ElementStateChange::Hide => Self::Hidden,
            ElementStateChange::Mask => Self::Masked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for state in [
            ElementState::Active,
            ElementState::Hidden,
            ElementState::Paused,
            ElementState::Stopped,
            ElementState::Deleted,
            ElementState::Error,
            ElementState::Restart,
            ElementState::Masked,
        ] {
            assert_eq!(ElementState::from_code(state.code()), state);
        }
    }

    #[test]
    fn unknown_code_is_undefined() {
        assert_eq!(ElementState::from_code(99), ElementState::Undefined);
        assert_eq!(ElementState::from_code(5), ElementState::Undefined);
    }

    #[test]
    fn state_after_change() {
        assert_eq!(ElementState::after(ElementStateChange::Delete), ElementState::Deleted);
        assert_eq!(ElementState::after(ElementStateChange::Unmask), ElementState::Active);
    }
}
