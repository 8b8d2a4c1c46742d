//! Filter selection keys.
//!
//! Digit keys pick the full-screen post-process: 1..9 select Copy through
//! Ripple in catalog order and 0 selects Shockwave. Pressing a key also
//! restarts the chosen effect's animation.

use crate::post_processing::PostProcessKind;

/// A digit key press, 0..=9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FilterKey(u8);

impl FilterKey {
    pub fn new(digit: u8) -> Option<Self> {
        (digit <= 9).then_some(Self(digit))
    }

    pub fn digit(self) -> u8 {
        self.0
    }

    /// The post-process this key selects.
    pub fn kind(self) -> PostProcessKind {
        match self.0 {
            0 => PostProcessKind::Shockwave,
            // 1..=9 are checked by construction
            d => PostProcessKind::from_index(d as usize - 1).unwrap_or_default(),
        }
    }

    /// Key that selects `kind`.
    pub fn for_kind(kind: PostProcessKind) -> Self {
        match kind {
            PostProcessKind::Shockwave => Self(0),
            other => Self(other.index() as u8 + 1),
        }
    }
}
