//! # Forum Rules
//!
//! Named thresholds and ranking constants. `ForumRules::default()` is the
//! production rule set; `configs` may override individual values.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Authors may edit or delete a post for this long after creating it.
pub const EDIT_WINDOW_MINUTES: i64 = 120;
/// Karma needed to change the top-bar color.
pub const TOP_BAR_KARMA: u64 = 2;
/// Karma needed to flag a post.
pub const FLAG_KARMA: u64 = 5;
/// Karma needed to downvote a comment.
pub const COMMENT_DOWNVOTE_KARMA: u64 = 6;
/// Karma granted on registration.
pub const SIGNUP_KARMA: u64 = 1;
/// Exponent applied to post age (hours) in the ranking denominator.
pub const DECAY_EXPONENT: f64 = 1.8;
/// Score subtracted per flag.
pub const FLAG_PENALTY: f64 = 5.0;
/// Default look-back window of the ranked feed.
pub const FEED_WINDOW_DAYS: i64 = 4;
pub const DEFAULT_PAGE_SIZE: usize = 30;
/// Upper bound accepted for either time window.
pub const MAX_WINDOW_DAYS: i64 = 36_500;
pub const DEFAULT_TOP_BAR_COLOR: &str = "#ff6600";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumRules {
    pub edit_window_minutes: i64,
    pub top_bar_karma: u64,
    pub flag_karma: u64,
    pub comment_downvote_karma: u64,
    pub signup_karma: u64,
    pub decay_exponent: f64,
    pub flag_penalty: f64,
    pub feed_window_days: i64,
    pub default_page_size: usize,
    pub default_top_bar_color: String,
}

impl Default for ForumRules {
    fn default() -> Self {
        Self {
            edit_window_minutes: EDIT_WINDOW_MINUTES,
            top_bar_karma: TOP_BAR_KARMA,
            flag_karma: FLAG_KARMA,
            comment_downvote_karma: COMMENT_DOWNVOTE_KARMA,
            signup_karma: SIGNUP_KARMA,
            decay_exponent: DECAY_EXPONENT,
            flag_penalty: FLAG_PENALTY,
            feed_window_days: FEED_WINDOW_DAYS,
            default_page_size: DEFAULT_PAGE_SIZE,
            default_top_bar_color: DEFAULT_TOP_BAR_COLOR.to_string(),
        }
    }
}

impl ForumRules {
    /// `None` when the configured minutes do not fit a `Duration`.
    pub fn edit_window(&self) -> Option<Duration> {
        Duration::try_minutes(self.edit_window_minutes)
    }

    pub fn feed_window(&self) -> Option<Duration> {
        Duration::try_days(self.feed_window_days)
    }

    /// Whether both windows are non-negative and at most [`MAX_WINDOW_DAYS`].
    pub fn windows_in_range(&self) -> bool {
        let max = Duration::days(MAX_WINDOW_DAYS);
        [self.edit_window(), self.feed_window()]
            .into_iter()
            .all(|w| w.is_some_and(|w| w >= Duration::zero() && w <= max))
    }
}
