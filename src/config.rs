//! # Configuration
//!
//! Runtime tunables for the editor. There is no on-disk configuration; the
//! defaults below are the single source of truth.

use std::time::Duration;

/// The global tte configuration.
pub struct Config {
    /// The size of a tab. Must be > 0.
    pub(crate) tab_stop: usize,
    /// The number of warnings shown before quitting, when changes have been
    /// made since the file was last saved.
    pub(crate) quit_times: usize,
    /// The duration for which status messages are shown.
    pub(crate) message_dur: Duration,
    /// Width of the line-number gutter, including the trailing space.
    pub(crate) gutter_width: usize,
    /// RGB background color of the gutter.
    pub(crate) gutter_bg: (u8, u8, u8),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_stop: 4,
            quit_times: 3,
            message_dur: Duration::from_secs(5),
            gutter_width: 5,
            gutter_bg: (31, 31, 40),
        }
    }
}
