//! Progress display constants

/// Width of the progress bar display
pub const PROGRESS_BAR_WIDTH: usize = 30;

/// Item labels longer than this are shortened from the left
pub const ITEM_LABEL_WIDTH: usize = 40;

/// ANSI sequence clearing the current terminal line
pub const CLEAR_LINE: &str = "\r\x1B[K";

// vim: ts=4
