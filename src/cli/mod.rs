//! CLI command implementations.
//!
//! Each submodule implements one command of the `feedsift` binary. The
//! binary owns argument parsing and engine lifecycle; the functions here do
//! the work and print results.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan JSON batch files of rendered posts |
//! | `watch` | Read post records from stdin and scan on quiet windows |
//! | `stats` | Show tracked entries and storage size |
//! | `sweep` | Remove expired entries now |
//! | `clear` | Delete the seen-entry indices |
//! | `reset` | Delete everything, settings included |
//! | `settings` | Show or change filter settings |
//!
//! # Example Usage
//!
//! ```bash
//! # Scan two page loads, the second one sees the first one's entries
//! feedsift scan page1.json page2.json
//!
//! # Pipe a live feed
//! tail -f feed.ndjson | feedsift watch --json
//!
//! # Keep entries for a week
//! feedsift settings set deleteThreshold 3
//! ```

mod maintenance;
mod output;
mod scan;
mod settings;
mod watch;

pub use maintenance::{cmd_clear, cmd_reset, cmd_stats, cmd_sweep};
pub use output::DecisionPrinter;
pub use scan::{cmd_scan, read_batch};
pub use settings::{cmd_settings_set, cmd_settings_show};
pub use watch::{FeedBuffer, WatchSummary, cmd_watch};
