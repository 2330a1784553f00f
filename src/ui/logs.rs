use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::config::model::ServiceId;
use crate::supervisor::events::{EventSink, StopReason};

/// Color palette for service names.
const SERVICE_COLORS: &[fn(&str) -> String] = &[
    |s| format!("{}", s.cyan()),
    |s| format!("{}", s.yellow()),
    |s| format!("{}", s.green()),
    |s| format!("{}", s.magenta()),
    |s| format!("{}", s.blue()),
    |s| format!("{}", s.red()),
];

// ---------------------------------------------------------------------------
// ConsoleSink — terminal EventSink
// ---------------------------------------------------------------------------

/// Prints lifecycle and log events to stdout, one line per event, with
/// colored service names when attached to a terminal.
pub struct ConsoleSink {
    use_color: bool,
    colors: Mutex<ColorAssignment>,
}

#[derive(Default)]
struct ColorAssignment {
    by_service: BTreeMap<String, usize>,
    next: usize,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            use_color: std::io::stdout().is_terminal(),
            colors: Mutex::new(ColorAssignment::default()),
        }
    }

    fn service_label(&self, id: &ServiceId) -> String {
        let label = id.to_string();
        if !self.use_color {
            return label;
        }
        let mut colors = self.colors.lock().unwrap();
        let idx = match colors.by_service.get(&label) {
            Some(&idx) => idx,
            None => {
                let idx = colors.next;
                colors.next = (colors.next + 1) % SERVICE_COLORS.len();
                colors.by_service.insert(label.clone(), idx);
                idx
            }
        };
        SERVICE_COLORS[idx](&label)
    }

    fn dimmed(&self, text: &str) -> String {
        if self.use_color {
            format!("{}", text.dimmed())
        } else {
            text.to_string()
        }
    }
}

impl EventSink for ConsoleSink {
    fn on_registered(&self, id: &ServiceId) {
        println!("{} {}", self.service_label(id), self.dimmed("registered"));
    }

    fn on_cleared(&self) {
        println!("{}", self.dimmed("services cleared"));
    }

    fn on_log(&self, id: &ServiceId, timestamp: DateTime<Utc>, text: &str) {
        println!(
            "{} {} {} {}",
            self.dimmed(&timestamp.format("%H:%M:%S").to_string()),
            self.service_label(id),
            self.dimmed("|"),
            text
        );
    }

    fn on_stopped(&self, id: &ServiceId, reason: StopReason) {
        println!(
            "{} {}",
            self.service_label(id),
            self.dimmed(&format!("stopped ({})", reason))
        );
    }
}
