//! Progress reporting for administrative actions.
//!
//! Every cluster-changing step emits exactly one line: a fixed-width
//! category label, an action verb and the affected target. The reporter is
//! an injected trait rather than a set of globals, so command logic can be
//! exercised in tests against the capturing implementation instead of
//! scraping stdout.
use std::fmt;

/// The kind of cluster object an action touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Template,
    Index,
    Documents,
    Alias,
    Settings,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Template => "TEMPLATE",
            Category::Index => "INDEX",
            Category::Documents => "DOCUMENTS",
            Category::Alias => "ALIAS",
            Category::Settings => "SETTINGS",
        };
        write!(f, "{}", label)
    }
}

/// What happened to the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Added,
    Created,
    Deleted,
    Reindexed,
    Removed,
    Updated,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Action::Added => "Added",
            Action::Created => "Created",
            Action::Deleted => "Deleted",
            Action::Reindexed => "Reindexed",
            Action::Removed => "Removed",
            Action::Updated => "Updated",
        };
        write!(f, "{}", verb)
    }
}

/// Sink for progress events.
pub trait Reporter {
    /// Records a single administrative action against a target.
    fn record(&self, category: Category, action: Action, detail: &str);

    /// Records an informational note not tied to a cluster change.
    fn note(&self, message: &str);
}

/// Writes one human-readable line per event to stdout.
pub struct Console;

impl Reporter for Console {
    fn record(&self, category: Category, action: Action, detail: &str) {
        println!("{}", format_line(category, action, detail));
    }

    fn note(&self, message: &str) {
        println!("{}", message);
    }
}

// Shared by the console and capturing reporters, so tests assert on the
// exact lines users see.
fn format_line(category: Category, action: Action, detail: &str) -> String {
    format!(
        "{:<16}{:<11}{}",
        category.to_string(),
        action.to_string(),
        detail
    )
}

#[cfg(test)]
pub mod capture {
    use std::sync::Mutex;

    use super::{format_line, Action, Category, Reporter};

    /// Buffers report lines in memory for assertions.
    #[derive(Default)]
    pub struct Capture {
        lines: Mutex<Vec<String>>,
    }

    impl Capture {
        /// A copy of every line recorded so far, in order.
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Reporter for Capture {
        fn record(&self, category: Category, action: Action, detail: &str) {
            let line = format_line(category, action, detail);
            self.lines.lock().unwrap().push(line);
        }

        fn note(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::Capture;
    use super::*;

    #[test]
    fn lines_align_on_fixed_width_columns() {
        let line = format_line(Category::Template, Action::Updated, "twitter");

        assert_eq!(line, "TEMPLATE        Updated    twitter");
    }

    #[test]
    fn longest_labels_still_fit_their_columns() {
        let line = format_line(Category::Documents, Action::Reindexed, "42 from a to b");

        assert_eq!(line, "DOCUMENTS       Reindexed  42 from a to b");
    }

    #[test]
    fn capture_records_events_and_notes_in_order() {
        let capture = Capture::default();

        capture.record(Category::Index, Action::Created, "twitter-2024");
        capture.note("alias twitter not found, provisioning from scratch");

        assert_eq!(
            capture.lines(),
            vec![
                "INDEX           Created    twitter-2024".to_owned(),
                "alias twitter not found, provisioning from scratch".to_owned(),
            ]
        );
    }
}
