use tracing::info;

/// Presentation layer hook told about the profile's dark-mode flag.
///
/// The store calls it after every profile write; applying the flag is up to
/// the implementor.
pub trait ThemeSync: Send + Sync {
    fn apply_dark_mode(&self, enabled: bool);
}

/// Theme hook for headless front ends: records the switch in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTheme;

impl ThemeSync for LogTheme {
    fn apply_dark_mode(&self, enabled: bool) {
        info!(target: "taskforge", event = "theme_applied", dark_mode = enabled);
    }
}
