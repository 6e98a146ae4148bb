//! Terminal output: notifications and the dashboard view.

use std::io::{self, Write};

use chrono::Timelike;
use profilesync_core::cache::CachedData;
use profilesync_core::utils::format::{format_field, truncate_string};
use profilesync_core::{NotificationLevel, Notifier, Profile, Route};

/// Widest value shown in the profile table
const MAX_VALUE_WIDTH: usize = 60;

/// Prints notifications to stderr so stdout stays clean for `--json`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        let marker = match level {
            NotificationLevel::Success => "✓",
            NotificationLevel::Info => "ℹ",
            NotificationLevel::Warning => "!",
            NotificationLevel::Error => "✗",
        };
        // Nothing sensible to do if stderr is gone
        let _ = writeln!(io::stderr(), "{} {}", marker, message);
    }
}

pub fn greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

pub fn greeting_now() -> &'static str {
    greeting(chrono::Local::now().hour())
}

/// One `key: value` line per field, keys padded to the longest
pub fn render_profile(profile: &Profile) -> Vec<String> {
    let width = profile.fields().keys().map(|k| k.len()).max().unwrap_or(0);
    profile
        .fields()
        .iter()
        .map(|(key, value)| {
            format!(
                "  {:<width$}  {}",
                key,
                truncate_string(&format_field(value), MAX_VALUE_WIDTH),
                width = width
            )
        })
        .collect()
}

pub fn print_dashboard(profile: &Profile, entry: Option<&CachedData<Profile>>) {
    println!("{}, {}!", greeting_now(), profile.display_name());
    println!();
    if profile.is_empty() {
        println!("  (no profile fields)");
    }
    for line in render_profile(profile) {
        println!("{}", line);
    }
    if let Some(entry) = entry {
        println!();
        println!("  updated {}", entry.age_display());
    }
}

/// What to tell the user when the client wants to move to `route`
pub fn navigation_hint(route: Route) -> Option<&'static str> {
    match route {
        Route::Login => Some("Run `profilesync login` to sign in."),
        Route::Register => Some("Run `profilesync register` to create an account."),
        Route::Root | Route::Profile => None,
    }
}
