use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `RECORDSTORE_QUIET=1` silences status lines; data output is unaffected.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("RECORDSTORE_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

pub fn success(label: &str) {
    if !is_quiet() {
        println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
    }
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    if !is_quiet() {
        println!("{} {}: {}", Icons::INFO, label.style(theme().dim.clone()), value);
    }
}

pub fn section(title: &str) {
    if !is_quiet() {
        println!();
        println!("━{}━", title.style(theme().header.clone()));
    }
}
