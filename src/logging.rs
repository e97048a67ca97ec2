use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        mpsc::{self, Sender},
        OnceLock,
    },
    thread,
};

use crate::paths;

/* =========================
   GLOBAL STATE
   ========================= */

static ENABLED: AtomicBool = AtomicBool::new(false);
static LEVEL: AtomicU8 = AtomicU8::new(LEVEL_INFO);
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_TX: OnceLock<Sender<String>> = OnceLock::new();

const LEVEL_ERROR: u8 = 0;
const LEVEL_WARN: u8 = 1;
const LEVEL_INFO: u8 = 2;
const LEVEL_DEBUG: u8 = 3;

/* =========================
   PUBLIC API
   ========================= */

/// Starts the writer thread. Later calls only update the filter.
pub fn init(debug: bool, level: &str) {
    set_debug(debug);
    set_level(level);

    if LOG_TX.get().is_some() {
        return;
    }

    let path = log_path().clone();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("livewall: cannot open log file {}: {e}", path.display());
            return;
        }
    };

    let (tx, rx) = mpsc::channel::<String>();
    if LOG_TX.set(tx).is_err() {
        return;
    }

    thread::spawn(move || {
        let mut file = file;
        while let Ok(line) = rx.recv() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    });
}

pub fn set_debug(debug: bool) {
    ENABLED.store(debug, Ordering::Relaxed);
}

pub fn set_level(level: &str) {
    let rank = match level.trim().to_lowercase().as_str() {
        "error" => LEVEL_ERROR,
        "warn" | "warning" => LEVEL_WARN,
        "debug" | "trace" => LEVEL_DEBUG,
        _ => LEVEL_INFO,
    };
    LEVEL.store(rank, Ordering::Relaxed);
}

/// WARN and ERROR are always written; INFO needs debug mode and a level
/// of at least `info`.
#[inline]
pub fn should_log(level: &str) -> bool {
    let rank = match level {
        "ERROR" => LEVEL_ERROR,
        "WARN" => LEVEL_WARN,
        "INFO" => LEVEL_INFO,
        _ => LEVEL_DEBUG,
    };
    if rank <= LEVEL_WARN {
        return true;
    }
    ENABLED.load(Ordering::Relaxed) && rank <= LEVEL.load(Ordering::Relaxed)
}

/* =========================
   INTERNAL
   ========================= */

#[inline]
pub fn enqueue(level: &str, msg: String) {
    if let Some(tx) = LOG_TX.get() {
        let ts = timestamp();
        let _ = tx.send(format!("{ts} [{level}] {msg}"));
    }
}

fn timestamp() -> String {
    let now = chrono::Local::now();
    now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/* =========================
   MACROS
   ========================= */

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if $crate::logging::should_log("INFO") {
            $crate::logging::enqueue(
                "INFO",
                format!($($arg)*)
            );
        }
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        $crate::logging::enqueue(
            "WARN",
            format!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        $crate::logging::enqueue(
            "ERROR",
            format!($($arg)*)
        );
    }};
}

/* =========================
   PATH
   ========================= */

fn log_path() -> &'static PathBuf {
    LOG_PATH.get_or_init(paths::log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_always_pass_the_filter() {
        assert!(should_log("WARN"));
        assert!(should_log("ERROR"));
    }

    #[test]
    fn info_requires_debug_and_level() {
        set_debug(false);
        set_level("info");
        assert!(!should_log("INFO"));

        set_debug(true);
        assert!(should_log("INFO"));

        set_level("warn");
        assert!(!should_log("INFO"));

        set_level("info");
        set_debug(false);
    }

    #[test]
    fn engine_messages_interpolate_the_debug_name() {
        let hard_coded = format!("\"[{}][", crate::DEBUG_NAME);
        for source in [
            include_str!("session.rs"),
            include_str!("surface.rs"),
            include_str!("playback.rs"),
            include_str!("restore.rs"),
            include_str!("shell_locator.rs"),
            include_str!("data_loaders/yaml.rs"),
            include_str!("data_loaders/config.rs"),
            include_str!("bootstrap.rs"),
        ] {
            assert!(!source.contains(&hard_coded));
        }
    }
}
