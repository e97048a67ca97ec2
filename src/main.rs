#![windows_subsystem = "windows"]

#[cfg(not(windows))]
fn main() {
	eprintln!("livewall only runs on Windows");
}

#[cfg(windows)]
fn main() {
	runner::run();
}

#[cfg(windows)]
mod runner {
	use std::{
		fs,
		path::Path,
		sync::mpsc::Receiver,
		thread,
		time::{Duration, Instant, SystemTime},
	};

	use livewall::{
		bootstrap::bootstrap,
		data_loaders::{config::LiveWallConfig, yaml},
		error,
		events::{self, EngineEvent},
		info, logging, paths,
		platform::win32::{enable_per_monitor_dpi_awareness, pump_pending, Pump, WinPlatform},
		warn, WallpaperSession, DEBUG_NAME,
	};

	type Session = WallpaperSession<WinPlatform>;

	fn modified(path: &Path) -> Option<SystemTime> {
		fs::metadata(path).and_then(|m| m.modified()).ok()
	}

	fn apply_config(session: &mut Session, config: &LiveWallConfig) {
		session.update_settings(config.engine_settings());

		match config.media_source() {
			Some(source) => {
				info!("[{}] Starting {}", DEBUG_NAME, source);
				if let Err(e) = session.start(&source, config.playback) {
					error!("[{}] Failed to start '{}': {}", DEBUG_NAME, source, e);
				}
			}
			None => {
				warn!("[{}] No media.source configured; wallpaper left as is", DEBUG_NAME);
				if let Err(e) = session.stop() {
					error!("[{}] Stop failed: {}", DEBUG_NAME, e);
				}
			}
		}
	}

	fn drain_events(session: &mut Session, queue: Option<&Receiver<EngineEvent>>) {
		let Some(queue) = queue else {
			return;
		};
		while let Ok(event) = queue.try_recv() {
			session.handle_event(event);
		}
	}

	pub fn run() {
		logging::init(false, "warn");
		std::panic::set_hook(Box::new(|panic_info| {
			error!("[{}] Panic: {}", DEBUG_NAME, panic_info);
		}));

		let config_path = paths::config_path();
		bootstrap(&config_path);
		enable_per_monitor_dpi_awareness();

		let mut config = LiveWallConfig::load(&config_path).unwrap_or_default();
		logging::set_debug(config.debug);
		logging::set_level(&config.log_level);

		info!("!---------- [{}] Starting live wallpaper ----------!", DEBUG_NAME);
		info!("[{}] Config loaded from {}", DEBUG_NAME, config_path.display());

		let queue = events::install_queue();
		let platform = match WinPlatform::new() {
			Ok(platform) => platform,
			Err(e) => {
				error!("[{}] Platform init failed: {}", DEBUG_NAME, e);
				return;
			}
		};

		let mut session = WallpaperSession::new(platform, config.engine_settings());
		apply_config(&mut session, &config);

		let mut loop_sleep = Duration::from_millis(config.runtime.tick_sleep_ms);
		let mut surface_check_interval =
			Duration::from_millis(config.runtime.surface_check_interval_ms);
		let mut last_surface_check = Instant::now();
		let mut last_watch_tick = Instant::now();
		let mut last_config_modified = modified(&config_path);

		loop {
			if let Pump::Quit(code) = pump_pending() {
				warn!("[{}] WM_QUIT ({}) received, restoring wallpaper", DEBUG_NAME, code);
				if let Err(e) = session.stop() {
					error!("[{}] Shutdown stop failed: {}", DEBUG_NAME, e);
				}
				return;
			}

			drain_events(&mut session, queue.as_ref());

			if last_surface_check.elapsed() >= surface_check_interval {
				last_surface_check = Instant::now();
				if session.surface_lost() {
					warn!("[{}][SURFACE] Surface window lost, rebuilding", DEBUG_NAME);
					if let Err(e) = session.restart() {
						error!("[{}][SURFACE] Rebuild failed: {}", DEBUG_NAME, e);
					}
				}
			}

			let watch_interval = Duration::from_millis(config.watcher.interval_ms);
			if config.watcher.enabled && last_watch_tick.elapsed() >= watch_interval {
				last_watch_tick = Instant::now();

				let current_modified = modified(&config_path);
				let changed = match (last_config_modified, current_modified) {
					(Some(prev), Some(curr)) => curr > prev,
					(None, Some(_)) => true,
					_ => false,
				};

				if changed {
					yaml::invalidate(&config_path);
					match LiveWallConfig::load(&config_path) {
						Some(new_config) => {
							logging::set_debug(new_config.debug);
							logging::set_level(&new_config.log_level);
							if config.requires_restart(&new_config) {
								apply_config(&mut session, &new_config);
							} else {
								session.update_settings(new_config.engine_settings());
							}
							config = new_config;

							loop_sleep = Duration::from_millis(config.runtime.tick_sleep_ms);
							surface_check_interval =
								Duration::from_millis(config.runtime.surface_check_interval_ms);
							info!(
								"[{}][WATCHER] Reloaded config from {}",
								DEBUG_NAME,
								config_path.display()
							);
						}
						None => warn!(
							"[{}][WATCHER] Detected config change but failed to parse {}; keeping previous config",
							DEBUG_NAME,
							config_path.display()
						),
					}
					last_config_modified = current_modified;
				}
			}

			thread::sleep(loop_sleep);
		}
	}
}
