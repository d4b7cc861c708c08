use mediaframe::cli::Args;
use mediaframe::config::{self, PlayerSettings};
use mediaframe::core::event_bus::{BoxedEvent, downcast_event};
use mediaframe::core::player_events::*;
use mediaframe::core::{AdEvent, PlayerController, RendererEvent};
use mediaframe::sim::{SimAdProvider, SimRenderer};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Human-readable line for one bus notification.
fn describe(event: &BoxedEvent) -> String {
    if let Some(e) = downcast_event::<PlaybackStateChanged>(event) {
        return format!("state {:?} -> {:?}", e.from, e.to);
    }
    if let Some(e) = downcast_event::<CurrentTimeChanged>(event) {
        return format!("time {:.1}s", e.0);
    }
    if let Some(e) = downcast_event::<TotalTimeChanged>(event) {
        return match e.0 {
            Some(t) => format!("duration {:.1}s", t),
            None => "duration unknown".to_string(),
        };
    }
    if let Some(e) = downcast_event::<BufferedTimeChanged>(event) {
        return format!("buffered {:.1}s", e.0);
    }
    if let Some(e) = downcast_event::<WillFinish>(event) {
        return format!("will finish ({:?})", e.0);
    }
    if let Some(e) = downcast_event::<DidFinish>(event) {
        return format!("did finish ({:?})", e.0);
    }
    if let Some(e) = downcast_event::<PlaybackFailed>(event) {
        return format!("playback failed: {}", e.0);
    }
    if let Some(e) = downcast_event::<AdError>(event) {
        return format!("ad error: {}", e.0);
    }
    if let Some(e) = downcast_event::<AdBreakEnded>(event) {
        return format!("ad break {}", if e.skipped { "skipped" } else { "ended" });
    }
    if let Some(e) = downcast_event::<ActionButtonPressed>(event) {
        return format!("action button '{}'", e.0);
    }
    // Unit notifications: the type name says it all
    let name = (**event).type_name();
    name.rsplit("::").next().unwrap_or(name).to_string()
}

fn flush(player: &mut PlayerController) {
    player.pump();
    for event in player.events().poll() {
        println!("  {}", describe(&event));
    }
}

fn run_ads(player: &mut PlayerController, ads: &SimAdProvider, fail: bool) {
    if fail {
        ads.emit(AdEvent::AdRequestFailed("simulated ad server error".into()));
        flush(player);
        return;
    }
    ads.emit(AdEvent::AdsLoaded { preroll: true });
    ads.emit(AdEvent::AdBreakStarted);
    flush(player);
    for s in 1..=5 {
        ads.emit(AdEvent::AdProgress {
            current: s as f64,
            duration: 5.0,
        });
    }
    ads.emit(AdEvent::AdBreakEnded);
    flush(player);
}

fn run_content(player: &mut PlayerController, renderer: &SimRenderer, args: &Args) {
    let duration = args.duration.max(1);
    let start = Instant::now();

    renderer.emit(RendererEvent::Ready {
        total: duration as f64,
    });
    flush(player);

    if args.no_autoplay {
        info!("Autoplay disabled, starting playback explicitly");
        player.play();
        flush(player);
    }

    player.add_action_button("share", "share.png");
    player.press_action_button("share");

    for s in 1..=duration {
        renderer.emit(RendererEvent::TimeUpdated(s as f64));
        renderer.emit(RendererEvent::BufferedUpdated((s + 5).min(duration) as f64));
        if args.fail_stream && s == duration / 2 {
            renderer.emit(RendererEvent::Failed("simulated decode error".into()));
            flush(player);
            // Intents after a fatal error only re-report it
            player.play();
            flush(player);
            return;
        }
        if s == duration / 2 {
            player.start_scrubbing();
            player.seek(duration as f64 * 0.75);
            player.end_scrubbing();
            renderer.emit(RendererEvent::SeekCompleted);
        }
        flush(player);
        // Simulated wall clock drives auto-hide and the fade animation
        player.tick_at(start + Duration::from_secs(s as u64));
    }

    renderer.emit(RendererEvent::Ended);
    flush(player);
    player.minimize();
    flush(player);
}

fn main() -> Result<()> {
    // Parse command-line arguments first (needed for log setup)
    let args = Args::parse();

    // Create path configuration from CLI args and environment
    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());

    // Ensure directories exist
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {}", e);
    }

    // Determine log level based on verbosity flags
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Initialize logger based on --log flag
    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .as_ref()
            .cloned()
            .unwrap_or_else(|| config::data_file("mediaframe.log", &path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging with specified verbosity level (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }

    info!("mediaframe demo starting...");
    debug!("Command-line args: {:?}", args);

    let mut settings = PlayerSettings::load(&path_config).unwrap_or_else(|e| {
        warn!("Using default settings: {:#}", e);
        PlayerSettings::default()
    });
    if args.no_autoplay {
        settings.autoplay = false;
    }
    if args.save_config {
        settings.save(&path_config)?;
        info!(
            "Settings saved to {}",
            config::config_file(config::SETTINGS_FILE, &path_config).display()
        );
    }

    let renderer = SimRenderer::new();
    let ads = SimAdProvider::new();
    let mut player = PlayerController::new(Box::new(renderer.clone()), settings);
    player.register_ad_provider(Box::new(ads.clone()));
    player.set_title(Some(args.url.clone()));

    println!("Loading {}", args.url);
    player
        .load_stream(&args.url, args.ad_tag.as_deref())
        .context("Failed to start session")?;
    flush(&mut player);

    if args.ad_tag.is_some() {
        run_ads(&mut player, &ads, args.fail_ads);
    }
    run_content(&mut player, &renderer, &args);

    println!(
        "Session over: state {:?}, time {:?}/{:?}, finished: {}",
        player.playback_state(),
        player.current_time(),
        player.total_time(),
        player.is_video_finished()
    );
    debug!("Renderer calls: {:?}", renderer.calls());
    debug!("Ad provider calls: {:?}", ads.calls());
    Ok(())
}
