#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, trace, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;
use x11rb::connection::Connection;
use x11rb::protocol::Event;

use searchlights::config;
use searchlights::constants::{self, animation};
use searchlights::engine::Searchlights;
use searchlights::interact::{PointerEvent, PointerKind};
use searchlights::presenter::Presenter;
use searchlights::stage::Stage;
use searchlights::x11_utils::{
    create_argb_visual, probe_caps, sample_pointer, CachedAtoms, DisplayContext, PointerSample,
};

/// Pointer-following glow discs for the desktop
#[derive(Debug, Parser)]
#[command(name = "searchlights", version, about)]
struct Cli {
    /// Options file to load instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stage node name created lights are inserted under
    #[arg(long)]
    parent: Option<String>,

    /// Class selector lights are found and created with
    #[arg(long)]
    target_class: Option<String>,

    /// Keep lights visible when the pointer leaves the screen
    #[arg(long)]
    no_show_hide: bool,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,
}

fn pointer_event(kind: PointerKind, sample: PointerSample) -> PointerEvent {
    PointerEvent { kind, x: sample.x as f64, y: sample.y as f64 }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // CLI wins over the environment variable
    let log_level = match cli
        .log_level
        .clone()
        .or_else(|| std::env::var(constants::env::LOG_LEVEL).ok())
        .unwrap_or_else(|| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    {
        use signal_hook::consts::{SIGINT, SIGTERM};
        signal_hook::flag::register(SIGINT, shutdown.clone())?;
        signal_hook::flag::register(SIGTERM, shutdown.clone())?;
    }

    let mut opts = config::load(cli.config.as_deref());
    if let Some(parent) = cli.parent {
        opts.parent = Some(parent);
    }
    if let Some(target_class) = cli.target_class {
        opts.target_class = Some(target_class);
    }
    if cli.no_show_hide {
        opts.enable_show_hide = Some(false);
    }

    let (conn, screen_num) = x11rb::connect(None)?;
    let screen = &conn.setup().roots[screen_num];
    info!(
        "successfully connected to x11: screen={screen_num}, dimensions={}x{}",
        screen.width_in_pixels, screen.height_in_pixels
    );

    // Pre-cache atoms once at startup (eliminates roundtrip overhead)
    let atoms = CachedAtoms::new(&conn)?;
    let visual = create_argb_visual(&conn, screen)?;
    let caps = probe_caps(&conn)?;

    let mut stage = Stage::new();
    let mut engine = Searchlights::new();
    engine.init(&mut stage, caps, &opts);
    if !engine.is_active() {
        info!("nothing to display, exiting");
        return Ok(());
    }

    // Pointer chatter rides the callback slots, visible at trace level
    engine.on_enter(|event, _| trace!(x = event.x, y = event.y, "pointer entered"));
    engine.on_leave(|_, _| trace!("pointer left"));
    engine.on_move(|event, _| trace!(x = event.x, y = event.y, "lights repositioned"));

    let ctx = DisplayContext { conn: &conn, screen, atoms: &atoms, visual };
    let mut presenter = Presenter::new(ctx);
    presenter.sync(&stage, Instant::now())?;

    let frame = Duration::from_millis(animation::FRAME_MS);
    let mut last_sample: Option<PointerSample> = None;
    info!("entering main loop");

    while !shutdown.load(Ordering::Relaxed) {
        let now = Instant::now();

        while let Some(event) = conn.poll_for_event()? {
            if let Event::Expose(expose) = event {
                presenter.mark_damaged(expose.window);
            }
        }

        let sample = sample_pointer(&conn, screen.root)?;
        let was_on_screen = last_sample.map(|s| s.on_screen);
        match (was_on_screen, sample.on_screen) {
            (None | Some(false), true) => {
                engine.handle_pointer(&mut stage, &pointer_event(PointerKind::Enter, sample), now);
                engine.handle_pointer(&mut stage, &pointer_event(PointerKind::Move, sample), now);
            }
            (Some(true), false) => {
                engine.handle_pointer(&mut stage, &pointer_event(PointerKind::Leave, sample), now);
            }
            (Some(true), true) if last_sample != Some(sample) => {
                engine.handle_pointer(&mut stage, &pointer_event(PointerKind::Move, sample), now);
            }
            _ => {}
        }
        last_sample = Some(sample);

        engine.tick(&mut stage, now);
        presenter.sync(&stage, now)?;

        // Sleep one frame, or less when a show/hide timer lands sooner
        let mut nap = frame;
        if let Some(deadline) = engine.next_deadline() {
            let until = deadline.saturating_duration_since(Instant::now());
            if until < nap {
                nap = until.max(Duration::from_millis(1));
            }
        }
        std::thread::sleep(nap);
    }

    info!("shutting down");
    engine.destroy(&mut stage);
    presenter.sync(&stage, Instant::now())?;
    Ok(())
}
