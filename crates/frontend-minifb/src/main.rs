//! IC tester frontend.
//!
//! Runs the identification engine against an emulated ZIF socket and shows
//! the 16×2 LCD in a window.
//!
//! - **GUI mode** (default): scaled LCD window, keyboard/gamepad test button,
//!   chip swapping at runtime.
//! - **Headless mode** (`--headless`): scripted button presses, LCD text and
//!   per-model reports printed to stdout.
//! - **Trace dump** (`--dump-trace FILE`): print a saved GPIO trace and exit.

use clap::{Parser, ValueEnum};
use gilrs::{Button as GilrsButton, Event as GilrsEvent, EventType, Gilrs};
use ic_tester_core::chips::{Sn74ls260, Sn74s133, Sn74s138};
use ic_tester_core::lcd::{LCD_HEIGHT, LCD_ROWS, LCD_WIDTH};
use ic_tester_core::{
    ButtonLine, CharLcd, DispatchReport, Identification, PinRoleMap, RecordingBank, RunTrace,
    SocketDevice, StdDelay, Tester, TesterConfig, TraceError, ZifSocket,
};
use minifb::{Key, Scale, ScaleMode, Window, WindowOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const WINDOW_TITLE: &str = "IC Tester";

type Fixture = Tester<RecordingBank<ZifSocket>, CharLcd, ButtonLine, StdDelay>;

#[derive(Debug, Error)]
enum FrontendError {
    #[error("window: {0}")]
    Window(#[from] minifb::Error),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Chip placed in the emulated socket
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ChipArg {
    #[value(name = "s138")]
    S138,
    #[value(name = "ls260")]
    Ls260,
    #[value(name = "s133")]
    S133,
    #[value(name = "empty")]
    Empty,
}

impl ChipArg {
    /// GUI number keys 1–4
    const KEYS: [(Key, ChipArg); 4] = [
        (Key::Key1, ChipArg::S138),
        (Key::Key2, ChipArg::Ls260),
        (Key::Key3, ChipArg::S133),
        (Key::Key4, ChipArg::Empty),
    ];

    fn device(self) -> Option<Box<dyn SocketDevice>> {
        match self {
            ChipArg::S138 => Some(Box::new(Sn74s138)),
            ChipArg::Ls260 => Some(Box::new(Sn74ls260)),
            ChipArg::S133 => Some(Box::new(Sn74s133)),
            ChipArg::Empty => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ic-tester", version, about = "Logic IC tester (ATmega32 fixture emulator)")]
struct Args {
    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Chip in the socket at startup
    #[arg(long, value_enum, default_value = "s138")]
    chip: ChipArg,

    /// Button presses to simulate in headless mode
    #[arg(long, default_value_t = 1)]
    presses: u32,

    /// Settle time after each stimulus, in ms
    #[arg(long, default_value_t = ic_tester_core::SETTLE_MS)]
    settle_ms: u32,

    /// Button debounce interval, in ms
    #[arg(long, default_value_t = ic_tester_core::DEBOUNCE_MS)]
    debounce_ms: u32,

    /// Floating socket pins read low instead of high
    #[arg(long)]
    idle_low: bool,

    /// Save the GPIO trace of the last run to FILE
    #[arg(long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Print a saved GPIO trace and exit
    #[arg(long, value_name = "FILE")]
    dump_trace: Option<PathBuf>,

    /// Window scale 1-10
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=10))]
    scale: u8,

    /// Debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> TesterConfig {
        TesterConfig {
            settle_ms: self.settle_ms,
            debounce_ms: self.debounce_ms,
            idle_level_high: !self.idle_low,
            ..TesterConfig::default()
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), FrontendError> {
    if let Some(path) = &args.dump_trace {
        return dump_trace(path);
    }

    let config = args.config();
    let mut socket = ZifSocket::new(config.idle_level());
    if let Some(device) = args.chip.device() {
        socket.insert(device);
    }
    debug!(chip = ?args.chip, ?config, "fixture ready");
    let mut tester = Tester::new(
        RecordingBank::new(socket),
        CharLcd::new(),
        ButtonLine::new(),
        StdDelay,
        config,
    );

    if args.headless {
        run_headless(args, &mut tester)
    } else {
        run_gui(args, &mut tester)
    }
}

/// Poll once; on a finished run, save the trace if requested.
fn poll_and_record(
    tester: &mut Fixture,
    trace_path: Option<&Path>,
) -> Result<Option<Identification>, FrontendError> {
    let result = tester.poll();
    if result.is_some() {
        debug!(io = %tester.gpio().inner().ports().dump_io(), "port state after run");
        let ops = tester.gpio_mut().take_ops();
        if let (Some(path), Some(report)) = (trace_path, tester.last_report()) {
            let trace = RunTrace { config: *tester.config(), result: report.clone(), ops };
            trace.save_to_file(path)?;
            info!(path = %path.display(), ops = trace.ops.len(), "trace saved");
        }
    }
    Ok(result)
}

fn print_report(report: &DispatchReport) {
    for r in &report.reports {
        let name = r.model.display_name();
        match &r.mismatch {
            Some(m) => {
                let pins: Vec<String> = PinRoleMap::for_model(r.model)
                    .output_pins(m.expected ^ m.actual)
                    .iter()
                    .map(|p| p.to_string())
                    .collect();
                println!(
                    "  {:<10} {:?}  steps={:<2} at={:?} expected=0x{:04X} actual=0x{:04X} pins={}",
                    name,
                    r.outcome,
                    r.applied,
                    m.at,
                    m.expected,
                    m.actual,
                    pins.join(",")
                );
            }
            None => println!("  {:<10} {:?}  steps={}", name, r.outcome, r.applied),
        }
    }
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &Args, tester: &mut Fixture) -> Result<(), FrontendError> {
    for press in 1..=args.presses {
        tester.trigger_mut().set(true);
        let result = poll_and_record(tester, args.trace.as_deref())?;
        tester.trigger_mut().set(false);
        tester.poll();

        if result.is_none() {
            warn!(press, "button press did not start a test");
            continue;
        }
        println!("Press {}:", press);
        println!("  +----------------+");
        for row in 0..LCD_ROWS {
            println!("  |{:<16}|", tester.display().line(row));
        }
        println!("  +----------------+");
        if let Some(report) = tester.last_report() {
            print_report(report);
        }
    }
    Ok(())
}

// ─── Trace Dump ─────────────────────────────────────────────────────────────

fn dump_trace(path: &Path) -> Result<(), FrontendError> {
    let trace = RunTrace::load_from_file(path)?;
    println!("Trace: {}", path.display());
    println!(
        "Config: settle={}ms debounce={}ms idle={:?}",
        trace.config.settle_ms,
        trace.config.debounce_ms,
        trace.config.idle_level()
    );
    println!("Result: {}", trace.result.result.display_text());
    print_report(&trace.result);
    println!("{} GPIO operations:", trace.ops.len());
    for (i, op) in trace.ops.iter().enumerate() {
        println!("  {:5}  {}", i, op);
    }
    Ok(())
}

// ─── Gamepad ────────────────────────────────────────────────────────────────

fn init_gamepad() -> Option<Gilrs> {
    match Gilrs::new() {
        Ok(gilrs) => {
            for (id, gp) in gilrs.gamepads() {
                debug!("gamepad [{}] \"{}\"", id, gp.name());
            }
            Some(gilrs)
        }
        Err(e) => {
            warn!("gamepad: {}", e);
            None
        }
    }
}

/// Drain gamepad events into the test-button state.
fn poll_gamepad(gilrs: &mut Gilrs, pressed: &mut bool) {
    while let Some(GilrsEvent { event, .. }) = gilrs.next_event() {
        match event {
            EventType::ButtonPressed(GilrsButton::South | GilrsButton::Start, _) => {
                *pressed = true
            }
            EventType::ButtonReleased(GilrsButton::South | GilrsButton::Start, _) => {
                *pressed = false
            }
            EventType::Disconnected => *pressed = false,
            _ => {}
        }
    }
}

// ─── GUI Mode ───────────────────────────────────────────────────────────────

fn open_window(w: usize, h: usize) -> Result<Window, FrontendError> {
    let mut window = Window::new(
        WINDOW_TITLE,
        w,
        h,
        WindowOptions {
            scale: Scale::X1,
            scale_mode: ScaleMode::AspectRatioStretch,
            resize: true,
            ..Default::default()
        },
    )?;
    window.set_target_fps(60);
    Ok(window)
}

fn run_gui(args: &Args, tester: &mut Fixture) -> Result<(), FrontendError> {
    let scale = args.scale as usize;
    let scaled_w = LCD_WIDTH * scale;
    let scaled_h = LCD_HEIGHT * scale;
    let mut window = open_window(scaled_w, scaled_h)?;
    let mut scaled_buf = vec![0u32; scaled_w * scaled_h];

    let mut gilrs = init_gamepad();
    let mut pad_pressed = false;
    let mut chip = args.chip;
    let mut prev_num = [false; 4];

    info!("Space/Enter = test, 1-4 = swap chip (S138, LS260, S133, empty), Esc = quit");
    window.set_title(&format!("{} - socket: {:?}", WINDOW_TITLE, chip));

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(ref mut g) = gilrs {
            poll_gamepad(g, &mut pad_pressed);
        }

        // Socket contents (1-4)
        for (i, (key, arg)) in ChipArg::KEYS.iter().enumerate() {
            let down = window.is_key_down(*key);
            if down && !prev_num[i] && *arg != chip {
                chip = *arg;
                let socket = tester.gpio_mut().inner_mut();
                match chip.device() {
                    Some(device) => {
                        socket.insert(device);
                    }
                    None => {
                        socket.remove();
                    }
                }
                let part = socket.device().map_or("empty", |d| d.part_number());
                info!(part, "socket changed");
                window.set_title(&format!("{} - socket: {:?}", WINDOW_TITLE, chip));
            }
            prev_num[i] = down;
        }

        let pressed =
            window.is_key_down(Key::Space) || window.is_key_down(Key::Enter) || pad_pressed;
        tester.trigger_mut().set(pressed);
        if let Err(e) = poll_and_record(tester, args.trace.as_deref()) {
            warn!("{}", e);
        }

        // Render
        tester.display_mut().render();
        let pixels = tester.display().as_pixel_buffer();
        for y in 0..LCD_HEIGHT {
            for x in 0..LCD_WIDTH {
                let c = pixels[y * LCD_WIDTH + x];
                for sy in 0..scale {
                    let base = (y * scale + sy) * scaled_w + x * scale;
                    scaled_buf[base..base + scale].fill(c);
                }
            }
        }
        window.update_with_buffer(&scaled_buf, scaled_w, scaled_h)?;
    }
    Ok(())
}
