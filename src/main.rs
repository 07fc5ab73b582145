use clap::Parser;
use midiclockctl::{
    cli::{list_devices, select_device, Args},
    config::Settings,
    controls::{read_commands, COMMAND_HELP},
    create_scheduler,
    display::ConsoleDisplay,
    encoder::{QuadratureDecoder, SimulatedPhases},
    event_loop::{Board, EventLoop},
    interrupt::VECTORS,
    logging,
    midi::{connect_output, list_output_ports, validate_device, LogSink, MidiSink, SynchroClock},
    timebase::SystemMillis,
    timer::SoftTimer,
    Scheduler,
};
use std::io;
use std::sync::Arc;

fn main() {
    let args = parse_command_line_arguments();
    let settings = load_settings(&args);
    initialize_logging(&settings);
    let devices = get_available_devices();

    if args.device_list {
        list_devices(&devices);
        return;
    }

    let device = choose_output_device(&args, &settings, &devices);
    let sink = open_sink(device);
    run_controller(settings, sink);
}

fn parse_command_line_arguments() -> Args {
    Args::parse()
}

fn load_settings(args: &Args) -> Settings {
    match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings.with_args(args),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn initialize_logging(settings: &Settings) {
    let level = logging::parse_level(&settings.log_level);
    if let Err(e) = logging::init_logger(level) {
        eprintln!("Logging disabled: {}", e);
    }
    log::info!("Application starting");
    log::debug!("Settings: {:?}", settings);
}

fn get_available_devices() -> Vec<String> {
    list_output_ports().unwrap_or_else(|e| {
        log::warn!("Could not list MIDI outputs: {}", e);
        Vec::new()
    })
}

fn exit_with(error_msg: String) -> ! {
    log::error!("{}", error_msg);
    eprintln!("{}", error_msg);
    std::process::exit(1);
}

fn choose_output_device(args: &Args, settings: &Settings, devices: &[String]) -> Option<String> {
    if args.select_device {
        return match select_device(devices) {
            Ok(choice) => choice,
            Err(e) => exit_with(format!("Device selection failed: {}", e)),
        };
    }

    if let Some(device_name) = &settings.output_device {
        if let Err(error_msg) = validate_device(device_name, devices) {
            exit_with(error_msg);
        }
    }
    settings.output_device.clone()
}

fn open_sink(device: Option<String>) -> Box<dyn MidiSink> {
    match connect_output(device.as_deref()) {
        Ok(sink) => {
            log::info!("Successfully connected to MIDI device: {}", sink.port_name());
            println!("Sending to MIDI device: {}", sink.port_name());
            Box::new(sink)
        }
        Err(e) if device.is_some() => {
            exit_with(format!("Error connecting to MIDI device: {}", e));
        }
        Err(e) => {
            log::warn!("No MIDI output ({}), logging bytes only", e);
            println!("No MIDI output available, running unbound");
            Box::new(LogSink)
        }
    }
}

fn run_controller(settings: Settings, sink: Box<dyn MidiSink>) {
    let config = settings.synchro_config();
    let timer = SoftTimer::new(config.timer.clock_hz());
    let millis = Arc::new(SystemMillis::new());
    let phases = SimulatedPhases::new();

    let board = Board {
        clock: Arc::new(SynchroClock::new(config, timer.clone(), sink, millis.clone())),
        encoder: Arc::new(QuadratureDecoder::new(
            phases.clone(),
            settings.min_bpm,
            settings.max_bpm,
            settings.default_bpm,
        )),
        phases,
        vectors: &VECTORS,
    };
    board.attach();
    let timer_thread = timer.spawn(&VECTORS);

    let mut event_loop = EventLoop::new(
        board,
        millis,
        Box::new(ConsoleDisplay::new()),
        settings.default_bpm,
    );
    event_loop.setup(settings.initial_mode.into());

    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let scheduler = create_scheduler();
    if let Err(e) = scheduler.spawn("console", move || {
        read_commands(io::stdin().lock(), command_tx)
    }) {
        exit_with(format!("Could not start console reader: {}", e));
    }

    println!("{}", COMMAND_HELP);
    event_loop.run(command_rx);

    timer.shutdown();
    if timer_thread.join().is_err() {
        log::error!("Soft timer thread panicked");
    }
    event_loop.board().detach();
    log::info!("Application stopped");
}
