//! Main line tracer executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the equipment (hardware or simulation)
//!     - Main loop:
//!         - Kill switch and emergency stop handling
//!         - Telecommand processing
//!         - Line following (one tick of the control loop)
//!         - Telemetry publishing
//!         - Cycle management
//!     - Stop the motors and report statistics
//!
//! # Usage
//!
//! ```text
//! line_exec [--sim] [--script <path>] [--ctrl-params <file>] [--hw-params <file>] [--verbose]
//! ```
//!
//! Without a script the robot starts following the line immediately, and runs until the kill
//! switch or Ctrl-C.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::{ActuatorSink, SensorSource},
    tc::Tc,
    tm::TmSink,
};
use line_lib::{
    data_store::DataStore,
    eqpt::{HwParams, KillSwitch},
    loop_ctrl::{ControlLoop, EStopHandle, LoopConfig, LoopParams, LoopState},
    sim::{SimHandle, SimWorld},
    tm_client::{self, CsvArchiveSink, JsonFileSink, LogSink, TmPublisher},
};
use util::{
    archive::Archiver,
    cycle::{CycleOutcome, CycleTimer},
    logger::{logger_init, LevelFilter},
    script_interpreter::{PendingTcs, ScriptInterpreter},
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of telemetry packets which can wait for the sinks.
const TM_QUEUE_LEN: usize = 16;

/// Period the kill switch is polled at.
const KILL_SWITCH_POLL_PERIOD: Duration = Duration::from_millis(2);

/// Number of consecutive cycle overruns after which an error is reported.
const MAX_CONSEC_CYCLE_OVERRUNS: u64 = 100;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "line_exec", about = "Line tracer control executable")]
struct Opts {
    /// Run against the simulated robot rather than the hardware
    #[structopt(long)]
    sim: bool,

    /// Script of timed telecommands to execute
    #[structopt(long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Control parameter file, relative to the params directory
    #[structopt(long, default_value = "line_ctrl.toml")]
    ctrl_params: String,

    /// Hardware parameter file, relative to the params directory
    #[structopt(long, default_value = "line_hw.toml")]
    hw_params: String,

    /// Log every control cycle
    #[structopt(short, long)]
    verbose: bool,
}

/// The equipment the control loop runs on.
struct Equipment {
    sensors: Box<dyn SensorSource>,
    motors: Box<dyn ActuatorSink>,
    kill_switch: Option<Box<dyn KillSwitch + Send>>,
    sim: Option<SimHandle>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the telecommands incoming to the exec.
enum TcSource {
    None,
    Script(ScriptInterpreter)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "line_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let (min_level, cycle_level) = match opts.verbose {
        true => (LevelFilter::Trace, LevelFilter::Trace),
        false => (LevelFilter::Debug, LevelFilter::Info)
    };
    logger_init(min_level, cycle_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Line Tracer Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let loop_params: LoopParams = util::params::load(&opts.ctrl_params)
        .wrap_err("Could not load the control parameters")?;
    let config = LoopConfig::from_params(&loop_params)
        .wrap_err("Invalid control parameters")?;

    let hw_params: HwParams = util::params::load(&opts.hw_params)
        .wrap_err("Could not load the hardware parameters")?;

    info!("Exec parameters loaded");
    info!(
        "    {} sensors, base speed {}, kp {}, kd {}, tick {} ms",
        config.num_sensors(),
        config.base_speed(),
        config.kp(),
        config.kd(),
        config.tick_period_ms()
    );

    // ---- INITIALISE TC SOURCE ----

    let mut tc_source = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path)
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} TCs\n",
                si.get_duration(),
                si.get_num_tcs()
            );

            TcSource::Script(si)
        },
        None => {
            info!("No script provided, line following starts immediately\n");
            TcSource::None
        }
    };

    // ---- INITIALISE EQUIPMENT ----

    let eqpt = init_equipment(opts.sim, &hw_params, &config)
        .wrap_err("Failed to initialise the equipment")?;

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::new(ControlLoop::new(config, eqpt.sensors, eqpt.motors));
    let estop = ds.line_ctrl.estop_handle();
    let tick_period = ds.line_ctrl.config().tick_period();

    if let Some(kill_switch) = eqpt.kill_switch {
        spawn_kill_switch_monitor(kill_switch, estop.clone())
            .wrap_err("Failed to start the kill switch monitor")?;
        info!("Kill switch monitor started");
    }

    // Ctrl-C takes the emergency stop path, zeroing the motors before exit
    ctrlc::set_handler(interrupt_handler(estop.clone()))
        .wrap_err("Failed to install the interrupt handler")?;

    let mut sinks: Vec<Box<dyn TmSink + Send>> = vec![
        Box::new(
            JsonFileSink::new(session.session_root.join("tm.jsonl"))
                .wrap_err("Failed to open the telemetry file")?
        ),
        Box::new(CsvArchiveSink::new(
            Archiver::from_session(&session, "tm.csv")
                .wrap_err("Failed to open the telemetry archive")?
        )),
    ];

    // Per-packet logging only when verbose
    if opts.verbose {
        sinks.push(Box::new(LogSink));
    }

    let tm_publisher = TmPublisher::new(sinks, TM_QUEUE_LEN)
        .wrap_err("Failed to initialise the telemetry publisher")?;

    info!("Module initialisation complete\n");

    if let TcSource::None = tc_source {
        tc_processor::exec(&mut ds, &Tc::FollowLine);
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut timer = CycleTimer::new(tick_period);

    loop {

        timer.start_cycle();

        ds.cycle_start(session::get_elapsed_seconds());

        // ---- TELECOMMAND PROCESSING ----

        if ds.is_tc_cycle {
            if let TcSource::Script(ref mut si) = tc_source {
                match si.get_pending_tcs() {
                    PendingTcs::None => (),
                    PendingTcs::Some(tc_vec) => {
                        for tc in tc_vec.iter() {
                            tc_processor::exec(&mut ds, tc);
                        }
                    },
                    // Exit if end of script reached
                    PendingTcs::EndOfScript => {
                        info!("End of TC script reached, stopping");
                        break
                    }
                }
            }
        }

        // ---- SIMULATION ----

        if let Some(ref world) = eqpt.sim {
            world.borrow_mut().step(tick_period.as_secs_f64());
        }

        // ---- LINE FOLLOWING ----

        if ds.line_ctrl.state() == LoopState::Running {
            if let Err(e) = ds.line_ctrl.tick() {
                warn!("Control loop error: {}", e);
            }
        }

        // ---- EMERGENCY STOP ----

        if estop.is_triggered() {
            // Zeroes the motors whatever state the loop was in
            if let Err(e) = ds.line_ctrl.emergency_stop() {
                debug!("Emergency stop outside of line following: {}", e);
            }

            error!("Emergency stop, the executable must be restarted to continue");
            break
        }

        // ---- TELEMETRY ----

        if ds.is_tm_cycle || ds.is_debug_cycle {
            let packet = tm_client::packet_from_snapshot(ds.line_ctrl.snapshot(), ds.time_s);

            if ds.is_debug_cycle {
                info!("{}", tm_client::debug_line(&packet));
            }

            if ds.is_tm_cycle {
                tm_publisher.publish(packet);
            }
        }

        // ---- CYCLE MANAGEMENT ----

        if let CycleOutcome::Overran(by) = timer.end_cycle() {
            warn!("Cycle overran by {:.06} s", by.as_secs_f64());

            if timer.num_consec_overruns == MAX_CONSEC_CYCLE_OVERRUNS {
                error!(
                    "{} consecutive cycle overruns, the tick period is too short",
                    MAX_CONSEC_CYCLE_OVERRUNS
                );
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    if let Err(e) = ds.line_ctrl.stop() {
        warn!("Could not stop the control loop: {}", e);
    }

    let tm_stats = tm_publisher.shutdown();

    info!("Executed {} cycles", ds.num_cycles);
    info!(
        "Telemetry: {} sent, {} failed, {} dropped",
        tm_stats.sent,
        tm_stats.failed,
        tm_stats.dropped
    );
    info!(
        "Faults: {} sensor reads, {} motor writes, {} rejected TCs",
        ds.line_ctrl.sensor_fault_count(),
        ds.line_ctrl.actuator_fault_count(),
        ds.num_rejected_tcs
    );
    if let Some(world) = eqpt.sim {
        info!("Final simulated line offset: {:+.3}", world.borrow().line_offset());
    }

    info!("End of execution");

    Ok(())
}

/// Build either the simulated or the real equipment.
fn init_equipment(
    sim: bool,
    hw_params: &HwParams,
    config: &LoopConfig
) -> Result<Equipment, Report> {

    if sim {
        let (world, sensors, motors) = SimWorld::build(
            hw_params.sim.clone(),
            config.weights(),
            config.detect_level()
        );

        info!("Using the simulated robot ({:?})", hw_params.sim);

        return Ok(Equipment {
            sensors: Box::new(sensors),
            motors: Box::new(motors),
            kill_switch: None,
            sim: Some(world),
        })
    }

    if hw_params.sensor_pins.len() != config.num_sensors() {
        return Err(eyre!(
            "{} sensor pins are configured but the control parameters expect {} sensors",
            hw_params.sensor_pins.len(),
            config.num_sensors()
        ))
    }

    init_hardware(hw_params)
}

#[cfg(all(target_arch = "arm", target_os = "linux"))]
fn init_hardware(hw_params: &HwParams) -> Result<Equipment, Report> {
    use line_lib::eqpt::rpi;

    let sensors = rpi::sensor_source(hw_params)
        .wrap_err("Failed to open the sensors")?;
    let motors = rpi::actuator_sink(hw_params)
        .wrap_err("Failed to open the motors")?;
    let kill_switch = rpi::kill_switch(hw_params)
        .wrap_err("Failed to open the kill switch")?;

    Ok(Equipment {
        sensors: Box::new(sensors),
        motors: Box::new(motors),
        kill_switch: kill_switch.map(|k| Box::new(k) as Box<dyn KillSwitch + Send>),
        sim: None,
    })
}

#[cfg(not(all(target_arch = "arm", target_os = "linux")))]
fn init_hardware(_hw_params: &HwParams) -> Result<Equipment, Report> {
    Err(eyre!("The line tracer hardware is only available on a Raspberry Pi, use --sim"))
}

/// Handler for Ctrl-C, requesting an emergency stop.
fn interrupt_handler(estop: EStopHandle) -> impl FnMut() + Send + 'static {
    move || {
        warn!("Interrupt received, stopping");
        estop.trigger();
    }
}

/// Poll the kill switch on its own thread, triggering the emergency stop
/// when it is pressed.
fn spawn_kill_switch_monitor(
    mut kill_switch: Box<dyn KillSwitch + Send>,
    estop: EStopHandle
) -> Result<(), std::io::Error> {
    thread::Builder::new()
        .name("kill_switch".into())
        .spawn(move || {
            while !estop.is_triggered() {
                if kill_switch.is_pressed() {
                    error!("Kill switch pressed");
                    estop.trigger();
                }
                thread::sleep(KILL_SWITCH_POLL_PERIOD);
            }
        })
        .map(|_| ())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
