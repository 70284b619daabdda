use std::path::PathBuf;
use std::process;

use log::LevelFilter;
use structopt::StructOpt;

use chip8_vm::emulator::input::DummyInput;
use chip8_vm::emulator::output::DummyOutput;
use chip8_vm::emulator::runner::{cycle_interval, Config, Runner};
use chip8_vm::emulator::timer::TimerMode;
use chip8_vm::emulator::{Emulator, Result};

mod crossterm_io;
use crossterm_io::{CrosstermInput, CrosstermOutput};

/// Run a CHIP-8 program in the terminal.
///
/// Keys 1-4, q-r, a-f and z-v make up the keypad. Escape quits.
/// Logs go to stderr, so redirect it when raising the verbosity.
#[derive(StructOpt, Debug)]
#[structopt(name = "chip8")]
struct Opt {
    /// Instructions per second, 0 runs as fast as possible
    #[structopt(long, default_value = "666")]
    hz: u32,

    /// When the delay and sound timers count down: "per-instruction" or "60hz"
    #[structopt(long, default_value = "per-instruction")]
    timers: TimerMode,

    /// Seed for the random number instruction
    #[structopt(long)]
    seed: Option<u64>,

    /// Run without a terminal frontend and print the final screen
    #[structopt(long)]
    headless: bool,

    /// Stop after this many steps
    #[structopt(long)]
    steps: Option<u64>,

    /// Verbose mode (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,

    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn run(opt: Opt) -> Result<()> {

    // Read input file and load it into emulator memory
    log::info!("Executing {:?}", &opt.input);
    let program = std::fs::read(&opt.input)?;

    let mut emulator = match opt.seed {
        Some(seed) => Emulator::with_seed(seed),
        None => Emulator::new(),
    };
    emulator.load(&program)?;

    let config = Config {
        cycle_interval: cycle_interval(opt.hz),
        timer_mode: opt.timers,
        max_steps: opt.steps,
    };

    // Start execution
    let exit = if opt.headless {
        let mut runner = Runner::new(emulator, DummyInput, DummyOutput::new(), config);
        let exit = runner.run()?;
        print!("{}", runner.emulator().framebuffer());
        exit
    } else {
        let mut runner = Runner::new(emulator, CrosstermInput::new(), CrosstermOutput::new()?, config);
        let result = runner.run();
        // Restore the terminal before anything is printed
        drop(runner);
        result?
    };

    log::info!("Finished: {:?}", exit);
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.verbose);

    if let Err(err) = run(opt) {
        log::error!("{}", err);
        eprintln!("chip8: {}", err);
        process::exit(1);
    }
}
