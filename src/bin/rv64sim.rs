use clap::Parser;
use rv64sim::cpu::Cpu;
use rv64sim::loader::load_flat_binary;

/// Functional, user-mode instruction-set simulator for RV64IMA
///
/// Loads a flat binary image of machine code into a simulated 16 MiB
/// address space and executes it from address 0 until the guest
/// requests termination through the a0=1 ECALL convention.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the flat binary image to execute
    input: String,

    /// Print the `fetched: 0x... @ 0x...` line for every instruction
    /// and the immediate of every taken branch
    #[arg(short, long)]
    trace: bool,

    /// Suppress the register dump normally printed on exit or on a
    /// fatal decode error
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.trace { "trace" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    let mut cpu = Cpu::new();
    if let Err(err) = load_flat_binary(&args.input, &mut cpu.mem) {
        log::error!("{err}");
        std::process::exit(1);
    }

    match cpu.run(args.trace) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            if !args.quiet {
                log::error!("{}", cpu.register_dump());
            }
            log::error!("{err}");
            std::process::exit(1);
        }
    }
}
