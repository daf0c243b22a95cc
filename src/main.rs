use clap::Parser;
use indoc::indoc;
use log::info;
use std::{
    io::{BufWriter, Read},
    path::{Path, PathBuf},
    process::ExitCode,
};
use synacor_vm::{
    patch::{self, Patch},
    solver::{checksum, coins, orb},
    Error, Exit, Vm,
};

const AFTER_HELP: &str = indoc! {"
    Patches are written as `rN=VALUE` to set a register, or `ADDRESS=VALUE`
    to overwrite a word of memory; they are applied before execution starts.

    Input comes from the --script file first, then from standard input.
    Set RUST_LOG=trace to log every executed instruction.
"};

#[derive(Parser, Debug)]
#[command(
    name = "synacor-vm",
    version,
    about = "Runs a Synacor Challenge program image",
    after_help = AFTER_HELP
)]
struct Args {
    /// Program image, as little-endian 16-bit words
    #[arg(required_unless_present = "solve")]
    image: Option<PathBuf>,

    /// File of commands fed to the program before standard input
    #[arg(long)]
    script: Option<PathBuf>,

    /// Search for the teleporter register and skip its confirmation check
    #[arg(long)]
    solve_teleporter: bool,

    /// Address of the teleporter's confirmation call
    #[arg(long, default_value_t = patch::TELEPORTER_CALL)]
    teleporter_call: u16,

    /// Register or memory patch applied before execution (repeatable)
    #[arg(long = "poke", value_name = "PATCH")]
    pokes: Vec<Patch>,

    /// Write a memory dump here once execution stops
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Print the puzzle solutions and exit
    #[arg(long)]
    solve: bool,

    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
}

fn find_register() -> Result<u16, Error> {
    let start = std::time::Instant::now();
    let r7 = checksum::find().ok_or(Error::NoRegister)?;
    info!("found r7 = {r7} in {:?}", start.elapsed());
    Ok(r7)
}

fn solve() -> Result<(), Error> {
    let path = orb::solve().ok_or(Error::NoOrbPath)?;
    println!("orb path: {}", orb::letters(&path));
    for d in &path {
        println!("  {}", d.command());
    }
    let order = coins::solve_named().ok_or(Error::NoCoinOrder)?;
    println!("coins: {}", order.join(", "));
    println!("r7: {}", find_register()?);
    Ok(())
}

fn run(args: &Args, image: &Path) -> Result<Exit, Error> {
    let bin = std::fs::read(image)?;
    let mut vm = Vm::new(&bin)?;
    for p in &args.pokes {
        p.apply(&mut vm).map_err(|_| Error::BadPatch(p.to_string()))?;
    }
    if args.solve_teleporter {
        let r7 = find_register()?;
        vm.add_hook(patch::teleporter(args.teleporter_call, r7));
    }

    let script = match &args.script {
        Some(p) => std::fs::read(p)?,
        None => vec![],
    };
    let input = std::io::Cursor::new(script).chain(std::io::stdin().lock());
    let r = vm.run_with_limit(input, std::io::stdout().lock(), args.max_steps);

    if let Some(path) = &args.dump {
        let f = std::fs::File::create(path)?;
        vm.memory().dump(BufWriter::new(f))?;
    }
    r
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.solve {
        return match solve() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }
    let Some(image) = &args.image else {
        eprintln!("error: no program image given");
        return ExitCode::FAILURE;
    };
    match run(&args, image) {
        Ok(exit) => {
            eprintln!("{} at {}", exit.reason, exit.address);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
