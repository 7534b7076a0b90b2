use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use randquik::cli::{self, Error, DEFAULT_IV};
use randquik::pipeline::{self, Config};
use randquik::{Rounds, KEY_LEN};

xflags::xflags! {
    /// Write a seeded ChaCha keystream to a file or pipe.
    cmd randquik {
        /// Worker thread count (default 8)
        optional -t, --threads count: usize
        /// Seed as up to 64 hex digits, zero-padded on the right
        optional -s, --seed hex: String
        /// ChaCha rounds: 8, 12 or 20 (default 20)
        optional -r, --rounds count: u32
        /// Stop after this many bytes; takes k/m/g/t (SI) and
        /// ki/mi/gi/ti (IEC) suffixes, case-insensitive
        optional -b, --bytes cap: String
        /// Output file; `-` or absent means stdout
        optional -o, --output path: String
    }
}

static QUIT: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
mod signals {
    use std::sync::atomic::Ordering;

    use super::QUIT;

    extern "C" fn on_signal(sig: libc::c_int) {
        QUIT.store(true, Ordering::Relaxed);
        // Restore the default disposition so a second signal terminates the
        // process even if the writer is stuck.
        unsafe {
            libc::signal(sig, libc::SIG_DFL);
        }
    }

    pub fn install() {
        unsafe {
            libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
            libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
        }
    }
}

#[cfg(not(unix))]
mod signals {
    pub fn install() {}
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let flags = Randquik::from_env().map_err(|err| Error::BadOption(err.to_string()))?;

    let rounds = match flags.rounds {
        None => Rounds::R20,
        Some(n) => Rounds::from_count(n)
            .ok_or_else(|| Error::BadOption(format!("rounds must be 8, 12 or 20, not {n}")))?,
    };
    let workers = flags.threads.unwrap_or(8);
    if workers == 0 {
        return Err(Error::BadOption("need at least one worker thread".into()));
    }
    let max_bytes = match &flags.bytes {
        Some(cap) => cli::parse_size(cap)?,
        None => 0,
    };

    let (key, seed_generated) = match &flags.seed {
        Some(hex) => (cli::parse_hex_seed(hex)?, false),
        None => {
            let mut key = [0; KEY_LEN];
            getrandom::getrandom(&mut key).map_err(|_| Error::SeedEntropy)?;
            (key, true)
        }
    };

    let output = flags.output.filter(|path| path != "-");
    let out: Box<dyn Write> = match &output {
        Some(path) => {
            let file = File::create(path).map_err(|err| Error::OpenOutput(path.clone(), err))?;
            Box::new(file)
        }
        None => {
            if io::stdout().is_terminal() {
                return Err(Error::RefuseTty);
            }
            Box::new(io::stdout().lock())
        }
    };

    if seed_generated {
        cli::echo_seed(&key, rounds);
    }
    signals::install();

    let config = Config {
        workers,
        max_bytes,
        rounds,
        ..Config::default()
    };
    let start = Instant::now();
    let mut last_status = 0;
    let written = pipeline::run(out, &key, &DEFAULT_IV, &config, &QUIT, |bytes| {
        // A status line roughly every GiB, plus one right before the cap.
        if bytes - last_status >= (1 << 30) || (max_bytes != 0 && bytes >= max_bytes) {
            cli::print_status(bytes, max_bytes, start);
            last_status = bytes;
        }
    })
    .map_err(Error::WriteIo)?;

    cli::print_status(written, max_bytes, start);
    cli::print_summary(written);
    Ok(())
}
