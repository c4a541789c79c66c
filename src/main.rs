//! dvtest - encode/decode loop through an AMBE3000 vocoder
//!
//! Usage:
//!   dvtest -i in.raw -o out.raw -D /dev/ttyUSB0 -f 2
//!   dvtest -i - -o - -D 172.18.0.2:2345 -f 1 -g 2.0
//!
//! Every 20 ms block of input is encoded to a voice frame and decoded
//! back, so the output is the input as heard through the codec.

mod cli;

use clap::Parser;
use serialdv::constants::{AUDIO_BLOCK_BYTES, AUDIO_BLOCK_SIZE, VOICE_FRAME_MAX_BYTES};
use serialdv::{config, logging, AudioFrame, Config, DvController, DvError, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::error;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}. Aborting", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };

    let device = cli
        .device
        .clone()
        .unwrap_or_else(|| config.device.address.clone());
    if device.is_empty() {
        return Err(DvError::ConfigValidation {
            field: "device",
            reason: "no DV device specified".into(),
        });
    }
    let half_speed = cli.half_speed || config.device.half_speed;

    let mut input = open_input(&cli.input)?;
    eprintln!("Opened {} for input.", cli.input);
    let mut output = open_output(&cli.output)?;
    eprintln!("Opened {} for output.", cli.output);

    let mut dv = DvController::new(config.session);
    dv.open(&device, half_speed)?;
    eprintln!("Opened DV device at {}", device);

    let rate = cli.format;
    let gain = cli::gain_db(cli.gain);
    let mut block = [0u8; AUDIO_BLOCK_BYTES];
    let mut audio: AudioFrame = [0; AUDIO_BLOCK_SIZE];
    let mut voice = [0u8; VOICE_FRAME_MAX_BYTES];
    let mut failure = None;

    eprintln!("Start of process");
    let start = Instant::now();

    loop {
        let n = read_block(&mut input, &mut block).map_err(|e| io_error(&cli.input, e))?;
        if n == 0 {
            eprintln!("No more input. Terminating");
            break;
        }
        if n != AUDIO_BLOCK_BYTES {
            eprintln!("Incomplete audio frame. Terminating");
            break;
        }

        for (sample, bytes) in audio.iter_mut().zip(block.chunks_exact(2)) {
            *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        }

        let nbytes = match dv.encode(&audio, &mut voice, rate, 0) {
            Ok(n) => n,
            Err(e) => {
                eprintln!("Encoding failure. Terminating");
                failure = Some(e);
                break;
            }
        };

        if let Err(e) = dv.decode(&voice[..nbytes], &mut audio, rate, gain) {
            eprintln!("Decoding failure. Terminating");
            failure = Some(e);
            break;
        }

        for (bytes, sample) in block.chunks_exact_mut(2).zip(audio.iter()) {
            bytes.copy_from_slice(&sample.to_le_bytes());
        }
        if let Err(e) = output.write_all(&block) {
            eprintln!("Error writing to output: {}", e);
        }
    }

    eprintln!("End of process");
    eprintln!("Done in {:.6} seconds", start.elapsed().as_secs_f64());

    let stats = dv.stats();
    eprintln!(
        "Frames: {} encoded, {} decoded, {} failed ({} rate / {} gain requests)",
        stats.frames_encoded,
        stats.frames_decoded,
        stats.failed_exchanges,
        stats.rate_requests,
        stats.gain_requests
    );

    dv.close();
    output.flush().map_err(|e| io_error(&cli.output, e))?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn open_input(name: &str) -> Result<Box<dyn Read>> {
    if name == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(name).map_err(|e| io_error(name, e))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(name: &str) -> Result<Box<dyn Write>> {
    if name == "-" {
        return Ok(Box::new(io::stdout().lock()));
    }
    let file = File::create(name).map_err(|e| io_error(name, e))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn io_error(name: &str, source: io::Error) -> DvError {
    DvError::Io {
        path: PathBuf::from(name),
        source,
    }
}

/// Fill `buf` unless the input ends first; returns the bytes read
fn read_block(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
