//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

#![forbid(unsafe_code)]

mod paths;
mod prompt;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use cryptit_core::{
    ByteSource, CryptIt, CryptItOptions, Difficulty, PayloadLayout, SaltStrength,
};

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(
    name = "cryptit",
    version,
    about = "Passphrase-protected authenticated encryption for text and streams"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Encryption scheme id
    #[arg(
        short = 'S',
        long,
        global = true,
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=7)
    )]
    scheme: u8,

    /// Passphrase; prompted on the terminal when omitted
    #[arg(short = 'p', long, global = true)]
    pass: Option<String>,

    /// Argon2id difficulty preset
    #[arg(short = 'd', long, global = true, default_value = "middle")]
    difficulty: DifficultyArg,

    /// Salt length selector
    #[arg(short = 's', long = "salt-strength", global = true, default_value = "high")]
    salt_strength: SaltStrengthArg,

    /// Writer-side chunk size in bytes
    #[arg(
        short = 'c',
        long = "chunk-size",
        global = true,
        default_value_t = 524_288,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    chunk_size: u64,

    /// Increase diagnostic output (repeatable, max 4)
    #[arg(short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output file; `-` writes to stdout
    #[arg(short = 'o', long, global = true)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file; `-` reads stdin
    Encrypt {
        #[arg(value_name = "SRC")]
        src: String,
    },
    /// Decrypt a file; `-` reads stdin
    Decrypt {
        #[arg(value_name = "SRC")]
        src: String,
    },
    /// Encrypt a text argument (or stdin) to base64
    EncryptText {
        #[arg(value_name = "TEXT")]
        text: Option<String>,
    },
    /// Decrypt a base64 container back to text
    DecryptText {
        #[arg(value_name = "B64")]
        data: Option<String>,
    },
    /// Inspect container structure without decrypting
    Decode {
        #[arg(value_name = "SRC")]
        src: Option<String>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Low,
    Middle,
    High,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Low => Difficulty::Low,
            DifficultyArg::Middle => Difficulty::Middle,
            DifficultyArg::High => Difficulty::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SaltStrengthArg {
    Low,
    High,
}

impl From<SaltStrengthArg> for SaltStrength {
    fn from(value: SaltStrengthArg) -> Self {
        match value {
            SaltStrengthArg::Low => SaltStrength::Low,
            SaltStrengthArg::High => SaltStrength::High,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbose.min(4);

    let cryptit = CryptIt::with_options(CryptItOptions {
        scheme: cli.scheme,
        difficulty: cli.difficulty.into(),
        salt_strength: cli.salt_strength.into(),
        chunk_size: cli.chunk_size as usize,
        ..CryptItOptions::default()
    });
    note(
        verbosity,
        2,
        format_args!(
            "scheme {} / difficulty {} / salt {}",
            cli.scheme,
            Difficulty::from(cli.difficulty),
            SaltStrength::from(cli.salt_strength)
        ),
    );

    match &cli.command {
        Commands::Encrypt { src } => handle_encrypt(&cli, &cryptit, src, verbosity),
        Commands::Decrypt { src } => handle_decrypt(&cli, &cryptit, src, verbosity),
        Commands::EncryptText { text } => handle_encrypt_text(&cli, &cryptit, text.clone()),
        Commands::DecryptText { data } => handle_decrypt_text(&cli, &cryptit, data.clone()),
        Commands::Decode { src, json } => handle_decode(&cryptit, src.as_deref(), *json, verbosity),
    }
}

/// Either a validated file or stdout.
enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    fn writer(&self) -> Result<Box<dyn Write>> {
        match self {
            Output::Stdout => Ok(Box::new(std::io::stdout().lock())),
            Output::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("cannot create output file: {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}

fn resolve_out(out: &Option<PathBuf>, default: Option<PathBuf>) -> Result<Output> {
    let target = match out {
        Some(path) if path.as_os_str() == "-" => return Ok(Output::Stdout),
        Some(path) => path.clone(),
        None => match default {
            Some(path) => path,
            None => return Ok(Output::Stdout),
        },
    };
    Ok(Output::File(paths::resolve_output(&target)?))
}

fn note(verbosity: u8, level: u8, msg: std::fmt::Arguments<'_>) {
    if verbosity >= level {
        eprintln!("● {msg}");
    }
}

fn handle_encrypt(cli: &Cli, cryptit: &CryptIt, src: &str, verbosity: u8) -> Result<()> {
    let from_stdin = src == "-";
    let mut pass = prompt::acquire(cli.pass.as_deref(), from_stdin, true)?;

    let default_out = (!from_stdin).then(|| PathBuf::from(format!("{src}.enc")));
    let output = resolve_out(&cli.out, default_out)?;
    let mut writer = output.writer()?;

    let written = if from_stdin {
        cryptit.encrypt_stream(std::io::stdin().lock(), &mut writer, &mut pass)?
    } else {
        let file =
            File::open(src).with_context(|| format!("cannot open input file: {src}"))?;
        cryptit.encrypt_stream(BufReader::new(file), &mut writer, &mut pass)?
    };
    note(verbosity, 1, format_args!("wrote {written} ciphertext bytes"));
    Ok(())
}

fn handle_decrypt(cli: &Cli, cryptit: &CryptIt, src: &str, verbosity: u8) -> Result<()> {
    let from_stdin = src == "-";
    let mut pass = prompt::acquire(cli.pass.as_deref(), from_stdin, false)?;

    let default_out = if from_stdin {
        None
    } else if let Some(stripped) = src.strip_suffix(".enc") {
        Some(PathBuf::from(stripped))
    } else {
        bail!("cannot infer output name for {src}; pass -o");
    };
    let output = resolve_out(&cli.out, default_out)?;
    let mut writer = output.writer()?;

    let written = if from_stdin {
        cryptit.decrypt_stream(std::io::stdin().lock(), &mut writer, &mut pass)?
    } else {
        let file =
            File::open(src).with_context(|| format!("cannot open input file: {src}"))?;
        cryptit.decrypt_stream(BufReader::new(file), &mut writer, &mut pass)?
    };
    note(verbosity, 1, format_args!("wrote {written} plaintext bytes"));
    Ok(())
}

fn handle_encrypt_text(cli: &Cli, cryptit: &CryptIt, text: Option<String>) -> Result<()> {
    let (mut plaintext, from_stdin) = match text {
        Some(text) => (text.into_bytes(), false),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("read stdin")?;
            (buf, true)
        }
    };

    let mut pass = prompt::acquire(cli.pass.as_deref(), from_stdin, true)?;
    let container = cryptit.encrypt_text(&mut plaintext, &mut pass)?;

    let mut writer = resolve_out(&cli.out, None)?.writer()?;
    writeln!(writer, "{}", BASE64.encode(&container))?;
    writer.flush()?;
    Ok(())
}

fn handle_decrypt_text(cli: &Cli, cryptit: &CryptIt, data: Option<String>) -> Result<()> {
    let (encoded, from_stdin) = match data {
        Some(data) => (data, false),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .lock()
                .read_to_string(&mut buf)
                .context("read stdin")?;
            (buf, true)
        }
    };

    let mut pass = prompt::acquire(cli.pass.as_deref(), from_stdin, false)?;
    let container = ByteSource::from_base64(encoded).read_all()?;
    let plaintext = cryptit.decrypt_text(&container, &mut pass)?;

    let mut writer = resolve_out(&cli.out, None)?.writer()?;
    writer.write_all(plaintext.as_bytes()?)?;
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct DecodeReport {
    scheme: u8,
    cipher: String,
    difficulty: String,
    salt_strength: String,
    salt: String,
    salt_length: usize,
    layout: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_payload: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iv_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ciphertext_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_length: Option<usize>,
}

fn handle_decode(cryptit: &CryptIt, src: Option<&str>, json: bool, verbosity: u8) -> Result<()> {
    let src = src.unwrap_or("-");

    // Keep the spool file alive for the duration of the inspection.
    let mut _spool = None;
    let mut source = if src == "-" {
        let tmp = prompt::spool_stdin()?;
        let source = ByteSource::open(tmp.path())?;
        _spool = Some(tmp);
        source
    } else {
        ByteSource::open(src)?
    };
    note(verbosity, 2, format_args!("decoding {src}"));

    let info = cryptit.decode_data(&mut source)?;
    let cipher = cryptit.registry().get(info.header.scheme)?.name.to_string();

    let mut report = DecodeReport {
        scheme: info.header.scheme,
        cipher,
        difficulty: info.header.difficulty.to_string(),
        salt_strength: info.header.salt_strength.to_string(),
        salt: info.header.salt_base64(),
        salt_length: info.header.salt.len(),
        layout: "single",
        frames: None,
        frame_size: None,
        total_payload: None,
        iv_length: None,
        ciphertext_length: None,
        tag_length: None,
    };
    match info.layout {
        PayloadLayout::Chunked {
            frames,
            frame_size,
            total_payload,
        } => {
            report.layout = "chunked";
            report.frames = Some(frames);
            report.frame_size = Some(frame_size);
            report.total_payload = Some(total_payload);
        }
        PayloadLayout::Single {
            iv_length,
            ciphertext_length,
            tag_length,
        } => {
            report.iv_length = Some(iv_length);
            report.ciphertext_length = Some(ciphertext_length);
            report.tag_length = Some(tag_length);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Cryptit Container Information:");
    println!("  Source: {src}");
    println!("  Scheme: {} ({})", report.scheme, report.cipher);
    println!("  Difficulty: {}", report.difficulty);
    println!("  Salt Strength: {}", report.salt_strength);
    println!("  Salt (base64): {}", report.salt);
    println!("  Salt Length: {} bytes", report.salt_length);
    match info.layout {
        PayloadLayout::Chunked {
            frames,
            frame_size,
            total_payload,
        } => {
            println!("  Layout: chunked");
            println!("  Frames: {frames}");
            println!("  Frame Size: {frame_size} bytes");
            println!("  Total Payload: {total_payload} bytes");
        }
        PayloadLayout::Single {
            iv_length,
            ciphertext_length,
            tag_length,
        } => {
            println!("  Layout: single block");
            println!("  IV Length: {iv_length} bytes");
            println!("  Ciphertext Length: {ciphertext_length} bytes");
            println!("  Tag Length: {tag_length} bytes");
        }
    }
    Ok(())
}
