//! Decodes captured OCP NVMe Latency Monitor log pages.
#![forbid(unsafe_code)]

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, ValueEnum};
use lmparse::{
    field::Layout,
    input::{Capture, LogSource, read_log},
    ocp::ocp2,
    schema::{to_report, to_structure},
    serde::{SchemaDef, load_schema},
    validate::{OutlierTracker, Profile, require_block_size, validate},
    value::Record,
};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "lmparse",
    version,
    about = "Decode an OCP Latency Monitor log page capture"
)]
struct Cli {
    /// Log page capture: a hexdump, raw bytes with --raw-binary, or
    /// `nvme ocp latency-monitor-log -o json` output with --json-log
    #[arg(required_unless_present = "print_schema")]
    inputfile: Option<PathBuf>,

    /// JSON schema describing the log page (defaults to OCP 2.0)
    #[arg(short, long, env = "LMPARSE_SCHEMA")]
    schemafile: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    outputformat: OutputFormat,

    /// Include reserved fields in text output
    #[arg(short, long)]
    verbose: bool,

    /// Input file is a raw binary capture
    #[arg(short = 'b', long, conflicts_with = "json_log")]
    raw_binary: bool,

    /// Input file is an already decoded JSON log
    #[arg(short = 'j', long)]
    json_log: bool,

    /// Check the active bucket counters: hi5, datacenter (dc) or iogo
    #[arg(long, value_parser = Profile::from_str)]
    validate: Option<Profile>,

    /// Drive name used in validation messages (defaults to the input file name)
    #[arg(long, requires = "validate")]
    drive: Option<String>,

    /// Print the schema in use as JSON and exit
    #[arg(long)]
    print_schema: bool,
}

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn source(&self) -> LogSource {
        if self.json_log {
            LogSource::Json
        } else if self.raw_binary {
            LogSource::Binary
        } else {
            LogSource::Hexdump
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Writes `value` as JSON indented by four spaces, followed by a newline.
fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    let mut serializer = Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("failed to write JSON output")?;
    writeln!(out)?;
    Ok(())
}

fn load_layout(path: &Path) -> Result<Layout> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let layout = load_schema(&json).with_context(|| format!("invalid schema {}", path.display()))?;
    info!(path = %path.display(), fields = layout.fields.len(), "loaded custom schema");
    Ok(layout)
}

fn drive_name(input: &Path, drive: Option<&str>) -> String {
    match drive {
        Some(drive) => drive.to_string(),
        None => input
            .file_stem()
            .unwrap_or(input.as_os_str())
            .to_string_lossy()
            .into_owned(),
    }
}

fn run_validation(
    input: &Path,
    drive: Option<&str>,
    profile: Profile,
    record: &Record,
) -> Result<()> {
    let drive = drive_name(input, drive);
    let path = input.to_string_lossy();
    let block_size = match profile {
        Profile::Iogo => require_block_size(&path)?,
        _ => "",
    };

    let mut tracker = OutlierTracker::new();
    let violations = validate(&drive, record, profile, block_size, &mut tracker)?;
    tracker.check()?;

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("{violation}");
        }
        bail!(
            "[{drive}]: {} latency counter(s) outside the {profile} profile",
            violations.len()
        );
    }

    info!(drive = %drive, %profile, "latency counters validated");
    Ok(())
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let custom;
    let layout = match &cli.schemafile {
        Some(path) => {
            custom = load_layout(path)?;
            &custom
        }
        None => ocp2(),
    };

    if cli.print_schema {
        return write_json(out, &SchemaDef::from(layout));
    }

    let input = cli
        .inputfile
        .as_deref()
        .context("an input file is required")?;

    let record = match read_log(input, cli.source())? {
        Capture::Decoded(record) => {
            ensure!(
                cli.outputformat == OutputFormat::Json || cli.validate.is_some(),
                "{} is already decoded; use --outputformat json or --validate",
                input.display()
            );
            record
        }
        Capture::Page(bytes) => {
            debug!(len = bytes.len(), required = ?layout.required_len(), "decoding log page");

            if cli.outputformat == OutputFormat::Text {
                let report = to_report(layout, &bytes, cli.verbose)
                    .with_context(|| format!("failed to decode {}", input.display()))?;
                write!(out, "{report}")?;

                if cli.validate.is_none() {
                    return Ok(());
                }
            }

            to_structure(layout, &bytes)
                .with_context(|| format!("failed to decode {}", input.display()))?
        }
    };

    if cli.outputformat == OutputFormat::Json {
        write_json(out, &record)?;
    }

    match cli.validate {
        Some(profile) => run_validation(input, cli.drive.as_deref(), profile, &record),
        None => Ok(()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let stdout = io::stdout();
    run(&cli, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmparse::ocp::OCP2_LOG_LEN;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lmparse-cli-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn capture(buckets: [u32; 4]) -> String {
        let buckets: Vec<String> = buckets
            .iter()
            .enumerate()
            .map(|(bucket, write)| {
                format!(
                    r#""Active Bucket Counter: Bucket {bucket}": {{"Read": 0, "Write": {write}, "Trim": 0}}"#
                )
            })
            .collect();
        format!(r#"{{"Feature Status": 7, {}}}"#, buckets.join(", "))
    }

    fn run_args(args: &[&str]) -> (Result<()>, String) {
        let cli = Cli::try_parse_from(args).unwrap();
        let mut out = Vec::new();
        let result = run(&cli, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_write_json_indent() {
        let mut record = Record::new();
        record.insert("Feature Status".to_string(), 7u128.into());

        let mut out = Vec::new();
        write_json(&mut out, &record).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n    \"Feature Status\": 7\n}\n"
        );
    }

    #[test]
    fn test_print_schema_without_input() {
        let (result, out) = run_args(&["lmparse", "--print-schema"]);
        result.unwrap();
        assert!(out.starts_with("{\n    \"schema_level\": \"byte\",\n    \"instructions\": ["));

        assert!(Cli::try_parse_from(["lmparse"]).is_err());
    }

    #[test]
    fn test_profile_alias() {
        let cli = Cli::try_parse_from(["lmparse", "lm.json", "-j", "--validate", "dc"]).unwrap();
        assert_eq!(cli.validate, Some(Profile::Datacenter));

        assert!(Cli::try_parse_from(["lmparse", "lm.json", "--validate", "fio"]).is_err());
    }

    #[test]
    fn test_json_log_conflicts_with_raw_binary() {
        assert!(Cli::try_parse_from(["lmparse", "lm.json", "-j", "-b"]).is_err());
    }

    #[test]
    fn test_json_log_validation() {
        let dir = scratch_dir("validate");
        let clean = dir.join("lm_clean.json");
        fs::write(&clean, capture([0, 3, 0, 0])).unwrap();
        let dirty = dir.join("lm_dirty.json");
        fs::write(&dirty, capture([0, 0, 5, 0])).unwrap();

        let (result, out) = run_args(&["lmparse", clean.to_str().unwrap(), "-j", "--validate", "dc"]);
        result.unwrap();
        assert!(out.is_empty());

        let (result, out) = run_args(&[
            "lmparse",
            dirty.to_str().unwrap(),
            "-j",
            "-o",
            "json",
            "--validate",
            "hi5",
        ]);
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "[lm_dirty]: 1 latency counter(s) outside the hi5 profile"
        );
        assert!(out.starts_with("{\n    \"Feature Status\": 7,\n    \"Active Bucket Counter: Bucket 0\": {\n        \"Read\": 0,"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_json_log_needs_structured_output() {
        let dir = scratch_dir("text");
        let path = dir.join("lm.json");
        fs::write(&path, capture([0; 4])).unwrap();

        let (result, _) = run_args(&["lmparse", path.to_str().unwrap(), "-j"]);
        assert!(result.is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_hexdump_report_and_validation() {
        let dir = scratch_dir("hexdump");
        let mut page = vec![0u8; OCP2_LOG_LEN];
        // Active bucket counter 3, Trim
        page[84] = 2;
        let dump: String = page
            .chunks(16)
            .map(|row| {
                let bytes: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
                bytes.join(" ") + "\n"
            })
            .collect();
        let path = dir.join("nvme0n1.txt");
        fs::write(&path, dump).unwrap();

        let (result, out) = run_args(&["lmparse", path.to_str().unwrap()]);
        result.unwrap();
        assert!(out.starts_with("Latency Monitor Feature Status:\n"));

        let (result, out) = run_args(&["lmparse", path.to_str().unwrap(), "--validate", "iogo"]);
        assert!(out.starts_with("Latency Monitor Feature Status:\n"));
        assert!(result.unwrap_err().to_string().contains("block size should be specified"));

        let (result, _) = run_args(&[
            "lmparse",
            path.to_str().unwrap(),
            "-o",
            "json",
            "--validate",
            "datacenter",
            "--drive",
            "nvme0",
        ]);
        assert_eq!(
            result.unwrap_err().to_string(),
            "[nvme0]: 1 latency counter(s) outside the datacenter profile"
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
