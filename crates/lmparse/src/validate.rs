//! Checks a decoded latency monitor log for commands that exceeded their
//! latency thresholds.
//!
//! A run is validated against a [Profile], which names the active buckets
//! whose counters must all be zero. Under [Profile::Iogo], bucket 1 counters
//! are tolerated per run but collected in an [OutlierTracker] across runs of
//! different block sizes.

use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    sync::LazyLock,
};

use regex::Regex;
use snafu::{OptionExt, ensure};
use tracing::{info, warn};

use crate::{
    errors::{
        LatencyOutliersSnafu, MissingBlockSizeSnafu, MissingBucketSnafu, UnexpectedValueSnafu,
        UnknownProfileSnafu, ValidationError,
    },
    ocp::active_bucket_counter_key,
    value::Record,
};

static BLOCK_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+MB").expect("valid block size regex"));

/// Block sizes a drive may exceed the bucket 1 threshold for, per command type.
const MAX_OUTLIER_BLOCK_SIZES: usize = 3;

/// Workload whose active buckets are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Hi5,
    Datacenter,
    Iogo,
}

impl Profile {
    pub fn name(self) -> &'static str {
        match self {
            Profile::Hi5 => "hi5",
            Profile::Datacenter => "datacenter",
            Profile::Iogo => "iogo",
        }
    }

    /// Active buckets checked by this profile.
    pub fn buckets(self) -> &'static [u8] {
        match self {
            Profile::Hi5 => &[0, 1, 2, 3],
            Profile::Datacenter => &[2, 3],
            Profile::Iogo => &[1, 2, 3],
        }
    }

    /// Whether counters of `bucket` are outliers rather than violations.
    fn tolerates(self, bucket: u8) -> bool {
        self == Profile::Iogo && bucket == 1
    }
}

impl FromStr for Profile {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hi5" => Ok(Profile::Hi5),
            "datacenter" | "dc" => Ok(Profile::Datacenter),
            "iogo" => Ok(Profile::Iogo),
            _ => UnknownProfileSnafu { name: s }.fail(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-zero counter in a bucket that must stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub drive: String,
    pub bucket: u8,
    pub op: String,
    pub value: u128,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]: bucket {} {} counter is {}, expected 0",
            self.drive, self.bucket, self.op, self.value
        )
    }
}

/// Bucket 1 counters collected across runs, keyed by drive and command type.
#[derive(Debug, Default, Clone)]
pub struct OutlierTracker {
    outliers: BTreeMap<(String, String), BTreeMap<String, u128>>,
}

impl OutlierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` outliers of `op` on `drive` for `block_size`. A later
    /// run with the same block size replaces the earlier value.
    pub fn record(&mut self, drive: &str, op: &str, block_size: &str, value: u128) {
        self.outliers
            .entry((drive.to_string(), op.to_string()))
            .or_default()
            .insert(block_size.to_string(), value);
    }

    /// Block sizes recorded for `op` on `drive`.
    pub fn block_sizes(&self, drive: &str, op: &str) -> Vec<&str> {
        self.outliers
            .get(&(drive.to_string(), op.to_string()))
            .map(|sizes| sizes.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Drives with outliers for four or more block sizes of any command type.
    pub fn offenders(&self) -> Vec<String> {
        let mut drives: Vec<String> = Vec::new();

        for ((drive, op), sizes) in &self.outliers {
            if sizes.len() > MAX_OUTLIER_BLOCK_SIZES {
                info!(
                    drive = %drive,
                    op = %op,
                    sizes = ?sizes.keys().collect::<Vec<_>>(),
                    "latency outliers for four or more block sizes"
                );
                if !drives.contains(drive) {
                    drives.push(drive.clone());
                }
            }
        }

        drives
    }

    /// Fails when any drive is an offender.
    pub fn check(&self) -> Result<(), ValidationError> {
        let drives = self.offenders();
        ensure!(drives.is_empty(), LatencyOutliersSnafu { drives });
        Ok(())
    }
}

/// Validates the structured result of one run on `drive`.
///
/// Returns the non-zero counters of the buckets checked by `profile`. Under
/// [Profile::Iogo], bucket 1 counters go to `tracker` under `block_size`.
pub fn validate(
    drive: &str,
    record: &Record,
    profile: Profile,
    block_size: &str,
    tracker: &mut OutlierTracker,
) -> Result<Vec<Violation>, ValidationError> {
    let mut violations = Vec::new();

    for &bucket in profile.buckets() {
        let key = active_bucket_counter_key(bucket);
        let counters = record
            .get(&key)
            .context(MissingBucketSnafu { drive, key: key.as_str() })?
            .as_record()
            .context(UnexpectedValueSnafu { drive, key: key.as_str() })?;

        if !profile.tolerates(bucket) {
            info!(drive, bucket = %key, "validating bucket counters");
        }

        for (op, value) in counters {
            let value = value.as_int().context(UnexpectedValueSnafu {
                drive,
                key: format!("{key}/{op}"),
            })?;
            if value == 0 {
                continue;
            }

            if profile.tolerates(bucket) {
                tracker.record(drive, op, block_size, value);
                continue;
            }

            let violation = Violation {
                drive: drive.to_string(),
                bucket,
                op: op.clone(),
                value,
            };
            warn!("{violation}");
            violations.push(violation);
        }
    }

    Ok(violations)
}

/// First `<digits>MB` token of `path`, e.g. `128MB` in `lm_128MB_run2.txt`.
pub fn block_size_from_path(path: &str) -> Option<&str> {
    BLOCK_SIZE.find(path).map(|m| m.as_str())
}

/// Like [block_size_from_path], failing when `path` has no block size token.
pub fn require_block_size(path: &str) -> Result<&str, ValidationError> {
    block_size_from_path(path).context(MissingBlockSizeSnafu { path })
}
