//! OCP Datacenter NVMe SSD Specification 2.0 Latency Monitor log page layout.

use std::sync::LazyLock;

use crate::{
    field::{FieldDescriptor, Layout},
    format::{DisplayFormat, OutputFormat},
};

/// Length in bytes of the Latency Monitor log page.
pub const OCP2_LOG_LEN: usize = 512;

static OCP2: LazyLock<Layout> = LazyLock::new(build);

/// The OCP 2.0 Latency Monitor log page layout, built once and shared.
pub fn ocp2() -> &'static Layout {
    &OCP2
}

/// Output key of the active bucket counter record for `bucket`.
pub fn active_bucket_counter_key(bucket: u8) -> String {
    format!("Active Bucket Counter: Bucket {bucket}")
}

fn build() -> Layout {
    let mut fields = vec![
        FieldDescriptor::new("Latency Monitor Feature Status", 0, 1)
            .with_key("Feature Status")
            .with_requirement("LMDATA-1")
            .with_output(OutputFormat::Decimal)
            .with_child(Layout::bits(vec![
                FieldDescriptor::new("Reserved", 3, 5).verbose_only(),
                FieldDescriptor::new("Active Measured Latency Supported", 2, 1),
                FieldDescriptor::new(
                    "Active Latency Configuration/Active Latency Mode 1 Supported",
                    1,
                    1,
                ),
                FieldDescriptor::new("Latency Monitoring Feature Enabled", 0, 1),
            ])),
        FieldDescriptor::new("Reserved", 1, 1)
            .with_requirement("LMDATA-2")
            .verbose_only(),
        FieldDescriptor::new("Active Bucket Timer", 2, 2)
            .with_key("Active Bucket Timer")
            .with_requirement("LMDATA-3")
            .with_display(DisplayFormat::FiveMinutes)
            .with_output(OutputFormat::DecimalTimes5),
        FieldDescriptor::new("Active Bucket Timer Threshold", 4, 2)
            .with_key("Active Bucket Timer Threshold")
            .with_requirement("LMDATA-4")
            .with_display(DisplayFormat::FiveMinutes)
            .with_output(OutputFormat::DecimalTimes5),
    ];

    for (i, letter) in ['A', 'B', 'C', 'D'].into_iter().enumerate() {
        let label = format!("Active Threshold {letter}");
        fields.push(
            FieldDescriptor::new(label.clone(), 6 + i, 1)
                .with_key(label)
                .with_requirement(format!("LMDATA-{}", 5 + i))
                .with_display(DisplayFormat::FiveMsPlusFive)
                .with_output(OutputFormat::DecimalTimes5Plus5),
        );
    }

    fields.push(
        FieldDescriptor::new("Active Latency Configuration", 10, 2)
            .with_requirement("LMDATA-9a")
            .verbose_only()
            .with_child(Layout::bits(vec![FieldDescriptor::new("Reserved", 12, 4)])),
    );
    for (bucket, suffix) in ["b", "c", "d", "e"].into_iter().enumerate() {
        let first = bucket * 3;
        fields.push(
            FieldDescriptor::new(format!("Active Latency Configuration - Bucket {bucket}"), 10, 2)
                .with_key(format!("Active Latency Mode: Bucket {bucket}"))
                .with_requirement(format!("LMDATA-9{suffix}"))
                .with_child(Layout::bits(vec![
                    flag("Read", "Read", first),
                    flag("Write", "Write", first + 1),
                    flag("Deallocate/TRIM", "Trim", first + 2),
                ])),
        );
    }

    fields.push(
        FieldDescriptor::new("Active Latency Minimum Window", 12, 1)
            .with_key("Active Latency Minimum Window")
            .with_requirement("LMDATA-10")
            .with_display(DisplayFormat::HundredMs)
            .with_output(OutputFormat::DecimalTimes100),
    );
    fields.push(reserved("LMDATA-11", 13, 19));

    fields.extend(bucket_counters("Active", 32, 12));
    fields.extend(latency_stamps("Active", 168, "16"));
    fields.extend(measured_latencies("Active", 210, "17"));
    fields.push(bucket_bitmap(
        "Active Latency Stamp Units",
        "Active Latency Stamp Units",
        "LMDATA-18",
        216,
        false,
    ));
    fields.push(reserved("LMDATA-19", 218, 22));

    fields.extend(bucket_counters("Static", 240, 20));
    fields.extend(latency_stamps("Static", 376, "24"));
    fields.extend(measured_latencies("Static", 418, "25"));
    fields.push(bucket_bitmap(
        "Static Latency Stamp Units",
        "Static Latency Stamp Units",
        "LMDATA-26",
        424,
        true,
    ));
    fields.push(reserved("LMDATA-27", 426, 22));

    fields.push(bucket_bitmap(
        "Debug Log Trigger Enable",
        "Debug Log Trigger Enable",
        "LMDATA-28",
        448,
        false,
    ));
    fields.push(
        FieldDescriptor::new("Debug Log Measured Latency", 450, 2)
            .with_key("Debug Log Measured Latency")
            .with_requirement("LMDATA-29")
            .with_display(DisplayFormat::OneMs)
            .with_output(OutputFormat::Decimal),
    );
    fields.push(
        FieldDescriptor::new("Debug Log Latency Stamp", 452, 8)
            .with_key("Debug Log Latency Time Stamp")
            .with_requirement("LMDATA-30")
            .with_output(OutputFormat::Timestamp)
            .with_child(timestamp()),
    );
    fields.push(
        FieldDescriptor::new("Debug Log Pointer", 460, 2)
            .with_key("Debug Log Pointer")
            .with_requirement("LMDATA-31"),
    );
    fields.push(bucket_bitmap(
        "Debug Counter Trigger Source",
        "Debug Counter Trigger Source",
        "LMDATA-32",
        462,
        false,
    ));
    fields.push(
        FieldDescriptor::new("Debug Log Stamp Units", 464, 1)
            .with_key("Debug Log Stamp Units")
            .with_requirement("LMDATA-33")
            .with_output(OutputFormat::Decimal)
            .with_child(Layout::bits(vec![
                FieldDescriptor::new("Reserved", 1, 7).verbose_only(),
                FieldDescriptor::new("Debug Latency Stamp Basis", 0, 1),
            ])),
    );
    fields.push(reserved("LMDATA-34", 465, 29));
    fields.push(
        FieldDescriptor::new("Log Page Version", 494, 2)
            .with_key("Log Page Version")
            .with_requirement("LMDATA-35")
            .with_display(DisplayFormat::Uppercase)
            .with_output(OutputFormat::Decimal),
    );
    fields.push(
        FieldDescriptor::new("Log Page GUID", 496, 16)
            .with_key("Log Page GUID")
            .with_requirement("LMDATA-36")
            .with_display(DisplayFormat::Uppercase)
            .with_output(OutputFormat::Uppercase),
    );

    Layout::bytes(fields)
}

fn reserved(requirement: &str, offset: usize, size: usize) -> FieldDescriptor {
    FieldDescriptor::new("Reserved", offset, size)
        .with_requirement(requirement)
        .verbose_only()
}

fn flag(label: &str, key: &str, offset: usize) -> FieldDescriptor {
    FieldDescriptor::new(label, offset, 1)
        .with_key(key)
        .with_output(OutputFormat::Decimal)
}

/// Four 16-byte read/write/trim counter records, one per bucket.
fn bucket_counters(kind: &str, offset: usize, requirement: usize) -> Vec<FieldDescriptor> {
    (0..4)
        .map(|bucket| {
            FieldDescriptor::new(format!("{kind} Bucket Counter {bucket}"), offset + bucket * 16, 16)
                .with_key(format!("{kind} Bucket Counter: Bucket {bucket}"))
                .with_requirement(format!("LMDATA-{}", requirement + bucket))
                .with_child(Layout::bytes(vec![
                    counter("Read Command Counter", "Read", 12),
                    counter("Write Command Counter", "Write", 8),
                    counter("De-Allocate/TRIM Command Counter", "Trim", 4),
                    FieldDescriptor::new("Reserved", 0, 4).verbose_only(),
                ]))
        })
        .collect()
}

fn counter(label: &str, key: &str, offset: usize) -> FieldDescriptor {
    FieldDescriptor::new(label, offset, 4)
        .with_key(key)
        .with_display(DisplayFormat::Decimal)
        .with_output(OutputFormat::Decimal)
}

/// Four 24-byte time stamp records. Bucket 0 sits at the highest offset and
/// each following bucket 24 bytes below it.
fn latency_stamps(kind: &str, bucket0: usize, requirement: &str) -> Vec<FieldDescriptor> {
    ["a", "b", "c", "d"]
        .into_iter()
        .enumerate()
        .map(|(bucket, suffix)| {
            FieldDescriptor::new(
                format!("{kind} Latency Stamp - Bucket {bucket}"),
                bucket0 - bucket * 24,
                24,
            )
            .with_key(format!("{kind} Latency Time Stamp: Bucket {bucket}"))
            .with_requirement(format!("LMDATA-{requirement}{suffix}"))
            .with_child(Layout::bytes(vec![
                stamp("Read", "Read", 16),
                stamp("Write", "Write", 8),
                stamp("De-Allocate/TRIM", "Trim", 0),
            ]))
        })
        .collect()
}

fn stamp(label: &str, key: &str, offset: usize) -> FieldDescriptor {
    FieldDescriptor::new(label, offset, 8)
        .with_key(key)
        .with_output(OutputFormat::Timestamp)
        .with_child(timestamp())
}

/// Timestamp structure from the NVMe Timestamp feature.
fn timestamp() -> Layout {
    Layout::bits(vec![
        FieldDescriptor::new("Timestamp", 0, 48).with_display(DisplayFormat::Timestamp),
        FieldDescriptor::new("Timestamp Origin", 49, 3),
        FieldDescriptor::new("Synch", 48, 1),
        FieldDescriptor::new("Reserved", 52, 12).verbose_only(),
    ])
}

/// Four 6-byte measured latency records, laid out like the stamps.
fn measured_latencies(kind: &str, bucket0: usize, requirement: &str) -> Vec<FieldDescriptor> {
    ["a", "b", "c", "d"]
        .into_iter()
        .enumerate()
        .map(|(bucket, suffix)| {
            FieldDescriptor::new(
                format!("{kind} Measured Latency - Bucket {bucket}"),
                bucket0 - bucket * 6,
                6,
            )
            .with_key(format!("{kind} Measured Latency: Bucket {bucket}"))
            .with_requirement(format!("LMDATA-{requirement}{suffix}"))
            .with_child(Layout::bytes(vec![
                latency("Read", "Read", 4),
                latency("Write", "Write", 2),
                latency("De-Allocate/TRIM", "Trim", 0),
            ]))
        })
        .collect()
}

fn latency(label: &str, key: &str, offset: usize) -> FieldDescriptor {
    FieldDescriptor::new(label, offset, 2)
        .with_key(key)
        .with_display(DisplayFormat::OneMs)
        .with_output(OutputFormat::Decimal)
}

/// Two-byte bitmap with one bit per bucket and command type.
///
/// The static stamp units bitmap shows its bucket 2 read bit as a decimal.
fn bucket_bitmap(
    label: &str,
    key: &str,
    requirement: &str,
    offset: usize,
    decimal_bucket2_read: bool,
) -> FieldDescriptor {
    let mut bits = vec![FieldDescriptor::new("Reserved", 12, 4).verbose_only()];
    for bucket in 0..4 {
        for (i, op) in ["Read", "Write", "Deallocate/TRIM"].into_iter().enumerate() {
            let mut bit = FieldDescriptor::new(format!("Bucket {bucket} {op}"), bucket * 3 + i, 1);
            if decimal_bucket2_read && bucket == 2 && i == 0 {
                bit = bit.with_display(DisplayFormat::Decimal);
            }
            bits.push(bit);
        }
    }

    FieldDescriptor::new(label, offset, 2)
        .with_key(key)
        .with_requirement(requirement)
        .with_output(OutputFormat::Decimal)
        .with_child(Layout::bits(bits))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::field::Granularity;

    #[test]
    fn test_ocp2_fits_log_page() {
        assert!(ocp2().check(OCP2_LOG_LEN).is_ok());
        assert_eq!(ocp2().required_len(), Some(OCP2_LOG_LEN));
    }

    #[test]
    fn test_ocp2_is_shared() {
        assert!(std::ptr::eq(ocp2(), ocp2()));
    }

    #[test]
    fn test_ocp2_field_count() {
        assert_eq!(ocp2().granularity, Granularity::Byte);
        assert_eq!(ocp2().fields.len(), 52);
    }

    #[test]
    fn test_ocp2_requirements_unique() {
        let mut seen = HashSet::new();
        for field in &ocp2().fields {
            let id = field.requirement.as_deref().unwrap();
            assert!(seen.insert(id), "duplicate requirement {id}");
        }
    }

    #[test]
    fn test_ocp2_output_keys_unique() {
        let mut seen = HashSet::new();
        for key in ocp2().fields.iter().filter_map(|f| f.output_key.as_deref()) {
            assert!(seen.insert(key), "duplicate output key {key}");
        }
    }

    #[test]
    fn test_ocp2_reserved_fields_are_verbose_only() {
        for field in ocp2().fields.iter().filter(|f| f.label == "Reserved") {
            assert!(field.verbose_only);
            assert!(field.output_key.is_none());
        }
    }

    #[test]
    fn test_ocp2_bucket_counter_offsets() {
        for bucket in 0..4u8 {
            let key = active_bucket_counter_key(bucket);
            let field = ocp2()
                .fields
                .iter()
                .find(|f| f.output_key.as_deref() == Some(key.as_str()))
                .unwrap();
            assert_eq!(field.offset, 32 + bucket as usize * 16);
            assert_eq!(field.size, 16);
        }
    }

    #[test]
    fn test_ocp2_stamp_offsets() {
        let offsets: Vec<usize> = ocp2()
            .fields
            .iter()
            .filter(|f| f.label.starts_with("Static Latency Stamp - Bucket"))
            .map(|f| f.offset)
            .collect();
        assert_eq!(offsets, vec![376, 352, 328, 304]);
    }
}
