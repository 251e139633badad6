//! Line format for the file sink.
//!
//! One record per line: `timestamp \t action \t actor \t details \n`.
//! Inside a field, `\` is written as `\\`, TAB as `\t`, LF as `\n` and CR as
//! `\r`, so a field can never split a line or shift the columns.

use chrono::{DateTime, Utc};

use luno_audit::{AuditError, AuditRecord};

const FIELD_COUNT: usize = 4;

/// Render a record as one newline-terminated line.
pub fn encode_line(record: &AuditRecord) -> String {
    let mut line = String::with_capacity(
        32 + record.action().len() + record.actor().len() + record.details().len(),
    );
    line.push_str(&record.timestamp_string());
    for field in [record.action(), record.actor(), record.details()] {
        line.push('\t');
        escape_into(field, &mut line);
    }
    line.push('\n');
    line
}

/// Render a whole batch as consecutive lines, in batch order.
pub fn encode_batch(batch: &[AuditRecord]) -> String {
    batch.iter().map(encode_line).collect()
}

/// Parse a line produced by [`encode_line`]. A trailing newline is optional.
pub fn decode_line(line: &str) -> Result<AuditRecord, AuditError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(AuditError::Serialization(format!(
            "expected {FIELD_COUNT} tab-separated fields, found {}",
            fields.len()
        )));
    }

    let timestamp = DateTime::parse_from_rfc3339(fields[0])
        .map_err(|e| AuditError::Serialization(format!("invalid timestamp {:?}: {e}", fields[0])))?
        .with_timezone(&Utc);

    Ok(AuditRecord::with_timestamp(
        timestamp,
        unescape(fields[1])?,
        unescape(fields[2])?,
        unescape(fields[3])?,
    ))
}

fn escape_into(field: &str, out: &mut String) {
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
}

fn unescape(field: &str) -> Result<String, AuditError> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                return Err(AuditError::Serialization(format!(
                    "unknown escape sequence \\{other}"
                )));
            }
            None => {
                return Err(AuditError::Serialization(
                    "dangling escape at end of field".to_owned(),
                ));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(action: &str, actor: &str, details: &str) -> AuditRecord {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        AuditRecord::with_timestamp(ts, action, actor, details)
    }

    #[test]
    fn plain_fields_are_written_verbatim() {
        let line = encode_line(&at("A1", "U1", "D1"));
        assert_eq!(line, "2025-06-01T12:00:00.000000Z\tA1\tU1\tD1\n");
    }

    #[test]
    fn separators_inside_fields_are_escaped() {
        let record = at("Place\tOrder", "key\n1", "C:\\tmp\r\nvolume=1");
        let line = encode_line(&record);

        assert_eq!(line.matches('\t').count(), 3);
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
        assert!(!line.contains('\r'));
        assert_eq!(decode_line(&line).unwrap(), record);
    }

    #[test]
    fn empty_fields_survive() {
        let record = at("GetBalances", "key-1", "");
        let line = encode_line(&record);
        assert!(line.ends_with("\tGetBalances\tkey-1\t\n"));
        assert_eq!(decode_line(&line).unwrap(), record);
    }

    #[test]
    fn freshly_stamped_records_decode_to_themselves() {
        let record = AuditRecord::new("PostLimitOrder", "key-7", "pair=XBTZAR\tvolume=0.1");
        assert_eq!(decode_line(&encode_line(&record)).unwrap(), record);
    }

    #[test]
    fn batch_is_its_lines_in_order() {
        let batch = [at("A", "U", "1"), at("B", "U", "2\n")];
        let encoded = encode_batch(&batch);
        assert_eq!(encoded, encode_line(&batch[0]) + &encode_line(&batch[1]));
        assert_eq!(encoded.lines().count(), 2);
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let err = decode_line("2025-06-01T12:00:00Z\tA\tU").unwrap_err();
        assert!(matches!(err, AuditError::Serialization(_)));
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let err = decode_line("yesterday\tA\tU\tD").unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn bad_escapes_are_rejected() {
        assert!(decode_line("2025-06-01T12:00:00Z\tA\\x\tU\tD").is_err());
        assert!(decode_line("2025-06-01T12:00:00Z\tA\tU\tD\\").is_err());
    }
}
