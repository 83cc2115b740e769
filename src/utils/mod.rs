use std::fs::Metadata;
use std::time::UNIX_EPOCH;

pub fn format_number(num: usize) -> String {
    let digits = num.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}

/// Modification time in Unix seconds, 0 when the platform cannot tell.
pub fn modified_timestamp(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}
