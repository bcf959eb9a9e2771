use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as integer epoch seconds.
///
/// The state machine and the queue do all their math on epoch seconds;
/// callers that need a wall-clock timestamp for display convert via chrono.
pub fn epoch_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Strip trailing whitespace and newlines from a fetched value in place.
///
/// Remote getters tend to append `\r\n` or padding; if left in, numeric
/// coercion of an otherwise valid value fails.
pub fn rtrim_value(value: &mut String) {
    let trimmed = value.trim_end_matches(['\r', '\n', '\t', ' ']).len();
    value.truncate(trimmed);
}

/// Split an item key of the form `name[arg1,arg2,...]` into its name and
/// argument list. A key without brackets has no arguments. Returns `None`
/// for malformed keys (unbalanced bracket, empty name).
pub fn parse_item_key(key: &str) -> Option<(&str, Vec<&str>)> {
    match key.find('[') {
        None => {
            if key.is_empty() {
                None
            } else {
                Some((key, Vec::new()))
            }
        }
        Some(open) => {
            if open == 0 || !key.ends_with(']') {
                return None;
            }
            let name = &key[..open];
            let args = &key[open + 1..key.len() - 1];
            Some((name, args.split(',').map(str::trim).collect()))
        }
    }
}

/// Initialize tracing with an env-filter, for embedding daemons and tests.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
