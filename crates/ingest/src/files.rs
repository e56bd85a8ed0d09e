use std::cmp::Reverse;
use std::collections::HashSet;

use crate::remote::shell_quote;

pub const DEFAULT_LOG_PREFIX: &str = "access_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationSuffix {
    Unsuffixed,
    /// `access_log.N`: larger N holds older content.
    Numeric(u64),
    NonNumeric,
}

pub fn rotation_suffix(name: &str) -> RotationSuffix {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let Some(dot) = file_name.rfind('.') else {
        return RotationSuffix::Unsuffixed;
    };
    let suffix = &file_name[dot + 1..];
    if suffix.is_empty() {
        return RotationSuffix::Unsuffixed;
    }
    if !suffix.bytes().all(|byte| byte.is_ascii_digit()) {
        return RotationSuffix::NonNumeric;
    }
    suffix
        .parse::<u64>()
        .map(RotationSuffix::Numeric)
        .unwrap_or(RotationSuffix::NonNumeric)
}

fn merge_order(name: &str) -> (u8, Reverse<u64>) {
    match rotation_suffix(name) {
        RotationSuffix::Numeric(n) => (0, Reverse(n)),
        RotationSuffix::Unsuffixed | RotationSuffix::NonNumeric => (1, Reverse(0)),
    }
}

/// Orders rotated logs oldest first: `.2`, `.1`, then the live log.
///
/// Names without a usable numeric suffix go last, keeping their listing order. Duplicate
/// names are dropped.
pub fn order_oldest_first<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut ordered = names
        .into_iter()
        .map(Into::into)
        .filter(|name| seen.insert(name.clone()))
        .collect::<Vec<String>>();
    ordered.sort_by_key(|name| merge_order(name));
    ordered
}

pub fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn listing_command(directory: &str, prefix: &str) -> String {
    let directory = directory.trim_end_matches('/');
    let directory = if directory.is_empty() { "/" } else { directory };
    format!("ls -1 {}/{}*", shell_quote(directory), shell_quote(prefix))
}
