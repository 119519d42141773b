use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Last path or namespace segment of an identifier (`src/app/main.rs` → `main.rs`,
/// `a::b::run` → `run`).
pub fn short_name(id: &str) -> &str {
    id.rsplit(|c: char| c == '/' || c == ':')
        .find(|segment| !segment.is_empty())
        .unwrap_or(id)
}

pub fn format_count(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 10_000 {
        format!("{:.1}k", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}

/// Deterministic pseudo-random pair in `[-1, 1]` derived from an identifier.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_takes_last_segment() {
        assert_eq!(short_name("src/app/main.rs"), "main.rs");
        assert_eq!(short_name("a::b::run"), "run");
        assert_eq!(short_name("a:fn1"), "fn1");
        assert_eq!(short_name("plain"), "plain");
        assert_eq!(short_name("trailing/"), "trailing");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("src/lib.rs");
        let second = stable_pair("src/lib.rs");
        assert_eq!(first, second);
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }

    #[test]
    fn format_count_compacts_large_values() {
        assert_eq!(format_count(42), "42");
        assert_eq!(format_count(12_500), "12.5k");
        assert_eq!(format_count(3_200_000), "3.2M");
    }
}
