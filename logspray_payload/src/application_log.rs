//! Application log payload.
//!
//! Mimics the shape of records an application fleet would emit toward a log
//! ingest API: a severity, a templated human-readable message, an origin
//! service and a small map of request metadata.

use rand::seq::IndexedRandom;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Generator, common};

const SOURCES: [&str; 5] = [
    "app-server",
    "web-server",
    "database",
    "cache",
    "auth-service",
];

const LEVELS: [Level; 4] = [Level::Info, Level::Warn, Level::Error, Level::Debug];

/// The kind of token substituted into a message template.
#[derive(Debug, Clone, Copy)]
enum Token {
    /// Template is returned verbatim.
    None,
    /// A short random alphanumeric string.
    Str,
    /// A random integer below 1,000.
    Int,
    /// A random float below 4.0.
    Float,
}

// Message templates as (prefix, token, suffix) triples.
const TEMPLATES: [(&str, Token, &str); 10] = [
    ("User logged in successfully", Token::None, ""),
    ("Failed to connect to database", Token::None, ""),
    ("Cache miss for key: ", Token::Str, ""),
    ("Request processed in ", Token::Int, "ms"),
    ("Memory usage at ", Token::Int, "%"),
    ("CPU load average: ", Token::Float, ""),
    ("Network latency: ", Token::Int, "ms"),
    ("Authentication failed for user: ", Token::Str, ""),
    ("Rate limit exceeded for IP: ", Token::Str, ""),
    ("Successfully processed batch of ", Token::Int, " items"),
];

/// Record severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Informational.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
    /// Debug.
    Debug,
}

/// One synthetic log record.
///
/// Created once by [`ApplicationLog::generate`] and never mutated after;
/// ownership moves along the dispatch pipeline with the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Record severity.
    pub level: Level,
    /// Human-readable message, built from a fixed template set.
    pub message: String,
    /// The service that nominally emitted this record.
    pub source: String,
    /// Creation time of the record.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Request metadata. Always exactly five keys: `host`, `region`,
    /// `instance_id`, `request_id`, `response_time`.
    pub metadata: FxHashMap<String, String>,
}

/// Generator for [`LogRecord`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationLog {}

impl ApplicationLog {
    /// Create a new instance of `ApplicationLog`.
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }
}

fn message<R>(rng: &mut R) -> String
where
    R: rand::Rng + ?Sized,
{
    let (prefix, token, suffix) = TEMPLATES.choose(rng).expect("template set is non-empty");
    match token {
        Token::None => (*prefix).to_owned(),
        Token::Str => {
            let s = common::random_token(rng, 8);
            format!("{prefix}{s}{suffix}")
        }
        Token::Int => {
            let n = rng.random_range(0..1_000_u32);
            format!("{prefix}{n}{suffix}")
        }
        Token::Float => {
            let f = rng.random::<f64>() * 4.0;
            format!("{prefix}{f:.2}{suffix}")
        }
    }
}

fn metadata<R>(rng: &mut R) -> FxHashMap<String, String>
where
    R: rand::Rng + ?Sized,
{
    let mut map = FxHashMap::default();
    map.insert(
        "host".to_owned(),
        format!("server-{}", rng.random_range(1..=5_u8)),
    );
    map.insert(
        "region".to_owned(),
        format!("region-{}", rng.random_range(1..=3_u8)),
    );
    map.insert(
        "instance_id".to_owned(),
        common::random_token(rng, 10),
    );
    map.insert("request_id".to_owned(), Uuid::new_v4().to_string());
    map.insert(
        "response_time".to_owned(),
        rng.random_range(0..500_u32).to_string(),
    );
    map
}

impl Generator for ApplicationLog {
    type Output = LogRecord;

    fn generate<R>(&self, rng: &mut R) -> Self::Output
    where
        R: rand::Rng + ?Sized,
    {
        LogRecord {
            level: *LEVELS.choose(rng).expect("level set is non-empty"),
            message: message(rng),
            source: (*SOURCES.choose(rng).expect("source set is non-empty")).to_owned(),
            timestamp: OffsetDateTime::now_utc(),
            metadata: metadata(rng),
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::SmallRng};
    use time::OffsetDateTime;

    use super::{ApplicationLog, LEVELS, SOURCES, TEMPLATES};
    use crate::Generator;

    const METADATA_KEYS: [&str; 5] = [
        "host",
        "region",
        "instance_id",
        "request_id",
        "response_time",
    ];

    // Every generated record draws level and source from the fixed closed
    // sets and carries exactly the five metadata keys.
    proptest! {
        #[test]
        fn record_fields_from_closed_sets(seed: u64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generator = ApplicationLog::new();

            let record = generator.generate(&mut rng);

            prop_assert!(LEVELS.contains(&record.level));
            prop_assert!(SOURCES.contains(&record.source.as_str()));
            prop_assert_eq!(record.metadata.len(), METADATA_KEYS.len());
            for key in METADATA_KEYS {
                prop_assert!(record.metadata.contains_key(key), "missing key {}", key);
            }
        }
    }

    // Every message is derived from one of the templates: it must match some
    // template's prefix and suffix.
    proptest! {
        #[test]
        fn message_matches_a_template(seed: u64) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let generator = ApplicationLog::new();

            let record = generator.generate(&mut rng);
            let matched = TEMPLATES.iter().any(|(prefix, _, suffix)| {
                record.message.starts_with(prefix) && record.message.ends_with(suffix)
            });
            prop_assert!(matched, "unexpected message: {}", record.message);
        }
    }

    #[test]
    fn timestamp_not_earlier_than_call() {
        let mut rng = SmallRng::seed_from_u64(0);
        let generator = ApplicationLog::new();

        let before = OffsetDateTime::now_utc();
        let record = generator.generate(&mut rng);
        assert!(record.timestamp >= before);
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let mut rng = SmallRng::seed_from_u64(7);
        let generator = ApplicationLog::new();

        let record = generator.generate(&mut rng);
        let value =
            serde_json::to_value(&record).expect("record must serialize");
        let object = value.as_object().expect("record serializes to an object");

        for field in ["level", "message", "source", "timestamp", "metadata"] {
            assert!(object.contains_key(field), "missing field {field}");
        }
        let level = object["level"].as_str().expect("level is a string");
        assert!(["INFO", "WARN", "ERROR", "DEBUG"].contains(&level));
    }
}
