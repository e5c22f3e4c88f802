// src/config.rs

use std::env;
use std::net::SocketAddr;

use chrono::TimeDelta;
use dotenvy::dotenv;

/// Attempts a student may use before the cooldown applies.
pub const MAX_ATTEMPTS: usize = 3;

/// Wait imposed after the attempt quota is exhausted, in minutes (3 hours).
pub const COOLDOWN_MINUTES: i64 = 180;

/// Minimum percentage needed to pass an exam.
pub const PASS_THRESHOLD_PERCENT: i64 = 60;

/// Subjects averaging at least this percentage are reported as strong.
pub const STRONG_SUBJECT_PERCENT: i64 = 75;

/// Number of submissions shown in the teacher's live feed.
pub const RECENT_FEED_LIMIT: usize = 10;

/// Subject catalogue seeded at start-up.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Computer Fundamentals",
    "Programming Basics",
    "Data Structures",
    "Algorithms",
    "Object Oriented Programming",
    "Web Development",
    "Databases",
    "SQL",
    "Operating Systems",
    "Computer Networks",
    "Software Engineering",
    "Cyber Security",
    "Machine Learning",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When absent the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub max_attempts: usize,
    pub cooldown_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let max_attempts = env::var("MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MAX_ATTEMPTS);

        let cooldown_minutes =
            parse_cooldown(env::var("ATTEMPT_COOLDOWN_MINUTES").ok().as_deref());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            max_attempts,
            cooldown_minutes,
        }
    }
}

/// Cooldown in minutes from its raw setting. Anything unparsable, negative or
/// beyond what `TimeDelta` can hold falls back to `COOLDOWN_MINUTES`.
fn parse_cooldown(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|minutes| *minutes >= 0 && TimeDelta::try_minutes(*minutes).is_some())
        .unwrap_or(COOLDOWN_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_accepts_in_range_minutes() {
        assert_eq!(parse_cooldown(Some("90")), 90);
        assert_eq!(parse_cooldown(Some(" 0 ")), 0);
    }

    #[test]
    fn cooldown_falls_back_on_bad_values() {
        assert_eq!(parse_cooldown(None), COOLDOWN_MINUTES);
        assert_eq!(parse_cooldown(Some("three hours")), COOLDOWN_MINUTES);
        assert_eq!(parse_cooldown(Some("-5")), COOLDOWN_MINUTES);
        assert_eq!(parse_cooldown(Some(&i64::MAX.to_string())), COOLDOWN_MINUTES);
    }
}
