use crate::auth::jwt::JwtConfig;

/// Where match state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    /// Process-local tables. State is lost on restart. Account signup lives
    /// outside this service, so `seed_users` are registered (subscribed) at
    /// startup to have someone to match.
    Memory { seed_users: Vec<String> },
}

impl StoreBackend {
    /// `MATCH_STORE=memory` selects the in-memory store, seeded from the
    /// comma-separated `MEMORY_SEED_USERS`; otherwise `DATABASE_URL` is
    /// required.
    ///
    /// # Panics
    ///
    /// Panics if neither is configured.
    pub fn from_env() -> Self {
        match std::env::var("MATCH_STORE").ok().as_deref() {
            Some("memory") => Self::Memory {
                seed_users: parse_list(&std::env::var("MEMORY_SEED_USERS").unwrap_or_default()),
            },
            Some("postgres") | None => Self::Postgres {
                database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            },
            Some(other) => panic!("MATCH_STORE must be 'memory' or 'postgres', got '{other}'"),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret and store have defaults suitable for
/// local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks to drain (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub store: StoreBackend,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `MATCH_STORE`          | `postgres`                 |
    /// | `MEMORY_SEED_USERS`    | empty                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            store: StoreBackend::from_env(),
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_entries_are_trimmed_and_blanks_dropped() {
        assert_eq!(
            parse_list(" http://a.test ,, http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn empty_seed_list_parses_to_nothing() {
        assert!(parse_list("").is_empty());
        assert_eq!(parse_list("Asha, Bilal"), vec!["Asha".to_string(), "Bilal".to_string()]);
    }
}
