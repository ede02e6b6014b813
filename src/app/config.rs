/// Centralized environment configuration.
/// All env vars and defaults are defined here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL. Required.
    pub database_url: String,

    /// Address the HTTP server binds to.
    /// Default: 0.0.0.0:3000
    pub bind_addr: String,

    /// Header the auth gateway forwards the verified subject id in.
    /// Default: x-auth-subject
    pub subject_header: String,
}

impl Config {
    /// Build config from environment variables.
    /// Returns an error if required vars are missing.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in .env")?;

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let subject_header =
            std::env::var("SUBJECT_HEADER").unwrap_or_else(|_| "x-auth-subject".to_string());

        Ok(Self {
            database_url,
            bind_addr,
            subject_header,
        })
    }

    /// Config for tests. Uses in-memory database URL and the default header.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            subject_header: "x-auth-subject".to_string(),
        }
    }
}
