use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub firebase: FirebaseConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub tokens_collection: String,
}

#[derive(Debug, Clone, Default)]
pub struct FirebaseConfig {
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
}

/// Service-account credentials, available once all three values are set.
#[derive(Debug, Clone)]
pub struct FirebaseCredentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl Config {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(5000),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string()),
                tokens_collection: env::var("TOKENS_COLLECTION")
                    .unwrap_or_else(|_| "tokens".to_string()),
            },
            firebase: FirebaseConfig {
                project_id: non_empty_var("FIREBASE_PROJECT_ID"),
                client_email: non_empty_var("FIREBASE_CLIENT_EMAIL"),
                private_key: non_empty_var("FIREBASE_PRIVATE_KEY").map(|k| unescape_private_key(&k)),
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// True when the token store should live in process memory instead of redis.
    pub fn uses_memory_store(&self) -> bool {
        self.database.url.starts_with("memory:")
    }
}

impl FirebaseConfig {
    pub fn credentials(&self) -> Option<FirebaseCredentials> {
        Some(FirebaseCredentials {
            project_id: self.project_id.clone()?,
            client_email: self.client_email.clone()?,
            private_key: self.private_key.clone()?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Env files usually carry the PEM key on one line with literal `\n` escapes.
pub fn unescape_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
