// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiration_secs: u64,
    pub port: u16,
    pub frontend_url: String,
    pub rust_log: String,
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_issuer = env::var("JWT_ISSUER")
            .unwrap_or_else(|_| "edusync-backend".to_string());

        let jwt_audience = env::var("JWT_AUDIENCE")
            .unwrap_or_else(|_| "edusync-clients".to_string());

        // Tokens follow the 30 minute lifetime the web client expects.
        let jwt_expiration_secs = env::var("JWT_EXPIRATION_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7197);

        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let admin_name = env::var("ADMIN_NAME").ok();
        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiration_secs,
            port,
            frontend_url,
            rust_log,
            admin_name,
            admin_email,
            admin_password,
        }
    }
}
