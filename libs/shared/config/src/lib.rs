use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_CHAIR_COUNT: u32 = 3;
pub const DEFAULT_CHAIR_DAILY_CAPACITY: u32 = 8;
pub const DEFAULT_DOCTOR_DAILY_CAPACITY: u32 = 10;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub record_store_url: String,
    pub record_store_anon_key: String,
    /// Server credential for the clinic's own tables; user tokens are
    /// forwarded for patient and payment records instead.
    pub record_store_service_key: String,
    pub jwt_secret: String,
    pub chair_count: u32,
    pub chair_daily_capacity: u32,
    pub doctor_daily_capacity: u32,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            record_store_url: String::new(),
            record_store_anon_key: String::new(),
            record_store_service_key: String::new(),
            jwt_secret: String::new(),
            chair_count: DEFAULT_CHAIR_COUNT,
            chair_daily_capacity: DEFAULT_CHAIR_DAILY_CAPACITY,
            doctor_daily_capacity: DEFAULT_DOCTOR_DAILY_CAPACITY,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            record_store_url: env::var("RECORD_STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("RECORD_STORE_URL not set, using empty value");
                    String::new()
                }),
            record_store_anon_key: env::var("RECORD_STORE_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("RECORD_STORE_ANON_KEY not set, using empty value");
                    String::new()
                }),
            record_store_service_key: env::var("RECORD_STORE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("RECORD_STORE_SERVICE_KEY not set, clinic tables use the anon key only");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            chair_count: numeric_var("CLINIC_CHAIR_COUNT", DEFAULT_CHAIR_COUNT),
            chair_daily_capacity: numeric_var("CHAIR_DAILY_CAPACITY", DEFAULT_CHAIR_DAILY_CAPACITY),
            doctor_daily_capacity: numeric_var("DOCTOR_DAILY_CAPACITY", DEFAULT_DOCTOR_DAILY_CAPACITY),
            port: numeric_var("API_PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.record_store_url.is_empty()
            && !self.record_store_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

fn numeric_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
