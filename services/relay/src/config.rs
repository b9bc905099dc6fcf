use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Persona prompt used when `SYSTEM_INSTRUCTIONS` is not set.
const DEFAULT_INSTRUCTIONS: &str = "You are a helpful and friendly AI assistant \
on a phone call. Keep your answers short and conversational, one or two \
sentences unless the caller asks for more detail.";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Public base URL of this service, used for the Twilio callback and
    /// the media-stream WebSocket URL embedded in TwiML.
    pub server_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    /// Fallback destination number for `/call` requests without a `to`.
    pub default_call_to: Option<String>,
    pub openai_api_key: String,
    /// Realtime voice name: alloy, ash, ballad, coral, echo, sage,
    /// shimmer or verse. Unknown values fall back to alloy.
    pub voice: String,
    pub system_instructions: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let server_url = std::env::var("SERVER_URL")
            .map_err(|_| ConfigError::MissingVar("SERVER_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let twilio_account_sid = std::env::var("TWILIO_ACCOUNT_SID")
            .map_err(|_| ConfigError::MissingVar("TWILIO_ACCOUNT_SID".to_string()))?;
        let twilio_auth_token = std::env::var("TWILIO_AUTH_TOKEN")
            .map_err(|_| ConfigError::MissingVar("TWILIO_AUTH_TOKEN".to_string()))?;
        let twilio_phone_number = std::env::var("TWILIO_PHONE_NUMBER")
            .map_err(|_| ConfigError::MissingVar("TWILIO_PHONE_NUMBER".to_string()))?;
        let default_call_to = std::env::var("DEFAULT_CALL_TO").ok();

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;

        let voice = std::env::var("VOICE").unwrap_or_else(|_| "alloy".to_string());
        let system_instructions = std::env::var("SYSTEM_INSTRUCTIONS")
            .unwrap_or_else(|_| DEFAULT_INSTRUCTIONS.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            server_url,
            twilio_account_sid,
            twilio_auth_token,
            twilio_phone_number,
            default_call_to,
            openai_api_key,
            voice,
            system_instructions,
            log_level,
        })
    }

    /// WebSocket URL Twilio should stream call audio to.
    pub fn stream_url(&self) -> String {
        let base = self
            .server_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/media-stream", base)
    }

    /// URL Twilio fetches TwiML from once an outbound call is answered.
    pub fn twiml_url(&self) -> String {
        format!("{}/twiml", self.server_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("SERVER_URL");
            env::remove_var("TWILIO_ACCOUNT_SID");
            env::remove_var("TWILIO_AUTH_TOKEN");
            env::remove_var("TWILIO_PHONE_NUMBER");
            env::remove_var("DEFAULT_CALL_TO");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("VOICE");
            env::remove_var("SYSTEM_INSTRUCTIONS");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("SERVER_URL", "https://relay.example.com");
            env::set_var("TWILIO_ACCOUNT_SID", "AC-test");
            env::set_var("TWILIO_AUTH_TOKEN", "token-test");
            env::set_var("TWILIO_PHONE_NUMBER", "+15550000000");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.server_url, "https://relay.example.com");
        assert_eq!(config.twilio_account_sid, "AC-test");
        assert_eq!(config.twilio_phone_number, "+15550000000");
        assert_eq!(config.default_call_to, None);
        assert_eq!(config.openai_api_key, "test-openai-key");
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.system_instructions, DEFAULT_INSTRUCTIONS);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("DEFAULT_CALL_TO", "+15551112222");
            env::set_var("VOICE", "echo");
            env::set_var("SYSTEM_INSTRUCTIONS", "Be terse.");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.default_call_to, Some("+15551112222".to_string()));
        assert_eq!(config.voice, "echo");
        assert_eq!(config.system_instructions, "Be terse.");
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_strips_trailing_slash_from_server_url() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("SERVER_URL", "https://relay.example.com/");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.server_url, "https://relay.example.com");
        assert_eq!(config.twiml_url(), "https://relay.example.com/twiml");
    }

    #[test]
    #[serial]
    fn test_stream_url_uses_wss_scheme() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(
            config.stream_url(),
            "wss://relay.example.com/media-stream"
        );
    }

    #[test]
    #[serial]
    fn test_config_missing_twilio_credentials() {
        clear_env_vars();
        unsafe {
            env::set_var("SERVER_URL", "https://relay.example.com");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(var) => assert_eq!(var, "TWILIO_ACCOUNT_SID"),
            _ => panic!("Expected MissingVar for TWILIO_ACCOUNT_SID"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_openai_key() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::remove_var("OPENAI_API_KEY");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(var) => assert_eq!(var, "OPENAI_API_KEY"),
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }
}
