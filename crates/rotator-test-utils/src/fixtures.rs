//! Configuration fixtures.

use std::collections::HashMap;
use token_rotator::config::Config;

/// Signing secret used by [`test_config`].
pub const TEST_JWT_SECRET: &str = "rotator-test-signing-secret";

/// Variables for a local test deployment: ephemeral health port, three
/// probe attempts two seconds apart.
pub fn test_vars() -> HashMap<String, String> {
    HashMap::from([
        ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
        ("MYSQL_HOST".to_string(), "localhost".to_string()),
        ("HEALTH_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("STARTUP_MAX_ATTEMPTS".to_string(), "3".to_string()),
        ("STARTUP_RETRY_DELAY_SECONDS".to_string(), "2".to_string()),
        ("HEALTH_CHECK_TIMEOUT_SECONDS".to_string(), "1".to_string()),
    ])
}

pub fn test_config() -> Config {
    test_config_with(&[])
}

/// [`test_config`] with some variables replaced.
pub fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars = test_vars();
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    Config::from_vars(&vars).expect("test configuration must be valid")
}
