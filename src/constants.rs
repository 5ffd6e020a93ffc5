use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use dirs;

/// Session cache directory name under the user's cache directory
pub const CACHE_DIR_NAME: &str = "chai";

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS configuration file name
pub const AWS_CONFIG_FILE_NAME: &str = "config";

/// AWS credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// Profile used when neither --profile nor AWS_PROFILE is given
pub const DEFAULT_PROFILE: &str = "default";

/// Version field of the credential_process JSON contract
pub const CREDENTIAL_PROCESS_VERSION: u32 = 1;

/// Credentials closer than this to expiry are refreshed before emission
pub const REFRESH_MARGIN_MINUTES: i64 = 10;

/// Minimum AssumeRole session duration in seconds
pub const MIN_ROLE_DURATION_SECS: i32 = 900;

/// Maximum AssumeRole session duration in seconds
pub const MAX_ROLE_DURATION_SECS: i32 = 43200;

/// Default AssumeRole session duration in seconds
pub const DEFAULT_ROLE_DURATION_SECS: i32 = 3600;

/// Default AWS region for STS and SSO operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Upper bound for a single STS, SSO or IMDS network call
pub const EXTERNAL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit status when the process is interrupted by Ctrl-C
pub const INTERRUPT_EXIT_CODE: u8 = 130;

/// Get the profile name to resolve
/// Respects AWS_PROFILE environment variable if set, otherwise "default"
pub fn default_profile() -> String {
    env::var("AWS_PROFILE")
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Get the AWS config file path
/// Respects AWS_CONFIG_FILE environment variable if set
pub fn get_aws_config_path() -> Option<PathBuf> {
    // Check environment variable first
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    // Use default AWS config location
    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CONFIG_FILE_NAME))
}

/// Get the AWS credentials file path
/// Respects AWS_SHARED_CREDENTIALS_FILE environment variable if set
pub fn get_aws_credentials_path() -> Option<PathBuf> {
    // Check environment variable first
    if let Ok(path) = env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return Some(PathBuf::from(path));
    }

    // Use default AWS credentials location
    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join(AWS_CREDENTIALS_FILE_NAME))
}

/// Get the directory where `aws sso login` caches access tokens
pub fn get_sso_token_cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(AWS_CONFIG_DIR_NAME).join("sso").join("cache"))
}

/// Get the session cache directory
/// Precedence: explicit override, CHAI_CACHE_DIR, then the platform cache directory
pub fn get_cache_dir(override_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = override_dir {
        return Some(dir.to_path_buf());
    }

    if let Ok(dir) = env::var("CHAI_CACHE_DIR") {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }

    dirs::cache_dir().map(|cache| cache.join(CACHE_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_profile_from_env() {
        let original = env::var("AWS_PROFILE").ok();

        unsafe {
            env::set_var("AWS_PROFILE", "staging");
        }
        assert_eq!(default_profile(), "staging");

        unsafe {
            env::set_var("AWS_PROFILE", "");
        }
        assert_eq!(default_profile(), DEFAULT_PROFILE);

        unsafe {
            env::remove_var("AWS_PROFILE");
        }
        assert_eq!(default_profile(), DEFAULT_PROFILE);

        unsafe {
            if let Some(val) = original {
                env::set_var("AWS_PROFILE", val);
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_aws_config_path_with_env() {
        let original = env::var("AWS_CONFIG_FILE").ok();

        unsafe {
            env::set_var("AWS_CONFIG_FILE", "/custom/aws/config");
        }
        let path = get_aws_config_path();
        assert_eq!(path, Some(PathBuf::from("/custom/aws/config")));

        unsafe {
            match original {
                Some(val) => env::set_var("AWS_CONFIG_FILE", val),
                None => env::remove_var("AWS_CONFIG_FILE"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_aws_config_path_default() {
        let original = env::var("AWS_CONFIG_FILE").ok();

        unsafe {
            env::remove_var("AWS_CONFIG_FILE");
        }
        let path = get_aws_config_path();

        if let Some(p) = path {
            let path_str = p.to_string_lossy();
            assert!(path_str.contains(AWS_CONFIG_DIR_NAME));
            assert!(path_str.contains(AWS_CONFIG_FILE_NAME));
        }

        unsafe {
            if let Some(val) = original {
                env::set_var("AWS_CONFIG_FILE", val);
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_aws_credentials_path_with_env() {
        let original = env::var("AWS_SHARED_CREDENTIALS_FILE").ok();

        unsafe {
            env::set_var("AWS_SHARED_CREDENTIALS_FILE", "/custom/path/credentials");
        }
        let path = get_aws_credentials_path();
        assert_eq!(path, Some(PathBuf::from("/custom/path/credentials")));

        unsafe {
            match original {
                Some(val) => env::set_var("AWS_SHARED_CREDENTIALS_FILE", val),
                None => env::remove_var("AWS_SHARED_CREDENTIALS_FILE"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_aws_credentials_path_default() {
        let original = env::var("AWS_SHARED_CREDENTIALS_FILE").ok();

        unsafe {
            env::remove_var("AWS_SHARED_CREDENTIALS_FILE");
        }
        let path = get_aws_credentials_path();

        if let Some(p) = path {
            let path_str = p.to_string_lossy();
            assert!(path_str.contains(AWS_CONFIG_DIR_NAME));
            assert!(path_str.contains(AWS_CREDENTIALS_FILE_NAME));
        }

        unsafe {
            if let Some(val) = original {
                env::set_var("AWS_SHARED_CREDENTIALS_FILE", val);
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_cache_dir_override_wins() {
        let original = env::var("CHAI_CACHE_DIR").ok();

        unsafe {
            env::set_var("CHAI_CACHE_DIR", "/from/env");
        }
        let path = get_cache_dir(Some(Path::new("/from/flag")));
        assert_eq!(path, Some(PathBuf::from("/from/flag")));

        unsafe {
            match original {
                Some(val) => env::set_var("CHAI_CACHE_DIR", val),
                None => env::remove_var("CHAI_CACHE_DIR"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_cache_dir_from_env() {
        let original = env::var("CHAI_CACHE_DIR").ok();

        unsafe {
            env::set_var("CHAI_CACHE_DIR", "/custom/cache");
        }
        let path = get_cache_dir(None);
        assert_eq!(path, Some(PathBuf::from("/custom/cache")));

        unsafe {
            match original {
                Some(val) => env::set_var("CHAI_CACHE_DIR", val),
                None => env::remove_var("CHAI_CACHE_DIR"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_get_cache_dir_default() {
        let original = env::var("CHAI_CACHE_DIR").ok();

        unsafe {
            env::remove_var("CHAI_CACHE_DIR");
        }
        let path = get_cache_dir(None);

        if let Some(p) = path {
            assert!(p.to_string_lossy().contains(CACHE_DIR_NAME));
        }

        unsafe {
            if let Some(val) = original {
                env::set_var("CHAI_CACHE_DIR", val);
            }
        }
    }
}
