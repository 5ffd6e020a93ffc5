use ini::{Ini, Properties};

use crate::constants;
use crate::credentials::Credentials;
use crate::error::ResolveError;

/// Everything the resolver needs to know about one profile, parsed from
/// the AWS config file. Fields that are not configured stay `None`; the
/// provider chain decides what that means.
#[derive(Debug, Clone, Default)]
pub struct ProfileConfig {
    pub profile: String,
    pub region: Option<String>,
    pub static_keys: Option<Credentials>,
    pub role: Option<RoleConfig>,
    pub sso: Option<SsoConfig>,
}

/// An assume-role declaration: `role_arn` plus where the credentials for
/// the AssumeRole call itself come from.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleConfig {
    pub role_arn: String,
    pub source: RoleSource,
    pub external_id: Option<String>,
    pub session_name: Option<String>,
    pub duration_seconds: Option<i32>,
}

/// Where the source credentials for an AssumeRole call come from.
/// Exactly one of `source_profile` and `credential_source` must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSource {
    Profile(String),
    Environment,
    Ec2InstanceMetadata,
}

/// Legacy-format SSO declaration with all parameters inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoConfig {
    pub start_url: String,
    pub region: String,
    pub account_id: String,
    pub role_name: String,
}

impl ProfileConfig {
    pub fn from_ini_section(profile: &str, section: &Properties) -> Result<Self, ResolveError> {
        let get = |key: &str| {
            section
                .get(key)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let static_keys = match (get("aws_access_key_id"), get("aws_secret_access_key")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: get("aws_session_token"),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ResolveError::configuration(format!(
                    "profile '{profile}' sets aws_access_key_id without aws_secret_access_key"
                )));
            }
            (None, Some(_)) => {
                return Err(ResolveError::configuration(format!(
                    "profile '{profile}' sets aws_secret_access_key without aws_access_key_id"
                )));
            }
        };

        let role = match get("role_arn") {
            Some(role_arn) => {
                let duration_seconds = match get("duration_seconds") {
                    Some(raw) => Some(raw.parse().map_err(|_| {
                        ResolveError::configuration(format!(
                            "profile '{profile}' has a non-numeric duration_seconds: {raw}"
                        ))
                    })?),
                    None => None,
                };
                Some(RoleConfig {
                    role_arn,
                    source: role_source(profile, section)?,
                    external_id: get("external_id"),
                    session_name: get("role_session_name"),
                    duration_seconds,
                })
            }
            None => None,
        };

        Ok(Self {
            profile: profile.to_string(),
            region: get("region"),
            static_keys,
            role,
            sso: sso_config(profile, section)?,
        })
    }
}

fn role_source(profile: &str, section: &Properties) -> Result<RoleSource, ResolveError> {
    let source_profile = section.get("source_profile").filter(|v| !v.is_empty());
    let credential_source = section.get("credential_source").filter(|v| !v.is_empty());

    match (source_profile, credential_source) {
        (Some(_), Some(_)) => Err(ResolveError::configuration(format!(
            "profile '{profile}' sets both source_profile and credential_source"
        ))),
        (Some(name), None) => Ok(RoleSource::Profile(name.to_string())),
        (None, Some("Environment")) => Ok(RoleSource::Environment),
        (None, Some("Ec2InstanceMetadata")) => Ok(RoleSource::Ec2InstanceMetadata),
        (None, Some(other)) => Err(ResolveError::configuration(format!(
            "profile '{profile}' has an unsupported credential_source: {other}"
        ))),
        (None, None) => Err(ResolveError::configuration(format!(
            "profile '{profile}' sets role_arn but neither source_profile nor credential_source"
        ))),
    }
}

fn sso_config(profile: &str, section: &Properties) -> Result<Option<SsoConfig>, ResolveError> {
    if section.get("sso_session").is_some() {
        return Err(ResolveError::configuration(format!(
            "profile '{profile}' uses sso_session, which is not supported; \
             configure the inline sso_* keys instead"
        )));
    }

    let get = |key: &str| {
        section
            .get(key)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    match (
        get("sso_start_url"),
        get("sso_region"),
        get("sso_account_id"),
        get("sso_role_name"),
    ) {
        (Some(start_url), Some(region), Some(account_id), Some(role_name)) => {
            Ok(Some(SsoConfig {
                start_url,
                region,
                account_id,
                role_name,
            }))
        }
        (None, None, None, None) => Ok(None),
        _ => Err(ResolveError::configuration(format!(
            "profile '{profile}' has an incomplete SSO configuration; \
             sso_start_url, sso_region, sso_account_id and sso_role_name are all required"
        ))),
    }
}

/// Load the configuration for `profile`.
///
/// A missing config file or section is not an error for the default
/// profile, and not an error for an explicitly named profile as long as
/// the shared credentials file knows it. An explicitly named profile
/// that appears in neither file is rejected before the chain starts.
pub fn load(profile: &str) -> Result<ProfileConfig, ResolveError> {
    let section = config_file_section(profile)?;

    if section.is_none()
        && profile != constants::DEFAULT_PROFILE
        && !credentials_file_has_profile(profile)
    {
        return Err(ResolveError::configuration(format!(
            "profile '{profile}' not found in the AWS config or credentials files"
        )));
    }

    match section {
        Some(properties) => ProfileConfig::from_ini_section(profile, &properties),
        None => Ok(ProfileConfig {
            profile: profile.to_string(),
            ..Default::default()
        }),
    }
}

// Config file sections are "[default]" or "[profile name]".
fn section_name(profile: &str) -> String {
    if profile == constants::DEFAULT_PROFILE {
        profile.to_string()
    } else {
        format!("profile {profile}")
    }
}

fn config_file_section(profile: &str) -> Result<Option<Properties>, ResolveError> {
    let Some(path) = constants::get_aws_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let ini = Ini::load_from_file(&path).map_err(|err| {
        ResolveError::configuration(format!("failed to parse {}: {err}", path.display()))
    })?;

    Ok(ini.section(Some(section_name(profile))).cloned())
}

// The credentials file names sections after the bare profile name.
fn credentials_file_has_profile(profile: &str) -> bool {
    let Some(path) = constants::get_aws_credentials_path() else {
        return false;
    };
    if !path.exists() {
        return false;
    }

    Ini::load_from_file(&path)
        .map(|ini| ini.section(Some(profile)).is_some())
        .unwrap_or(false)
}
