use crate::utils::error::{Result, SamError};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Accepts `host:port` with a non-empty host and a non-zero port.
pub fn validate_endpoint(field_name: &str, endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: endpoint.to_string(),
            reason: "Endpoint cannot be empty".to_string(),
        });
    }

    let (host, port) = match endpoint.rsplit_once(':') {
        Some(parts) => parts,
        None => {
            return Err(SamError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: endpoint.to_string(),
                reason: "Expected host:port".to_string(),
            })
        }
    };

    if host.trim().is_empty() {
        return Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: endpoint.to_string(),
            reason: "Host cannot be empty".to_string(),
        });
    }

    match port.parse::<u16>() {
        Ok(port) => validate_port(field_name, port),
        Err(e) => Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: endpoint.to_string(),
            reason: format!("Invalid port: {}", e),
        }),
    }
}

pub fn validate_port(field_name: &str, port: u16) -> Result<()> {
    if port == 0 {
        return Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: port.to_string(),
            reason: "Port must be between 1 and 65535".to_string(),
        });
    }
    Ok(())
}

/// Session nicknames travel as a single protocol token.
pub fn validate_nickname(field_name: &str, nickname: &str) -> Result<()> {
    validate_non_empty_string(field_name, nickname)?;
    if nickname.chars().any(|c| c.is_whitespace() || c == '=' || c == '"') {
        return Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: nickname.to_string(),
            reason: "Nickname cannot contain whitespace, '=' or quotes".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SamError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
