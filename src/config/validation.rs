use crate::config::types::{
    Config, CrawlerConfig, EndpointSettings, OutputConfig, PortalConfig, PortalKind,
    ResponseFormat, SelectorSettings, StatefulSettings, StatelessSettings,
};
use crate::hierarchy::Level;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_portals(&config.portals)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.retry_budget < 1 {
        return Err(ConfigError::Validation(format!(
            "retry_budget must be >= 1, got {}",
            config.retry_budget
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates portal entries
fn validate_portals(portals: &[PortalConfig]) -> Result<(), ConfigError> {
    if portals.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[portal]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for portal in portals {
        validate_portal_name(&portal.name)?;
        if !names.insert(portal.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate portal name '{}'",
                portal.name
            )));
        }
        validate_portal(portal)?;
    }

    Ok(())
}

/// Portal names double as directory names
fn validate_portal_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "portal name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "portal name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_portal(portal: &PortalConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&portal.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base_url '{}': {}", portal.base_url, e))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            portal.base_url
        )));
    }

    if portal.regions.iter().any(|r| r.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "portal '{}' lists an empty region code",
            portal.name
        )));
    }

    match portal.kind {
        PortalKind::Stateful => {
            let settings = portal.stateful.as_ref().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "stateful portal '{}' needs a [portal.stateful] section",
                    portal.name
                ))
            })?;
            validate_stateful(&portal.name, settings)
        }
        PortalKind::Stateless => {
            let settings = portal.stateless.as_ref().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "stateless portal '{}' needs a [portal.stateless] section",
                    portal.name
                ))
            })?;
            validate_stateless(&portal.name, settings)
        }
    }
}

fn validate_stateful(portal: &str, settings: &StatefulSettings) -> Result<(), ConfigError> {
    if settings.script_manager.trim().is_empty() || settings.update_panel.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "portal '{}': script-manager and update-panel cannot be empty",
            portal
        )));
    }

    for (name, selector) in [
        ("region", &settings.region),
        ("subregion", &settings.subregion),
        ("locality", &settings.locality),
    ] {
        validate_selector(portal, name, selector)?;
    }

    Ok(())
}

fn validate_selector(portal: &str, name: &str, selector: &SelectorSettings) -> Result<(), ConfigError> {
    if selector.field.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "portal '{}': {} field cannot be empty",
            portal, name
        )));
    }

    if selector.hint().trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "portal '{}': {} hint cannot be empty",
            portal, name
        )));
    }

    Ok(())
}

fn validate_stateless(portal: &str, settings: &StatelessSettings) -> Result<(), ConfigError> {
    let deepest = settings.deepest_level();
    if deepest == Level::Region {
        return Err(ConfigError::Validation(format!(
            "portal '{}' needs at least a [portal.stateless.subregion] endpoint",
            portal
        )));
    }

    for level in Level::ALL.iter().skip(1) {
        let Some(endpoint) = settings.endpoint(*level) else {
            continue;
        };

        if *level > deepest {
            return Err(ConfigError::Validation(format!(
                "portal '{}': {} endpoint is unreachable because the {} endpoint is missing",
                portal,
                level.as_str(),
                level.parent().map(|p| p.as_str()).unwrap_or("region")
            )));
        }

        validate_endpoint(portal, *level, endpoint)?;
    }

    Ok(())
}

fn validate_endpoint(portal: &str, level: Level, endpoint: &EndpointSettings) -> Result<(), ConfigError> {
    if endpoint.path.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "portal '{}': {} endpoint path cannot be empty",
            portal,
            level.as_str()
        )));
    }

    if endpoint.format == ResponseFormat::Json && endpoint.id_fields.is_empty() {
        return Err(ConfigError::Validation(format!(
            "portal '{}': {} endpoint answers JSON but lists no id-fields",
            portal,
            level.as_str()
        )));
    }

    for template in endpoint.params.values() {
        validate_template(portal, level, template)?;
    }

    Ok(())
}

/// Templates may only refer to ancestors of the level being requested
fn validate_template(portal: &str, level: Level, template: &str) -> Result<(), ConfigError> {
    let placeholder = Regex::new(r"\{([a-z]+)\}")
        .map_err(|e| ConfigError::Validation(format!("internal template pattern: {}", e)))?;

    for caps in placeholder.captures_iter(template) {
        let name = &caps[1];
        let referenced = Level::ALL.iter().find(|l| l.as_str() == name);
        match referenced {
            Some(referenced) if *referenced < level => {}
            Some(_) => {
                return Err(ConfigError::InvalidTemplate(format!(
                    "portal '{}': {} endpoint cannot use '{{{}}}', it is not an ancestor",
                    portal,
                    level.as_str(),
                    name
                )));
            }
            None => {
                return Err(ConfigError::InvalidTemplate(format!(
                    "portal '{}': unknown placeholder '{{{}}}' in {} endpoint",
                    portal,
                    name,
                    level.as_str()
                )));
            }
        }
    }

    Ok(())
}
