use crate::config::model::Settings;

/// Validate a parsed settings object. Returns all problems at once rather
/// than stopping at the first, so a user can fix the file in one pass.
pub fn validate(settings: &Settings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let services = &settings.forwarding_configuration.services;
    if services.is_empty() {
        errors.push("list of forwarding services is empty".to_string());
    }

    for (idx, service) in services.iter().enumerate() {
        let label = if service.service_name.trim().is_empty() {
            format!("service #{}", idx + 1)
        } else {
            service.service_name.clone()
        };

        if service.service_name.trim().is_empty() {
            errors.push(format!("{}: service name is empty or blank", label));
        }
        if service.service_namespace.trim().is_empty() {
            errors.push(format!("{}: service namespace is empty or blank", label));
        }
        if service.ports.is_empty() {
            errors.push(format!("{}: list of forwarding ports is empty", label));
        }

        for port in &service.ports {
            if parse_port(&port.local).is_none() {
                errors.push(format!(
                    "{}: local port [{}] isn't a valid port number",
                    label, port.local
                ));
            }
            if parse_port(&port.remote).is_none() {
                errors.push(format!(
                    "{}: remote port [{}] isn't a valid port number",
                    label, port.remote
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Ports are stored as text in the settings file; a valid port is a positive
/// integer that fits in u16.
fn parse_port(text: &str) -> Option<u16> {
    match text.trim().parse::<u16>() {
        Ok(0) => None,
        Ok(port) => Some(port),
        Err(_) => None,
    }
}
