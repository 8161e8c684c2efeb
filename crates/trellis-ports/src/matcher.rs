//! Binding-to-port matching
//!
//! Decides whether a user binding and a declared port refer to the same
//! network edge. Both operands must be completed first; empty binding
//! fields are wildcards.

use crate::spec::{PortBinding, PortDef, Protocol};

/// Whether a binding refers to the same network edge as a declared port.
///
/// - the binding protocol must be empty or equal to the port's
/// - the binding target port must equal the port's target port; http ports
///   are host-routed, so a zero binding target port is also accepted there
/// - the binding's target service name must be empty or equal to the
///   port's owning service name
pub fn matches(binding: &PortBinding, port: &PortDef) -> bool {
    if binding.protocol.is_some() && binding.protocol != port.protocol {
        return false;
    }

    if port.protocol == Some(Protocol::Http) {
        if binding.target_port != 0 && binding.target_port != port.target_port {
            return false;
        }
    } else if binding.target_port != port.target_port {
        return false;
    }

    if !binding.target_service_name.is_empty() && binding.target_service_name != port.service_name
    {
        return false;
    }

    true
}

/// Whether a binding addresses the named service at all.
///
/// Expose-only bindings never participate in publication.
pub fn service_matches(service_name: &str, binding: &PortBinding) -> bool {
    if binding.expose && !binding.publish {
        return false;
    }
    binding.target_service_name.is_empty() || binding.target_service_name == service_name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_port(service: &str, target_port: u16, protocol: Protocol) -> PortDef {
        PortDef {
            target_port,
            protocol: Some(protocol),
            ..Default::default()
        }
        .complete(service)
    }

    #[test]
    fn test_bare_target_port_matches_any_service_and_protocol() {
        let binding = PortBinding {
            target_port: 80,
            ..Default::default()
        }
        .complete("");

        assert!(matches(&binding, &completed_port("web", 80, Protocol::Tcp)));
        assert!(matches(&binding, &completed_port("api", 80, Protocol::Udp)));
        assert!(matches(&binding, &completed_port("web", 80, Protocol::Http)));
        assert!(!matches(&binding, &completed_port("web", 81, Protocol::Tcp)));
    }

    #[test]
    fn test_protocol_must_agree_when_set() {
        let binding = PortBinding {
            target_port: 80,
            protocol: Some(Protocol::Udp),
            ..Default::default()
        }
        .complete("");

        assert!(matches(&binding, &completed_port("web", 80, Protocol::Udp)));
        assert!(!matches(&binding, &completed_port("web", 80, Protocol::Tcp)));
    }

    #[test]
    fn test_http_ports_accept_zero_target_port() {
        let binding = PortBinding {
            protocol: Some(Protocol::Http),
            ..Default::default()
        };

        assert!(matches(&binding, &completed_port("web", 8080, Protocol::Http)));
        // non-http requires an exact target port
        let tcp_binding = PortBinding::default();
        assert!(!matches(&tcp_binding, &completed_port("web", 8080, Protocol::Tcp)));
    }

    #[test]
    fn test_target_service_name_pins_the_service() {
        let binding = PortBinding {
            target_service_name: "api".to_string(),
            target_port: 80,
            ..Default::default()
        }
        .complete("");

        assert!(matches(&binding, &completed_port("api", 80, Protocol::Tcp)));
        assert!(!matches(&binding, &completed_port("web", 80, Protocol::Tcp)));
    }

    #[test]
    fn test_service_matches() {
        let binding = PortBinding {
            target_service_name: "api".to_string(),
            target_port: 80,
            publish: true,
            ..Default::default()
        };
        assert!(service_matches("api", &binding));
        assert!(!service_matches("web", &binding));

        let wildcard = PortBinding {
            target_port: 80,
            publish: true,
            ..Default::default()
        };
        assert!(service_matches("anything", &wildcard));

        let expose_only = PortBinding {
            target_port: 80,
            expose: true,
            ..Default::default()
        };
        assert!(!service_matches("api", &expose_only));
    }
}
