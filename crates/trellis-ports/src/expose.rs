//! Child-app exposure resolution
//!
//! Child apps declare their own ports; exposing them means turning those
//! declarations into bindings for the child (so the parent's intent flows
//! down), and, for the parent's own view, resolving explicit expose
//! bindings against the full port set.

use std::collections::BTreeSet;

use tracing::debug;

use crate::matcher::matches;
use crate::set::{Set, Target};
use crate::spec::{AppInstance, PortBinding, PortDef, Protocol, PublishMode};
use crate::Error;
use crate::Result;

/// Resolve the port bindings handed down to one child app.
///
/// Every port the child declares becomes an expose binding (with publish
/// stripped under mode `none`). Each explicit publish binding matching a
/// child port emits an additional publish edge carrying the binding's
/// external port and service name while preserving the child port's target
/// port, target service, and protocol. Under mode `all`, remaining unbound
/// ports that did not ask for publication are auto-published.
pub fn for_child_app(app: &AppInstance, child_name: &str) -> Vec<PortBinding> {
    let mut result = Vec::new();
    let mut bound = BTreeSet::new();

    let child_ports: &[PortDef] = app
        .spec
        .children
        .get(child_name)
        .map(|child| child.ports.as_slice())
        .unwrap_or_default();

    for port in child_ports {
        let mut pb = binding_from_def(port);
        pb.expose = true;
        if app.publish_mode == PublishMode::None {
            pb.publish = false;
        }
        result.push(pb);

        let completed = port.clone().complete(child_name);
        for binding in &app.ports {
            if !binding.publish
                || !matches(&binding.clone().complete(&app.name), &completed)
            {
                continue;
            }
            bound.insert(completed.clone());
            result.push(PortBinding {
                service_name: binding.service_name.clone(),
                port: binding.port,
                target_service_name: port.target_service_name.clone(),
                target_port: port.target_port,
                protocol: port.protocol,
                publish: true,
                ..Default::default()
            });
        }
    }

    if app.publish_mode != PublishMode::None {
        for port in child_ports {
            if bound.contains(&port.clone().complete(child_name)) {
                continue;
            }

            // ports that ask for publication themselves were carried by the
            // expose copies above
            if !port.publish && app.publish_mode == PublishMode::All {
                let mut pb = binding_from_def(port);
                pb.publish = true;
                pb.expose = false;
                result.push(pb);
            }
        }
    }

    result
}

/// Resolve the parent's expose bindings against the full port set.
///
/// A single expose binding matching ports on two different services, or
/// matching two different protocols, is a fatal ambiguity. Expose bindings
/// matching nothing are dropped. Declared ports flagged `expose` that no
/// binding claimed register themselves under their own service.
pub fn for_child_app_expose(app: &AppInstance) -> Result<Set> {
    let ps = Set::build(app)?;
    let mut result = Set::default();
    let mut bound = BTreeSet::new();

    for binding in &app.ports {
        let binding = binding.clone().complete(&app.name);
        if !binding.expose {
            continue;
        }

        let mut bound_service = String::new();
        let mut bound_protocol: Option<Protocol> = None;

        for port in ps.ports.keys() {
            if !matches(&binding, port) {
                continue;
            }

            bound.insert(port.clone());

            if bound_service.is_empty() {
                bound_service = port.service_name.clone();
            } else if bound_service != port.service_name {
                return Err(Error::ambiguity(
                    binding.to_string(),
                    format!(
                        "matches two services [{}, {}]",
                        bound_service, port.service_name
                    ),
                ));
            }

            if bound_protocol.is_none() {
                bound_protocol = port.protocol;
            } else if bound_protocol != port.protocol {
                return Err(Error::ambiguity(
                    binding.to_string(),
                    format!(
                        "matches two protocols [{}, {}]",
                        proto_name(bound_protocol),
                        proto_name(port.protocol)
                    ),
                ));
            }
        }

        if bound_service.is_empty() {
            debug!(binding = %binding, "expose binding matched no declared ports");
            continue;
        }
        result.add_ports(
            Target::Container(bound_service),
            &[to_port_def(&binding, bound_protocol)],
        );
    }

    for port in ps.ports.keys() {
        if bound.contains(port) || !port.expose {
            continue;
        }

        let self_binding = PortBinding {
            port: port.port,
            ..Default::default()
        }
        .complete(&app.name);
        result.add_ports(
            Target::Container(port.service_name.clone()),
            &[to_port_def(&self_binding, port.protocol)],
        );
    }

    Ok(result)
}

/// Turn a resolved binding into a declared port carrying the resolved
/// protocol, completed against the binding's own service name
pub fn to_port_def(binding: &PortBinding, protocol: Option<Protocol>) -> PortDef {
    PortDef {
        port: binding.port,
        target_port: binding.target_port,
        protocol,
        ..Default::default()
    }
    .complete(&binding.service_name)
}

fn binding_from_def(port: &PortDef) -> PortBinding {
    PortBinding {
        service_name: port.service_name.clone(),
        port: port.port,
        target_service_name: port.target_service_name.clone(),
        target_port: port.target_port,
        protocol: port.protocol,
        hostname: port.hostname.clone(),
        expose: port.expose,
        publish: port.publish,
    }
}

fn proto_name(proto: Option<Protocol>) -> &'static str {
    proto.map(|proto| proto.as_str()).unwrap_or("")
}
