//! Container publication resolution
//!
//! Two publication contexts, both limited to container-backed services:
//! tcp/udp ports become externally reachable load-balanced listeners, and
//! http ports become ingress edges with user-requested hostnames attached.
//! Child-app-backed services publish through their own child resolution
//! instead.

use std::collections::BTreeSet;

use tracing::debug;

use crate::matcher::matches;
use crate::set::{Set, Target};
use crate::spec::{AppInstance, Protocol, PublishMode};
use crate::Result;

/// Resolve tcp/udp publication for an application's containers.
///
/// A matching explicit publish binding rewrites the external port; under
/// mode `all`, or for ports flagged `publish`, remaining ports are
/// auto-published on their own port numbers.
pub fn for_container_publish(app: &AppInstance) -> Result<Set> {
    let ps = Set::build(app)?;
    let mut result = Set::default();
    let mut bound = BTreeSet::new();

    for binding in &app.ports {
        let binding = binding.clone().complete(&app.name);

        for port in ps.ports.keys() {
            if port.protocol != Some(Protocol::Tcp) && port.protocol != Some(Protocol::Udp) {
                continue;
            }

            if !binding.publish || !matches(&binding, port) {
                continue;
            }

            if ps.is_container_service(&port.service_name) {
                bound.insert(port.clone());
                let mut published = port.clone();
                published.port = binding.port;
                result.add_ports(Target::Container(port.service_name.clone()), &[published]);
            }
        }
    }

    if app.publish_mode != PublishMode::None {
        for port in ps.ports.keys() {
            if bound.contains(port) {
                continue;
            }

            if port.protocol != Some(Protocol::Tcp) && port.protocol != Some(Protocol::Udp) {
                continue;
            }

            if (port.publish || app.publish_mode == PublishMode::All)
                && ps.is_container_service(&port.service_name)
            {
                debug!(port = %port, "auto-publishing unbound port");
                result.add_ports(Target::Container(port.service_name.clone()), &[port.clone()]);
            }
        }
    }

    Ok(result)
}

/// Resolve http ingress publication for an application's containers.
///
/// Matching publish bindings attach their requested hostname to the port;
/// multiple hostnames may attach to one port. Under mode `all`, or for
/// ports flagged `publish`, remaining http ports are auto-published; their
/// default hostname is derived by the consumer, not here.
pub fn for_ingress_publish(app: &AppInstance) -> Result<Set> {
    let ps = Set::build(app)?;
    let mut result = Set::default();
    let mut bound = BTreeSet::new();

    for port in ps.ports.keys() {
        if port.protocol != Some(Protocol::Http) || !ps.is_container_service(&port.service_name) {
            continue;
        }

        for binding in &app.ports {
            let full = binding.clone().complete(&app.name);
            if !full.publish || !matches(&full, port) {
                continue;
            }

            bound.insert(port.clone());

            // only a hostname the user actually wrote attaches; the
            // completed (defaulted) service name is not a hostname request
            let hostname = if !binding.hostname.is_empty() {
                binding.hostname.as_str()
            } else {
                binding.service_name.as_str()
            };
            if !hostname.is_empty() {
                result
                    .hostnames
                    .entry(port.clone())
                    .or_default()
                    .push(hostname.to_string());
            }
            result.add_ports(Target::Container(port.service_name.clone()), &[port.clone()]);
        }
    }

    if app.publish_mode != PublishMode::None {
        for port in ps.ports.keys() {
            if bound.contains(port) {
                continue;
            }

            if port.protocol != Some(Protocol::Http)
                || !ps.is_container_service(&port.service_name)
            {
                continue;
            }

            if port.publish || app.publish_mode == PublishMode::All {
                result.add_ports(Target::Container(port.service_name.clone()), &[port.clone()]);
            }
        }
    }

    Ok(result)
}
