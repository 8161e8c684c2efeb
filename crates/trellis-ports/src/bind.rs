//! Listener binding for service instances
//!
//! [`apply_bindings`] resolves a service's declared ports against the full
//! binding list into a [`BoundPorts`] map keyed by [`ListenDef`], the
//! externally visible listener identity. tcp/udp listeners are identified
//! by port number; http listeners are host-routed and identified by
//! hostname, with one canonical default-domain listener collecting every
//! bound http port so a consumer can build a single consolidated routing
//! rule per application.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::matcher::{matches, service_matches};
use crate::spec::{PortBinding, PortDef, Protocol, PublishMode};
use crate::{Error, Result};

/// A resolved network listener identity
///
/// For http the identity is the hostname (hostname empty means the default
/// domain); for tcp/udp it is the port number.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenDef {
    /// Hostname; empty unless the protocol is http
    pub hostname: String,
    /// Port number; zero for http
    pub port: u16,
    /// Listener protocol
    pub protocol: Protocol,
}

impl ListenDef {
    /// The listener identity of a completed declared port
    pub fn from_port(port: &PortDef) -> ListenDef {
        let protocol = port.protocol.unwrap_or(Protocol::Tcp);
        if protocol == Protocol::Http {
            ListenDef {
                hostname: port.hostname.clone(),
                port: 0,
                protocol,
            }
        } else {
            ListenDef {
                hostname: String::new(),
                port: port.port,
                protocol,
            }
        }
    }

    /// The canonical host-agnostic http listener every bound http port is
    /// also registered under
    pub fn default_domain_http() -> ListenDef {
        ListenDef {
            hostname: String::new(),
            port: 0,
            protocol: Protocol::Http,
        }
    }
}

impl fmt::Display for ListenDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.protocol == Protocol::Http {
            write!(f, "{}/http", self.hostname)
        } else {
            write!(f, "{}/{}", self.port, self.protocol)
        }
    }
}

/// Map from listener identity to the declared ports it multiplexes
///
/// A tcp/udp listener may carry at most one port, enforced at
/// finalization by [`BoundPorts::service_ports`]. An http listener may
/// carry any number; http edges are host-routed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundPorts {
    bound: BTreeMap<ListenDef, Vec<PortDef>>,
}

impl BoundPorts {
    /// Whether no listener is bound
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Number of bound listeners
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Iterate listeners and the ports they multiplex, in identity order
    pub fn iter(&self) -> impl Iterator<Item = (&ListenDef, &[PortDef])> {
        self.bound.iter().map(|(def, ports)| (def, ports.as_slice()))
    }

    /// The ports bound to one listener
    pub fn get(&self, def: &ListenDef) -> Option<&[PortDef]> {
        self.bound.get(def).map(Vec::as_slice)
    }

    fn push(&mut self, def: ListenDef, port: PortDef) {
        self.bound.entry(def).or_default().push(port);
    }

    /// Finalize into one resolved port per listener.
    ///
    /// A tcp/udp listener carrying more than one port is ambiguous: a
    /// single port number cannot forward to two different target ports.
    /// The listener port overrides the port's external port. http ports are
    /// taken from the canonical default-domain listener (the per-hostname
    /// listeners are the ingress consumer's input via
    /// [`BoundPorts::by_hostname`]). Output is sorted by port then protocol.
    pub fn service_ports(&self) -> Result<Vec<PortDef>> {
        let mut result = Vec::new();
        for (listen, ports) in &self.bound {
            if listen.protocol == Protocol::Http {
                if listen.hostname.is_empty() {
                    result.extend(ports.iter().cloned());
                }
                continue;
            }

            match ports.as_slice() {
                [] => {}
                [port] => {
                    let mut port = port.clone();
                    if listen.port != 0 {
                        port.port = listen.port;
                    }
                    result.push(port);
                }
                many => {
                    let bound: Vec<String> = many.iter().map(PortDef::to_string).collect();
                    return Err(Error::ambiguity(
                        listen.to_string(),
                        format!(
                            "port [{}] is bound to [{}] ports {:?}, can only be bound to 1",
                            listen.port,
                            many.len(),
                            bound
                        ),
                    ));
                }
            }
        }

        result.sort_by(|a, b| (a.port, a.protocol).cmp(&(b.port, b.protocol)));
        Ok(result)
    }

    /// The http listeners grouped by hostname; the canonical default-domain
    /// listener appears under the empty hostname
    pub fn by_hostname(&self) -> BTreeMap<String, Vec<PortDef>> {
        self.bound
            .iter()
            .filter(|(def, _)| def.protocol == Protocol::Http)
            .map(|(def, ports)| (def.hostname.clone(), ports.clone()))
            .collect()
    }
}

/// Resolve a service instance's declared ports against the full binding
/// list.
///
/// Mode `none` yields an empty result. Each port is bound once per
/// matching binding (the binding may override the listener hostname
/// for http, or the port for tcp/udp) and, failing any match, auto-binds under its
/// own identity when mode is `all` or the port asks for publication
/// itself. Every bound http port is additionally registered once under the
/// canonical default-domain listener.
pub fn apply_bindings(
    mode: PublishMode,
    service_name: &str,
    bindings: &[PortBinding],
    ports: &[PortDef],
) -> BoundPorts {
    let mut result = BoundPorts::default();

    if mode == PublishMode::None {
        return result;
    }

    for port in ports {
        let port = port.clone().complete(service_name);
        let mut published = false;

        for binding in bindings {
            let binding = binding.clone().complete("");
            if !service_matches(service_name, &binding) || !matches(&binding, &port) {
                continue;
            }
            published = true;

            let mut def = ListenDef::from_port(&port);
            if port.protocol == Some(Protocol::Http) {
                if !binding.hostname.is_empty() {
                    def.hostname = binding.hostname.clone();
                }
            } else if binding.port != 0 {
                def.port = binding.port;
            }
            result.push(def, port.clone());
        }

        if !published && (mode == PublishMode::All || port.publish) {
            published = true;
            debug!(port = %port, "auto-binding port under its own listener identity");
            result.push(ListenDef::from_port(&port), port.clone());
        }

        if published && port.protocol == Some(Protocol::Http) {
            let bucket = result
                .bound
                .entry(ListenDef::default_domain_http())
                .or_default();
            if !bucket.contains(&port) {
                bucket.push(port);
            }
        }
    }

    result
}

/// The subset of bindings addressing a service, reduced to their
/// publication fields
pub fn publish_bindings_for_service(
    service_name: &str,
    bindings: &[PortBinding],
) -> Vec<PortBinding> {
    bindings
        .iter()
        .filter(|binding| service_matches(service_name, binding))
        .map(|binding| PortBinding {
            port: binding.port,
            protocol: binding.protocol,
            hostname: binding.hostname.clone(),
            target_port: binding.target_port,
            ..Default::default()
        })
        .collect()
}

/// Filter ports whose completed protocol is one of `protocols`, preserving
/// the original records
pub fn by_protocol(ports: &[PortDef], protocols: &[Protocol]) -> Vec<PortDef> {
    ports
        .iter()
        .filter(|port| {
            let completed = (*port).clone().complete("");
            protocols.contains(&completed.protocol.unwrap_or(Protocol::Tcp))
        })
        .cloned()
        .collect()
}
