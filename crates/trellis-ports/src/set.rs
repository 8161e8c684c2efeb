//! Port set aggregation and validation
//!
//! [`Set`] is the aggregated view of everything an application declares:
//! service name → declared ports, and declared port → the targets (container
//! or child app) backing it. Building a set skips names that are satisfied
//! by a service link, and validating one enforces the structural invariants
//! that make the exposure plan unambiguous.

use std::collections::{BTreeMap, BTreeSet};

use crate::spec::{AppInstance, PortDef};
use crate::{Error, Result};

/// What backs a declared port: a container or a nested child app
///
/// Exactly one variant is populated by construction; a service name may
/// never be backed by both kinds at once (enforced by validation).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    /// A container (or one of its sidecars), by container name
    Container(String),
    /// A nested child application, by child app name
    ChildApp(String),
}

impl Target {
    /// The service name this target answers to
    pub fn service_name(&self) -> &str {
        match self {
            Target::Container(name) => name,
            Target::ChildApp(name) => name,
        }
    }

    /// Whether this target is a container
    pub fn is_container(&self) -> bool {
        matches!(self, Target::Container(_))
    }
}

/// The aggregated result of scanning an application's spec for ports
///
/// Invariant: every `PortDef` under `services` also keys `ports` with at
/// least one target, and vice versa; `add_ports` maintains both sides.
/// All collections are ordered so derived output is deterministic.
#[derive(Clone, Debug, Default)]
pub struct Set {
    /// Service name → declared ports, unique by full value
    pub services: BTreeMap<String, BTreeSet<PortDef>>,
    /// Declared port → targets backing it, ordered by service name
    pub ports: BTreeMap<PortDef, Vec<Target>>,
    /// Declared port → user-requested hostnames (http publication only)
    pub hostnames: BTreeMap<PortDef, Vec<String>>,
}

impl Set {
    /// Build the port set for an application and validate it.
    ///
    /// Containers (with their sidecars) are walked in name order, then
    /// child apps; a name that is satisfied by a service link declares
    /// nothing here; its traffic goes to the linked service instead.
    pub fn build(app: &AppInstance) -> Result<Set> {
        let mut result = Set::default();

        for (container_name, container) in &app.spec.containers {
            if is_linked(app, container_name) {
                continue;
            }

            result.add_ports(Target::Container(container_name.clone()), &container.ports);
            for sidecar in container.sidecars.values() {
                result.add_ports(Target::Container(container_name.clone()), &sidecar.ports);
            }
        }

        for (child_name, child) in &app.spec.children {
            if is_linked(app, child_name) {
                continue;
            }
            result.add_ports(Target::ChildApp(child_name.clone()), &child.ports);
        }

        result.validate()?;
        Ok(result)
    }

    /// Register ports against a target, completing each against the
    /// target's service name
    pub fn add_ports(&mut self, target: Target, ports: &[PortDef]) {
        for port in ports {
            let port = port.clone().complete(target.service_name());
            self.services
                .entry(port.service_name.clone())
                .or_default()
                .insert(port.clone());
            let targets = self.ports.entry(port).or_default();
            targets.push(target.clone());
            targets.sort_by(|a, b| a.service_name().cmp(b.service_name()));
        }
    }

    /// All service names, sorted
    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// The ports declared under one service name, sorted by port number
    /// then protocol
    pub fn ports_for_service(&self, name: &str) -> Vec<PortDef> {
        let mut ports: Vec<PortDef> = self
            .services
            .get(name)
            .map(|ports| ports.iter().cloned().collect())
            .unwrap_or_default();
        ports.sort_by(|a, b| (a.port, a.protocol).cmp(&(b.port, b.protocol)));
        ports
    }

    /// Whether the named service is backed by container targets
    pub fn is_container_service(&self, name: &str) -> bool {
        self.first_target(name)
            .map(Target::is_container)
            .unwrap_or(false)
    }

    /// The container backing the named service, if it is container-backed
    pub fn container_service(&self, name: &str) -> Option<&str> {
        match self.first_target(name)? {
            Target::Container(container) => Some(container),
            Target::ChildApp(_) => None,
        }
    }

    fn first_target(&self, name: &str) -> Option<&Target> {
        let port = self.services.get(name)?.iter().next()?;
        self.ports.get(port)?.first()
    }

    /// Enforce the structural invariants over the whole set, collecting
    /// every violation rather than failing on the first:
    ///
    /// - all ports sharing one service name must be backed by the exact
    ///   same set of target names
    /// - a service name may not be backed by both containers and child apps
    fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        for (service, ports) in &self.services {
            let mut found_container = false;
            let mut found_child = false;
            let mut first: Option<(&PortDef, BTreeSet<&str>)> = None;

            for port in ports {
                let mut target_names = BTreeSet::new();
                for target in self.ports.get(port).map(Vec::as_slice).unwrap_or_default() {
                    target_names.insert(target.service_name());
                    match target {
                        Target::Container(_) => found_container = true,
                        Target::ChildApp(_) => found_child = true,
                    }
                }
                match &first {
                    None => first = Some((port, target_names)),
                    Some((first_port, first_names)) if *first_names != target_names => {
                        violations.push(format!(
                            "ports {} and {} on service {} do not share the same set of targets {:?} != {:?}",
                            first_port, port, service, first_names, target_names
                        ));
                    }
                    Some(_) => {}
                }
            }

            if found_container && found_child {
                violations.push(format!(
                    "service {} is addressing both containers and child apps, can only address one type",
                    service
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::invariant(violations))
        }
    }
}

/// Whether `name` is satisfied by a service link, directly or through a
/// declared port whose owning service differs from the declaring name
pub fn is_linked(app: &AppInstance, name: &str) -> bool {
    let mut seen = BTreeSet::new();
    is_linked_inner(app, name, &mut seen)
}

fn is_linked_inner(app: &AppInstance, name: &str, seen: &mut BTreeSet<String>) -> bool {
    // the seen set guards against service-name cycles between declarations
    if name.is_empty() || !seen.insert(name.to_string()) {
        return false;
    }

    if app.links.iter().any(|link| link.target == name) {
        return true;
    }

    if let Some(container) = app.spec.containers.get(name) {
        for port in &container.ports {
            if port.service_name != name && is_linked_inner(app, &port.service_name, seen) {
                return true;
            }
        }
    }

    if let Some(child) = app.spec.children.get(name) {
        for port in &child.ports {
            if port.service_name != name && is_linked_inner(app, &port.service_name, seen) {
                return true;
            }
        }
    }

    false
}

/// The external service linked to `name`, if any
pub fn link_service<'a>(app: &'a AppInstance, name: &str) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }
    app.links
        .iter()
        .find(|link| link.target == name)
        .map(|link| link.service.as_str())
}
