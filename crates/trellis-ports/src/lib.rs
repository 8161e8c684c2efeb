//! Port and service exposure resolution for Trellis
//!
//! This crate turns a declarative description of the ports an application's
//! workloads listen on (per container, per sidecar, per child app) plus
//! optional user bindings into a deterministic, conflict-checked exposure
//! plan:
//!
//! - **Set**: aggregates declared ports by owning service and validates the
//!   structural invariants over them
//! - **Matcher**: decides whether a user binding and a declared port refer
//!   to the same network edge
//! - **Expose/Publish**: mode-specific resolvers for child-app exposure,
//!   tcp/udp load-balancer publication, and http ingress publication
//! - **Bind**: resolves declared ports against bindings into per-listener
//!   bound port maps
//!
//! Everything is synchronous, side-effect-free, and computed fresh per call;
//! rendering the plan into live infrastructure is a collaborator's job.

pub mod bind;
pub mod collect;
pub mod expose;
pub mod matcher;
pub mod publish;
pub mod set;

// Bridge trellis_common types into this crate's namespace.
// Internal modules use `crate::spec`, `crate::Error`, etc.
pub(crate) use trellis_common::{spec, Error, Result};

pub use bind::{apply_bindings, by_protocol, publish_bindings_for_service, BoundPorts, ListenDef};
pub use collect::{collect_container_ports, filter_dev_ports};
pub use expose::{for_child_app, for_child_app_expose, to_port_def};
pub use matcher::{matches, service_matches};
pub use publish::{for_container_publish, for_ingress_publish};
pub use set::{is_linked, link_service, Set, Target};
