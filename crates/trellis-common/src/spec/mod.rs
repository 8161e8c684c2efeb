//! Trellis spec value types
//!
//! Plain records describing what an application declares (ports, containers,
//! child apps, links) and what a user requests (bindings, publish mode),
//! plus the compact textual port syntax they can be written in.
//!
//! Everything here is an immutable-after-construction value type; the
//! resolution engine in `trellis-ports` consumes these and nothing else.

mod app;
mod parse;
mod ports;

pub use app::{AppInstance, AppSpec, ChildApp, Container, ServiceBinding};
pub use parse::{
    parse_links, parse_port, parse_port_binding, parse_port_bindings, parse_ports,
};
pub use ports::{PortBinding, PortDef, Protocol, PublishMode};
