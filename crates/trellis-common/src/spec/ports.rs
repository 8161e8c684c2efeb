//! Port declarations and bindings
//!
//! `PortDef` is a port a workload states it listens on; `PortBinding` is the
//! same shape used as a user-supplied filter/override requesting how a
//! declared port should be exposed. Both are plain comparable value records
//! so they can key deduplicating maps, and both have a completion step that
//! fills defaults against an owning service name.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Wire protocol of a declared port
///
/// `http` edges are host-routed: listeners are identified by hostname, not
/// port number, and ride on tcp at L4 (see [`Protocol::normalized`]).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain TCP
    Tcp,
    /// Plain UDP
    Udp,
    /// HTTP, routed by hostname rather than port number
    Http,
}

impl Protocol {
    /// The L4 protocol this edge rides on: http is carried over tcp
    pub fn normalized(self) -> Protocol {
        match self {
            Protocol::Http => Protocol::Tcp,
            other => other,
        }
    }

    /// The lowercase wire name of this protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Http => "http",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "http" => Ok(Protocol::Http),
            other => Err(Error::syntax(other, "invalid protocol")),
        }
    }
}

/// Global policy governing whether ports not explicitly requested as public
/// are exposed anyway
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PublishMode {
    /// No exposure at all
    None,
    /// Only bindings and flags explicitly requesting publication take effect
    #[default]
    Defined,
    /// Every remaining eligible port is auto-published
    All,
}

/// A port a workload declares it listens on
///
/// Zero port numbers and empty strings mean "unset"; [`PortDef::complete`]
/// fills them. The record is fully comparable so a completed `PortDef` can
/// key deduplicating maps with deterministic (`BTreeMap`) iteration order.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct PortDef {
    /// Logical service that owns this port; empty before completion
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    /// External/listen port number; defaults from `target_port`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub port: u16,

    /// Optional second service this port routes toward (multi-hop edges)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_service_name: String,

    /// Port the workload actually listens on; defaults from `port`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub target_port: u16,

    /// Wire protocol; empty before completion, defaults to tcp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    /// Requested hostname; only meaningful for http
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Reachable from other workloads inside the cluster
    #[serde(default, skip_serializing_if = "is_false")]
    pub expose: bool,

    /// Reachable from outside the cluster
    #[serde(default, skip_serializing_if = "is_false")]
    pub publish: bool,

    /// Only live in dev mode
    #[serde(default, skip_serializing_if = "is_false")]
    pub dev: bool,
}

impl PortDef {
    /// Fill defaults: the owning service name, mutually-defaulted port
    /// numbers, and a tcp protocol. Idempotent.
    pub fn complete(mut self, default_service_name: &str) -> Self {
        if self.service_name.is_empty() {
            self.service_name = default_service_name.to_string();
        }
        if self.target_port == 0 {
            self.target_port = self.port;
        }
        if self.port == 0 {
            self.port = self.target_port;
        }
        if self.protocol.is_none() {
            self.protocol = Some(Protocol::Tcp);
        }
        self
    }
}

impl fmt::Display for PortDef {
    /// Canonical compact form, the exact inverse of the port syntax parser:
    /// `[serviceName][:port](:[targetServiceName]):targetPort[/protocol][,expose][,publish]`,
    /// with the `port` segment omitted when it equals `target_port`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_compact(
            f,
            &self.service_name,
            self.port,
            &self.target_service_name,
            self.target_port,
            self.protocol,
            self.expose,
            self.publish,
        )
    }
}

/// A user- or operator-supplied override requesting how a declared port
/// should be exposed
///
/// Same shape as [`PortDef`]; used as a filter, so unset fields are
/// wildcards. Unlike `PortDef::complete`, [`PortBinding::complete`] never
/// invents a `target_service_name` or a protocol: an empty binding
/// protocol means "match any protocol".
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    /// Published service name (or requested hostname, for http bindings)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    /// External port to publish on; defaults from `target_port`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub port: u16,

    /// The declared service this binding addresses; empty matches any
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_service_name: String,

    /// The declared target port this binding addresses
    #[serde(default, skip_serializing_if = "is_zero")]
    pub target_port: u16,

    /// Requested protocol; empty matches any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,

    /// Requested hostname; only meaningful for http
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Request in-cluster exposure
    #[serde(default, skip_serializing_if = "is_false")]
    pub expose: bool,

    /// Request publication outside the cluster
    #[serde(default, skip_serializing_if = "is_false")]
    pub publish: bool,
}

impl PortBinding {
    /// Fill defaults: the service name and mutually-defaulted port numbers.
    ///
    /// The protocol and `target_service_name` are left alone; empty means
    /// "match any", and completing them away would break wildcard matching.
    /// Idempotent.
    pub fn complete(mut self, default_service_name: &str) -> Self {
        if self.service_name.is_empty() {
            self.service_name = default_service_name.to_string();
        }
        if self.target_port == 0 {
            self.target_port = self.port;
        }
        if self.port == 0 {
            self.port = self.target_port;
        }
        self
    }
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_compact(
            f,
            &self.service_name,
            self.port,
            &self.target_service_name,
            self.target_port,
            self.protocol,
            self.expose,
            self.publish,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn format_compact(
    f: &mut fmt::Formatter<'_>,
    service_name: &str,
    port: u16,
    target_service_name: &str,
    target_port: u16,
    protocol: Option<Protocol>,
    expose: bool,
    publish: bool,
) -> fmt::Result {
    let mut wrote = false;
    if !service_name.is_empty() {
        f.write_str(service_name)?;
        wrote = true;
    }
    if port != 0 && port != target_port {
        if wrote {
            f.write_str(":")?;
        }
        write!(f, "{}", port)?;
        wrote = true;
    }
    if !target_service_name.is_empty() {
        if wrote {
            f.write_str(":")?;
        }
        f.write_str(target_service_name)?;
        wrote = true;
    }
    if wrote {
        f.write_str(":")?;
    }
    write!(f, "{}", target_port)?;
    if let Some(proto) = protocol {
        write!(f, "/{}", proto)?;
    }
    if expose {
        f.write_str(",expose")?;
    }
    if publish {
        f.write_str(",publish")?;
    }
    Ok(())
}

fn is_zero(port: &u16) -> bool {
    *port == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}
