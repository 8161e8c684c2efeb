//! Application instance input records
//!
//! The resolution engine consumes an immutable snapshot of an application:
//! what its containers, sidecars, and child apps declare, which names are
//! linked to external services, and what the user requested on top. The
//! engine never sees anything richer than these records.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ports::{PortBinding, PortDef, PublishMode};

/// An application instance: the resolved spec plus the user's run request
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppInstance {
    /// Application name, used as the default service name for bindings
    pub name: String,

    /// Global publish policy for this instance
    #[serde(default)]
    pub publish_mode: PublishMode,

    /// Names inside the app bound to external services
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<ServiceBinding>,

    /// User-supplied port bindings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortBinding>,

    /// The application's resolved workload spec
    #[serde(default)]
    pub spec: AppSpec,
}

/// The port-relevant slice of an application's resolved spec
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Named container specifications
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, Container>,

    /// Nested child applications
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, ChildApp>,
}

/// A container's declared ports, including its sidecars' declarations
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Ports this container listens on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortDef>,

    /// Sidecar containers; their ports count against the owning container
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sidecars: BTreeMap<String, Container>,
}

/// A nested child application and the ports it declares
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChildApp {
    /// Ports the child app declares
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortDef>,
}

/// A service link: `target` (a name inside this app) is satisfied by
/// `service` (an existing external service)
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBinding {
    /// The existing service being linked in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,

    /// The name inside the app the service satisfies
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}
