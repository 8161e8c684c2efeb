//! End-to-end resolution tests
//!
//! Drives the full pipeline (app spec in, exposure plan out) from YAML
//! app instances, the way the stored spec reaches the engine in production.

use trellis_common::spec::{
    parse_port_bindings, AppInstance, Protocol, PublishMode,
};
use trellis_ports::{
    apply_bindings, for_container_publish, for_ingress_publish, ListenDef, Set,
};

fn demo_app() -> AppInstance {
    serde_yaml::from_str(
        r#"
name: shop
publishMode: defined
spec:
  containers:
    web:
      ports:
        - port: 80
          targetPort: 8080
          protocol: http
      sidecars:
        metrics:
          ports:
            - targetPort: 9090
    db:
      ports:
        - targetPort: 5432
          publish: true
  children:
    queue:
      ports:
        - targetPort: 5672
"#,
    )
    .unwrap()
}

// =============================================================================
// Set building
// =============================================================================

#[test]
fn builds_the_full_port_set() {
    let set = Set::build(&demo_app()).unwrap();
    assert_eq!(set.service_names(), vec!["db", "queue", "web"]);

    let web = set.ports_for_service("web");
    assert_eq!(web.len(), 2, "container and sidecar ports: {:?}", web);
    assert!(set.is_container_service("web"));
    assert!(!set.is_container_service("queue"));
}

#[test]
fn linked_services_disappear_from_the_set() {
    let mut app = demo_app();
    app.links.push(trellis_common::spec::ServiceBinding {
        service: "managed-postgres".to_string(),
        target: "db".to_string(),
    });

    let set = Set::build(&app).unwrap();
    assert_eq!(set.service_names(), vec!["queue", "web"]);
}

// =============================================================================
// Publication
// =============================================================================

#[test]
fn cli_bindings_flow_through_container_publish() {
    let mut app = demo_app();
    let mut bindings = parse_port_bindings(&["15432:5432"], false).unwrap();
    bindings[0].publish = true;
    app.ports = bindings;

    let set = for_container_publish(&app).unwrap();
    let ports = set.ports_for_service("db");
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].port, 15432);
    assert_eq!(ports[0].target_port, 5432);
}

#[test]
fn hostname_bindings_flow_through_ingress_publish() {
    let mut app = demo_app();
    let mut bindings = parse_port_bindings(&["shop.example.com:web:8080"], false).unwrap();
    bindings[0].publish = true;
    app.ports = bindings;

    let set = for_ingress_publish(&app).unwrap();
    let ports = set.ports_for_service("web");
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].protocol, Some(Protocol::Http));
    assert_eq!(set.hostnames[&ports[0]], vec!["shop.example.com"]);
}

#[test]
fn publish_mode_all_exposes_everything_eligible() {
    let mut app = demo_app();
    app.publish_mode = PublishMode::All;

    let tcp = for_container_publish(&app).unwrap();
    // db (flagged) and the metrics sidecar port; the http port is not
    // tcp-published and the child app is not container-backed
    assert_eq!(tcp.service_names(), vec!["db", "web"]);

    let http = for_ingress_publish(&app).unwrap();
    assert_eq!(http.service_names(), vec!["web"]);
}

// =============================================================================
// Listener binding
// =============================================================================

#[test]
fn apply_bindings_builds_listeners_per_service() {
    let app = demo_app();
    let set = Set::build(&app).unwrap();

    let db_ports = set.ports_for_service("db");
    let bound = apply_bindings(PublishMode::All, "db", &[], &db_ports);
    let resolved = bound.service_ports().unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].port, 5432);

    let web_ports = set.ports_for_service("web");
    let bound = apply_bindings(PublishMode::All, "web", &[], &web_ports);
    // the http port lands in the default-domain group as well
    assert!(bound.get(&ListenDef::default_domain_http()).is_some());
    let by_hostname = bound.by_hostname();
    assert_eq!(by_hostname[""].len(), 1);
}

#[test]
fn publish_mode_none_resolves_to_nothing() {
    let app = demo_app();
    let set = Set::build(&app).unwrap();
    let ports = set.ports_for_service("db");

    let bound = apply_bindings(PublishMode::None, "db", &[], &ports);
    assert!(bound.is_empty());
    assert!(bound.service_ports().unwrap().is_empty());
}
