//! Declared-port collection and dev filtering
//!
//! Before resolution, the ports a container (and its sidecars) declares are
//! collected into one list: dev-only ports are dropped outside dev mode,
//! and duplicate claims on one external port are resolved first-wins, with
//! one exception: the same port mapping may repeat under new hostnames so
//! an http edge can fan out across hosts.

use std::collections::{BTreeMap, BTreeSet};

use crate::spec::{Container, PortDef};

/// Drop dev-only ports unless running in dev mode
pub fn filter_dev_ports(ports: &[PortDef], dev_mode: bool) -> Vec<PortDef> {
    ports
        .iter()
        .filter(|port| dev_mode || !port.dev)
        .cloned()
        .collect()
}

/// Collect the declared ports of a container and its sidecars, in sidecar
/// name order, deduplicating by external port across the whole container
pub fn collect_container_ports(container: &Container, dev_mode: bool) -> Vec<PortDef> {
    // seen maps each external port to the target ports claimed on it
    let mut seen: BTreeMap<u16, Vec<u16>> = BTreeMap::new();
    let mut seen_hostnames: BTreeSet<String> = BTreeSet::new();

    let mut result = collect_ports(&mut seen, &mut seen_hostnames, &container.ports, dev_mode);
    for sidecar in container.sidecars.values() {
        result.extend(collect_ports(
            &mut seen,
            &mut seen_hostnames,
            &sidecar.ports,
            dev_mode,
        ));
    }

    result
}

fn collect_ports(
    seen: &mut BTreeMap<u16, Vec<u16>>,
    seen_hostnames: &mut BTreeSet<String>,
    ports: &[PortDef],
    dev_mode: bool,
) -> Vec<PortDef> {
    let mut result = Vec::new();
    for port in ports {
        if !dev_mode && port.dev {
            continue;
        }

        // duplicate hostnames never survive, regardless of ports
        if !port.hostname.is_empty() && seen_hostnames.contains(&port.hostname) {
            continue;
        }

        // only the target port may have been defined; the public-facing
        // port will ultimately take the same number, so settle it here
        let mut port = port.clone();
        if port.port == 0 {
            port.port = port.target_port;
        }

        if let Some(targets) = seen.get_mut(&port.port) {
            // special case: the same mapping exposed on a new hostname is
            // kept so one port can serve several hosts
            if !port.hostname.is_empty() && targets.contains(&port.target_port) {
                targets.push(port.target_port);
                seen_hostnames.insert(port.hostname.clone());
                result.push(port);
            }
            continue;
        }

        seen.insert(port.port, vec![port.target_port]);
        if !port.hostname.is_empty() {
            seen_hostnames.insert(port.hostname.clone());
        }
        result.push(port);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(target_port: u16, port_num: u16) -> PortDef {
        PortDef {
            port: port_num,
            target_port,
            ..Default::default()
        }
    }

    fn hostport(target_port: u16, port_num: u16, hostname: &str) -> PortDef {
        PortDef {
            port: port_num,
            target_port,
            hostname: hostname.to_string(),
            ..Default::default()
        }
    }

    fn collect(ports: Vec<PortDef>) -> Vec<PortDef> {
        let mut seen = BTreeMap::new();
        let mut seen_hostnames = BTreeSet::new();
        collect_ports(&mut seen, &mut seen_hostnames, &ports, false)
    }

    #[test]
    fn test_collect_ports() {
        struct Case {
            name: &'static str,
            ports: Vec<PortDef>,
            expected: Vec<PortDef>,
        }

        let cases = vec![
            Case {
                name: "empty",
                ports: vec![],
                expected: vec![],
            },
            Case {
                name: "single",
                ports: vec![PortDef {
                    target_port: 80,
                    ..Default::default()
                }],
                expected: vec![port(80, 80)],
            },
            Case {
                name: "duplicate public port",
                ports: vec![port(8080, 8000), port(9090, 8000)],
                expected: vec![port(8080, 8000)],
            },
            Case {
                name: "duplicate target port",
                ports: vec![port(8080, 8000), port(8080, 9000)],
                expected: vec![port(8080, 8000), port(8080, 9000)],
            },
            Case {
                name: "one undefined hostname",
                ports: vec![port(8080, 8000), hostport(8080, 8000, "myapp.local")],
                expected: vec![port(8080, 8000), hostport(8080, 8000, "myapp.local")],
            },
            Case {
                name: "duplicate everything",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(8080, 8000, "myapp.local"),
                ],
                expected: vec![hostport(8080, 8000, "myapp.local")],
            },
            Case {
                name: "duplicate port and target port with different hostnames",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(8080, 8000, "myapp2.local"),
                ],
                expected: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(8080, 8000, "myapp2.local"),
                ],
            },
            Case {
                name: "duplicate port and hostname with different target ports",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(9090, 8000, "myapp.local"),
                ],
                expected: vec![hostport(8080, 8000, "myapp.local")],
            },
            Case {
                name: "duplicate target port and hostname with different public ports",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(8080, 9000, "myapp.local"),
                ],
                expected: vec![hostport(8080, 8000, "myapp.local")],
            },
            Case {
                name: "duplicate port, different target ports and hostnames",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(9090, 8000, "myapp2.local"),
                ],
                expected: vec![hostport(8080, 8000, "myapp.local")],
            },
            Case {
                name: "duplicate target port, different ports and hostnames",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(8080, 9000, "myapp2.local"),
                ],
                expected: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(8080, 9000, "myapp2.local"),
                ],
            },
            Case {
                name: "duplicate hostnames, different ports and target ports",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(9090, 9000, "myapp.local"),
                ],
                expected: vec![hostport(8080, 8000, "myapp.local")],
            },
            Case {
                name: "three completely different ports",
                ports: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(9090, 9000, "myapp2.local"),
                    hostport(7070, 7000, "myapp3.local"),
                ],
                expected: vec![
                    hostport(8080, 8000, "myapp.local"),
                    hostport(9090, 9000, "myapp2.local"),
                    hostport(7070, 7000, "myapp3.local"),
                ],
            },
            Case {
                name: "same target ports, same ports, different hostnames",
                ports: vec![
                    hostport(8080, 8080, "myapp.local"),
                    hostport(8080, 8080, "myapp2.local"),
                ],
                expected: vec![
                    hostport(8080, 8080, "myapp.local"),
                    hostport(8080, 8080, "myapp2.local"),
                ],
            },
        ];

        for case in cases {
            assert_eq!(collect(case.ports), case.expected, "case: {}", case.name);
        }
    }

    #[test]
    fn test_collect_skips_dev_ports_outside_dev_mode() {
        let ports = vec![
            PortDef {
                target_port: 80,
                ..Default::default()
            },
            PortDef {
                target_port: 5005,
                dev: true,
                ..Default::default()
            },
        ];
        let mut seen = BTreeMap::new();
        let mut seen_hostnames = BTreeSet::new();
        let result = collect_ports(&mut seen, &mut seen_hostnames, &ports, false);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target_port, 80);

        let mut seen = BTreeMap::new();
        let mut seen_hostnames = BTreeSet::new();
        let result = collect_ports(&mut seen, &mut seen_hostnames, &ports, true);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_filter_dev_ports() {
        let ports = vec![
            PortDef {
                target_port: 80,
                ..Default::default()
            },
            PortDef {
                target_port: 5005,
                dev: true,
                ..Default::default()
            },
        ];
        assert_eq!(filter_dev_ports(&ports, false).len(), 1);
        assert_eq!(filter_dev_ports(&ports, true).len(), 2);
    }

    #[test]
    fn test_collect_container_ports_dedupes_across_sidecars() {
        let mut container = Container {
            ports: vec![port(8080, 8000)],
            ..Default::default()
        };
        container.sidecars.insert(
            "metrics".to_string(),
            Container {
                // claims the same external port; the container won
                ports: vec![port(9090, 8000), port(9090, 9000)],
                ..Default::default()
            },
        );

        let result = collect_container_ports(&container, false);
        assert_eq!(result, vec![port(8080, 8000), port(9090, 9000)]);
    }
}
