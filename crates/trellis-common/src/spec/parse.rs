//! Compact port syntax parsing
//!
//! The string grammar is the wire contract between a human-facing command
//! line (or an app file) and the resolution engine, so it is treated as a
//! stable, versioned syntax:
//!
//! ```text
//! EXPR[/PROTOCOL][,expose][,publish]
//! ```
//!
//! where `EXPR` is one to four `:`-separated segments. Each segment is
//! either a port number or a lowercase name. The same grammar is parsed in
//! two record modes, declarations ([`parse_ports`]) and bindings
//! ([`parse_port_bindings`]), and the four-segment
//! `service:port:service:port` form is only legal in expose mode. All
//! configuration is passed as explicit parameters; the parser holds no
//! state.

use std::str::FromStr;

use crate::{Error, Result};

use super::app::ServiceBinding;
use super::ports::{PortBinding, PortDef, Protocol};

/// Parse a list of compact port declarations.
///
/// `expose` enables the four-segment `service:port:service:port` form.
pub fn parse_ports<S: AsRef<str>>(args: &[S], expose: bool) -> Result<Vec<PortDef>> {
    args.iter()
        .map(|arg| parse_port(arg.as_ref(), expose))
        .collect()
}

/// Parse a single compact port declaration.
pub fn parse_port(arg: &str, expose: bool) -> Result<PortDef> {
    let (expr, flag_expose, flag_publish) = split_modifiers(arg)?;
    let (expr, proto) = split_protocol(arg, expr)?;

    let segs = segments(arg, expr)?;
    let mut port = match segs.as_slice() {
        [single] => {
            let n = require_num(arg, single)?;
            PortDef {
                port: n,
                target_port: n,
                ..Default::default()
            }
        }
        [left, right] => parse_port_tuple(arg, left, right)?,
        [left, middle, right] => parse_port_triplet(arg, left, middle, right)?,
        [a, b, c, d] if expose => parse_quad(arg, a, b, c, d)?.into_def(),
        [_, _, _, _] => {
            return Err(Error::syntax(
                arg,
                "the [service:port:service:port] form is only valid for expose ports",
            ))
        }
        _ => return Err(Error::syntax(arg, "too many colon separated segments")),
    };

    port.protocol = reconcile_protocol(arg, port.protocol, proto)?;
    port.expose = port.expose || flag_expose;
    port.publish = port.publish || flag_publish;
    Ok(port)
}

/// Parse a list of compact port bindings.
///
/// `expose` enables the four-segment `service:port:service:port` form.
pub fn parse_port_bindings<S: AsRef<str>>(args: &[S], expose: bool) -> Result<Vec<PortBinding>> {
    args.iter()
        .map(|arg| parse_port_binding(arg.as_ref(), expose))
        .collect()
}

/// Parse a single compact port binding.
pub fn parse_port_binding(arg: &str, expose: bool) -> Result<PortBinding> {
    let (expr, flag_expose, flag_publish) = split_modifiers(arg)?;
    let (expr, proto) = split_protocol(arg, expr)?;

    let segs = segments(arg, expr)?;
    let mut port_remap = false;
    let mut binding = match segs.as_slice() {
        [single] => {
            let n = require_num(arg, single)?;
            PortBinding {
                port: n,
                target_port: n,
                ..Default::default()
            }
        }
        [left, right] => {
            port_remap = left.is_num && right.is_num;
            parse_binding_tuple(arg, left, right)?
        }
        [left, middle, right] => parse_binding_triplet(arg, left, middle, right)?,
        [a, b, c, d] if expose => parse_quad(arg, a, b, c, d)?.into_binding(),
        [_, _, _, _] => {
            return Err(Error::syntax(
                arg,
                "the [service:port:service:port] form is only valid for expose ports",
            ))
        }
        _ => return Err(Error::syntax(arg, "too many colon separated segments")),
    };

    binding.protocol = reconcile_protocol(arg, binding.protocol, proto)?;
    if port_remap && binding.protocol == Some(Protocol::Http) {
        // http listeners are host-routed; a remapped external port has no meaning
        return Err(Error::syntax(
            arg,
            format!(
                "can not bind an http port [{}] to an alternative port [{}], only a hostname",
                binding.target_port, binding.port
            ),
        ));
    }
    binding.expose = binding.expose || flag_expose;
    binding.publish = binding.publish || flag_publish;
    Ok(binding)
}

/// Parse `existing:target` (or bare `name`) service-link strings.
pub fn parse_links<S: AsRef<str>>(args: &[S]) -> Result<Vec<ServiceBinding>> {
    let mut result = Vec::with_capacity(args.len());
    for arg in args {
        let arg = arg.as_ref();
        let (existing, target) = match arg.split_once(':') {
            Some((existing, target)) => (existing.trim(), target.trim()),
            None => (arg.trim(), arg.trim()),
        };
        if existing.is_empty() || target.is_empty() {
            return Err(Error::syntax(
                arg,
                "service link must not have a zero length value",
            ));
        }
        result.push(ServiceBinding {
            service: existing.to_string(),
            target: target.to_string(),
        });
    }
    Ok(result)
}

// =============================================================================
// Segment handling
// =============================================================================

/// One colon-separated segment: either a port number or a lowercase name
struct Seg<'a> {
    text: &'a str,
    num: u16,
    is_num: bool,
}

fn segments<'a>(arg: &str, expr: &'a str) -> Result<Vec<Seg<'a>>> {
    expr.split(':').map(|text| segment(arg, text)).collect()
}

fn segment<'a>(arg: &str, text: &'a str) -> Result<Seg<'a>> {
    if let Ok(num) = text.parse::<u16>() {
        return Ok(Seg {
            text,
            num,
            is_num: true,
        });
    }
    if !valid_name(text) {
        return Err(Error::syntax(
            arg,
            format!("segment [{}] must be a port number or a lowercase name", text),
        ));
    }
    Ok(Seg {
        text,
        num: 0,
        is_num: false,
    })
}

fn require_num(arg: &str, seg: &Seg<'_>) -> Result<u16> {
    if !seg.is_num {
        return Err(Error::syntax(
            arg,
            format!("[{}] must be a port number", seg.text),
        ));
    }
    Ok(seg.num)
}

/// Restricted name grammar: a lowercase letter followed by at least one
/// lowercase letter, digit, `-`, or `.`
fn valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    let mut rest = false;
    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.' {
            return false;
        }
        rest = true;
    }
    rest
}

// =============================================================================
// Shape dispatch
// =============================================================================

fn parse_port_tuple(arg: &str, left: &Seg<'_>, right: &Seg<'_>) -> Result<PortDef> {
    match (left.is_num, right.is_num) {
        // 81:80
        (true, true) => Ok(PortDef {
            port: left.num,
            target_port: right.num,
            ..Default::default()
        }),
        // svc:80
        (false, true) => Ok(PortDef {
            service_name: left.text.to_string(),
            target_port: right.num,
            ..Default::default()
        }),
        // web.example.com:svc
        (false, false) => Ok(PortDef {
            service_name: left.text.to_string(),
            target_service_name: right.text.to_string(),
            protocol: Some(Protocol::Http),
            ..Default::default()
        }),
        (true, false) => Err(Error::syntax(
            arg,
            format!(
                "[{}:{}] must be [port:port], [service:port] or [hostname:service]",
                left.text, right.text
            ),
        )),
    }
}

fn parse_port_triplet(
    arg: &str,
    left: &Seg<'_>,
    middle: &Seg<'_>,
    right: &Seg<'_>,
) -> Result<PortDef> {
    match (left.is_num, middle.is_num, right.is_num) {
        // svc:81:80
        (false, true, true) => Ok(PortDef {
            service_name: left.text.to_string(),
            port: middle.num,
            target_port: right.num,
            ..Default::default()
        }),
        // 81:svc:80
        (true, false, true) => Ok(PortDef {
            port: left.num,
            target_service_name: middle.text.to_string(),
            target_port: right.num,
            ..Default::default()
        }),
        // web.example.com:svc:80
        (false, false, true) => Ok(PortDef {
            service_name: left.text.to_string(),
            target_service_name: middle.text.to_string(),
            target_port: right.num,
            protocol: Some(Protocol::Http),
            ..Default::default()
        }),
        _ => Err(Error::syntax(
            arg,
            format!(
                "[{}:{}:{}] must be [service:port:port], [port:service:port] or [hostname:service:port]",
                left.text, middle.text, right.text
            ),
        )),
    }
}

fn parse_binding_tuple(arg: &str, left: &Seg<'_>, right: &Seg<'_>) -> Result<PortBinding> {
    match (left.is_num, right.is_num) {
        // 81:80
        (true, true) => Ok(PortBinding {
            port: left.num,
            target_port: right.num,
            ..Default::default()
        }),
        // svc:80
        (false, true) => Ok(PortBinding {
            target_service_name: left.text.to_string(),
            target_port: right.num,
            ..Default::default()
        }),
        // web.example.com:svc
        (false, false) => Ok(PortBinding {
            service_name: left.text.to_string(),
            hostname: binding_hostname(left.text),
            target_service_name: right.text.to_string(),
            protocol: Some(Protocol::Http),
            ..Default::default()
        }),
        (true, false) => Err(Error::syntax(
            arg,
            format!(
                "[{}:{}] must be [port:port], [service:port] or [hostname:service]",
                left.text, right.text
            ),
        )),
    }
}

fn parse_binding_triplet(
    arg: &str,
    left: &Seg<'_>,
    middle: &Seg<'_>,
    right: &Seg<'_>,
) -> Result<PortBinding> {
    match (left.is_num, middle.is_num, right.is_num) {
        // 81:svc:80
        (true, false, true) => Ok(PortBinding {
            port: left.num,
            target_service_name: middle.text.to_string(),
            target_port: right.num,
            ..Default::default()
        }),
        // web.example.com:svc:80
        (false, false, true) => Ok(PortBinding {
            service_name: left.text.to_string(),
            hostname: binding_hostname(left.text),
            target_service_name: middle.text.to_string(),
            target_port: right.num,
            protocol: Some(Protocol::Http),
            ..Default::default()
        }),
        _ => Err(Error::syntax(
            arg,
            format!(
                "[{}:{}:{}] must be [port:service:port] or [hostname:service:port]",
                left.text, middle.text, right.text
            ),
        )),
    }
}

/// Four-segment `service:port:service:port` form, shared by both record
/// modes but only reachable in expose mode
struct Quad {
    service_name: String,
    port: u16,
    target_service_name: String,
    target_port: u16,
}

impl Quad {
    fn into_def(self) -> PortDef {
        PortDef {
            service_name: self.service_name,
            port: self.port,
            target_service_name: self.target_service_name,
            target_port: self.target_port,
            ..Default::default()
        }
    }

    fn into_binding(self) -> PortBinding {
        PortBinding {
            service_name: self.service_name,
            port: self.port,
            target_service_name: self.target_service_name,
            target_port: self.target_port,
            ..Default::default()
        }
    }
}

fn parse_quad(arg: &str, a: &Seg<'_>, b: &Seg<'_>, c: &Seg<'_>, d: &Seg<'_>) -> Result<Quad> {
    match (a.is_num, b.is_num, c.is_num, d.is_num) {
        // svc:81:other:80
        (false, true, false, true) => Ok(Quad {
            service_name: a.text.to_string(),
            port: b.num,
            target_service_name: c.text.to_string(),
            target_port: d.num,
        }),
        _ => Err(Error::syntax(
            arg,
            format!(
                "[{}:{}:{}:{}] must be [service:port:service:port]",
                a.text, b.text, c.text, d.text
            ),
        )),
    }
}

// =============================================================================
// Suffix handling
// =============================================================================

/// Strip `,expose`/`,publish` modifiers off the end of an argument
fn split_modifiers(arg: &str) -> Result<(&str, bool, bool)> {
    let mut parts = arg.split(',');
    let expr = parts.next().unwrap_or_default();
    let (mut expose, mut publish) = (false, false);
    for modifier in parts {
        match modifier.trim() {
            "expose" => expose = true,
            "publish" => publish = true,
            other => {
                return Err(Error::syntax(
                    arg,
                    format!("unknown modifier [{}], expected expose or publish", other),
                ))
            }
        }
    }
    Ok((expr, expose, publish))
}

/// Split off the `/protocol` suffix, validating the protocol name
fn split_protocol<'a>(arg: &str, expr: &'a str) -> Result<(&'a str, Option<Protocol>)> {
    match expr.split_once('/') {
        None => Ok((expr, None)),
        Some((head, "")) => Ok((head, None)),
        Some((head, proto)) => {
            let proto = Protocol::from_str(proto)
                .map_err(|_| Error::syntax(arg, format!("invalid protocol [{}]", proto)))?;
            Ok((head, Some(proto)))
        }
    }
}

/// An explicit `/protocol` suffix must agree with any protocol implied by
/// the shape; an absent one is filled from the inferred protocol
fn reconcile_protocol(
    arg: &str,
    inferred: Option<Protocol>,
    requested: Option<Protocol>,
) -> Result<Option<Protocol>> {
    match (inferred, requested) {
        (Some(inferred), Some(requested)) if inferred != requested => Err(Error::syntax(
            arg,
            format!(
                "inferred protocol [{}] does not match requested protocol [{}]",
                inferred, requested
            ),
        )),
        (Some(proto), _) | (None, Some(proto)) => Ok(Some(proto)),
        (None, None) => Ok(None),
    }
}

/// Bindings whose left-hand name is dotted are hostname requests; carry the
/// hostname explicitly so downstream resolvers need not re-derive it
fn binding_hostname(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        String::new()
    }
}
