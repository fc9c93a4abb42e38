// Shared fixtures for the mock-gateway scenarios.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use dms_api::messages::{
    BuildInfo, ElementInfo, ElementPortInfo, PropertyConfig, PropertyValueInfo, ProtocolConnectionInfo,
    ProtocolInfo,
};
use dms_api::{MockCommunication, Response};
use dms_core::Dms;

pub const AGENT: i32 = 400;
pub const PROTOCOL: &str = "Cisco Router";
pub const VERSION: &str = "1.0.0.1";

/// A root over a fresh mock; both share the same queue and request log.
pub fn root() -> (MockCommunication, Dms) {
    let mock = MockCommunication::new();
    let dms = Dms::new(Arc::new(mock.clone()));
    (mock, dms)
}

pub fn snmpv2_port(index: i32, ip: &str) -> ElementPortInfo {
    ElementPortInfo {
        port_index: index,
        protocol_type: "snmpv2".into(),
        polling_ip: ip.into(),
        ip_port: Some(161),
        get_community: "public".into(),
        set_community: "private".into(),
        retries: 3,
        timeout_ms: 1500,
        type_of_ip: "udp".into(),
        ..ElementPortInfo::default()
    }
}

pub fn element_info(element_id: i32, name: &str) -> ElementInfo {
    ElementInfo {
        agent_id: AGENT,
        element_id,
        name: name.into(),
        description: "core router".into(),
        protocol_name: PROTOCOL.into(),
        protocol_version: VERSION.into(),
        state: 1,
        host_agent_id: AGENT,
        views: vec![-1, 12],
        properties: vec![PropertyValueInfo {
            name: "Location".into(),
            value: "Brussels".into(),
        }],
        ports: vec![snmpv2_port(0, "10.0.0.1")],
        timeout_ms: 30_000,
        ..ElementInfo::default()
    }
}

pub fn element_response(element_id: i32, name: &str) -> Response {
    Response::ElementInfo(element_info(element_id, name))
}

pub fn build_info(version: &str) -> Response {
    Response::BuildInfo(BuildInfo {
        agent_id: AGENT,
        version: version.into(),
    })
}

pub fn protocol_response(kinds: &[&str]) -> Response {
    Response::ProtocolInfo(ProtocolInfo {
        name: PROTOCOL.into(),
        version: VERSION.into(),
        protocol_type: kinds.first().copied().unwrap_or("virtual").into(),
        device_type: "Router".into(),
        referenced_version: String::new(),
        connections: kinds
            .iter()
            .map(|k| ProtocolConnectionInfo {
                name: (*k).into(),
                protocol_type: (*k).into(),
            })
            .collect(),
    })
}

pub fn property_configs(names: &[(&str, bool)]) -> Vec<Response> {
    names
        .iter()
        .enumerate()
        .map(|(i, (name, read_only))| {
            Response::PropertyConfig(PropertyConfig {
                id: i32::try_from(i).unwrap() + 1,
                name: (*name).into(),
                is_read_only: *read_only,
                ..PropertyConfig::default()
            })
        })
        .collect()
}
