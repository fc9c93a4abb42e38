// Element load/update behavior against the mock gateway.
#![allow(clippy::unwrap_used)]

mod common;

use common::{
    AGENT, build_info, element_info, element_response, protocol_response, root, snmpv2_port,
};
use dms_api::messages::{ElementUpdate, PropertyValueInfo};
use dms_api::{Request, Response};
use dms_core::{
    ConnectionKind, DmsElementId, DmsError, ElementConnection, ElementConnectionMut, ElementState,
    SnmpCommunityConnection, SnmpV3AuthAlgorithm, SnmpV3Connection, SnmpV3EncryptionAlgorithm,
    SnmpV3Security, SnmpV3SecurityConfig, VirtualConnection,
};
use pretty_assertions::assert_eq;
use secrecy::SecretString;

fn id() -> DmsElementId {
    DmsElementId::new(AGENT, 201).unwrap()
}

fn sent_update(request: &Request) -> &ElementUpdate {
    match request {
        Request::UpdateElement { update, .. } => update,
        other => panic!("expected UpdateElement, got {other:?}"),
    }
}

// ── Load model ──────────────────────────────────────────────────────

#[tokio::test]
async fn getters_require_a_load() {
    let (mock, dms) = root();
    let element = dms.element(id());

    assert!(!element.is_loaded());
    let err = element.name().unwrap_err();
    assert!(matches!(err, DmsError::NotLoaded { entity: "Element", .. }));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn load_is_one_request() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();

    assert_eq!(element.name().unwrap(), "Router 1");
    assert_eq!(element.state().unwrap(), ElementState::Active);
    assert_eq!(element.connections().unwrap().len(), 1);
    assert_eq!(
        element.properties().unwrap().value("location"),
        Some("Brussels")
    );
    assert_eq!(
        mock.requests(),
        vec![Request::GetElementInfo {
            agent_id: AGENT,
            element_id: 201
        }]
    );
}

#[tokio::test]
async fn load_on_demand_fetches_once() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load_on_demand().await.unwrap();
    element.load_on_demand().await.unwrap();
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn missing_element_maps_to_not_found() {
    let (mock, dms) = root();
    mock.queue_not_found();

    let mut element = dms.element(id());
    let err = element.load().await.unwrap_err();
    assert!(matches!(err, DmsError::ElementNotFound { ref identifier } if identifier == "400/201"));
    assert!(!element.is_loaded());
}

#[tokio::test]
async fn exists_does_not_load() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_not_found();

    let element = dms.element(id());
    assert!(element.exists().await.unwrap());
    assert!(!element.exists().await.unwrap());
    assert!(!element.is_loaded());
}

// ── Update ──────────────────────────────────────────────────────────

#[tokio::test]
async fn description_change_sends_only_description() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(Response::Ack);
    mock.queue_response(Response::ElementInfo(dms_api::messages::ElementInfo {
        description: "edge router".into(),
        ..element_info(201, "Router 1")
    }));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_description("edge router").unwrap();
    element.update().await.unwrap();

    let requests = mock.requests();
    assert_eq!(
        sent_update(&requests[1]),
        &ElementUpdate {
            description: Some("edge router".into()),
            ..ElementUpdate::default()
        }
    );

    assert!(!element.is_loaded());
    element.load_on_demand().await.unwrap();
    assert_eq!(element.description().unwrap(), "edge router");
    assert_eq!(mock.request_count(), 3);
}

#[tokio::test]
async fn second_update_is_silent() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_name("Router 2").unwrap();
    element.update().await.unwrap();
    element.update().await.unwrap();
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn writing_current_values_sends_nothing() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_name("Router 1").unwrap();
    element.set_description("core router").unwrap();
    element.add_view(12).unwrap();
    element.advanced_mut().unwrap().set_hidden(false);

    assert!(!element.has_pending_changes());
    element.update().await.unwrap();
    assert_eq!(mock.request_count(), 1);
    assert!(element.is_loaded());
}

#[tokio::test]
async fn view_membership_uses_set_semantics() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.remove_view(12).unwrap();
    element.add_view(12).unwrap();
    element.set_views([12, -1, 12]).unwrap();

    assert!(!element.has_pending_changes());
}

#[tokio::test]
async fn emptied_views_are_rejected_before_sending() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_views([]).unwrap();

    let err = element.update().await.unwrap_err();
    assert!(matches!(err, DmsError::IncorrectData { .. }));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn deleted_state_fails_fast() {
    let (mock, dms) = root();
    mock.queue_response(Response::ElementInfo(dms_api::messages::ElementInfo {
        state: 6,
        ..element_info(201, "Router 1")
    }));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    assert!(element.is_deleted());

    assert!(matches!(
        element.set_description("x"),
        Err(DmsError::ElementNotFound { .. })
    ));
    assert!(matches!(
        element.update().await,
        Err(DmsError::ElementNotFound { .. })
    ));
    assert!(matches!(
        element.start().await,
        Err(DmsError::ElementNotFound { .. })
    ));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn vanished_element_marks_handle_deleted() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_not_found();

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_description("edge").unwrap();

    let err = element.update().await.unwrap_err();
    assert!(matches!(err, DmsError::ElementNotFound { .. }));
    assert!(element.is_deleted());
    assert!(!element.is_loaded());

    // The handle refuses further wire operations.
    assert!(element.load().await.is_err());
    assert_eq!(mock.request_count(), 2);
}

#[tokio::test]
async fn other_failures_are_reraised_after_an_existence_check() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_error(dms_api::Error::Remote {
        code: -2_147_220_935,
        message: "busy".into(),
    });
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_description("edge").unwrap();

    let err = element.update().await.unwrap_err();
    assert!(matches!(
        err,
        DmsError::Api(dms_api::Error::Remote { code: -2_147_220_935, .. })
    ));
    assert!(!element.is_deleted());
    assert!(!element.is_loaded());
    assert_eq!(mock.request_count(), 3);
}

// ── Properties ──────────────────────────────────────────────────────

#[tokio::test]
async fn property_definitions_are_fetched_once_per_root() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_responses(common::property_configs(&[("Location", false), ("Serial", true)]));
    mock.queue_response(Response::Ack);
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_property("location", "Ghent").await.unwrap();
    let err = element.set_property("Serial", "X1").await.unwrap_err();
    assert!(matches!(err, DmsError::InvalidArgument { .. }));
    let err = element.set_property("Owner", "ops").await.unwrap_err();
    assert!(matches!(err, DmsError::OutOfRange { .. }));
    element.update().await.unwrap();

    let requests = mock.requests();
    assert_eq!(
        sent_update(&requests[2]).properties,
        vec![PropertyValueInfo {
            name: "Location".into(),
            value: "Ghent".into(),
        }]
    );

    // A reload reuses the cached definitions.
    element.load().await.unwrap();
    element.set_property("Location", "Antwerp").await.unwrap();
    assert_eq!(mock.request_count(), 4);
}

// ── Connections ─────────────────────────────────────────────────────

#[tokio::test]
async fn edited_connection_sends_changed_port_only() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(build_info("10.2.0.0-12345"));
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.load().await.unwrap();
    match element.connections_mut().unwrap().get_mut(0).unwrap() {
        ElementConnectionMut::SnmpV2(snmp) => snmp.set_get_community("monitoring"),
        other => panic!("expected SNMPv2, got {other:?}"),
    }
    element.update().await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[1], Request::GetAgentBuildInfo { agent_id: AGENT });
    let update = sent_update(&requests[2]);
    assert_eq!(update.ports.len(), 1);
    assert_eq!(update.ports[0].get_community, "monitoring");
    assert_eq!(update.ports[0].polling_ip, "10.0.0.1");
    assert!(update.name.is_none());
}

#[tokio::test]
async fn edit_on_a_skipped_port_number_targets_that_port() {
    let (mock, dms) = root();
    let mut info = element_info(201, "Router 1");
    info.ports = vec![snmpv2_port(0, "10.0.0.1"), snmpv2_port(2, "10.0.0.2")];
    mock.queue_response(Response::ElementInfo(info));
    mock.queue_response(build_info("10.2.0.0-12345"));
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.load().await.unwrap();
    match element.connections_mut().unwrap().get_mut(1).unwrap() {
        ElementConnectionMut::SnmpV2(snmp) => snmp.set_get_community("monitoring"),
        other => panic!("expected SNMPv2, got {other:?}"),
    }
    element.update().await.unwrap();

    let update = sent_update(&mock.requests()[2]).clone();
    assert_eq!(update.ports.len(), 1);
    let port = &update.ports[0];
    assert_eq!(port.port_index, 2);
    assert_eq!(port.polling_ip, "10.0.0.2");
    assert_eq!(port.get_community, "monitoring");
    assert_eq!(port.set_community, "private");
    assert_eq!(port.retries, 3);
    assert_eq!(port.timeout_ms, 1500);
}

#[tokio::test]
async fn sent_connection_edits_are_forgotten() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(build_info("10.2.0.0-12345"));
    mock.queue_response(Response::Ack);
    mock.queue_response(element_response(201, "Router 1"));

    let mut element = dms.element(id());
    element.load().await.unwrap();
    if let Some(ElementConnectionMut::SnmpV2(snmp)) = element.connections_mut().unwrap().get_mut(0)
    {
        snmp.set_get_community("monitoring");
    }
    element.update().await.unwrap();
    assert!(!element.is_loaded());
    assert!(!element.has_pending_changes());

    element.load().await.unwrap();
    element.update().await.unwrap();
    assert_eq!(mock.request_count(), 4);
}

#[tokio::test]
async fn in_place_edits_cannot_change_the_connection_kind() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(protocol_response(&["snmpv2"]));
    mock.queue_response(build_info("10.2.0.0-12345"));
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.load().await.unwrap();

    // The mutable view only reaches the SNMPv2 settings; the port stays
    // SNMPv2 and nothing is pending until a field actually changes.
    let connections = element.connections_mut().unwrap();
    assert!(matches!(connections.get_mut(0), Some(ElementConnectionMut::SnmpV2(_))));
    assert!(!element.has_pending_changes());
    assert_eq!(
        element.connections().unwrap().get(0).unwrap().kind(),
        ConnectionKind::SnmpV2
    );

    // Changing the kind goes through the protocol check.
    let virt = ElementConnection::Virtual(VirtualConnection);
    let err = element.set_connection(0, virt).await.unwrap_err();
    assert!(matches!(err, DmsError::IncorrectData { .. }));
    assert!(!element.has_pending_changes());

    // A swap of the settings themselves is still sent.
    if let Some(ElementConnectionMut::SnmpV2(snmp)) = element.connections_mut().unwrap().get_mut(0)
    {
        *snmp = SnmpCommunityConnection::new("10.0.0.7").unwrap();
    }
    assert!(element.has_pending_changes());
    element.update().await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 4);
    let port = &sent_update(&requests[3]).ports[0];
    assert_eq!(port.protocol_type, "snmpv2");
    assert_eq!(port.polling_ip, "10.0.0.7");
}

#[tokio::test]
async fn replacing_a_connection_is_checked_against_the_protocol() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(protocol_response(&["snmpv2", "http"]));

    let mut element = dms.element(id());
    element.load().await.unwrap();

    let virt = ElementConnection::Virtual(VirtualConnection);
    let err = element.set_connection(0, virt.clone()).await.unwrap_err();
    assert!(matches!(err, DmsError::IncorrectData { .. }));

    let err = element.set_connection(2, virt).await.unwrap_err();
    assert!(matches!(err, DmsError::OutOfRange { .. }));

    let v2 = ElementConnection::SnmpV2(SnmpCommunityConnection::new("10.0.0.2").unwrap());
    element.set_connection(0, v2).await.unwrap();
    assert!(element.has_pending_changes());

    // The protocol was fetched once for all three calls.
    assert_eq!(mock.request_count(), 2);
}

fn snmpv3() -> ElementConnection {
    let config = SnmpV3SecurityConfig::auth_priv(
        "monitor",
        SnmpV3AuthAlgorithm::Sha1,
        SecretString::from("auth-pass"),
        SnmpV3EncryptionAlgorithm::Aes128,
        SecretString::from("priv-pass"),
    )
    .unwrap();
    ElementConnection::SnmpV3(
        SnmpV3Connection::new("10.0.0.9", SnmpV3Security::Config(config)).unwrap(),
    )
}

#[tokio::test]
async fn snmpv3_on_legacy_agent_uses_community_fields() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(protocol_response(&["snmpv3"]));
    mock.queue_response(build_info("10.0.3.0-9019"));
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_connection(0, snmpv3()).await.unwrap();
    element.update().await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[2], Request::GetAgentBuildInfo { agent_id: AGENT });
    let port = &sent_update(&requests[3]).ports[0];
    assert_eq!(port.protocol_type, "snmpv3");
    assert_eq!(port.get_community, "monitor");
    assert_eq!(port.set_community, "priv-pass");
}

#[tokio::test]
async fn snmpv3_on_current_agent_clears_community_fields() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(protocol_response(&["snmpv3"]));
    mock.queue_response(build_info("10.0.3.0-9020"));
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.load().await.unwrap();
    element.set_connection(0, snmpv3()).await.unwrap();
    element.update().await.unwrap();

    let requests = mock.requests();
    let port = &sent_update(&requests[3]).ports[0];
    assert_eq!(port.get_community, "");
    assert_eq!(port.set_community, "");
    assert_eq!(port.snmp_v3.as_ref().unwrap().username, "monitor");
}

// ── State and parameters ────────────────────────────────────────────

#[tokio::test]
async fn delete_then_everything_fails_locally() {
    let (mock, dms) = root();
    mock.queue_response(Response::Ack);

    let mut element = dms.element(id());
    element.delete().await.unwrap();
    assert!(element.is_deleted());

    assert!(matches!(
        element.get_standalone_parameter(10).await,
        Err(DmsError::ElementNotFound { .. })
    ));
    assert!(!element.exists().await.unwrap());
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn stopped_element_rejects_parameter_access() {
    let (mock, dms) = root();
    mock.queue_response(Response::ElementInfo(dms_api::messages::ElementInfo {
        state: 4,
        ..element_info(201, "Router 1")
    }));

    let mut element = dms.element(id());
    let err = element
        .set_standalone_parameter(100, 12.5)
        .await
        .unwrap_err();
    assert!(matches!(err, DmsError::ElementStopped { .. }));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn parameter_ids_start_at_one() {
    let (mock, dms) = root();
    let mut element = dms.element(id());
    assert!(matches!(
        element.get_standalone_parameter(0).await,
        Err(DmsError::OutOfRange { .. })
    ));
    assert!(matches!(
        element.get_table_cell(1000, "").await,
        Err(DmsError::InvalidArgument { .. })
    ));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn table_cell_is_addressed_by_key() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(Response::ParameterValue(dms_api::messages::ParameterValue::Text(
        "up".into(),
    )));

    let mut element = dms.element(id());
    let value = element.get_table_cell(1002, "eth0").await.unwrap();
    assert_eq!(value, dms_api::messages::ParameterValue::Text("up".into()));
    assert_eq!(
        mock.last_request(),
        Some(Request::GetParameter {
            agent_id: AGENT,
            element_id: 201,
            parameter_id: 1002,
            table_key: Some("eth0".into()),
        })
    );
}
