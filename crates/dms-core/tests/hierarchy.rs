// Agents, views, services, protocols and templates against the mock gateway.
#![allow(clippy::unwrap_used)]

mod common;

use common::{AGENT, PROTOCOL, VERSION, build_info, element_response, root};
use dms_api::messages::{
    AgentInfo, ServiceInfo, ServiceInclusionInfo, ServiceUpdate, TrendTemplateInfo, ViewInfo,
    ViewUpdate,
};
use dms_api::{Request, Response};
use dms_core::{
    AgentState, AgentVersion, AlarmLevel, DmsElementId, DmsError, DmsServiceId,
    ElementConfiguration, ElementConnection, ProtocolRef, ServiceConfiguration,
    ServiceParamsConfiguration, ServiceTarget, ViewConfiguration, VirtualConnection,
};
use pretty_assertions::assert_eq;

// ── Identifiers ─────────────────────────────────────────────────────

#[test]
fn element_id_parses_from_its_text_form() {
    let id: DmsElementId = "400/201".parse().unwrap();
    assert_eq!(id.agent_id(), 400);
    assert_eq!(id.element_id(), 201);
    assert_eq!(id.value(), "400/201");
}

// ── Agents ──────────────────────────────────────────────────────────

#[tokio::test]
async fn agent_ids_start_at_one() {
    let (mock, dms) = root();
    assert!(matches!(dms.agent(0), Err(DmsError::OutOfRange { .. })));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn enumerated_agents_are_loaded() {
    let (mock, dms) = root();
    mock.queue_responses(vec![
        Response::AgentInfo(AgentInfo {
            id: 400,
            name: "DMA-01".into(),
            host_name: "dma01.example.net".into(),
            state: "running".into(),
        }),
        Response::AgentInfo(AgentInfo {
            id: 401,
            name: "DMA-02".into(),
            host_name: "dma02.example.net".into(),
            state: "stopped".into(),
        }),
    ]);

    let agents = dms.agents().await.unwrap();
    assert_eq!(agents.len(), 2);
    assert!(agents.iter().all(|a| a.is_loaded()));
    assert_eq!(agents[0].name().unwrap(), "DMA-01");
    assert_eq!(agents[1].state().unwrap(), AgentState::Stopped);
}

#[tokio::test]
async fn agent_version_is_cached_per_handle() {
    let (mock, dms) = root();
    mock.queue_response(build_info("10.3.0.0-12000"));

    let mut agent = dms.agent(AGENT).unwrap();
    assert_eq!(
        agent.version().await.unwrap(),
        AgentVersion::new(10, 3, 0, 0, 12000)
    );
    assert!(agent.is_version_higher("10.2.0.0-1").await.unwrap());
    assert!(!agent.is_version_higher("10.4.0.0").await.unwrap());
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn missing_agent_is_reported_by_id() {
    let (mock, dms) = root();
    mock.queue_not_found();

    let mut agent = dms.agent(999).unwrap();
    let err = agent.load().await.unwrap_err();
    assert!(matches!(err, DmsError::AgentNotFound { agent_id: 999 }));
}

#[tokio::test]
async fn element_by_name_must_live_on_the_agent() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));

    let other = dms.agent(401).unwrap();
    let err = other.element_by_name("Router 1").await.unwrap_err();
    assert!(err.is_not_found());
}

// ── Element creation ────────────────────────────────────────────────

#[tokio::test]
async fn create_virtual_element_returns_new_id() {
    let (mock, dms) = root();
    mock.queue_response(Response::ElementCreated { element_id: 305 });

    let config = ElementConfiguration::new(
        "Virtual Router",
        ProtocolRef::new(PROTOCOL, VERSION),
        vec![ElementConnection::Virtual(VirtualConnection)],
    )
    .unwrap()
    .with_description("lab");

    let mut agent = dms.agent(AGENT).unwrap();
    let id = agent.create_element(&config).await.unwrap();
    assert_eq!(id.agent_id(), AGENT);
    assert_eq!(id.element_id(), 305);

    // No SNMPv3 port, so the agent version is never asked for.
    assert_eq!(mock.request_count(), 1);
    match mock.last_request().unwrap() {
        Request::AddElement { agent_id, element } => {
            assert_eq!(agent_id, AGENT);
            assert_eq!(element.name.as_deref(), Some("Virtual Router"));
            assert_eq!(element.views, Some(vec![-1]));
            assert_eq!(element.ports.len(), 1);
            assert_eq!(element.ports[0].protocol_type, "virtual");
        }
        other => panic!("expected AddElement, got {other:?}"),
    }
}

#[tokio::test]
async fn create_element_rejects_an_unexpected_reply() {
    let (mock, dms) = root();
    mock.queue_response(Response::Ack);

    let config = ElementConfiguration::new(
        "Virtual Router",
        ProtocolRef::new(PROTOCOL, VERSION),
        vec![ElementConnection::Virtual(VirtualConnection)],
    )
    .unwrap();
    let mut agent = dms.agent(AGENT).unwrap();
    let err = agent.create_element(&config).await.unwrap_err();
    assert!(matches!(
        err,
        DmsError::Api(dms_api::Error::UnexpectedResponse { expected: "ElementCreated", .. })
    ));
}

// ── Views ───────────────────────────────────────────────────────────

fn studios() -> ViewInfo {
    ViewInfo {
        id: 12,
        name: "Studios".into(),
        parent_id: Some(-1),
        path: "Root/Studios".into(),
        child_ids: vec![13, 14],
        elements: vec![dms_api::messages::ElementKey {
            agent_id: AGENT,
            element_id: 201,
        }],
        properties: Vec::new(),
    }
}

#[tokio::test]
async fn create_view_returns_unloaded_handle() {
    let (mock, dms) = root();
    mock.queue_response(Response::ViewCreated { view_id: 15 });

    let config = ViewConfiguration::new("Studio C")
        .unwrap()
        .with_parent(12)
        .unwrap();
    let view = dms.create_view(&config).await.unwrap();
    assert_eq!(view.id(), 15);
    assert!(!view.is_loaded());
    assert_eq!(
        mock.last_request(),
        Some(Request::AddView {
            name: "Studio C".into(),
            parent_id: 12,
        })
    );
}

#[tokio::test]
async fn view_navigation_hands_out_unloaded_handles() {
    let (mock, dms) = root();
    mock.queue_response(Response::ViewInfo(studios()));

    let mut view = dms.view(12);
    view.load().await.unwrap();
    assert_eq!(view.path().unwrap(), "Root/Studios");

    let children = view.child_views().unwrap();
    assert_eq!(children.iter().map(|v| v.id()).collect::<Vec<_>>(), [13, 14]);
    assert!(children.iter().all(|v| !v.is_loaded()));
    assert_eq!(view.parent_view().unwrap().unwrap().id(), -1);
    assert_eq!(
        view.elements().unwrap()[0].id(),
        DmsElementId::new(AGENT, 201).unwrap()
    );
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn view_record_without_parent_is_rejected() {
    let (mock, dms) = root();
    let mut orphan = studios();
    orphan.parent_id = None;
    mock.queue_response(Response::ViewInfo(orphan));

    let mut view = dms.view(12);
    assert!(matches!(
        view.load().await,
        Err(DmsError::IncorrectData { .. })
    ));
    assert!(!view.is_loaded());
}

#[tokio::test]
async fn view_rename_sends_only_the_name() {
    let (mock, dms) = root();
    mock.queue_response(Response::ViewInfo(studios()));
    mock.queue_response(Response::Ack);

    let mut view = dms.view(12);
    view.load().await.unwrap();
    view.set_parent(-1).unwrap();
    view.set_name("Studios East").unwrap();
    view.update().await.unwrap();

    assert_eq!(
        mock.last_request(),
        Some(Request::UpdateView {
            view_id: 12,
            update: ViewUpdate {
                name: Some("Studios East".into()),
                ..ViewUpdate::default()
            },
        })
    );
    assert!(!view.is_loaded());
}

#[tokio::test]
async fn view_cannot_be_its_own_parent() {
    let (_mock, dms) = root();
    let mut view = dms.view(12);
    assert!(matches!(
        view.set_parent(12),
        Err(DmsError::InvalidArgument { .. })
    ));
}

#[tokio::test]
async fn root_view_cannot_be_deleted() {
    let (mock, dms) = root();
    let mut root_view = dms.view(-1);
    assert!(matches!(
        root_view.delete().await,
        Err(DmsError::InvalidArgument { .. })
    ));
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn deleting_a_missing_view_is_not_found() {
    let (mock, dms) = root();
    mock.queue_not_found();
    let mut view = dms.view(77);
    let err = view.delete().await.unwrap_err();
    assert!(matches!(err, DmsError::ViewNotFound { ref identifier } if identifier == "77"));
}

// ── Services ────────────────────────────────────────────────────────

fn service_info() -> ServiceInfo {
    ServiceInfo {
        agent_id: AGENT,
        service_id: 7,
        name: "Uplink".into(),
        description: String::new(),
        views: vec![-1],
        properties: Vec::new(),
        included: vec![ServiceInclusionInfo {
            kind: "element".into(),
            agent_id: AGENT,
            id: 201,
            alias: "core".into(),
            is_excluded: false,
            alarm_cap: Some(4),
        }],
    }
}

#[tokio::test]
async fn create_service_sends_every_inclusion() {
    let (mock, dms) = root();
    mock.queue_response(Response::ServiceCreated { service_id: 8 });

    let mut params = ServiceParamsConfiguration::new();
    params
        .include_element(DmsElementId::new(AGENT, 201).unwrap())
        .unwrap()
        .alias = "core".into();
    params
        .include_service(DmsServiceId::new(AGENT, 7).unwrap())
        .unwrap()
        .alarm_cap = Some(AlarmLevel::Minor);
    let config = ServiceConfiguration::new("Backbone")
        .unwrap()
        .with_params(params);

    let agent = dms.agent(AGENT).unwrap();
    let id = agent.create_service(&config).await.unwrap();
    assert_eq!(id, DmsServiceId::new(AGENT, 8).unwrap());

    match mock.last_request().unwrap() {
        Request::AddService { service, .. } => {
            let included = service.included.unwrap();
            assert_eq!(included.len(), 2);
            assert_eq!(included[0].alias, "core");
            assert_eq!(included[1].kind, "service");
            assert_eq!(included[1].alarm_cap, Some(3));
        }
        other => panic!("expected AddService, got {other:?}"),
    }
}

#[tokio::test]
async fn service_inclusions_load_with_typed_targets() {
    let (mock, dms) = root();
    mock.queue_response(Response::ServiceInfo(service_info()));

    let mut service = dms.service(DmsServiceId::new(AGENT, 7).unwrap());
    service.load().await.unwrap();
    let inclusion = service.params().unwrap().get(0).unwrap();
    assert_eq!(
        inclusion.target,
        ServiceTarget::Element(DmsElementId::new(AGENT, 201).unwrap())
    );
    assert_eq!(inclusion.alarm_cap, Some(AlarmLevel::Major));
}

#[tokio::test]
async fn service_update_sends_changed_fields() {
    let (mock, dms) = root();
    mock.queue_response(Response::ServiceInfo(service_info()));
    mock.queue_response(Response::Ack);

    let mut service = dms.service(DmsServiceId::new(AGENT, 7).unwrap());
    service.load().await.unwrap();
    service.set_name("Uplink").unwrap();
    service.set_description("north uplink").unwrap();
    service.update().await.unwrap();

    assert_eq!(
        mock.last_request(),
        Some(Request::UpdateService {
            agent_id: AGENT,
            service_id: 7,
            update: ServiceUpdate {
                description: Some("north uplink".into()),
                ..ServiceUpdate::default()
            },
        })
    );
    assert!(!service.is_loaded());
}

#[tokio::test]
async fn service_update_on_vanished_service_is_not_found() {
    let (mock, dms) = root();
    mock.queue_response(Response::ServiceInfo(service_info()));
    mock.queue_not_found();

    let mut service = dms.service(DmsServiceId::new(AGENT, 7).unwrap());
    service.load().await.unwrap();
    service.set_views([-1, 12]).unwrap();
    let err = service.update().await.unwrap_err();
    assert!(matches!(err, DmsError::ServiceNotFound { .. }));
}

// ── Protocols and templates ─────────────────────────────────────────

#[tokio::test]
async fn trend_template_of_another_protocol_is_refused() {
    let (mock, dms) = root();
    mock.queue_response(element_response(201, "Router 1"));
    mock.queue_response(Response::TrendTemplate(TrendTemplateInfo {
        name: "Default".into(),
        protocol: "Other Vendor".into(),
        version: "2.0.0.0".into(),
    }));
    mock.queue_response(Response::TrendTemplate(TrendTemplateInfo {
        name: "Default".into(),
        protocol: PROTOCOL.into(),
        version: VERSION.into(),
    }));

    let mut element = dms.element(DmsElementId::new(AGENT, 201).unwrap());
    element.load().await.unwrap();

    let foreign = dms
        .protocol("Other Vendor", "2.0.0.0")
        .unwrap()
        .trend_template("Default")
        .await
        .unwrap();
    assert!(matches!(
        element.set_trend_template(&foreign),
        Err(DmsError::IncorrectData { .. })
    ));

    let own = dms
        .protocol(PROTOCOL, VERSION)
        .unwrap()
        .trend_template("Default")
        .await
        .unwrap();
    element.set_trend_template(&own).unwrap();
    assert_eq!(element.trend_template().unwrap(), Some("Default"));
    assert!(element.has_pending_changes());
}

#[tokio::test]
async fn missing_template_names_protocol_and_version() {
    let (mock, dms) = root();
    mock.queue_not_found();

    let err = dms
        .protocol(PROTOCOL, VERSION)
        .unwrap()
        .alarm_template("Missing")
        .await
        .unwrap_err();
    match err {
        DmsError::TemplateNotFound {
            name,
            protocol,
            version,
        } => {
            assert_eq!(name, "Missing");
            assert_eq!(protocol, PROTOCOL);
            assert_eq!(version, VERSION);
        }
        other => panic!("expected TemplateNotFound, got {other:?}"),
    }
}
