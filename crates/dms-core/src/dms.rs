// ── System root ──
//
// `Dms` is the entry point: it owns the gateway and credential encoder,
// hands out handles for agents, elements, views, protocols and services,
// and caches the system-wide property definitions once per kind.
//
// Cheap to clone (`Arc` inner); every handle keeps a clone as its
// back-reference to the root.

use std::fmt;
use std::sync::Arc;

use dms_api::messages::{
    AgentInfo, ElementInfo, PropertyConfig, PropertyKind, ProtocolInfo, ServiceInfo, ViewInfo,
};
use dms_api::{Communication, CommunicationExt, FromResponse, HttpCommunication, Request, Response};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::agent::Dma;
use crate::config::DmsConfig;
use crate::credential::{CredentialEncoder, PlainTextEncoder};
use crate::element::DmsElement;
use crate::error::{DmsError, map_not_found};
use crate::id::{DmsElementId, DmsServiceId};
use crate::property::{PropertyDefinition, PropertyDefinitions};
use crate::protocol::{DmsProtocol, ProtocolRef};
use crate::service::DmsService;
use crate::view::{DmsView, ViewConfiguration};

struct DmsInner {
    comm: Arc<dyn Communication>,
    encoder: Arc<dyn CredentialEncoder>,
    element_properties: OnceCell<Arc<PropertyDefinitions>>,
    view_properties: OnceCell<Arc<PropertyDefinitions>>,
    service_properties: OnceCell<Arc<PropertyDefinitions>>,
}

/// Handle to one system.
#[derive(Clone)]
pub struct Dms {
    inner: Arc<DmsInner>,
}

impl fmt::Debug for Dms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dms").finish_non_exhaustive()
    }
}

impl Dms {
    /// Root over an existing gateway, sending SNMPv3 secrets as-is.
    pub fn new(comm: Arc<dyn Communication>) -> Self {
        Self::with_encoder(comm, Arc::new(PlainTextEncoder))
    }

    /// Root over an existing gateway with an explicit credential encoder.
    pub fn with_encoder(comm: Arc<dyn Communication>, encoder: Arc<dyn CredentialEncoder>) -> Self {
        Self {
            inner: Arc::new(DmsInner {
                comm,
                encoder,
                element_properties: OnceCell::new(),
                view_properties: OnceCell::new(),
                service_properties: OnceCell::new(),
            }),
        }
    }

    /// Build the HTTP gateway described by `config` and wrap it.
    pub fn connect(config: &DmsConfig) -> Result<Self, DmsError> {
        let mut comm = HttpCommunication::new(&config.url, &config.transport())?;
        if let Some(creds) = &config.credentials {
            comm = comm.with_credentials(creds.username.clone(), creds.password.clone());
        }
        debug!(url = %config.url, "gateway configured");
        Ok(Self::new(Arc::new(comm)))
    }

    pub(crate) fn comm(&self) -> &dyn Communication {
        &*self.inner.comm
    }

    pub(crate) fn encoder(&self) -> &dyn CredentialEncoder {
        &*self.inner.encoder
    }

    // ── Gateway helpers ──────────────────────────────────────────────

    /// Fetch exactly one `T`. Absence and the remote not-found code both
    /// become `not_found()`.
    pub(crate) async fn fetch<T>(
        &self,
        request: Request,
        not_found: impl Fn() -> DmsError,
    ) -> Result<T, DmsError>
    where
        T: FromResponse + Send,
    {
        let name = request.name();
        debug!(request = name, "fetching");
        match self.comm().send_single_response_message(request).await {
            Ok(Some(response)) => extract(response),
            Ok(None) => Err(not_found()),
            Err(err) => Err(map_not_found(err, not_found)),
        }
    }

    /// Existence check: `false` on absence or the remote not-found code.
    pub(crate) async fn probe(&self, request: Request) -> Result<bool, DmsError> {
        debug!(request = request.name(), "existence check");
        match self.comm().send_single_response_message(request).await {
            Ok(response) => Ok(response.is_some()),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    // ── Agents ───────────────────────────────────────────────────────

    pub fn agent(&self, agent_id: i32) -> Result<Dma, DmsError> {
        Dma::new(self.clone(), agent_id)
    }

    pub async fn agents(&self) -> Result<Vec<Dma>, DmsError> {
        let infos: Vec<AgentInfo> = self
            .comm()
            .request_many(Request::GetAgentInfo { agent_id: None })
            .await?;
        Ok(infos
            .into_iter()
            .map(|info| Dma::from_info(self.clone(), info))
            .collect())
    }

    pub async fn agent_exists(&self, agent_id: i32) -> Result<bool, DmsError> {
        self.agent(agent_id)?.exists().await
    }

    // ── Elements ─────────────────────────────────────────────────────

    /// Unloaded handle for `id`.
    pub fn element(&self, id: DmsElementId) -> DmsElement {
        DmsElement::new(self.clone(), id)
    }

    /// Look an element up by name; the result is loaded.
    pub async fn element_by_name(&self, name: &str) -> Result<DmsElement, DmsError> {
        let info: ElementInfo = self
            .fetch(
                Request::GetElementByName {
                    name: name.to_owned(),
                },
                || DmsError::ElementNotFound {
                    identifier: name.to_owned(),
                },
            )
            .await?;
        DmsElement::from_info(self.clone(), info)
    }

    /// Every element of the system, loaded.
    pub async fn elements(&self) -> Result<Vec<DmsElement>, DmsError> {
        let infos: Vec<ElementInfo> = self
            .comm()
            .request_many(Request::GetElements { agent_id: None })
            .await?;
        infos
            .into_iter()
            .map(|info| DmsElement::from_info(self.clone(), info))
            .collect()
    }

    pub async fn element_exists(&self, id: DmsElementId) -> Result<bool, DmsError> {
        self.element(id).exists().await
    }

    pub async fn element_exists_by_name(&self, name: &str) -> Result<bool, DmsError> {
        self.probe(Request::GetElementByName {
            name: name.to_owned(),
        })
        .await
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn view(&self, view_id: i32) -> DmsView {
        DmsView::new(self.clone(), view_id)
    }

    pub async fn view_by_name(&self, name: &str) -> Result<DmsView, DmsError> {
        let info: ViewInfo = self
            .fetch(
                Request::GetViewByName {
                    name: name.to_owned(),
                },
                || DmsError::ViewNotFound {
                    identifier: name.to_owned(),
                },
            )
            .await?;
        DmsView::from_info(self.clone(), info)
    }

    pub async fn views(&self) -> Result<Vec<DmsView>, DmsError> {
        let infos: Vec<ViewInfo> = self.comm().request_many(Request::GetViews).await?;
        infos
            .into_iter()
            .map(|info| DmsView::from_info(self.clone(), info))
            .collect()
    }

    pub async fn view_exists(&self, view_id: i32) -> Result<bool, DmsError> {
        self.view(view_id).exists().await
    }

    /// Create a view and return an unloaded handle to it.
    pub async fn create_view(&self, config: &ViewConfiguration) -> Result<DmsView, DmsError> {
        let request = Request::AddView {
            name: config.name().to_owned(),
            parent_id: config.parent_id(),
        };
        let response = self
            .comm()
            .send_single_response_message(request)
            .await
            .map_err(|e| {
                map_not_found(e, || DmsError::ViewNotFound {
                    identifier: config.parent_id().to_string(),
                })
            })?;
        match response {
            Some(Response::ViewCreated { view_id }) => {
                info!(view_id, name = config.name(), "view created");
                Ok(self.view(view_id))
            }
            Some(other) => Err(unexpected("ViewCreated", &other)),
            None => Err(dms_api::Error::NoResponse { request: "AddView" }.into()),
        }
    }

    // ── Protocols ────────────────────────────────────────────────────

    pub fn protocol(&self, name: &str, version: &str) -> Result<DmsProtocol, DmsError> {
        Ok(DmsProtocol::new(
            self.clone(),
            ProtocolRef::validated(name, version)?,
        ))
    }

    pub async fn protocols(&self) -> Result<Vec<DmsProtocol>, DmsError> {
        let infos: Vec<ProtocolInfo> = self.comm().request_many(Request::GetProtocols).await?;
        infos
            .iter()
            .map(|info| DmsProtocol::from_info(self.clone(), info))
            .collect()
    }

    pub async fn protocol_exists(&self, name: &str, version: &str) -> Result<bool, DmsError> {
        self.protocol(name, version)?.exists().await
    }

    // ── Services ─────────────────────────────────────────────────────

    pub fn service(&self, id: DmsServiceId) -> DmsService {
        DmsService::new(self.clone(), id)
    }

    pub async fn services(&self) -> Result<Vec<DmsService>, DmsError> {
        let infos: Vec<ServiceInfo> = self
            .comm()
            .request_many(Request::GetServices { agent_id: None })
            .await?;
        infos
            .into_iter()
            .map(|info| DmsService::from_info(self.clone(), info))
            .collect()
    }

    pub async fn service_exists(&self, id: DmsServiceId) -> Result<bool, DmsError> {
        self.service(id).exists().await
    }

    // ── Properties ───────────────────────────────────────────────────

    fn property_cell(&self, kind: PropertyKind) -> &OnceCell<Arc<PropertyDefinitions>> {
        match kind {
            PropertyKind::Element => &self.inner.element_properties,
            PropertyKind::View => &self.inner.view_properties,
            PropertyKind::Service => &self.inner.service_properties,
        }
    }

    /// All definitions of `kind`, fetched on first use and cached for the
    /// lifetime of this root.
    pub async fn property_definitions(
        &self,
        kind: PropertyKind,
    ) -> Result<Arc<PropertyDefinitions>, DmsError> {
        let defs = self
            .property_cell(kind)
            .get_or_try_init(|| async {
                debug!(?kind, "loading property definitions");
                let configs: Vec<PropertyConfig> = self
                    .comm()
                    .request_many(Request::GetPropertyConfig { kind })
                    .await?;
                Ok::<_, DmsError>(Arc::new(PropertyDefinitions::from_configs(kind, configs)))
            })
            .await?;
        Ok(Arc::clone(defs))
    }

    /// One definition by name (case-insensitive). Unknown names fail with
    /// [`DmsError::OutOfRange`].
    pub async fn property_definition(
        &self,
        kind: PropertyKind,
        name: &str,
    ) -> Result<Arc<PropertyDefinition>, DmsError> {
        let defs = self.property_definitions(kind).await?;
        defs.get(name).cloned()
    }

    pub async fn property_exists(&self, kind: PropertyKind, name: &str) -> Result<bool, DmsError> {
        match self.property_definition(kind, name).await {
            Ok(_) => Ok(true),
            Err(DmsError::OutOfRange { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

pub(crate) fn unexpected(expected: &'static str, got: &Response) -> DmsError {
    dms_api::Error::UnexpectedResponse {
        expected,
        got: got.kind().to_owned(),
    }
    .into()
}

fn extract<T: FromResponse>(response: Response) -> Result<T, DmsError> {
    let got = response.kind();
    T::from_response(response).ok_or_else(|| {
        dms_api::Error::UnexpectedResponse {
            expected: T::KIND,
            got: got.to_owned(),
        }
        .into()
    })
}
