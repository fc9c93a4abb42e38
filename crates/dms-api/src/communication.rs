// Gateway contract
//
// `Communication` is the single seam between the SDK and whatever carries
// messages to the platform. Implementations send one typed request and hand
// back zero, one or many typed responses, or an `Error` carrying the remote
// numeric code. `CommunicationExt` layers typed extraction on top.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Error;
use crate::messages::{
    AgentInfo, AlarmTemplateInfo, BuildInfo, ElementInfo, ElementPortInfo, ParameterValue,
    PropertyConfig, ProtocolInfo, Request, Response, ServiceInfo, TrendTemplateInfo, ViewInfo,
};

/// Request/response channel to the platform.
#[async_trait]
pub trait Communication: Send + Sync {
    /// Send a request and collect every response it produced.
    async fn send_message(&self, request: Request) -> Result<Vec<Response>, Error>;

    /// Send a request that yields at most one response.
    ///
    /// `Ok(None)` signals that the remote side had nothing to return.
    async fn send_single_response_message(
        &self,
        request: Request,
    ) -> Result<Option<Response>, Error> {
        let mut responses = self.send_message(request).await?;
        if responses.is_empty() {
            Ok(None)
        } else {
            Ok(Some(responses.swap_remove(0)))
        }
    }
}

/// Typed extraction of a payload from a [`Response`].
pub trait FromResponse: Sized {
    /// Response kind expected, for error reporting.
    const KIND: &'static str;

    fn from_response(response: Response) -> Option<Self>;
}

macro_rules! from_response {
    ($ty:ty, $variant:ident) => {
        impl FromResponse for $ty {
            const KIND: &'static str = stringify!($variant);

            fn from_response(response: Response) -> Option<Self> {
                match response {
                    Response::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

from_response!(AgentInfo, AgentInfo);
from_response!(BuildInfo, BuildInfo);
from_response!(ElementInfo, ElementInfo);
from_response!(ElementPortInfo, PortInfo);
from_response!(ParameterValue, ParameterValue);
from_response!(ViewInfo, ViewInfo);
from_response!(ProtocolInfo, ProtocolInfo);
from_response!(AlarmTemplateInfo, AlarmTemplate);
from_response!(TrendTemplateInfo, TrendTemplate);
from_response!(PropertyConfig, PropertyConfig);
from_response!(ServiceInfo, ServiceInfo);

fn extract<T: FromResponse>(response: Response) -> Result<T, Error> {
    let got = response.kind();
    T::from_response(response).ok_or_else(|| Error::UnexpectedResponse {
        expected: T::KIND,
        got: got.to_owned(),
    })
}

/// Typed helpers over any [`Communication`].
#[async_trait]
pub trait CommunicationExt: Communication {
    /// Send a request expecting exactly one response of type `T`.
    async fn request_one<T>(&self, request: Request) -> Result<T, Error>
    where
        T: FromResponse + Send,
    {
        let name = request.name();
        debug!(request = name, "sending single-response message");
        match self.send_single_response_message(request).await? {
            Some(response) => extract(response),
            None => Err(Error::NoResponse { request: name }),
        }
    }

    /// Send a request and extract every response as `T`.
    async fn request_many<T>(&self, request: Request) -> Result<Vec<T>, Error>
    where
        T: FromResponse + Send,
    {
        debug!(request = request.name(), "sending message");
        self.send_message(request)
            .await?
            .into_iter()
            .map(extract)
            .collect()
    }

    /// Send a request whose responses carry no payload of interest.
    async fn request_ack(&self, request: Request) -> Result<Vec<Response>, Error> {
        debug!(request = request.name(), "sending message");
        self.send_message(request).await
    }
}

impl<C: Communication + ?Sized> CommunicationExt for C {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::messages::BuildInfo;

    struct Fixed(Vec<Response>);

    #[async_trait]
    impl Communication for Fixed {
        async fn send_message(&self, _request: Request) -> Result<Vec<Response>, Error> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn single_response_takes_first() {
        let comm = Fixed(vec![
            Response::BuildInfo(BuildInfo {
                agent_id: 1,
                version: "10.2.0.0-12345".into(),
            }),
            Response::Ack,
        ]);
        let info: BuildInfo = comm
            .request_one(Request::GetAgentBuildInfo { agent_id: 1 })
            .await
            .unwrap();
        assert_eq!(info.version, "10.2.0.0-12345");
    }

    #[tokio::test]
    async fn no_response_is_reported() {
        let comm = Fixed(Vec::new());
        let result: Result<BuildInfo, Error> = comm
            .request_one(Request::GetAgentBuildInfo { agent_id: 1 })
            .await;
        assert!(matches!(
            result,
            Err(Error::NoResponse { request: "GetAgentBuildInfo" })
        ));
    }

    #[tokio::test]
    async fn wrong_kind_is_unexpected() {
        let comm = Fixed(vec![Response::Ack]);
        let result: Result<Vec<BuildInfo>, Error> = comm.request_many(Request::GetViews).await;
        match result {
            Err(Error::UnexpectedResponse { expected, got }) => {
                assert_eq!(expected, "BuildInfo");
                assert_eq!(got, "Ack");
            }
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }
}
