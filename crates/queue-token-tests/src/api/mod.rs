use std::sync::Arc;

use eyre::{eyre, Result};
use flume::Sender;
use queue_token_core::{
    Dashboard, IssueToken, NewToken, NumberRequest, RequestKind, Service, StatusUpdate, Token,
    TokenStatus, TokenView,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

pub mod mock;

#[derive(Debug, Error)]
#[error("Error {status}: {msg}")]
pub struct ApiError {
    pub status: u16,
    pub msg: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum Response {
    Error { status: u16, msg: String },
    Int(u64),
    Json(String),
    Text(String),
}

impl Response {
    fn into_api_result_int(self, rq_kind: RequestKind) -> ApiResult<u64> {
        match self {
            Response::Error { status, msg } => Err(ApiError { status, msg }),
            Response::Int(i) => Ok(i),
            resp => panic!("{rq_kind:?} must not be answered by {resp:?}"),
        }
    }

    fn into_api_result_json<T: DeserializeOwned>(
        self,
        rq_kind: RequestKind,
    ) -> Result<ApiResult<T>> {
        match self {
            Response::Error { status, msg } => Ok(Err(ApiError { status, msg })),
            Response::Json(json) => Ok(Ok(serde_json::from_str(&json)?)),
            resp => Err(eyre!("{rq_kind:?} must not be answered by {resp:?}")),
        }
    }
}

struct RequestMsg {
    kind: RequestKind,
    payload: Option<String>,
    staff_key: Option<String>,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per worker thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Api {
    /// A handle sending to worker `index` (modulo the number of workers)
    pub fn on_worker(&self, index: usize) -> Self {
        let my_index = index % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

const NO_REQUEST_OPTIONS: RequestOptions = RequestOptions { staff_key: None };

impl Api {
    async fn make_request(
        &self,
        kind: RequestKind,
        payload: Option<String>,
        options: &RequestOptions,
    ) -> Result<Response> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind,
            payload,
            staff_key: options.staff_key.clone(),
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        Ok(receiver.await?)
    }

    async fn json_request<B: Serialize, T: DeserializeOwned>(
        &self,
        kind: RequestKind,
        body: Option<&B>,
        options: &RequestOptions,
    ) -> Result<ApiResult<T>> {
        let payload = body.map(serde_json::to_string).transpose()?;
        let response = self.make_request(kind, payload, options).await?;
        response.into_api_result_json(kind)
    }

    pub async fn list_services(&self) -> Result<ApiResult<Vec<Service>>> {
        self.json_request::<(), _>(RequestKind::ListServices, None, &NO_REQUEST_OPTIONS)
            .await
    }

    pub async fn next_token_number(&self, service_id: Uuid) -> Result<ApiResult<u32>> {
        let kind = RequestKind::NextTokenNumber;
        let body = serde_json::to_string(&NumberRequest { service_id })?;
        let response = self.make_request(kind, Some(body), &NO_REQUEST_OPTIONS);
        Ok(response
            .await?
            .into_api_result_int(kind)
            .map(|n| n as u32))
    }

    pub async fn create_token(&self, new: &NewToken) -> Result<ApiResult<Token>> {
        self.json_request(RequestKind::CreateToken, Some(new), &NO_REQUEST_OPTIONS)
            .await
    }

    /// Send `body` as is, e.g., to check how malformed input is rejected
    pub async fn create_token_raw(&self, body: &str) -> Result<ApiResult<Token>> {
        let kind = RequestKind::CreateToken;
        let response = self.make_request(kind, Some(body.to_owned()), &NO_REQUEST_OPTIONS);
        response.await?.into_api_result_json(kind)
    }

    pub async fn issue_token(&self, issue: &IssueToken) -> Result<ApiResult<Token>> {
        self.json_request(RequestKind::IssueToken, Some(issue), &NO_REQUEST_OPTIONS)
            .await
    }

    /// Take a number and insert the token with two separate requests, the
    /// way a browser client does it
    pub async fn generate_token(
        &self,
        service_id: Uuid,
        customer_name: &str,
        customer_phone: &str,
    ) -> Result<ApiResult<Token>> {
        let token_number = match self.next_token_number(service_id).await? {
            Ok(n) => n,
            Err(err) => return Ok(Err(err)),
        };
        self.create_token(&NewToken {
            token_number,
            service_id,
            customer_name: Some(customer_name.to_owned()),
            customer_phone: Some(customer_phone.to_owned()),
        })
        .await
    }

    pub async fn queue(&self) -> Result<ApiResult<Vec<TokenView>>> {
        self.json_request::<(), _>(RequestKind::QueueTokens, None, &NO_REQUEST_OPTIONS)
            .await
    }

    pub async fn dashboard(&self, options: &RequestOptions) -> Result<ApiResult<Dashboard>> {
        self.json_request::<(), _>(RequestKind::DashboardTokens, None, options)
            .await
    }

    pub async fn update_status(
        &self,
        token_id: Uuid,
        status: TokenStatus,
        options: &RequestOptions,
    ) -> Result<ApiResult<Token>> {
        let update = StatusUpdate { token_id, status };
        self.json_request(RequestKind::UpdateTokenStatus, Some(&update), options)
            .await
    }

    /// Long-poll for a change past `seen`
    pub async fn wait_for_change(&self, seen: u64) -> Result<ApiResult<u64>> {
        let kind = RequestKind::WaitForChange;
        let response = self.make_request(kind, Some(seen.to_string()), &NO_REQUEST_OPTIONS);
        Ok(response.await?.into_api_result_int(kind))
    }

    /// Send `seen` as is, e.g., to check how malformed versions are rejected
    pub async fn wait_for_change_raw(&self, seen: &str) -> Result<ApiResult<u64>> {
        let kind = RequestKind::WaitForChange;
        let response = self.make_request(kind, Some(seen.to_owned()), &NO_REQUEST_OPTIONS);
        Ok(response.await?.into_api_result_int(kind))
    }

    pub async fn debug(&self) -> Result<String> {
        let kind = RequestKind::Debug;
        match self.make_request(kind, None, &NO_REQUEST_OPTIONS).await? {
            Response::Text(s) => Ok(s),
            resp => Err(eyre!("{kind:?} must not be answered by {resp:?}")),
        }
    }

    pub fn create_staff_session(&self, staff_key: Option<&str>) -> StaffSession<'_> {
        StaffSession {
            api: self,
            staff_key: staff_key.map(str::to_owned),
        }
    }
}

/// A signed-in staff member at the dashboard
pub struct StaffSession<'a> {
    pub api: &'a Api,
    pub staff_key: Option<String>,
}

impl<'a> StaffSession<'a> {
    fn request_options(&self) -> RequestOptions {
        RequestOptions {
            staff_key: self.staff_key.clone(),
        }
    }

    pub async fn dashboard(&self) -> Result<ApiResult<Dashboard>> {
        self.api.dashboard(&self.request_options()).await
    }

    pub async fn update_status(
        &self,
        token_id: Uuid,
        status: TokenStatus,
    ) -> Result<ApiResult<Token>> {
        self.api
            .update_status(token_id, status, &self.request_options())
            .await
    }

    /// The dashboard's "Call" button
    pub async fn call(&self, token_id: Uuid) -> Result<ApiResult<Token>> {
        self.update_status(token_id, TokenStatus::Serving).await
    }

    /// The dashboard's "Complete" button
    pub async fn complete(&self, token_id: Uuid) -> Result<ApiResult<Token>> {
        self.update_status(token_id, TokenStatus::Completed).await
    }
}

#[derive(Clone, Default)]
pub struct RequestOptions {
    pub staff_key: Option<String>,
}
