//! Mock API implementation directly using the `queue-token-desk` crate

use std::sync::Arc;

use queue_token_core::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};
use queue_token_desk::Desk;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use super::{Api, RequestMsg, Response};

pub struct MockDesk {
    desk: Arc<Desk>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    payload: Option<String>,
    kind: RequestKind,
    response_channel: oneshot::Sender<Response>,
}

pub async fn start(
    threads: u16,
    config: queue_token_core::Config,
) -> eyre::Result<(MockDesk, Api)> {
    let desk = Arc::new(
        tokio::task::spawn_blocking(move || queue_token_desk::launch(&config)).await??,
    );

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let desk = desk.clone();
        let handle = task::spawn_blocking(move || {
            let desk = &*desk;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    payload: msg.payload,
                    kind: msg.kind,
                    response_channel: msg.response_channel,
                });
                desk.handle(Request::from_raw(msg.kind, msg.staff_key, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_desk = MockDesk { desk, join_handles };
    Ok((mock_desk, Api::new(senders)))
}

impl MockDesk {
    pub fn desk(&self) -> &Desk {
        &self.desk
    }

    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.desk).unwrap().shutdown())
            .await
            .unwrap();
    }
}

impl MockRawRequest {
    fn send(self: Box<Self>, response: Response) {
        // the caller may have given up waiting
        let _ = self.response_channel.send(response);
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        use RequestKind::*;
        match self.kind {
            ListServices => "/api/services",
            NextTokenNumber => "/api/services/next_number",
            CreateToken => "/api/tokens",
            IssueToken => "/api/tokens/issue",
            QueueTokens => "/api/queue",
            DashboardTokens => "/api/dashboard",
            UpdateTokenStatus => "/api/tokens/status",
            WaitForChange => "/api/changes",
            Debug => "/api/debug",
        }
    }

    fn method(&self) -> RequestMethod {
        use RequestKind::*;
        use RequestMethod::*;
        match self.kind {
            ListServices | QueueTokens | DashboardTokens | Debug => Get,
            _ => Post,
        }
    }

    fn read_string(&mut self) -> std::io::Result<String> {
        Ok(self.payload.take().unwrap_or_default())
    }

    fn respond_with_err(self: Box<Self>, status: u16, msg: String) {
        self.send(Response::Error { status, msg })
    }

    fn respond_with_int(self: Box<Self>, i: u64) {
        self.send(Response::Int(i))
    }

    fn respond_with_json(self: Box<Self>, json: String) {
        self.send(Response::Json(json))
    }

    fn respond_with_string(self: Box<Self>, s: String) {
        self.send(Response::Text(s))
    }
}
