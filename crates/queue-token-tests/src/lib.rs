use eyre::{eyre, Result};
use queue_token_core::{Service, ServiceSeed};
use queue_token_desk::Desk;
use uuid::Uuid;

mod api;
pub use api::{Api, ApiError, ApiResult, RequestOptions, StaffSession};

pub struct TestCtxBuilder {
    /// Services seeded at launch
    pub services: Vec<ServiceSeed>,
    /// Count of worker threads
    pub threads: u16,
    /// Staff key, if staff requests should be guarded
    pub staff_key: Option<String>,
    /// Long-poll window for change requests in seconds
    pub change_timeout: u32,
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCtxBuilder {
    /// Create a new test context builder without services
    pub fn new() -> Self {
        TestCtxBuilder {
            services: Vec::new(),
            threads: 4,
            staff_key: None,
            change_timeout: 2,
        }
    }

    /// Seed a service
    pub fn with_service(mut self, seed: ServiceSeed) -> Self {
        self.services.push(seed);
        self
    }

    /// Set the number of worker threads to use
    pub fn with_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.threads = threads;
        self
    }

    /// Guard staff requests with `key`
    pub fn with_staff_key(mut self, key: &str) -> Self {
        self.staff_key = Some(key.to_owned());
        self
    }

    /// Set the long-poll window for change requests (in seconds)
    pub fn with_change_timeout(mut self, timeout: u32) -> Self {
        self.change_timeout = timeout;
        self
    }

    /// Get the [`queue_token_core::Config`] for launching the desk
    fn config(&self) -> queue_token_core::Config {
        queue_token_core::Config {
            services: self.services.clone(),
            staff_key: self.staff_key.clone(),
            change_timeout: self.change_timeout,
        }
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let config = self.config();
        let (desk, api) = api::mock::start(self.threads, config).await?;
        let services = desk.desk().database().services();

        Ok(TestCtx {
            api,
            desk,
            services,
            staff_key: self.staff_key,
            drop_bomb: DropBomb,
        })
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the desk
    pub api: Api,
    desk: api::mock::MockDesk,
    /// Services seeded at launch
    pub services: Vec<Service>,
    /// Configured staff key
    pub staff_key: Option<String>,

    drop_bomb: DropBomb,
}

impl TestCtx {
    /// The desk under test
    pub fn desk(&self) -> &Desk {
        self.desk.desk()
    }

    /// Id of the service called `name`
    pub fn service_id(&self, name: &str) -> Result<Uuid> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| eyre!("no service called {name}"))
    }

    /// A staff session using the configured key
    pub fn staff(&self) -> StaffSession<'_> {
        self.api.create_staff_session(self.staff_key.as_deref())
    }

    /// Shut the desk down and finish the test
    pub async fn finish(self) {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.desk.shutdown().await
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the desk down");
    }
}
