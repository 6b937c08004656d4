//! Implementation of the central database for services and tokens

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use queue_token_core::{
    IssueToken, NewToken, QueueError, Service, ServiceSeed, Token, TokenStatus, TokenView,
};
use uuid::Uuid;

use crate::feed::{ChangeFeed, ChangeKind, Subscription};
use crate::numbering::TokenCounter;
use crate::projection;

/// Token rows in insertion order
#[derive(Default)]
struct TokenTable {
    rows: Vec<Token>,
    /// token id to index into `rows`
    by_id: HashMap<Uuid, usize>,
    /// (service, number) pairs in use
    numbers: HashSet<(Uuid, u32)>,
}

/// Implementation of the central database for services and tokens
///
/// Tokens are never deleted. Every committed insert or update is published
/// on the database's [`ChangeFeed`] after the write lock is released.
#[derive(Default)]
pub struct Database {
    services: RwLock<Vec<Service>>,
    tokens: RwLock<TokenTable>,
    counter: TokenCounter,
    feed: ChangeFeed,
}

impl Database {
    /// Create a new, empty [`Database`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The feed tokens changes are published on
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Shorthand for `self.feed().subscribe()`
    pub fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    /// Add a service.
    pub fn insert_service(&self, seed: ServiceSeed) -> Service {
        let service = seed.into_service();
        self.services.write().push(service.clone());
        service
    }

    /// Look a service up by id.
    pub fn service(&self, id: Uuid) -> Result<Service, QueueError> {
        self.services
            .read()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(QueueError::ServiceNotFound(id))
    }

    /// All services, active or not, in seeding order.
    pub fn services(&self) -> Vec<Service> {
        self.services.read().clone()
    }

    /// All active services, ordered by name.
    pub fn active_services(&self) -> Vec<Service> {
        let mut services: Vec<Service> = self
            .services
            .read()
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }

    fn active_service(&self, id: Uuid) -> Result<Service, QueueError> {
        let service = self.service(id)?;
        if !service.is_active {
            return Err(QueueError::ServiceInactive(id));
        }
        Ok(service)
    }

    /// Take the next token number of `service_id`'s sequence.
    pub fn next_token_number(&self, service_id: Uuid) -> Result<u32, QueueError> {
        self.active_service(service_id)?;
        Ok(self.counter.next(service_id))
    }

    /// Insert a `waiting` token carrying a previously taken number.
    pub fn create_token(&self, new: NewToken) -> Result<Token, QueueError> {
        let service = new.service_id;
        let number = new.token_number;
        self.active_service(service)?;
        if number == 0 || number > self.counter.issued(service) {
            return Err(QueueError::NumberNotIssued { service, number });
        }

        let token = {
            let mut table = self.tokens.write();
            if !table.numbers.insert((service, number)) {
                return Err(QueueError::DuplicateNumber { service, number });
            }
            let token = Token::new(new, Utc::now());
            let index = table.rows.len();
            table.by_id.insert(token.id, index);
            table.rows.push(token.clone());
            token
        };

        self.feed.publish(ChangeKind::Insert, token.id);
        Ok(token)
    }

    /// Take a number and insert the token for it.
    pub fn issue_token(&self, issue: IssueToken) -> Result<Token, QueueError> {
        let token_number = self.next_token_number(issue.service_id)?;
        self.create_token(NewToken {
            token_number,
            service_id: issue.service_id,
            customer_name: issue.customer_name,
            customer_phone: issue.customer_phone,
        })
    }

    /// Look a token up by id.
    pub fn token(&self, id: Uuid) -> Result<Token, QueueError> {
        let table = self.tokens.read();
        table
            .by_id
            .get(&id)
            .map(|&i| table.rows[i].clone())
            .ok_or(QueueError::TokenNotFound(id))
    }

    /// Move a token to `status`, stamping `now` where the lifecycle asks for it.
    pub fn update_status(
        &self,
        id: Uuid,
        status: TokenStatus,
        now: DateTime<Utc>,
    ) -> Result<Token, QueueError> {
        let token = {
            let mut table = self.tokens.write();
            let index = *table.by_id.get(&id).ok_or(QueueError::TokenNotFound(id))?;
            let token = &mut table.rows[index];
            token.advance(status, now)?;
            token.clone()
        };

        self.feed.publish(ChangeKind::Update, id);
        Ok(token)
    }

    /// Tokens matching `filter`, joined with their service name, in
    /// insertion order.
    pub fn scan(&self, filter: impl Fn(&Token) -> bool) -> Vec<TokenView> {
        let names: HashMap<Uuid, String> = self
            .services
            .read()
            .iter()
            .map(|s| (s.id, s.name.clone()))
            .collect();
        self.tokens
            .read()
            .rows
            .iter()
            .filter(|t| filter(t))
            .map(|t| TokenView {
                token: t.clone(),
                service_name: names.get(&t.service_id).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Tokens in `waiting`, `called` or `serving`, oldest first.
    pub fn queue_tokens(&self) -> Vec<TokenView> {
        projection::queue_view(self.scan(|t| t.status.is_active()))
    }

    /// Tokens created at or after `since`, newest first.
    pub fn tokens_since(&self, since: DateTime<Utc>) -> Vec<TokenView> {
        projection::newest_first(self.scan(|t| t.created_at >= since))
    }

    /// Number of services and tokens
    pub fn counts(&self) -> (usize, usize) {
        (self.services.read().len(), self.tokens.read().rows.len())
    }
}
