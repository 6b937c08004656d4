use std::collections::HashSet;

use eyre::Result;
use queue_token_core::{ServiceSeed, TokenView};
use queue_token_tests::{TestCtx, TestCtxBuilder};
use uuid::Uuid;

/// A desk with an active "Pharmacy", an active "Laboratory" and an inactive
/// "Billing" service.
#[allow(unused)]
pub fn clinic() -> TestCtxBuilder {
    TestCtxBuilder::new()
        .with_service(
            ServiceSeed::new("Pharmacy")
                .with_description("Prescriptions and refills")
                .with_wait(10),
        )
        .with_service(ServiceSeed::new("Laboratory").with_wait(15))
        .with_service(ServiceSeed::new("Billing").inactive())
}

/// Checks the queue view invariants and returns the ids in the view.
#[allow(unused)]
pub async fn checked_queue(ctx: &TestCtx) -> Result<Vec<Uuid>> {
    let queue: Vec<TokenView> = ctx.api.queue().await??;
    assert!(
        queue.iter().all(|view| view.token.status.is_active()),
        "The queue view must only contain waiting, called or serving tokens."
    );
    assert!(
        queue
            .windows(2)
            .all(|w| w[0].token.created_at <= w[1].token.created_at),
        "The queue view must be ordered by creation time, oldest first."
    );
    let ids: Vec<Uuid> = queue.iter().map(|view| view.token.id).collect();
    assert_eq!(
        ids.len(),
        ids.iter().collect::<HashSet<_>>().len(),
        "The queue view must not list a token twice."
    );
    Ok(ids)
}
