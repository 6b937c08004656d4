use std::collections::HashSet;

use eyre::Result;
use futures::future::try_join_all;
use queue_token_core::{IssueToken, NewToken};
use uuid::Uuid;

mod util;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_sequences_are_scoped_to_services() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let laboratory = ctx.service_id("Laboratory")?;

    // Two tokens for different services, back to back, both get number 1
    let first = ctx.api.generate_token(pharmacy, "", "").await??;
    let second = ctx.api.generate_token(laboratory, "", "").await??;
    assert_eq!(first.token_number, 1);
    assert_eq!(second.token_number, 1);

    assert_eq!(ctx.api.generate_token(laboratory, "", "").await??.token_number, 2);
    assert_eq!(ctx.api.generate_token(pharmacy, "", "").await??.token_number, 2);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn test_concurrent_numbers_never_collide() -> Result<()> {
    const PER_SERVICE: u32 = 200;

    let ctx = util::clinic().with_threads(8).build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let laboratory = ctx.service_id("Laboratory")?;

    // Interleave requests for both services over all worker threads
    let requests = (0..2 * PER_SERVICE).map(|i| {
        let api = ctx.api.on_worker(i as usize);
        let service = if i % 2 == 0 { pharmacy } else { laboratory };
        async move {
            let number = api.next_token_number(service).await??;
            Ok::<_, eyre::Report>((service, number))
        }
    });
    let numbers = try_join_all(requests).await?;

    for service in [pharmacy, laboratory] {
        let taken: Vec<u32> = numbers
            .iter()
            .filter(|(s, _)| *s == service)
            .map(|(_, n)| *n)
            .collect();
        let distinct: HashSet<u32> = taken.iter().copied().collect();
        assert_eq!(
            distinct.len(),
            taken.len(),
            "Concurrent requests for one service must never get the same number."
        );
        assert_eq!(
            distinct,
            (1..=PER_SERVICE).collect::<HashSet<u32>>(),
            "Each service's sequence must be 1..={PER_SERVICE} without gaps."
        );
    }

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn test_concurrent_issue_inserts_every_number_once() -> Result<()> {
    const TOKENS: usize = 100;

    let ctx = util::clinic().with_threads(8).build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;

    let requests = (0..TOKENS).map(|i| {
        let api = ctx.api.on_worker(i);
        async move {
            let issue = IssueToken {
                service_id: pharmacy,
                customer_name: Some(format!("customer {i}")),
                customer_phone: None,
            };
            let token = api.issue_token(&issue).await??;
            Ok::<_, eyre::Report>(token)
        }
    });
    let tokens = try_join_all(requests).await?;

    let numbers: HashSet<u32> = tokens.iter().map(|t| t.token_number).collect();
    assert_eq!(numbers, (1..=TOKENS as u32).collect::<HashSet<u32>>());
    assert_eq!(util::checked_queue(&ctx).await?.len(), TOKENS);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_numbering_rejects_unknown_and_inactive_services() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let billing = ctx.service_id("Billing")?;

    let err = ctx
        .api
        .next_token_number(billing)
        .await?
        .expect_err("An inactive service must not hand out numbers.");
    assert_eq!(err.status, 409);

    let err = ctx
        .api
        .next_token_number(Uuid::new_v4())
        .await?
        .expect_err("An unknown service must not hand out numbers.");
    assert_eq!(err.status, 404);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_insert_requires_an_issued_unused_number() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let laboratory = ctx.service_id("Laboratory")?;

    let new = |service_id, token_number| NewToken {
        token_number,
        service_id,
        customer_name: None,
        customer_phone: None,
    };

    // Nothing was issued yet
    let err = ctx.api.create_token(&new(pharmacy, 1)).await?.unwrap_err();
    assert_eq!(err.status, 409, "{err}");

    let number = ctx.api.next_token_number(pharmacy).await??;
    ctx.api.create_token(&new(pharmacy, number)).await??;

    // The same number cannot be used twice within the service ...
    let err = ctx.api.create_token(&new(pharmacy, number)).await?.unwrap_err();
    assert_eq!(err.status, 409, "{err}");

    // ... and a number issued for one service is not valid for another
    let err = ctx.api.create_token(&new(laboratory, number)).await?.unwrap_err();
    assert_eq!(err.status, 409, "{err}");

    // A malformed body is a bad request
    let err = ctx.api.create_token_raw("{\"token_number\": 1}").await?.unwrap_err();
    assert_eq!(err.status, 400, "{err}");

    ctx.finish().await;
    Ok(())
}
