use chrono::{Duration, Utc};
use eyre::Result;
use queue_token_core::{NewToken, QueueError, Token, TokenStatus};
use uuid::Uuid;

mod util;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_call_stamps_called_at() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let staff = ctx.staff();

    let token = ctx.api.generate_token(pharmacy, "Grace", "").await??;
    let served = staff.call(token.id).await??;

    assert_eq!(served.status, TokenStatus::Serving);
    assert!(served.called_at.is_some(), "Serving a token stamps called_at.");
    assert!(served.completed_at.is_none(), "Serving a token leaves completed_at empty.");
    assert_eq!(served.token_number, token.token_number);
    assert_eq!(served.service_id, token.service_id);
    assert_eq!(served.created_at, token.created_at);
    assert_eq!(served.customer_name, token.customer_name);

    drop(staff);
    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_complete_removes_token_from_queue() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let staff = ctx.staff();

    let first = ctx.api.generate_token(pharmacy, "", "").await??;
    let second = ctx.api.generate_token(pharmacy, "", "").await??;
    assert_eq!(util::checked_queue(&ctx).await?, [first.id, second.id]);

    let served = staff.call(first.id).await??;
    let before = Utc::now();
    let completed = staff.complete(first.id).await??;
    let after = Utc::now();

    assert_eq!(completed.status, TokenStatus::Completed);
    let completed_at = completed.completed_at.expect("completed_at must be stamped");
    assert!(before <= completed_at && completed_at <= after);
    assert_eq!(completed.called_at, served.called_at, "called_at is stamped only once.");
    assert_eq!(completed.token_number, first.token_number);

    assert_eq!(
        util::checked_queue(&ctx).await?,
        [second.id],
        "A completed token must disappear from the queue view."
    );

    drop(staff);
    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_tokens_only_move_forward() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let staff = ctx.staff();

    let token = ctx.api.generate_token(pharmacy, "", "").await??;
    staff.update_status(token.id, TokenStatus::Called).await??;
    staff.update_status(token.id, TokenStatus::Serving).await??;

    for backwards in [TokenStatus::Waiting, TokenStatus::Called, TokenStatus::Serving] {
        let err = staff
            .update_status(token.id, backwards)
            .await?
            .expect_err("A token must not move backwards.");
        assert_eq!(err.status, 409, "{err}");
    }

    staff.complete(token.id).await??;
    for after_done in [TokenStatus::Serving, TokenStatus::Cancelled, TokenStatus::Completed] {
        let err = staff
            .update_status(token.id, after_done)
            .await?
            .expect_err("A completed token must not change any more.");
        assert_eq!(err.status, 409, "{err}");
    }

    // Rejected updates leave the token untouched
    let dashboard = staff.dashboard().await??;
    assert_eq!(dashboard.tokens.len(), 1);
    assert_eq!(dashboard.tokens[0].token.status, TokenStatus::Completed);
    let stored = ctx.desk().database().token(token.id)?;
    assert_eq!(stored, dashboard.tokens[0].token);

    let unknown = Uuid::new_v4();
    let err = staff
        .update_status(unknown, TokenStatus::Serving)
        .await?
        .expect_err("Unknown tokens cannot be updated.");
    assert_eq!(err.status, 404);
    assert_eq!(
        ctx.desk().database().token(unknown),
        Err(QueueError::TokenNotFound(unknown))
    );

    drop(staff);
    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_cancel_from_any_open_state() -> Result<()> {
    let ctx = util::clinic().build().await?;
    let pharmacy = ctx.service_id("Pharmacy")?;
    let staff = ctx.staff();

    for steps in [
        &[][..],
        &[TokenStatus::Called][..],
        &[TokenStatus::Called, TokenStatus::Serving][..],
    ] {
        let token = ctx.api.generate_token(pharmacy, "", "").await??;
        for &step in steps {
            staff.update_status(token.id, step).await??;
        }
        let cancelled = staff.update_status(token.id, TokenStatus::Cancelled).await??;
        assert_eq!(cancelled.status, TokenStatus::Cancelled);
        assert!(cancelled.completed_at.is_none());
    }
    assert!(util::checked_queue(&ctx).await?.is_empty());

    drop(staff);
    ctx.finish().await;
    Ok(())
}

fn waiting_token() -> Token {
    Token::new(
        NewToken {
            token_number: 7,
            service_id: Uuid::new_v4(),
            customer_name: Some("  Alan ".into()),
            customer_phone: None,
        },
        Utc::now(),
    )
}

#[test]
fn test_transition_table() {
    use TokenStatus::*;

    let allowed = [
        (Waiting, Called),
        (Waiting, Serving),
        (Waiting, Completed),
        (Waiting, Cancelled),
        (Called, Serving),
        (Called, Completed),
        (Called, Cancelled),
        (Serving, Completed),
        (Serving, Cancelled),
    ];
    for from in TokenStatus::ALL {
        for to in TokenStatus::ALL {
            assert_eq!(
                from.can_advance_to(to),
                allowed.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn test_advance_stamps_timestamps() {
    let mut token = waiting_token();
    assert_eq!(token.customer_name.as_deref(), Some("Alan"));

    let called = Utc::now();
    token.advance(TokenStatus::Called, called).unwrap();
    assert_eq!(token.called_at, Some(called));

    token
        .advance(TokenStatus::Serving, called + Duration::minutes(2))
        .unwrap();
    assert_eq!(token.called_at, Some(called), "called_at keeps the first call");
    assert_eq!(token.completed_at, None);

    let done = called + Duration::minutes(5);
    token.advance(TokenStatus::Completed, done).unwrap();
    assert_eq!(token.completed_at, Some(done));
    assert_eq!(token.token_number, 7);
}

#[test]
fn test_rejected_advance_leaves_token_untouched() {
    let mut token = waiting_token();
    token.advance(TokenStatus::Cancelled, Utc::now()).unwrap();
    let before = token.clone();

    let err = token.advance(TokenStatus::Serving, Utc::now()).unwrap_err();
    assert_eq!(
        err,
        QueueError::InvalidTransition {
            from: TokenStatus::Cancelled,
            to: TokenStatus::Serving,
        }
    );
    assert_eq!(token, before);
}

#[test]
fn test_status_names() {
    for status in TokenStatus::ALL {
        assert_eq!(status.as_str().parse::<TokenStatus>().unwrap(), status);
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            format!("\"{status}\"")
        );
    }
    assert!("SERVING".parse::<TokenStatus>().is_ok());
    assert!("paused".parse::<TokenStatus>().is_err());
}
