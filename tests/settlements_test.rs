mod common;

use anyhow::Result;
use common::{TripFixture, test_service};
use tripsplit::application::AppError;
use tripsplit::domain::{NewSettlement, SettlementError};
use uuid::Uuid;

fn validation_error(err: AppError) -> SettlementError {
    match err {
        AppError::Validation(inner) => inner,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_record_settlement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;

    let settlement = service
        .record_settlement(
            fx.trip.id,
            NewSettlement::new(fx.id(1), fx.id(0), 2500).with_note("cash"),
        )
        .await?;

    assert_eq!(settlement.trip_id, fx.trip.id);
    assert_eq!(settlement.amount_cents, 2500);
    assert_eq!(settlement.note.as_deref(), Some("cash"));

    let stored = service.list_settlements(fx.trip.id).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, settlement.id);
    assert_eq!(stored[0].from_id, fx.id(1));
    assert_eq!(stored[0].to_id, fx.id(0));
    assert_eq!(stored[0].note.as_deref(), Some("cash"));

    Ok(())
}

#[tokio::test]
async fn test_settlement_moves_balances() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;

    service
        .record_settlement(fx.trip.id, NewSettlement::new(fx.id(0), fx.id(1), 1500))
        .await?;

    // paying raises the payer and lowers the receiver
    let result = service.get_trip_balances(fx.trip.id).await?;
    let nets: Vec<_> = result.balances.iter().map(|b| b.net).collect();
    assert_eq!(nets, vec![1500, -1500]);
    assert_eq!(result.transactions.len(), 1);
    assert_eq!(result.transactions[0].from.id, fx.id(1));

    Ok(())
}

#[tokio::test]
async fn test_rejects_missing_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;

    let err = service
        .record_settlement(fx.trip.id, NewSettlement::default())
        .await
        .unwrap_err();
    assert_eq!(validation_error(err), SettlementError::MissingField("fromId"));

    let request = NewSettlement {
        from_id: Some(fx.id(0)),
        to_id: Some(fx.id(1)),
        ..Default::default()
    };
    let err = service
        .record_settlement(fx.trip.id, request)
        .await
        .unwrap_err();
    assert_eq!(validation_error(err), SettlementError::MissingField("amount"));

    assert!(service.list_settlements(fx.trip.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejects_non_positive_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;

    for amount in [0, -100] {
        let err = service
            .record_settlement(fx.trip.id, NewSettlement::new(fx.id(0), fx.id(1), amount))
            .await
            .unwrap_err();
        assert_eq!(
            validation_error(err),
            SettlementError::NonPositiveAmount(amount)
        );
    }

    assert!(service.list_settlements(fx.trip.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejects_self_settlement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;

    let err = service
        .record_settlement(fx.trip.id, NewSettlement::new(fx.id(0), fx.id(0), 100))
        .await
        .unwrap_err();
    assert_eq!(validation_error(err), SettlementError::SelfSettlement);
    assert!(service.list_settlements(fx.trip.id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rejects_participant_from_another_trip() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let lisbon = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;
    let porto = TripFixture::create(&service, "Porto", &["C"]).await?;

    let outsider = porto.id(0);
    let err = service
        .record_settlement(
            lisbon.trip.id,
            NewSettlement::new(lisbon.id(0), outsider, 100),
        )
        .await
        .unwrap_err();
    assert_eq!(
        validation_error(err),
        SettlementError::ParticipantNotInTrip(outsider)
    );

    assert!(service.list_settlements(lisbon.trip.id).await?.is_empty());
    assert!(service.list_settlements(porto.trip.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_trip_is_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;

    let err = service
        .record_settlement(Uuid::new_v4(), NewSettlement::new(fx.id(0), fx.id(1), 100))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TripNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_settlements_listed_in_recording_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B", "C"]).await?;

    for (from, to, amount) in [(1, 0, 100), (2, 0, 200), (2, 1, 300)] {
        service
            .record_settlement(fx.trip.id, NewSettlement::new(fx.id(from), fx.id(to), amount))
            .await?;
    }

    let amounts: Vec<_> = service
        .list_settlements(fx.trip.id)
        .await?
        .iter()
        .map(|s| s.amount_cents)
        .collect();
    assert_eq!(amounts, vec![100, 200, 300]);

    Ok(())
}

#[tokio::test]
async fn test_rejects_amount_beyond_limit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, "Lisbon", &["A", "B"]).await?;
    fx.expense(&service, Some(0), 100, &[(1, 100)]).await?;

    let err = service
        .record_settlement(fx.trip.id, NewSettlement::new(fx.id(1), fx.id(0), i64::MAX))
        .await
        .unwrap_err();
    assert_eq!(
        validation_error(err),
        SettlementError::AmountTooLarge(i64::MAX)
    );

    // the ledger stays readable
    assert!(service.list_settlements(fx.trip.id).await?.is_empty());
    let result = service.get_trip_balances(fx.trip.id).await?;
    assert_eq!(result.balances[0].net, 100);

    Ok(())
}
