//! Limit algorithm scenarios against a real store
//!
//! Each test uses a fresh tenant key, so state never leaks between tests
//! or runs. Timing asserts use generous margins; the scripts take their
//! clock from the client, but the sleeps here are real.

use crate::common::*;
use std::time::Duration;

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_token_bucket_exhaust_and_refill() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("tb-exhaust");
    let cfg = tenant_limit(token_bucket(3, 1, 1000));

    // capacity 3: three immediate requests drain the bucket
    for expected_remaining in [2, 1, 0] {
        let result = limiter
            .check_tenant(&tenant, &cfg, deadline())
            .await
            .unwrap();
        assert!(result.allowed);
        assert_eq!(result.remaining, expected_remaining);
    }

    // at ~500ms the bucket is still empty; retry points at the next refill
    tokio::time::sleep(Duration::from_millis(500)).await;
    let denied = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    let retry_ms = denied.retry_after.as_millis();
    assert!(
        (100..=900).contains(&retry_ms),
        "retry_after {retry_ms}ms should be roughly the 500ms left in the period"
    );

    // after the refill period one token is back
    tokio::time::sleep(Duration::from_millis(700)).await;
    let refilled = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(refilled.allowed);
    assert_eq!(refilled.remaining, 0);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_retry_after_is_honest() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("tb-retry");
    let cfg = tenant_limit(token_bucket(1, 1, 300));

    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);

    let denied = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(!denied.allowed);

    // a request strictly after retry_after must pass in isolation
    tokio::time::sleep(denied.retry_after + Duration::from_millis(50)).await;
    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_leaky_bucket_fills_and_drains() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("lb-drain");
    let cfg = tenant_limit(leaky_bucket(2, 1, 400));

    let first = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(first.allowed);
    assert_eq!(first.remaining, 1);

    let second = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(second.allowed);
    assert_eq!(second.remaining, 0);

    let denied = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert!(denied.retry_after > Duration::ZERO);

    // one leak period drains one slot
    tokio::time::sleep(Duration::from_millis(450)).await;
    let drained = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(drained.allowed);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_fixed_window_rollover() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("fw-rollover");
    let cfg = tenant_limit(fixed_window(400, 2));

    // start early in a window so the burst cannot straddle a boundary
    align_to_window(400).await;

    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);
    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);

    let denied = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert!(denied.retry_after <= Duration::from_millis(400));

    // the next window starts fresh
    tokio::time::sleep(Duration::from_millis(450)).await;
    let rolled = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(rolled.allowed);
    assert_eq!(rolled.remaining, 1);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_sliding_window_prunes_old_buckets() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("sw-prune");
    let cfg = tenant_limit(sliding_window(2000, 2));

    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let denied = limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert!(denied.retry_after > Duration::ZERO);

    // 2.1s after the first request it has left the window
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(limiter
        .check_tenant(&tenant, &cfg, deadline())
        .await
        .unwrap()
        .allowed);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_config_change_resets_state() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("tb-reconfig");

    // exhaust a capacity-2 bucket
    let small = tenant_limit(token_bucket(2, 1, 60_000));
    assert!(limiter
        .check_tenant(&tenant, &small, deadline())
        .await
        .unwrap()
        .allowed);
    assert!(limiter
        .check_tenant(&tenant, &small, deadline())
        .await
        .unwrap()
        .allowed);
    assert!(!limiter
        .check_tenant(&tenant, &small, deadline())
        .await
        .unwrap()
        .allowed);

    // new parameters, new fingerprint: the key starts over, full bucket
    let bigger = tenant_limit(token_bucket(5, 1, 60_000));
    let fresh = limiter
        .check_tenant(&tenant, &bigger, deadline())
        .await
        .unwrap();
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 4);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_config_reset_applies_to_window_algorithms() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("fw-reconfig");

    let one = tenant_limit(fixed_window(60_000, 1));
    assert!(limiter
        .check_tenant(&tenant, &one, deadline())
        .await
        .unwrap()
        .allowed);
    assert!(!limiter
        .check_tenant(&tenant, &one, deadline())
        .await
        .unwrap()
        .allowed);

    let three = tenant_limit(fixed_window(60_000, 3));
    let fresh = limiter
        .check_tenant(&tenant, &three, deadline())
        .await
        .unwrap();
    assert!(fresh.allowed);
    assert_eq!(fresh.remaining, 2);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_disabled_tier_always_passes() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("disabled");
    let cfg = trafficctrl::config::PerTenantLimit {
        enabled: false,
        algorithm: None,
    };

    for _ in 0..5 {
        assert!(limiter
            .check_tenant(&tenant, &cfg, deadline())
            .await
            .unwrap()
            .allowed);
    }
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn test_concurrent_requests_never_overshoot_capacity() {
    let limiter = test_limiter().await;
    let tenant = unique_tenant("tb-concurrent");
    // long refill period: no tokens come back during the test
    let cfg = tenant_limit(token_bucket(10, 1, 60_000));

    let mut tasks = Vec::new();
    for _ in 0..40 {
        let limiter = limiter.clone();
        let tenant = tenant.clone();
        let cfg = cfg.clone();
        tasks.push(tokio::spawn(async move {
            limiter
                .check_tenant(&tenant, &cfg, deadline())
                .await
                .unwrap()
                .allowed
        }));
    }

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() {
            allowed += 1;
        }
    }

    // the atomic script admits exactly the capacity, never more
    assert_eq!(allowed, 10);
}
