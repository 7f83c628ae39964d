use std::sync::Arc;

use atomic_experiments::{event_types, EventCapture, MemoryCookies, VariantTracker};

#[tokio::main]
pub async fn main() {
    // Configure env_logger to see Atomic SDK logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("atomic")).init();

    let api_url =
        std::env::var("ATOMIC_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
    let service_role_key = std::env::var("ATOMIC_SERVICE_ROLE_KEY")
        .expect("ATOMIC_SERVICE_ROLE_KEY env variable should contain the service role key");

    // A server would seed this jar from the request's Cookie header and send
    // cookies.set_cookie_headers() back with the response.
    let cookies = Arc::new(MemoryCookies::new());
    let client = Arc::new(
        atomic_experiments::ClientConfig::new(api_url, service_role_key)
            .cookies(cookies.clone())
            .to_client()
            .unwrap(),
    );

    // Identity must exist before variants can be resolved.
    let identity = client.ensure_identity(None, None).unwrap();
    println!("Visitor: {}", identity.visitor_id);

    // Resolve the visitor's variant. The first call asks the experiment
    // service; afterwards the assignment cookie answers locally.
    let variant = client
        .get_variant(
            "checkout-button",
            7,
            &["variant-a".into(), "variant-b".into()],
        )
        .await;
    println!("Variant: {variant:?}");

    if let Some(variant) = variant {
        // Forward what the UI observers see; the tracker decides what to
        // send.
        let mut tracker = VariantTracker::new(client.clone(), "checkout-button", 7, variant)
            .with_trackable_ids(["buy-now"]);
        tracker.observe_visibility(1.0);
        tracker.record_click(Some("buy-now"));
        tracker.detach();
    }

    // A conversion later in the funnel.
    client
        .capture(
            EventCapture::new()
                .event_type(event_types::CONVERSION)
                .feature_flag("checkout-button")
                .experiment_epoch(7),
        )
        .await;

    // Tracker captures are fire-and-forget; give them a moment to flush
    // before the process exits.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    for header in cookies.set_cookie_headers() {
        println!("Set-Cookie: {header}");
    }
}
