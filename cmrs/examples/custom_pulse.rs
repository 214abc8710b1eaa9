/// Example demonstrating a custom panel configuration.
///
/// A slower spinner and a wifi rescan on every service list change suit
/// panels that stay open for a long time.
use cmrs::{NetworkPanel, PanelConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> cmrs::Result<()> {
    let config = PanelConfig::new()
        .with_pulse_interval(Duration::from_millis(200))
        .with_rescan_on_services_changed(true);

    let panel = NetworkPanel::with_config(config).await?;
    panel.wait_available().await?;

    println!("Watching services (Ctrl+C to stop)...");
    let mut updates = panel.subscribe();
    while updates.changed().await.is_ok() {
        let snapshot = updates.borrow_and_update().clone();
        let connecting: Vec<_> = snapshot
            .services
            .iter()
            .filter(|s| s.state.is_connecting())
            .map(|s| format!("{} [{}]", s.name, s.pulse))
            .collect();
        println!("{}: {}", snapshot.status.label(), connecting.join(", "));
    }

    Ok(())
}
