/// Flips the wifi technology's power switch and waits for ConnMan to
/// confirm the new value.
use cmrs::{NetworkPanel, TechnologyKind};

#[tokio::main]
async fn main() -> cmrs::Result<()> {
    env_logger::init();

    let panel = NetworkPanel::new().await?;
    let snapshot = panel.wait_available().await?;

    let wifi = snapshot
        .technologies
        .iter()
        .find(|t| t.kind == TechnologyKind::Wifi && t.present);

    let Some(wifi) = wifi else {
        println!("No wifi technology present");
        return Ok(());
    };

    let target = !wifi.powered;
    println!("Turning wifi {}", if target { "on" } else { "off" });
    panel.set_powered(TechnologyKind::Wifi, target).await?;

    let mut updates = panel.subscribe();
    while updates.changed().await.is_ok() {
        let powered = updates
            .borrow()
            .technologies
            .iter()
            .any(|t| t.kind == TechnologyKind::Wifi && t.powered);
        if powered == target {
            println!("Done");
            break;
        }
    }

    Ok(())
}
