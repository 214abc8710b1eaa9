use cmrs::NetworkPanel;

#[tokio::main]
async fn main() -> cmrs::Result<()> {
    let panel = NetworkPanel::new().await?;
    let snapshot = panel.wait_available().await?;

    println!("Status: {}", snapshot.status.label());

    for tech in &snapshot.technologies {
        if tech.present {
            println!("{:10} powered={}", tech.kind.to_string(), tech.powered);
        }
    }

    for service in &snapshot.services {
        println!(
            "{:30} {:14} {}",
            service.name,
            service.state.to_string(),
            service.strength_label()
        );
    }

    Ok(())
}
