/// Gives the first connected service a static IPv4 address through the
/// connection editor.
use cmrs::{EditorInput, Ipv4Field, Ipv4Method, NetworkPanel};

#[tokio::main]
async fn main() -> cmrs::Result<()> {
    let panel = NetworkPanel::new().await?;
    let snapshot = panel.wait_available().await?;

    let Some(service) = snapshot.services.iter().find(|s| s.state.is_connected()) else {
        println!("No connected service");
        return Ok(());
    };
    println!("Configuring {}", service.name);

    let path = service.path.clone();
    panel.open_editor(path.as_str()).await?;
    panel
        .edit(path.as_str(), EditorInput::SetIpv4Method(Ipv4Method::Manual))
        .await?;
    panel
        .edit(path.as_str(), EditorInput::SetIpv4Field(Ipv4Field::Address, "192.168.1.50".into()))
        .await?;
    panel
        .edit(path.as_str(), EditorInput::SetIpv4Field(Ipv4Field::Netmask, "255.255.255.0".into()))
        .await?;
    let editor = panel
        .edit(path.as_str(), EditorInput::SetIpv4Field(Ipv4Field::Gateway, "192.168.1.1".into()))
        .await?;

    println!("Dirty groups: {:?}", editor.dirty);

    let mut done = panel.editor_events();
    panel.apply_editor(path.as_str()).await?;
    if let Ok(event) = done.recv().await {
        println!("Editor closed, success: {}", event.success);
    }

    Ok(())
}
