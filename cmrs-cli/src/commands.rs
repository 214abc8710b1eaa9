//! Subcommand handlers.
//!
//! Every handler waits for the panel to load, issues its requests and then
//! waits for ConnMan to answer every call before printing the outcome.

use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use cmrs::builders::SocksVersion;
use cmrs::{
    EditorInput, Ipv4Field, Ipv6Field, NetworkPanel, PanelSnapshot, ProxyServerKind, ServiceRow,
    TechnologyKind,
};
use log::{debug, info};

use crate::{Command, ConfigureArgs};

pub async fn execute(command: Command, timeout: Duration) -> anyhow::Result<()> {
    let panel = NetworkPanel::new()
        .await
        .context("failed to connect to the system bus")?;

    let snapshot = tokio::time::timeout(timeout, panel.wait_available())
        .await
        .map_err(|_| anyhow!("ConnMan did not appear within {}s", timeout.as_secs()))??;
    debug!(
        "Panel loaded with {} services and {} technologies",
        snapshot.services.len(),
        snapshot.technologies.len()
    );

    match command {
        Command::Status => print_status(&snapshot),
        Command::Technologies => print_technologies(&snapshot),
        Command::Services => print_services(&snapshot),
        Command::Show { service } => {
            let row = resolve_service(&snapshot, &service)?;
            print_details(row);
        }
        Command::Power { technology, state } => {
            let kind = TechnologyKind::from(technology);
            panel.set_powered(kind, state.enabled()).await?;
            let snapshot = panel.wait_idle().await?;
            report_switch(&snapshot, kind, state.enabled(), |t| t.powered, "powered")?;
        }
        Command::Offline { state } => {
            panel.set_offline_mode(state.enabled()).await?;
            let snapshot = panel.wait_idle().await?;
            if snapshot.offline_mode != state.enabled() {
                bail!("ConnMan refused to change offline mode");
            }
            println!("Offline mode {}", on_off(snapshot.offline_mode));
        }
        Command::Tether {
            technology,
            state,
            ssid,
            passphrase,
        } => {
            if let (Some(ssid), Some(passphrase)) = (ssid, passphrase) {
                panel.set_tethering_credentials(ssid, passphrase).await?;
            }
            let kind = TechnologyKind::from(technology);
            panel.set_tethering(kind, state.enabled()).await?;
            let snapshot = panel.wait_idle().await?;
            report_switch(&snapshot, kind, state.enabled(), |t| t.tethering, "tethering")?;
        }
        Command::Scan => {
            panel.scan().await?;
            let snapshot = panel.wait_idle().await?;
            print_services(&snapshot);
        }
        Command::Activate { service } => {
            let path = resolve_service(&snapshot, &service)?.path.clone();
            panel.activate_service(path.as_str()).await?;
            let snapshot = panel.wait_idle().await?;
            if let Some(row) = snapshot.services.iter().find(|s| s.path == path) {
                println!("{}: {}", row.name, row.state);
            }
        }
        Command::Configure(args) => configure(&panel, &snapshot, args).await?,
        Command::Forget { service } => {
            let row = resolve_service(&snapshot, &service)?;
            let (name, path) = (row.name.clone(), row.path.clone());
            panel.forget_service(path).await?;
            panel.wait_idle().await?;
            println!("Forgot {name}");
        }
        Command::Watch => watch(&panel).await?,
    }

    Ok(())
}

/// Finds a service by object path first, then by exact name.
fn resolve_service<'a>(snapshot: &'a PanelSnapshot, query: &str) -> anyhow::Result<&'a ServiceRow> {
    if let Some(row) = snapshot.services.iter().find(|s| s.path == query) {
        return Ok(row);
    }

    let mut matches = snapshot
        .services
        .iter()
        .filter(|s| s.name.eq_ignore_ascii_case(query));
    match (matches.next(), matches.next()) {
        (Some(row), None) => Ok(row),
        (Some(_), Some(_)) => bail!("several services are named {query:?}, use the object path"),
        (None, _) => bail!("no service matches {query:?}"),
    }
}

fn report_switch(
    snapshot: &PanelSnapshot,
    kind: TechnologyKind,
    wanted: bool,
    get: impl Fn(&cmrs::TechnologyStatus) -> bool,
    what: &str,
) -> anyhow::Result<()> {
    let status = snapshot
        .technologies
        .iter()
        .find(|t| t.kind == kind)
        .ok_or_else(|| anyhow!("{kind} technology is not available"))?;

    if get(status) != wanted {
        bail!("ConnMan refused to turn {kind} {what} {}", on_off(wanted));
    }
    println!("{kind} {what} {}", on_off(wanted));
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn print_status(snapshot: &PanelSnapshot) {
    println!("Status:       {}", snapshot.status.label());
    println!("Offline mode: {}", on_off(snapshot.offline_mode));
    println!();
    print_technologies(snapshot);
}

fn print_technologies(snapshot: &PanelSnapshot) {
    println!("{:<12} {:<8} {:<10} {}", "TECHNOLOGY", "POWERED", "TETHERING", "HOTSPOT");
    for tech in &snapshot.technologies {
        if !tech.present {
            println!("{:<12} {:<8} {:<10}", tech.kind.to_string(), "-", "-");
            continue;
        }
        println!(
            "{:<12} {:<8} {:<10} {}",
            tech.kind.to_string(),
            on_off(tech.powered),
            on_off(tech.tethering),
            tech.tethering_identifier.as_deref().unwrap_or("")
        );
    }
}

fn print_services(snapshot: &PanelSnapshot) {
    if snapshot.services.is_empty() {
        println!("No services");
        return;
    }

    println!(
        "{:<2} {:<32} {:<10} {:<14} {:<10} {}",
        "", "NAME", "TYPE", "STATE", "SECURITY", "SIGNAL"
    );
    for row in &snapshot.services {
        println!(
            "{:<2} {:<32} {:<10} {:<14} {:<10} {}",
            if row.favorite { "*" } else { "" },
            row.name,
            format!("{:?}", row.service_type).to_lowercase(),
            row.state.to_string(),
            row.security.as_str(),
            row.strength_label()
        );
    }
}

fn print_details(row: &ServiceRow) {
    let details = row.details();
    let missing = || "-".to_string();

    println!("{} ({})", row.name, row.path);
    println!("  State:        {}", row.state);
    println!("  Autoconnect:  {}", on_off(row.autoconnect));
    println!("  Security:     {}", details.security);
    println!("  Signal:       {}", details.strength);
    println!("  Interface:    {}", details.interface.unwrap_or_else(missing));
    println!("  MAC address:  {}", details.mac_address.unwrap_or_else(missing));
    println!("  IPv4 address: {}", details.ipv4_address.unwrap_or_else(missing));
    println!("  IPv4 netmask: {}", details.ipv4_netmask.unwrap_or_else(missing));
    println!("  IPv4 gateway: {}", details.ipv4_gateway.unwrap_or_else(missing));
    println!("  IPv6 address: {}", details.ipv6_address.unwrap_or_else(missing));
    println!(
        "  IPv6 prefix:  {}",
        details
            .ipv6_prefix_length
            .map(|p| p.to_string())
            .unwrap_or_else(missing)
    );
    println!("  IPv6 gateway: {}", details.ipv6_gateway.unwrap_or_else(missing));
    println!("  Nameservers:  {}", details.nameservers);
    println!("  Domains:      {}", details.domains);
}

/// Splits `[scheme://]host[:port]`, defaulting the port to 0 like an empty
/// port field. The scheme stays on the host.
fn server_field(value: &str) -> anyhow::Result<(String, u16)> {
    let (scheme, rest) = match value.split_once("://") {
        Some((scheme, rest)) => (format!("{scheme}://"), rest),
        None => (String::new(), value),
    };

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid port in {value:?}"))?;
            Ok((format!("{scheme}{host}"), port))
        }
        None => Ok((value.to_string(), 0)),
    }
}

/// Translates the flags into editor inputs, method choices first so the
/// fields they reveal can be filled in afterwards.
fn editor_inputs(args: &ConfigureArgs) -> anyhow::Result<Vec<EditorInput>> {
    let mut inputs = Vec::new();

    if let Some(state) = args.autoconnect {
        inputs.push(EditorInput::SetAutoconnect(state.enabled()));
    }

    if let Some(method) = args.ipv4 {
        inputs.push(EditorInput::SetIpv4Method(method.into()));
    }
    for (field, value) in [
        (Ipv4Field::Address, &args.address),
        (Ipv4Field::Netmask, &args.netmask),
        (Ipv4Field::Gateway, &args.gateway),
    ] {
        if let Some(value) = value {
            inputs.push(EditorInput::SetIpv4Field(field, value.clone()));
        }
    }

    if let Some(method) = args.ipv6 {
        inputs.push(EditorInput::SetIpv6Method(method.into()));
    }
    if let Some(privacy) = args.privacy {
        inputs.push(EditorInput::SetIpv6Privacy(privacy.into()));
    }
    for (field, value) in [
        (Ipv6Field::Address, &args.ipv6_address),
        (Ipv6Field::PrefixLength, &args.prefix_length),
        (Ipv6Field::Gateway, &args.ipv6_gateway),
    ] {
        if let Some(value) = value {
            inputs.push(EditorInput::SetIpv6Field(field, value.clone()));
        }
    }

    if let Some(nameservers) = &args.nameservers {
        inputs.push(EditorInput::SetNameservers(nameservers.clone()));
    }
    if let Some(domains) = &args.domains {
        inputs.push(EditorInput::SetDomains(domains.clone()));
    }

    if let Some(method) = args.proxy {
        inputs.push(EditorInput::SetProxyMethod(method.into()));
    }
    if let Some(url) = &args.proxy_url {
        inputs.push(EditorInput::SetProxyUrl(url.clone()));
    }
    for (kind, value) in [
        (ProxyServerKind::Http, &args.http_proxy),
        (ProxyServerKind::Https, &args.https_proxy),
        (ProxyServerKind::Socks, &args.socks_proxy),
    ] {
        if let Some(value) = value {
            let (host, port) = server_field(value)?;
            inputs.push(EditorInput::SetProxyServer { kind, host, port });
        }
    }
    if args.socks4 {
        inputs.push(EditorInput::SetSocksVersion(SocksVersion::V4));
    }
    if let Some(excludes) = &args.proxy_excludes {
        inputs.push(EditorInput::SetProxyExcludes(excludes.clone()));
    }

    Ok(inputs)
}

async fn configure(
    panel: &NetworkPanel,
    snapshot: &PanelSnapshot,
    args: ConfigureArgs,
) -> anyhow::Result<()> {
    let row = resolve_service(snapshot, &args.service)?;
    let (name, path) = (row.name.clone(), row.path.clone());

    let inputs = editor_inputs(&args)?;
    if inputs.is_empty() {
        bail!("nothing to change for {name}");
    }

    let mut done = panel.editor_events();
    panel.open_editor(path.as_str()).await?;

    let mut editor = None;
    for input in inputs {
        editor = Some(panel.edit(path.as_str(), input).await?);
    }

    if let Some(editor) = &editor {
        info!("Submitting {:?} for {name}", editor.dirty);
        if editor.dirty.is_empty() {
            panel.cancel_editor(path.as_str()).await?;
            println!("{name} already has these settings");
            return Ok(());
        }
    }

    panel.apply_editor(path.as_str()).await?;
    let closed = loop {
        let event = done.recv().await.context("editor events closed")?;
        if event.path == path {
            break event;
        }
    };
    if !closed.success {
        bail!("the editor for {name} was closed before applying");
    }

    panel.wait_idle().await?;
    println!("Updated {name}");
    Ok(())
}

async fn watch(panel: &NetworkPanel) -> anyhow::Result<()> {
    let mut snapshots = panel.subscribe();
    let mut last = None;

    loop {
        let line = {
            let snapshot = snapshots.borrow_and_update();
            let connected = snapshot
                .services
                .iter()
                .find(|s| s.state.is_connected())
                .map(|s| s.name.clone());
            (snapshot.status, connected)
        };

        if last.as_ref() != Some(&line) {
            match &line.1 {
                Some(name) => println!("{} ({name})", line.0.label()),
                None => println!("{}", line.0.label()),
            }
            last = Some(line);
        }

        if snapshots.changed().await.is_err() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ipv4Choice, ProxyChoice, Toggle};
    use cmrs::Ipv4Method;

    fn snapshot_with(rows: &[(&str, &str)]) -> PanelSnapshot {
        PanelSnapshot {
            services: rows
                .iter()
                .map(|(path, name)| {
                    let mut row = ServiceRow::new(*path);
                    row.name = name.to_string();
                    row
                })
                .collect(),
            ..PanelSnapshot::default()
        }
    }

    #[test]
    fn resolves_by_path_then_name() {
        let snapshot = snapshot_with(&[
            ("/net/connman/service/wifi_a", "Home"),
            ("/net/connman/service/ethernet_b", "Wired"),
        ]);

        let row = resolve_service(&snapshot, "/net/connman/service/ethernet_b").unwrap();
        assert_eq!(row.name, "Wired");

        let row = resolve_service(&snapshot, "home").unwrap();
        assert_eq!(row.path, "/net/connman/service/wifi_a");

        assert!(resolve_service(&snapshot, "Office").is_err());
    }

    #[test]
    fn duplicate_names_need_a_path() {
        let snapshot = snapshot_with(&[
            ("/net/connman/service/wifi_a", "Cafe"),
            ("/net/connman/service/wifi_b", "Cafe"),
        ]);

        assert!(resolve_service(&snapshot, "Cafe").is_err());
        assert!(resolve_service(&snapshot, "/net/connman/service/wifi_b").is_ok());
    }

    #[test]
    fn server_field_splits_port() {
        assert_eq!(
            server_field("proxy.example.com:3128").unwrap(),
            ("proxy.example.com".to_string(), 3128)
        );
        assert_eq!(
            server_field("proxy.example.com").unwrap(),
            ("proxy.example.com".to_string(), 0)
        );
        assert!(server_field("proxy.example.com:http").is_err());
    }

    #[test]
    fn server_field_keeps_scheme() {
        assert_eq!(
            server_field("socks4://gw.local").unwrap(),
            ("socks4://gw.local".to_string(), 0)
        );
        assert_eq!(
            server_field("https://proxy.example.com:8443").unwrap(),
            ("https://proxy.example.com".to_string(), 8443)
        );
    }

    #[test]
    fn methods_come_before_their_fields() {
        let args = ConfigureArgs {
            service: "Home".into(),
            ipv4: Some(Ipv4Choice::Manual),
            address: Some("10.0.0.5".into()),
            autoconnect: Some(Toggle::Off),
            proxy: Some(ProxyChoice::Manual),
            http_proxy: Some("proxy:8080".into()),
            ..ConfigureArgs::default()
        };

        let inputs = editor_inputs(&args).unwrap();
        assert_eq!(
            inputs,
            vec![
                EditorInput::SetAutoconnect(false),
                EditorInput::SetIpv4Method(Ipv4Method::Manual),
                EditorInput::SetIpv4Field(Ipv4Field::Address, "10.0.0.5".into()),
                EditorInput::SetProxyMethod(cmrs::ProxyMethod::Manual),
                EditorInput::SetProxyServer {
                    kind: ProxyServerKind::Http,
                    host: "proxy".into(),
                    port: 8080,
                },
            ]
        );
    }

    #[test]
    fn no_flags_means_no_inputs() {
        let args = ConfigureArgs {
            service: "Home".into(),
            ..ConfigureArgs::default()
        };
        assert!(editor_inputs(&args).unwrap().is_empty());
    }
}
