//! LIFX CLI - control LIFX devices on the local network
//!
//! Scan for devices, watch them come and go, and send them commands from
//! the command line.

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use futures::future::join_all;
use lifx_client::{Device, RequestOptions};
use lifx_core::{
    Hsbk, MacAddress, Message, Waveform, WaveformOptions, DEFAULT_PORT, LABEL_SIZE, POWER_OFF,
    POWER_ON,
};
use lifx_discovery::{scan, Discovery, DiscoveryEvent, Sighting};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::FileConfig;

/// LIFX - control LIFX lights over the LAN protocol
#[derive(Parser)]
#[command(name = "lifx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "LIFX_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn", env = "LIFX_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Where discovery broadcasts are sent
    #[arg(long, global = true, env = "LIFX_BROADCAST")]
    broadcast: Option<SocketAddr>,

    /// Local address for the discovery socket
    #[arg(long, global = true, env = "LIFX_BIND")]
    bind: Option<SocketAddr>,

    /// Per-attempt request timeout in milliseconds
    #[arg(long, global = true, env = "LIFX_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// IPv6 network prefix used to reach devices, e.g. fe80::%2 (zone = interface index)
    #[arg(long, global = true, env = "LIFX_IPV6_PREFIX")]
    ipv6_prefix: Option<String>,

    /// How long a scan waits for replies, in milliseconds
    #[arg(long, global = true, default_value = "1000")]
    wait_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// MAC address or label of the device
    target: String,

    /// Contact the device at this address instead of scanning (MAC targets only)
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Broadcast once and list the devices that answer
    Scan {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run discovery continuously and report devices as they come and go
    Watch {
        /// Seconds between discovery broadcasts
        #[arg(short, long)]
        interval_secs: Option<u64>,
    },

    /// Show everything a device reports about itself
    Info {
        #[command(flatten)]
        target: Target,

        /// Print the state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Switch a device on or off
    Power {
        #[command(flatten)]
        target: Target,

        #[arg(value_enum)]
        state: PowerState,

        /// Fade time in milliseconds
        #[arg(short, long, default_value = "0")]
        duration_ms: u32,
    },

    /// Set a colour
    Color {
        #[command(flatten)]
        target: Target,

        /// Hue in degrees (0-360)
        #[arg(long)]
        hue: f32,

        /// Saturation in percent (0-100)
        #[arg(long)]
        saturation: f32,

        /// Brightness in percent (0-100)
        #[arg(long)]
        brightness: f32,

        /// Colour temperature in kelvin
        #[arg(long, default_value = "3500")]
        kelvin: u16,

        /// Transition time in milliseconds
        #[arg(short, long, default_value = "0")]
        duration_ms: u32,
    },

    /// Set a white at a colour temperature
    White {
        #[command(flatten)]
        target: Target,

        /// Brightness in percent (0-100)
        #[arg(long)]
        brightness: f32,

        /// Colour temperature in kelvin (1500-9000)
        #[arg(long)]
        kelvin: u16,

        /// Transition time in milliseconds
        #[arg(short, long, default_value = "0")]
        duration_ms: u32,
    },

    /// Read or change a device label
    Label {
        #[command(flatten)]
        target: Target,

        /// New label; omit to print the current one
        new_label: Option<String>,
    },

    /// Run a waveform effect
    Waveform {
        #[command(flatten)]
        target: Target,

        #[arg(long, value_enum, default_value = "pulse")]
        shape: Shape,

        /// Effect hue in degrees (0-360)
        #[arg(long, default_value = "0")]
        hue: f32,

        /// Effect saturation in percent (0-100)
        #[arg(long, default_value = "100")]
        saturation: f32,

        /// Effect brightness in percent (0-100)
        #[arg(long, default_value = "100")]
        brightness: f32,

        #[arg(long, default_value = "3500")]
        kelvin: u16,

        /// Length of one cycle in milliseconds
        #[arg(long, default_value = "1000")]
        period_ms: u32,

        #[arg(long, default_value = "3")]
        cycles: f32,

        /// Share of each cycle spent on the original colour (0-1)
        #[arg(long, default_value = "0.5")]
        skew: f32,

        /// Keep the effect colour when the effect ends
        #[arg(long)]
        persist: bool,
    },

    /// Send bytes to a device and wait for them to come back
    Echo {
        #[command(flatten)]
        target: Target,

        text: String,
    },

    /// Restart a device
    Reboot {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PowerState {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    Saw,
    Sine,
    HalfSine,
    Triangle,
    Pulse,
}

impl From<Shape> for Waveform {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Saw => Waveform::Saw,
            Shape::Sine => Waveform::Sine,
            Shape::HalfSine => Waveform::HalfSine,
            Shape::Triangle => Waveform::Triangle,
            Shape::Pulse => Waveform::Pulse,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    let settings = load_settings(&cli)?;
    let wait = Duration::from_millis(cli.wait_ms);

    match cli.command {
        Commands::Scan { json } => run_scan(&settings, wait, json).await?,

        Commands::Watch { interval_secs } => run_watch(&settings, interval_secs).await?,

        Commands::Info { target, json } => {
            let device = connect(&settings, &target, wait).await?;
            let result = print_info(&device, json).await;
            device.close();
            result?;
        }

        Commands::Power {
            target,
            state,
            duration_ms,
        } => {
            let level = match state {
                PowerState::On => POWER_ON,
                PowerState::Off => POWER_OFF,
            };
            let message = if duration_ms > 0 {
                Message::LightSetPower {
                    level,
                    duration: duration_ms,
                }
            } else {
                Message::SetPower { level }
            };
            command(&settings, &target, wait, message).await?;
        }

        Commands::Color {
            target,
            hue,
            saturation,
            brightness,
            kelvin,
            duration_ms,
        } => {
            let color = hsbk(hue, saturation, brightness, kelvin)?;
            let message = Message::LightSetColor {
                color,
                duration: duration_ms,
            };
            command(&settings, &target, wait, message).await?;
        }

        Commands::White {
            target,
            brightness,
            kelvin,
            duration_ms,
        } => {
            let color = hsbk(0.0, 0.0, brightness, kelvin)?;
            let message = Message::LightSetColor {
                color,
                duration: duration_ms,
            };
            command(&settings, &target, wait, message).await?;
        }

        Commands::Label { target, new_label } => match new_label {
            Some(label) => {
                ensure!(
                    label.len() <= LABEL_SIZE,
                    "Labels are limited to {} bytes",
                    LABEL_SIZE
                );
                command(&settings, &target, wait, Message::SetLabel { label }).await?;
            }
            None => {
                let device = connect(&settings, &target, wait).await?;
                let label = device.get_label().await;
                device.close();
                match label? {
                    Some(label) => println!("{}", label),
                    None => bail!("{} did not answer", target.target),
                }
            }
        },

        Commands::Waveform {
            target,
            shape,
            hue,
            saturation,
            brightness,
            kelvin,
            period_ms,
            cycles,
            skew,
            persist,
        } => {
            ensure!((0.0..=1.0).contains(&skew), "skew must be between 0 and 1");
            let options = WaveformOptions {
                transient: !persist,
                color: hsbk(hue, saturation, brightness, kelvin)?,
                period: period_ms,
                cycles,
                skew_ratio: skew_ratio(skew),
                waveform: shape.into(),
            };
            command(&settings, &target, wait, Message::LightSetWaveform(options)).await?;
        }

        Commands::Echo { target, text } => {
            let device = connect(&settings, &target, wait).await?;
            let reply = device.echo(text.as_bytes()).await;
            device.close();
            match reply? {
                Some(payload) => {
                    let end = payload.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
                    println!("{}", String::from_utf8_lossy(&payload[..end]));
                }
                None => bail!("{} did not answer", target.target),
            }
        }

        Commands::Reboot { target } => {
            command(&settings, &target, wait, Message::SetReboot).await?;
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    // Logs go to stderr so command output can be piped.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<FileConfig> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let flags = FileConfig {
        broadcast_addr: cli.broadcast,
        bind_addr: cli.bind,
        timeout_ms: cli.timeout_ms,
        ipv6_prefix: cli.ipv6_prefix.clone(),
        ..Default::default()
    };
    Ok(file.merge(flags))
}

// ============================================================================
// Value conversions
// ============================================================================

fn percent(value: f32, what: &str) -> Result<u16> {
    ensure!(
        (0.0..=100.0).contains(&value),
        "{} must be between 0 and 100",
        what
    );
    Ok((value * 65535.0 / 100.0).round() as u16)
}

fn degrees(value: f32) -> Result<u16> {
    ensure!((0.0..=360.0).contains(&value), "hue must be between 0 and 360");
    Ok(((value % 360.0) * 65535.0 / 360.0).round() as u16)
}

fn hsbk(hue: f32, saturation: f32, brightness: f32, kelvin: u16) -> Result<Hsbk> {
    Ok(Hsbk::new(
        degrees(hue)?,
        percent(saturation, "saturation")?,
        percent(brightness, "brightness")?,
        kelvin,
    ))
}

/// 0..=1 onto the wire's -32768..=32767
fn skew_ratio(skew: f32) -> i16 {
    (skew * 65535.0 - 32768.0).round() as i16
}

fn parse_addr(addr: &str) -> Result<SocketAddr> {
    if let Ok(addr) = addr.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let ip: IpAddr = addr
        .parse()
        .with_context(|| format!("Invalid device address {:?}", addr))?;
    Ok(SocketAddr::new(ip, DEFAULT_PORT))
}

// ============================================================================
// Device lookup
// ============================================================================

async fn open_all(found: &[Sighting], settings: &FileConfig) -> Vec<Device> {
    let mut devices = Vec::with_capacity(found.len());
    for seen in found {
        match Device::open(seen.mac, seen.addr, settings.session_config()).await {
            Ok(device) => devices.push(device),
            Err(e) => warn!("Cannot open session with {}: {}", seen.mac, e),
        }
    }
    devices
}

/// Open a session with the device named by `target`
async fn connect(settings: &FileConfig, target: &Target, wait: Duration) -> Result<Device> {
    let mac = MacAddress::parse(&target.target).ok();

    if let Some(addr) = &target.addr {
        let mac = mac.context("--addr needs a MAC address as the target")?;
        let addr = parse_addr(addr)?;
        debug!("Contacting {} directly at {}", mac, addr);
        return Ok(Device::open(mac, addr, settings.session_config()).await?);
    }

    let found = scan(&settings.discovery_config(), wait).await?;

    if let Some(mac) = mac {
        let seen = found
            .iter()
            .find(|s| s.mac == mac)
            .with_context(|| format!("{} did not answer the scan", mac))?;
        return Ok(Device::open(seen.mac, seen.addr, settings.session_config()).await?);
    }

    let devices = open_all(&found, settings).await;
    let labels = join_all(devices.iter().map(|d| d.get_label())).await;

    let mut matched = None;
    for (device, label) in devices.into_iter().zip(labels) {
        let hit = matches!(&label, Ok(Some(l)) if l.eq_ignore_ascii_case(&target.target));
        if hit && matched.is_none() {
            matched = Some(device);
        } else {
            device.close();
        }
    }

    matched.with_context(|| format!("No device labelled {:?} answered", target.target))
}

/// Send a mutation and wait for the device to acknowledge it
async fn command(
    settings: &FileConfig,
    target: &Target,
    wait: Duration,
    message: Message,
) -> Result<()> {
    let device = connect(settings, target, wait).await?;
    let name = message.name();

    let response = device
        .request_with(message, RequestOptions::new().ack_required(true))
        .await;
    device.close();

    if response?.is_no_response() {
        bail!("{} did not acknowledge {}", device.mac(), name);
    }
    println!("{} {} {}", "OK".green().bold(), device.mac(), name);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

async fn run_scan(settings: &FileConfig, wait: Duration, json: bool) -> Result<()> {
    let found = scan(&settings.discovery_config(), wait).await?;
    let devices = open_all(&found, settings).await;
    let labels: Vec<Option<String>> = join_all(devices.iter().map(|d| d.get_label()))
        .await
        .into_iter()
        .map(|label| label.ok().flatten())
        .collect();

    if json {
        let rows: Vec<serde_json::Value> = devices
            .iter()
            .zip(&labels)
            .map(|(device, label)| {
                serde_json::json!({
                    "mac": device.mac(),
                    "addr": device.addr(),
                    "label": label,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if devices.is_empty() {
        println!("{}", "No devices found".yellow());
    } else {
        for (device, label) in devices.iter().zip(&labels) {
            println!(
                "{}  {:<22}  {}",
                device.mac().to_string().cyan(),
                device.addr(),
                label.as_deref().unwrap_or("?")
            );
        }
    }

    for device in devices {
        device.close();
    }
    Ok(())
}

async fn run_watch(settings: &FileConfig, interval_secs: Option<u64>) -> Result<()> {
    // Watching wants a livelier cadence than the library default.
    let secs = interval_secs.or(settings.interval_secs).unwrap_or(10).max(1);
    let config = settings
        .discovery_config()
        .with_interval(Duration::from_secs(secs));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = Discovery::with_config(config).start(tx).await?;

    println!(
        "{} Watching for devices every {}s (Ctrl+C to stop)",
        "LIFX".cyan().bold(),
        secs
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(DiscoveryEvent::Registered(device)) => {
                    tokio::spawn(announce(device));
                }
                Some(DiscoveryEvent::Unregistered(device)) => {
                    println!(
                        "{} {}  {}",
                        "-".red().bold(),
                        device.mac(),
                        device.state().label.unwrap_or_default()
                    );
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Print a newly registered device once its basic facts are in
async fn announce(device: Device) {
    let (label, version, group, location) = tokio::join!(
        device.get_label(),
        device.get_version(),
        device.get_group(),
        device.get_location()
    );

    let label = label.ok().flatten().unwrap_or_else(|| "?".to_string());
    let product = version
        .ok()
        .flatten()
        .map(|v| match v.product() {
            Some(p) => p.name.to_string(),
            None => format!("product {}", v.product),
        })
        .unwrap_or_default();
    let group = group.ok().flatten().map(|g| g.label).unwrap_or_default();
    let location = location.ok().flatten().map(|l| l.label).unwrap_or_default();

    println!(
        "{} {}  {:<22}  {}  {}  {} / {}",
        "+".green().bold(),
        device.mac(),
        device.addr(),
        label.bold(),
        product,
        location,
        group
    );
}

async fn print_info(device: &Device, json: bool) -> Result<()> {
    let (color, version, host_fw, wifi_fw, wifi, uptime, location, group) = tokio::join!(
        device.get_color(),
        device.get_version(),
        device.get_host_firmware(),
        device.get_wifi_firmware(),
        device.get_wifi_info(),
        device.get_info(),
        device.get_location(),
        device.get_group()
    );
    if color?.is_none() {
        bail!("{} did not answer", device.mac());
    }
    // The rest fill the state cache; a missing answer just leaves a gap.
    version?;
    host_fw?;
    wifi_fw?;
    wifi?;
    uptime?;
    location?;
    group?;

    let state = device.state();
    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    let unknown = || "?".to_string();
    println!("{}", device.mac().to_string().cyan().bold());
    row("Label", state.label.clone().unwrap_or_else(unknown));
    row("Address", device.addr().to_string());
    row(
        "Power",
        match state.is_on() {
            Some(true) => "on".to_string(),
            Some(false) => "off".to_string(),
            None => unknown(),
        },
    );
    if let Some(c) = state.color {
        row(
            "Colour",
            format!(
                "hue {:.0} sat {:.0}% bri {:.0}% {}K",
                c.hue as f32 * 360.0 / 65535.0,
                c.saturation as f32 * 100.0 / 65535.0,
                c.brightness as f32 * 100.0 / 65535.0,
                c.kelvin
            ),
        );
    }
    if let Some(v) = state.version {
        row(
            "Product",
            match v.product() {
                Some(p) => format!("{} (product {} version {})", p.name, v.product, v.version),
                None => format!("vendor {} product {} version {}", v.vendor, v.product, v.version),
            },
        );
        if v.product().map_or(false, |p| p.features.multizone) {
            if let Ok(Some(_)) = device.get_color_zones(0, None).await {
                if let Some(zones) = device.state().color_zones {
                    row("Zones", zones.len().to_string());
                }
            }
        }
    }
    if let Some(fw) = state.host_firmware {
        row("Firmware", format!("{}.{}", fw.major(), fw.minor()));
    }
    if let Some(fw) = state.wifi_firmware {
        row("Wi-Fi firmware", format!("{}.{}", fw.major(), fw.minor()));
    }
    if let Some(info) = state.wifi_info {
        let signal = if info.signal > 0.0 {
            format!("{:.1} dBm", 10.0 * info.signal.log10())
        } else {
            unknown()
        };
        row("Signal", signal);
    }
    if let Some(info) = state.info {
        row("Uptime", format!("{}s", info.uptime / 1_000_000_000));
    }
    if let Some(location) = state.location {
        row("Location", location.label);
    }
    if let Some(group) = state.group {
        row("Group", group.label);
    }

    Ok(())
}

fn row(name: &str, value: String) {
    println!("  {:<15} {}", format!("{}:", name).green(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_color_conversions() {
        let color = hsbk(180.0, 50.0, 100.0, 3500).unwrap();
        assert_eq!(color.hue, 32768);
        assert_eq!(color.saturation, 32768);
        assert_eq!(color.brightness, 65535);
        assert_eq!(degrees(360.0).unwrap(), 0);

        assert!(percent(101.0, "brightness").is_err());
        assert!(degrees(-1.0).is_err());
    }

    #[test]
    fn test_skew_ratio_range() {
        assert_eq!(skew_ratio(0.0), i16::MIN);
        assert_eq!(skew_ratio(1.0), i16::MAX);
        assert!(skew_ratio(0.5).abs() <= 1);
    }

    #[test]
    fn test_parse_addr_defaults_port() {
        assert_eq!(
            parse_addr("192.168.1.40").unwrap(),
            "192.168.1.40:56700".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(parse_addr("[fe80::1]:56701").unwrap().port(), 56701);
        assert!(parse_addr("bulb").is_err());
    }

    #[test]
    fn test_power_command_line() {
        let cli = Cli::try_parse_from(["lifx", "power", "d0:73:d5:01:02:03", "on", "-d", "500"])
            .unwrap();
        match cli.command {
            Commands::Power {
                target,
                state,
                duration_ms,
            } => {
                assert_eq!(target.target, "d0:73:d5:01:02:03");
                assert!(matches!(state, PowerState::On));
                assert_eq!(duration_ms, 500);
            }
            _ => panic!("expected power"),
        }
    }
}
