use std::time::Duration;

use anyhow::{Context, bail};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, NetworkInterface};
use tracing::debug;

/// Upper bound on how long a capture loop blocks before rechecking its stop flag.
pub const CAPTURE_READ_TIMEOUT: Duration = Duration::from_millis(100);

fn capture_config() -> Config {
    Config {
        read_timeout: Some(CAPTURE_READ_TIMEOUT),
        promiscuous: true,
        ..Config::default()
    }
}

/// Looks up a live interface by name.
pub fn find_interface(name: &str) -> Option<NetworkInterface> {
    datalink::interfaces().into_iter().find(|i| i.name == name)
}

/// Opens a receive-only Ethernet channel on `intf`.
pub fn open_capture(intf: &NetworkInterface) -> anyhow::Result<Box<dyn DataLinkReceiver>> {
    open_eth_channel(intf, &capture_config(), datalink::channel)
}

/// Whether a capture channel can be opened on `intf` right now.
pub fn can_capture(intf: &NetworkInterface) -> bool {
    match open_capture(intf) {
        Ok(_) => true,
        Err(e) => {
            debug!(interface = %intf.name, error = %e, "capture unavailable");
            false
        }
    }
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<Box<dyn DataLinkReceiver>>
where
    F: FnOnce(&NetworkInterface, Config) -> std::io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg)
        .with_context(|| format!("opening capture on {}", intf.name))?;
    match ch {
        Channel::Ethernet(_tx, rx) => Ok(rx),
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}
