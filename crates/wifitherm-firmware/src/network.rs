//! Wi-Fi link management and the TCP transport used for reports
//!
//! The radio is owned by the [`connection`] task. It keeps the station
//! joined to the configured network and, while the captive portal is open,
//! additionally runs the soft access point. Mode changes are requested
//! through [`RADIO_MODE`].

use embassy_futures::select::{Either, select};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::{IpAddress, Ipv4Address, Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{
    AccessPointConfig, ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent,
    WifiStaState,
};
use log::{debug, error, info, warn};
use wifitherm_core::constants::{DEVICE_ID, TRANSPORT_TIMEOUT};
use wifitherm_core::reporter::{Connector, HttpConnection, ReportError};

use crate::wifi_secrets::{WIFI_PASSWORD, WIFI_SSID};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const SOCKET_BUFFER_SIZE: usize = 1024;

/// Which interfaces the radio runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMode {
    Station,
    StationAndPortal,
}

/// Requests a radio mode change from the [`connection`] task.
pub static RADIO_MODE: Signal<CriticalSectionRawMutex, RadioMode> = Signal::new();

fn mode_config(mode: RadioMode) -> ModeConfig {
    let client = ClientConfig::default()
        .with_ssid(WIFI_SSID.into())
        .with_password(WIFI_PASSWORD.into());

    match mode {
        RadioMode::Station => ModeConfig::Client(client),
        RadioMode::StationAndPortal => ModeConfig::ApSta(
            client,
            AccessPointConfig::default().with_ssid(DEVICE_ID.into()),
        ),
    }
}

async fn switch_mode(controller: &mut WifiController<'static>, next: RadioMode) -> RadioMode {
    info!("Switching radio to {:?}", next);
    if let Err(e) = controller.stop_async().await {
        warn!("Failed to stop Wi-Fi before mode change: {:?}", e);
    }
    next
}

/// Keeps the station connected, reconnecting after drops, and applies mode
/// changes requested through [`RADIO_MODE`].
#[embassy_executor::task]
pub async fn connection(mut controller: WifiController<'static>) {
    let mut mode = RadioMode::Station;

    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            if let Err(e) = controller.set_config(&mode_config(mode)) {
                error!("Wi-Fi configuration rejected: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                error!("Wi-Fi failed to start: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            info!("Wi-Fi started ({:?})", mode);
        }

        if WIFI_SSID.is_empty() {
            // Nothing to join; only the portal can use the radio.
            let next = RADIO_MODE.wait().await;
            mode = switch_mode(&mut controller, next).await;
            continue;
        }

        if matches!(esp_radio::wifi::sta_state(), WifiStaState::Connected) {
            match select(
                controller.wait_for_event(WifiEvent::StaDisconnected),
                RADIO_MODE.wait(),
            )
            .await
            {
                Either::First(()) => {
                    warn!("Wi-Fi disconnected, reconnecting in 5 s");
                    Timer::after(RECONNECT_DELAY).await;
                }
                Either::Second(next) => mode = switch_mode(&mut controller, next).await,
            }
            continue;
        }

        match select(controller.connect_async(), RADIO_MODE.wait()).await {
            Either::First(Ok(())) => info!("Wi-Fi connected to {}", WIFI_SSID),
            Either::First(Err(e)) => {
                warn!("Wi-Fi connect failed: {:?}, retrying in 5 s", e);
                Timer::after(RECONNECT_DELAY).await;
            }
            Either::Second(next) => mode = switch_mode(&mut controller, next).await,
        }
    }
}

#[embassy_executor::task(pool_size = 2)]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Logs the station address whenever DHCP (re)configures it.
#[embassy_executor::task]
pub async fn address_logger(stack: Stack<'static>) {
    loop {
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            info!("Got IP: {}", config.address);
        }
        stack.wait_config_down().await;
        warn!("Network configuration lost");
    }
}

/// Opens one TCP connection per report over the station stack.
pub struct TcpConnector {
    stack: Stack<'static>,
    rx_buffer: [u8; SOCKET_BUFFER_SIZE],
    tx_buffer: [u8; SOCKET_BUFFER_SIZE],
}

impl TcpConnector {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            rx_buffer: [0; SOCKET_BUFFER_SIZE],
            tx_buffer: [0; SOCKET_BUFFER_SIZE],
        }
    }

    async fn resolve(&self, host: &str) -> Result<Ipv4Address, ReportError> {
        if let Ok(address) = host.parse::<Ipv4Address>() {
            return Ok(address);
        }

        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                error!("DNS query for {} failed: {:?}", host, e);
                ReportError::Resolve
            })?;

        match addresses.first() {
            Some(IpAddress::Ipv4(address)) => Ok(*address),
            _ => {
                error!("DNS returned no results for {}", host);
                Err(ReportError::Resolve)
            }
        }
    }
}

impl Connector for TcpConnector {
    type Connection<'a> = TcpConnection<'a>;

    async fn connect(&mut self, host: &str, port: u16) -> Result<TcpConnection<'_>, ReportError> {
        if !self.stack.is_config_up() {
            warn!("Network is not up, cannot reach {}:{}", host, port);
            return Err(ReportError::Connect);
        }

        let address = self.resolve(host).await?;

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(TRANSPORT_TIMEOUT));

        debug!("Connecting to {}:{}", address, port);
        if let Err(e) = socket.connect((address, port)).await {
            error!("Connection to {}:{} failed: {:?}", address, port, e);
            socket.abort();
            return Err(ReportError::Connect);
        }

        Ok(TcpConnection { socket })
    }
}

/// Write every byte of `bytes`, treating a zero-length write as a reset.
pub async fn write_all(socket: &mut TcpSocket<'_>, mut bytes: &[u8]) -> Result<(), TcpError> {
    while !bytes.is_empty() {
        let n = socket.write(bytes).await?;
        if n == 0 {
            return Err(TcpError::ConnectionReset);
        }
        bytes = &bytes[n..];
    }
    Ok(())
}

/// An open report connection.
pub struct TcpConnection<'a> {
    socket: TcpSocket<'a>,
}

impl HttpConnection for TcpConnection<'_> {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ReportError> {
        write_all(&mut self.socket, bytes).await.map_err(|e| {
            error!("Socket write failed: {:?}", e);
            ReportError::Io { operation: "write" }
        })
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReportError> {
        self.socket.read(buf).await.map_err(|e| {
            error!("Socket read failed: {:?}", e);
            ReportError::Io { operation: "read" }
        })
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.flush().await {
            debug!("Socket flush on close failed: {:?}", e);
        }
        self.socket.close();
    }
}
