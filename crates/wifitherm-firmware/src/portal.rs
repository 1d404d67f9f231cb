//! Soft-AP captive portal
//!
//! While collecting, the radio also runs an open access point named after
//! the device, and the form is served from 192.168.4.1 on port 80. Any path
//! other than the submit path gets the form, so phones checking for a captive
//! portal land on it. Two small UDP tasks run on the access point stack: a
//! DHCP responder leasing 192.168.4.x addresses, and a DNS responder that
//! resolves every name to the portal.

#[cfg(feature = "portal")]
pub use soft_ap::*;

#[cfg(not(feature = "portal"))]
pub use disabled::*;

#[cfg(feature = "portal")]
mod soft_ap {
    use alloc::string::String;

    use embassy_net::tcp::TcpSocket;
    use embassy_net::udp::{PacketMetadata, UdpSocket};
    use embassy_net::{
        Config as NetConfig, IpAddress, IpEndpoint, Ipv4Address, Ipv4Cidr, Stack,
        StaticConfigV4,
    };
    use embassy_time::{Duration, Timer};
    use log::{debug, info, warn};
    use wifitherm_core::provisioning::{
        CaptivePortal, DHCP_CLIENT_PORT, DHCP_SERVER_PORT, DNS_PORT, DhcpServer, MAX_DHCP_MESSAGE,
        MAX_DNS_MESSAGE, PortalError, PortalParameter, PortalRequest, PortalValues, dns_reply,
        parse_request_line, parse_submission, render_form, render_saved, response_head,
    };

    use crate::network::{RADIO_MODE, RadioMode, write_all};

    pub const PORTAL_ADDRESS: Ipv4Address = Ipv4Address::new(192, 168, 4, 1);
    const PORTAL_PORT: u16 = 80;
    const MAX_REQUEST_LINE: usize = 512;
    const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);
    /// Time for the browser to receive the confirmation before the AP goes down.
    const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

    /// Static addressing for the access point interface.
    pub fn portal_net_config() -> NetConfig {
        NetConfig::ipv4_static(StaticConfigV4 {
            address: Ipv4Cidr::new(PORTAL_ADDRESS, 24),
            gateway: None,
            dns_servers: Default::default(),
        })
    }

    /// Leases addresses to clients of the access point.
    #[embassy_executor::task]
    pub async fn dhcp_server(stack: Stack<'static>) -> ! {
        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; MAX_DHCP_MESSAGE * 2];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_buffer = [0u8; MAX_DHCP_MESSAGE * 2];
        let mut socket = UdpSocket::new(
            stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        if let Err(e) = socket.bind(DHCP_SERVER_PORT) {
            panic!("Portal DHCP bind failed: {:?}", e);
        }

        let mut server = DhcpServer::new(PORTAL_ADDRESS.octets());
        let mut request = [0u8; MAX_DHCP_MESSAGE];
        let mut reply = [0u8; MAX_DHCP_MESSAGE];
        // Clients have no address yet, so every reply is broadcast.
        let clients = IpEndpoint::new(IpAddress::Ipv4(Ipv4Address::BROADCAST), DHCP_CLIENT_PORT);
        loop {
            let n = match socket.recv_from(&mut request).await {
                Ok((n, _)) => n,
                Err(e) => {
                    warn!("Portal DHCP receive failed: {:?}", e);
                    continue;
                }
            };
            if let Some(len) = server.reply(&request[..n], &mut reply) {
                if let Err(e) = socket.send_to(&reply[..len], clients).await {
                    warn!("Portal DHCP send failed: {:?}", e);
                }
            }
        }
    }

    /// Answers every DNS query on the access point with the portal address.
    #[embassy_executor::task]
    pub async fn dns_server(stack: Stack<'static>) -> ! {
        let mut rx_meta = [PacketMetadata::EMPTY; 4];
        let mut rx_buffer = [0u8; MAX_DNS_MESSAGE * 2];
        let mut tx_meta = [PacketMetadata::EMPTY; 4];
        let mut tx_buffer = [0u8; MAX_DNS_MESSAGE * 2];
        let mut socket = UdpSocket::new(
            stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        if let Err(e) = socket.bind(DNS_PORT) {
            panic!("Portal DNS bind failed: {:?}", e);
        }

        let mut query = [0u8; MAX_DNS_MESSAGE];
        let mut reply = [0u8; MAX_DNS_MESSAGE];
        loop {
            let (n, sender) = match socket.recv_from(&mut query).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("Portal DNS receive failed: {:?}", e);
                    continue;
                }
            };
            if let Some(len) = dns_reply(&query[..n], PORTAL_ADDRESS.octets(), &mut reply) {
                if let Err(e) = socket.send_to(&reply[..len], sender).await {
                    warn!("Portal DNS send failed: {:?}", e);
                }
            }
        }
    }

    /// Serves the provisioning form over the access point stack.
    pub struct SoftApPortal {
        stack: Stack<'static>,
        rx_buffer: [u8; 1024],
        tx_buffer: [u8; 2048],
    }

    impl SoftApPortal {
        pub fn new(stack: Stack<'static>) -> Self {
            Self {
                stack,
                rx_buffer: [0; 1024],
                tx_buffer: [0; 2048],
            }
        }
    }

    impl CaptivePortal for SoftApPortal {
        async fn collect(
            &mut self,
            ap_name: &str,
            parameters: &[PortalParameter],
        ) -> Result<PortalValues, PortalError> {
            RADIO_MODE.signal(RadioMode::StationAndPortal);
            self.stack.wait_link_up().await;
            info!(
                "Captive portal {} open at http://{}/",
                ap_name, PORTAL_ADDRESS
            );

            let values = loop {
                let mut socket =
                    TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
                socket.set_timeout(Some(SOCKET_TIMEOUT));

                if let Err(e) = socket.accept(PORTAL_PORT).await {
                    warn!("Portal accept failed: {:?}", e);
                    socket.abort();
                    Timer::after(Duration::from_millis(200)).await;
                    continue;
                }

                let served = serve(&mut socket, ap_name, parameters).await;
                socket.close();
                match served {
                    Ok(Some(values)) => break values,
                    Ok(None) => {}
                    Err(e) => warn!("Portal connection failed: {:?}", e),
                }
            };

            Timer::after(SHUTDOWN_GRACE).await;
            RADIO_MODE.signal(RadioMode::Station);
            Ok(values)
        }
    }

    /// Answer one request; returns the submitted values if it was a submission.
    async fn serve(
        socket: &mut TcpSocket<'_>,
        ap_name: &str,
        parameters: &[PortalParameter],
    ) -> Result<Option<PortalValues>, embassy_net::tcp::Error> {
        let mut buf = [0u8; MAX_REQUEST_LINE];
        let mut total = 0usize;

        // Only the request line matters.
        loop {
            let n = socket.read(&mut buf[total..]).await?;
            if n == 0 {
                break;
            }
            total += n;
            if total == buf.len() || buf[..total].windows(2).any(|w| w == b"\r\n") {
                break;
            }
        }
        if total == 0 {
            return Ok(None);
        }

        let request = core::str::from_utf8(&buf[..total]).unwrap_or("");
        let line = request.lines().next().unwrap_or("");
        debug!("Portal request: {}", line);

        let (status, body, values) = match parse_request_line(line) {
            Some(PortalRequest::Save(query)) => {
                let values = parse_submission(query, parameters);
                ("200 OK", render_saved(ap_name), Some(values))
            }
            Some(PortalRequest::Form | PortalRequest::NotFound) => {
                ("200 OK", render_form(ap_name, parameters), None)
            }
            None => ("405 Method Not Allowed", String::new(), None),
        };

        write_all(socket, response_head(status, body.len()).as_bytes()).await?;
        write_all(socket, body.as_bytes()).await?;
        socket.flush().await?;
        Ok(values)
    }
}

#[cfg(not(feature = "portal"))]
mod disabled {
    use log::warn;
    use wifitherm_core::provisioning::{
        CaptivePortal, PortalError, PortalParameter, PortalValues,
    };

    /// Stand-in when the firmware is built without the captive portal.
    pub struct DisabledPortal;

    impl CaptivePortal for DisabledPortal {
        async fn collect(
            &mut self,
            ap_name: &str,
            _parameters: &[PortalParameter],
        ) -> Result<PortalValues, PortalError> {
            warn!("Provisioning requested but portal {} is not built in", ap_name);
            Err(PortalError::StartFailed {
                details: "firmware built without the portal feature",
            })
        }
    }
}
