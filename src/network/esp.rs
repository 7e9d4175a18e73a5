//! `EspWifi` backed radio.

use anyhow::anyhow;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    ipv4::{self, Mask, Subnet},
    netif::{EspNetif, IpEvent, NetifConfiguration, NetifStack},
    nvs::EspDefaultNvsPartition,
    wifi::{
        AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration as WifiConfig,
        EspWifi, WifiDriver, WifiEvent,
    },
};

use super::{NetEvent, Network, Subscription};
use crate::credentials::{text_within, Credentials};

/// Soft-AP address, the ESP-IDF default the portal is usually reached on.
const AP_IP: ipv4::Ipv4Addr = ipv4::Ipv4Addr::new(192, 168, 4, 1);
const AP_NETMASK: Mask = Mask(24);

pub struct EspNetwork {
    wifi: EspWifi<'static>,
    sysloop: EspSystemEventLoop,
}

impl EspNetwork {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        let ap_netif_config = NetifConfiguration {
            ip_configuration: Some(ipv4::Configuration::Router(ipv4::RouterConfiguration {
                subnet: Subnet {
                    gateway: AP_IP,
                    mask: AP_NETMASK,
                },
                dhcp_enabled: true,
                dns: Some(AP_IP),
                secondary_dns: None,
            })),
            ..NetifConfiguration::wifi_default_router()
        };
        let ap_netif = EspNetif::new_with_conf(&ap_netif_config)?;
        let sta_netif = EspNetif::new(NetifStack::Sta)?;

        let driver = WifiDriver::new(modem, sysloop.clone(), nvs)?;
        let wifi = EspWifi::wrap_all(driver, sta_netif, ap_netif)?;

        Ok(Self { wifi, sysloop })
    }

    fn restart_with(&mut self, config: &WifiConfig) -> anyhow::Result<()> {
        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi.set_configuration(config)?;
        self.wifi.start()?;
        Ok(())
    }
}

impl Network for EspNetwork {
    fn subscribe(&mut self) -> anyhow::Result<Subscription> {
        let (tx, subscription) = Subscription::channel();

        let wifi_tx = tx.clone();
        let wifi_sub = self.sysloop.subscribe::<WifiEvent, _>(move |event| {
            if matches!(event, WifiEvent::StaDisconnected(..)) {
                wifi_tx.send(NetEvent::Disconnected);
            }
        })?;

        let ip_sub = self.sysloop.subscribe::<IpEvent, _>(move |event| {
            if matches!(event, IpEvent::DhcpIpAssigned(_)) {
                tx.send(NetEvent::GotAddress);
            }
        })?;

        Ok(subscription.guard(wifi_sub).guard(ip_sub))
    }

    fn start_station(&mut self, credentials: &Credentials) -> anyhow::Result<()> {
        if std::str::from_utf8(credentials.ssid()).is_err()
            || std::str::from_utf8(credentials.password()).is_err()
        {
            log::warn!("Credentials are not valid UTF-8, joining with a lossy copy");
        }
        let ssid: &str = &text_within(credentials.ssid());
        let password: &str = &text_within(credentials.password());
        let client_config = ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow!("ssid too long"))?,
            password: password
                .try_into()
                .map_err(|_| anyhow!("password too long"))?,
            // weakest threshold: accept whatever security the network offers
            auth_method: AuthMethod::None,
            ..Default::default()
        };

        self.restart_with(&WifiConfig::Client(client_config))?;
        self.wifi.connect()?;
        log::info!("Connecting to WiFi SSID: {}", credentials.ssid_lossy());
        Ok(())
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        max_clients: u16,
    ) -> anyhow::Result<()> {
        let ap_config = AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| anyhow!("AP ssid too long"))?,
            password: password
                .try_into()
                .map_err(|_| anyhow!("AP password too long"))?,
            ssid_hidden: false,
            channel: 1,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPAWPA2Personal
            },
            max_connections: max_clients,
            ..Default::default()
        };

        self.restart_with(&WifiConfig::AccessPoint(ap_config))?;
        log::info!("WiFi AP started. SSID: {ssid} on {AP_IP}");
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        Ok(())
    }
}
