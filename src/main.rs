#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_svc::{
        eventloop::EspSystemEventLoop, hal::prelude::Peripherals, nvs::EspDefaultNvsPartition,
    };
    use wifi_provisioner::{
        captive_portal::EspPortal, network::EspNetwork, store::NvsStore, ProvisionConfig,
        Provisioner,
    };

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = ProvisionConfig::from_env();
    config.validate()?;
    log::info!("Provisioning config: {:?}", config);

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    // eventfd is needed by the tokio timer driver
    let _fs = esp_idf_svc::io::vfs::MountedEventfs::mount(4)?;

    // keep going without NVS: nothing loads, saves fail, the AP still comes up
    let partition = EspDefaultNvsPartition::take()
        .map_err(|e| log::error!("NVS Flash init failed: {:?}", e))
        .ok();

    if let Err(e) = mount_spiffs(&config.page_root) {
        log::error!("Failed to mount SPIFFS: {:?}", e);
    }

    log_heap();

    let store = NvsStore::new(partition.clone(), &config.namespace);
    let network = EspNetwork::new(peripherals.modem, sysloop, partition)?;
    let portal = EspPortal::new(config.page_root.clone());
    let mut provisioner = Provisioner::new(config, store, network, portal);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match rt.block_on(provisioner.run()) {
        Ok(_) => log::info!("Restarting to apply new credentials"),
        Err(e) => {
            log::error!("Provisioning failed: {:?}", e);
            std::thread::sleep(std::time::Duration::from_secs(3));
        }
    }
    esp_idf_svc::hal::reset::restart();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::error!("wifi-provisioner drives ESP-IDF WiFi and NVS; build it for an espidf target");
    std::process::exit(1);
}

#[cfg(target_os = "espidf")]
fn mount_spiffs(base_path: &std::path::Path) -> anyhow::Result<()> {
    use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let base_path = std::ffi::CString::new(base_path.to_string_lossy().as_bytes())?;
    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: std::ptr::null(),
        max_files: 5,
        format_if_mount_failed: true,
    };
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;
    Ok(())
}

#[cfg(target_os = "espidf")]
fn log_heap() {
    unsafe {
        use esp_idf_svc::sys::{heap_caps_get_free_size, MALLOC_CAP_INTERNAL};

        log::info!(
            "Free INTERNAL heap size: {}KB",
            heap_caps_get_free_size(MALLOC_CAP_INTERNAL) / 1024
        );
    }
}
