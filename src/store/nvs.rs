//! NVS backed credential store.

use std::ffi::{CStr, CString};

use esp_idf_svc::{
    nvs::EspDefaultNvsPartition,
    sys::{self, esp, EspError},
};

use super::{CredentialStore, StoreError, PASSWORD_KEY, SSID_KEY};
use crate::credentials::{Credentials, MAX_PASSWORD_LEN, MAX_SSID_LEN};

pub struct NvsStore {
    /// `None` when the NVS partition failed to initialise.
    partition: Option<EspDefaultNvsPartition>,
    namespace: String,
}

impl NvsStore {
    pub fn new(partition: Option<EspDefaultNvsPartition>, namespace: &str) -> Self {
        Self {
            partition,
            namespace: namespace.to_string(),
        }
    }

    fn read(&self) -> Result<Option<Credentials>, EspError> {
        if self.partition.is_none() {
            return Ok(None);
        }
        let Ok(namespace) = CString::new(self.namespace.as_str()) else {
            return Ok(None);
        };
        let Some(nvs) = RawNvs::open(&namespace, sys::nvs_open_mode_t_NVS_READONLY)? else {
            return Ok(None);
        };

        let mut ssid_buf = [0u8; MAX_SSID_LEN + 1];
        let mut pass_buf = [0u8; MAX_PASSWORD_LEN + 1];
        let ssid = nvs.get_bytes(&key(SSID_KEY), &mut ssid_buf)?;
        let pass = nvs.get_bytes(&key(PASSWORD_KEY), &mut pass_buf)?;

        Ok(match (ssid, pass) {
            (Some(ssid), Some(pass)) => Some(Credentials::new(ssid, pass)),
            _ => None,
        })
    }
}

impl CredentialStore for NvsStore {
    fn load(&self) -> Option<Credentials> {
        self.read()
            .map_err(|e| log::warn!("Failed to read credentials from nvs: {:?}", e))
            .ok()
            .flatten()
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        if self.partition.is_none() {
            return Err(StoreError::unavailable("open", "nvs partition not initialised"));
        }

        let namespace =
            CString::new(self.namespace.as_str()).map_err(|e| StoreError::unavailable("open", e))?;
        let ssid_key = key(SSID_KEY);
        let pass_key = key(PASSWORD_KEY);
        let ssid =
            CString::new(credentials.ssid()).map_err(|e| StoreError::unavailable("write", e))?;
        let pass =
            CString::new(credentials.password()).map_err(|e| StoreError::unavailable("write", e))?;

        let handle = RawNvs::open(&namespace, sys::nvs_open_mode_t_NVS_READWRITE)
            .map_err(|e| StoreError::unavailable("open", e))?
            .ok_or_else(|| StoreError::unavailable("open", "namespace not found"))?;

        // two writes, one commit: the commit is the visibility point
        esp!(unsafe { sys::nvs_set_str(handle.0, ssid_key.as_ptr(), ssid.as_ptr()) })
            .map_err(|e| StoreError::unavailable("write", e))?;
        esp!(unsafe { sys::nvs_set_str(handle.0, pass_key.as_ptr(), pass.as_ptr()) })
            .map_err(|e| StoreError::unavailable("write", e))?;
        esp!(unsafe { sys::nvs_commit(handle.0) })
            .map_err(|e| StoreError::unavailable("commit", e))?;

        Ok(())
    }
}

fn key(name: &'static str) -> CString {
    // key constants are plain ASCII
    CString::new(name).unwrap_or_default()
}

/// Open NVS handle, closed on drop.
struct RawNvs(sys::nvs_handle_t);

impl RawNvs {
    /// `None` when a read-only open finds no such namespace.
    fn open(namespace: &CString, mode: sys::nvs_open_mode_t) -> Result<Option<Self>, EspError> {
        let mut handle: sys::nvs_handle_t = 0;
        let err = unsafe { sys::nvs_open(namespace.as_ptr(), mode, &mut handle) };
        if err == sys::ESP_ERR_NVS_NOT_FOUND as sys::esp_err_t {
            return Ok(None);
        }
        esp!(err)?;
        Ok(Some(Self(handle)))
    }

    /// String value of `key` as raw bytes, without the terminating NUL.
    fn get_bytes<'a>(&self, key: &CStr, buf: &'a mut [u8]) -> Result<Option<&'a [u8]>, EspError> {
        let mut len = buf.len();
        let err = unsafe {
            sys::nvs_get_str(self.0, key.as_ptr(), buf.as_mut_ptr().cast(), &mut len)
        };
        if err == sys::ESP_ERR_NVS_NOT_FOUND as sys::esp_err_t {
            return Ok(None);
        }
        esp!(err)?;
        let value = &buf[..len.min(buf.len())];
        let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
        Ok(Some(&value[..end]))
    }
}

impl Drop for RawNvs {
    fn drop(&mut self) {
        unsafe { sys::nvs_close(self.0) }
    }
}
