use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use tuyaapi::{DeviceData, Requestor, Transport};

use crate::hooks::Hook;
use crate::{Config, Result};

/// Where device status comes from.
pub trait DeviceSource {
    /// The user owning `device_id`.
    fn user_id(&self, device_id: &str) -> tuyaapi::Result<String>;

    fn devices(&self, uid: &str) -> tuyaapi::Result<Vec<DeviceData>>;
}

impl<T: Transport> DeviceSource for Requestor<T> {
    fn user_id(&self, device_id: &str) -> tuyaapi::Result<String> {
        self.device_uid(device_id)
    }

    fn devices(&self, uid: &str) -> tuyaapi::Result<Vec<DeviceData>> {
        self.user_devices(uid)
    }
}

/// Fetches the device list once per tick and hands it to every hook.
pub struct Poller<S> {
    source: S,
    uid: String,
    hooks: Vec<Box<dyn Hook>>,
    error_log: Option<PathBuf>,
}

impl<S: DeviceSource> Poller<S> {
    /// Looks up the user id of `device_id`. Failing here is fatal, there is
    /// nothing to poll without it.
    pub fn connect(
        source: S,
        device_id: &str,
        hooks: Vec<Box<dyn Hook>>,
        error_log: Option<PathBuf>,
    ) -> Result<Self> {
        let uid = source.user_id(device_id)?;
        info!("polling devices of user {uid}");
        Ok(Self {
            source,
            uid,
            hooks,
            error_log,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Switches to a new source. The old one stays in place if the user id
    /// lookup fails.
    pub fn replace_source(&mut self, source: S, device_id: &str) -> Result<()> {
        let uid = source.user_id(device_id)?;
        info!("reconnected, polling devices of user {uid}");
        self.source = source;
        self.uid = uid;
        Ok(())
    }

    pub fn reconfigure(&mut self, config: &Config) {
        for hook in &mut self.hooks {
            hook.reconfigure(config);
        }
    }

    /// One poll. Failures are logged and reported as `None`, the next tick
    /// simply tries again.
    pub fn poll(&mut self) -> Option<Vec<DeviceData>> {
        let devices = match self.source.devices(&self.uid) {
            Ok(devices) => devices,
            Err(err) => {
                self.report_error(&err.to_string());
                return None;
            }
        };

        let time = devices.first().map(|d| d.time).unwrap_or_else(Utc::now);
        info!("{} data received ({} devices)", time, devices.len());

        for hook in &mut self.hooks {
            if let Err(err) = hook.apply(&devices) {
                error!("hook {} failed: {err}", hook.name());
            }
        }
        Some(devices)
    }

    fn report_error(&self, message: &str) {
        error!("poll failed: {message}");
        let Some(path) = &self.error_log else {
            return;
        };
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{} {}", Utc::now().to_rfc3339(), message));
        if let Err(err) = written {
            warn!("cannot write error log {:?}: {err}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tuyaapi::{ApiResponse, DeviceStatus, TuyaError};

    struct FakeSource {
        uid: Option<&'static str>,
        fail_polls: bool,
    }

    fn rejected() -> TuyaError {
        let raw = serde_json::json!({"success": false, "code": 1010, "msg": "token invalid"});
        TuyaError::Api(ApiResponse::from_json(raw, 200).unwrap())
    }

    impl DeviceSource for FakeSource {
        fn user_id(&self, _device_id: &str) -> tuyaapi::Result<String> {
            self.uid.map(ToString::to_string).ok_or_else(rejected)
        }

        fn devices(&self, uid: &str) -> tuyaapi::Result<Vec<DeviceData>> {
            if self.fail_polls {
                return Err(rejected());
            }
            Ok(vec![DeviceData {
                id: format!("{uid}-plug"),
                name: "Plug".to_string(),
                status: vec![DeviceStatus::new("cur_power", 5)],
                time: Utc::now(),
            }])
        }
    }

    #[derive(Clone, Default)]
    struct RecordingHook {
        seen: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl Hook for RecordingHook {
        fn name(&self) -> &str {
            "recording"
        }

        fn apply(&mut self, devices: &[DeviceData]) -> Result<()> {
            self.seen
                .borrow_mut()
                .extend(devices.iter().map(|d| d.id.clone()));
            if self.fail {
                return Err(crate::Error::InvalidConfig("boom".to_string()));
            }
            Ok(())
        }
    }

    fn source(uid: Option<&'static str>, fail_polls: bool) -> FakeSource {
        FakeSource { uid, fail_polls }
    }

    #[test]
    fn uid_lookup_failure_is_fatal() {
        let result = Poller::connect(source(None, false), "bf01", Vec::new(), None);
        assert!(matches!(result, Err(crate::Error::Tuya(TuyaError::Api(_)))));
    }

    #[tracing_test::traced_test]
    #[test]
    fn hands_devices_to_all_hooks() {
        let failing = RecordingHook {
            fail: true,
            ..Default::default()
        };
        let recording = RecordingHook::default();
        let hooks: Vec<Box<dyn Hook>> = vec![Box::new(failing.clone()), Box::new(recording.clone())];

        let mut poller = Poller::connect(source(Some("u1"), false), "bf01", hooks, None).unwrap();
        assert_eq!(poller.uid(), "u1");

        let devices = poller.poll().expect("poll succeeds");
        assert_eq!(devices.len(), 1);
        assert_eq!(*failing.seen.borrow(), vec!["u1-plug".to_string()]);
        assert_eq!(*recording.seen.borrow(), vec!["u1-plug".to_string()]);
        assert!(logs_contain("hook recording failed"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn failed_poll_is_logged_and_skips_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let error_log = dir.path().join("error.log");
        let recording = RecordingHook::default();

        let mut poller = Poller::connect(
            source(Some("u1"), true),
            "bf01",
            vec![Box::new(recording.clone())],
            Some(error_log.clone()),
        )
        .unwrap();

        assert!(poller.poll().is_none());
        assert!(poller.poll().is_none());
        assert!(recording.seen.borrow().is_empty());

        let log = std::fs::read_to_string(error_log).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("token invalid"));
    }

    #[test]
    fn replace_source_keeps_old_on_failure() {
        let mut poller = Poller::connect(source(Some("u1"), false), "bf01", Vec::new(), None).unwrap();

        assert!(poller.replace_source(source(None, false), "bf01").is_err());
        assert_eq!(poller.uid(), "u1");
        assert!(poller.poll().is_some());

        poller.replace_source(source(Some("u2"), false), "bf01").unwrap();
        assert_eq!(poller.uid(), "u2");
        assert_eq!(poller.poll().unwrap()[0].id, "u2-plug");
    }
}
