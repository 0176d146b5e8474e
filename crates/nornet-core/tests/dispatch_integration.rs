use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use nornet_api::{DeviceRecord, DeviceTypeRecord, PlatformRecord, Severity};
use nornet_core::*;
use nornet_exec::{DeviceConnection, Getter, TransportError};
use nornet_inventory::{Host, Inventory};

// Mock implementations
struct MockConnection {
    getters: Result<Value, TransportError>,
    command_output: Result<String, TransportError>,
    commands: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockConnection {
    fn with_getters(data: Value) -> Self {
        Self {
            getters: Ok(data),
            command_output: Ok(String::new()),
            commands: Arc::default(),
        }
    }

    fn with_output(output: &str) -> Self {
        Self {
            getters: Ok(json!({})),
            command_output: Ok(output.to_string()),
            commands: Arc::default(),
        }
    }

    fn failing(err: TransportError) -> Self {
        Self {
            getters: Err(err.clone()),
            command_output: Err(err),
            commands: Arc::default(),
        }
    }
}

#[async_trait]
impl DeviceConnection for MockConnection {
    async fn get(&self, getters: &[Getter], _retrieve: Option<&str>) -> Result<Value, TransportError> {
        let data = self.getters.clone()?;
        let mut selected = serde_json::Map::new();
        for getter in getters {
            if let Some(value) = data.get(getter.as_str()) {
                selected.insert(getter.as_str().to_string(), value.clone());
            }
        }
        Ok(Value::Object(selected))
    }

    async fn send_command(&self, command: &str) -> Result<String, TransportError> {
        self.commands.lock().unwrap().push(command.to_string());
        self.command_output.clone()
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn transport_type(&self) -> &'static str {
        "mock"
    }
}

fn host(name: &str, platform: &str) -> Host {
    let record = DeviceRecord::new(1, name, DeviceTypeRecord::new("c9300", "cisco"), "lon1", "access")
        .with_platform(PlatformRecord::new(platform, platform));
    Host::new(Arc::new(record), "10.0.0.5", platform)
}

fn dispatcher(overrides: &[(&str, &str)]) -> Dispatcher {
    let registry = Arc::new(DriverRegistry::builtin().unwrap());
    let mapping = DriverMapping::builtin().with_overrides(overrides.iter().copied());
    Dispatcher::new(registry, Arc::new(mapping))
}

fn logger() -> (RunLogger, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let logger = RunLogger::new("nornet-test")
        .with_sink(sink.clone())
        .with_debug(true);
    (logger, sink)
}

#[tokio::test]
async fn test_generic_get_config() {
    let (logger, _sink) = logger();
    let host = host("SW1", "cisco_ios");
    let connection = MockConnection::with_getters(json!({
        "config": {"running": "hostname SW1\n", "startup": ""}
    }));

    let result = dispatcher(&[])
        .dispatch(&host, &connection, "get_config", &logger, &"SW1")
        .await
        .unwrap();

    assert_eq!(result.host, "SW1");
    assert_eq!(result.get("config"), Some(&json!("hostname SW1\n")));
    assert!(!result.failed());
}

#[tokio::test]
async fn test_unknown_platform_uses_default_driver() {
    let (logger, _sink) = logger();
    let host = host("R1", "mikrotik_routeros");
    let connection = MockConnection::with_getters(json!({"facts": {"vendor": "MikroTik"}}));

    let result = dispatcher(&[])
        .dispatch(&host, &connection, "get_facts", &logger, &"R1")
        .await
        .unwrap();

    assert_eq!(result.get("facts"), Some(&json!({"vendor": "MikroTik"})));
}

#[tokio::test]
async fn test_environment_payload_key() {
    let (logger, _sink) = logger();
    let host = host("SW1", "arista_eos");
    let connection = MockConnection::with_getters(json!({
        "facts": {"vendor": "Arista"},
        "environment": {"cpu": {"0": {"%usage": 4.0}}}
    }));

    let result = dispatcher(&[])
        .dispatch(&host, &connection, "get_environment", &logger, &"SW1")
        .await
        .unwrap();

    assert_eq!(result.result.len(), 1);
    assert_eq!(
        result.get("environment"),
        Some(&json!({"cpu": {"0": {"%usage": 4.0}}}))
    );
}

#[tokio::test]
async fn test_interfaces_merge() {
    let (logger, _sink) = logger();
    let host = host("SW1", "cisco_nxos");
    let connection = MockConnection::with_getters(json!({
        "interfaces": {"Eth1/1": {"is_up": true}, "Eth1/2": {"is_up": false}},
        "interfaces_ip": {"Eth1/1": {"ipv4": {"10.1.1.1": {"prefix_length": 31}}}}
    }));

    let result = dispatcher(&[])
        .dispatch(&host, &connection, "get_interfaces", &logger, &"SW1")
        .await
        .unwrap();

    assert_eq!(
        result.get("interfaces"),
        Some(&json!({
            "Eth1/1": {"is_up": true, "ipv4": {"10.1.1.1": {"prefix_length": 31}}},
            "Eth1/2": {"is_up": false}
        }))
    );
}

#[tokio::test]
async fn test_command_driver_uses_platform_command() {
    let (logger, _sink) = logger();
    let host = host("WLC1", "cisco_wlc");
    let connection = MockConnection::with_output("config sysname WLC1");
    let commands = Arc::clone(&connection.commands);

    let result = dispatcher(&[])
        .dispatch(&host, &connection, "get_configuration", &logger, &"WLC1")
        .await
        .unwrap();

    assert_eq!(result.get("config"), Some(&json!("config sysname WLC1")));
    assert_eq!(*commands.lock().unwrap(), vec!["show running-config"]);
}

#[tokio::test]
async fn test_invalid_input_is_transport_failure() {
    let (logger, sink) = logger();
    let host = host("FW1", "cisco_asa");
    let connection =
        MockConnection::with_output("show run\n      ^\nERROR: % Invalid input detected at '^' marker.");

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_config", &logger, &"FW1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(
        err.to_string(),
        "Subtask failed: Discovered `ERROR: % Invalid input detected at` in the output"
    );

    let failures: Vec<String> = sink
        .entries()
        .into_iter()
        .filter(|e| e.severity == Severity::Failure)
        .map(|e| e.message)
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(failures[1].starts_with("Subtask failed: "));
}

#[tokio::test]
async fn test_authentication_failure_classified() {
    let (logger, sink) = logger();
    let host = host("FW1", "cisco_asa");
    let connection =
        MockConnection::failing(TransportError::AuthenticationFailed("bad password".to_string()));

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_config", &logger, &"FW1")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::SubtaskFailed(ref s) if s.starts_with("Failed with an authentication issue")));
    let entries = sink.entries();
    assert!(entries.iter().all(|e| e.grouping == "FW1"));
    assert!(entries
        .iter()
        .any(|e| e.severity == Severity::Debug && e.message.contains("bad password")));
}

#[tokio::test]
async fn test_timeout_classified() {
    let (logger, _sink) = logger();
    let host = host("NS1", "netscaler");
    let connection = MockConnection::failing(TransportError::Timeout {
        timeout: Duration::from_secs(30),
    });

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_config", &logger, &"NS1")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Failed with a timeout issue."));
}

#[tokio::test]
async fn test_getter_subtask_summary_is_last_line() {
    let (logger, sink) = logger();
    let host = host("SW1", "juniper_junos");
    let connection = MockConnection::failing(TransportError::Subtask {
        detail: "Traceback (most recent call last):\n  File \"junos.py\"\nConnectRefusedError: 10.0.0.5".to_string(),
    });

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_facts", &logger, &"SW1")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Subtask failed: `get_facts` method failed with an unexpected issue: `ConnectRefusedError: 10.0.0.5`"
    );
    let debug_lines = sink
        .entries()
        .iter()
        .filter(|e| e.severity == Severity::Debug && e.message.starts_with("Traceback"))
        .count();
    assert!(debug_lines >= 1);
}

#[tokio::test]
async fn test_command_driver_facts_not_implemented() {
    let (logger, _sink) = logger();
    let host = host("WLC1", "cisco_aireos");
    let connection = MockConnection::with_output("");

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_facts", &logger, &"WLC1")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotImplemented { .. }));
    assert_eq!(err.kind(), ErrorKind::DriverResolution);
}

#[tokio::test]
async fn test_unknown_operation() {
    let (logger, sink) = logger();
    let host = host("SW1", "cisco_ios");
    let connection = MockConnection::with_getters(json!({}));

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_bgp_neighbors", &logger, &"SW1")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::MethodNotFound { ref method, ref driver }
        if method == "get_bgp_neighbors" && driver == "generic"));
    assert!(sink.entries().iter().any(|e| e.severity == Severity::Failure));
}

#[tokio::test]
async fn test_no_driver_and_no_default() {
    let (logger, sink) = logger();
    let host = host("SW1", "cisco_ios");
    let connection = MockConnection::with_getters(json!({}));
    let dispatcher = Dispatcher::new(
        Arc::new(DriverRegistry::builtin().unwrap()),
        Arc::new(DriverMapping::empty()),
    );

    let err = dispatcher
        .dispatch(&host, &connection, "get_config", &logger, &"SW1")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::DriverNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::DriverResolution);
    let failure = sink
        .entries()
        .into_iter()
        .find(|e| e.severity == Severity::Failure)
        .unwrap();
    assert_eq!(
        failure.message,
        "unable to find the driver for get_config for platform: cisco_ios, preemptively failed"
    );
    assert_eq!(failure.subject.as_deref(), Some("SW1"));
}

#[tokio::test]
async fn test_unregistered_driver_in_mapping() {
    let (logger, _sink) = logger();
    let host = host("SW1", "cisco_ios");
    let connection = MockConnection::with_getters(json!({}));

    let err = dispatcher(&[("cisco_ios", "vendor_magic")])
        .dispatch(&host, &connection, "get_config", &logger, &"SW1")
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::DriverUnresolvable(ref id) if id == "vendor_magic"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_validated_rejects_bad_mapping() {
    let registry = Arc::new(DriverRegistry::builtin().unwrap());
    let mapping = Arc::new(DriverMapping::builtin().with_overrides([("cisco_ios", "nope")]));
    assert!(Dispatcher::validated(registry, mapping).is_err());
}

#[tokio::test]
async fn test_mapping_override_switches_driver() {
    let (logger, _sink) = logger();
    let host = host("SW1", "cisco_ios");
    let connection = MockConnection::with_output("hostname SW1");

    let result = dispatcher(&[("cisco_ios", "command")])
        .dispatch(&host, &connection, "get_config", &logger, &"SW1")
        .await
        .unwrap();

    assert_eq!(result.get("config"), Some(&json!("hostname SW1")));
}

#[tokio::test]
async fn test_api_driver_requires_key() {
    let (logger, _sink) = logger();
    let host = host("FW1", "paloalto_panos");
    let connection = MockConnection::with_getters(json!({}));

    let err = dispatcher(&[])
        .dispatch(&host, &connection, "get_config", &logger, &"FW1")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Subtask failed: host FW1 has no key");
}

// Runner

struct TestConnectionFactory {
    connects: AtomicUsize,
}

#[async_trait]
impl ConnectionFactory for TestConnectionFactory {
    async fn connect(&self, host: &Host) -> Result<Box<dyn DeviceConnection>, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match host.name() {
            "DOWN1" => Err(TransportError::ConnectionFailed("no route to host".to_string())),
            "BAD1" => Ok(Box::new(MockConnection::with_output(
                "ERROR: % Invalid input detected at '^' marker.",
            ))),
            _ => Ok(Box::new(MockConnection::with_output(&format!(
                "hostname {}",
                host.name()
            )))),
        }
    }
}

#[tokio::test]
async fn test_runner_continues_after_failures() {
    let (logger, _sink) = logger();
    let inventory = Inventory::from_hosts(vec![
        host("SW1", "cisco_asa"),
        host("DOWN1", "cisco_asa"),
        host("BAD1", "cisco_asa"),
        host("SW2", "cisco_asa"),
    ]);
    let factory = Arc::new(TestConnectionFactory {
        connects: AtomicUsize::new(0),
    });

    let runner = Runner::new(Arc::new(dispatcher(&[]))).with_num_workers(2);
    let summary = runner
        .run(&inventory, "get_config", factory.clone(), &logger)
        .await;

    assert_eq!(factory.connects.load(Ordering::SeqCst), 4);
    assert_eq!(summary.len(), 4);
    assert_eq!(
        summary.results().keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["SW1", "DOWN1", "BAD1", "SW2"]
    );

    let succeeded: Vec<&str> = summary.succeeded().map(|r| r.host.as_str()).collect();
    assert_eq!(succeeded, vec!["SW1", "SW2"]);

    let failed: Vec<&str> = summary.failed().map(|(host, _)| host).collect();
    assert_eq!(failed, vec!["DOWN1", "BAD1"]);
    assert!(matches!(summary.get("DOWN1"), Some(Err(CoreError::Transport(_)))));
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_runner_empty_inventory() {
    let (logger, _sink) = logger();
    let factory = Arc::new(TestConnectionFactory {
        connects: AtomicUsize::new(0),
    });

    let summary = Runner::new(Arc::new(dispatcher(&[])))
        .run(&Inventory::default(), "get_config", factory, &logger)
        .await;

    assert!(summary.is_empty());
    assert!(summary.is_success());
}
