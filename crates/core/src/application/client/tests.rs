//! Client tests against the scripted process runner

use super::*;
use crate::domain::DeviceState;
use crate::port::id_provider::mocks::SequentialIdProvider;
use crate::port::process_runner::mocks::{MockProcessRunner, MockReply, RecordedCall};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

fn scratch_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

fn client_with(runner: &Arc<MockProcessRunner>, config: AdbConfig) -> AdbClient {
    AdbClient::new(
        config,
        runner.clone(),
        Arc::new(SequentialIdProvider::new("test")),
    )
    .unwrap()
}

fn client(runner: &Arc<MockProcessRunner>) -> AdbClient {
    client_with(runner, AdbConfig::new("adb"))
}

fn write_apk(dir: &Path) -> PathBuf {
    let path = dir.join("app-release.apk");
    std::fs::write(&path, b"PK\x03\x04fake apk").unwrap();
    path
}

async fn wait_for_call(runner: &MockProcessRunner, predicate: impl Fn(&RecordedCall) -> bool) -> RecordedCall {
    for _ in 0..100 {
        if let Some(call) = runner.calls().into_iter().find(|c| predicate(c)) {
            return call;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected call was never recorded: {:?}", runner.calls());
}

fn staging_leftovers(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(STAGING_PREFIX))
        })
        .collect()
}

#[test]
fn test_new_rejects_missing_tool_path() {
    let result = AdbClient::new(
        AdbConfig::new(""),
        Arc::new(MockProcessRunner::new()),
        Arc::new(SequentialIdProvider::new("test")),
    );

    assert!(matches!(result, Err(BridgeError::Config(_))));
}

#[tokio::test]
async fn test_version_trims_and_uses_no_serial() {
    let runner = Arc::new(MockProcessRunner::new().on(
        &["version"],
        "Android Debug Bridge version 1.0.41\nVersion 35.0.1-11580240\n\n",
    ));

    let version = assert_ok!(client(&runner).version(&CallContext::background()).await);

    assert_eq!(version, "Android Debug Bridge version 1.0.41\nVersion 35.0.1-11580240");
    let calls = runner.calls();
    assert_eq!(calls[0].serial, "");
    assert_eq!(calls[0].args, vec!["version"]);
}

#[tokio::test]
async fn test_devices_end_to_end_sample() {
    let runner = Arc::new(MockProcessRunner::new().on(
        &["devices", "-l"],
        "List of devices attached\n1234 device model:Pixel_7a\n5678 unauthorized\n",
    ));

    let devices = client(&runner).devices(&CallContext::background()).await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].serial, "1234");
    assert_eq!(devices[0].state, DeviceState::Device);
    assert_eq!(devices[0].model.as_deref(), Some("Pixel_7a"));
    assert!(devices[0].is_authorized);
    assert_eq!(devices[1].serial, "5678");
    assert_eq!(devices[1].state, DeviceState::Unauthorized);
    assert_eq!(devices[1].model, None);
    assert!(!devices[1].is_authorized);
    assert_eq!(runner.calls()[0].serial, "");
}

#[tokio::test]
async fn test_devices_nonzero_exit_is_error() {
    let runner = Arc::new(MockProcessRunner::new().reply(
        &["devices"],
        MockReply::Output(ProcessOutput::new(
            Some(1),
            "List of devices attached\n",
            "adb: cannot connect to daemon\n",
        )),
    ));

    let err = client(&runner)
        .devices(&CallContext::background())
        .await
        .unwrap_err();

    match err {
        BridgeError::Process { operation, exit_code, stderr, .. } => {
            assert_eq!(operation, op::DEVICES);
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr, "adb: cannot connect to daemon");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_devices_unreadable_output_is_parse_error() {
    let runner = Arc::new(MockProcessRunner::new().reply(
        &["devices"],
        MockReply::Output(ProcessOutput::ok(vec![b'L', 0xff, 0xfe, b'\n'])),
    ));

    let err = client(&runner)
        .devices(&CallContext::background())
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Parse { operation: "devices", .. }));
}

#[tokio::test]
async fn test_spawn_failure_is_reported() {
    let runner = Arc::new(MockProcessRunner::new().reply(
        &["devices"],
        MockReply::Fail(RunError::Spawn("No such file or directory".to_string())),
    ));

    let err = client(&runner)
        .devices(&CallContext::background())
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Spawn { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_packages_requires_serial() {
    let runner = Arc::new(MockProcessRunner::new());

    let err = client(&runner)
        .packages(&CallContext::background(), "", ListPackageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Precondition(_)));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_packages_end_to_end_sample() {
    let runner = Arc::new(MockProcessRunner::new().on(
        &["shell", "pm", "list", "packages"],
        "package:/data/app/x=com.example\n",
    ));

    let packages = client(&runner)
        .packages(&CallContext::background(), "1234", ListPackageOptions::default())
        .await
        .unwrap();

    assert_eq!(
        packages,
        vec![Package {
            name: "com.example".to_string(),
            apk_path: "/data/app/x".to_string(),
            is_system: false,
        }]
    );
    let call = &runner.calls()[0];
    assert_eq!(call.serial, "1234");
    assert_eq!(call.args, vec!["shell", "pm", "list", "packages", "-f", "-3"]);
}

#[tokio::test]
async fn test_packages_filter_flags() {
    let runner = Arc::new(MockProcessRunner::new());
    let options = ListPackageOptions {
        include_system: true,
        include_uninstalled: true,
    };

    client(&runner)
        .packages(&CallContext::background(), "1234", options)
        .await
        .unwrap();

    assert_eq!(
        runner.calls()[0].args,
        vec!["shell", "pm", "list", "packages", "-f", "-u", "-s"]
    );
}

#[tokio::test]
async fn test_install_missing_artifact_never_invokes_runner() {
    let runner = Arc::new(MockProcessRunner::new());

    let err = client(&runner)
        .install(
            &CallContext::background(),
            "1234",
            Path::new("/definitely/not/here/app.apk"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Precondition(_)));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_install_rejects_directory_and_empty_serial() {
    let runner = Arc::new(MockProcessRunner::new());
    let client = client(&runner);
    let dir = scratch_dir();
    let apk = write_apk(dir.path());

    let dir_err = client
        .install(&CallContext::background(), "1234", dir.path())
        .await
        .unwrap_err();
    let serial_err = client
        .install(&CallContext::background(), "  ", &apk)
        .await
        .unwrap_err();

    assert!(matches!(dir_err, BridgeError::Precondition(msg) if msg.contains("regular file")));
    assert!(matches!(serial_err, BridgeError::Precondition(msg) if msg.contains("serial")));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_install_success_flow_and_cleanup() {
    let runner = Arc::new(
        MockProcessRunner::new()
            .on(&["push"], "1 file pushed, 0 skipped.\n")
            .on(&["shell", "pm", "install"], "Success\n"),
    );
    let temp_dir = scratch_dir();
    let client = client_with(&runner, AdbConfig::new("adb").with_temp_dir(temp_dir.path()));
    let source_dir = scratch_dir();
    let apk = write_apk(source_dir.path());

    client
        .install(&CallContext::background(), "1234", &apk)
        .await
        .unwrap();

    let remote = "/data/local/tmp/adbridge-test-1.apk";
    let calls = runner.calls();
    assert_eq!(calls[0].args[0], "push");
    assert!(calls[0].args[1].ends_with("adbridge-test-1.apk"));
    assert_eq!(calls[0].args[2], remote);
    assert_eq!(calls[1].args, vec!["shell", "pm", "install", "-r", remote]);
    assert!(calls.iter().all(|c| c.serial == "1234"));

    let cleanup = wait_for_call(&runner, |c| c.args.first().map(String::as_str) == Some("shell") && c.args.get(1).map(String::as_str) == Some("rm")).await;
    assert_eq!(cleanup.args, vec!["shell", "rm", "-f", remote]);
    assert!(staging_leftovers(temp_dir.path()).is_empty());
    assert!(apk.exists(), "the caller's artifact must be left alone");
    assert!(client.locks().is_empty());
}

#[tokio::test]
async fn test_install_explicit_failure_still_cleans_up() {
    let runner = Arc::new(MockProcessRunner::new().on(
        &["shell", "pm", "install"],
        "Failure [INSTALL_FAILED_VERSION_DOWNGRADE]\n",
    ));
    let temp_dir = scratch_dir();
    let client = client_with(&runner, AdbConfig::new("adb").with_temp_dir(temp_dir.path()));
    let artifact_dir = scratch_dir();
    let apk = write_apk(artifact_dir.path());

    let err = client
        .install(&CallContext::background(), "1234", &apk)
        .await
        .unwrap_err();

    match err {
        BridgeError::Outcome { verdict, output, .. } => {
            assert_eq!(verdict, Verdict::ExplicitFailure);
            assert!(output.contains("INSTALL_FAILED_VERSION_DOWNGRADE"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    wait_for_call(&runner, |c| c.args.get(1).map(String::as_str) == Some("rm")).await;
    assert!(staging_leftovers(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_install_quiet_nonzero_exit_is_error() {
    let runner = Arc::new(MockProcessRunner::new().reply(
        &["shell", "pm", "install"],
        MockReply::Output(ProcessOutput::new(Some(255), "", "")),
    ));
    let artifact_dir = scratch_dir();
    let apk = write_apk(artifact_dir.path());

    let err = client(&runner)
        .install(&CallContext::background(), "1234", &apk)
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Process { operation: "install", exit_code: Some(255), .. }));
}

#[tokio::test]
async fn test_install_missing_success_marker_is_error() {
    let runner = Arc::new(MockProcessRunner::new().on(&["shell", "pm", "install"], ""));
    let artifact_dir = scratch_dir();
    let apk = write_apk(artifact_dir.path());

    let err = client(&runner)
        .install(&CallContext::background(), "1234", &apk)
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Outcome { verdict: Verdict::MissingMarker, .. }));
}

#[tokio::test]
async fn test_install_push_failure_reports_stderr() {
    let runner = Arc::new(MockProcessRunner::new().reply(
        &["push"],
        MockReply::Output(ProcessOutput::new(
            Some(1),
            "",
            "adb: error: failed to copy: No space left on device\n",
        )),
    ));
    let temp_dir = scratch_dir();
    let client = client_with(&runner, AdbConfig::new("adb").with_temp_dir(temp_dir.path()));
    let artifact_dir = scratch_dir();
    let apk = write_apk(artifact_dir.path());

    let err = client
        .install(&CallContext::background(), "1234", &apk)
        .await
        .unwrap_err();

    match err {
        BridgeError::Process { operation, stderr, .. } => {
            assert_eq!(operation, op::PUSH);
            assert!(stderr.contains("No space left on device"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!runner
        .calls()
        .iter()
        .any(|c| c.args.get(2).map(String::as_str) == Some("install")));
    wait_for_call(&runner, |c| c.args.get(1).map(String::as_str) == Some("rm")).await;
    assert!(staging_leftovers(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_uninstall_rejects_injection_before_invocation() {
    let runner = Arc::new(MockProcessRunner::new());

    let err = client(&runner)
        .uninstall(
            &CallContext::background(),
            "1234",
            "com.example.app; rm -rf /",
            false,
            -1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Precondition(_)));
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_uninstall_argument_shapes() {
    let runner = Arc::new(MockProcessRunner::new().on(&["shell", "pm", "uninstall"], "Success\n"));
    let client = client(&runner);
    let ctx = CallContext::background();

    client.uninstall(&ctx, "1234", "com.example", true, 0).await.unwrap();
    client.uninstall(&ctx, "1234", "com.example", false, -1).await.unwrap();
    client.uninstall(&ctx, "1234", "com.example", false, 10).await.unwrap();

    let calls = runner.calls();
    assert_eq!(
        calls[0].args,
        vec!["shell", "pm", "uninstall", "--user", "0", "-k", "com.example"]
    );
    assert_eq!(calls[1].args, vec!["shell", "pm", "uninstall", "com.example"]);
    assert_eq!(
        calls[2].args,
        vec!["shell", "pm", "uninstall", "--user", "10", "com.example"]
    );
}

#[tokio::test]
async fn test_uninstall_failure_marker_and_missing_marker() {
    let failing = Arc::new(MockProcessRunner::new().on(
        &["shell", "pm", "uninstall"],
        "Failure [DELETE_FAILED_INTERNAL_ERROR]\n",
    ));
    let silent = Arc::new(MockProcessRunner::new().reply(
        &["shell", "pm", "uninstall"],
        MockReply::Output(ProcessOutput::new(Some(0), "", "Unknown package: com.example\n")),
    ));
    let ctx = CallContext::background();

    let explicit = client(&failing)
        .uninstall(&ctx, "1234", "com.example", false, -1)
        .await
        .unwrap_err();
    let missing = client(&silent)
        .uninstall(&ctx, "1234", "com.example", false, -1)
        .await
        .unwrap_err();

    assert!(matches!(explicit, BridgeError::Outcome { verdict: Verdict::ExplicitFailure, .. }));
    match missing {
        BridgeError::Outcome { verdict, output, .. } => {
            assert_eq!(verdict, Verdict::MissingMarker);
            assert!(output.contains("Unknown package"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_mutations_on_same_serial_never_overlap() {
    let runner = Arc::new(
        MockProcessRunner::new()
            .with_delay(Duration::from_millis(40))
            .on(&["shell", "pm"], "Success\n"),
    );
    let client = Arc::new(client(&runner));
    let artifact_dir = scratch_dir();
    let apk = write_apk(artifact_dir.path());

    let mut handles = vec![];
    for i in 0..3 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client
                .uninstall(&CallContext::background(), "same", &format!("com.example.app{i}"), false, -1)
                .await
        }));
    }
    {
        let client = Arc::clone(&client);
        let apk = apk.clone();
        handles.push(tokio::spawn(async move {
            client.install(&CallContext::background(), "same", &apk).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let windows: Vec<RecordedCall> = runner
        .calls()
        .into_iter()
        .filter(|c| c.args.get(1).map(String::as_str) != Some("rm"))
        .collect();
    assert_eq!(windows.len(), 5); // 3 uninstalls + push + pm install
    for (i, a) in windows.iter().enumerate() {
        for b in &windows[i + 1..] {
            assert!(!a.overlaps(b), "overlapping calls on one serial: {a:?} {b:?}");
        }
    }
}

#[tokio::test]
async fn test_mutations_on_distinct_serials_overlap() {
    let runner = Arc::new(
        MockProcessRunner::new()
            .with_delay(Duration::from_millis(100))
            .on(&["shell", "pm", "uninstall"], "Success\n"),
    );
    let client = Arc::new(client(&runner));
    let ctx = CallContext::background();

    let (a, b) = tokio::join!(
        client.uninstall(&ctx, "serial-a", "com.example", false, -1),
        client.uninstall(&ctx, "serial-b", "com.example", false, -1),
    );
    a.unwrap();
    b.unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].overlaps(&calls[1]));
}

#[tokio::test]
async fn test_cancelled_call_stops_the_process() {
    let runner = Arc::new(MockProcessRunner::new().with_delay(Duration::from_secs(30)));
    let client = Arc::new(client(&runner));
    let ctx = CallContext::background();

    let call = {
        let client = Arc::clone(&client);
        let ctx = ctx.clone();
        tokio::spawn(async move { client.devices(&ctx).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runner.running(), 1);
    ctx.cancel();

    let err = call.await.unwrap().unwrap_err();

    assert!(matches!(err, BridgeError::Cancelled { operation: "devices", .. }));
    assert!(err.is_timeout());
    assert_eq!(runner.running(), 0);
}

#[tokio::test]
async fn test_read_timeout_bounds_the_call() {
    let runner = Arc::new(MockProcessRunner::new().with_delay(Duration::from_secs(30)));
    let client = client_with(
        &runner,
        AdbConfig::new("adb")
            .with_read_timeout(Duration::from_millis(50)),
    );

    let err = client
        .packages(&CallContext::background(), "1234", ListPackageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Timeout { operation: "packages", .. }));
    assert_eq!(runner.running(), 0);
}

#[tokio::test]
async fn test_lock_wait_is_bounded_by_call_deadline() {
    let runner = Arc::new(MockProcessRunner::new());
    let client = client_with(
        &runner,
        AdbConfig::new("adb")
            .with_read_timeout(Duration::from_millis(50)),
    );
    let _held = client.locks().acquire("1234").await;

    let err = client
        .uninstall(&CallContext::background(), "1234", "com.example", false, -1)
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::LockTimeout { .. }));
    assert_eq!(runner.call_count(), 0);
}
