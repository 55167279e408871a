use nodectl::{
    BackendError, NodeControlError, RpcParams, Severity, TransportFault,
    rpc::{NetworkInit, UpdateBinaries},
};
use nodectl_testkit::{Fake, mock::BackendCall};
use serde_json::{Map, Value, json};

fn params_of(body: &Value) -> &Value {
    &body["params"]
}

#[test]
fn ls_backups_returns_the_result_sequence() {
    let node = Fake::node(4)
        .with_runner_response(json!({"jsonrpc": "2.0", "id": "dontcare", "result": ["b1", "b2"]}))
        .build();

    let result = node.control().runner_ls_backups().unwrap();

    assert_eq!(result, Some(json!(["b1", "b2"])));
    assert_eq!(
        node.runner_bodies(),
        [json!({"method": "ls_backups", "params": [], "id": "dontcare", "jsonrpc": "2.0"})]
    );
}

#[test]
fn rejected_call_is_fatal_and_names_method_and_node() {
    let node = Fake::node(4)
        .with_runner_response(json!({"error": "no backups configured"}))
        .build();

    let err = node.control().runner_ls_backups().unwrap_err();

    assert_eq!(err.severity(), Severity::Fatal);
    let msg = err.to_string();
    assert!(msg.contains("ls_backups"), "{msg}");
    assert!(msg.contains("node4"), "{msg}");
    assert!(msg.contains("no backups configured"), "{msg}");

    match err {
        NodeControlError::RpcRejected { response, .. } => {
            assert_eq!(response, json!({"error": "no backups configured"}));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn non_object_response_is_rejected() {
    let node = Fake::node(6)
        .with_runner_response(json!("internal server error"))
        .build();

    let err = node.control().runner_ls_backups().unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err,
        NodeControlError::RpcRejected { ref method, ref response, .. }
            if method == "ls_backups" && *response == json!("internal server error")
    ));
}

#[test]
fn null_error_and_missing_result_are_success() {
    let node = Fake::node(0)
        .with_runner_response(json!({"error": null, "result": {"ok": true}}))
        .with_runner_response(json!({"id": "dontcare"}))
        .build();
    let control = node.control();

    assert_eq!(control.runner_ready().unwrap(), Some(json!({"ok": true})));
    assert_eq!(control.runner_ready().unwrap(), None);
}

#[test]
fn unchecked_call_returns_error_responses_verbatim() {
    let response = json!({"error": {"code": -32601, "message": "Method not found"}});
    let node = Fake::node(0).with_runner_response(response.clone()).build();

    let raw = node.control().runner_version().unwrap();

    assert_eq!(raw, response);
    assert_eq!(node.runner_bodies()[0]["method"], "version");
}

#[test]
fn transport_faults_propagate_from_rpc_calls() {
    let node = Fake::node(0)
        .with_runner_failure(BackendError::transport(
            TransportFault::ConnectionRefused,
            "runner down",
        ))
        .build();

    let err = node.control().runner_stop().unwrap_err();

    assert!(matches!(
        err,
        NodeControlError::Backend(BackendError::Transport { .. })
    ));
    assert!(!err.is_fatal());
}

#[test]
fn explicit_params_are_forwarded_verbatim() {
    let node = Fake::node(0).build();
    let control = node.control();

    control
        .call_checked("custom", Some(RpcParams::from(vec![json!(1), json!("a")])))
        .unwrap();
    control.call_unchecked("custom", None).unwrap();

    let bodies = node.runner_bodies();
    assert_eq!(params_of(&bodies[0]), &json!([1, "a"]));
    assert_eq!(params_of(&bodies[1]), &json!([]));
}

#[test]
fn call_checked_as_decodes_typed_results() {
    let node = Fake::node(0)
        .with_runner_response(json!({"result": ["b1", "b2"]}))
        .with_runner_response(json!({"result": {"unexpected": 1}}))
        .build();
    let control = node.control();

    let backups: Vec<String> = control.call_checked_as("ls_backups", None).unwrap();
    assert_eq!(backups, ["b1", "b2"]);

    let err = control
        .call_checked_as::<Vec<String>>("ls_backups", None)
        .unwrap_err();
    assert!(matches!(err, NodeControlError::Rpc(_)));
}

#[test]
fn start_sends_batch_interval_only_when_set() {
    let node = Fake::node(0).build();
    let control = node.control();

    control.runner_start(None).unwrap();
    control.runner_start(Some(250)).unwrap();

    let bodies = node.runner_bodies();
    assert_eq!(bodies[0]["method"], "start");
    assert_eq!(params_of(&bodies[0]), &json!([]));
    assert_eq!(params_of(&bodies[1]), &json!({"batch_interval_millis": 250}));
}

#[test]
fn parameterless_helpers_send_empty_params() {
    let node = Fake::node(0).build();
    let control = node.control();

    control.runner_stop().unwrap();
    control.runner_ready().unwrap();
    control.runner_ls_backups().unwrap();
    control.runner_clear_env().unwrap();

    let methods: Vec<_> = node
        .runner_bodies()
        .iter()
        .map(|body| {
            assert_eq!(params_of(body), &json!([]));
            body["method"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(methods, ["stop", "ready", "ls_backups", "clear_env"]);
}

#[test]
fn new_test_forwards_backend_params() {
    let mut params = Map::new();
    params.insert("home_dir".into(), json!("/home/ubuntu/.near"));
    params.insert("validator_id".into(), json!("node0"));
    let node = Fake::node(0).with_new_test_params(params).build();

    node.control().runner_new_test().unwrap();

    let body = &node.runner_bodies()[0];
    assert_eq!(body["method"], "new_test");
    assert_eq!(
        params_of(body),
        &json!({"home_dir": "/home/ubuntu/.near", "validator_id": "node0"})
    );
}

#[test]
fn network_init_includes_genesis_time_only_when_set() {
    let node = Fake::node(0).build();
    let control = node.control();
    let init = NetworkInit {
        validators: json!([{"account_id": "node0", "public_key": "ed25519:x", "amount": "1"}]),
        boot_nodes: "ed25519:y@10.0.0.1:24567".into(),
        state_source: "empty".into(),
        patches_path: None,
        epoch_length: 500,
        num_seats: 10,
        new_chain_id: "mocknet-test".into(),
        protocol_version: None,
        genesis_time: None,
    };

    control.runner_network_init(&init).unwrap();
    control
        .runner_network_init(&NetworkInit {
            genesis_time: Some("2030-01-01T00:00:00Z".into()),
            ..init
        })
        .unwrap();

    let bodies = node.runner_bodies();
    let first = params_of(&bodies[0]).as_object().unwrap();
    assert_eq!(first.len(), 8);
    assert!(!first.contains_key("genesis_time"));
    assert_eq!(first["patches_path"], Value::Null);
    assert_eq!(first["num_seats"], 10);
    assert_eq!(params_of(&bodies[1])["genesis_time"], "2030-01-01T00:00:00Z");
}

#[test]
fn backup_and_reset_send_explicit_nulls() {
    let node = Fake::node(0).build();
    let control = node.control();

    control.runner_make_backup("pre-upgrade", None).unwrap();
    control.runner_make_backup("b2", Some("after epoch 3")).unwrap();
    control.runner_reset(None).unwrap();
    control.runner_reset(Some("b2")).unwrap();

    let params: Vec<_> = node.runner_bodies().iter().map(|b| b["params"].clone()).collect();
    assert_eq!(
        params,
        [
            json!({"backup_id": "pre-upgrade", "description": null}),
            json!({"backup_id": "b2", "description": "after epoch 3"}),
            json!({"backup_id": null}),
            json!({"backup_id": "b2"}),
        ]
    );
}

#[test]
fn config_env_and_binaries_helpers_wrap_their_payloads() {
    let node = Fake::node(0).build();
    let control = node.control();

    control
        .runner_update_config(&json!({"state_sync_enabled": true}))
        .unwrap();
    control.runner_add_env(&json!(["RUST_LOG=debug"])).unwrap();
    control
        .runner_update_binaries(&UpdateBinaries {
            neard_binary_url: Some("https://example.com/neard".into()),
            epoch_height: None,
            binary_idx: Some(1),
        })
        .unwrap();

    let bodies = node.runner_bodies();
    assert_eq!(bodies[0]["method"], "update_config");
    assert_eq!(
        params_of(&bodies[0]),
        &json!({"key_value": {"state_sync_enabled": true}})
    );
    assert_eq!(bodies[1]["method"], "add_env");
    assert_eq!(params_of(&bodies[1]), &json!({"key_values": ["RUST_LOG=debug"]}));
    assert_eq!(bodies[2]["method"], "update_binaries");
    assert_eq!(
        params_of(&bodies[2]),
        &json!({
            "neard_binary_url": "https://example.com/neard",
            "epoch_height": null,
            "binary_idx": 1,
        })
    );
}

#[test]
fn scheduled_rpc_carries_the_schedule() {
    let node = Fake::node(0).build();
    let ctx = Fake::schedule(5);

    node.control()
        .with_schedule(Some(&ctx))
        .runner_update_binaries(&UpdateBinaries::default())
        .unwrap();

    match &node.calls()[0] {
        BackendCall::PostToRunner { schedule, body } => {
            assert_eq!(schedule.as_ref(), Some(&ctx));
            assert_eq!(body["method"], "update_binaries");
        }
        other => panic!("unexpected call: {other:?}"),
    }
}
