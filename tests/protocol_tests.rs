// Push frame decoding tests

use dashsync::aggregator::Message;
use dashsync::models::ContainerState;
use dashsync::protocol::{ProtocolError, decode_frame};

#[test]
fn test_decode_system_frame() {
    let frame = r#"{
        "type": "system",
        "data": {
            "hostname": "nas",
            "os": "linux",
            "uptime": 3600,
            "cpu": {"brand": "Ryzen", "percent": 12.5, "cores": 2, "threads": 4,
                    "per_core_percent": [1.0, 2.0, 3.0, 4.0]},
            "memory": {"total": 100, "used": 40, "free": 60, "percent": 40.0},
            "network": [{"name": "eth0", "speed_up": 10.5, "speed_down": 99.0}],
            "ws_clients": 2
        }
    }"#;
    let Message::SystemSnapshot(snap) = decode_frame(frame).unwrap() else {
        panic!("expected system snapshot");
    };
    assert_eq!(snap.hostname, "nas");
    assert_eq!(snap.cpu.as_ref().unwrap().series_count(), 4);
    assert_eq!(snap.memory.as_ref().unwrap().percent, 40.0);
    assert_eq!(snap.network.as_ref().unwrap()[0].download_rate(), 99.0);
    assert_eq!(snap.ws_clients, Some(2));
}

#[test]
fn test_decode_docker_frame() {
    let frame = r#"{"type":"docker","data":[
        {"id":"0123456789abcdef","name":"web","image":"nginx","status":"Up 2 hours","state":"running","ports":"80/tcp"},
        {"id":"ff","name":"job","state":"weird"}
    ]}"#;
    let Message::DockerSnapshot(containers) = decode_frame(frame).unwrap() else {
        panic!("expected docker snapshot");
    };
    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].state, ContainerState::Running);
    assert_eq!(containers[0].short_id(), "0123456789ab");
    assert_eq!(containers[1].state, ContainerState::Unknown);
}

#[test]
fn test_decode_client_frame() {
    let frame = r#"{"type":"client","data":{"server_id":"agent-7","metrics":{"hostname":"pi"}}}"#;
    let Message::ClientPatch { server_id, metrics } = decode_frame(frame).unwrap() else {
        panic!("expected client patch");
    };
    assert_eq!(server_id, "agent-7");
    assert_eq!(metrics.hostname, "pi");
    assert!(metrics.cpu.is_none());
}

#[test]
fn test_docker_frame_with_null_or_missing_data_is_empty() {
    for frame in [r#"{"type":"docker","data":null}"#, r#"{"type":"docker"}"#] {
        let Message::DockerSnapshot(containers) = decode_frame(frame).unwrap() else {
            panic!("expected docker snapshot");
        };
        assert!(containers.is_empty());
    }
}

#[test]
fn test_non_json_frame_is_malformed() {
    let err = decode_frame("not json").unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn test_client_frame_without_server_id_is_malformed() {
    let err = decode_frame(r#"{"type":"client","data":{"metrics":{}}}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn test_unknown_frame_type() {
    let err = decode_frame(r#"{"type":"gpu","data":[]}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownType(ref t) if t == "gpu"));
}
