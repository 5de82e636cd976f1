use ipcperf_common::{IpcPerfError, TIMESTAMP_LEN};

#[test]
fn test_invalid_config_display() {
    let err = IpcPerfError::InvalidConfig("rate must be greater than zero".to_string());
    assert_eq!(err.to_string(), "Invalid configuration: rate must be greater than zero");
}

#[test]
fn test_error_equality() {
    let err1 = IpcPerfError::Transport("bus closed".to_string());
    let err2 = IpcPerfError::Transport("bus closed".to_string());
    let err3 = IpcPerfError::Transport("queue gone".to_string());

    assert_eq!(err1, err2);
    assert_ne!(err1, err3);
}

#[test]
fn test_transport_error() {
    let err = IpcPerfError::Transport("delivery thread panicked".to_string());
    assert_eq!(err.to_string(), "Transport error: delivery thread panicked");
}

#[test]
fn test_session_state_errors() {
    assert_eq!(IpcPerfError::NotConnected.to_string(), "Session is not connected");
    assert_eq!(IpcPerfError::AlreadyConnected.to_string(), "Session is already connected");
    assert_eq!(IpcPerfError::WouldBlock.to_string(), "Delivery queue full, send would block");
}

#[test]
fn test_payload_too_short() {
    let err = IpcPerfError::PayloadTooShort { len: 3, min: TIMESTAMP_LEN };
    assert_eq!(err.to_string(), "Payload of 3 bytes is shorter than the 8 byte timestamp");
}
