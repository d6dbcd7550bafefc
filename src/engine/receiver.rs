//! Telemetry and response receivers.
//!
//! Each receiver owns one [`DatagramSource`] and hands every datagram to a
//! handler. A receive timeout only re-checks the shutdown flag; any other
//! receive error ends that receiver and leaves the rest of the engine
//! running.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use super::shared::SharedState;
use crate::link::transport::DatagramSource;
use crate::protocol::response::{interpret, ResponseEvent};
use crate::telemetry::parser::apply_frame;
use crate::telemetry::watch::timestamp_now;

/// Handler invoked for each received datagram.
pub type DatagramHandler = fn(&SharedState, &[u8]);

/// Apply one telemetry frame.
///
/// Device State and Device Info are always updated. When frames have been
/// requested, one is consumed: the watch rows are printed and logged if a
/// selection is active, otherwise the raw frame is printed.
pub fn handle_telemetry(shared: &SharedState, datagram: &[u8]) {
    let frame = match std::str::from_utf8(datagram) {
        Ok(frame) => frame.trim(),
        Err(e) => {
            warn!("Dropping telemetry frame that is not UTF-8: {}", e);
            return;
        }
    };

    let last_command = shared.last_command();
    let mut device = shared.device();
    let snapshot = &mut *device;
    let applied = apply_frame(frame, &mut snapshot.state, &mut snapshot.info);
    trace!("Telemetry frame applied {} fields", applied);

    if !shared.take_frame() {
        return;
    }

    let lines: Vec<String> = {
        let mut watch = shared.watch();
        if watch.is_active() {
            let rows = watch.record(&snapshot.state, &last_command, timestamp_now());
            let format = *watch.format();
            rows.iter().map(|row| row.table_line(&format)).collect()
        } else {
            vec![frame.to_string()]
        }
    };
    drop(device);

    for line in lines {
        shared.say(&line);
    }
}

/// Interpret one command response and mark the device ready.
///
/// Returns the interpreted event, or `None` for a datagram that is not
/// UTF-8 (readiness is left unchanged).
pub fn handle_response(shared: &SharedState, datagram: &[u8]) -> Option<ResponseEvent> {
    let response = match std::str::from_utf8(datagram) {
        Ok(response) => response.trim(),
        Err(e) => {
            warn!("Dropping response that is not UTF-8: {}", e);
            return None;
        }
    };

    let last_command = shared.last_command();
    let event = interpret(response, &last_command);
    event.apply(&mut shared.device().info);
    shared.set_ready(true);

    if event == ResponseEvent::Ack {
        debug!("{} -> {}", last_command, response);
    } else {
        info!("{} -> {}", last_command, response);
    }
    Some(event)
}

fn dispatch_response(shared: &SharedState, datagram: &[u8]) {
    handle_response(shared, datagram);
}

/// Receive datagrams until shutdown or a non-timeout error.
pub async fn receive_loop(
    name: &'static str,
    mut source: Box<dyn DatagramSource>,
    shared: Arc<SharedState>,
    handler: DatagramHandler,
    buffer_size: usize,
    recv_timeout: Duration,
) {
    let mut shutdown = shared.shutdown_signal();
    let mut buf = vec![0u8; buffer_size];

    debug!("{} receiver started", name);
    while shared.is_running() {
        tokio::select! {
            result = tokio::time::timeout(recv_timeout, source.recv(&mut buf)) => match result {
                Ok(Ok(len)) => handler(&shared, &buf[..len]),
                Ok(Err(e)) => {
                    error!("{} receiver failed: {}", name, e);
                    break;
                }
                Err(_elapsed) => continue,
            },
            _ = shutdown.changed() => break,
        }
    }
    debug!("{} receiver stopped", name);
}

/// Receive loop for the telemetry channel.
pub async fn telemetry_loop(
    source: Box<dyn DatagramSource>,
    shared: Arc<SharedState>,
    buffer_size: usize,
    recv_timeout: Duration,
) {
    receive_loop("Telemetry", source, shared, handle_telemetry, buffer_size, recv_timeout).await;
}

/// Receive loop for command responses.
pub async fn response_loop(
    source: Box<dyn DatagramSource>,
    shared: Arc<SharedState>,
    buffer_size: usize,
    recv_timeout: Duration,
) {
    receive_loop("Response", source, shared, dispatch_response, buffer_size, recv_timeout).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::shared::mocks::shared_state;
    use crate::link::transport::mocks::MockSource;
    use crate::protocol::response::LEGACY_SDK_VERSION;
    use std::io;

    const SAMPLE: &str = "mid:-1;x:0;y:0;bat:88;templ:51;temph:54;";

    #[test]
    fn test_telemetry_updates_state_without_printing() {
        let (shared, console) = shared_state();
        handle_telemetry(&shared, SAMPLE.as_bytes());

        let info = shared.device_info();
        assert_eq!(info.battery_percent, 88);
        assert_eq!(info.temperature, 53);
        assert_eq!(console.contents(), "");
    }

    #[test]
    fn test_requested_frame_printed_raw() {
        let (shared, console) = shared_state();
        shared.request_frames(1);

        handle_telemetry(&shared, SAMPLE.as_bytes());
        handle_telemetry(&shared, SAMPLE.as_bytes());

        assert_eq!(console.contents(), format!("{}\n", SAMPLE));
        assert_eq!(shared.frames_remaining(), 0);
    }

    #[test]
    fn test_watch_rows_logged_with_decimal_comma() {
        let (shared, console) = shared_state();
        shared.watch().set_selection(vec!["bat".into(), "baro".into()]);
        shared.set_last_command("takeoff");
        shared.request_frames(2);

        handle_telemetry(&shared, b"bat:72;baro:-70.56;");
        handle_telemetry(&shared, b"bat:71;baro:-70.10;");

        let records = shared.watch().records().to_vec();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], "watch;time;bat;baro;LastCommand;");
        assert!(records[1].ends_with(";72;-70,56;takeoff;"), "{}", records[1]);
        assert!(records[2].ends_with(";71;-70,10;takeoff;"), "{}", records[2]);

        // Live table keeps the decimal point.
        let printed = console.contents();
        assert_eq!(printed.lines().count(), 3);
        assert!(printed.contains("-70.56"));
    }

    #[test]
    fn test_telemetry_does_not_touch_readiness() {
        let (shared, _) = shared_state();
        shared.set_ready(false);
        handle_telemetry(&shared, SAMPLE.as_bytes());
        assert!(!shared.is_ready());
    }

    #[test]
    fn test_non_utf8_telemetry_dropped() {
        let (shared, _) = shared_state();
        shared.request_frames(1);
        handle_telemetry(&shared, &[0xff, 0xfe, 0x00]);
        assert_eq!(shared.frames_remaining(), 1);
        assert!(shared.device().state.is_empty());
    }

    #[test]
    fn test_ack_sets_ready() {
        let (shared, _) = shared_state();
        shared.set_ready(false);
        shared.set_last_command("takeoff");
        assert_eq!(handle_response(&shared, b"ok"), Some(ResponseEvent::Ack));
        assert!(shared.is_ready());
    }

    #[test]
    fn test_sdk_unknown_command_maps_to_legacy_version() {
        let (shared, _) = shared_state();
        shared.set_ready(false);
        shared.set_last_command("sdk?");
        handle_response(&shared, b"unknown command\r\n");
        assert_eq!(shared.device_info().protocol_version, LEGACY_SDK_VERSION);
        assert!(shared.is_ready());
    }

    #[test]
    fn test_battery_response_updates_info() {
        let (shared, _) = shared_state();
        shared.set_last_command("battery?");
        handle_response(&shared, b"67");
        assert_eq!(shared.device_info().battery_percent, 67);
    }

    #[test]
    fn test_non_utf8_response_is_noop() {
        let (shared, _) = shared_state();
        shared.set_ready(false);
        assert_eq!(handle_response(&shared, &[0xc3, 0x28]), None);
        assert!(!shared.is_ready());
    }

    #[tokio::test]
    async fn test_receive_loop_handles_then_stops_on_error() {
        let (shared, _) = shared_state();
        shared.set_last_command("wifi?");
        let source = MockSource::new(vec![
            Ok(b"90".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);

        response_loop(Box::new(source), shared.clone(), 64, Duration::from_millis(100)).await;

        assert_eq!(shared.device_info().link_quality, 90);
        // Only the receiver ended.
        assert!(shared.is_running());
    }

    #[tokio::test]
    async fn test_receive_loop_survives_timeouts_until_shutdown() {
        let (shared, _) = shared_state();
        let source = MockSource::new(Vec::new());
        let handle = tokio::spawn(telemetry_loop(
            Box::new(source),
            shared.clone(),
            64,
            Duration::from_millis(10),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        shared.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("receiver did not stop")
            .unwrap();
    }
}
