//! 夹爪驱动集成测试
//!
//! 通过 `MockSerialAdapter` 的应答器模拟设备：收到命令帧后排入对应的状态帧，
//! 验证读线程、状态同步和命令控制的端到端行为。

use ieg76_driver::protocol::{StatusFlags, encode_status};
use ieg76_driver::serial::MockSerialAdapter;
use ieg76_driver::{ControllerConfig, Gripper, GripperConfig, ReaderConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// 夹爪闭合时遇到的情况
#[derive(Clone, Copy)]
enum Jaws {
    /// 没有物体，完全闭合
    Empty,
    /// 有物体，夹持住
    Object,
    /// 不响应运动命令
    Stuck,
}

fn flags(open: bool, closed: bool, holding: bool) -> StatusFlags {
    StatusFlags {
        idle: true,
        open,
        closed,
        holding,
        ..Default::default()
    }
}

/// 模拟设备：张开命令回 open=1，闭合命令按 `jaws` 回 closed=1 或 holding=1
fn simulated_device(jaws: Jaws) -> MockSerialAdapter {
    let mock = MockSerialAdapter::new("sim0");
    mock.set_responder(move |frame| {
        let reply = match (frame, jaws) {
            (_, Jaws::Stuck) => return Vec::new(),
            (b"PDOUT=[02,00]\n", _) => flags(true, false, false),
            (b"PDOUT=[03,00]\n", Jaws::Empty) => flags(false, true, false),
            (b"PDOUT=[03,00]\n", Jaws::Object) => flags(false, false, true),
            _ => return Vec::new(),
        };
        vec![encode_status(0x0200, reply).to_vec()]
    });
    mock
}

fn config(motion_timeout_ms: u64) -> GripperConfig {
    GripperConfig {
        controller: ControllerConfig {
            motion_timeout_ms,
            settle_delay_ms: 1,
        },
        reader: ReaderConfig::default(),
        initialize: false,
        ..Default::default()
    }
}

/// 推入一帧并等待读线程写入状态
fn feed(mock: &MockSerialAdapter, gripper: &Gripper, flags: StatusFlags) {
    let before = gripper.metrics().frames_decoded;
    mock.push_inbound(encode_status(0x0100, flags).to_vec());

    let deadline = Instant::now() + Duration::from_secs(2);
    while gripper.metrics().frames_decoded <= before {
        assert!(Instant::now() < deadline, "reader did not apply the frame");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_open_round_trip() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock.clone(), config(2000)).unwrap();

    let result = gripper.open_jaws();
    assert!(result.success, "{}", result);
    assert_eq!(result.message, "Jaws opened.");
    assert!(gripper.status().open);
    assert_eq!(mock.written(), vec![b"PDOUT=[02,00]\n".to_vec()]);
}

#[test]
fn test_close_round_trip() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock, config(2000)).unwrap();

    let result = gripper.close_jaws();
    assert!(result.success, "{}", result);
    assert_eq!(result.message, "Jaws completely closed.");
}

#[test]
fn test_grasp_round_trip() {
    let mock = simulated_device(Jaws::Object);
    let gripper = Gripper::new(mock, config(2000)).unwrap();

    let result = gripper.grasp_object();
    assert!(result.success, "{}", result);
    assert_eq!(result.message, "Grasped an object.");
    assert!(gripper.status().holding);
}

#[test]
fn test_already_open_does_not_touch_serial() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock.clone(), config(2000)).unwrap();
    feed(&mock, &gripper, flags(true, false, false));

    let result = gripper.open_jaws();
    assert!(result.success);
    assert_eq!(result.message, "The jaws are already opened.");
    assert_eq!(mock.write_count(), 0);
}

#[test]
fn test_default_timeout_window() {
    let mock = simulated_device(Jaws::Stuck);
    let gripper = Gripper::new(
        mock,
        GripperConfig {
            initialize: false,
            ..Default::default()
        },
    )
    .unwrap();

    let start = Instant::now();
    let result = gripper.open_jaws();
    let elapsed = start.elapsed();

    assert!(!result.success);
    assert_eq!(result.message, "Timed out while trying to open the jaws.");
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_close_blocked_by_object() {
    // 设备已夹持物体，闭合命令无法让 closed 置位
    let mock = simulated_device(Jaws::Stuck);
    let gripper = Gripper::new(mock.clone(), config(100)).unwrap();
    feed(&mock, &gripper, flags(false, false, true));

    let result = gripper.close_jaws();
    assert!(!result.success);
    assert!(result.message.contains("blocked by object"));
}

#[test]
fn test_grasp_nothing_to_grasp() {
    // 夹爪完全闭合却没有夹持，抓取超时后提示没有物体
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock, config(100)).unwrap();

    let result = gripper.grasp_object();
    assert!(!result.success);
    assert!(result.message.starts_with("Timed out while trying to grasp an object."));
    assert!(result.message.contains("Nothing to grasp"));
}

#[test]
fn test_stale_signal_does_not_fake_success() {
    let mock = simulated_device(Jaws::Stuck);
    let gripper = Gripper::new(mock.clone(), config(100)).unwrap();

    // 一次无人等待的 0→1→0 跳变会留下置位的 Opened 信号
    feed(&mock, &gripper, flags(true, false, false));
    feed(&mock, &gripper, flags(false, false, false));

    let result = gripper.open_jaws();
    assert!(!result.success, "stale signal produced {}", result);
}

#[test]
fn test_write_failure_short_circuits() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock.clone(), config(2000)).unwrap();
    mock.set_fail_writes(true);

    let start = Instant::now();
    let result = gripper.open_jaws();
    assert!(!result.success);
    assert!(result.message.contains("Error writing to the serial port"));
    assert!(start.elapsed() < Duration::from_millis(500));
    assert!(gripper.reference().is_err());
}

#[test]
fn test_reference_does_not_wait() {
    let mock = simulated_device(Jaws::Stuck);
    let gripper = Gripper::new(mock.clone(), config(2000)).unwrap();

    let start = Instant::now();
    gripper.reference().unwrap();
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(mock.written(), vec![b"PDOUT=[07,00]\n".to_vec()]);
}

#[test]
fn test_initialize_sequence() {
    let mock = MockSerialAdapter::new("sim0");
    let gripper = Gripper::new(
        mock.clone(),
        GripperConfig {
            controller: ControllerConfig {
                settle_delay_ms: 20,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(
        mock.written(),
        vec![b"ID=?\n".to_vec(), b"PDOUT=[03,00]\n".to_vec(), b"OPERATE()\n".to_vec()]
    );
    assert!(gripper.is_healthy());
}

#[test]
fn test_initialize_failure_is_not_fatal() {
    let mock = simulated_device(Jaws::Empty);
    mock.set_fail_writes(true);
    let gripper = Gripper::new(
        mock.clone(),
        GripperConfig {
            initialize: true,
            ..config(2000)
        },
    )
    .unwrap();

    mock.set_fail_writes(false);
    assert!(gripper.open_jaws().success);
}

#[test]
fn test_close_port_idempotent() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock.clone(), config(2000)).unwrap();

    let first = gripper.close_port();
    assert!(first.success);
    assert_eq!(first.message, "Closed the serial port sim0");
    assert!(mock.is_closed());

    let second = gripper.close_port();
    assert!(second.success);
    assert_eq!(second.message, "The serial port sim0 is already closed");

    // 关闭后读线程仍在运行，命令以失败结果返回
    assert!(gripper.is_healthy());
    assert!(!gripper.open_jaws().success);
}

#[test]
fn test_reader_discards_partial_reads() {
    let mock = simulated_device(Jaws::Stuck);
    let gripper = Gripper::new(mock.clone(), config(100)).unwrap();

    let frame = encode_status(0x0300, flags(true, false, false));
    mock.push_inbound(frame[..10].to_vec());
    mock.push_inbound(frame[10..].to_vec());
    feed(&mock, &gripper, flags(false, true, false));

    let metrics = gripper.metrics();
    assert_eq!(metrics.reads_discarded, 2);
    assert_eq!(metrics.frames_decoded, 1);

    // 被丢弃的半帧不会改变状态
    let status = gripper.status();
    assert!(status.closed && !status.open);
}

#[test]
fn test_reader_survives_io_errors() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(
        mock.clone(),
        GripperConfig {
            reader: ReaderConfig {
                poll_interval_ms: 1,
                error_backoff_ms: 5,
            },
            ..config(2000)
        },
    )
    .unwrap();

    mock.set_fail_reads(true);
    std::thread::sleep(Duration::from_millis(50));
    assert!(gripper.metrics().io_errors > 0);
    assert!(gripper.is_healthy());

    mock.set_fail_reads(false);
    assert!(gripper.open_jaws().success);
}

#[test]
fn test_drop_releases_port() {
    let mock = simulated_device(Jaws::Empty);
    let gripper = Gripper::new(mock.clone(), config(2000)).unwrap();

    let start = Instant::now();
    drop(gripper);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(mock.is_closed());
}

/// 带运动过程的模拟设备：每条命令先回一帧运动中（open/closed/holding 均为 0），
/// 再回目标状态帧。所有发出的状态帧都记录在 `log` 中。
fn moving_device(
    object_present: Arc<AtomicBool>,
    log: Arc<Mutex<Vec<StatusFlags>>>,
) -> MockSerialAdapter {
    let mock = MockSerialAdapter::new("sim1");
    let mut position = 0u16;
    mock.set_responder(move |frame| {
        let target = match frame {
            b"PDOUT=[07,00]\n" => flags(false, false, false),
            b"PDOUT=[02,00]\n" => flags(true, false, false),
            b"PDOUT=[03,00]\n" if object_present.load(Ordering::Acquire) => {
                flags(false, false, true)
            },
            b"PDOUT=[03,00]\n" => flags(false, true, false),
            _ => return Vec::new(),
        };
        let moving = StatusFlags::default();

        let mut replies = Vec::new();
        for status in [moving, target] {
            position = position.wrapping_add(0x40);
            log.lock().push(status);
            replies.push(encode_status(position, status).to_vec());
        }
        replies
    });
    mock
}

#[test]
fn test_open_and_closed_never_reported_together() {
    let object_present = Arc::new(AtomicBool::new(false));
    let log = Arc::new(Mutex::new(Vec::new()));
    let mock = moving_device(object_present.clone(), log.clone());
    let gripper = Gripper::new(mock, config(2000)).unwrap();

    // 命令执行期间持续采样状态快照
    let stop = Arc::new(AtomicBool::new(false));
    let sampler = {
        let controller = gripper.controller().clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut samples = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let status = controller.status();
                assert!(!(status.open && status.closed), "snapshot: {:?}", status);
                samples += 1;
                thread::yield_now();
            }
            samples
        })
    };

    gripper.reference().unwrap();
    assert!(gripper.open_jaws().success);
    assert!(gripper.close_jaws().success);
    assert!(gripper.open_jaws().success);

    object_present.store(true, Ordering::Release);
    assert!(gripper.grasp_object().success);
    assert!(gripper.open_jaws().success);

    object_present.store(false, Ordering::Release);
    assert!(gripper.close_jaws().success);

    // 等读线程把设备发出的每一帧都写入状态
    let emitted = log.lock().len() as u64;
    let deadline = Instant::now() + Duration::from_secs(2);
    while gripper.metrics().frames_decoded < emitted {
        assert!(Instant::now() < deadline, "reader did not apply every frame");
        thread::sleep(Duration::from_millis(1));
    }

    stop.store(true, Ordering::Relaxed);
    assert!(sampler.join().unwrap() > 0);

    let log = log.lock();
    assert_eq!(log.len(), 14);
    for status in log.iter() {
        assert!(!(status.open && status.closed), "device emitted {:?}", status);
    }
    assert_eq!(gripper.metrics().frames_decoded, 14);
    assert_eq!(gripper.metrics().decode_errors, 0);
}

#[test]
fn test_edge_after_frame_burst_wakes_command() {
    const BURST: usize = 2000;

    let mock = MockSerialAdapter::new("sim2");
    mock.set_responder(|frame| {
        if frame != b"PDOUT=[02,00]\n" {
            return Vec::new();
        }
        // 大量不含 open 的帧之后才出现 open=1
        let mut replies: Vec<Vec<u8>> = (0..BURST)
            .map(|i| {
                let status = if i % 2 == 0 {
                    flags(false, true, false)
                } else {
                    flags(false, false, false)
                };
                encode_status(i as u16, status).to_vec()
            })
            .collect();
        replies.push(encode_status(0xFFFF, flags(true, false, false)).to_vec());
        replies
    });
    let gripper = Gripper::new(mock.clone(), config(3000)).unwrap();

    // 命令等待期间另有线程持续推入帧，与命令方争用串口锁
    let stop = Arc::new(AtomicBool::new(false));
    let feeder = {
        let mock = mock.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                mock.push_inbound(encode_status(0x0001, flags(false, false, false)).to_vec());
                thread::sleep(Duration::from_micros(200));
            }
        })
    };

    let start = Instant::now();
    let result = gripper.open_jaws();
    let elapsed = start.elapsed();
    stop.store(true, Ordering::Relaxed);
    feeder.join().unwrap();

    assert!(result.success, "{}", result);
    assert_eq!(result.message, "Jaws opened.");
    assert!(elapsed < Duration::from_millis(1500), "took {:?}", elapsed);

    let metrics = gripper.metrics();
    assert!(metrics.frames_decoded > BURST as u64);
    assert_eq!(metrics.reads_discarded, 0);
    assert_eq!(metrics.decode_errors, 0);
}
