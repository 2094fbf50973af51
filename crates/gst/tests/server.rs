//! Integration tests against a live server on an ephemeral port.
//!
//! Each test runs its server on a thread with a private main context and
//! exercises it with plain RTSP requests over TCP. No media is ever produced:
//! OPTIONS and unknown mounts never touch the launch description, and the
//! broken-description test relies on the framework rejecting it.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use gst::glib;
use rtsp_launch::{MountConfig, PipelineSource, ServerConfig, Validation};
use rtsp_launch_gst::{Server, ServerError, ShutdownHandle};

struct Running {
    port: u16,
    handle: ShutdownHandle,
    thread: thread::JoinHandle<()>,
}

impl Running {
    fn shutdown(self) {
        self.handle.shutdown();
        self.thread.join().expect("server thread");
    }
}

fn test_config(launch: Option<&str>) -> ServerConfig {
    let mut config = ServerConfig {
        address: "127.0.0.1".to_string(),
        port: 0,
        public_host: "127.0.0.1".to_string(),
        ..ServerConfig::default()
    };
    if let Some(launch) = launch {
        config.mounts = vec![MountConfig {
            pipeline: PipelineSource::Raw(launch.to_string()),
            ..MountConfig::default()
        }];
    }
    config
}

fn spawn_server(config: ServerConfig) -> Running {
    rtsp_launch_gst::init().expect("gstreamer init");

    let (tx, rx) = mpsc::channel();
    let thread = thread::spawn(move || {
        let mut server = Server::with_context(config, glib::MainContext::new());
        server.start().expect("server start");
        tx.send((server.bound_port().expect("bound port"), server.shutdown_handle()))
            .unwrap();
        server.run().expect("main loop");
        server.stop();
    });

    let (port, handle) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("server did not start");
    Running {
        port,
        handle,
        thread,
    }
}

fn connect(port: u16) -> TcpStream {
    let stream = TcpStream::connect(("127.0.0.1", port)).expect("connect to server");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
        .set_write_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

fn rtsp_request(stream: &mut TcpStream, request: &str) -> std::io::Result<String> {
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        response.push_str(&line);
        if line == "\r\n" || line == "\n" {
            break;
        }
    }

    if let Some(len) = response
        .lines()
        .find(|l| l.to_lowercase().starts_with("content-length:"))
        .and_then(|l| l.split(':').nth(1))
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        if len > 0 {
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body)?;
            response.push_str(&String::from_utf8_lossy(&body));
        }
    }

    Ok(response)
}

#[test]
fn options_answered_on_test_mount() {
    let server = spawn_server(test_config(None));
    let mut stream = connect(server.port);

    let uri = format!("rtsp://127.0.0.1:{}/test", server.port);
    let response = rtsp_request(
        &mut stream,
        &format!("OPTIONS {uri} RTSP/1.0\r\nCSeq: 1\r\n\r\n"),
    )
    .expect("OPTIONS response");

    assert!(
        response.starts_with("RTSP/1.0 200 OK"),
        "OPTIONS: expected 200 OK, got: {}",
        response.lines().next().unwrap_or("")
    );
    assert!(response.contains("Public:"), "OPTIONS: missing Public header");
    assert!(response.contains("DESCRIBE"), "OPTIONS: DESCRIBE not offered");

    drop(stream);
    server.shutdown();
}

#[test]
fn describe_unknown_mount_is_not_found() {
    let server = spawn_server(test_config(None));
    let mut stream = connect(server.port);

    let response = rtsp_request(
        &mut stream,
        &format!(
            "DESCRIBE rtsp://127.0.0.1:{}/other RTSP/1.0\r\nCSeq: 1\r\nAccept: application/sdp\r\n\r\n",
            server.port
        ),
    )
    .expect("DESCRIBE response");

    assert!(
        response.starts_with("RTSP/1.0 404"),
        "DESCRIBE /other: expected 404, got: {}",
        response.lines().next().unwrap_or("")
    );

    drop(stream);
    server.shutdown();
}

#[test]
fn broken_launch_starts_and_fails_on_first_request() {
    let server = spawn_server(test_config(Some("( videotestsrc ! ! rtph264pay name=pay0 )")));
    let mut stream = connect(server.port);

    let response = rtsp_request(
        &mut stream,
        &format!(
            "DESCRIBE rtsp://127.0.0.1:{}/test RTSP/1.0\r\nCSeq: 1\r\nAccept: application/sdp\r\n\r\n",
            server.port
        ),
    )
    .expect("DESCRIBE response");

    assert!(
        response.starts_with("RTSP/1.0 "),
        "DESCRIBE: not an RTSP response: {response:?}"
    );
    assert!(
        !response.starts_with("RTSP/1.0 200"),
        "DESCRIBE of a broken launch must not succeed"
    );

    drop(stream);
    server.shutdown();
}

#[test]
fn eager_validation_rejects_broken_launch_at_start() {
    rtsp_launch_gst::init().unwrap();

    let mut config = test_config(Some("( videotestsrc ! ! rtph264pay name=pay0 )"));
    config.validation = Validation::Eager;

    let mut server = Server::with_context(config, glib::MainContext::new());
    assert!(server.start().is_err());
    assert!(!server.is_running());
}

#[test]
fn eager_validation_reports_missing_elements() {
    rtsp_launch_gst::init().unwrap();

    let mut config = test_config(Some(
        "( nosuchsrc_rtsp_launch ! rtph264pay name=pay0 pt=96 )",
    ));
    config.validation = Validation::Eager;

    let mut server = Server::with_context(config, glib::MainContext::new());
    match server.start() {
        Err(ServerError::MissingElements { mount, elements }) => {
            assert_eq!(mount, "/test");
            assert!(elements.contains(&"nosuchsrc_rtsp_launch".to_string()));
        }
        other => panic!("expected MissingElements, got {other:?}"),
    }
}

#[test]
fn start_twice_is_rejected() {
    rtsp_launch_gst::init().unwrap();

    let mut server = Server::with_context(test_config(None), glib::MainContext::new());
    server.start().expect("first start");
    assert!(matches!(server.start(), Err(ServerError::AlreadyRunning)));

    assert!(server.is_running());
    assert_eq!(server.mount_paths(), vec!["/test".to_string()]);
    let port = server.bound_port().expect("bound port");
    assert_ne!(port, 0);
    assert_eq!(
        server.readiness_lines(),
        vec![format!("RTSP stream ready at rtsp://127.0.0.1:{port}/test")]
    );

    server.stop();
    assert!(!server.is_running());
    assert!(server.bound_port().is_none());
}

#[test]
fn run_before_start_is_rejected() {
    rtsp_launch_gst::init().unwrap();

    let server = Server::with_context(test_config(None), glib::MainContext::new());
    assert!(matches!(server.run(), Err(ServerError::NotStarted)));
}

#[test]
fn connected_clients_are_counted() {
    rtsp_launch_gst::init().unwrap();

    let (tx, rx) = mpsc::channel();
    let (count_tx, count_rx) = mpsc::channel::<mpsc::Sender<usize>>();
    let thread = thread::spawn(move || {
        let context = glib::MainContext::new();
        let mut server = Server::with_context(test_config(None), context.clone());
        server.start().expect("server start");
        tx.send((server.bound_port().unwrap(), server.shutdown_handle()))
            .unwrap();

        // Answer count queries between main-loop iterations.
        let _guard = context.acquire().expect("acquire context");
        loop {
            context.iteration(false);
            match count_rx.try_recv() {
                Ok(reply) => reply.send(server.client_count()).unwrap(),
                Err(mpsc::TryRecvError::Disconnected) => break,
                Err(mpsc::TryRecvError::Empty) => thread::sleep(Duration::from_millis(5)),
            }
        }
    });

    let (port, _handle) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    let mut stream = connect(port);
    let response = rtsp_request(
        &mut stream,
        &format!("OPTIONS rtsp://127.0.0.1:{port}/test RTSP/1.0\r\nCSeq: 1\r\n\r\n"),
    )
    .expect("OPTIONS response");
    assert!(response.starts_with("RTSP/1.0 200 OK"));

    let (reply_tx, reply_rx) = mpsc::channel();
    count_tx.send(reply_tx).unwrap();
    let count = reply_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(count, 1);

    drop(stream);
    drop(count_tx);
    thread.join().unwrap();
}

#[test]
fn start_and_stop_on_private_context() {
    rtsp_launch_gst::init().unwrap();

    let context = glib::MainContext::new();
    let mut server = Server::with_context(test_config(None), context.clone());
    server.start().expect("start on private context");
    assert!(server.bound_port().is_some());

    server.stop();
    assert!(!server.is_running());

    server.start().expect("restart on private context");
    assert!(server.is_running());
    server.stop();
    assert!(!server.is_running());
}

#[test]
fn shutdown_before_run_returns_immediately() {
    rtsp_launch_gst::init().unwrap();

    let mut server = Server::with_context(test_config(None), glib::MainContext::new());
    server.start().expect("server start");
    server.shutdown_handle().shutdown();

    server.run().expect("run after shutdown");
    server.stop();
}

#[test]
fn shutdown_racing_loop_startup_ends_run() {
    rtsp_launch_gst::init().unwrap();

    for _ in 0..20 {
        let (tx, rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let thread = thread::spawn(move || {
            let mut server = Server::with_context(test_config(None), glib::MainContext::new());
            server.start().expect("server start");
            tx.send(server.shutdown_handle()).unwrap();
            server.run().expect("main loop");
            server.stop();
            done_tx.send(()).unwrap();
        });

        let handle = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.shutdown();

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("run did not return after shutdown");
        thread.join().unwrap();
    }
}

#[test]
fn repeated_shutdown_is_harmless() {
    let server = spawn_server(test_config(None));
    server.handle.shutdown();
    server.handle.shutdown();
    server.shutdown();
}
