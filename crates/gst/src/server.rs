use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use gst::glib;
use gst_rtsp_server::RTSPServer;
use gst_rtsp_server::prelude::*;

use rtsp_launch::{MountTable, ServerConfig, Validation};

use crate::error::{Result, ServerError};
use crate::{factory, validate};

struct State {
    rtsp: RTSPServer,
    /// Listener source, kept as a `Source` because `SourceId::remove` only
    /// searches the global default context.
    source: glib::Source,
    mounts: MountTable,
    bound_port: u16,
}

/// RTSP server serving the mounts of a [`ServerConfig`].
///
/// Owns the gst-rtsp-server instance and the GLib main loop that drives it.
/// All protocol work (session negotiation, RTP delivery, encoding) happens
/// inside the framework; this type only wires configuration in and keeps the
/// loop running.
pub struct Server {
    config: ServerConfig,
    context: glib::MainContext,
    main_loop: glib::MainLoop,
    state: Option<State>,
    clients: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Server attached to the global default main context.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_context(config, glib::MainContext::default())
    }

    /// Server attached to a specific main context, for running the loop on a
    /// thread of its own.
    pub fn with_context(config: ServerConfig, context: glib::MainContext) -> Self {
        let main_loop = glib::MainLoop::new(Some(&context), false);
        Self {
            config,
            context,
            main_loop,
            state: None,
            clients: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register the mounts and start listening.
    ///
    /// Unless eager validation is configured, launch descriptions are not
    /// parsed here: a broken description starts fine and fails when the
    /// first client requests its mount.
    pub fn start(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let mounts = self.config.mount_table()?;

        if self.config.validation == Validation::Eager {
            for mount in mounts.mounts() {
                validate::validate_mount(&mount)?;
            }
        }

        let rtsp = RTSPServer::new();
        rtsp.set_address(&self.config.address);
        rtsp.set_service(&self.config.port.to_string());

        let mount_points = rtsp.mount_points().ok_or(ServerError::NoMountPoints)?;
        for mount in mounts.mounts() {
            mount_points.add_factory(mount.path(), factory::build(&mount));
            tracing::info!(
                path = mount.path(),
                shared = mount.is_shared(),
                launch = mount.launch(),
                "mount registered"
            );
        }

        let clients = self.clients.clone();
        rtsp.connect_client_connected(move |_, client| {
            let count = clients.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!(clients = count, "client connected");

            let clients = clients.clone();
            client.connect_closed(move |_| {
                let count = clients
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .map_or(0, |prev| prev - 1);
                tracing::info!(clients = count, "client disconnected");
            });
        });

        let source_id = rtsp.attach(Some(&self.context))?;
        let source = self
            .context
            .find_source_by_id(&source_id)
            .ok_or_else(|| glib::bool_error!("attached source not found in main context"))?;
        let bound_port = u16::try_from(rtsp.bound_port()).unwrap_or(self.config.port);

        tracing::info!(
            addr = %self.config.address,
            port = bound_port,
            "RTSP server listening"
        );

        self.shutdown.store(false, Ordering::SeqCst);
        self.state = Some(State {
            rtsp,
            source,
            mounts,
            bound_port,
        });
        Ok(())
    }

    /// Block in the main loop until [`stop`](Self::stop) or a
    /// [`ShutdownHandle`] ends it.
    pub fn run(&self) -> Result<()> {
        if self.state.is_none() {
            return Err(ServerError::NotStarted);
        }
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }

        // A quit that lands between the check above and the loop taking the
        // context is lost, so the flag is checked again from inside the loop.
        let requested = self.shutdown.clone();
        let main_loop = self.main_loop.clone();
        let watch = glib::idle_source_new(
            Some("rtsp-launch-shutdown-check"),
            glib::Priority::HIGH,
            move || {
                if requested.load(Ordering::SeqCst) {
                    main_loop.quit();
                }
                glib::ControlFlow::Break
            },
        );
        watch.attach(Some(&self.context));

        tracing::debug!("entering main loop");
        self.main_loop.run();
        tracing::debug!("main loop exited");
        Ok(())
    }

    /// Detach the listener and end the main loop. Existing client
    /// connections are dropped with the server.
    pub fn stop(&mut self) {
        if let Some(state) = self.state.take() {
            if let Some(mount_points) = state.rtsp.mount_points() {
                for path in state.mounts.paths() {
                    mount_points.remove_factory(&path);
                }
            }
            state.source.destroy();
            tracing::info!("server stopped");
        }
        self.shutdown.store(true, Ordering::SeqCst);
        self.main_loop.quit();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    /// Port the listener is bound to, once started.
    pub fn bound_port(&self) -> Option<u16> {
        self.state.as_ref().map(|s| s.bound_port)
    }

    /// Clients currently connected over RTSP.
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    /// Registered mount paths, once started.
    pub fn mount_paths(&self) -> Vec<String> {
        self.state
            .as_ref()
            .map(|s| s.mounts.paths())
            .unwrap_or_default()
    }

    /// Startup message lines with the actual bound port.
    pub fn readiness_lines(&self) -> Vec<String> {
        let port = self.bound_port().unwrap_or(self.config.port);
        self.config.readiness_lines(port)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            context: self.context.clone(),
            main_loop: self.main_loop.clone(),
            requested: self.shutdown.clone(),
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ends [`Server::run`] from any thread, e.g. a signal handler.
#[derive(Clone)]
pub struct ShutdownHandle {
    context: glib::MainContext,
    main_loop: glib::MainLoop,
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Request the loop to end. Repeated calls quit again, so a second
    /// Ctrl-C still works if the first raced with loop startup.
    pub fn shutdown(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            tracing::debug!("shutdown requested again");
        }
        let main_loop = self.main_loop.clone();
        self.context.invoke(move || main_loop.quit());
    }
}
