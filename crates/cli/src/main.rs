use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rtsp_launch::config::{DEFAULT_ADDRESS, DEFAULT_PORT, DEFAULT_PUBLIC_HOST};
use rtsp_launch::encoder::DEFAULT_BITRATE_KBPS;
use rtsp_launch::mount::DEFAULT_MOUNT_PATH;
use rtsp_launch::pipeline::{DEFAULT_CONVERTER, DEFAULT_PAYLOAD_TYPE, DEFAULT_SOURCE};
use rtsp_launch::{
    EncoderSettings, MountConfig, PipelineDescription, PipelineSource, ServerConfig, SpeedPreset,
    Tune, Validation,
};
use rtsp_launch_gst::{Server, ServerError};

#[derive(Parser)]
#[command(
    name = "rtsp-launch-server",
    about = "Serve a live H.264 camera stream over RTSP"
)]
struct Args {
    /// Address to bind the RTSP listener to
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// RTSP port (0 picks a free port)
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host shown in the advertised stream URL
    #[arg(long, default_value = DEFAULT_PUBLIC_HOST)]
    public_host: String,

    /// Mount path of the stream
    #[arg(long, short, default_value = DEFAULT_MOUNT_PATH)]
    mount: String,

    /// Capture element, with properties
    #[arg(long, default_value = DEFAULT_SOURCE)]
    source: String,

    /// Encoder target bitrate in kbit/s
    #[arg(long, default_value_t = DEFAULT_BITRATE_KBPS)]
    bitrate: u32,

    /// x264 speed preset
    #[arg(long, default_value_t = SpeedPreset::default())]
    preset: SpeedPreset,

    /// x264 tuning profile
    #[arg(long, default_value_t = Tune::default())]
    tune: Tune,

    /// RTP payload type of the H.264 stream
    #[arg(long, default_value_t = DEFAULT_PAYLOAD_TYPE)]
    payload_type: u8,

    /// Full launch description, replacing the built-in pipeline
    #[arg(long, conflicts_with_all = ["source", "bitrate", "preset", "tune", "payload_type"])]
    launch: Option<String>,

    /// Build one pipeline per client instead of sharing one
    #[arg(long)]
    exclusive: bool,

    /// Check the pipeline at startup instead of on the first client request
    #[arg(long)]
    validate: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let pipeline = match self.launch {
            Some(launch) => PipelineSource::Raw(launch),
            None => PipelineSource::Described(PipelineDescription {
                source: self.source,
                converter: DEFAULT_CONVERTER.to_string(),
                encoder: EncoderSettings {
                    bitrate_kbps: self.bitrate,
                    preset: self.preset,
                    tune: self.tune,
                },
                payload_type: self.payload_type,
            }),
        };

        ServerConfig {
            address: self.address,
            port: self.port,
            public_host: self.public_host,
            mounts: vec![MountConfig {
                path: self.mount,
                pipeline,
                shared: !self.exclusive,
            }],
            validation: if self.validate {
                Validation::Eager
            } else {
                Validation::Lazy
            },
        }
    }
}

fn run(args: Args) -> Result<(), ServerError> {
    rtsp_launch_gst::init()?;

    let mut server = Server::new(args.into_config());
    server.start()?;

    for line in server.readiness_lines() {
        println!("{line}");
    }

    let handle = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("received Ctrl+C, shutting down");
        handle.shutdown();
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl+C handler");
    }

    server.run()?;
    server.stop();
    Ok(())
}

fn main() -> ExitCode {
    // stdout carries only the readiness line.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            ExitCode::FAILURE
        }
    }
}
