use clap::Parser;
use log::error;
use mqtt_button::{
    DispatchConfig, EventDispatcher, GpioButton, MessageMapping, MqttPublisher, SimulatedButton,
    SystemClock,
};
use std::convert::Infallible;
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

/// Sends an MQTT message upon button press
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hostname to MQTT server
    #[arg(short = 'H', long, default_value = "localhost")]
    hostname: String,

    /// GPIO pin for the button
    #[arg(short, long, default_value_t = 24)]
    gpio_pin: u8,

    /// Invert button state (default: closed circuit == pressed)
    #[arg(long)]
    inverted: bool,

    /// Payload for MQTT message when button is pressed
    #[arg(short, long, default_value = "PRESSED", conflicts_with = "message")]
    pressed_message: String,

    /// Payload for MQTT message when button is released
    #[arg(short, long, default_value = "RELEASED", conflicts_with = "message")]
    released_message: String,

    /// Publish a single payload on the active edge only, instead of
    /// per-edge payloads
    #[arg(short, long)]
    message: Option<String>,

    /// Seconds to sleep after each publish before listening again
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        num_args = 0..=1,
        default_missing_value = "30",
        requires = "message"
    )]
    interval: Option<u64>,

    /// Use keyboard input instead of GPIO button
    #[arg(long)]
    mocked: bool,

    /// MQTT topic to publish to
    #[arg(short, long, default_value = "/")]
    topic: String,
}

fn run(args: Args) -> Result<Infallible, Box<dyn Error>> {
    let mapping = match args.message {
        Some(payload) => MessageMapping::fixed(payload),
        None => MessageMapping::per_edge(args.pressed_message, args.released_message),
    };

    let config = DispatchConfig::new(
        args.topic,
        args.hostname,
        mapping,
        args.inverted,
        args.interval.map(Duration::from_secs),
    )?;

    let sink = MqttPublisher::new();
    let clock = SystemClock;

    if args.mocked {
        let source = SimulatedButton::from_stdin();
        let mut dispatcher = EventDispatcher::new(source, sink, &clock, config);
        println!("Button is ready!");
        Ok(dispatcher.run()?)
    } else {
        let source = GpioButton::new(args.gpio_pin)?;
        let mut dispatcher = EventDispatcher::new(source, sink, &clock, config);
        println!("Button is ready!");
        Ok(dispatcher.run()?)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(err) = ctrlc::set_handler(|| {
        eprintln!("\nInterrupted by ^C");
        std::process::exit(130);
    }) {
        error!("failed to install interrupt handler: {}", err);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(never) => match never {},
        Err(err) => {
            error!("fatal: {}", err);
            ExitCode::FAILURE
        }
    }
}
