use std::rc::Rc;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use helics_values_core::input::{MultiInputPolicy, TargetType, TypedCallback};
use helics_values_core::registry::InputRegistry;
use helics_values_core::testing::MockFederateCore;
use helics_values_core::time::SimTime;
use helics_values_core::value::{PrimaryType, Value};

const LONG_ABOUT: &str = r##"
Drives the value-federate input layer through a small scripted co-simulation
scenario against an in-memory federate core, so the scan/convert/dispatch
pipeline can be watched end-to-end without a real HELICS deployment.

SCENARIO:
  temperature   single publication, Celsius -> Fahrenheit unit bridge
  wind_speed    two publications reduced by the 'average' multi-input policy
  pump_running  boolean, change detection enabled with delta 0 (equality only)

Each simulated time step publishes new raw values on the mock core, then
runs one registry scan; callbacks installed on each input print what they
observed."##;

#[derive(Parser)]
#[command(name = "helics-values-demo")]
#[command(version)]
#[command(about = "Scripted demo of the value-federate input layer")]
#[command(long_about = LONG_ABOUT)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::OFF,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    if level != LevelFilter::OFF {
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let core = Rc::new(MockFederateCore::new());
    let mut registry = InputRegistry::new(core.clone());

    const TEMPERATURE: u64 = 1;
    const WIND_SPEED: u64 = 2;
    const PUMP_RUNNING: u64 = 3;

    core.declare_injection(TEMPERATURE, "double", Some("c"));
    let temperature = registry.create_input(
        TEMPERATURE,
        "temperature",
        TargetType::Primary(PrimaryType::Double),
        Value::Double(0.0),
    );
    temperature.set_output_units(Some("f".into())).unwrap();
    temperature
        .set_callback(TypedCallback::Double(Box::new(|value, time| {
            println!(
                "{} {} temperature = {} F",
                format!("[{time}]").dimmed(),
                "update".green().bold(),
                format!("{value:.1}").cyan(),
            );
        })))
        .unwrap();

    core.declare_injection(WIND_SPEED, "double", None);
    let wind_speed = registry.create_input(
        WIND_SPEED,
        "wind_speed",
        TargetType::Primary(PrimaryType::Double),
        Value::Double(0.0),
    );
    wind_speed.set_multi_input_policy(MultiInputPolicy::Average);
    wind_speed.set_minimum_change(0.5);
    wind_speed
        .set_callback(TypedCallback::Double(Box::new(|value, time| {
            println!(
                "{} {} wind_speed = {} m/s (averaged)",
                format!("[{time}]").dimmed(),
                "update".green().bold(),
                format!("{value:.2}").cyan(),
            );
        })))
        .unwrap();

    core.declare_injection(PUMP_RUNNING, "bool", None);
    let pump_running = registry.create_input(
        PUMP_RUNNING,
        "pump_running",
        TargetType::Primary(PrimaryType::Boolean),
        Value::Boolean(false),
    );
    pump_running.set_minimum_change(0.0);
    pump_running.register_notification_callback(Box::new(|time| {
        println!(
            "{} {} pump_running changed",
            format!("[{time}]").dimmed(),
            "notify".yellow().bold(),
        );
    }));

    println!("{}", "running scripted scenario...".bold());

    let steps: [(SimTime, &[(u64, Value)]); 4] = [
        (
            SimTime::from_seconds(0.0),
            &[(TEMPERATURE, Value::Double(20.0)), (PUMP_RUNNING, Value::Boolean(false))],
        ),
        (
            SimTime::from_seconds(1.0),
            &[
                (WIND_SPEED, Value::Double(3.0)),
                (WIND_SPEED, Value::Double(5.0)),
            ],
        ),
        (
            SimTime::from_seconds(2.0),
            &[(TEMPERATURE, Value::Double(25.0)), (PUMP_RUNNING, Value::Boolean(true))],
        ),
        (
            SimTime::from_seconds(3.0),
            &[(WIND_SPEED, Value::Double(4.9))],
        ),
    ];

    for (time, publications) in steps {
        for (handle, value) in publications {
            core.publish(*handle, value);
        }
        let updated = registry.scan(time);
        if updated.is_empty() {
            println!("{} {}", format!("[{time}]").dimmed(), "no observable change".dimmed());
        }
    }
}
