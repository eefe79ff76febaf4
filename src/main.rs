use anyhow::{Context, Result};
use clap::Parser;
use std::io;

use traffic_controller::command_line::CommandLine;
use traffic_controller::simulation::{
    Controller, Intersection, DEFAULT_CYCLE_SIZE, DEFAULT_PASS_DURATION,
};

#[derive(Parser)]
#[command(name = "traffic_controller")]
#[command(about = "Round-robin traffic light simulation for a four-way intersection")]
struct Cli {
    /// Step through cycles with yes/no prompts instead of running headless
    #[arg(long)]
    interactive: bool,

    /// Number of cycles to run in headless mode
    #[arg(long, default_value = "10")]
    cycles: u32,

    /// Time for one vehicle to clear the intersection
    #[arg(long, default_value_t = DEFAULT_PASS_DURATION)]
    pass_duration: f64,

    /// Share of each direction's total waiting time drained per served cycle
    #[arg(long, default_value_t = DEFAULT_CYCLE_SIZE)]
    cycle_size: f64,

    /// Seed for reproducible vehicle arrivals
    #[arg(long)]
    seed: Option<u64>,

    /// Sleep in real time while vehicles clear the intersection (headless mode)
    #[arg(long)]
    real_time: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,traffic_controller=info"),
    )
    .init();

    let cli = Cli::parse();
    let controller = build_controller(&cli)?;

    if cli.interactive {
        let stdin = io::stdin();
        let mut command_line = CommandLine::new(controller, stdin.lock(), io::stdout());
        command_line.start()
    } else {
        run_headless(controller, cli.cycles, cli.real_time)
    }
}

fn build_controller(cli: &Cli) -> Result<Controller> {
    let mut intersection = match cli.seed {
        Some(seed) => Intersection::create_four_way_with_seed(seed),
        None => Intersection::create_four_way(),
    }
    .context("Failed to build the four-way intersection")?;

    for id in intersection.ids() {
        if let Some(direction) = intersection.direction_mut(id) {
            direction
                .set_cycle_size(cli.cycle_size)
                .context("Invalid --cycle-size")?;
        }
    }

    Controller::new(intersection, cli.pass_duration).context("Invalid --pass-duration")
}

/// Run the controller without prompts for a fixed number of cycles
fn run_headless(mut controller: Controller, cycles: u32, real_time: bool) -> Result<()> {
    println!("Running traffic controller in headless mode...");
    println!("Cycles: {}, Pass duration: {}", cycles, controller.pass_duration());
    println!();

    controller.set_real_time_mode(real_time);

    println!("Initial state:");
    controller.print_summary();
    println!();

    for cycle in 1..=cycles {
        let report = controller
            .cycle()
            .with_context(|| format!("Cycle {} failed", cycle))?;
        println!(
            "--- Cycle {}: served {}, released {}, took {:.1} ---",
            cycle, report.served_name, report.released, report.elapsed
        );
        controller.print_summary();
        println!();
    }

    println!("=== Final State ===");
    controller.print_summary();
    Ok(())
}
