// Demonstration: train a boss agent against the automated random player.
//
// Build/run from this repo root:
//   cargo run --example train_boss -- --agent tabular --episodes 2000 --seed 42
//   cargo run --features rl-nn --example train_boss -- --agent dqn --episodes 500

use std::env;
use std::path::PathBuf;

use gridboss::rl::{
    evaluate, BossEnvironment, DecisionAgent, EncoderConfig, TabularConfig, TabularQAgent,
    Trainer, TrainingConfig,
};
use gridboss::GameConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let agent_name = arg_value(&args, "--agent").unwrap_or("tabular");
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1_000);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);
    let checkpoint = arg_value(&args, "--checkpoint").map(PathBuf::from);

    let game = GameConfig::default();
    let encoder = EncoderConfig::from_game(&game);
    let mut agent: Box<dyn DecisionAgent> = match agent_name {
        "tabular" => Box::new(
            TabularQAgent::new(TabularConfig::default(), encoder)
                .with_ultimate_targets(game.ultimate_targets),
        ),
        "dqn" => match dqn_agent(encoder, game.ultimate_targets) {
            Some(agent) => agent,
            None => std::process::exit(2),
        },
        other => {
            eprintln!("Unknown --agent '{}'; expected 'tabular' or 'dqn'.", other);
            std::process::exit(2);
        }
    };

    if let Some(path) = &checkpoint {
        agent.load(path);
    }

    let mut env = BossEnvironment::new(game);
    let mut rng = StdRng::seed_from_u64(seed);
    let trainer = Trainer::new(TrainingConfig {
        episodes,
        log_every: (episodes / 20).max(1),
        checkpoint_every: (episodes / 4).max(1),
        checkpoint_path: checkpoint,
    });

    let report = match trainer.run(&mut env, agent.as_mut(), &mut rng) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("training aborted: {}", err);
            std::process::exit(1);
        }
    };
    println!("Agent: {}", agent.name());
    println!("{}", report.overall);

    match evaluate(&mut env, agent.as_mut(), 100, &mut rng) {
        Ok(stats) => println!("Greedy evaluation:\n{}", stats),
        Err(err) => eprintln!("evaluation aborted: {}", err),
    }
}

#[cfg(feature = "rl-nn")]
fn dqn_agent(encoder: EncoderConfig, ultimate_targets: usize) -> Option<Box<dyn DecisionAgent>> {
    use gridboss::rl::{ApproximateQAgent, DqnConfig};

    match ApproximateQAgent::new(DqnConfig::default(), encoder, tch::Device::cuda_if_available()) {
        Ok(agent) => Some(Box::new(agent.with_ultimate_targets(ultimate_targets))),
        Err(err) => {
            eprintln!("could not build the Q-network agent: {}", err);
            None
        }
    }
}

#[cfg(not(feature = "rl-nn"))]
fn dqn_agent(_encoder: EncoderConfig, _ultimate_targets: usize) -> Option<Box<dyn DecisionAgent>> {
    eprintln!(
        "The 'dqn' agent requires the 'rl-nn' feature.\n\
Run:\n\
  cargo run --features rl-nn --example train_boss -- --agent dqn"
    );
    None
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}
