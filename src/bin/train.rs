extern crate env_logger;
extern crate flatprop;
#[macro_use]
extern crate log;

use std::env;
use std::process;

use flatprop::prelude::*;

fn xor() -> Result<TrainingSet> {
    TrainingSet::new(vec![(vec![0.0, 0.0], vec![0.0]),
                          (vec![0.0, 1.0], vec![1.0]),
                          (vec![1.0, 0.0], vec![1.0]),
                          (vec![1.0, 1.0], vec![0.0])])
}

fn xor_network() -> Result<FlattenedNetwork> {
    NetworkBuilder::new(2)
        .layer(4, Activator::Sigmoid, true)
        .layer(1, Activator::Sigmoid, true)
        .seed(7)
        .build()
}

fn score(network: &mut FlattenedNetwork, training: &TrainingSet) -> Result<usize> {
    let mut num_correct = 0;
    for (input, ideal) in training.iter() {
        let output = network.compute(input)?;
        if (output[0] > 0.5) == (ideal[0] > 0.5) {
            num_correct += 1;
        }
    }
    Ok(num_correct)
}

fn train_xor_rprop(variant: RpropVariant) -> Result<()> {
    let training = xor()?;
    let network = xor_network()?;
    let rprop = ResilientPropagation::new(network.weight_count(),
                                          RpropConfig::default().variant(variant))?;
    let propagation = Propagation::new(network, training.clone(), rprop)?.seed(1);
    let mut trainer = Trainer::new(propagation)
        .min_error(0.001)
        .max_iterations(5000)
        .logging(Logging::Iterations(500));
    let report = trainer.train();

    let mut network = trainer.into_network();
    info!("{}: {} iterations, MSE {:.6}, {} of {} correct",
          variant,
          report.iterations,
          report.error,
          score(&mut network, &training)?,
          training.len());
    Ok(())
}

fn train_xor_sgd(optimizer: OptimizerConfig) -> Result<()> {
    let training = xor()?;
    let network = xor_network()?;
    let config = SgdConfig::default()
        .learning_rate(0.05)
        .batch_size(8)
        .optimizer(optimizer);
    let sgd = StochasticGradientDescent::new(network.weight_count(), config)?;
    let propagation = Propagation::new(network, training.clone(), sgd)?.seed(1);
    let mut trainer = Trainer::new(propagation)
        .min_error(0.001)
        .max_iterations(5000)
        .logging(Logging::Completion);
    let report = trainer.train();

    let mut network = trainer.into_network();
    info!("sgd/{}: {} iterations, MSE {:.6}, {} of {} correct",
          optimizer,
          report.iterations,
          report.error,
          score(&mut network, &training)?,
          training.len());
    Ok(())
}

/// Teaches an Elman network to predict the next value of a square wave.
fn train_elman() -> Result<()> {
    let wave = [0.0, 0.0, 1.0, 1.0];
    let pairs: Vec<(Vec<f64>, Vec<f64>)> = (0..wave.len() * 4)
        .map(|i| (vec![wave[i % 4]], vec![wave[(i + 1) % 4]]))
        .collect();
    let training = TrainingSet::new(pairs)?;
    let network = NetworkBuilder::new(1)
        .layer(4, Activator::TanH, true)
        .layer(1, Activator::Sigmoid, true)
        .context(1, 1)
        .seed(3)
        .build()?;

    let rprop = ResilientPropagation::new(network.weight_count(),
                                          RpropConfig::default()
                                              .variant(RpropVariant::IRpropPlus))?;
    let propagation = Propagation::new(network, training, rprop)?;
    let mut trainer = Trainer::new(propagation)
        .max_iterations(2000)
        .logging(Logging::Completion);
    let report = trainer.train();
    info!("elman: {} iterations, MSE {:.6}", report.iterations, report.error);
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    if args.is_empty() {
        for &variant in RpropVariant::ALL.iter() {
            train_xor_rprop(variant)?;
        }
        for tag in OptimizerConfig::TAGS.iter() {
            train_xor_sgd(tag.parse()?)?;
        }
        return train_elman();
    }

    for arg in args {
        if arg == "elman" {
            train_elman()?;
        } else if let Ok(variant) = arg.parse::<RpropVariant>() {
            train_xor_rprop(variant)?;
        } else {
            train_xor_sgd(arg.parse()?)?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = run(&args) {
        error!("{}", err);
        process::exit(1);
    }
}
